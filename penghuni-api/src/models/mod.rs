mod activity;
mod catalog;
mod house;

pub use activity::*;
pub use catalog::*;
pub use house::*;

use alloc::string::String;
use core::borrow::Borrow;
use core::fmt;

use serde::{Deserialize, Serialize};

/// Canonical room identifier, e.g. `kamar1` or `ruang_cuci`.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

/// Catalog device identifier, e.g. `pompa_air`.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(RoomId);
string_id!(DeviceId);

/// Global occupancy lock derived from every room's presence bit.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupancy {
    /// Nobody detected in any room
    #[default]
    #[serde(rename = "kosong")]
    Empty,
    /// At least one room reports presence
    #[serde(rename = "berpenghuni")]
    Occupied,
}

impl Occupancy {
    pub fn is_occupied(self) -> bool {
        matches!(self, Occupancy::Occupied)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Occupancy::Empty => "kosong",
            Occupancy::Occupied => "berpenghuni",
        }
    }
}

impl From<bool> for Occupancy {
    fn from(occupied: bool) -> Self {
        if occupied {
            Occupancy::Occupied
        } else {
            Occupancy::Empty
        }
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested state transition of a single light or device.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TurnOn,
    TurnOff,
}

impl Action {
    pub fn is_on(self) -> bool {
        matches!(self, Action::TurnOn)
    }
}

impl From<bool> for Action {
    fn from(on: bool) -> Self {
        if on { Action::TurnOn } else { Action::TurnOff }
    }
}

/// Addressable endpoint inside a room: its light, or a catalog device.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Light,
    Device(DeviceId),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Light => f.write_str("light"),
            Endpoint::Device(device) => write!(f, "device {}", device),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_occupancy_wire_names() {
        assert_eq!(Occupancy::Empty.to_string(), "kosong");
        assert_eq!(Occupancy::Occupied.to_string(), "berpenghuni");
        assert_eq!(Occupancy::from(true), Occupancy::Occupied);
        assert_eq!(Occupancy::default(), Occupancy::Empty);
    }

    #[test]
    fn test_ids_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(RoomId::from("kamar1"), 1);

        assert_eq!(map.get("kamar1"), Some(&1));
        assert_eq!(map.get("kamar2"), None);
    }
}
