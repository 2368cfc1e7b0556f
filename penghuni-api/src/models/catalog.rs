use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{DeviceId, RoomId};
use crate::topic::MessageClass;

/// A room of the house. Rooms are fixed at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    /// Canonical identifier, also the default topic segment
    pub id: RoomId,
    /// Display name
    pub name: String,
    /// Whether a presence sensor reports for this room
    #[serde(default = "default_sensor")]
    pub sensor: bool,
}

/// A switchable appliance. Its commands travel on the topics of its home room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub name: String,
    /// Hardware topic segment when it differs from the id (`pompa_air` -> `pompa`)
    #[serde(default)]
    pub segment: Option<String>,
    /// Room whose topics carry this device's commands
    pub room: RoomId,
    /// Rated load in watts
    #[serde(default)]
    pub power: Option<u32>,
}

impl DeviceSpec {
    pub fn segment(&self) -> &str {
        self.segment.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Alternative topic segment for a room, honoured for the listed message classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSpec {
    pub room: RoomId,
    pub segment: String,
    pub classes: Vec<MessageClass>,
}

fn default_sensor() -> bool {
    true
}
