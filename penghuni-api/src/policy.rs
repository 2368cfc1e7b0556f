//! Occupancy-gated permission rules.
//!
//! | occupancy     | operation                  | decision |
//! |---------------|----------------------------|----------|
//! | `berpenghuni` | light on, turn off         | deny     |
//! | `berpenghuni` | light off, turn on         | allow    |
//! | `berpenghuni` | single device, on or off   | allow    |
//! | `berpenghuni` | all lights / devices off   | deny     |
//! | `kosong`      | anything                   | allow    |

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Action, Occupancy};

/// What a control request wants to do, with the state the rules depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Light { is_on: bool, action: Action },
    Device { action: Action },
    AllLightsOff,
    AllDevicesOff,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    LightInUse,
    BulkLightsWhileOccupied,
    BulkDevicesWhileOccupied,
}

impl DenyReason {
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::LightInUse => "light_in_use",
            DenyReason::BulkLightsWhileOccupied => "bulk_lights_while_occupied",
            DenyReason::BulkDevicesWhileOccupied => "bulk_devices_while_occupied",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::LightInUse => f.write_str("occupied, cannot turn off"),
            DenyReason::BulkLightsWhileOccupied => {
                f.write_str("occupied, cannot turn off all lights")
            }
            DenyReason::BulkDevicesWhileOccupied => {
                f.write_str("occupied, cannot turn off all devices")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluated fresh on every request; there is nothing to cache.
pub fn evaluate(occupancy: Occupancy, operation: &Operation) -> Decision {
    if !occupancy.is_occupied() {
        return Decision::Allow;
    }

    match *operation {
        Operation::Light {
            is_on: true,
            action: Action::TurnOff,
        } => Decision::Deny(DenyReason::LightInUse),
        Operation::Light { .. } | Operation::Device { .. } => Decision::Allow,
        Operation::AllLightsOff => Decision::Deny(DenyReason::BulkLightsWhileOccupied),
        Operation::AllDevicesOff => Decision::Deny(DenyReason::BulkDevicesWhileOccupied),
    }
}
