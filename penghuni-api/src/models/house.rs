use alloc::collections::BTreeMap;
use alloc::string::String;

use serde::{Deserialize, Serialize};

use super::{DeviceId, Occupancy, RoomId};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Global occupancy lock
    pub status: Occupancy,
    /// Broker connection state as last reported by the bus
    pub mqtt_connected: bool,
    /// Commands may not reach hardware while set
    pub degraded: bool,
    /// Number of rooms in the catalog
    pub room_count: usize,
    /// Lights currently on
    pub active_lights: usize,
    /// Devices currently on
    pub active_devices: usize,
    /// Presence bit per sensor room
    pub presence: BTreeMap<RoomId, u8>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomResponse {
    /// Display name
    pub name: String,
    /// Light state
    pub light: bool,
    /// Local occupancy flag of the room
    pub occupied: bool,
    /// Presence bit, absent for rooms without a sensor
    pub presence: Option<u8>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResponse {
    /// Display name
    pub name: String,
    /// Power state
    pub status: bool,
    /// Room whose topics carry the device's commands
    pub room: RoomId,
    /// Rated load in watts
    pub power: Option<u32>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightResponse {
    pub room_id: RoomId,
    /// Light state after the command
    pub light: bool,
    /// Command was handed to the bus
    pub delivered: bool,
    pub degraded: bool,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceToggleResponse {
    pub device_id: DeviceId,
    /// Device state after the command
    pub status: bool,
    /// Command was handed to the bus
    pub delivered: bool,
    pub degraded: bool,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupancyRequest {
    /// New local occupancy flag
    #[serde(default)]
    pub occupied: bool,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyResponse {
    pub room_id: RoomId,
    pub occupied: bool,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Human readable summary
    pub message: String,
    /// Number of lights or devices switched off
    pub affected: usize,
    /// Number of commands handed to the bus
    pub delivered: usize,
    pub degraded: bool,
}
