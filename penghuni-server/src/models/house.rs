use std::collections::BTreeMap;

use penghuni_api::models::*;
use penghuni_api::presence::{PresenceAggregator, PresenceUpdate};
use penghuni_api::topic::TopicRegistry;
use serde::Serialize;

use crate::configs;
use crate::errors::HouseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomState {
    pub name: String,
    pub light: bool,
    /// Local flag, set by the room's sensor or by hand
    pub occupied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub name: String,
    pub room: RoomId,
    pub power: Option<u32>,
    pub status: bool,
}

/// Something switched on while nobody is home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    /// Room id for lights, device id for devices
    pub subject: String,
    pub name: String,
}

impl Anomaly {
    pub fn light(room: &RoomId, state: &RoomState) -> Self {
        Self {
            kind: AnomalyKind::LightOnWhileEmpty,
            subject: room.to_string(),
            name: state.name.clone(),
        }
    }

    pub fn device(device: &DeviceId, state: &DeviceState) -> Self {
        Self {
            kind: AnomalyKind::DeviceOnWhileEmpty,
            subject: device.to_string(),
            name: state.name.clone(),
        }
    }

    pub fn message(&self) -> String {
        match self.kind {
            AnomalyKind::LightOnWhileEmpty => {
                format!("Light in {} is still on while the house is empty", self.name)
            }
            AnomalyKind::DeviceOnWhileEmpty => {
                format!("{} is still running while the house is empty", self.name)
            }
        }
    }
}

/// World state of the house: catalog, presence bits, light and device
/// tables and the last reported bus connection.
#[derive(Debug, Clone)]
pub struct House {
    registry: TopicRegistry,
    presence: PresenceAggregator,
    rooms: BTreeMap<RoomId, RoomState>,
    devices: BTreeMap<DeviceId, DeviceState>,
    bus_connected: bool,
}

impl House {
    pub fn new(catalog: &configs::House) -> Result<Self, HouseError> {
        let registry = TopicRegistry::new(&catalog.rooms, &catalog.devices, &catalog.aliases)?;

        let presence = PresenceAggregator::new(registry.sensor_rooms().cloned());

        let rooms = catalog
            .rooms
            .iter()
            .map(|room| {
                let state = RoomState {
                    name: room.name.clone(),
                    light: false,
                    occupied: false,
                };
                (room.id.clone(), state)
            })
            .collect();

        let devices = catalog
            .devices
            .iter()
            .map(|device| {
                let state = DeviceState {
                    name: device.name.clone(),
                    room: device.room.clone(),
                    power: device.power,
                    status: false,
                };
                (device.id.clone(), state)
            })
            .collect();

        Ok(Self {
            registry,
            presence,
            rooms,
            devices,
            bus_connected: false,
        })
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn presence(&self) -> &PresenceAggregator {
        &self.presence
    }

    pub fn occupancy(&self) -> Occupancy {
        self.presence.occupancy()
    }

    pub fn room(&self, room: &str) -> Result<&RoomState, HouseError> {
        self.rooms
            .get(room)
            .ok_or_else(|| HouseError::UnknownRoom(room.into()))
    }

    pub fn device(&self, device: &str) -> Result<&DeviceState, HouseError> {
        self.devices
            .get(device)
            .ok_or_else(|| HouseError::UnknownDevice(device.into()))
    }

    pub fn rooms(&self) -> impl Iterator<Item = (&RoomId, &RoomState)> {
        self.rooms.iter()
    }

    pub fn devices(&self) -> impl Iterator<Item = (&DeviceId, &DeviceState)> {
        self.devices.iter()
    }

    /// Current on/off state of an endpoint in `room`.
    pub fn endpoint_state(&self, room: &str, endpoint: &Endpoint) -> Result<bool, HouseError> {
        match endpoint {
            Endpoint::Light => self.room(room).map(|state| state.light),
            Endpoint::Device(device) => self.device(device.as_str()).map(|state| state.status),
        }
    }

    /// Writes the presence bit and mirrors it into the room's local flag.
    pub fn set_presence(
        &mut self,
        room: &str,
        present: bool,
    ) -> Result<PresenceUpdate, HouseError> {
        let update = self.presence.set_presence(room, present)?;

        if let Some(state) = self.rooms.get_mut(room) {
            state.occupied = present;
        }

        Ok(update)
    }

    pub fn set_room_occupied(
        &mut self,
        room: &str,
        occupied: bool,
    ) -> Result<&RoomState, HouseError> {
        let state = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| HouseError::UnknownRoom(room.into()))?;
        state.occupied = occupied;

        Ok(state)
    }

    /// Returns whether the state changed.
    pub fn set_endpoint(
        &mut self,
        room: &str,
        endpoint: &Endpoint,
        on: bool,
    ) -> Result<bool, HouseError> {
        let current = match endpoint {
            Endpoint::Light => {
                &mut self
                    .rooms
                    .get_mut(room)
                    .ok_or_else(|| HouseError::UnknownRoom(room.into()))?
                    .light
            }
            Endpoint::Device(device) => {
                &mut self
                    .devices
                    .get_mut(device.as_str())
                    .ok_or_else(|| HouseError::UnknownDevice(device.clone()))?
                    .status
            }
        };

        let changed = *current != on;
        *current = on;

        Ok(changed)
    }

    pub fn bus_connected(&self) -> bool {
        self.bus_connected
    }

    pub fn set_bus_connected(&mut self, connected: bool) {
        self.bus_connected = connected;
    }

    pub fn active_lights(&self) -> usize {
        self.rooms.values().filter(|room| room.light).count()
    }

    pub fn active_devices(&self) -> usize {
        self.devices.values().filter(|device| device.status).count()
    }

    /// Lights and devices left on while the house is empty.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        if self.presence.is_occupied() {
            return Vec::new();
        }

        let lights = self
            .rooms
            .iter()
            .filter(|(_, state)| state.light)
            .map(|(room, state)| Anomaly::light(room, state));

        let devices = self
            .devices
            .iter()
            .filter(|(_, state)| state.status)
            .map(|(device, state)| Anomaly::device(device, state));

        lights.chain(devices).collect()
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            status: self.occupancy(),
            mqtt_connected: self.bus_connected,
            degraded: !self.bus_connected,
            room_count: self.rooms.len(),
            active_lights: self.active_lights(),
            active_devices: self.active_devices(),
            presence: self.presence.bits(),
        }
    }

    pub fn room_table(&self) -> BTreeMap<RoomId, RoomResponse> {
        self.rooms
            .iter()
            .map(|(room, state)| {
                let response = RoomResponse {
                    name: state.name.clone(),
                    light: state.light,
                    occupied: state.occupied,
                    presence: self.presence.presence_of(room.as_str()).map(u8::from),
                };
                (room.clone(), response)
            })
            .collect()
    }

    pub fn device_table(&self) -> BTreeMap<DeviceId, DeviceResponse> {
        self.devices
            .iter()
            .map(|(device, state)| {
                let response = DeviceResponse {
                    name: state.name.clone(),
                    status: state.status,
                    room: state.room.clone(),
                    power: state.power,
                };
                (device.clone(), response)
            })
            .collect()
    }
}
