//! Mapping between logical (room, endpoint) pairs and bus topics.
//!
//! ```text
//! smarthome/deteksi/{room}                    presence sensor, payload 0/1
//! smarthome/{room}/{segment}                  endpoint status
//! smarthome/{room}/{segment}/perintah         endpoint command, payload 0/1
//! smarthome/lock                              derived occupancy lock, payload 0/1
//! ```
//!
//! A room may be spelled differently on the wire (`ruang_cuci` is `jemuran`
//! on the laundry hardware). The alias table says, per [`MessageClass`], which
//! spelling is used. Inbound topics always accept the canonical id, and accept
//! an alias only for the classes it is declared for. Everything returned from
//! this module carries canonical ids.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::models::{AliasSpec, DeviceId, DeviceSpec, Endpoint, RoomId, RoomSpec};

pub const TOPIC_ROOT: &str = "smarthome";
pub const SENSOR_LEVEL: &str = "deteksi";
pub const COMMAND_LEVEL: &str = "perintah";
pub const LIGHT_SEGMENT: &str = "lampu";
pub const LOCK_TOPIC: &str = "smarthome/lock";

const RESERVED_SEGMENTS: [&str; 4] = [SENSOR_LEVEL, COMMAND_LEVEL, LIGHT_SEGMENT, "lock"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClass {
    /// Presence readings from room sensors
    Sensor,
    /// Light and device state reported by hardware
    Status,
    /// Light commands sent to hardware
    LightCommand,
    /// Device commands sent to hardware
    DeviceCommand,
}

impl MessageClass {
    pub fn for_command(endpoint: &Endpoint) -> Self {
        match endpoint {
            Endpoint::Light => MessageClass::LightCommand,
            Endpoint::Device(_) => MessageClass::DeviceCommand,
        }
    }
}

/// A topic the registry understood. Unknown topics resolve to `None` and are
/// meant to be ignored, not treated as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundTopic {
    Sensor { room: RoomId },
    Status { room: RoomId, endpoint: Endpoint },
    Command { room: RoomId, endpoint: Endpoint },
}

impl InboundTopic {
    pub fn room(&self) -> &RoomId {
        match self {
            InboundTopic::Sensor { room }
            | InboundTopic::Status { room, .. }
            | InboundTopic::Command { room, .. } => room,
        }
    }
}

#[derive(Debug, Clone)]
struct Alias {
    room: RoomId,
    classes: BTreeSet<MessageClass>,
}

#[derive(Debug, Clone)]
pub struct TopicRegistry {
    rooms: BTreeSet<RoomId>,
    sensor_rooms: BTreeSet<RoomId>,
    device_segments: BTreeMap<DeviceId, String>,
    segment_devices: BTreeMap<String, DeviceId>,
    aliases: BTreeMap<String, Alias>,
}

impl TopicRegistry {
    pub fn new(
        rooms: &[RoomSpec],
        devices: &[DeviceSpec],
        aliases: &[AliasSpec],
    ) -> Result<Self, CatalogError> {
        let mut registry = Self {
            rooms: BTreeSet::new(),
            sensor_rooms: BTreeSet::new(),
            device_segments: BTreeMap::new(),
            segment_devices: BTreeMap::new(),
            aliases: BTreeMap::new(),
        };

        for room in rooms {
            validate_segment(room.id.as_str())?;
            if !registry.rooms.insert(room.id.clone()) {
                return Err(CatalogError::DuplicateRoom(room.id.as_str().into()));
            }
            if room.sensor {
                registry.sensor_rooms.insert(room.id.clone());
            }
        }

        for device in devices {
            let segment = device.segment();
            validate_segment(segment)?;

            if !registry.rooms.contains(&device.room) {
                return Err(CatalogError::UnknownRoom(device.room.as_str().into()));
            }
            if registry.device_segments.contains_key(&device.id) {
                return Err(CatalogError::DuplicateDevice(device.id.as_str().into()));
            }
            if registry.segment_devices.contains_key(segment) {
                return Err(CatalogError::DuplicateSegment(segment.into()));
            }

            registry
                .device_segments
                .insert(device.id.clone(), segment.into());
            registry
                .segment_devices
                .insert(segment.into(), device.id.clone());
        }

        for alias in aliases {
            validate_segment(&alias.segment)?;

            if !registry.rooms.contains(&alias.room) {
                return Err(CatalogError::UnknownRoom(alias.room.as_str().into()));
            }
            if registry.rooms.contains(alias.segment.as_str())
                || registry.aliases.contains_key(&alias.segment)
            {
                return Err(CatalogError::DuplicateSegment(alias.segment.clone()));
            }

            let classes: BTreeSet<MessageClass> = alias.classes.iter().copied().collect();

            // One outbound spelling per room and class.
            let ambiguous = registry.aliases.values().any(|other| {
                other.room == alias.room && other.classes.intersection(&classes).next().is_some()
            });
            if ambiguous {
                return Err(CatalogError::DuplicateSegment(alias.segment.clone()));
            }

            registry.aliases.insert(
                alias.segment.clone(),
                Alias {
                    room: alias.room.clone(),
                    classes,
                },
            );
        }

        Ok(registry)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.iter()
    }

    pub fn sensor_rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.sensor_rooms.iter()
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.device_segments.keys()
    }

    pub fn contains_room(&self, room: &str) -> bool {
        self.rooms.contains(room)
    }

    pub fn contains_device(&self, device: &str) -> bool {
        self.device_segments.contains_key(device)
    }

    pub fn device_segment(&self, device: &str) -> Option<&str> {
        self.device_segments.get(device).map(String::as_str)
    }

    pub fn device_for_segment(&self, segment: &str) -> Option<&DeviceId> {
        self.segment_devices.get(segment)
    }

    pub fn endpoint_segment(&self, endpoint: &Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::Light => Some(LIGHT_SEGMENT),
            Endpoint::Device(device) => self.device_segment(device.as_str()),
        }
    }

    /// Canonical room for a topic segment received under `class`.
    pub fn resolve_room(&self, segment: &str, class: MessageClass) -> Option<RoomId> {
        if let Some(room) = self.rooms.get(segment) {
            return Some(room.clone());
        }

        self.aliases
            .get(segment)
            .filter(|alias| alias.classes.contains(&class))
            .map(|alias| alias.room.clone())
    }

    /// Segment used for `room` on topics of `class`.
    pub fn room_segment(&self, room: &str, class: MessageClass) -> Option<&str> {
        let room = self.rooms.get(room)?;

        let alias = self
            .aliases
            .iter()
            .find(|(_, alias)| alias.room == *room && alias.classes.contains(&class))
            .map(|(segment, _)| segment.as_str());

        Some(alias.unwrap_or(room.as_str()))
    }

    pub fn resolve_inbound(&self, topic: &str) -> Option<InboundTopic> {
        let levels: Vec<&str> = topic.split('/').collect();

        match levels.as_slice() {
            [TOPIC_ROOT, SENSOR_LEVEL, room] => {
                let room = self.resolve_room(room, MessageClass::Sensor)?;
                if self.sensor_rooms.contains(&room) {
                    Some(InboundTopic::Sensor { room })
                } else {
                    None
                }
            }
            [TOPIC_ROOT, room, segment] => {
                let endpoint = self.resolve_endpoint(segment)?;
                let room = self.resolve_room(room, MessageClass::Status)?;
                Some(InboundTopic::Status { room, endpoint })
            }
            [TOPIC_ROOT, room, segment, COMMAND_LEVEL] => {
                let endpoint = self.resolve_endpoint(segment)?;
                let room = self.resolve_room(room, MessageClass::for_command(&endpoint))?;
                Some(InboundTopic::Command { room, endpoint })
            }
            _ => None,
        }
    }

    pub fn sensor_topic(&self, room: &str) -> Option<String> {
        if !self.sensor_rooms.contains(room) {
            return None;
        }
        let room = self.room_segment(room, MessageClass::Sensor)?;

        Some(format!("{TOPIC_ROOT}/{SENSOR_LEVEL}/{room}"))
    }

    pub fn status_topic(&self, room: &str, endpoint: &Endpoint) -> Option<String> {
        let segment = self.endpoint_segment(endpoint)?;
        let room = self.room_segment(room, MessageClass::Status)?;

        Some(format!("{TOPIC_ROOT}/{room}/{segment}"))
    }

    pub fn command_topic(&self, room: &str, device: &str) -> Option<String> {
        let segment = self.device_segment(device)?;
        let room = self.room_segment(room, MessageClass::DeviceCommand)?;

        Some(format!("{TOPIC_ROOT}/{room}/{segment}/{COMMAND_LEVEL}"))
    }

    pub fn light_topic(&self, room: &str) -> Option<String> {
        let room = self.room_segment(room, MessageClass::LightCommand)?;

        Some(format!("{TOPIC_ROOT}/{room}/{LIGHT_SEGMENT}/{COMMAND_LEVEL}"))
    }

    pub fn endpoint_command_topic(&self, room: &str, endpoint: &Endpoint) -> Option<String> {
        match endpoint {
            Endpoint::Light => self.light_topic(room),
            Endpoint::Device(device) => self.command_topic(room, device.as_str()),
        }
    }

    /// Every sensor and status topic, under each spelling accepted inbound.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = Vec::new();

        for room in &self.sensor_rooms {
            for segment in self.accepted_segments(room, MessageClass::Sensor) {
                topics.push(format!("{TOPIC_ROOT}/{SENSOR_LEVEL}/{segment}"));
            }
        }

        for room in &self.rooms {
            for segment in self.accepted_segments(room, MessageClass::Status) {
                topics.push(format!("{TOPIC_ROOT}/{segment}/{LIGHT_SEGMENT}"));
                for endpoint in self.segment_devices.keys() {
                    topics.push(format!("{TOPIC_ROOT}/{segment}/{endpoint}"));
                }
            }
        }

        topics
    }

    fn accepted_segments<'a>(&'a self, room: &'a RoomId, class: MessageClass) -> Vec<&'a str> {
        let mut segments = Vec::from([room.as_str()]);
        segments.extend(
            self.aliases
                .iter()
                .filter(|(_, alias)| alias.room == *room && alias.classes.contains(&class))
                .map(|(segment, _)| segment.as_str()),
        );
        segments
    }

    fn resolve_endpoint(&self, segment: &str) -> Option<Endpoint> {
        if segment == LIGHT_SEGMENT {
            return Some(Endpoint::Light);
        }

        self.device_for_segment(segment)
            .map(|device| Endpoint::Device(device.clone()))
    }
}

fn validate_segment(segment: &str) -> Result<(), CatalogError> {
    if segment.is_empty() || segment.contains(['/', '+', '#']) {
        return Err(CatalogError::InvalidSegment(segment.into()));
    }
    if RESERVED_SEGMENTS.contains(&segment) {
        return Err(CatalogError::ReservedSegment(segment.into()));
    }
    Ok(())
}

/// Binary command and lock payload. Hardware only understands `"1"` / `"0"`.
pub fn encode_binary(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

pub fn decode_binary(payload: &str) -> Option<bool> {
    match payload.trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Status payload: `{segment}/nyala` or `{segment}/mati`, bare `1`/`0` tolerated.
pub fn decode_status(segment: &str, payload: &str) -> Option<bool> {
    let payload = payload.trim();

    match payload
        .strip_prefix(segment)
        .and_then(|rest| rest.strip_prefix('/'))
    {
        Some("nyala") => Some(true),
        Some("mati") => Some(false),
        Some(_) => None,
        None => decode_binary(payload),
    }
}
