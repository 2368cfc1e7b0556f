use core::fmt;

use alloc::string::String;

use crate::models::RoomId;

/// Rejected room/device/alias catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Room id declared twice
    DuplicateRoom(String),
    /// Device id declared twice
    DuplicateDevice(String),
    /// Two devices, or a device and an alias, share a topic segment
    DuplicateSegment(String),
    /// Segment collides with a fixed topic level
    ReservedSegment(String),
    /// Segment is empty or contains `/`, `+` or `#`
    InvalidSegment(String),
    /// Device or alias refers to a room that is not in the catalog
    UnknownRoom(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRoom(id) => write!(f, "Duplicate room: {}", id),
            Self::DuplicateDevice(id) => write!(f, "Duplicate device: {}", id),
            Self::DuplicateSegment(segment) => write!(f, "Duplicate topic segment: {}", segment),
            Self::ReservedSegment(segment) => write!(f, "Reserved topic segment: {}", segment),
            Self::InvalidSegment(segment) => write!(f, "Invalid topic segment: {:?}", segment),
            Self::UnknownRoom(id) => write!(f, "Unknown room in catalog: {}", id),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceError {
    /// Room has no presence sensor registered
    UnknownRoom(RoomId),
}

impl fmt::Display for PresenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRoom(room) => write!(f, "Unknown presence room: {}", room),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PresenceError {}
