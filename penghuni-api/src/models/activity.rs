use alloc::string::String;

use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Local wall-clock time (UTC when the offset is unknown), `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    /// Category of the activity
    pub action: String,
    pub details: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    Danger,
}

/// Alert sound the dashboard plays for a notification.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundType {
    Light,
    Device,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    /// `HH:MM:SS`
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub sound_type: Option<SoundType>,
}

/// Something left running while the house is empty.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    LightOnWhileEmpty,
    DeviceOnWhileEmpty,
}

impl AnomalyKind {
    pub fn sound(self) -> SoundType {
        match self {
            AnomalyKind::LightOnWhileEmpty => SoundType::Light,
            AnomalyKind::DeviceOnWhileEmpty => SoundType::Device,
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
