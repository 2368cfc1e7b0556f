use axum::http::StatusCode;
use penghuni_api::policy::DenyReason;
use penghuni_api::{CatalogError, DeviceId, PresenceError, RoomId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HouseError {
    #[error("Room not found: {0}")]
    UnknownRoom(RoomId),

    #[error("Device not found: {0}")]
    UnknownDevice(DeviceId),

    #[error("No route for {0}")]
    Unroutable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(DenyReason),

    #[error("Message bus unavailable")]
    BusUnavailable,

    #[error("Malformed payload on {topic}: {payload:?}")]
    MalformedPayload { topic: String, payload: String },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(CatalogError),
}

impl HouseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HouseError::UnknownRoom(_) => StatusCode::NOT_FOUND,
            HouseError::UnknownDevice(_) => StatusCode::NOT_FOUND,
            HouseError::Unroutable(_) => StatusCode::BAD_REQUEST,
            HouseError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            HouseError::BusUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            HouseError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            HouseError::InvalidCatalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Gateway result kind: the command could not be addressed at all.
    pub fn is_unroutable(&self) -> bool {
        matches!(
            self,
            HouseError::UnknownRoom(_) | HouseError::UnknownDevice(_) | HouseError::Unroutable(_)
        )
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            HouseError::PermissionDenied(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<PresenceError> for HouseError {
    fn from(error: PresenceError) -> Self {
        match error {
            PresenceError::UnknownRoom(room) => HouseError::UnknownRoom(room),
        }
    }
}

impl From<CatalogError> for HouseError {
    fn from(error: CatalogError) -> Self {
        HouseError::InvalidCatalog(error)
    }
}
