pub mod api;
pub mod bus;
pub mod house;

pub use api::ApiError;
pub use bus::BusError;
pub use house::HouseError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, reason, error_id) = match self {
            ApiError::HouseError(HouseError::InvalidCatalog(e)) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Catalog error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                    Some(error_id.to_string()),
                )
            }
            ApiError::HouseError(e) => (
                e.status_code(),
                e.to_string(),
                e.deny_reason().map(|reason| reason.code()),
                None,
            ),
            ApiError::InternalError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                    Some(error_id.to_string()),
                )
            }
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        if let Some(reason) = reason {
            error_obj["reason"] = json!(reason);
        }

        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use penghuni_api::policy::DenyReason;

    use super::*;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_permission_denied_carries_reason() {
        let (status, body) =
            body_of(HouseError::PermissionDenied(DenyReason::LightInUse).into()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], json!(403));
        assert_eq!(body["error"]["reason"], json!("light_in_use"));
        assert_eq!(
            body["error"]["message"],
            json!("Permission denied: occupied, cannot turn off")
        );
        assert!(body["error"].get("error_id").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_is_masked() {
        let (status, body) = body_of(anyhow::anyhow!("socket closed").into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], json!("Internal server error"));
        assert!(body["error"]["error_id"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_room_is_not_found() {
        let (status, body) = body_of(HouseError::UnknownRoom("garasi".into()).into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], json!("Room not found: garasi"));
    }
}
