use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use penghuni_api::models::*;

use crate::errors::ApiError;
use crate::services::HouseService;

#[derive(Clone)]
pub struct ControlState {
    pub house_service: Arc<HouseService>,
}

pub fn control_router(control_state: ControlState) -> Router {
    Router::new()
        .route("/api/room/:room_id/toggle", post(toggle_room_light))
        .route("/api/room/:room_id/occupied", post(set_room_occupied))
        .route("/api/lights/all/off", post(turn_off_all_lights))
        .route("/api/device/:device_id/toggle", post(toggle_device))
        .route("/api/devices/all/off", post(turn_off_all_devices))
        .with_state(control_state)
}

#[utoipa::path(
    post,
    path = "/api/room/{room_id}/toggle",
    tag = "control",
    params(
        ("room_id" = String, Path, description = "Room ID")
    ),
    responses(
        (status = 200, description = "Light toggled", body = LightResponse),
        (status = 403, description = "Light in use while the house is occupied"),
        (status = 404, description = "Room not found")
    )
)]
pub async fn toggle_room_light(
    State(state): State<ControlState>,
    Path(room_id): Path<String>,
) -> Result<Json<LightResponse>, ApiError> {
    let response = state.house_service.toggle_light(&room_id).await?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/room/{room_id}/occupied",
    tag = "control",
    params(
        ("room_id" = String, Path, description = "Room ID")
    ),
    request_body = OccupancyRequest,
    responses(
        (status = 200, description = "Room flag updated", body = OccupancyResponse),
        (status = 404, description = "Room not found")
    )
)]
pub async fn set_room_occupied(
    State(state): State<ControlState>,
    Path(room_id): Path<String>,
    Json(body): Json<OccupancyRequest>,
) -> Result<Json<OccupancyResponse>, ApiError> {
    let response = state
        .house_service
        .set_occupancy(&room_id, body.occupied)
        .await?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/lights/all/off",
    tag = "control",
    responses(
        (status = 200, description = "All lights switched off", body = BulkResponse),
        (status = 403, description = "House is occupied")
    )
)]
pub async fn turn_off_all_lights(
    State(state): State<ControlState>,
) -> Result<Json<BulkResponse>, ApiError> {
    Ok(Json(state.house_service.turn_off_all_lights().await?))
}

#[utoipa::path(
    post,
    path = "/api/device/{device_id}/toggle",
    tag = "control",
    params(
        ("device_id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Device toggled", body = DeviceToggleResponse),
        (status = 404, description = "Device not found")
    )
)]
pub async fn toggle_device(
    State(state): State<ControlState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceToggleResponse>, ApiError> {
    let response = state.house_service.toggle_device(&device_id).await?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/devices/all/off",
    tag = "control",
    responses(
        (status = 200, description = "All devices switched off", body = BulkResponse),
        (status = 403, description = "House is occupied")
    )
)]
pub async fn turn_off_all_devices(
    State(state): State<ControlState>,
) -> Result<Json<BulkResponse>, ApiError> {
    Ok(Json(state.house_service.turn_off_all_devices().await?))
}
