use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use penghuni_api::models::*;

use crate::services::HouseService;

#[derive(Clone)]
pub struct StatusState {
    pub house_service: Arc<HouseService>,
}

pub fn status_router(status_state: StatusState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/rooms", get(get_rooms))
        .route("/api/devices", get(get_devices))
        .with_state(status_state)
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = "house",
    responses(
        (status = 200, description = "Occupancy lock, bus state and counters", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<StatusState>) -> Json<StatusResponse> {
    Json(state.house_service.status().await)
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "house",
    responses(
        (status = 200, description = "Room table keyed by room id", body = BTreeMap<String, RoomResponse>)
    )
)]
pub async fn get_rooms(State(state): State<StatusState>) -> Json<BTreeMap<RoomId, RoomResponse>> {
    Json(state.house_service.rooms().await)
}

#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "house",
    responses(
        (status = 200, description = "Device table keyed by device id", body = BTreeMap<String, DeviceResponse>)
    )
)]
pub async fn get_devices(
    State(state): State<StatusState>,
) -> Json<BTreeMap<DeviceId, DeviceResponse>> {
    Json(state.house_service.devices().await)
}
