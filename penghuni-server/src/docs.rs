use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::handles::*;

#[derive(OpenApi)]
#[openapi(
    info(title = "Penghuni", description = "Occupancy-aware light and appliance control"),
    paths(
        get_status,
        get_rooms,
        get_devices,
        toggle_room_light,
        set_room_occupied,
        turn_off_all_lights,
        toggle_device,
        turn_off_all_devices,
        get_logs,
        get_notifications,
        clear_notifications,
        sse_handler,
    ),
    tags(
        (name = "house", description = "Occupancy and catalog snapshots"),
        (name = "control", description = "Light and device commands"),
        (name = "activity", description = "Logs, notifications and live events"),
    )
)]
pub struct ApiDoc;

pub fn docs_router() -> Router {
    Router::new().route("/api/openapi.json", get(get_openapi))
}

pub async fn get_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
