use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use penghuni_api::models::*;

use crate::services::{ActivityService, HouseService};

#[derive(Clone)]
pub struct ActivityState {
    pub house_service: Arc<HouseService>,
    pub activity_service: Arc<ActivityService>,
}

pub fn activity_router(activity_state: ActivityState) -> Router {
    Router::new()
        .route("/api/logs", get(get_logs))
        .route("/api/notifications", get(get_notifications))
        .route("/api/notification/clear", post(clear_notifications))
        .with_state(activity_state)
}

#[utoipa::path(
    get,
    path = "/api/logs",
    tag = "activity",
    responses(
        (status = 200, description = "Activity log, oldest first", body = Vec<LogEntry>)
    )
)]
pub async fn get_logs(State(state): State<ActivityState>) -> Json<Vec<LogEntry>> {
    Json(state.activity_service.logs().await)
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "activity",
    responses(
        (status = 200, description = "Current anomalies followed by stored notifications", body = Vec<Notification>)
    )
)]
pub async fn get_notifications(State(state): State<ActivityState>) -> Json<Vec<Notification>> {
    let anomalies = state.house_service.anomalies().await;

    Json(state.activity_service.notifications(&anomalies).await)
}

#[utoipa::path(
    post,
    path = "/api/notification/clear",
    tag = "activity",
    responses(
        (status = 200, description = "Notifications cleared", body = MessageResponse)
    )
)]
pub async fn clear_notifications(State(state): State<ActivityState>) -> Json<MessageResponse> {
    state.activity_service.clear_notifications().await;

    Json(MessageResponse {
        message: "Notifications cleared".to_string(),
    })
}
