use std::convert::Infallible;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use axum::Router;
use tokio_stream::StreamExt;
use tokio_stream::{Stream, wrappers};

use crate::services::EventSink;

#[derive(Clone)]
pub struct SseState {
    pub events: EventSink,
}

pub fn sse_router(sse_state: SseState) -> Router {
    Router::new()
        .route("/api/events", get(sse_handler))
        .with_state(sse_state)
}

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "activity",
    responses(
        (status = 200, description = "text/event-stream of house events, one JSON object per event")
    )
)]
pub async fn sse_handler(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();

    let stream = wrappers::BroadcastStream::new(receiver).filter_map(|result| match result {
        Ok(event) => match Event::default().event(event.name()).json_data(&event) {
            Ok(data) => Some(Ok(data)),
            Err(e) => {
                tracing::warn!("Failed to encode event: {}", e);
                None
            }
        },
        Err(e) => {
            tracing::debug!("Event stream lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
