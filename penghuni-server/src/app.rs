use std::sync::{Arc, Mutex};

use axum::Router;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::Settings;
use crate::docs::docs_router;
use crate::errors::HouseError;
use crate::handles::*;
use crate::models::House;
use crate::services::{
    ActivityService, BusAdapter, BusEvent, EventSink, HouseEvent, HouseService, LockService,
    MqttBus,
};

const EVENT_CAPACITY: usize = 256;

type Listeners = (broadcast::Receiver<HouseEvent>, broadcast::Receiver<HouseEvent>);

/// Services sharing one house and one event sink.
pub struct AppContext {
    pub house_service: Arc<HouseService>,
    pub activity_service: Arc<ActivityService>,
    pub lock_service: Arc<LockService>,
    pub events: EventSink,
    listeners: Mutex<Option<Listeners>>,
}

impl AppContext {
    pub fn new(settings: &Settings, bus: Arc<dyn BusAdapter>) -> Result<Self, HouseError> {
        let house = Arc::new(RwLock::new(House::new(&settings.house)?));
        let events = EventSink::new(EVENT_CAPACITY);

        // Subscribed before anything can emit so no event is missed.
        let listeners = (events.subscribe(), events.subscribe());

        Ok(Self {
            house_service: Arc::new(HouseService::new(house.clone(), bus.clone(), events.clone())),
            activity_service: Arc::new(ActivityService::new(&settings.activity)),
            lock_service: Arc::new(LockService::new(house, bus)),
            events,
            listeners: Mutex::new(Some(listeners)),
        })
    }

    /// Spawns the bus consumer and the event listeners. Listeners only start once.
    pub fn start(&self, receiver: mpsc::Receiver<BusEvent>) -> Vec<JoinHandle<()>> {
        let mut handles = vec![self.house_service.start_listening(receiver)];

        let listeners = self.listeners.lock().ok().and_then(|mut guard| guard.take());
        match listeners {
            Some((activity_receiver, lock_receiver)) => {
                handles.push(self.activity_service.start_listening(activity_receiver));
                handles.push(self.lock_service.start_listening(lock_receiver));
            }
            None => tracing::warn!("Event listeners already started"),
        }

        handles
    }
}

pub fn build_router(context: &AppContext) -> Router {
    let status = status_router(StatusState {
        house_service: context.house_service.clone(),
    });

    let control = control_router(ControlState {
        house_service: context.house_service.clone(),
    });

    let activity = activity_router(ActivityState {
        house_service: context.house_service.clone(),
        activity_service: context.activity_service.clone(),
    });

    let sse = sse_router(SseState {
        events: context.events.clone(),
    });

    Router::new()
        .merge(status)
        .merge(control)
        .merge(activity)
        .merge(sse)
        .merge(docs_router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn create_app(settings: &Arc<Settings>) -> anyhow::Result<Router> {
    let (sender, receiver) = mpsc::channel(settings.gateway.channel_capacity.max(1));

    let (bus, _event_loop) = MqttBus::start(&settings.gateway, sender);

    let context = AppContext::new(settings, Arc::new(bus))?;
    context.start(receiver);

    tracing::info!(
        "House ready with {} rooms, gateway at {}:{}",
        settings.house.rooms.len(),
        settings.gateway.host,
        settings.gateway.port
    );

    Ok(build_router(&context))
}
