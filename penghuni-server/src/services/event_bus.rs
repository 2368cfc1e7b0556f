use penghuni_api::models::{AnomalyKind, Endpoint, RoomId};
use penghuni_api::policy::DenyReason;
use penghuni_api::presence::Transition;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::Anomaly;

/// Where a light or device state change came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// A control-surface command
    Control,
    /// A status report from the hardware
    Hardware,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HouseEvent {
    OccupancyChanged(Transition),
    AnomalyDetected {
        kind: AnomalyKind,
        subject: String,
        name: String,
    },
    CommandRejected {
        room: Option<RoomId>,
        endpoint: Option<Endpoint>,
        name: Option<String>,
        reason: DenyReason,
    },
    CommandSent {
        topic: String,
        payload: String,
        delivered: bool,
    },
    StateChanged {
        room: RoomId,
        endpoint: Endpoint,
        name: String,
        on: bool,
        source: ChangeSource,
    },
    RoomOccupancySet {
        room: RoomId,
        name: String,
        occupied: bool,
    },
    BulkOff {
        lights: bool,
        affected: usize,
    },
    BusConnection {
        connected: bool,
    },
}

impl HouseEvent {
    /// Matches the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            HouseEvent::OccupancyChanged(_) => "occupancy_changed",
            HouseEvent::AnomalyDetected { .. } => "anomaly_detected",
            HouseEvent::CommandRejected { .. } => "command_rejected",
            HouseEvent::CommandSent { .. } => "command_sent",
            HouseEvent::StateChanged { .. } => "state_changed",
            HouseEvent::RoomOccupancySet { .. } => "room_occupancy_set",
            HouseEvent::BulkOff { .. } => "bulk_off",
            HouseEvent::BusConnection { .. } => "bus_connection",
        }
    }
}

impl From<Anomaly> for HouseEvent {
    fn from(anomaly: Anomaly) -> Self {
        HouseEvent::AnomalyDetected {
            kind: anomaly.kind,
            subject: anomaly.subject,
            name: anomaly.name,
        }
    }
}

/// Fan-out of house events. Emitting never blocks and never fails; with no
/// listener the event is dropped.
#[derive(Clone, Debug)]
pub struct EventSink {
    sender: broadcast::Sender<HouseEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event: HouseEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::debug!("No listener for house event: {:?}", e.0);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HouseEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
