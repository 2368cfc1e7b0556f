use std::collections::VecDeque;
use std::sync::Arc;

use penghuni_api::models::*;
use penghuni_api::policy::DenyReason;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tokio::sync::Mutex;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::event_bus::{ChangeSource, HouseEvent};
use crate::configs::Activity;
use crate::models::Anomaly;

const LOG_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const NOTIFICATION_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

/// Activity log and notification list for the dashboard, fed from house
/// events. Both lists are bounded; the oldest entry goes first.
pub struct ActivityService {
    logs: Mutex<VecDeque<LogEntry>>,
    notifications: Mutex<VecDeque<Notification>>,
    log_capacity: usize,
    notification_capacity: usize,
}

impl ActivityService {
    pub fn new(settings: &Activity) -> Self {
        Self {
            logs: Mutex::new(VecDeque::new()),
            notifications: Mutex::new(VecDeque::new()),
            log_capacity: settings.log_capacity.max(1),
            notification_capacity: settings.notification_capacity.max(1),
        }
    }

    pub fn start_listening(self: &Arc<Self>, mut receiver: Receiver<HouseEvent>) -> JoinHandle<()> {
        let service = self.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => service.handle(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Activity log skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn handle(&self, event: &HouseEvent) {
        match event {
            HouseEvent::OccupancyChanged(transition) => {
                self.add_log(
                    "House Status",
                    format!(
                        "Status changed from {} to {} ({})",
                        transition.from,
                        transition.to,
                        transition.reason()
                    ),
                )
                .await;
                self.add_notification(
                    NotificationKind::Info,
                    format!("House status: {}", transition.to),
                    None,
                )
                .await;
            }
            // Live anomalies come from the sweep in `notifications`; the log
            // keeps the history.
            HouseEvent::AnomalyDetected { kind, name, .. } => {
                let details = match kind {
                    AnomalyKind::LightOnWhileEmpty => {
                        format!("Light in {name} was on while the house was empty")
                    }
                    AnomalyKind::DeviceOnWhileEmpty => {
                        format!("{name} was running while the house was empty")
                    }
                };
                self.add_log("Anomaly", details).await;
            }
            HouseEvent::CommandRejected { name, reason, .. } => {
                let message = match (reason, name) {
                    (DenyReason::LightInUse, Some(name)) => {
                        format!("Light in {name} cannot be turned off while the house is occupied")
                    }
                    (DenyReason::BulkLightsWhileOccupied, _) => {
                        "Cannot turn off all lights while the house is occupied".to_string()
                    }
                    (DenyReason::BulkDevicesWhileOccupied, _) => {
                        "Cannot turn off all devices while the house is occupied".to_string()
                    }
                    (reason, None) => reason.to_string(),
                };
                self.add_notification(NotificationKind::Warning, message, None).await;
            }
            HouseEvent::CommandSent {
                topic,
                payload,
                delivered: false,
            } => {
                self.add_log("MQTT", format!("Not delivered [{topic}] -> {payload}"))
                    .await;
            }
            HouseEvent::CommandSent { .. } => {}
            HouseEvent::StateChanged {
                endpoint,
                name,
                on,
                source,
                ..
            } => {
                let verb = if *on { "Turned on" } else { "Turned off" };
                let (action, details) = match (source, endpoint) {
                    (ChangeSource::Control, Endpoint::Light) => {
                        ("Light Control", format!("{verb} light in {name}"))
                    }
                    (ChangeSource::Control, Endpoint::Device(_)) => {
                        ("Device Control", format!("{verb} {name}"))
                    }
                    (ChangeSource::Hardware, Endpoint::Light) => (
                        "Hardware Status",
                        format!("Light in {name} reported {}", on_off(*on)),
                    ),
                    (ChangeSource::Hardware, Endpoint::Device(_)) => {
                        ("Hardware Status", format!("{name} reported {}", on_off(*on)))
                    }
                };
                self.add_log(action, details).await;
            }
            HouseEvent::RoomOccupancySet { name, occupied, .. } => {
                let status = if *occupied { "occupied" } else { "empty" };
                self.add_log("Room Status", format!("{name} is now {status}"))
                    .await;
            }
            HouseEvent::BulkOff { lights: true, .. } => {
                self.add_log("Light Control", "Turned off all lights").await;
                self.add_notification(
                    NotificationKind::Info,
                    "All lights have been turned off",
                    None,
                )
                .await;
            }
            HouseEvent::BulkOff { lights: false, .. } => {
                self.add_log("Device Control", "Turned off all devices").await;
                self.add_notification(
                    NotificationKind::Info,
                    "All devices have been turned off",
                    None,
                )
                .await;
            }
            HouseEvent::BusConnection { connected: true } => {
                self.add_log("MQTT", "Connected to broker").await;
            }
            HouseEvent::BusConnection { connected: false } => {
                self.add_log("MQTT", "Disconnected from broker").await;
            }
        }
    }

    pub async fn add_log(&self, action: impl Into<String>, details: impl Into<String>) {
        let entry = LogEntry {
            timestamp: now(LOG_FORMAT),
            action: action.into(),
            details: details.into(),
        };

        let mut logs = self.logs.lock().await;
        logs.push_back(entry);
        while logs.len() > self.log_capacity {
            logs.pop_front();
        }
    }

    pub async fn add_notification(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        sound_type: Option<SoundType>,
    ) {
        let notification = Notification {
            id: 0,
            timestamp: now(NOTIFICATION_FORMAT),
            kind,
            message: message.into(),
            sound_type,
        };

        let mut notifications = self.notifications.lock().await;
        notifications.push_back(notification);
        while notifications.len() > self.notification_capacity {
            notifications.pop_front();
        }
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().await.iter().cloned().collect()
    }

    /// Anomalies of the current snapshot followed by the stored list, ids
    /// numbered by position.
    pub async fn notifications(&self, anomalies: &[Anomaly]) -> Vec<Notification> {
        let timestamp = now(NOTIFICATION_FORMAT);

        let sweep = anomalies.iter().map(|anomaly| Notification {
            id: 0,
            timestamp: timestamp.clone(),
            kind: anomaly_level(anomaly.kind),
            message: anomaly.message(),
            sound_type: Some(anomaly.kind.sound()),
        });

        let stored: Vec<Notification> = self.notifications.lock().await.iter().cloned().collect();

        sweep
            .chain(stored)
            .enumerate()
            .map(|(index, mut notification)| {
                notification.id = index as u64 + 1;
                notification
            })
            .collect()
    }

    pub async fn clear_notifications(&self) {
        self.notifications.lock().await.clear();
    }
}

fn anomaly_level(kind: AnomalyKind) -> NotificationKind {
    match kind {
        AnomalyKind::LightOnWhileEmpty => NotificationKind::Warning,
        AnomalyKind::DeviceOnWhileEmpty => NotificationKind::Danger,
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn now(format: &[BorrowedFormatItem<'static>]) -> String {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(format)
        .unwrap_or_default()
}
