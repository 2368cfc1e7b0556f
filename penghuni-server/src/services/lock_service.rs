use std::sync::Arc;

use penghuni_api::topic::{LOCK_TOPIC, encode_binary};
use tokio::sync::RwLock;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::bus_service::BusAdapter;
use super::event_bus::HouseEvent;
use crate::errors::{BusError, HouseError};
use crate::models::House;

/// Mirrors the occupancy lock onto `smarthome/lock` for the endpoints.
/// Published on every transition and again whenever the bus reconnects.
pub struct LockService {
    house: Arc<RwLock<House>>,
    bus: Arc<dyn BusAdapter>,
}

impl LockService {
    pub fn new(house: Arc<RwLock<House>>, bus: Arc<dyn BusAdapter>) -> Self {
        Self { house, bus }
    }

    pub fn start_listening(self: &Arc<Self>, mut receiver: Receiver<HouseEvent>) -> JoinHandle<()> {
        let service = self.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if let Err(e) = service.handle(&event).await {
                            tracing::warn!("Lock not published: {}", e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Lock publisher skipped {} events, resynchronising",
                            skipped
                        );
                        if let Err(e) = service.publish_current().await {
                            tracing::warn!("Lock not published: {}", e);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Returns the published lock value, `None` when the event does not concern the lock.
    pub async fn handle(&self, event: &HouseEvent) -> Result<Option<bool>, HouseError> {
        match event {
            HouseEvent::OccupancyChanged(transition) => {
                let locked = transition.to.is_occupied();
                self.publish(locked).await?;
                Ok(Some(locked))
            }
            HouseEvent::BusConnection { connected: true } => self.publish_current().await.map(Some),
            _ => Ok(None),
        }
    }

    async fn publish_current(&self) -> Result<bool, HouseError> {
        let locked = self.house.read().await.presence().is_occupied();
        self.publish(locked).await?;
        Ok(locked)
    }

    async fn publish(&self, locked: bool) -> Result<(), HouseError> {
        match self.bus.publish(LOCK_TOPIC, encode_binary(locked)).await {
            Ok(()) => {
                if locked {
                    tracing::info!("Lock engaged, someone is home");
                } else {
                    tracing::info!("Lock released, house is empty");
                }
                Ok(())
            }
            Err(BusError::Disconnected) => Err(HouseError::BusUnavailable),
            Err(e) => {
                tracing::error!("Failed to publish lock: {}", e);
                Err(HouseError::BusUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use penghuni_api::models::Occupancy;
    use penghuni_api::presence::Transition;

    use super::*;
    use crate::tests::{RecordingBus, test_settings};

    fn setup() -> (LockService, Arc<RwLock<House>>, Arc<RecordingBus>) {
        let house = Arc::new(RwLock::new(House::new(&test_settings().house).unwrap()));
        let bus = Arc::new(RecordingBus::connected());

        (LockService::new(house.clone(), bus.clone()), house, bus)
    }

    fn transition(to: Occupancy) -> HouseEvent {
        let from = if to.is_occupied() {
            Occupancy::Empty
        } else {
            Occupancy::Occupied
        };
        HouseEvent::OccupancyChanged(Transition {
            from,
            to,
            room: "kamar1".into(),
            present: to.is_occupied(),
        })
    }

    #[tokio::test]
    async fn test_publishes_on_transition() {
        let (service, _house, bus) = setup();

        assert_eq!(service.handle(&transition(Occupancy::Occupied)).await, Ok(Some(true)));
        assert_eq!(service.handle(&transition(Occupancy::Empty)).await, Ok(Some(false)));

        assert_eq!(bus.published_to("smarthome/lock"), vec!["1", "0"]);
    }

    #[tokio::test]
    async fn test_republishes_on_reconnect() {
        let (service, house, bus) = setup();
        house.write().await.set_presence("dapur", true).unwrap();

        let result = service
            .handle(&HouseEvent::BusConnection { connected: true })
            .await;

        assert_eq!(result, Ok(Some(true)));
        assert_eq!(bus.published(), vec![("smarthome/lock".to_string(), "1".to_string())]);
    }

    #[tokio::test]
    async fn test_other_events_ignored() {
        let (service, _house, bus) = setup();

        let result = service
            .handle(&HouseEvent::BusConnection { connected: false })
            .await;

        assert_eq!(result, Ok(None));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_bus() {
        let (service, _house, bus) = setup();
        bus.set_connected(false);

        assert_eq!(
            service.handle(&transition(Occupancy::Occupied)).await,
            Err(HouseError::BusUnavailable)
        );
    }
}
