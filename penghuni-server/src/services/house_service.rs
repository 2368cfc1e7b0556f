use std::collections::BTreeMap;
use std::sync::Arc;

use penghuni_api::models::*;
use penghuni_api::presence::PresenceUpdate;
use penghuni_api::topic::{InboundTopic, decode_binary, decode_status};
use tokio::sync::RwLock;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

use super::bus_service::{BusAdapter, BusEvent};
use super::event_bus::{ChangeSource, EventSink, HouseEvent};
use super::gateway_service::{BulkTarget, CommandGateway, Desired, Published};
use crate::errors::HouseError;
use crate::models::{Anomaly, House};

/// Owner of the house state. Inbound bus traffic and control requests both
/// go through here; nothing else mutates the house.
pub struct HouseService {
    house: Arc<RwLock<House>>,
    gateway: CommandGateway,
    bus: Arc<dyn BusAdapter>,
    events: EventSink,
}

impl HouseService {
    pub fn new(house: Arc<RwLock<House>>, bus: Arc<dyn BusAdapter>, events: EventSink) -> Self {
        Self {
            house,
            gateway: CommandGateway::new(bus.clone(), events.clone()),
            bus,
            events,
        }
    }

    pub fn house(&self) -> &Arc<RwLock<House>> {
        &self.house
    }

    /// Applies bus events one at a time, in arrival order.
    pub fn start_listening(self: &Arc<Self>, mut receiver: Receiver<BusEvent>) -> JoinHandle<()> {
        let service = self.clone();

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                service.handle_bus_event(event).await;
            }
            tracing::debug!("Bus event channel closed");
        })
    }

    pub async fn handle_bus_event(&self, event: BusEvent) {
        match event {
            BusEvent::Connected => self.connection_changed(true).await,
            BusEvent::Disconnected => self.connection_changed(false).await,
            BusEvent::Message { topic, payload } => {
                if let Err(e) = self.handle_message(&topic, &payload).await {
                    tracing::warn!("Dropped message on {}: {}", topic, e);
                }
            }
        }
    }

    async fn connection_changed(&self, connected: bool) {
        let subscriptions = {
            let mut house = self.house.write().await;
            house.set_bus_connected(connected);
            house.registry().subscriptions()
        };

        if connected {
            tracing::info!("Bus connected, subscribing {} topics", subscriptions.len());

            // The subscribe request is served by the same event loop that
            // feeds this consumer.
            let bus = self.bus.clone();
            tokio::spawn(async move {
                if let Err(e) = bus.subscribe_many(&subscriptions).await {
                    tracing::error!("Failed to subscribe: {}", e);
                }
            });
        } else {
            tracing::warn!("Bus disconnected, commands will not reach hardware");
        }

        self.events.emit(HouseEvent::BusConnection { connected });
    }

    /// Topics the registry does not know are ignored and return `Ok`.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> Result<(), HouseError> {
        let inbound = {
            let house = self.house.read().await;
            house.registry().resolve_inbound(topic)
        };

        let Some(inbound) = inbound else {
            tracing::debug!("Ignore unmatched topic {}", topic);
            return Ok(());
        };

        let malformed = || HouseError::MalformedPayload {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        };
        let text = std::str::from_utf8(payload).map_err(|_| malformed())?;

        match inbound {
            InboundTopic::Sensor { room } => {
                let present = decode_binary(text).ok_or_else(malformed)?;
                self.apply_presence(&room, present).await
            }
            InboundTopic::Status { room, endpoint } => {
                let segment = {
                    let house = self.house.read().await;
                    house
                        .registry()
                        .endpoint_segment(&endpoint)
                        .map(str::to_string)
                        .ok_or_else(|| HouseError::Unroutable(topic.to_string()))?
                };
                let on = decode_status(&segment, text).ok_or_else(malformed)?;
                self.apply_status(&room, &endpoint, on).await
            }
            InboundTopic::Command { room, endpoint } => {
                tracing::debug!("Ignore command echo for {} in {}", endpoint, room);
                Ok(())
            }
        }
    }

    async fn apply_presence(&self, room: &RoomId, present: bool) -> Result<(), HouseError> {
        let (update, anomalies) = {
            let mut house = self.house.write().await;
            let update = house.set_presence(room.as_str(), present)?;

            let anomalies = match update.transition() {
                Some(transition) if !transition.to.is_occupied() => house.anomalies(),
                _ => Vec::new(),
            };

            (update, anomalies)
        };

        tracing::debug!("Presence {} = {}", room, u8::from(present));

        if let PresenceUpdate::Transition(transition) = update {
            tracing::info!("Occupancy changed: {}", transition.reason());
            self.events.emit(HouseEvent::OccupancyChanged(transition));
        }
        for anomaly in anomalies {
            self.events.emit(anomaly.into());
        }

        Ok(())
    }

    async fn apply_status(
        &self,
        room: &RoomId,
        endpoint: &Endpoint,
        on: bool,
    ) -> Result<(), HouseError> {
        let changed = {
            let mut house = self.house.write().await;

            if house.set_endpoint(room.as_str(), endpoint, on)? {
                let name = match endpoint {
                    Endpoint::Light => house.room(room.as_str())?.name.clone(),
                    Endpoint::Device(device) => house.device(device.as_str())?.name.clone(),
                };
                Some((name, on))
            } else {
                None
            }
        };

        if let Some((name, on)) = changed {
            tracing::debug!("Status of {} in {} reported {}", endpoint, room, on);
            self.events.emit(HouseEvent::StateChanged {
                room: room.clone(),
                endpoint: endpoint.clone(),
                name,
                on,
                source: ChangeSource::Hardware,
            });
        }

        Ok(())
    }

    pub async fn status(&self) -> StatusResponse {
        self.house.read().await.status()
    }

    pub async fn rooms(&self) -> BTreeMap<RoomId, RoomResponse> {
        self.house.read().await.room_table()
    }

    pub async fn devices(&self) -> BTreeMap<DeviceId, DeviceResponse> {
        self.house.read().await.device_table()
    }

    pub async fn anomalies(&self) -> Vec<Anomaly> {
        self.house.read().await.anomalies()
    }

    pub async fn toggle_light(&self, room: &str) -> Result<LightResponse, HouseError> {
        let published = self
            .gateway
            .send(&self.house, room, &Endpoint::Light, Desired::Toggle)
            .await?;

        Ok(LightResponse {
            room_id: published.command.room.clone(),
            light: published.command.on,
            delivered: published.delivered,
            degraded: self.degraded(&published).await,
        })
    }

    pub async fn toggle_device(&self, device: &str) -> Result<DeviceToggleResponse, HouseError> {
        let room = self.house.read().await.device(device)?.room.clone();
        let endpoint = Endpoint::Device(device.into());

        let published = self
            .gateway
            .send(&self.house, room.as_str(), &endpoint, Desired::Toggle)
            .await?;

        Ok(DeviceToggleResponse {
            device_id: device.into(),
            status: published.command.on,
            delivered: published.delivered,
            degraded: self.degraded(&published).await,
        })
    }

    /// Sets the room's local flag only; the occupancy lock follows sensors.
    pub async fn set_occupancy(
        &self,
        room: &str,
        occupied: bool,
    ) -> Result<OccupancyResponse, HouseError> {
        let name = {
            let mut house = self.house.write().await;
            house.set_room_occupied(room, occupied)?.name.clone()
        };

        self.events.emit(HouseEvent::RoomOccupancySet {
            room: room.into(),
            name,
            occupied,
        });

        Ok(OccupancyResponse {
            room_id: room.into(),
            occupied,
        })
    }

    pub async fn turn_off_all_lights(&self) -> Result<BulkResponse, HouseError> {
        self.turn_off_all(BulkTarget::Lights).await
    }

    pub async fn turn_off_all_devices(&self) -> Result<BulkResponse, HouseError> {
        self.turn_off_all(BulkTarget::Devices).await
    }

    async fn turn_off_all(&self, target: BulkTarget) -> Result<BulkResponse, HouseError> {
        let result = self.gateway.send_all_off(&self.house, target).await?;
        let delivered = result.delivered();

        let message = match target {
            BulkTarget::Lights => "All lights turned off",
            BulkTarget::Devices => "All devices turned off",
        };

        Ok(BulkResponse {
            message: message.to_string(),
            affected: result.affected,
            delivered,
            degraded: delivered < result.published.len()
                || !self.house.read().await.bus_connected(),
        })
    }

    async fn degraded(&self, published: &Published) -> bool {
        !published.delivered || !self.house.read().await.bus_connected()
    }
}

#[cfg(test)]
mod tests {
    use penghuni_api::policy::DenyReason;

    use super::*;
    use crate::tests::{RecordingBus, test_settings};

    fn setup() -> (HouseService, Arc<RecordingBus>, EventSink) {
        let bus = Arc::new(RecordingBus::connected());
        let events = EventSink::new(64);
        let house = Arc::new(RwLock::new(House::new(&test_settings().house).unwrap()));

        (HouseService::new(house, bus.clone(), events.clone()), bus, events)
    }

    fn message(topic: &str, payload: &str) -> BusEvent {
        BusEvent::Message {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_occupied_house_keeps_lights_on() {
        let (service, _bus, _events) = setup();
        service.handle_bus_event(BusEvent::Connected).await;

        service.handle_bus_event(message("smarthome/deteksi/kamar1", "1")).await;
        assert_eq!(service.status().await.status, Occupancy::Occupied);

        let light = service.toggle_light("kamar1").await.unwrap();
        assert!(light.light);
        assert!(light.delivered);
        assert!(!light.degraded);

        assert_eq!(
            service.toggle_light("kamar1").await,
            Err(HouseError::PermissionDenied(DenyReason::LightInUse))
        );
        assert_eq!(
            HouseError::PermissionDenied(DenyReason::LightInUse)
                .deny_reason()
                .map(|reason| reason.to_string()),
            Some("occupied, cannot turn off".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_house_turns_everything_off() {
        let (service, _bus, _events) = setup();
        service.handle_bus_event(BusEvent::Connected).await;
        service.toggle_device("kompor").await.unwrap();
        service.toggle_device("mesin_cuci").await.unwrap();

        let response = service.turn_off_all_devices().await.unwrap();

        assert_eq!(response.affected, 2);
        assert_eq!(response.delivered, 4);
        assert!(service.devices().await.values().all(|device| !device.status));
    }

    #[tokio::test]
    async fn test_alias_sensor_updates_canonical_room() {
        let (service, _bus, events) = setup();
        let mut receiver = events.subscribe();

        service.handle_bus_event(message("smarthome/deteksi/jemuran", "1")).await;
        let via_alias = service.rooms().await["ruang_cuci"].clone();

        service.handle_bus_event(message("smarthome/deteksi/ruang_cuci", "0")).await;
        service.handle_bus_event(message("smarthome/deteksi/ruang_cuci", "1")).await;
        let via_canonical = service.rooms().await["ruang_cuci"].clone();

        assert_eq!(via_alias, via_canonical);
        assert_eq!(via_alias.presence, Some(1));
        assert!(via_alias.occupied);

        let mut transitions = 0;
        while let Ok(event) = receiver.try_recv() {
            if matches!(event, HouseEvent::OccupancyChanged(_)) {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 3);
    }

    #[tokio::test]
    async fn test_malformed_presence_is_rejected() {
        let (service, _bus, _events) = setup();

        let result = service.handle_message("smarthome/deteksi/dapur", b"yes").await;

        assert_eq!(
            result,
            Err(HouseError::MalformedPayload {
                topic: "smarthome/deteksi/dapur".to_string(),
                payload: "yes".to_string(),
            })
        );
        assert_eq!(service.status().await.presence["dapur"], 0);
    }

    #[tokio::test]
    async fn test_unknown_topics_are_ignored() {
        let (service, _bus, _events) = setup();

        assert_eq!(service.handle_message("smarthome/garasi/lampu", b"1").await, Ok(()));
        assert_eq!(service.handle_message("weather/today", b"rain").await, Ok(()));
        assert_eq!(
            service
                .handle_message("smarthome/kamar1/lampu/perintah", b"1")
                .await,
            Ok(())
        );
        assert!(!service.rooms().await["kamar1"].light);
    }

    #[tokio::test]
    async fn test_status_reports_update_tables() {
        let (service, _bus, events) = setup();
        let mut receiver = events.subscribe();

        service.handle_bus_event(message("smarthome/jemuran/lampu", "lampu/nyala")).await;
        service.handle_bus_event(message("smarthome/jemuran/pompa", "pompa/nyala")).await;
        service.handle_bus_event(message("smarthome/dapur/kompor", "1")).await;
        service.handle_bus_event(message("smarthome/dapur/kompor", "kompor/mati")).await;

        assert!(service.rooms().await["ruang_cuci"].light);
        assert!(service.devices().await["pompa_air"].status);
        assert!(!service.devices().await["kompor"].status);

        let mut changes = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let HouseEvent::StateChanged { endpoint, on, source, .. } = event {
                assert_eq!(source, ChangeSource::Hardware);
                changes.push((endpoint, on));
            }
        }
        assert_eq!(changes.len(), 4);
    }

    #[tokio::test]
    async fn test_disconnect_marks_degraded() {
        let (service, bus, _events) = setup();
        service.handle_bus_event(BusEvent::Connected).await;
        service.handle_bus_event(BusEvent::Disconnected).await;
        bus.set_connected(false);

        let light = service.toggle_light("dapur").await.unwrap();

        assert!(light.light);
        assert!(!light.delivered);
        assert!(light.degraded);
        assert!(!service.status().await.mqtt_connected);
        assert!(service.status().await.degraded);
    }

    #[tokio::test]
    async fn test_connect_subscribes_every_spelling() {
        let (service, bus, _events) = setup();

        service.handle_bus_event(BusEvent::Connected).await;
        tokio::task::yield_now().await;

        let expected = service.house().read().await.registry().subscriptions();
        for _ in 0..10 {
            if bus.subscriptions().len() == expected.len() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(bus.subscriptions(), expected);
    }

    #[tokio::test]
    async fn test_manual_occupancy_only_sets_flag() {
        let (service, _bus, _events) = setup();

        let response = service.set_occupancy("kamar3", true).await.unwrap();

        assert!(response.occupied);
        assert!(service.rooms().await["kamar3"].occupied);
        assert_eq!(service.status().await.status, Occupancy::Empty);
        assert_eq!(
            service.set_occupancy("garasi", true).await,
            Err(HouseError::UnknownRoom("garasi".into()))
        );
    }

    #[tokio::test]
    async fn test_malformed_status_leaves_state() {
        let (service, _bus, events) = setup();
        service.handle_bus_event(message("smarthome/dapur/kompor", "1")).await;
        let mut receiver = events.subscribe();

        let result = service
            .handle_message("smarthome/dapur/kompor", b"kompor/rusak")
            .await;
        assert_eq!(
            result,
            Err(HouseError::MalformedPayload {
                topic: "smarthome/dapur/kompor".to_string(),
                payload: "kompor/rusak".to_string(),
            })
        );
        assert!(service.devices().await["kompor"].status);

        let result = service
            .handle_message("smarthome/dapur/lampu", b"kompor/nyala")
            .await;
        assert!(matches!(result, Err(HouseError::MalformedPayload { .. })));
        assert!(!service.rooms().await["dapur"].light);

        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_stay_consistent() {
        let (service, bus, _events) = setup();
        let service = Arc::new(service);
        service.handle_bus_event(BusEvent::Connected).await;
        bus.delay_payload("1", std::time::Duration::from_millis(2));

        let mut tasks = Vec::new();
        for i in 0..20 {
            let toggler = service.clone();
            tasks.push(tokio::spawn(async move {
                toggler.toggle_device("kompor").await.unwrap();
            }));

            let sensor = service.clone();
            let room = if i % 3 == 0 { "kamar1" } else { "kamar2" };
            let payload = if i % 2 == 0 { "1" } else { "0" };
            tasks.push(tokio::spawn(async move {
                sensor
                    .handle_message(&format!("smarthome/deteksi/{room}"), payload.as_bytes())
                    .await
                    .unwrap();
            }));
        }

        let observer = service.clone();
        let reader = tokio::spawn(async move {
            for _ in 0..50 {
                let status = observer.status().await;
                let any_present = status.presence.values().any(|bit| *bit == 1);
                assert_eq!(status.status.is_occupied(), any_present);
                tokio::task::yield_now().await;
            }
        });

        for task in tasks {
            task.await.unwrap();
        }
        reader.await.unwrap();

        let wire = bus.published_to("smarthome/dapur/kompor/perintah");
        assert_eq!(wire.len(), 20);
        assert_eq!(wire[0], "1");
        assert!(wire.windows(2).all(|pair| pair[0] != pair[1]));
        assert!(!service.devices().await["kompor"].status);
        assert_eq!(wire.last().map(String::as_str), Some("0"));

        let status = service.status().await;
        let any_present = status.presence.values().any(|bit| *bit == 1);
        assert_eq!(status.status.is_occupied(), any_present);
    }
}
