use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::configs::Gateway;
use crate::errors::BusError;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// What the bus hands to the house, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: Vec<u8> },
}

/// Publish/subscribe transport the house talks through.
#[async_trait]
pub trait BusAdapter: Send + Sync {
    async fn subscribe(&self, filter: &str) -> Result<(), BusError>;

    async fn subscribe_many(&self, filters: &[String]) -> Result<(), BusError> {
        for filter in filters {
            self.subscribe(filter).await?;
        }
        Ok(())
    }

    /// Fire-and-forget; success means the message was handed to the transport.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;

    fn is_connected(&self) -> bool;
}

pub struct MqttBus {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttBus {
    /// Connects lazily: the returned task drives the connection and reports
    /// through `sender` until the receiving side is dropped.
    pub fn start(gateway: &Gateway, sender: Sender<BusEvent>) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(&gateway.client_id, &gateway.host, gateway.port);
        options.set_keep_alive(Duration::from_secs(gateway.keep_alive_secs.max(5)));
        options.set_clean_session(true);

        if let Some(credentials) = &gateway.credentials {
            options.set_credentials(&credentials.username, &credentials.password);
        }

        let (client, event_loop) = AsyncClient::new(options, gateway.channel_capacity.max(1));
        let connected = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(Self::drive(event_loop, connected.clone(), sender));

        (Self { client, connected }, handle)
    }

    async fn drive(
        mut event_loop: EventLoop,
        connected: Arc<AtomicBool>,
        sender: Sender<BusEvent>,
    ) {
        let mut delay = RECONNECT_DELAY;

        loop {
            let event = match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    delay = RECONNECT_DELAY;
                    connected.store(true, Ordering::SeqCst);
                    tracing::info!("Connected to broker");
                    BusEvent::Connected
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = String::from_utf8_lossy(publish.topic.as_ref()).into_owned();
                    tracing::debug!("Receive [{}] {} bytes", topic, publish.payload.len());
                    BusEvent::Message {
                        topic,
                        payload: publish.payload.to_vec(),
                    }
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!("MQTT error: {}", e);

                    let was_connected = connected.swap(false, Ordering::SeqCst);
                    if was_connected && sender.send(BusEvent::Disconnected).await.is_err() {
                        break;
                    }

                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                    continue;
                }
            };

            if sender.send(event).await.is_err() {
                tracing::debug!("Bus event receiver dropped, stopping event loop");
                break;
            }
        }
    }
}

#[async_trait]
impl BusAdapter for MqttBus {
    async fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        self.client.subscribe(filter, QoS::AtLeastOnce).await?;
        tracing::debug!("Subscribe topic {}", filter);
        Ok(())
    }

    async fn subscribe_many(&self, filters: &[String]) -> Result<(), BusError> {
        if filters.is_empty() {
            return Ok(());
        }

        let filters = filters
            .iter()
            .map(|filter| SubscribeFilter::new(filter.clone(), QoS::AtLeastOnce));
        self.client.subscribe_many(filters).await?;

        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Disconnected);
        }

        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())?;
        tracing::debug!("Publish [{}] -> {}", topic, payload);

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
