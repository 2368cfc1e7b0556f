#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Not connected to broker")]
    Disconnected,

    #[error("Broker client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}
