use std::env;

use config::{Config, ConfigError, Environment, File};
use penghuni_api::models::{AliasSpec, DeviceSpec, RoomSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    pub credentials: Option<GatewayCredentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCredentials {
    pub username: String,
    pub password: String,
}

/// Fixed room and device catalog of the house.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct House {
    pub rooms: Vec<RoomSpec>,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
    #[serde(default)]
    pub aliases: Vec<AliasSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub gateway: Gateway,
    pub house: House,
    #[serde(default)]
    pub activity: Activity,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("PENGHUNI").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

fn default_keep_alive() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    64
}

fn default_log_capacity() -> usize {
    100
}

fn default_notification_capacity() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use penghuni_api::topic::MessageClass;

    use super::*;

    #[test]
    fn test_from_toml_str() {
        let settings = Settings::from_toml_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 5000

            [logger]
            level = "debug"

            [gateway]
            host = "localhost"
            port = 1883
            client_id = "penghuni-test"

            [[house.rooms]]
            id = "kamar1"
            name = "Kamar 1"

            [[house.rooms]]
            id = "ruang_cuci"
            name = "Ruang Cuci"

            [[house.devices]]
            id = "pompa_air"
            name = "Pompa Air"
            segment = "pompa"
            room = "ruang_cuci"
            power = 200

            [[house.aliases]]
            room = "ruang_cuci"
            segment = "jemuran"
            classes = ["sensor", "light_command"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.gateway.keep_alive_secs, 60);
        assert!(settings.gateway.credentials.is_none());
        assert_eq!(settings.activity.log_capacity, 100);
        assert_eq!(settings.activity.notification_capacity, 10);
        assert!(settings.house.rooms.iter().all(|room| room.sensor));
        assert_eq!(settings.house.devices[0].segment(), "pompa");
        assert_eq!(
            settings.house.aliases[0].classes,
            vec![MessageClass::Sensor, MessageClass::LightCommand]
        );
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let result = Settings::from_toml_str("[server]\nhost = \"0.0.0.0\"\nport = 5000\n");

        assert!(matches!(result, Err(ConfigError::Message(_))));
    }
}
