pub mod settings;

pub use settings::{Activity, Gateway, GatewayCredentials, House, Logger, Server, Settings};
