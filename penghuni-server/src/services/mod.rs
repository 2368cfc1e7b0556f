mod activity_service;
mod bus_service;
mod event_bus;
mod gateway_service;
mod house_service;
mod lock_service;

pub use activity_service::*;
pub use bus_service::*;
pub use event_bus::*;
pub use gateway_service::*;
pub use house_service::*;
pub use lock_service::*;
