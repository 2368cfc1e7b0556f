use std::sync::Arc;

use penghuni_api::models::{Action, Endpoint, RoomId};
use penghuni_api::policy::{self, Decision, Operation};
use penghuni_api::topic::encode_binary;
use tokio::sync::RwLock;

use super::bus_service::BusAdapter;
use super::event_bus::{ChangeSource, EventSink, HouseEvent};
use crate::errors::{BusError, HouseError};
use crate::models::{Anomaly, House};

/// Requested end state of a single endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Desired {
    On,
    Off,
    /// Invert whatever the state is when the request is evaluated
    Toggle,
}

impl Desired {
    fn resolve(self, current: bool) -> bool {
        match self {
            Desired::On => true,
            Desired::Off => false,
            Desired::Toggle => !current,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkTarget {
    Lights,
    Devices,
}

/// A permitted command with its wire address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutedCommand {
    pub room: RoomId,
    pub endpoint: Endpoint,
    pub on: bool,
    pub topic: String,
}

impl RoutedCommand {
    pub fn payload(&self) -> &'static str {
        encode_binary(self.on)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    pub command: RoutedCommand,
    /// Handed to the bus; false when the publish was skipped or failed
    pub delivered: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkPublished {
    pub target: BulkTarget,
    /// Endpoints that were on before the command
    pub affected: usize,
    pub published: Vec<Published>,
}

impl BulkPublished {
    pub fn delivered(&self) -> usize {
        self.published.iter().filter(|p| p.delivered).count()
    }
}

/// Sends control commands: catalog check, permission policy, state update,
/// topic routing, then a fire-and-forget publish under the same write lock.
///
/// `UnknownRoom`, `UnknownDevice` and `Unroutable` errors mean nothing was
/// sent; `PermissionDenied` carries the rejection reason.
#[derive(Clone)]
pub struct CommandGateway {
    bus: Arc<dyn BusAdapter>,
    events: EventSink,
}

impl CommandGateway {
    pub fn new(bus: Arc<dyn BusAdapter>, events: EventSink) -> Self {
        Self { bus, events }
    }

    pub async fn send(
        &self,
        house: &RwLock<House>,
        room: &str,
        endpoint: &Endpoint,
        desired: Desired,
    ) -> Result<Published, HouseError> {
        // Held until the publish is handed off, so commands on one endpoint
        // reach the bus in table order.
        let mut house = house.write().await;

        let name = match endpoint {
            Endpoint::Light => house.room(room)?.name.clone(),
            Endpoint::Device(device) => house.device(device.as_str())?.name.clone(),
        };
        let current = house.endpoint_state(room, endpoint)?;
        let on = desired.resolve(current);

        let operation = match endpoint {
            Endpoint::Light => Operation::Light {
                is_on: current,
                action: Action::from(on),
            },
            Endpoint::Device(_) => Operation::Device {
                action: Action::from(on),
            },
        };

        if let Decision::Deny(reason) = policy::evaluate(house.occupancy(), &operation) {
            tracing::warn!("Rejected {} in {}: {}", endpoint, room, reason);
            self.events.emit(HouseEvent::CommandRejected {
                room: Some(room.into()),
                endpoint: Some(endpoint.clone()),
                name: Some(name),
                reason,
            });
            return Err(HouseError::PermissionDenied(reason));
        }

        let command = Self::route(&house, room, endpoint, on)?;
        house.set_endpoint(room, endpoint, on)?;

        let anomaly = if on && !house.presence().is_occupied() {
            Some(match endpoint {
                Endpoint::Light => Anomaly::light(&command.room, house.room(room)?),
                Endpoint::Device(device) => {
                    Anomaly::device(device, house.device(device.as_str())?)
                }
            })
        } else {
            None
        };

        self.events.emit(HouseEvent::StateChanged {
            room: command.room.clone(),
            endpoint: command.endpoint.clone(),
            name,
            on: command.on,
            source: ChangeSource::Control,
        });
        if let Some(anomaly) = anomaly {
            self.events.emit(anomaly.into());
        }

        let published = self.dispatch(command).await;
        drop(house);

        Ok(published)
    }

    /// Switches every light or every device off. Routes are resolved for the
    /// whole set before anything changes.
    pub async fn send_all_off(
        &self,
        house: &RwLock<House>,
        target: BulkTarget,
    ) -> Result<BulkPublished, HouseError> {
        let mut house = house.write().await;

        let operation = match target {
            BulkTarget::Lights => Operation::AllLightsOff,
            BulkTarget::Devices => Operation::AllDevicesOff,
        };

        if let Decision::Deny(reason) = policy::evaluate(house.occupancy(), &operation) {
            tracing::warn!("Rejected {:?} off: {}", target, reason);
            self.events.emit(HouseEvent::CommandRejected {
                room: None,
                endpoint: None,
                name: None,
                reason,
            });
            return Err(HouseError::PermissionDenied(reason));
        }

        let endpoints: Vec<(RoomId, Endpoint)> = match target {
            BulkTarget::Lights => house
                .rooms()
                .map(|(room, _)| (room.clone(), Endpoint::Light))
                .collect(),
            BulkTarget::Devices => house
                .devices()
                .map(|(device, state)| (state.room.clone(), Endpoint::Device(device.clone())))
                .collect(),
        };

        let commands = endpoints
            .iter()
            .map(|(room, endpoint)| Self::route(&house, room.as_str(), endpoint, false))
            .collect::<Result<Vec<_>, _>>()?;

        let mut affected = 0;
        for command in &commands {
            if house.set_endpoint(command.room.as_str(), &command.endpoint, false)? {
                affected += 1;
            }
        }

        self.events.emit(HouseEvent::BulkOff {
            lights: target == BulkTarget::Lights,
            affected,
        });

        let mut published = Vec::with_capacity(commands.len());
        for command in commands {
            published.push(self.dispatch(command).await);
        }
        drop(house);

        Ok(BulkPublished {
            target,
            affected,
            published,
        })
    }

    /// Resolves the command topic for `endpoint` in `room`.
    pub fn route(
        house: &House,
        room: &str,
        endpoint: &Endpoint,
        on: bool,
    ) -> Result<RoutedCommand, HouseError> {
        let registry = house.registry();

        if !registry.contains_room(room) {
            return Err(HouseError::UnknownRoom(room.into()));
        }
        if let Endpoint::Device(device) = endpoint {
            if !registry.contains_device(device.as_str()) {
                return Err(HouseError::UnknownDevice(device.clone()));
            }
        }

        let topic = registry
            .endpoint_command_topic(room, endpoint)
            .ok_or_else(|| HouseError::Unroutable(format!("{endpoint} in {room}")))?;

        Ok(RoutedCommand {
            room: room.into(),
            endpoint: endpoint.clone(),
            on,
            topic,
        })
    }

    /// Publishes without waiting for acknowledgement. Failures are logged and
    /// reported as undelivered, never retried.
    pub async fn dispatch(&self, command: RoutedCommand) -> Published {
        let payload = command.payload();

        let delivered = match self.publish(&command.topic, payload).await {
            Ok(()) => {
                tracing::debug!("Sent [{}] -> {}", command.topic, payload);
                true
            }
            Err(HouseError::BusUnavailable) => {
                tracing::warn!("Bus unavailable, skipped [{}] -> {}", command.topic, payload);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to send [{}] -> {}: {}", command.topic, payload, e);
                false
            }
        };

        self.events.emit(HouseEvent::CommandSent {
            topic: command.topic.clone(),
            payload: payload.to_string(),
            delivered,
        });

        Published { command, delivered }
    }

    pub async fn publish(&self, topic: &str, payload: &str) -> Result<(), HouseError> {
        if !self.bus.is_connected() {
            return Err(HouseError::BusUnavailable);
        }

        match self.bus.publish(topic, payload).await {
            Ok(()) => Ok(()),
            Err(BusError::Disconnected) => Err(HouseError::BusUnavailable),
            Err(e) => {
                tracing::error!("Publish to {} failed: {}", topic, e);
                Err(HouseError::BusUnavailable)
            }
        }
    }
}
