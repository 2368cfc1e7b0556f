#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod models;
pub mod policy;
pub mod presence;
pub mod topic;

pub use error::{CatalogError, PresenceError};
pub use models::*;
pub use policy::{Decision, DenyReason, Operation};
pub use presence::{PresenceAggregator, PresenceUpdate, Transition};
pub use topic::{InboundTopic, MessageClass, TopicRegistry};
