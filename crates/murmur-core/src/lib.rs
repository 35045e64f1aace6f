//! Core types for murmur
//!
//! Data model, backend capability interfaces, and the environment abstraction
//! shared by the synchronization core and its runtimes.
//!
//! # Components
//!
//! - [`model`]: rooms, profiles, messages, reactions and presence state
//! - [`topic`]: relations, row filters and realtime topics
//! - [`service`]: the data-access and realtime capability traits
//! - [`env`]: time abstraction for deterministic testing
//! - [`error`]: errors reported by the hosted backend

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod model;
pub mod service;
pub mod topic;

pub use env::Environment;
pub use error::{ServiceError, UNIQUE_VIOLATION};
pub use model::{
    Membership, Message, MessageId, MessageRow, NewMessage, PresenceSnapshot, PresenceState,
    Profile, ProfileStatus, Reaction, Room, RoomId, Timestamp, UNKNOWN_AUTHOR, UserId,
};
pub use service::{Backend, DataAccess, FeedSink, Realtime};
pub use topic::{
    ChangeKind, FeedEvent, FeedPayload, Filter, Relation, Row, SubscriptionId, Topic,
};
