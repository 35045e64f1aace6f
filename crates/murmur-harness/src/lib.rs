//! Deterministic simulation harness for murmur.
//!
//! In-memory implementations of the backend capabilities and the
//! environment, plus a scripted UI driver, so the production
//! [`murmur_app::Runtime`] can be exercised end to end without a network or
//! a terminal.
//!
//! # Fault Injection
//!
//! [`MemoryBackend`] switches individual failures on through [`Faults`].
//! [`ChaoticBackend`] wraps any backend and fails calls at random from a
//! seed.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Use [`InvariantRegistry::standard()`] for the common App/Session
//! invariants, or hand the registry to [`SimDriver::with_invariants`] to
//! check on every render.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chaotic;
pub mod invariants;
pub mod memory_backend;
pub mod sim_driver;
pub mod sim_env;

pub use chaotic::ChaoticBackend;
pub use invariants::{
    ChannelIsolation, ClientSnapshot, Invariant, InvariantRegistry, InvariantResult,
    MessagesOrdered, SelfNeverTyping, SessionSnapshot, SingleRoomSubscriptions, SystemSnapshot,
    UniqueMessages, ViewMatchesSession, Violation,
};
pub use memory_backend::{ConnectionId, Faults, MemoryBackend, MemoryConnection};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SIM_EPOCH_MILLIS, SimEnv, SimInstant};
