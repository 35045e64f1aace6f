//! Client
//!
//! Sans-IO room session for murmur. Keeps the room list, the active room's
//! ordered message stream, typing presence, and reaction counts consistent
//! while the user switches rooms and realtime events race with backend
//! completions.
//!
//! # Architecture
//!
//! The [`Session`] receives [`SessionEvent`]s (user intents, backend
//! completions, realtime deliveries, ticks), processes them through pure
//! state machine logic, and returns [`SessionAction`]s: [`Effect`]s for the
//! caller to execute and [`Notification`]s for the display.
//!
//! # Components
//!
//! - [`Session`]: Top-level controller for one user's session
//! - [`MessageStream`]: Ordered, deduplicated messages of the active room
//! - [`PresenceTracker`]: Remote typists and local typing debounce
//! - [`SessionDirectory`]: Room list and profile cache

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod directory;
mod error;
mod event;
mod presence;
mod reactions;
mod session;
mod stream;

pub use config::{HistoryFailurePolicy, ReactionPolicy, SessionConfig, TYPING_IDLE_TIMEOUT};
pub use directory::SessionDirectory;
pub use error::SessionError;
pub use event::{Effect, Generation, Notice, Notification, SessionAction, SessionEvent};
pub use presence::PresenceTracker;
pub use reactions::{ReactionClaims, ReactionCounts};
pub use session::{Phase, Session};
pub use stream::{HistoryState, InsertOutcome, MessageStream};
