//! Application layer for murmur
//!
//! Pure state machines and a generic runtime for UI and session
//! orchestration, enabling deterministic simulation testing with the same
//! code that runs in production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (input handling, room navigation, commands)
//! - [`Bridge`]: Session bridge (translates App actions to Session events)
//! - [`Driver`]: Trait for platform-specific UI I/O
//! - [`Runtime`]: Generic orchestration loop executing session effects
//!   against a [`murmur_core::Backend`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod commands;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use bridge::Bridge;
pub use commands::{Command, HELP, REACTION_SYMBOLS, parse, reaction_symbol};
pub use driver::Driver;
pub use event::AppEvent;
pub use input::{InputState, KeyInput};
pub use runtime::Runtime;
pub use state::{ChannelView, SessionState, typing_indicator};
