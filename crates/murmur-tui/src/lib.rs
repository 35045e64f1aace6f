//! Terminal UI for murmur
//!
//! A thin shell over [`murmur_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`murmur_app::Runtime`].
//!
//! This crate only handles terminal rendering, the system clock and the
//! in-process demo backend the binary runs against.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod peer;
pub mod system_env;
pub mod terminal;
pub mod ui;

pub use murmur_app::{App, AppAction, AppEvent, Bridge, Driver, KeyInput, Runtime};
pub use peer::{DemoPeer, seed_backend};
pub use system_env::SystemEnv;
pub use terminal::{TerminalDriver, TerminalError};
