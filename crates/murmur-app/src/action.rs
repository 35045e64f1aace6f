//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use murmur_core::{MessageId, RoomId};

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Switch the active room.
    SelectRoom {
        /// Room to switch to.
        room_id: RoomId,
    },

    /// Send a message to the active room.
    SendMessage {
        /// Message text as typed.
        content: String,
    },

    /// The compose box changed.
    Typing,

    /// React to a message in the active room.
    React {
        /// Message reacted to.
        message_id: MessageId,
        /// Reaction symbol.
        symbol: String,
    },

    /// Retry the active room's history load.
    RetryHistory,

    /// End the session, then quit.
    Logout,
}
