//! Session errors.
//!
//! These reject a user intent before any effect is issued. Failures of the
//! backend itself are not errors of the session: they arrive as completion
//! events and degrade the view instead.

use murmur_core::MessageId;
use thiserror::Error;

/// Errors returned by [`crate::Session::handle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session has not been started.
    #[error("session not started")]
    NotStarted,

    /// The session has ended; no further input is accepted.
    #[error("session has ended")]
    Ended,

    /// The intent needs a selected room.
    #[error("no room selected")]
    NoActiveRoom,

    /// Message content is empty after trimming.
    #[error("message is empty")]
    EmptyMessage,

    /// Reaction symbol is empty.
    #[error("reaction symbol is empty")]
    EmptyReaction,

    /// The message is not displayed in the active room.
    #[error("unknown message {0}")]
    UnknownMessage(MessageId),

    /// The user already reacted with this symbol and repeats are disallowed.
    #[error("already reacted {symbol} to {message_id}")]
    DuplicateReaction {
        /// Message reacted to.
        message_id: MessageId,
        /// Reaction symbol.
        symbol: String,
    },
}
