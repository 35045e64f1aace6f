//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - User interactions (Keyboard, Resize) and system ticks.
//! - Session notifications translated by the [`crate::Bridge`].

use murmur_core::{Message, MessageId, Profile, Room, RoomId};

use crate::KeyInput;

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// The session started.
    SessionStarted,

    /// The session ended.
    SessionEnded,

    /// The room list changed.
    RoomsUpdated(Vec<Room>),

    /// The local user's profile loaded.
    ProfileUpdated(Profile),

    /// A room became active.
    RoomSelected {
        /// Newly active room.
        room_id: RoomId,
    },

    /// The active room's messages changed.
    MessagesUpdated {
        /// Active room.
        room_id: RoomId,
        /// All displayable messages in order.
        messages: Vec<Message>,
    },

    /// Remote typists changed.
    TypingUpdated {
        /// Active room.
        room_id: RoomId,
        /// Usernames, sorted.
        usernames: Vec<String>,
    },

    /// Reaction counts of a message changed.
    ReactionsUpdated {
        /// Active room.
        room_id: RoomId,
        /// Message reacted to.
        message_id: MessageId,
        /// `(symbol, count)` pairs.
        counts: Vec<(String, u32)>,
    },

    /// A message was stored.
    MessageSent {
        /// Content that was sent.
        content: String,
    },

    /// Transient notice to show in the status line.
    Notice {
        /// Notice text.
        message: String,
    },

    /// An intent was rejected.
    Error {
        /// Error description.
        message: String,
    },
}
