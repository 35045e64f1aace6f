//! Observable application state types.
//!
//! These structures are the view model: copies of what the session reported,
//! kept in the shape the UI renders. They are replaced from notifications,
//! never derived by the App itself.

use std::collections::HashMap;

use murmur_core::{Message, MessageId, RoomId};

/// Lifecycle of the session as the UI shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the session to start.
    Starting,
    /// Session running.
    Online {
        /// Local username, once the profile loaded.
        username: Option<String>,
    },
    /// Session ended (logged out).
    Ended,
}

/// View of the active room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelView {
    /// Active room.
    pub room_id: RoomId,
    /// Displayed messages in order.
    pub messages: Vec<Message>,
    /// Remote typists, sorted.
    pub typing: Vec<String>,
    /// `(symbol, count)` pairs per message.
    pub reactions: HashMap<MessageId, Vec<(String, u32)>>,
}

impl ChannelView {
    /// Empty view of a freshly selected room.
    pub fn new(room_id: RoomId) -> Self {
        Self { room_id, messages: Vec::new(), typing: Vec::new(), reactions: HashMap::new() }
    }

    /// Reaction counts of a message.
    pub fn reactions_for(&self, message_id: &MessageId) -> &[(String, u32)] {
        self.reactions.get(message_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The typing indicator line, if anyone is typing.
    pub fn typing_line(&self) -> Option<String> {
        typing_indicator(&self.typing)
    }
}

/// Render who is typing.
///
/// `None` when nobody is. Two names are spelled out; more are counted.
pub fn typing_indicator(usernames: &[String]) -> Option<String> {
    match usernames {
        [] => None,
        [one] => Some(format!("{one} is typing...")),
        [a, b] => Some(format!("{a} and {b} are typing...")),
        many => Some(format!("{} people are typing...", many.len())),
    }
}
