//! Data model shared with the hosted backend.
//!
//! Rows are immutable once created. Identifiers are opaque strings minted by
//! the backend; the core never parses them.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Display name used when a message author or typing user cannot be resolved.
pub const UNKNOWN_AUTHOR: &str = "unknown";

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a backend-issued identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a room (channel).
    RoomId
);
opaque_id!(
    /// Identifier of a user and of their profile.
    UserId
);
opaque_id!(
    /// Identifier of a message.
    MessageId
);

/// A named channel that scopes messages, membership, and presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Creation time; the room list is ordered by it.
    pub created_at: Timestamp,
}

/// Online status recorded on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    /// The user has a live session.
    Online,
    /// No live session.
    #[default]
    Offline,
}

impl ProfileStatus {
    /// Wire representation (`online` / `offline`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's profile. Exactly one per user; written only by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owning user.
    pub id: UserId,
    /// Unique display key.
    pub username: String,
    /// Online status.
    pub status: ProfileStatus,
    /// Last status change.
    pub last_seen: Timestamp,
}

/// A message row as delivered by the change feed.
///
/// The feed does not join the author's profile, so the username is missing
/// until it is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRow {
    /// Message identifier.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Author.
    pub user_id: UserId,
    /// Text content.
    pub content: String,
    /// Creation time.
    pub created_at: Timestamp,
}

impl MessageRow {
    /// Attach the author's username (or the placeholder if unresolved).
    pub fn enrich(self, username: Option<String>) -> Message {
        Message {
            id: self.id,
            room_id: self.room_id,
            user_id: self.user_id,
            content: self.content,
            created_at: self.created_at,
            username,
        }
    }
}

/// A displayable message with its denormalized author username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Author.
    pub user_id: UserId,
    /// Text content.
    pub content: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Author username. `None` if the profile lookup failed.
    pub username: Option<String>,
}

impl Message {
    /// Total order within a room: creation time, then identifier.
    pub fn order_key(&self) -> (Timestamp, &MessageId) {
        (self.created_at, &self.id)
    }

    /// Author name for display, falling back to [`UNKNOWN_AUTHOR`].
    pub fn author(&self) -> &str {
        self.username.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }
}

/// A message to be inserted. The backend assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Target room.
    pub room_id: RoomId,
    /// Author.
    pub user_id: UserId,
    /// Trimmed, non-empty content.
    pub content: String,
}

/// Membership of a user in a room. Unique per `(room_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    /// Room.
    pub room_id: RoomId,
    /// Member.
    pub user_id: UserId,
}

/// An emoji reaction. Append-only; uniqueness is a client policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reaction {
    /// Message reacted to.
    pub message_id: MessageId,
    /// Reacting user.
    pub user_id: UserId,
    /// Reaction symbol.
    pub symbol: String,
}

/// State a client announces on a presence channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceState {
    /// Announcing user.
    pub user_id: UserId,
    /// Announcing user's name, if known to them.
    pub username: Option<String>,
    /// Whether the user is typing.
    pub typing: bool,
}

/// Full presence state for a topic: every connected client's announced
/// states, keyed by presence key.
pub type PresenceSnapshot = BTreeMap<String, Vec<PresenceState>>;
