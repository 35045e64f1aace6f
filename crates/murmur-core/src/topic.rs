//! Relations, rows and realtime topics.
//!
//! A [`Topic`] names what a realtime subscription listens to: either the
//! change feed of a relation (optionally narrowed by a [`Filter`]) or a
//! presence channel. Events are delivered as [`FeedEvent`]s tagged with the
//! [`SubscriptionId`] the runtime registered them under.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{
    Membership, MessageRow, PresenceSnapshot, Profile, Reaction, Room, RoomId, UserId,
};

/// Named relations exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Chat rooms.
    Rooms,
    /// User profiles.
    Profiles,
    /// Chat messages.
    Messages,
    /// Room memberships.
    RoomMembers,
    /// Message reactions.
    MessageReactions,
}

impl Relation {
    /// Relation name as used by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rooms => "rooms",
            Self::Profiles => "profiles",
            Self::Messages => "messages",
            Self::RoomMembers => "room_members",
            Self::MessageReactions => "message_reactions",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of row-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Row inserted.
    Insert,
    /// Row updated.
    Update,
    /// Row deleted.
    Delete,
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    /// Column name.
    pub column: String,
    /// Required value.
    pub value: String,
}

impl Filter {
    /// `column = value`.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self { column: column.into(), value: value.into() }
    }

    /// Whether `row` satisfies this filter. Rows without the column never do.
    pub fn matches(&self, row: &Row) -> bool {
        row.column(&self.column).is_some_and(|v| v == self.value)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

/// A typed row of one of the backend relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Row {
    /// Row of [`Relation::Rooms`].
    Room(Room),
    /// Row of [`Relation::Profiles`].
    Profile(Profile),
    /// Row of [`Relation::Messages`].
    Message(MessageRow),
    /// Row of [`Relation::RoomMembers`].
    Membership(Membership),
    /// Row of [`Relation::MessageReactions`].
    Reaction(Reaction),
}

impl Row {
    /// Relation this row belongs to.
    pub fn relation(&self) -> Relation {
        match self {
            Self::Room(_) => Relation::Rooms,
            Self::Profile(_) => Relation::Profiles,
            Self::Message(_) => Relation::Messages,
            Self::Membership(_) => Relation::RoomMembers,
            Self::Reaction(_) => Relation::MessageReactions,
        }
    }

    /// Value of a named column, for filter evaluation.
    pub fn column(&self, name: &str) -> Option<&str> {
        match (self, name) {
            (Self::Room(r), "id") => Some(r.id.as_str()),
            (Self::Room(r), "name") => Some(&r.name),
            (Self::Profile(p), "id") => Some(p.id.as_str()),
            (Self::Profile(p), "username") => Some(&p.username),
            (Self::Message(m), "id") => Some(m.id.as_str()),
            (Self::Message(m), "room_id") => Some(m.room_id.as_str()),
            (Self::Message(m), "user_id") => Some(m.user_id.as_str()),
            (Self::Membership(m), "room_id") => Some(m.room_id.as_str()),
            (Self::Membership(m), "user_id") => Some(m.user_id.as_str()),
            (Self::Reaction(r), "message_id") => Some(r.message_id.as_str()),
            (Self::Reaction(r), "user_id") => Some(r.user_id.as_str()),
            _ => None,
        }
    }
}

/// What a realtime subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Row-level changes of a relation.
    Changes {
        /// Relation to watch.
        relation: Relation,
        /// Change kind to deliver. `None` delivers every kind.
        kind: Option<ChangeKind>,
        /// Row filter. `None` delivers every row.
        filter: Option<Filter>,
    },
    /// A presence channel.
    Presence {
        /// Channel name.
        name: String,
        /// Key under which this client's announced state is stored.
        key: String,
    },
}

impl Topic {
    /// Every change to the room list.
    pub fn rooms() -> Self {
        Self::Changes { relation: Relation::Rooms, kind: None, filter: None }
    }

    /// Newly inserted messages of one room.
    pub fn messages_in(room_id: &RoomId) -> Self {
        Self::Changes {
            relation: Relation::Messages,
            kind: Some(ChangeKind::Insert),
            filter: Some(Filter::eq("room_id", room_id.as_str())),
        }
    }

    /// Typing-presence channel of one room, keyed by the local user.
    pub fn typing_in(room_id: &RoomId, user_id: &UserId) -> Self {
        Self::Presence { name: format!("typing:{room_id}"), key: user_id.to_string() }
    }

    /// Whether a change event of `kind` for `row` is delivered on this topic.
    pub fn accepts(&self, kind: ChangeKind, row: &Row) -> bool {
        match self {
            Self::Changes { relation, kind: wanted, filter } => {
                *relation == row.relation()
                    && wanted.is_none_or(|k| k == kind)
                    && filter.as_ref().is_none_or(|f| f.matches(row))
            },
            Self::Presence { .. } => false,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changes { relation, filter: Some(filter), .. } => {
                write!(f, "changes:{relation}?{filter}")
            },
            Self::Changes { relation, filter: None, .. } => write!(f, "changes:{relation}"),
            Self::Presence { name, key } => write!(f, "presence:{name}#{key}"),
        }
    }
}

/// Identifier the runtime assigns to each live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Payload delivered on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedPayload {
    /// A row changed.
    Change {
        /// Kind of change.
        kind: ChangeKind,
        /// The new row (the old row, for deletes).
        row: Row,
    },
    /// Presence synchronized; the snapshot replaces all prior presence state.
    PresenceSync(PresenceSnapshot),
}

/// An event delivered by the realtime capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Subscription the event was delivered on.
    pub subscription: SubscriptionId,
    /// Event payload.
    pub payload: FeedPayload,
}
