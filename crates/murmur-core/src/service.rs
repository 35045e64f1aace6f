//! Backend capability interfaces.
//!
//! The synchronization core depends on exactly two capabilities of the hosted
//! backend: row-level data access ([`DataAccess`]) and realtime delivery
//! ([`Realtime`]). Runtimes execute session effects against them; the
//! simulation harness provides an in-memory implementation of both.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    error::ServiceError,
    model::{
        Membership, Message, MessageRow, NewMessage, PresenceState, Profile, ProfileStatus,
        Reaction, Room, RoomId, Timestamp, UserId,
    },
    topic::{FeedEvent, SubscriptionId, Topic},
};

/// Channel end a realtime subscription delivers its events into.
pub type FeedSink = mpsc::UnboundedSender<FeedEvent>;

/// Point/range reads, inserts and upserts against the backend relations.
///
/// Every call is a suspension point; implementations must not block.
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// All rooms, ordered by creation time ascending.
    async fn list_rooms(&self) -> Result<Vec<Room>, ServiceError>;

    /// Profile of one user.
    async fn fetch_profile(&self, user_id: &UserId) -> Result<Profile, ServiceError>;

    /// Full message history of a room joined with author usernames, ordered
    /// by creation time ascending. Not paginated.
    async fn fetch_messages(&self, room_id: &RoomId) -> Result<Vec<Message>, ServiceError>;

    /// Insert a message. Returns the stored row.
    async fn insert_message(&self, message: NewMessage) -> Result<MessageRow, ServiceError>;

    /// Insert a membership, or do nothing if it already exists.
    ///
    /// Some backends still report the conflict as a unique violation.
    async fn upsert_membership(&self, membership: Membership) -> Result<(), ServiceError>;

    /// Append a reaction.
    async fn insert_reaction(&self, reaction: Reaction) -> Result<(), ServiceError>;

    /// Update a profile's status and last-seen time.
    async fn update_status(
        &self,
        user_id: &UserId,
        status: ProfileStatus,
        last_seen: Timestamp,
    ) -> Result<(), ServiceError>;
}

/// Change-feed and presence subscriptions.
///
/// Subscriptions are identified by caller-chosen [`SubscriptionId`]s and
/// deliver into the caller's [`FeedSink`]. After `unsubscribe` returns, no
/// further events for that id are sent, though events already queued in the
/// sink remain there.
pub trait Realtime: Send + Sync {
    /// Open a subscription on `topic`.
    ///
    /// Presence subscriptions receive a full [`crate::FeedPayload::PresenceSync`]
    /// immediately and after every change to the channel.
    fn subscribe(&self, id: SubscriptionId, topic: Topic, sink: FeedSink)
    -> Result<(), ServiceError>;

    /// Close a subscription. Closing an unknown id is a no-op.
    ///
    /// Closing a presence subscription removes the state it announced.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Announce this client's state on a presence subscription.
    fn track(&self, id: SubscriptionId, state: PresenceState) -> Result<(), ServiceError>;
}

/// A backend providing both capabilities.
pub trait Backend: DataAccess + Realtime {}

impl<T: DataAccess + Realtime> Backend for T {}
