//! Session events and actions.

use murmur_core::{
    FeedEvent, Membership, Message, MessageId, MessageRow, NewMessage, PresenceState, Profile,
    ProfileStatus, Reaction, Room, RoomId, ServiceError, SubscriptionId, Topic, UserId,
};

/// Generation of a room selection.
///
/// Incremented on every room switch. Completions issued under an older
/// generation are stale and discarded.
pub type Generation = u64;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Forwarding user intents (select room, type, send, react)
/// - Executing [`Effect`]s and feeding their results back
/// - Forwarding realtime events from every subscription it opened
/// - Driving time forward via ticks
///
/// Generic over `I` (Instant type) so simulations can use virtual time.
#[derive(Debug, Clone)]
pub enum SessionEvent<I = std::time::Instant> {
    /// Begin the session: go online, load the directory, watch rooms.
    Start,

    /// End the session: close every subscription, go offline.
    End,

    /// User selected a room.
    SelectRoom {
        /// Room to switch to.
        room_id: RoomId,
    },

    /// Re-issue a failed history load for the active room.
    RetryHistory,

    /// The compose box changed.
    InputChanged {
        /// Current time from the environment.
        now: I,
    },

    /// Time tick for the typing idle timer.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// User submitted a message.
    SendMessage {
        /// Raw compose-box content (trimmed by the session).
        content: String,
    },

    /// User reacted to a message.
    React {
        /// Message reacted to.
        message_id: MessageId,
        /// Reaction symbol.
        symbol: String,
    },

    /// Result of [`Effect::LoadRooms`].
    RoomsLoaded(Result<Vec<Room>, ServiceError>),

    /// Result of [`Effect::LoadProfile`].
    ProfileLoaded(Result<Profile, ServiceError>),

    /// Result of [`Effect::LoadHistory`].
    HistoryLoaded {
        /// Generation the load was issued under.
        generation: Generation,
        /// Loaded history.
        result: Result<Vec<Message>, ServiceError>,
    },

    /// Result of [`Effect::ResolveAuthor`].
    AuthorResolved {
        /// Generation the lookup was issued under.
        generation: Generation,
        /// Message waiting for its author.
        message_id: MessageId,
        /// Author profile.
        result: Result<Profile, ServiceError>,
    },

    /// Result of [`Effect::UpsertMembership`].
    MembershipUpserted {
        /// Room joined.
        room_id: RoomId,
        /// Upsert outcome.
        result: Result<(), ServiceError>,
    },

    /// Result of [`Effect::InsertMessage`].
    MessageInserted {
        /// Generation the insert was issued under.
        generation: Generation,
        /// Content that was submitted.
        content: String,
        /// Stored row.
        result: Result<MessageRow, ServiceError>,
    },

    /// Result of [`Effect::InsertReaction`].
    ReactionInserted {
        /// Generation the insert was issued under.
        generation: Generation,
        /// Reaction submitted.
        reaction: Reaction,
        /// Insert outcome.
        result: Result<(), ServiceError>,
    },

    /// Result of [`Effect::UpdateStatus`].
    StatusUpdated {
        /// Status that was written.
        status: ProfileStatus,
        /// Update outcome.
        result: Result<(), ServiceError>,
    },

    /// A subscription could not be opened, or a presence announcement failed.
    SubscriptionFailed {
        /// Affected subscription.
        subscription: SubscriptionId,
        /// Failure reason.
        error: ServiceError,
    },

    /// Event delivered by the realtime capability.
    Feed(FeedEvent),
}

impl<I> SessionEvent<I> {
    /// Whether this event is a user intent rather than a completion, a
    /// realtime delivery, or a tick.
    pub fn is_intent(&self) -> bool {
        matches!(
            self,
            Self::Start
                | Self::End
                | Self::SelectRoom { .. }
                | Self::RetryHistory
                | Self::InputChanged { .. }
                | Self::SendMessage { .. }
                | Self::React { .. }
        )
    }
}

/// External calls the session asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// List rooms. Answer with [`SessionEvent::RoomsLoaded`].
    LoadRooms,

    /// Load a profile. Answer with [`SessionEvent::ProfileLoaded`].
    LoadProfile {
        /// User whose profile to load.
        user_id: UserId,
    },

    /// Load a room's history. Answer with [`SessionEvent::HistoryLoaded`].
    LoadHistory {
        /// Generation to echo back.
        generation: Generation,
        /// Room to load.
        room_id: RoomId,
    },

    /// Look up the author of a live insert. Answer with
    /// [`SessionEvent::AuthorResolved`].
    ResolveAuthor {
        /// Generation to echo back.
        generation: Generation,
        /// Message waiting for its author.
        message_id: MessageId,
        /// Author to look up.
        user_id: UserId,
    },

    /// Join a room. Answer with [`SessionEvent::MembershipUpserted`].
    UpsertMembership(Membership),

    /// Send a message. Answer with [`SessionEvent::MessageInserted`].
    InsertMessage {
        /// Generation to echo back.
        generation: Generation,
        /// Message to insert.
        message: NewMessage,
    },

    /// Append a reaction. Answer with [`SessionEvent::ReactionInserted`].
    InsertReaction {
        /// Generation to echo back.
        generation: Generation,
        /// Reaction to append.
        reaction: Reaction,
    },

    /// Write the user's status. Answer with [`SessionEvent::StatusUpdated`].
    UpdateStatus {
        /// User whose profile to update.
        user_id: UserId,
        /// New status.
        status: ProfileStatus,
    },

    /// Open a subscription. On failure answer with
    /// [`SessionEvent::SubscriptionFailed`].
    Subscribe {
        /// Identifier to register the subscription under.
        subscription: SubscriptionId,
        /// What to listen to.
        topic: Topic,
    },

    /// Close a subscription.
    Unsubscribe {
        /// Subscription to close.
        subscription: SubscriptionId,
    },

    /// Announce presence state. On failure answer with
    /// [`SessionEvent::SubscriptionFailed`].
    Track {
        /// Presence subscription to announce on.
        subscription: SubscriptionId,
        /// State to announce.
        state: PresenceState,
    },
}

/// Transient, user-facing notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A message could not be sent; the draft should be kept.
    SendFailed {
        /// Content that was not sent.
        content: String,
        /// Failure reason.
        reason: String,
    },
    /// The active room's history could not be loaded.
    HistoryUnavailable {
        /// Affected room.
        room_id: RoomId,
        /// Failure reason.
        reason: String,
    },
    /// A reaction could not be recorded.
    ReactionFailed {
        /// Message reacted to.
        message_id: MessageId,
        /// Failure reason.
        reason: String,
    },
}

/// View updates for the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The room list changed.
    RoomsUpdated(Vec<Room>),

    /// The user's own profile changed.
    ProfileUpdated(Profile),

    /// The active room changed. Message and typing state start empty.
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

    /// The set of users typing in the active room changed.
    TypingUpdated {
        /// Active room.
        room_id: RoomId,
        /// Usernames of remote typists, sorted.
        usernames: Vec<String>,
    },

    /// Reaction counts of a message changed.
    ReactionsUpdated {
        /// Active room.
        room_id: RoomId,
        /// Message reacted to.
        message_id: MessageId,
        /// `(symbol, count)` pairs sorted by symbol.
        counts: Vec<(String, u32)>,
    },

    /// A message was stored.
    MessageSent {
        /// Content that was sent.
        content: String,
    },

    /// Something should be shown as a toast.
    Notice(Notice),
}

/// Actions the session produces for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Perform an external call.
    Execute(Effect),
    /// Update the display.
    Notify(Notification),
}
