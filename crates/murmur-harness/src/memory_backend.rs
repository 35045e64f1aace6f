//! In-memory backend for testing and simulation.
//!
//! [`MemoryBackend`] is the shared store: relations, change feeds and
//! presence channels. Each client talks to it through its own
//! [`MemoryConnection`], which implements [`DataAccess`] and [`Realtime`].
//! Subscription ids are chosen by clients, so the store keys them by
//! connection.
//!
//! Faults are switched on per store with [`Faults`]; they apply to every
//! connection. Seeding and inspection helpers bypass faults.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use murmur_core::{
    ChangeKind, DataAccess, FeedEvent, FeedPayload, FeedSink, Membership, Message, MessageId,
    MessageRow, NewMessage, PresenceSnapshot, PresenceState, Profile, ProfileStatus, Reaction,
    Realtime, Relation, Room, RoomId, Row, ServiceError, SubscriptionId, Timestamp, Topic,
    UNIQUE_VIOLATION, UserId,
};

/// SQLSTATE code for a foreign-key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// SQLSTATE code for a check-constraint violation.
pub const CHECK_VIOLATION: &str = "23514";

/// Identifier of a connection to the store.
pub type ConnectionId = u64;

/// Injected failures.
///
/// Every flag defaults to off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// `list_rooms` fails.
    pub fail_rooms: bool,
    /// `fetch_messages` fails.
    pub fail_history: bool,
    /// `fetch_profile` fails.
    pub fail_profile_lookups: bool,
    /// `insert_message` fails.
    pub fail_inserts: bool,
    /// `insert_reaction` fails.
    pub fail_reactions: bool,
    /// `update_status` fails.
    pub fail_status: bool,
    /// `subscribe` fails.
    pub fail_subscribe: bool,
    /// Every change event is delivered twice.
    pub duplicate_deliveries: bool,
    /// `upsert_membership` reports existing memberships as unique violations.
    pub strict_memberships: bool,
}

fn injected() -> ServiceError {
    ServiceError::Network("injected fault".into())
}

struct Subscription {
    topic: Topic,
    sink: FeedSink,
    /// State announced with `track`, for presence subscriptions.
    announced: Option<PresenceState>,
}

#[derive(Default)]
struct Store {
    rooms: Vec<Room>,
    profiles: BTreeMap<UserId, Profile>,
    messages: Vec<MessageRow>,
    memberships: HashSet<Membership>,
    reactions: Vec<Reaction>,
    /// Logical clock for `created_at`.
    clock: Timestamp,
    next_message: u64,
    next_connection: ConnectionId,
    subscriptions: BTreeMap<(ConnectionId, SubscriptionId), Subscription>,
    /// Presence announced by simulated peers, per channel and key.
    remote_presence: BTreeMap<String, BTreeMap<String, PresenceState>>,
    faults: Faults,
}

impl Store {
    fn tick(&mut self) -> Timestamp {
        self.clock += 1;
        self.clock
    }

    fn username(&self, user_id: &UserId) -> Option<String> {
        self.profiles.get(user_id).map(|p| p.username.clone())
    }

    fn insert_message(&mut self, message: NewMessage) -> Result<MessageRow, ServiceError> {
        if message.content.trim().is_empty() {
            return Err(ServiceError::Constraint {
                code: CHECK_VIOLATION.into(),
                message: "messages.content must not be empty".into(),
            });
        }
        if !self.rooms.iter().any(|r| r.id == message.room_id) {
            return Err(ServiceError::Constraint {
                code: FOREIGN_KEY_VIOLATION.into(),
                message: format!("room {} does not exist", message.room_id),
            });
        }

        self.next_message += 1;
        let row = MessageRow {
            id: MessageId::new(format!("msg-{:06}", self.next_message)),
            room_id: message.room_id,
            user_id: message.user_id,
            content: message.content,
            created_at: self.tick(),
        };
        self.messages.push(row.clone());
        self.deliver(ChangeKind::Insert, &Row::Message(row.clone()));
        Ok(row)
    }

    /// Push a change to every subscription whose topic accepts it.
    fn deliver(&mut self, kind: ChangeKind, row: &Row) {
        let copies = if self.faults.duplicate_deliveries { 2 } else { 1 };
        let mut closed = Vec::new();

        for (key, sub) in &self.subscriptions {
            if !sub.topic.accepts(kind, row) {
                continue;
            }
            for _ in 0..copies {
                let event = FeedEvent {
                    subscription: key.1,
                    payload: FeedPayload::Change { kind, row: row.clone() },
                };
                if sub.sink.send(event).is_err() {
                    closed.push(*key);
                    break;
                }
            }
        }

        self.drop_closed(closed);
    }

    fn presence_snapshot(&self, channel: &str) -> PresenceSnapshot {
        let mut snapshot = PresenceSnapshot::new();

        for sub in self.subscriptions.values() {
            if let (Topic::Presence { name, key }, Some(state)) = (&sub.topic, &sub.announced)
                && name == channel
            {
                snapshot.entry(key.clone()).or_default().push(state.clone());
            }
        }
        if let Some(remote) = self.remote_presence.get(channel) {
            for (key, state) in remote {
                snapshot.entry(key.clone()).or_default().push(state.clone());
            }
        }
        snapshot
    }

    /// Send the channel's full presence state to every subscriber.
    fn sync_presence(&mut self, channel: &str) {
        let snapshot = self.presence_snapshot(channel);
        let mut closed = Vec::new();

        for (key, sub) in &self.subscriptions {
            let Topic::Presence { name, .. } = &sub.topic else {
                continue;
            };
            if name != channel {
                continue;
            }
            let event = FeedEvent {
                subscription: key.1,
                payload: FeedPayload::PresenceSync(snapshot.clone()),
            };
            if sub.sink.send(event).is_err() {
                closed.push(*key);
            }
        }

        self.drop_closed(closed);
    }

    fn drop_closed(&mut self, closed: Vec<(ConnectionId, SubscriptionId)>) {
        for key in closed {
            tracing::trace!(connection = key.0, subscription = %key.1, "dropping subscription with closed sink");
            self.subscriptions.remove(&key);
        }
    }
}

/// Shared in-memory store.
///
/// Cloning shares the store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Store>>,
}

impl MemoryBackend {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client connection.
    pub fn connect(&self) -> MemoryConnection {
        let mut store = self.lock();
        store.next_connection += 1;
        MemoryConnection { backend: self.clone(), id: store.next_connection }
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.inner.lock().expect("MemoryBackend mutex poisoned")
    }

    /// Current faults.
    pub fn faults(&self) -> Faults {
        self.lock().faults.clone()
    }

    /// Replace the faults.
    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    /// Change some faults in place.
    pub fn update_faults(&self, update: impl FnOnce(&mut Faults)) {
        update(&mut self.lock().faults);
    }

    /// Create a room whose id is its name. Existing rooms are returned as is.
    pub fn seed_room(&self, name: &str) -> RoomId {
        let mut store = self.lock();
        let id = RoomId::new(name);
        if store.rooms.iter().any(|r| r.id == id) {
            return id;
        }

        let room = Room { id: id.clone(), name: name.to_owned(), created_at: store.tick() };
        store.rooms.push(room.clone());
        store.deliver(ChangeKind::Insert, &Row::Room(room));
        id
    }

    /// Create or replace a profile.
    pub fn seed_profile(&self, user_id: &str, username: &str) {
        let mut store = self.lock();
        let profile = Profile {
            id: user_id.into(),
            username: username.to_owned(),
            status: ProfileStatus::Offline,
            last_seen: 0,
        };
        store.profiles.insert(profile.id.clone(), profile);
    }

    /// Insert a message as another user, ignoring faults.
    pub fn insert_as(
        &self,
        user_id: &str,
        room_id: &str,
        content: &str,
    ) -> Result<MessageRow, ServiceError> {
        self.lock().insert_message(NewMessage {
            room_id: room_id.into(),
            user_id: user_id.into(),
            content: content.to_owned(),
        })
    }

    /// Announce a simulated peer's typing state in a room.
    pub fn track_as(&self, room_id: &str, user_id: &str, typing: bool) {
        let mut store = self.lock();
        let Topic::Presence { name, key } = Topic::typing_in(&room_id.into(), &user_id.into())
        else {
            return;
        };

        let state =
            PresenceState { user_id: user_id.into(), username: store.username(&user_id.into()), typing };
        store.remote_presence.entry(name.clone()).or_default().insert(key, state);
        store.sync_presence(&name);
    }

    /// Remove a simulated peer from a room's presence channel.
    pub fn leave_as(&self, room_id: &str, user_id: &str) {
        let mut store = self.lock();
        let Topic::Presence { name, key } = Topic::typing_in(&room_id.into(), &user_id.into())
        else {
            return;
        };

        let removed =
            store.remote_presence.get_mut(&name).and_then(|peers| peers.remove(&key)).is_some();
        if removed {
            store.sync_presence(&name);
        }
    }

    /// Rooms ordered by creation.
    pub fn rooms(&self) -> Vec<Room> {
        self.lock().rooms.clone()
    }

    /// Stored messages of a room in insertion order.
    pub fn messages_in(&self, room_id: &str) -> Vec<MessageRow> {
        self.lock().messages.iter().filter(|m| m.room_id.as_str() == room_id).cloned().collect()
    }

    /// Stored reactions on a message.
    pub fn reactions_on(&self, message_id: &MessageId) -> Vec<Reaction> {
        self.lock().reactions.iter().filter(|r| &r.message_id == message_id).cloned().collect()
    }

    /// Whether a membership exists.
    pub fn is_member(&self, room_id: &str, user_id: &str) -> bool {
        self.lock()
            .memberships
            .contains(&Membership { room_id: room_id.into(), user_id: user_id.into() })
    }

    /// A stored profile.
    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.lock().profiles.get(&UserId::from(user_id)).cloned()
    }

    /// Users announced as typing in a room, from every connection and peer.
    pub fn typing_in(&self, room_id: &str) -> Vec<UserId> {
        let store = self.lock();
        let Topic::Presence { name, .. } = Topic::typing_in(&room_id.into(), &UserId::from(""))
        else {
            return Vec::new();
        };

        let mut users: Vec<UserId> = store
            .presence_snapshot(&name)
            .into_values()
            .flatten()
            .filter(|state| state.typing)
            .map(|state| state.user_id)
            .collect();
        users.sort();
        users.dedup();
        users
    }

    /// Live subscriptions of one connection.
    pub fn subscriptions_of(&self, connection: ConnectionId) -> Vec<(SubscriptionId, Topic)> {
        self.lock()
            .subscriptions
            .iter()
            .filter(|((conn, _), _)| *conn == connection)
            .map(|((_, id), sub)| (*id, sub.topic.clone()))
            .collect()
    }

    /// Live subscriptions across all connections.
    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }
}

/// One client's view of the store.
#[derive(Clone)]
pub struct MemoryConnection {
    backend: MemoryBackend,
    id: ConnectionId,
}

impl MemoryConnection {
    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The shared store.
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }
}

#[async_trait]
impl DataAccess for MemoryConnection {
    async fn list_rooms(&self) -> Result<Vec<Room>, ServiceError> {
        let store = self.backend.lock();
        if store.faults.fail_rooms {
            return Err(injected());
        }

        let mut rooms = store.rooms.clone();
        rooms.sort_by_key(|r| r.created_at);
        Ok(rooms)
    }

    async fn fetch_profile(&self, user_id: &UserId) -> Result<Profile, ServiceError> {
        let store = self.backend.lock();
        if store.faults.fail_profile_lookups {
            return Err(injected());
        }

        store
            .profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound { relation: Relation::Profiles, key: user_id.to_string() })
    }

    async fn fetch_messages(&self, room_id: &RoomId) -> Result<Vec<Message>, ServiceError> {
        let store = self.backend.lock();
        if store.faults.fail_history {
            return Err(injected());
        }

        let mut messages: Vec<Message> = store
            .messages
            .iter()
            .filter(|m| &m.room_id == room_id)
            .map(|m| {
                let username = store.username(&m.user_id);
                m.clone().enrich(username)
            })
            .collect();
        messages.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        Ok(messages)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<MessageRow, ServiceError> {
        let mut store = self.backend.lock();
        if store.faults.fail_inserts {
            return Err(injected());
        }
        store.insert_message(message)
    }

    async fn upsert_membership(&self, membership: Membership) -> Result<(), ServiceError> {
        let mut store = self.backend.lock();

        if store.memberships.contains(&membership) {
            if store.faults.strict_memberships {
                return Err(ServiceError::Constraint {
                    code: UNIQUE_VIOLATION.into(),
                    message: "duplicate key value violates unique constraint \"room_members_pkey\""
                        .into(),
                });
            }
            return Ok(());
        }

        store.memberships.insert(membership.clone());
        store.deliver(ChangeKind::Insert, &Row::Membership(membership));
        Ok(())
    }

    async fn insert_reaction(&self, reaction: Reaction) -> Result<(), ServiceError> {
        let mut store = self.backend.lock();
        if store.faults.fail_reactions {
            return Err(injected());
        }
        if !store.messages.iter().any(|m| m.id == reaction.message_id) {
            return Err(ServiceError::Constraint {
                code: FOREIGN_KEY_VIOLATION.into(),
                message: format!("message {} does not exist", reaction.message_id),
            });
        }

        store.reactions.push(reaction.clone());
        store.deliver(ChangeKind::Insert, &Row::Reaction(reaction));
        Ok(())
    }

    async fn update_status(
        &self,
        user_id: &UserId,
        status: ProfileStatus,
        last_seen: Timestamp,
    ) -> Result<(), ServiceError> {
        let mut store = self.backend.lock();
        if store.faults.fail_status {
            return Err(injected());
        }

        let profile = store.profiles.get_mut(user_id).ok_or_else(|| ServiceError::NotFound {
            relation: Relation::Profiles,
            key: user_id.to_string(),
        })?;
        profile.status = status;
        profile.last_seen = last_seen;

        let row = Row::Profile(profile.clone());
        store.deliver(ChangeKind::Update, &row);
        Ok(())
    }
}

impl Realtime for MemoryConnection {
    fn subscribe(
        &self,
        id: SubscriptionId,
        topic: Topic,
        sink: FeedSink,
    ) -> Result<(), ServiceError> {
        let mut store = self.backend.lock();
        if store.faults.fail_subscribe {
            return Err(injected());
        }

        let key = (self.id, id);
        if store.subscriptions.contains_key(&key) {
            return Err(ServiceError::Rejected(format!("subscription {id} already open")));
        }

        tracing::trace!(connection = self.id, subscription = %id, %topic, "subscribed");
        let channel = match &topic {
            Topic::Presence { name, .. } => Some(name.clone()),
            Topic::Changes { .. } => None,
        };
        store.subscriptions.insert(key, Subscription { topic, sink, announced: None });

        if let Some(channel) = channel {
            store.sync_presence(&channel);
        }
        Ok(())
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut store = self.backend.lock();
        let Some(sub) = store.subscriptions.remove(&(self.id, id)) else {
            return;
        };

        tracing::trace!(connection = self.id, subscription = %id, "unsubscribed");
        if let (Topic::Presence { name, .. }, Some(_)) = (&sub.topic, &sub.announced) {
            store.sync_presence(name);
        }
    }

    fn track(&self, id: SubscriptionId, state: PresenceState) -> Result<(), ServiceError> {
        let mut store = self.backend.lock();
        let Some(sub) = store.subscriptions.get_mut(&(self.id, id)) else {
            return Err(ServiceError::Closed(id));
        };
        let Topic::Presence { name, .. } = &sub.topic else {
            return Err(ServiceError::Rejected(format!("{id} is not a presence subscription")));
        };

        let channel = name.clone();
        sub.announced = Some(state);
        store.sync_presence(&channel);
        Ok(())
    }
}
