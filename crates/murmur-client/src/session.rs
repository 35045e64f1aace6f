//! Room session controller.
//!
//! The `Session` owns everything the local user sees of one chat session:
//! the room directory, the active room's message stream, its typing
//! presence, and reaction counts. It performs no I/O. Every external call is
//! returned as an [`Effect`] and its result is fed back as a completion
//! event.
//!
//! # Room switches
//!
//! Each selection bumps the session generation and opens fresh
//! subscriptions. Completions carry the generation they were issued under
//! and feed events carry their subscription id; anything belonging to a
//! previous selection is dropped, so a slow history load or a late insert
//! can never leak into the newly active room.

use std::{ops::Sub, time::Duration};

use murmur_core::{
    ChangeKind, FeedEvent, FeedPayload, Membership, MessageId, MessageRow, NewMessage,
    PresenceState, Profile, ProfileStatus, Reaction, Room, RoomId, Row, ServiceError,
    SubscriptionId, Topic, UserId,
};

use crate::{
    config::{HistoryFailurePolicy, ReactionPolicy, SessionConfig},
    directory::SessionDirectory,
    error::SessionError,
    event::{Effect, Generation, Notice, Notification, SessionAction, SessionEvent},
    presence::PresenceTracker,
    reactions::{ReactionClaims, ReactionCounts},
    stream::{InsertOutcome, MessageStream},
};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, not yet started.
    Idle,
    /// Started and accepting input.
    Running,
    /// Ended; only late completions are tolerated.
    Ended,
}

/// State of the selected room.
#[derive(Debug)]
struct ActiveRoom<I> {
    room_id: RoomId,
    generation: Generation,
    stream: MessageStream,
    presence: PresenceTracker<I>,
    reactions: ReactionCounts,
    message_subscription: SubscriptionId,
    presence_subscription: SubscriptionId,
}

impl<I> ActiveRoom<I> {
    fn owns(&self, subscription: SubscriptionId) -> bool {
        subscription == self.message_subscription || subscription == self.presence_subscription
    }
}

/// Client-side chat session.
#[derive(Debug)]
pub struct Session<I = std::time::Instant> {
    config: SessionConfig,
    user_id: UserId,
    phase: Phase,
    directory: SessionDirectory,
    active: Option<ActiveRoom<I>>,
    /// Subscription to room list changes while running.
    rooms_subscription: Option<SubscriptionId>,
    /// Last generation handed out. Zero before the first selection.
    generation: Generation,
    next_subscription: u64,
    claims: ReactionClaims,
}

impl<I> Session<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create an idle session for a user.
    pub fn new(user_id: UserId, config: SessionConfig) -> Self {
        Self {
            config,
            directory: SessionDirectory::new(user_id.clone()),
            user_id,
            phase: Phase::Idle,
            active: None,
            rooms_subscription: None,
            generation: 0,
            next_subscription: 0,
            claims: ReactionClaims::default(),
        }
    }

    /// Local user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Rooms and cached profiles.
    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// Selected room, if any.
    pub fn active_room(&self) -> Option<&RoomId> {
        self.active.as_ref().map(|a| &a.room_id)
    }

    /// Generation of the current selection.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Message stream of the selected room.
    pub fn stream(&self) -> Option<&MessageStream> {
        self.active.as_ref().map(|a| &a.stream)
    }

    /// Usernames typing in the selected room, sorted.
    pub fn typing_usernames(&self) -> Vec<String> {
        self.active
            .as_ref()
            .map(|a| a.presence.typing_usernames().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Whether the local user is announced as typing.
    pub fn is_typing(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.presence.is_typing())
    }

    /// Reaction counts of a message in the selected room.
    pub fn reaction_counts(&self, message_id: &MessageId) -> Vec<(String, u32)> {
        self.active.as_ref().map(|a| a.reactions.counts(message_id)).unwrap_or_default()
    }

    /// Subscriptions the session currently considers open.
    pub fn live_subscriptions(&self) -> Vec<SubscriptionId> {
        let mut live: Vec<_> = self.rooms_subscription.into_iter().collect();
        if let Some(active) = &self.active {
            live.push(active.message_subscription);
            live.push(active.presence_subscription);
        }
        live
    }

    /// Process an event and return resulting actions.
    ///
    /// Intents are rejected with an error when they cannot apply. Completions
    /// and feed events never fail; stale ones produce no actions.
    pub fn handle(&mut self, event: SessionEvent<I>) -> Result<Vec<SessionAction>, SessionError> {
        match self.phase {
            Phase::Ended if matches!(event, SessionEvent::End) => return Ok(Vec::new()),
            Phase::Ended if event.is_intent() => return Err(SessionError::Ended),
            Phase::Ended => {
                tracing::trace!("ignoring event after session end");
                return Ok(Vec::new());
            },
            Phase::Idle if matches!(event, SessionEvent::Start) => {},
            Phase::Idle if event.is_intent() => return Err(SessionError::NotStarted),
            Phase::Idle => return Ok(Vec::new()),
            Phase::Running => {},
        }

        match event {
            SessionEvent::Start => Ok(self.handle_start()),
            SessionEvent::End => Ok(self.handle_end()),
            SessionEvent::SelectRoom { room_id } => Ok(self.select_room(room_id)),
            SessionEvent::RetryHistory => self.handle_retry_history(),
            SessionEvent::InputChanged { now } => Ok(self.handle_input_changed(now)),
            SessionEvent::Tick { now } => Ok(self.handle_tick(now)),
            SessionEvent::SendMessage { content } => self.handle_send_message(&content),
            SessionEvent::React { message_id, symbol } => self.handle_react(message_id, &symbol),
            SessionEvent::RoomsLoaded(result) => Ok(self.handle_rooms_loaded(result)),
            SessionEvent::ProfileLoaded(result) => Ok(self.handle_profile_loaded(result)),
            SessionEvent::HistoryLoaded { generation, result } => {
                Ok(self.handle_history_loaded(generation, result))
            },
            SessionEvent::AuthorResolved { generation, message_id, result } => {
                Ok(self.handle_author_resolved(generation, &message_id, result))
            },
            SessionEvent::MembershipUpserted { room_id, result } => {
                Self::log_membership(&room_id, result);
                Ok(Vec::new())
            },
            SessionEvent::MessageInserted { generation, content, result } => {
                Ok(self.handle_message_inserted(generation, content, result))
            },
            SessionEvent::ReactionInserted { generation, reaction, result } => {
                Ok(self.handle_reaction_inserted(generation, reaction, result))
            },
            SessionEvent::StatusUpdated { status, result } => {
                match result {
                    Ok(()) => tracing::debug!(status = status.as_str(), "status updated"),
                    Err(e) => tracing::warn!(status = status.as_str(), error = %e, "status update failed"),
                }
                Ok(Vec::new())
            },
            SessionEvent::SubscriptionFailed { subscription, error } => {
                tracing::warn!(%subscription, error = %error, "subscription failed");
                Ok(Vec::new())
            },
            SessionEvent::Feed(event) => Ok(self.handle_feed(event)),
        }
    }

    fn handle_start(&mut self) -> Vec<SessionAction> {
        self.phase = Phase::Running;
        let subscription = self.allocate_subscription();
        self.rooms_subscription = Some(subscription);

        tracing::info!(user = %self.user_id, "session started");

        vec![
            SessionAction::Execute(Effect::UpdateStatus {
                user_id: self.user_id.clone(),
                status: ProfileStatus::Online,
            }),
            SessionAction::Execute(Effect::LoadProfile { user_id: self.user_id.clone() }),
            SessionAction::Execute(Effect::LoadRooms),
            SessionAction::Execute(Effect::Subscribe { subscription, topic: Topic::rooms() }),
        ]
    }

    fn handle_end(&mut self) -> Vec<SessionAction> {
        self.phase = Phase::Ended;

        let mut actions: Vec<SessionAction> = self
            .live_subscriptions()
            .into_iter()
            .map(|subscription| SessionAction::Execute(Effect::Unsubscribe { subscription }))
            .collect();
        self.rooms_subscription = None;
        self.active = None;

        actions.push(SessionAction::Execute(Effect::UpdateStatus {
            user_id: self.user_id.clone(),
            status: ProfileStatus::Offline,
        }));

        tracing::info!(user = %self.user_id, "session ended");
        actions
    }

    fn select_room(&mut self, room_id: RoomId) -> Vec<SessionAction> {
        let membership = Effect::UpsertMembership(Membership {
            room_id: room_id.clone(),
            user_id: self.user_id.clone(),
        });

        if self.active_room() == Some(&room_id) {
            return vec![SessionAction::Execute(membership)];
        }

        let mut actions = Vec::new();
        if let Some(previous) = self.active.take() {
            tracing::debug!(room = %previous.room_id, generation = previous.generation, "leaving room");
            actions.push(SessionAction::Execute(Effect::Unsubscribe {
                subscription: previous.message_subscription,
            }));
            actions.push(SessionAction::Execute(Effect::Unsubscribe {
                subscription: previous.presence_subscription,
            }));
        }

        self.generation += 1;
        let generation = self.generation;
        let message_subscription = self.allocate_subscription();
        let presence_subscription = self.allocate_subscription();

        self.active = Some(ActiveRoom {
            room_id: room_id.clone(),
            generation,
            stream: MessageStream::new(room_id.clone()),
            presence: PresenceTracker::new(
                self.user_id.clone(),
                self.directory.own_username().map(str::to_owned),
                self.config.typing_idle_timeout,
            ),
            reactions: ReactionCounts::default(),
            message_subscription,
            presence_subscription,
        });

        tracing::info!(room = %room_id, generation, "room selected");

        actions.extend([
            SessionAction::Execute(Effect::Subscribe {
                subscription: message_subscription,
                topic: Topic::messages_in(&room_id),
            }),
            SessionAction::Execute(Effect::Subscribe {
                subscription: presence_subscription,
                topic: Topic::typing_in(&room_id, &self.user_id),
            }),
            SessionAction::Execute(Effect::LoadHistory { generation, room_id: room_id.clone() }),
            SessionAction::Execute(membership),
            SessionAction::Notify(Notification::RoomSelected { room_id }),
        ]);
        actions
    }

    fn handle_retry_history(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NoActiveRoom)?;
        if !active.stream.retry_history() {
            return Ok(Vec::new());
        }

        tracing::debug!(room = %active.room_id, generation = active.generation, "retrying history");
        Ok(vec![SessionAction::Execute(Effect::LoadHistory {
            generation: active.generation,
            room_id: active.room_id.clone(),
        })])
    }

    fn handle_input_changed(&mut self, now: I) -> Vec<SessionAction> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        active
            .presence
            .input_changed(now)
            .map(|state| vec![track(active.presence_subscription, state)])
            .unwrap_or_default()
    }

    fn handle_tick(&mut self, now: I) -> Vec<SessionAction> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        active
            .presence
            .tick(now)
            .map(|state| vec![track(active.presence_subscription, state)])
            .unwrap_or_default()
    }

    fn handle_send_message(&mut self, content: &str) -> Result<Vec<SessionAction>, SessionError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let active = self.active.as_ref().ok_or(SessionError::NoActiveRoom)?;

        Ok(vec![SessionAction::Execute(Effect::InsertMessage {
            generation: active.generation,
            message: NewMessage {
                room_id: active.room_id.clone(),
                user_id: self.user_id.clone(),
                content: content.to_owned(),
            },
        })])
    }

    fn handle_react(
        &mut self,
        message_id: MessageId,
        symbol: &str,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(SessionError::EmptyReaction);
        }
        let active = self.active.as_ref().ok_or(SessionError::NoActiveRoom)?;
        if active.stream.get(&message_id).is_none() {
            return Err(SessionError::UnknownMessage(message_id));
        }

        if self.config.reaction_policy == ReactionPolicy::OncePerUser
            && !self.claims.claim(&message_id, symbol)
        {
            return Err(SessionError::DuplicateReaction { message_id, symbol: symbol.to_owned() });
        }

        Ok(vec![SessionAction::Execute(Effect::InsertReaction {
            generation: active.generation,
            reaction: Reaction { message_id, user_id: self.user_id.clone(), symbol: symbol.to_owned() },
        })])
    }

    fn handle_rooms_loaded(&mut self, result: Result<Vec<Room>, ServiceError>) -> Vec<SessionAction> {
        let rooms = match result {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::warn!(error = %e, "room list load failed");
                return Vec::new();
            },
        };

        let first_load = self.directory.replace_rooms(rooms);
        tracing::debug!(count = self.directory.rooms().len(), first_load, "rooms loaded");

        let mut actions =
            vec![SessionAction::Notify(Notification::RoomsUpdated(self.directory.rooms().to_vec()))];

        if first_load
            && self.config.auto_select_first_room
            && self.active.is_none()
            && let Some(first) = self.directory.rooms().first()
        {
            let room_id = first.id.clone();
            actions.extend(self.select_room(room_id));
        }
        actions
    }

    fn handle_profile_loaded(
        &mut self,
        result: Result<Profile, ServiceError>,
    ) -> Vec<SessionAction> {
        let profile = match result {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user = %self.user_id, error = %e, "profile load failed");
                return Vec::new();
            },
        };

        if profile.id != self.user_id {
            self.directory.remember(profile);
            return Vec::new();
        }

        if let Some(active) = self.active.as_mut() {
            active.presence.set_username(Some(profile.username.clone()));
        }
        self.directory.remember(profile.clone());
        vec![SessionAction::Notify(Notification::ProfileUpdated(profile))]
    }

    fn handle_history_loaded(
        &mut self,
        generation: Generation,
        result: Result<Vec<murmur_core::Message>, ServiceError>,
    ) -> Vec<SessionAction> {
        let Some(active) = self.active.as_mut().filter(|a| a.generation == generation) else {
            tracing::debug!(generation, "dropping stale history");
            return Vec::new();
        };

        match result {
            Ok(history) => {
                tracing::debug!(room = %active.room_id, count = history.len(), "history loaded");
                active.stream.load_history(history);
            },
            Err(e) => match self.config.history_failure {
                HistoryFailurePolicy::SilentEmpty => {
                    tracing::warn!(room = %active.room_id, error = %e, "history unavailable, showing empty");
                    active.stream.history_empty();
                },
                HistoryFailurePolicy::Surface => {
                    tracing::warn!(room = %active.room_id, error = %e, "history unavailable");
                    active.stream.history_failed(e.to_string());
                    return vec![SessionAction::Notify(Notification::Notice(
                        Notice::HistoryUnavailable {
                            room_id: active.room_id.clone(),
                            reason: e.to_string(),
                        },
                    ))];
                },
            },
        }

        vec![messages_updated(active)]
    }

    fn handle_author_resolved(
        &mut self,
        generation: Generation,
        message_id: &MessageId,
        result: Result<Profile, ServiceError>,
    ) -> Vec<SessionAction> {
        let username = match result {
            Ok(profile) => {
                let username = profile.username.clone();
                self.directory.remember(profile);
                Some(username)
            },
            Err(e) => {
                tracing::debug!(message_id = %message_id, error = %e, "author lookup failed");
                None
            },
        };

        let Some(active) = self.active.as_mut().filter(|a| a.generation == generation) else {
            tracing::debug!(generation, message_id = %message_id, "dropping stale author");
            return Vec::new();
        };

        if active.stream.resolve_author(message_id, username) {
            vec![messages_updated(active)]
        } else {
            Vec::new()
        }
    }

    fn log_membership(room_id: &RoomId, result: Result<(), ServiceError>) {
        match result {
            Ok(()) => tracing::debug!(room = %room_id, "membership recorded"),
            Err(e) if e.is_unique_violation() => {
                tracing::debug!(room = %room_id, "already a member");
            },
            Err(e) => tracing::warn!(room = %room_id, error = %e, "membership upsert failed"),
        }
    }

    /// A failed send is reported whichever room is active. A successful one
    /// only touches presence and the draft of the room it was sent from.
    fn handle_message_inserted(
        &mut self,
        generation: Generation,
        content: String,
        result: Result<MessageRow, ServiceError>,
    ) -> Vec<SessionAction> {
        match result {
            Ok(row) => {
                tracing::debug!(room = %row.room_id, message_id = %row.id, "message stored");
                let Some(active) = self.active.as_mut().filter(|a| a.generation == generation)
                else {
                    tracing::debug!(generation, "send confirmed after leaving its room");
                    return Vec::new();
                };
                let state = active.presence.message_sent();
                vec![
                    track(active.presence_subscription, state),
                    SessionAction::Notify(Notification::MessageSent { content }),
                ]
            },
            Err(e) => {
                tracing::warn!(error = %e, "message send failed");
                vec![SessionAction::Notify(Notification::Notice(Notice::SendFailed {
                    content,
                    reason: e.to_string(),
                }))]
            },
        }
    }

    fn handle_reaction_inserted(
        &mut self,
        generation: Generation,
        reaction: Reaction,
        result: Result<(), ServiceError>,
    ) -> Vec<SessionAction> {
        if let Err(e) = result {
            tracing::warn!(message_id = %reaction.message_id, error = %e, "reaction failed");
            self.claims.release(&reaction.message_id, &reaction.symbol);
            return vec![SessionAction::Notify(Notification::Notice(Notice::ReactionFailed {
                message_id: reaction.message_id,
                reason: e.to_string(),
            }))];
        }

        let Some(active) = self.active.as_mut().filter(|a| a.generation == generation) else {
            tracing::debug!(generation, "reaction stored for a room no longer shown");
            return Vec::new();
        };

        let counts = active.reactions.record(&reaction.message_id, &reaction.symbol);
        vec![SessionAction::Notify(Notification::ReactionsUpdated {
            room_id: active.room_id.clone(),
            message_id: reaction.message_id,
            counts,
        })]
    }

    fn handle_feed(&mut self, event: FeedEvent) -> Vec<SessionAction> {
        let FeedEvent { subscription, payload } = event;

        if self.rooms_subscription == Some(subscription) {
            return match payload {
                FeedPayload::Change { kind, .. } => {
                    tracing::debug!(?kind, "room list changed");
                    vec![SessionAction::Execute(Effect::LoadRooms)]
                },
                FeedPayload::PresenceSync(_) => Vec::new(),
            };
        }

        let Some(active) = self.active.as_mut().filter(|a| a.owns(subscription)) else {
            tracing::debug!(%subscription, "dropping event from closed subscription");
            return Vec::new();
        };

        match payload {
            FeedPayload::Change { kind: ChangeKind::Insert, row: Row::Message(row) }
                if subscription == active.message_subscription =>
            {
                let message_id = row.id.clone();
                let user_id = row.user_id.clone();
                match active.stream.accept_insert(row) {
                    InsertOutcome::NeedsAuthor => {
                        vec![SessionAction::Execute(Effect::ResolveAuthor {
                            generation: active.generation,
                            message_id,
                            user_id,
                        })]
                    },
                    InsertOutcome::Duplicate => {
                        tracing::debug!(message_id = %message_id, "duplicate delivery");
                        Vec::new()
                    },
                    InsertOutcome::WrongRoom => {
                        tracing::debug!(message_id = %message_id, "insert for another room");
                        Vec::new()
                    },
                }
            },
            FeedPayload::PresenceSync(snapshot) if subscription == active.presence_subscription => {
                if active.presence.sync(&snapshot) {
                    vec![SessionAction::Notify(Notification::TypingUpdated {
                        room_id: active.room_id.clone(),
                        usernames: active.presence.typing_usernames().map(str::to_owned).collect(),
                    })]
                } else {
                    Vec::new()
                }
            },
            other => {
                tracing::trace!(%subscription, ?other, "ignoring feed payload");
                Vec::new()
            },
        }
    }

    fn allocate_subscription(&mut self) -> SubscriptionId {
        self.next_subscription += 1;
        SubscriptionId(self.next_subscription)
    }
}

fn track(subscription: SubscriptionId, state: PresenceState) -> SessionAction {
    SessionAction::Execute(Effect::Track { subscription, state })
}

fn messages_updated<I>(active: &ActiveRoom<I>) -> SessionAction {
    SessionAction::Notify(Notification::MessagesUpdated {
        room_id: active.room_id.clone(),
        messages: active.stream.snapshot(),
    })
}
