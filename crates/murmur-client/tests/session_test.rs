//! Session scenario tests.
//!
//! Drive the session by hand, playing the part of the runtime: execute
//! nothing, answer effects with crafted completions, and inject feed events.

#![allow(clippy::disallowed_methods)]

use std::time::{Duration, Instant};

use murmur_client::{
    Effect, HistoryFailurePolicy, HistoryState, Notice, Notification, ReactionPolicy, Session,
    SessionAction, SessionConfig, SessionError, SessionEvent,
};
use murmur_core::{
    ChangeKind, FeedEvent, FeedPayload, Message, MessageRow, PresenceSnapshot, PresenceState,
    Profile, ProfileStatus, Reaction, Relation, Room, RoomId, Row, ServiceError, SubscriptionId, Topic,
    UNIQUE_VIOLATION, UNKNOWN_AUTHOR,
};

fn room(id: &str, created_at: u64) -> Room {
    Room { id: id.into(), name: format!("#{id}"), created_at }
}

fn profile(id: &str, username: &str) -> Profile {
    Profile { id: id.into(), username: username.into(), status: ProfileStatus::Online, last_seen: 0 }
}

fn row(id: &str, room: &str, user: &str, created_at: u64) -> MessageRow {
    MessageRow {
        id: id.into(),
        room_id: room.into(),
        user_id: user.into(),
        content: format!("content of {id}"),
        created_at,
    }
}

fn effects(actions: &[SessionAction]) -> Vec<&Effect> {
    actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Execute(effect) => Some(effect),
            SessionAction::Notify(_) => None,
        })
        .collect()
}

fn notifications(actions: &[SessionAction]) -> Vec<&Notification> {
    actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Notify(n) => Some(n),
            SessionAction::Execute(_) => None,
        })
        .collect()
}

/// Subscriptions opened by a batch of actions, by topic.
fn subscription_for(actions: &[SessionAction], wanted: &Topic) -> SubscriptionId {
    effects(actions)
        .into_iter()
        .find_map(|e| match e {
            Effect::Subscribe { subscription, topic } if topic == wanted => Some(*subscription),
            _ => None,
        })
        .expect("subscription opened")
}

fn history_generation(actions: &[SessionAction]) -> u64 {
    effects(actions)
        .into_iter()
        .find_map(|e| match e {
            Effect::LoadHistory { generation, .. } => Some(*generation),
            _ => None,
        })
        .expect("history requested")
}

fn insert(subscription: SubscriptionId, row: MessageRow) -> SessionEvent {
    SessionEvent::Feed(FeedEvent {
        subscription,
        payload: FeedPayload::Change { kind: ChangeKind::Insert, row: Row::Message(row) },
    })
}

fn displayed(session: &Session) -> Vec<(String, String)> {
    session
        .stream()
        .map(|s| s.messages().map(|m| (m.author().to_owned(), m.content.clone())).collect())
        .unwrap_or_default()
}

struct Joined {
    session: Session,
    messages: SubscriptionId,
    presence: SubscriptionId,
    generation: u64,
}

/// Start a session as `u1`/alice and select `general`.
fn joined(config: SessionConfig) -> Joined {
    let mut session = Session::new("u1".into(), config);
    session.handle(SessionEvent::Start).unwrap();
    session.handle(SessionEvent::ProfileLoaded(Ok(profile("u1", "alice")))).unwrap();
    let actions = session.handle(SessionEvent::SelectRoom { room_id: "general".into() }).unwrap();

    let general = RoomId::from("general");
    Joined {
        messages: subscription_for(&actions, &Topic::messages_in(&general)),
        presence: subscription_for(&actions, &Topic::typing_in(&general, &"u1".into())),
        generation: history_generation(&actions),
        session,
    }
}

#[test]
fn start_goes_online_and_watches_rooms() {
    let mut session: Session = Session::new("u1".into(), SessionConfig::default());
    let actions = session.handle(SessionEvent::Start).unwrap();

    let effects = effects(&actions);
    assert!(matches!(
        effects[0],
        Effect::UpdateStatus { status: ProfileStatus::Online, .. }
    ));
    assert!(effects.contains(&&Effect::LoadRooms));
    assert!(effects.contains(&&Effect::LoadProfile { user_id: "u1".into() }));
    assert!(effects.iter().any(|e| matches!(e, Effect::Subscribe { topic, .. } if *topic == Topic::rooms())));
}

#[test]
fn first_room_list_selects_the_oldest_room() {
    let mut session: Session = Session::new("u1".into(), SessionConfig::default());
    session.handle(SessionEvent::Start).unwrap();

    let actions = session
        .handle(SessionEvent::RoomsLoaded(Ok(vec![room("random", 2), room("general", 1)])))
        .unwrap();

    assert_eq!(session.active_room(), Some(&"general".into()));
    assert!(notifications(&actions)
        .contains(&&Notification::RoomSelected { room_id: "general".into() }));

    // A reload never switches rooms on its own.
    session.handle(SessionEvent::RoomsLoaded(Ok(vec![room("aaa", 0)]))).unwrap();
    assert_eq!(session.active_room(), Some(&"general".into()));
}

#[test]
fn room_switch_unsubscribes_before_subscribing() {
    let mut joined = joined(SessionConfig::default());
    let actions = joined.session.handle(SessionEvent::SelectRoom { room_id: "random".into() }).unwrap();

    let effects = effects(&actions);
    assert_eq!(effects[0], &Effect::Unsubscribe { subscription: joined.messages });
    assert_eq!(effects[1], &Effect::Unsubscribe { subscription: joined.presence });
    assert!(matches!(effects[2], Effect::Subscribe { .. }));
    assert!(matches!(effects[3], Effect::Subscribe { .. }));
    assert!(matches!(effects[4], Effect::LoadHistory { .. }));
    assert!(matches!(effects[5], Effect::UpsertMembership(_)));
    assert_eq!(joined.session.live_subscriptions().len(), 3);
}

#[test]
fn reselecting_active_room_only_upserts_membership() {
    let mut joined = joined(SessionConfig::default());
    let actions = joined.session.handle(SessionEvent::SelectRoom { room_id: "general".into() }).unwrap();

    assert_eq!(actions.len(), 1);
    assert!(matches!(&actions[0], SessionAction::Execute(Effect::UpsertMembership(m)) if m.room_id.as_str() == "general"));
}

#[test]
fn duplicate_membership_is_swallowed() {
    let mut joined = joined(SessionConfig::default());
    let actions = joined
        .session
        .handle(SessionEvent::MembershipUpserted {
            room_id: "general".into(),
            result: Err(ServiceError::Constraint {
                code: UNIQUE_VIOLATION.into(),
                message: "duplicate key".into(),
            }),
        })
        .unwrap();
    assert!(actions.is_empty());
}

#[test]
fn sent_message_shows_author_after_round_trip() {
    let mut joined = joined(SessionConfig::default());
    joined
        .session
        .handle(SessionEvent::HistoryLoaded { generation: joined.generation, result: Ok(vec![]) })
        .unwrap();

    let actions = joined.session.handle(SessionEvent::SendMessage { content: " hello ".into() }).unwrap();
    let first = effects(&actions).first().copied();
    let Some(Effect::InsertMessage { generation, message: new }) = first else {
        panic!("expected insert, got {actions:?}");
    };
    assert_eq!(*generation, joined.generation);
    assert_eq!(new.content, "hello");

    let stored = MessageRow { content: "hello".into(), ..row("m1", "general", "u1", 10) };
    joined
        .session
        .handle(SessionEvent::MessageInserted {
            generation: joined.generation,
            content: "hello".into(),
            result: Ok(stored.clone()),
        })
        .unwrap();

    // Not shown until the change feed delivers it.
    assert!(displayed(&joined.session).is_empty());

    let actions = joined.session.handle(insert(joined.messages, stored)).unwrap();
    assert_eq!(
        effects(&actions),
        [&Effect::ResolveAuthor {
            generation: joined.generation,
            message_id: "m1".into(),
            user_id: "u1".into(),
        }]
    );
    assert!(displayed(&joined.session).is_empty());

    joined
        .session
        .handle(SessionEvent::AuthorResolved {
            generation: joined.generation,
            message_id: "m1".into(),
            result: Ok(profile("u1", "alice")),
        })
        .unwrap();

    assert_eq!(displayed(&joined.session), [("alice".to_owned(), "hello".to_owned())]);
}

#[test]
fn failed_author_lookup_shows_placeholder() {
    let mut joined = joined(SessionConfig::default());
    joined.session.handle(insert(joined.messages, row("m1", "general", "ghost", 5))).unwrap();

    joined
        .session
        .handle(SessionEvent::AuthorResolved {
            generation: joined.generation,
            message_id: "m1".into(),
            result: Err(ServiceError::NotFound { relation: Relation::Profiles, key: "ghost".into() }),
        })
        .unwrap();

    assert_eq!(displayed(&joined.session)[0].0, UNKNOWN_AUTHOR);
}

#[test]
fn duplicate_insert_displays_once() {
    let mut joined = joined(SessionConfig::default());
    let first = joined.session.handle(insert(joined.messages, row("m1", "general", "u2", 5))).unwrap();
    let second = joined.session.handle(insert(joined.messages, row("m1", "general", "u2", 5))).unwrap();

    assert_eq!(effects(&first).len(), 1);
    assert!(second.is_empty());

    joined
        .session
        .handle(SessionEvent::AuthorResolved {
            generation: joined.generation,
            message_id: "m1".into(),
            result: Ok(profile("u2", "bob")),
        })
        .unwrap();
    let third = joined.session.handle(insert(joined.messages, row("m1", "general", "u2", 5))).unwrap();

    assert!(third.is_empty());
    assert_eq!(joined.session.stream().map(|s| s.len()), Some(1));
}

#[test]
fn late_events_from_previous_room_are_dropped() {
    let mut joined = joined(SessionConfig::default());
    let old_messages = joined.messages;
    let old_presence = joined.presence;
    let old_generation = joined.generation;

    joined.session.handle(insert(old_messages, row("m0", "general", "u2", 1))).unwrap();
    joined.session.handle(SessionEvent::SelectRoom { room_id: "random".into() }).unwrap();

    let late_history = joined
        .session
        .handle(SessionEvent::HistoryLoaded {
            generation: old_generation,
            result: Ok(vec![row("m1", "general", "u2", 2).enrich(Some("bob".into()))]),
        })
        .unwrap();
    let late_author = joined
        .session
        .handle(SessionEvent::AuthorResolved {
            generation: old_generation,
            message_id: "m0".into(),
            result: Ok(profile("u2", "bob")),
        })
        .unwrap();
    let late_insert = joined.session.handle(insert(old_messages, row("m2", "general", "u2", 3))).unwrap();

    let mut snapshot = PresenceSnapshot::new();
    snapshot.insert(
        "u2".into(),
        vec![PresenceState { user_id: "u2".into(), username: Some("bob".into()), typing: true }],
    );
    let late_presence = joined
        .session
        .handle(SessionEvent::Feed(FeedEvent {
            subscription: old_presence,
            payload: FeedPayload::PresenceSync(snapshot),
        }))
        .unwrap();

    assert!(late_history.is_empty());
    assert!(late_author.is_empty());
    assert!(late_insert.is_empty());
    assert!(late_presence.is_empty());
    assert_eq!(joined.session.stream().map(|s| s.len()), Some(0));
    assert_eq!(joined.session.stream().map(|s| s.pending_len()), Some(0));
    assert!(joined.session.typing_usernames().is_empty());
}

#[test]
fn history_failure_is_surfaced_and_retryable() {
    let mut joined = joined(SessionConfig::default());
    let actions = joined
        .session
        .handle(SessionEvent::HistoryLoaded {
            generation: joined.generation,
            result: Err(ServiceError::Network("timeout".into())),
        })
        .unwrap();

    assert!(matches!(
        notifications(&actions)[..],
        [Notification::Notice(Notice::HistoryUnavailable { .. })]
    ));
    assert!(matches!(
        joined.session.stream().map(|s| s.history()),
        Some(HistoryState::Failed { .. })
    ));

    let retry = joined.session.handle(SessionEvent::RetryHistory).unwrap();
    assert_eq!(
        effects(&retry),
        [&Effect::LoadHistory { generation: joined.generation, room_id: "general".into() }]
    );

    // Nothing to retry once loading again.
    assert!(joined.session.handle(SessionEvent::RetryHistory).unwrap().is_empty());
}

#[test]
fn silent_history_failure_shows_empty_room() {
    let config = SessionConfig { history_failure: HistoryFailurePolicy::SilentEmpty, ..Default::default() };
    let mut joined = joined(config);
    let actions = joined
        .session
        .handle(SessionEvent::HistoryLoaded {
            generation: joined.generation,
            result: Err(ServiceError::Network("timeout".into())),
        })
        .unwrap();

    assert_eq!(
        notifications(&actions),
        [&Notification::MessagesUpdated { room_id: "general".into(), messages: Vec::<Message>::new() }]
    );
    assert_eq!(joined.session.stream().map(|s| s.history()), Some(&HistoryState::Loaded));
}

#[test]
fn typing_pause_announces_once() {
    let mut joined = joined(SessionConfig::default());
    let start = Instant::now();

    let mut announcements = Vec::new();
    for now in [start, start + Duration::from_secs(1), start + Duration::from_millis(1500)] {
        announcements.extend(joined.session.handle(SessionEvent::InputChanged { now }).unwrap());
        announcements.extend(joined.session.handle(SessionEvent::Tick { now }).unwrap());
    }

    assert_eq!(announcements.len(), 1);
    assert!(matches!(
        &announcements[0],
        SessionAction::Execute(Effect::Track { subscription, state })
            if *subscription == joined.presence && state.typing && state.username.as_deref() == Some("alice")
    ));

    let stop = joined.session.handle(SessionEvent::Tick { now: start + Duration::from_millis(3500) }).unwrap();
    assert!(matches!(&stop[..], [SessionAction::Execute(Effect::Track { state, .. })] if !state.typing));
    assert!(joined.session.handle(SessionEvent::Tick { now: start + Duration::from_secs(9) }).unwrap().is_empty());
}

#[test]
fn successful_send_stops_typing_immediately() {
    let mut joined = joined(SessionConfig::default());
    let start = Instant::now();
    joined.session.handle(SessionEvent::InputChanged { now: start }).unwrap();

    let actions = joined
        .session
        .handle(SessionEvent::MessageInserted {
            generation: joined.generation,
            content: "hi".into(),
            result: Ok(row("m1", "general", "u1", 1)),
        })
        .unwrap();

    let stops: Vec<_> = effects(&actions)
        .into_iter()
        .filter(|e| matches!(e, Effect::Track { state, .. } if !state.typing))
        .collect();
    assert_eq!(stops.len(), 1);
    assert!(notifications(&actions).contains(&&Notification::MessageSent { content: "hi".into() }));

    // The idle timer was cancelled.
    let later = joined.session.handle(SessionEvent::Tick { now: start + Duration::from_secs(5) }).unwrap();
    assert!(later.is_empty());
}

#[test]
fn send_confirmed_after_switching_rooms_leaves_new_room_alone() {
    let mut joined = joined(SessionConfig::default());
    let start = Instant::now();
    joined.session.handle(SessionEvent::InputChanged { now: start }).unwrap();
    joined.session.handle(SessionEvent::SendMessage { content: "hello".into() }).unwrap();

    let actions = joined.session.handle(SessionEvent::SelectRoom { room_id: "random".into() }).unwrap();
    let random_presence =
        subscription_for(&actions, &Topic::typing_in(&"random".into(), &"u1".into()));

    let actions = joined.session.handle(SessionEvent::InputChanged { now: start }).unwrap();
    let announced = effects(&actions).into_iter().any(|e| {
        matches!(e, Effect::Track { subscription, state }
            if *subscription == random_presence && state.typing)
    });
    assert!(announced);

    let actions = joined
        .session
        .handle(SessionEvent::MessageInserted {
            generation: joined.generation,
            content: "hello".into(),
            result: Ok(MessageRow { content: "hello".into(), ..row("m1", "general", "u1", 1) }),
        })
        .unwrap();

    assert!(actions.is_empty(), "late confirmation leaked into #random: {actions:?}");
    assert!(joined.session.is_typing());

    // The idle timer of the new room still runs.
    let actions =
        joined.session.handle(SessionEvent::Tick { now: start + Duration::from_secs(3) }).unwrap();
    assert_eq!(
        effects(&actions)
            .iter()
            .filter(|e| matches!(e, Effect::Track { state, .. } if !state.typing))
            .count(),
        1
    );
}

#[test]
fn failed_send_keeps_content_in_notice() {
    let mut joined = joined(SessionConfig::default());
    let actions = joined
        .session
        .handle(SessionEvent::MessageInserted {
            generation: joined.generation,
            content: "hi".into(),
            result: Err(ServiceError::Rejected("row level security".into())),
        })
        .unwrap();

    assert!(matches!(
        &actions[..],
        [SessionAction::Notify(Notification::Notice(Notice::SendFailed { content, .. }))] if content == "hi"
    ));
}

#[test]
fn send_rejects_empty_content_and_missing_room() {
    let mut session: Session = Session::new("u1".into(), SessionConfig::default());
    session.handle(SessionEvent::Start).unwrap();

    assert_eq!(
        session.handle(SessionEvent::SendMessage { content: "hi".into() }),
        Err(SessionError::NoActiveRoom)
    );
    assert_eq!(
        session.handle(SessionEvent::SendMessage { content: "   ".into() }),
        Err(SessionError::EmptyMessage)
    );
}

#[test]
fn own_presence_is_never_shown_as_typing() {
    let mut joined = joined(SessionConfig::default());
    let mut snapshot = PresenceSnapshot::new();
    snapshot.insert(
        "u1".into(),
        vec![PresenceState { user_id: "u1".into(), username: Some("alice".into()), typing: true }],
    );
    snapshot.insert(
        "u3".into(),
        vec![PresenceState { user_id: "u3".into(), username: Some("carol".into()), typing: true }],
    );

    let actions = joined
        .session
        .handle(SessionEvent::Feed(FeedEvent {
            subscription: joined.presence,
            payload: FeedPayload::PresenceSync(snapshot),
        }))
        .unwrap();

    assert_eq!(
        notifications(&actions),
        [&Notification::TypingUpdated { room_id: "general".into(), usernames: vec!["carol".into()] }]
    );
}

#[test]
fn rooms_feed_change_reloads_room_list() {
    let mut session: Session = Session::new("u1".into(), SessionConfig::default());
    let start = session.handle(SessionEvent::Start).unwrap();
    let rooms_subscription = subscription_for(&start, &Topic::rooms());

    let actions = session
        .handle(SessionEvent::Feed(FeedEvent {
            subscription: rooms_subscription,
            payload: FeedPayload::Change { kind: ChangeKind::Insert, row: Row::Room(room("new", 9)) },
        }))
        .unwrap();

    assert_eq!(effects(&actions), [&Effect::LoadRooms]);
}

#[test]
fn repeated_reactions_follow_policy() {
    let mut joined = joined(SessionConfig::default());
    joined
        .session
        .handle(SessionEvent::HistoryLoaded {
            generation: joined.generation,
            result: Ok(vec![row("m1", "general", "u2", 1).enrich(Some("bob".into()))]),
        })
        .unwrap();

    for expected in 1..=2 {
        let actions = joined
            .session
            .handle(SessionEvent::React { message_id: "m1".into(), symbol: "👍".into() })
            .unwrap();
        let Some(Effect::InsertReaction { generation, reaction }) = effects(&actions).first().copied() else {
            panic!("expected reaction insert");
        };
        let done = joined
            .session
            .handle(SessionEvent::ReactionInserted {
                generation: *generation,
                reaction: reaction.clone(),
                result: Ok(()),
            })
            .unwrap();
        assert!(matches!(
            &done[..],
            [SessionAction::Notify(Notification::ReactionsUpdated { counts, .. })] if counts == &[("👍".to_owned(), expected)]
        ));
    }
}

#[test]
fn once_per_user_rejects_repeat_until_failure_releases_it() {
    let config = SessionConfig { reaction_policy: ReactionPolicy::OncePerUser, ..Default::default() };
    let mut joined = joined(config);
    joined
        .session
        .handle(SessionEvent::HistoryLoaded {
            generation: joined.generation,
            result: Ok(vec![row("m1", "general", "u2", 1).enrich(Some("bob".into()))]),
        })
        .unwrap();

    let react = || SessionEvent::React { message_id: "m1".into(), symbol: "❤️".into() };
    joined.session.handle(react()).unwrap();
    assert!(matches!(
        joined.session.handle(react()),
        Err(SessionError::DuplicateReaction { .. })
    ));

    let failed = joined
        .session
        .handle(SessionEvent::ReactionInserted {
            generation: joined.generation,
            reaction: Reaction { message_id: "m1".into(), user_id: "u1".into(), symbol: "❤️".into() },
            result: Err(ServiceError::Network("reset".into())),
        })
        .unwrap();
    assert!(matches!(
        &failed[..],
        [SessionAction::Notify(Notification::Notice(Notice::ReactionFailed { .. }))]
    ));
    assert!(joined.session.reaction_counts(&"m1".into()).is_empty());

    assert!(joined.session.handle(react()).is_ok());
}

#[test]
fn reacting_to_unknown_message_is_rejected() {
    let mut joined = joined(SessionConfig::default());
    assert_eq!(
        joined.session.handle(SessionEvent::React { message_id: "nope".into(), symbol: "👍".into() }),
        Err(SessionError::UnknownMessage("nope".into()))
    );
}

#[test]
fn end_closes_everything_and_goes_offline() {
    let mut joined = joined(SessionConfig::default());
    let live = joined.session.live_subscriptions();
    let actions = joined.session.handle(SessionEvent::End).unwrap();

    let effects = effects(&actions);
    for subscription in live {
        assert!(effects.contains(&&Effect::Unsubscribe { subscription }));
    }
    assert!(matches!(
        effects.last(),
        Some(Effect::UpdateStatus { status: ProfileStatus::Offline, .. })
    ));

    assert_eq!(
        joined.session.handle(SessionEvent::SelectRoom { room_id: "random".into() }),
        Err(SessionError::Ended)
    );
    let late = joined.session.handle(insert(joined.messages, row("m9", "general", "u2", 1))).unwrap();
    assert!(late.is_empty());
}
