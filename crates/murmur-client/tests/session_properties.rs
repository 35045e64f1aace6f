//! Property-based tests for the session state machine.
//!
//! Tests verify ordering, deduplication and room isolation under arbitrary
//! arrival orders of realtime events and completions.

#![allow(clippy::disallowed_methods)]

use std::time::{Duration, Instant};

use murmur_client::{Effect, Session, SessionAction, SessionConfig, SessionEvent};
use murmur_core::{
    ChangeKind, FeedEvent, FeedPayload, MessageRow, Profile, ProfileStatus, Row, SubscriptionId,
    Topic,
};
use proptest::prelude::*;

/// Distinct messages with colliding timestamps, in arbitrary order.
fn rows_strategy() -> impl Strategy<Value = Vec<MessageRow>> {
    prop::collection::btree_set(0u32..500, 1..40)
        .prop_flat_map(|ids| {
            let ids: Vec<u32> = ids.into_iter().collect();
            let len = ids.len();
            (Just(ids), prop::collection::vec(0u64..20, len))
        })
        .prop_map(|(ids, stamps)| {
            ids.into_iter()
                .zip(stamps)
                .map(|(id, created_at)| MessageRow {
                    id: format!("m{id:03}").into(),
                    room_id: "general".into(),
                    user_id: format!("u{}", id % 3).into(),
                    content: format!("message {id}"),
                    created_at,
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

struct Harness {
    session: Session,
    messages: SubscriptionId,
}

impl Harness {
    fn joined(room: &str) -> Self {
        let mut session = Session::new("u1".into(), SessionConfig::default());
        session.handle(SessionEvent::Start).unwrap();
        let actions = session.handle(SessionEvent::SelectRoom { room_id: room.into() }).unwrap();
        let messages = message_subscription(&actions).unwrap();
        Self { session, messages }
    }

    /// Deliver an insert and answer its author lookup, if any.
    fn deliver(&mut self, subscription: SubscriptionId, row: MessageRow) {
        let actions = self
            .session
            .handle(SessionEvent::Feed(FeedEvent {
                subscription,
                payload: FeedPayload::Change { kind: ChangeKind::Insert, row: Row::Message(row) },
            }))
            .unwrap();

        for action in actions {
            if let SessionAction::Execute(Effect::ResolveAuthor { generation, message_id, user_id }) =
                action
            {
                self.session
                    .handle(SessionEvent::AuthorResolved {
                        generation,
                        message_id,
                        result: Ok(Profile {
                            username: format!("name-{user_id}"),
                            id: user_id,
                            status: ProfileStatus::Online,
                            last_seen: 0,
                        }),
                    })
                    .unwrap();
            }
        }
    }

    fn displayed_keys(&self) -> Vec<(u64, String)> {
        self.session
            .stream()
            .map(|s| s.messages().map(|m| (m.created_at, m.id.to_string())).collect())
            .unwrap_or_default()
    }
}

fn message_subscription(actions: &[SessionAction]) -> Option<SubscriptionId> {
    actions.iter().find_map(|a| match a {
        SessionAction::Execute(Effect::Subscribe { subscription, topic: Topic::Changes { .. } }) => {
            Some(*subscription)
        },
        _ => None,
    })
}

proptest! {
    /// Display order is `(created_at, id)` regardless of arrival order.
    #[test]
    fn prop_display_order_ignores_arrival_order(rows in rows_strategy()) {
        let mut harness = Harness::joined("general");
        let mut expected: Vec<(u64, String)> =
            rows.iter().map(|r| (r.created_at, r.id.to_string())).collect();
        expected.sort();

        for row in rows {
            harness.deliver(harness.messages, row);
        }

        prop_assert_eq!(harness.displayed_keys(), expected);
    }

    /// Redelivering inserts never duplicates a message.
    #[test]
    fn prop_redelivery_is_idempotent(
        rows in rows_strategy(),
        repeats in prop::collection::vec(0usize..40, 0..40),
    ) {
        let mut harness = Harness::joined("general");
        let distinct = rows.len();

        for row in &rows {
            harness.deliver(harness.messages, row.clone());
        }
        for index in repeats {
            harness.deliver(harness.messages, rows[index % distinct].clone());
        }

        prop_assert_eq!(harness.displayed_keys().len(), distinct);
    }

    /// After a switch nothing from the old room's subscription shows up, no
    /// matter how old-room deliveries interleave with new-room ones.
    #[test]
    fn prop_old_room_events_never_leak(
        rows in rows_strategy(),
        interleave in prop::collection::vec(any::<bool>(), 1..40),
    ) {
        let mut harness = Harness::joined("general");
        let old = harness.messages;

        let actions = harness
            .session
            .handle(SessionEvent::SelectRoom { room_id: "random".into() })
            .unwrap();
        let new = message_subscription(&actions).unwrap();

        for (row, to_old) in rows.into_iter().zip(interleave.into_iter().cycle()) {
            if to_old {
                harness.deliver(old, row);
            } else {
                harness.deliver(new, MessageRow { room_id: "random".into(), ..row });
            }
        }

        let stream = harness.session.stream().unwrap();
        prop_assert!(stream.messages().all(|m| m.room_id.as_str() == "random"));
        prop_assert_eq!(stream.pending_len(), 0);
    }

    /// Any burst of keystrokes inside the idle window announces typing once,
    /// then silence announces the stop once.
    #[test]
    fn prop_typing_burst_announces_once(gaps in prop::collection::vec(0u64..1999, 1..30)) {
        let mut harness = Harness::joined("general");
        let mut now = Instant::now();
        let mut announced = Vec::new();

        for gap in gaps {
            now += Duration::from_millis(gap);
            announced.extend(harness.session.handle(SessionEvent::Tick { now }).unwrap());
            announced.extend(harness.session.handle(SessionEvent::InputChanged { now }).unwrap());
        }
        for _ in 0..3 {
            now += Duration::from_secs(2);
            announced.extend(harness.session.handle(SessionEvent::Tick { now }).unwrap());
        }

        let states: Vec<bool> = announced
            .iter()
            .filter_map(|a| match a {
                SessionAction::Execute(Effect::Track { state, .. }) => Some(state.typing),
                _ => None,
            })
            .collect();
        prop_assert_eq!(states, vec![true, false]);
    }
}
