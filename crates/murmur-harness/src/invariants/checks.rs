//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// Displayed messages are in strictly increasing `(created_at, id)` order.
pub struct MessagesOrdered;

impl Invariant for MessagesOrdered {
    fn name(&self) -> &'static str {
        "messages_ordered"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for pair in client.messages.windows(2) {
                let [a, b] = pair else { continue };
                if a.order_key() >= b.order_key() {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "{}: {} ({}) shown before {} ({})",
                            client.label, a.id, a.created_at, b.id, b.created_at
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// No message is displayed twice.
pub struct UniqueMessages;

impl Invariant for UniqueMessages {
    fn name(&self) -> &'static str {
        "unique_messages"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let mut seen = HashSet::new();
            for message in &client.messages {
                if !seen.insert(&message.id) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{}: {} displayed twice", client.label, message.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Every displayed message belongs to the room on screen.
///
/// Deliveries and completions for a room the user already left must never
/// reach the view of the next one.
pub struct ChannelIsolation;

impl Invariant for ChannelIsolation {
    fn name(&self) -> &'static str {
        "channel_isolation"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let stray = client
                .messages
                .iter()
                .find(|m| client.active_room.as_ref() != Some(&m.room_id));

            if let Some(message) = stray {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: message {} of {} shown in {:?}",
                        client.label, message.id, message.room_id, client.active_room
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A client never lists itself among the users typing.
pub struct SelfNeverTyping;

impl Invariant for SelfNeverTyping {
    fn name(&self) -> &'static str {
        "self_never_typing"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(username) = &client.username else { continue };
            if client.typing.contains(username) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{}: own name {username} in typing list", client.label),
                });
            }
        }
        Ok(())
    }
}

/// The UI shows exactly what the session holds.
///
/// Only checked for snapshots that carry session state.
pub struct ViewMatchesSession;

impl Invariant for ViewMatchesSession {
    fn name(&self) -> &'static str {
        "view_matches_session"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(session) = &client.session else { continue };

            if session.active_room != client.active_room {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: view shows {:?}, session is in {:?}",
                        client.label, client.active_room, session.active_room
                    ),
                });
            }

            let shown: Vec<_> = client.messages.iter().map(|m| &m.id).collect();
            let held: Vec<_> = session.displayed.iter().collect();
            if shown != held {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: view shows {} messages, session displays {}",
                        client.label,
                        shown.len(),
                        held.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// At most one room's subscriptions are open, plus the room list.
///
/// Only checked for snapshots that carry session state.
pub struct SingleRoomSubscriptions;

impl Invariant for SingleRoomSubscriptions {
    fn name(&self) -> &'static str {
        "single_room_subscriptions"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(session) = &client.session else { continue };
            let live = &session.live_subscriptions;

            let unique: HashSet<_> = live.iter().collect();
            let expected_max = if session.active_room.is_some() { 3 } else { 1 };

            if unique.len() != live.len() || live.len() > expected_max {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: {} live subscriptions {:?} (at most {expected_max})",
                        client.label,
                        live.len(),
                        live
                    ),
                });
            }
        }
        Ok(())
    }
}
