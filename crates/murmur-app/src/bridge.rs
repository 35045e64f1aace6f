//! Session-to-Application translation layer.
//!
//! The [`Bridge`] wraps the Sans-IO [`murmur_client::Session`] and adapts it
//! to the application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`]s into session intents.
//! - Accumulates outgoing [`Effect`]s for the runtime to execute in the next
//!   cycle.
//! - Converts session notifications and rejected intents back into
//!   [`crate::AppEvent`]s to update the UI.
//! - Passes time through generically to support both real-time execution and
//!   deterministic simulation.

use std::{ops::Sub, time::Duration};

use murmur_client::{
    Effect, Notice, Notification, Session, SessionAction, SessionConfig, SessionError,
    SessionEvent,
};
use murmur_core::UserId;

use crate::{AppAction, AppEvent};

/// Bridge between App and Session.
///
/// Generic over the instant type so simulations can drive it with virtual
/// time.
pub struct Bridge<I = std::time::Instant> {
    session: Session<I>,
    outgoing: Vec<Effect>,
}

impl<I> Bridge<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a bridge around a fresh session for `user_id`.
    pub fn new(user_id: UserId, config: SessionConfig) -> Self {
        Self { session: Session::new(user_id, config), outgoing: Vec::new() }
    }

    /// The wrapped session.
    pub fn session(&self) -> &Session<I> {
        &self.session
    }

    /// Start the session.
    pub fn start(&mut self) -> Vec<AppEvent> {
        let result = self.session.handle(SessionEvent::Start);
        let mut events = vec![AppEvent::SessionStarted];
        events.extend(self.handle_session_result(result));
        events
    }

    /// End the session.
    pub fn end(&mut self) -> Vec<AppEvent> {
        let result = self.session.handle(SessionEvent::End);
        let mut events = self.handle_session_result(result);
        events.push(AppEvent::SessionEnded);
        events
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction, now: I) -> Vec<AppEvent> {
        let event = match action {
            AppAction::SelectRoom { room_id } => SessionEvent::SelectRoom { room_id },
            AppAction::SendMessage { content } => SessionEvent::SendMessage { content },
            AppAction::Typing => SessionEvent::InputChanged { now },
            AppAction::React { message_id, symbol } => SessionEvent::React { message_id, symbol },
            AppAction::RetryHistory => SessionEvent::RetryHistory,
            AppAction::Logout => return self.end(),
            AppAction::Render | AppAction::Quit => return vec![],
        };
        let result = self.session.handle(event);
        self.handle_session_result(result)
    }

    /// Feed a completion or realtime delivery into the session.
    pub fn handle_event(&mut self, event: SessionEvent<I>) -> Vec<AppEvent> {
        let result = self.session.handle(event);
        self.handle_session_result(result)
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: I) -> Vec<AppEvent> {
        let result = self.session.handle(SessionEvent::Tick { now });
        self.handle_session_result(result)
    }

    /// Take pending outgoing effects.
    pub fn take_outgoing(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outgoing)
    }

    fn handle_session_result(
        &mut self,
        result: Result<Vec<SessionAction>, SessionError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_session_actions(actions),
            Err(e) => {
                tracing::debug!(error = %e, "intent rejected");
                vec![AppEvent::Error { message: e.to_string() }]
            },
        }
    }

    fn process_session_actions(&mut self, actions: Vec<SessionAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                SessionAction::Execute(effect) => self.outgoing.push(effect),
                SessionAction::Notify(notification) => events.push(translate(notification)),
            }
        }

        events
    }
}

fn translate(notification: Notification) -> AppEvent {
    match notification {
        Notification::RoomsUpdated(rooms) => AppEvent::RoomsUpdated(rooms),
        Notification::ProfileUpdated(profile) => AppEvent::ProfileUpdated(profile),
        Notification::RoomSelected { room_id } => AppEvent::RoomSelected { room_id },
        Notification::MessagesUpdated { room_id, messages } => {
            AppEvent::MessagesUpdated { room_id, messages }
        },
        Notification::TypingUpdated { room_id, usernames } => {
            AppEvent::TypingUpdated { room_id, usernames }
        },
        Notification::ReactionsUpdated { room_id, message_id, counts } => {
            AppEvent::ReactionsUpdated { room_id, message_id, counts }
        },
        Notification::MessageSent { content } => AppEvent::MessageSent { content },
        Notification::Notice(notice) => AppEvent::Notice { message: notice_text(&notice) },
    }
}

fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::SendFailed { reason, .. } => format!("Failed to send message: {reason}"),
        Notice::HistoryUnavailable { room_id, reason } => {
            format!("Could not load #{room_id} history: {reason} (/retry)")
        },
        Notice::ReactionFailed { reason, .. } => format!("Failed to add reaction: {reason}"),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use std::time::Instant;

    use murmur_core::ServiceError;

    use super::*;

    fn started() -> Bridge<Instant> {
        let mut bridge = Bridge::new("u1".into(), SessionConfig::default());
        bridge.start();
        bridge
    }

    #[test]
    fn start_queues_effects() {
        let mut bridge: Bridge<Instant> = Bridge::new("u1".into(), SessionConfig::default());
        let events = bridge.start();

        assert!(matches!(events.as_slice(), [AppEvent::SessionStarted]));
        assert!(bridge.take_outgoing().contains(&Effect::LoadRooms));
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn select_room_produces_room_selected() {
        let mut bridge = started();
        bridge.take_outgoing();

        let events = bridge
            .process_app_action(AppAction::SelectRoom { room_id: "general".into() }, Instant::now());

        assert!(events.iter().any(|e| matches!(e, AppEvent::RoomSelected { room_id } if room_id.as_str() == "general")));
        assert!(!bridge.take_outgoing().is_empty());
    }

    #[test]
    fn send_without_room_produces_error() {
        let mut bridge = started();
        let events = bridge
            .process_app_action(AppAction::SendMessage { content: "hello".into() }, Instant::now());
        assert!(events.iter().any(|e| matches!(e, AppEvent::Error { .. })));
    }

    #[test]
    fn send_failure_becomes_notice() {
        let mut bridge = started();
        let events = bridge.handle_event(SessionEvent::MessageInserted {
            generation: 0,
            content: "hello".into(),
            result: Err(ServiceError::Network("offline".into())),
        });

        assert!(matches!(
            events.as_slice(),
            [AppEvent::Notice { message }] if message == "Failed to send message: network error: offline"
        ));
    }

    #[test]
    fn logout_ends_session() {
        let mut bridge = started();
        bridge.take_outgoing();

        let events = bridge.process_app_action(AppAction::Logout, Instant::now());

        assert!(matches!(events.last(), Some(AppEvent::SessionEnded)));
        assert!(bridge.take_outgoing().iter().any(|e| matches!(e, Effect::UpdateStatus { .. })));
    }
}
