//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::{ops::Sub, time::Duration};

use murmur_app::{App, SessionState};
use murmur_client::Session;
use murmur_core::{Message, MessageId, RoomId, SubscriptionId};

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more clients for invariant checking.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone, Default)]
pub struct ClientSnapshot {
    /// Client label for error messages.
    pub label: String,
    /// Own username, once the profile loaded.
    pub username: Option<String>,
    /// Room the UI shows.
    pub active_room: Option<RoomId>,
    /// Messages the UI shows, in display order.
    pub messages: Vec<Message>,
    /// Remote typists the UI shows.
    pub typing: Vec<String>,
    /// Session-side state, when the session is reachable.
    pub session: Option<SessionSnapshot>,
}

/// Session-side state of a client.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Room the session considers active.
    pub active_room: Option<RoomId>,
    /// Ids the session displays, in order.
    pub displayed: Vec<MessageId>,
    /// Subscriptions the session holds open.
    pub live_subscriptions: Vec<SubscriptionId>,
}

impl ClientSnapshot {
    /// Capture what the App shows.
    pub fn from_app(app: &App) -> Self {
        let username = match app.session_state() {
            SessionState::Online { username } => username.clone(),
            SessionState::Starting | SessionState::Ended => None,
        };

        Self {
            label: "client".into(),
            username,
            active_room: app.active_room().cloned(),
            messages: app.channel().map(|c| c.messages.clone()).unwrap_or_default(),
            typing: app.channel().map(|c| c.typing.clone()).unwrap_or_default(),
            session: None,
        }
    }

    /// Attach session-side state.
    #[must_use]
    pub fn with_session<I>(mut self, session: &Session<I>) -> Self
    where
        I: Copy + Ord + Sub<Output = Duration>,
    {
        self.session = Some(SessionSnapshot {
            active_room: session.active_room().cloned(),
            displayed: session
                .stream()
                .map(|s| s.snapshot().into_iter().map(|m| m.id).collect())
                .unwrap_or_default(),
            live_subscriptions: session.live_subscriptions(),
        });
        self
    }

    /// Set the label used in violation messages.
    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
