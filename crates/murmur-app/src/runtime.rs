//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Session bridge
//! - [`Driver`]: Platform-specific UI I/O
//! - [`Backend`]: Data access and realtime capabilities
//!
//! Session effects are executed one at a time in the order the session
//! emitted them, and each completion is fed back before the next effect
//! runs. Realtime deliveries arrive on a single feed channel owned by the
//! runtime and are drained once per cycle.

use std::sync::Arc;

use murmur_client::{Effect, Phase, Session, SessionConfig, SessionEvent};
use murmur_core::{Backend, Environment, FeedEvent, FeedSink, RoomId, UserId};
use tokio::sync::{mpsc, watch};

use crate::{App, AppAction, AppEvent, Bridge, Driver};

/// Generic runtime that orchestrates App, Bridge, Driver and Backend.
///
/// # Type Parameters
///
/// - `D`: Platform-specific UI driver
/// - `E`: Environment providing time
/// - `B`: Backend the session's effects run against
pub struct Runtime<D, E, B>
where
    D: Driver,
    E: Environment,
    B: Backend + ?Sized,
{
    driver: D,
    env: E,
    backend: Arc<B>,
    app: App,
    bridge: Bridge<E::Instant>,
    feed_tx: FeedSink,
    feed_rx: mpsc::UnboundedReceiver<FeedEvent>,
    /// Single writer of the current room.
    room_tx: watch::Sender<Option<RoomId>>,
}

impl<D, E, B> Runtime<D, E, B>
where
    D: Driver,
    E: Environment,
    B: Backend + ?Sized,
{
    /// Create a runtime for `user_id`. Nothing runs until [`Self::start`].
    pub fn new(driver: D, env: E, backend: Arc<B>, user_id: UserId, config: SessionConfig) -> Self {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (room_tx, _) = watch::channel(None);
        Self {
            driver,
            env,
            backend,
            app: App::new(),
            bridge: Bridge::new(user_id, config),
            feed_tx,
            feed_rx,
            room_tx,
        }
    }

    /// Observe the current room.
    ///
    /// Only the runtime writes it, after the session confirms a switch.
    pub fn room_changes(&self) -> watch::Receiver<Option<RoomId>> {
        self.room_tx.subscribe()
    }

    /// Run the main event loop until the user quits, then end the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.start().await?;

        loop {
            if self.step().await? {
                break;
            }
        }

        self.shutdown().await
    }

    /// Render and start the session.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn start(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        let events = self.bridge.start();
        self.drive(Vec::new(), events).await.map(|_| ())
    }

    /// Process one cycle of the event loop.
    ///
    /// 1. Polls the driver for an input event
    /// 2. Drains realtime deliveries
    /// 3. Ticks the session clock
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.drive(actions, Vec::new()).await? {
                return Ok(true);
            }
        }

        if self.drain_feed().await? {
            return Ok(true);
        }

        let events = self.bridge.handle_tick(self.env.now());
        self.drive(Vec::new(), events).await
    }

    /// Deliver every queued realtime event to the session.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn drain_feed(&mut self) -> Result<bool, D::Error> {
        while let Ok(event) = self.feed_rx.try_recv() {
            let events = self.bridge.handle_event(SessionEvent::Feed(event));
            if self.drive(Vec::new(), events).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// End the session if it is still running and release the driver.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn shutdown(&mut self) -> Result<(), D::Error> {
        if self.bridge.session().phase() == Phase::Running {
            let events = self.bridge.end();
            self.drive(Vec::new(), events).await?;
        }
        self.driver.stop();
        Ok(())
    }

    /// Run App actions and App events to quiescence.
    ///
    /// Effects queued by the bridge are executed once the App has nothing
    /// left to say; their completions start the next round. Returns `true`
    /// if a quit was requested.
    ///
    /// Effects are awaited one at a time inside the event loop, so a slow
    /// backend call holds up input polling and ticks until it returns.
    async fn drive(
        &mut self,
        mut actions: Vec<AppAction>,
        mut events: Vec<AppEvent>,
    ) -> Result<bool, D::Error> {
        let mut quit = false;

        loop {
            for event in events.drain(..) {
                actions.extend(self.app.handle(event));
            }

            if actions.is_empty() {
                let effects = self.bridge.take_outgoing();
                if effects.is_empty() {
                    break;
                }
                for effect in effects {
                    if let Some(completion) = self.execute(effect).await {
                        events.extend(self.bridge.handle_event(completion));
                    }
                }
                continue;
            }

            let now = self.env.now();
            for action in std::mem::take(&mut actions) {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => quit = true,
                    AppAction::Logout => {
                        events.extend(self.bridge.process_app_action(action, now));
                        quit = true;
                    },
                    AppAction::SelectRoom { .. }
                    | AppAction::SendMessage { .. }
                    | AppAction::Typing
                    | AppAction::React { .. }
                    | AppAction::RetryHistory => {
                        events.extend(self.bridge.process_app_action(action, now));
                    },
                }
            }
        }

        self.publish_room();
        Ok(quit)
    }

    /// Execute one effect. Returns the completion to feed back, if any.
    async fn execute(&mut self, effect: Effect) -> Option<SessionEvent<E::Instant>> {
        tracing::trace!(?effect, "executing effect");

        match effect {
            Effect::LoadRooms => Some(SessionEvent::RoomsLoaded(self.backend.list_rooms().await)),
            Effect::LoadProfile { user_id } => {
                Some(SessionEvent::ProfileLoaded(self.backend.fetch_profile(&user_id).await))
            },
            Effect::LoadHistory { generation, room_id } => Some(SessionEvent::HistoryLoaded {
                generation,
                result: self.backend.fetch_messages(&room_id).await,
            }),
            Effect::ResolveAuthor { generation, message_id, user_id } => {
                Some(SessionEvent::AuthorResolved {
                    generation,
                    message_id,
                    result: self.backend.fetch_profile(&user_id).await,
                })
            },
            Effect::UpsertMembership(membership) => {
                let room_id = membership.room_id.clone();
                let result = self.backend.upsert_membership(membership).await;
                Some(SessionEvent::MembershipUpserted { room_id, result })
            },
            Effect::InsertMessage { generation, message } => {
                let content = message.content.clone();
                let result = self.backend.insert_message(message).await;
                Some(SessionEvent::MessageInserted { generation, content, result })
            },
            Effect::InsertReaction { generation, reaction } => {
                let result = self.backend.insert_reaction(reaction.clone()).await;
                Some(SessionEvent::ReactionInserted { generation, reaction, result })
            },
            Effect::UpdateStatus { user_id, status } => {
                let result =
                    self.backend.update_status(&user_id, status, self.env.unix_millis()).await;
                Some(SessionEvent::StatusUpdated { status, result })
            },
            Effect::Subscribe { subscription, topic } => {
                tracing::debug!(%subscription, %topic, "subscribing");
                self.backend
                    .subscribe(subscription, topic, self.feed_tx.clone())
                    .err()
                    .map(|error| SessionEvent::SubscriptionFailed { subscription, error })
            },
            Effect::Unsubscribe { subscription } => {
                tracing::debug!(%subscription, "unsubscribing");
                self.backend.unsubscribe(subscription);
                None
            },
            Effect::Track { subscription, state } => self
                .backend
                .track(subscription, state)
                .err()
                .map(|error| SessionEvent::SubscriptionFailed { subscription, error }),
        }
    }

    fn publish_room(&self) {
        let active = self.bridge.session().active_room().cloned();
        self.room_tx.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                tracing::debug!(room = ?active, "current room changed");
                *current = active;
                true
            }
        });
    }

    /// The App view model.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Mutable access to the App.
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// The session state machine.
    pub fn session(&self) -> &Session<E::Instant> {
        self.bridge.session()
    }

    /// The UI driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the UI driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// The backend effects run against.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}
