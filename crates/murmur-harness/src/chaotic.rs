//! Chaotic backend wrapper for fault injection testing
//!
//! Delegates to an underlying backend but randomly fails data-access calls
//! and presence announcements at a configured rate. Failures are drawn from a
//! seeded ChaCha RNG so a failing run can be replayed from its seed.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use murmur_core::{
    Backend, DataAccess, FeedSink, Membership, Message, MessageRow, NewMessage, PresenceState,
    Profile, ProfileStatus, Reaction, Realtime, Room, RoomId, ServiceError, SubscriptionId,
    Timestamp, Topic, UserId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Backend wrapper that randomly injects failures.
///
/// Subscribing and unsubscribing always go through, so the wrapped session
/// keeps receiving deliveries while its calls fail around it.
#[derive(Clone)]
pub struct ChaoticBackend<B> {
    inner: B,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<ChaCha8Rng>>,
    injected: Arc<AtomicUsize>,
}

impl<B: Backend> ChaoticBackend<B> {
    /// Wrap `inner`, failing calls with probability `failure_rate`.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: B, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            injected: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying backend (for checking state after chaos).
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Number of failures injected so far.
    pub fn injected_failures(&self) -> usize {
        self.injected.load(Ordering::Relaxed)
    }

    fn chaos(&self) -> Result<(), ServiceError> {
        #[allow(clippy::expect_used)]
        let fail = self.rng.lock().expect("chaos RNG mutex poisoned").gen_bool(self.failure_rate);
        if fail {
            self.injected.fetch_add(1, Ordering::Relaxed);
            return Err(ServiceError::Network("chaotic failure injection".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl<B: Backend> DataAccess for ChaoticBackend<B> {
    async fn list_rooms(&self) -> Result<Vec<Room>, ServiceError> {
        self.chaos()?;
        self.inner.list_rooms().await
    }

    async fn fetch_profile(&self, user_id: &UserId) -> Result<Profile, ServiceError> {
        self.chaos()?;
        self.inner.fetch_profile(user_id).await
    }

    async fn fetch_messages(&self, room_id: &RoomId) -> Result<Vec<Message>, ServiceError> {
        self.chaos()?;
        self.inner.fetch_messages(room_id).await
    }

    async fn insert_message(&self, message: NewMessage) -> Result<MessageRow, ServiceError> {
        self.chaos()?;
        self.inner.insert_message(message).await
    }

    async fn upsert_membership(&self, membership: Membership) -> Result<(), ServiceError> {
        self.chaos()?;
        self.inner.upsert_membership(membership).await
    }

    async fn insert_reaction(&self, reaction: Reaction) -> Result<(), ServiceError> {
        self.chaos()?;
        self.inner.insert_reaction(reaction).await
    }

    async fn update_status(
        &self,
        user_id: &UserId,
        status: ProfileStatus,
        last_seen: Timestamp,
    ) -> Result<(), ServiceError> {
        self.chaos()?;
        self.inner.update_status(user_id, status, last_seen).await
    }
}

impl<B: Backend> Realtime for ChaoticBackend<B> {
    fn subscribe(&self, id: SubscriptionId, topic: Topic, sink: FeedSink) -> Result<(), ServiceError> {
        self.inner.subscribe(id, topic, sink)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.unsubscribe(id);
    }

    fn track(&self, id: SubscriptionId, state: PresenceState) -> Result<(), ServiceError> {
        self.chaos()?;
        self.inner.track(id, state)
    }
}
