//! Simulated environment with a virtual clock.
//!
//! `SimEnv` never reads the system clock. Time starts at zero and only moves
//! when a test calls [`SimEnv::advance`] or something sleeps. Clones share
//! the same clock, so a test can hold one handle while the runtime owns
//! another.

#![allow(clippy::disallowed_types, reason = "Synchronous clock state only")]

use std::{
    ops::Sub,
    sync::{Arc, Mutex},
    time::Duration,
};

use murmur_core::{Environment, Timestamp};

/// Wall-clock time the virtual clock starts at (2024-01-01T00:00:00Z).
pub const SIM_EPOCH_MILLIS: Timestamp = 1_704_067_200_000;

/// Point on the virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the simulation started.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Deterministic environment for simulation.
#[derive(Clone, Default)]
pub struct SimEnv {
    clock: Arc<Mutex<Duration>>,
}

impl SimEnv {
    /// Create an environment at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    #[allow(clippy::expect_used)]
    pub fn advance(&self, by: Duration) {
        let mut clock = self.clock.lock().expect("clock mutex poisoned");
        *clock += by;
    }

    #[allow(clippy::expect_used)]
    fn elapsed(&self) -> Duration {
        *self.clock.lock().expect("clock mutex poisoned")
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> Self::Instant {
        SimInstant(self.elapsed())
    }

    /// Sleeping advances the virtual clock and returns immediately.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn unix_millis(&self) -> Timestamp {
        SIM_EPOCH_MILLIS + self.elapsed().as_millis() as Timestamp
    }
}
