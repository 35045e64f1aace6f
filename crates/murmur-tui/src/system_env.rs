//! Production environment on the system clock.
//!
//! `SystemEnv` reads `std::time::Instant` for timers and `SystemTime` for the
//! wall-clock stamps written to profiles. Sleeping uses tokio.

use std::time::{Duration, UNIX_EPOCH};

use murmur_core::{Environment, Timestamp};

/// Production environment using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    /// A clock set before the epoch reads as zero.
    #[allow(clippy::disallowed_methods)]
    fn unix_millis(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as Timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
    }

    #[test]
    fn wall_clock_is_after_2024() {
        assert!(SystemEnv::new().unix_millis() > 1_704_067_200_000);
    }

    #[tokio::test]
    async fn sleep_waits() {
        let env = SystemEnv::new();
        let start = env.now();
        env.sleep(Duration::from_millis(10)).await;
        assert!(env.now() - start >= Duration::from_millis(10));
    }
}
