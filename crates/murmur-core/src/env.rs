//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from the system clock. The synchronization core
//! never reads time itself; runtimes read it from an [`Environment`] and pass
//! instants in with each event. Simulation uses a virtual clock that only
//! moves when a test advances it.

use std::time::Duration;

use crate::model::Timestamp;

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `unix_millis()` is only used for user-visible timestamps (`last_seen`),
///   never for timer arithmetic
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use a virtual instant.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code sleeps; session logic reacts to ticks.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Wall-clock time in milliseconds since the Unix epoch.
    fn unix_millis(&self) -> Timestamp;
}
