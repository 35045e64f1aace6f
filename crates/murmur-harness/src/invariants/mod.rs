//! Session invariants checked during simulation.
//!
//! A test captures what each client shows, and optionally what its session
//! holds, into a [`SystemSnapshot`]. Every registered [`Invariant`] then
//! inspects the snapshot. The same checks run after scripted steps, after
//! every render of a [`crate::SimDriver`], and under chaos injection.
//!
//! ```ignore
//! let snapshot = SystemSnapshot::single(
//!     ClientSnapshot::from_app(runtime.app()).with_session(runtime.session()),
//! );
//! InvariantRegistry::standard().assert_all(&snapshot, "after send");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    ChannelIsolation, MessagesOrdered, SelfNeverTyping, SingleRoomSubscriptions, UniqueMessages,
    ViewMatchesSession,
};
pub use snapshot::{ClientSnapshot, SessionSnapshot, SystemSnapshot};

/// Outcome of one invariant check.
pub type InvariantResult = Result<(), Violation>;

/// A broken invariant.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Which invariant failed.
    pub invariant: &'static str,
    /// The offending client and state.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property every snapshot must satisfy.
pub trait Invariant: Send + Sync {
    /// Short `snake_case` name used in violation reports.
    fn name(&self) -> &'static str;

    /// Inspect a snapshot. The first offending client is reported.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// A set of invariants checked together.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Registry with nothing in it.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Every invariant murmur guarantees:
    /// - [`MessagesOrdered`]: display order follows `(created_at, id)`
    /// - [`UniqueMessages`]: no message shown twice
    /// - [`ChannelIsolation`]: only the active room's messages are shown
    /// - [`SelfNeverTyping`]: the local user is not in the typing list
    /// - [`ViewMatchesSession`]: the view agrees with the session
    /// - [`SingleRoomSubscriptions`]: old rooms' subscriptions are closed
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(MessagesOrdered);
        registry.add(UniqueMessages);
        registry.add(ChannelIsolation);
        registry.add(SelfNeverTyping);
        registry.add(ViewMatchesSession);
        registry.add(SingleRoomSubscriptions);
        registry
    }

    /// Register another invariant.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Run every invariant, collecting all violations.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(state) {
                tracing::warn!(invariant = invariant.name(), %violation, "invariant violated");
                violations.push(violation);
            }
        }

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Like [`Self::check_all`], but panics listing every violation.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        let Err(violations) = self.check_all(state) else { return };

        let report = violations.iter().fold(String::new(), |mut report, violation| {
            report.push_str("\n  ");
            report.push_str(&violation.to_string());
            report
        });
        panic!("invariants broken {context}:{report}");
    }

    /// How many invariants are registered.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
