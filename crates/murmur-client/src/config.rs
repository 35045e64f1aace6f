//! Session configuration.

use std::time::Duration;

/// Inactivity after which a typing announcement is withdrawn.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// How repeated reactions by the same user are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionPolicy {
    /// Every reaction is appended, including repeats of the same symbol.
    #[default]
    AllowRepeats,
    /// A user may react with a given symbol at most once per message.
    OncePerUser,
}

/// What a room shows when its history cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFailurePolicy {
    /// Mark the history failed, notify the user, and allow a retry.
    #[default]
    Surface,
    /// Show the room as loaded and empty.
    SilentEmpty,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity after which "not typing" is announced.
    pub typing_idle_timeout: Duration,
    /// Reaction uniqueness policy.
    pub reaction_policy: ReactionPolicy,
    /// History load failure policy.
    pub history_failure: HistoryFailurePolicy,
    /// Select the first room once the room list first loads.
    pub auto_select_first_room: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_idle_timeout: TYPING_IDLE_TIMEOUT,
            reaction_policy: ReactionPolicy::default(),
            history_failure: HistoryFailurePolicy::default(),
            auto_select_first_room: true,
        }
    }
}
