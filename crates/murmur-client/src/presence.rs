//! Typing presence.
//!
//! Tracks who else is typing in the active room, and debounces the local
//! user's own typing announcements.
//!
//! Remote state is rebuilt in full from every presence sync; there is no
//! incremental patching. Local announcements follow a debounce: the first
//! keystroke announces `typing = true`, later keystrokes only restart the
//! idle timer, and `typing = false` is announced once the timer expires or a
//! message is sent.

use std::{collections::BTreeSet, ops::Sub, time::Duration};

use murmur_core::{PresenceSnapshot, PresenceState, UNKNOWN_AUTHOR, UserId};

/// Typing state of one room, as seen by the local user.
#[derive(Debug, Clone)]
pub struct PresenceTracker<I> {
    /// Local user; never included in the typing set.
    self_id: UserId,
    /// Local username announced alongside typing state.
    username: Option<String>,
    /// Remote typists' usernames.
    typing: BTreeSet<String>,
    /// Whether `typing = true` is currently announced.
    announced: bool,
    /// Last keystroke while announced.
    last_input: Option<I>,
    idle_timeout: Duration,
}

impl<I> PresenceTracker<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a tracker for the local user.
    pub fn new(self_id: UserId, username: Option<String>, idle_timeout: Duration) -> Self {
        Self {
            self_id,
            username,
            typing: BTreeSet::new(),
            announced: false,
            last_input: None,
            idle_timeout,
        }
    }

    /// Update the username used in future announcements.
    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    /// Replace the typing set from a presence snapshot.
    ///
    /// Returns true if the set changed.
    pub fn sync(&mut self, snapshot: &PresenceSnapshot) -> bool {
        let typing: BTreeSet<String> = snapshot
            .values()
            .flatten()
            .filter(|state| state.typing && state.user_id != self.self_id)
            .map(|state| state.username.clone().unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()))
            .collect();

        if typing == self.typing {
            false
        } else {
            self.typing = typing;
            true
        }
    }

    /// Remote typists' usernames, sorted.
    pub fn typing_usernames(&self) -> impl Iterator<Item = &str> {
        self.typing.iter().map(String::as_str)
    }

    /// Whether the local user is announced as typing.
    pub fn is_typing(&self) -> bool {
        self.announced
    }

    /// The compose box changed.
    ///
    /// Returns a `typing = true` announcement only when not already typing.
    /// Always restarts the idle timer.
    pub fn input_changed(&mut self, now: I) -> Option<PresenceState> {
        self.last_input = Some(now);
        if self.announced {
            return None;
        }
        self.announced = true;
        Some(self.state(true))
    }

    /// Advance time.
    ///
    /// Returns a `typing = false` announcement once the idle timer expires.
    pub fn tick(&mut self, now: I) -> Option<PresenceState> {
        let last_input = self.last_input?;
        if now < last_input || now - last_input < self.idle_timeout {
            return None;
        }
        self.stop()
    }

    /// A message was sent.
    ///
    /// Always returns a `typing = false` announcement and clears the timer.
    pub fn message_sent(&mut self) -> PresenceState {
        self.announced = false;
        self.last_input = None;
        self.state(false)
    }

    fn stop(&mut self) -> Option<PresenceState> {
        self.last_input = None;
        if !self.announced {
            return None;
        }
        self.announced = false;
        Some(self.state(false))
    }

    fn state(&self, typing: bool) -> PresenceState {
        PresenceState { user_id: self.self_id.clone(), username: self.username.clone(), typing }
    }
}
