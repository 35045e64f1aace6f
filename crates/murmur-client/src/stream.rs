//! Message stream.
//!
//! Ordered, deduplicated log of one room's messages, seeded by a one-shot
//! history load and extended by live inserts. A fresh stream is built for
//! every room selection.
//!
//! # Invariants
//!
//! - Messages are ordered by `(created_at, id)` regardless of arrival order.
//! - A message id appears at most once, counting inserts still waiting for
//!   their author lookup.
//! - Every message belongs to the stream's room.

use std::collections::{BTreeMap, HashMap};

use murmur_core::{Message, MessageId, MessageRow, RoomId, Timestamp};

/// Progress of the one-shot history load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryState {
    /// The load is in flight.
    Loading,
    /// History has been merged (possibly empty).
    Loaded,
    /// The load failed and may be retried.
    Failed {
        /// Failure reason.
        reason: String,
    },
}

/// Result of offering a live insert to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Accepted; the author must be looked up before it is displayed.
    NeedsAuthor,
    /// Already displayed or already waiting for its author.
    Duplicate,
    /// Belongs to another room.
    WrongRoom,
}

/// Ordered message log of one room.
#[derive(Debug, Clone)]
pub struct MessageStream {
    room_id: RoomId,
    /// Displayable messages in display order.
    messages: BTreeMap<(Timestamp, MessageId), Message>,
    /// Creation time of every displayed message, for id lookups.
    displayed: HashMap<MessageId, Timestamp>,
    /// Live inserts waiting for their author lookup.
    pending: HashMap<MessageId, MessageRow>,
    history: HistoryState,
}

impl MessageStream {
    /// Create an empty stream whose history is loading.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            messages: BTreeMap::new(),
            displayed: HashMap::new(),
            pending: HashMap::new(),
            history: HistoryState::Loading,
        }
    }

    /// Room this stream belongs to.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// History load progress.
    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    /// Merge the loaded history.
    ///
    /// History rows are already enriched, so they complete any live insert of
    /// the same id that is still waiting for its author.
    pub fn load_history(&mut self, history: Vec<Message>) {
        for message in history {
            if message.room_id != self.room_id {
                tracing::debug!(room = %self.room_id, id = %message.id, "history row for another room");
                continue;
            }
            self.pending.remove(&message.id);
            self.insert(message);
        }
        self.history = HistoryState::Loaded;
    }

    /// Record a failed history load.
    pub fn history_failed(&mut self, reason: String) {
        self.history = HistoryState::Failed { reason };
    }

    /// Treat the history as loaded without merging anything.
    pub fn history_empty(&mut self) {
        self.history = HistoryState::Loaded;
    }

    /// Restart a failed history load. Returns false unless it had failed.
    pub fn retry_history(&mut self) -> bool {
        if matches!(self.history, HistoryState::Failed { .. }) {
            self.history = HistoryState::Loading;
            true
        } else {
            false
        }
    }

    /// Offer a live insert.
    pub fn accept_insert(&mut self, row: MessageRow) -> InsertOutcome {
        if row.room_id != self.room_id {
            return InsertOutcome::WrongRoom;
        }
        if self.contains(&row.id) {
            return InsertOutcome::Duplicate;
        }
        self.pending.insert(row.id.clone(), row);
        InsertOutcome::NeedsAuthor
    }

    /// Complete a pending insert with its author.
    ///
    /// `None` displays the placeholder author. Returns false if the message
    /// was not pending (already completed by history, or unknown).
    pub fn resolve_author(&mut self, message_id: &MessageId, username: Option<String>) -> bool {
        match self.pending.remove(message_id) {
            Some(row) => {
                self.insert(row.enrich(username));
                true
            },
            None => false,
        }
    }

    /// Whether a message id is displayed or pending.
    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.displayed.contains_key(message_id) || self.pending.contains_key(message_id)
    }

    /// A displayed message.
    pub fn get(&self, message_id: &MessageId) -> Option<&Message> {
        let created_at = *self.displayed.get(message_id)?;
        self.messages.get(&(created_at, message_id.clone()))
    }

    /// Displayed messages in order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Displayed messages in order, cloned for the display layer.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.values().cloned().collect()
    }

    /// Number of displayed messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message is displayed.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of inserts waiting for their author.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn insert(&mut self, message: Message) {
        if let Some(previous) = self.displayed.insert(message.id.clone(), message.created_at) {
            self.messages.remove(&(previous, message.id.clone()));
        }
        self.messages.insert((message.created_at, message.id.clone()), message);
    }
}
