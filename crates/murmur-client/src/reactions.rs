//! Reaction bookkeeping.
//!
//! Counts are kept per message for the active room only. Claims record which
//! `(message, symbol)` pairs the local user has reacted with, for the
//! once-per-user policy; they outlive room switches.

use std::collections::{BTreeMap, HashMap, HashSet};

use murmur_core::MessageId;

/// Reaction counts of the active room's messages.
#[derive(Debug, Clone, Default)]
pub struct ReactionCounts {
    counts: HashMap<MessageId, BTreeMap<String, u32>>,
}

impl ReactionCounts {
    /// Count one successful reaction. Returns the message's counts.
    pub fn record(&mut self, message_id: &MessageId, symbol: &str) -> Vec<(String, u32)> {
        let entry = self.counts.entry(message_id.clone()).or_default();
        *entry.entry(symbol.to_owned()).or_insert(0) += 1;
        self.counts(message_id)
    }

    /// `(symbol, count)` pairs of a message, sorted by symbol.
    pub fn counts(&self, message_id: &MessageId) -> Vec<(String, u32)> {
        self.counts
            .get(message_id)
            .map(|c| c.iter().map(|(s, n)| (s.clone(), *n)).collect())
            .unwrap_or_default()
    }
}

/// Reactions the local user has claimed this session.
#[derive(Debug, Clone, Default)]
pub struct ReactionClaims {
    claimed: HashSet<(MessageId, String)>,
}

impl ReactionClaims {
    /// Claim a pair. Returns false if already claimed.
    pub fn claim(&mut self, message_id: &MessageId, symbol: &str) -> bool {
        self.claimed.insert((message_id.clone(), symbol.to_owned()))
    }

    /// Release a claim whose insert failed.
    pub fn release(&mut self, message_id: &MessageId, symbol: &str) {
        self.claimed.remove(&(message_id.clone(), symbol.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_symbol() {
        let mut counts = ReactionCounts::default();
        let id = MessageId::from("m1");

        counts.record(&id, "👍");
        counts.record(&id, "❤️");
        let all = counts.record(&id, "👍");

        assert!(all.contains(&("👍".to_owned(), 2)));
        assert!(all.contains(&("❤️".to_owned(), 1)));
        assert!(counts.counts(&"m2".into()).is_empty());
    }

    #[test]
    fn claims_are_released_on_failure() {
        let mut claims = ReactionClaims::default();
        let id = MessageId::from("m1");

        assert!(claims.claim(&id, "👍"));
        assert!(!claims.claim(&id, "👍"));
        claims.release(&id, "👍");
        assert!(claims.claim(&id, "👍"));
    }
}
