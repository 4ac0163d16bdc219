use std::collections::HashSet;

use crate::protocol::ChatMessage;

/// Arrival-ordered message sequence with merge-by-identifier.
///
/// Each identifier appears at most once no matter how many times, or from
/// which source, a message is delivered.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole sequence with `batch`, keeping its order and the
    /// first occurrence of each identifier.
    pub fn replace(&mut self, batch: Vec<ChatMessage>) {
        self.clear();
        for message in batch {
            self.merge(message);
        }
    }

    /// Appends `message` unless its identifier is already present.
    ///
    /// Returns true if the message was appended.
    pub fn merge(&mut self, message: ChatMessage) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.seen.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PEER, ids, msg};

    #[test]
    fn test_merge_drops_known_ids() {
        let mut log = MessageLog::new();
        log.replace(vec![msg("m1", "t", PEER), msg("m2", "t", PEER)]);
        assert!(!log.merge(msg("m2", "t", PEER)));
        assert!(log.merge(msg("m3", "t", PEER)));
        assert!(!log.merge(msg("m1", "t", PEER)));
        assert_eq!(ids(log.messages()), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_replace_keeps_fetch_order_and_dedups() {
        let mut log = MessageLog::new();
        log.merge(msg("old", "t", PEER));
        log.replace(vec![
            msg("m2", "t", PEER),
            msg("m1", "t", PEER),
            msg("m2", "t", PEER),
        ]);
        assert_eq!(ids(log.messages()), vec!["m2", "m1"]);
        assert!(!log.contains("old"));
    }

    #[test]
    fn test_any_interleaving_has_unique_ids() {
        let history = ["a", "b", "c", "b"];
        let live = ["c", "d", "a", "d", "e", "e"];
        for split in 0..=live.len() {
            let mut log = MessageLog::new();
            for id in &live[..split] {
                log.merge(msg(id, "t", PEER));
            }
            log.replace(history.iter().map(|id| msg(id, "t", PEER)).collect());
            for id in &live[split..] {
                log.merge(msg(id, "t", PEER));
            }
            let mut seen = ids(log.messages());
            let total = seen.len();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), total, "duplicate after split {split}");
        }
    }
}
