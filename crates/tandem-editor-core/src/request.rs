//! Request sequencing for asynchronous completions.
//!
//! Each request is stamped with a sequence number when issued. When responses
//! come back out of order, only the one carrying the latest number for its
//! key may be applied; anything older is superseded. Numbers are never handed
//! out twice, even across keys, so a forgotten key can't revive an old ticket.

use std::collections::HashMap;
use std::hash::Hash;

/// Outcome of handing a completion back to the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The result was recorded.
    Applied,
    /// The request failed and the failure was recorded.
    Failed,
    /// A newer request for the same key exists; the result was dropped.
    Superseded,
}

impl Completion {
    /// True if the completion changed visible state.
    pub fn took_effect(self) -> bool {
        !matches!(self, Self::Superseded)
    }
}

/// Monotonic request counter remembering the newest number per key.
#[derive(Clone, Debug)]
pub struct RequestSequencer<K> {
    issued: u64,
    latest: HashMap<K, u64>,
}

impl<K> Default for RequestSequencer<K> {
    fn default() -> Self {
        Self {
            issued: 0,
            latest: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> RequestSequencer<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number for `key`. The first number is 1.
    pub fn issue(&mut self, key: &K) -> u64 {
        self.issued += 1;
        self.latest.insert(key.clone(), self.issued);
        self.issued
    }

    /// Latest sequence issued for `key`, if any.
    pub fn latest(&self, key: &K) -> Option<u64> {
        self.latest.get(key).copied()
    }

    /// True if `sequence` is the newest request issued for `key`.
    pub fn is_latest(&self, key: &K, sequence: u64) -> bool {
        self.latest(key) == Some(sequence)
    }

    /// Forget every key for which `keep` returns false. Outstanding tickets
    /// for a forgotten key are superseded from then on.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.latest.retain(|key, _| keep(key));
    }

    /// Number of keys currently remembered.
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_is_monotonic() {
        let mut seq = RequestSequencer::new();
        assert_eq!(seq.issue(&"a"), 1);
        assert_eq!(seq.issue(&"a"), 2);
        assert_eq!(seq.issue(&"b"), 3);
        assert_eq!(seq.latest(&"a"), Some(2));
        assert_eq!(seq.latest(&"b"), Some(3));
        assert_eq!(seq.latest(&"c"), None);
    }

    #[test]
    fn test_only_latest_wins() {
        let mut seq = RequestSequencer::new();
        let first = seq.issue(&"k");
        let second = seq.issue(&"k");

        assert!(seq.is_latest(&"k", second));
        assert!(!seq.is_latest(&"k", first));
        assert!(!seq.is_latest(&"other", first));
    }

    #[test]
    fn test_forgotten_key_never_revives_old_ticket() {
        let mut seq = RequestSequencer::new();
        let old = seq.issue(&"gone");
        seq.issue(&"live");

        seq.retain(|key| *key == "live");
        assert_eq!(seq.len(), 1);
        assert!(!seq.is_latest(&"gone", old));

        let fresh = seq.issue(&"gone");
        assert_ne!(fresh, old);
        assert!(!seq.is_latest(&"gone", old));
        assert!(seq.is_latest(&"gone", fresh));
    }

    #[test]
    fn test_completion_took_effect() {
        assert!(Completion::Applied.took_effect());
        assert!(Completion::Failed.took_effect());
        assert!(!Completion::Superseded.took_effect());
    }
}
