//! Incremental latest-state index

use std::collections::HashMap;

use crate::registry::log::LogEntry;
use crate::registry::view::wins;

/// A fold of the log that can be extended entry by entry.
///
/// Long-running processes keep one of these instead of re-reading the
/// whole feed on every change. It applies the same win rule as the
/// batch fold, and the rule is order-independent, so feeding it the
/// same entries in any order lands on the same map. When in doubt a
/// fresh [`crate::registry::view::reduce`] is authoritative.
#[derive(Debug, Default)]
pub struct LatestIndex {
    latest: HashMap<String, LogEntry>,
    next_seq: u64,
}

impl LatestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index by folding `entries` from scratch.
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.apply(entry);
        }
        index
    }

    /// Fold one entry in. Returns true when it became the app's
    /// current state.
    pub fn apply(&mut self, entry: &LogEntry) -> bool {
        self.next_seq = self.next_seq.max(entry.seq + 1);

        let replaces = match self.latest.get(entry.record.app_name.as_str()) {
            Some(current) => wins(entry, current),
            None => true,
        };
        if replaces {
            self.latest
                .insert(entry.record.app_name.clone(), entry.clone());
        }
        replaces
    }

    /// Current winning entry for `app_name`.
    pub fn get(&self, app_name: &str) -> Option<&LogEntry> {
        self.latest.get(app_name)
    }

    /// All current states, keyed by app name.
    pub fn states(&self) -> &HashMap<String, LogEntry> {
        &self.latest
    }

    /// First feed position this index has not folded in yet.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
