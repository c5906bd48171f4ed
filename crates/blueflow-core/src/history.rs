//! Connection history ledger.
//!
//! An append-only record of connection attempts. Entries are kept in creation
//! order; showing them newest-first is up to the presenter. The ledger only
//! shrinks through a confirmed [`HistoryLedger::clear`].

use crate::capabilities::{ConfirmPrompt, Confirmer, Decision};
use crate::types::HistoryEntry;

/// Append-only log of connection attempts.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a ledger pre-filled with `entries`, in any order.
    ///
    /// Entries are ordered by timestamp; ties keep their given order.
    #[must_use]
    pub fn with_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.sort_by_key(|entry| entry.timestamp);
        Self { entries }
    }

    /// Record a new attempt.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Empty the ledger if the user confirms.
    ///
    /// Returns the number of entries removed, or `None` if the user declined.
    pub fn clear(&mut self, confirmer: &dyn Confirmer) -> Option<usize> {
        match confirmer.confirm(&ConfirmPrompt::clear_history()) {
            Decision::Confirm => {
                let removed = self.entries.len();
                self.entries.clear();
                Some(removed)
            }
            Decision::Decline => None,
        }
    }

    /// Entries in creation order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entries with the most recent first.
    pub fn newest_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
