use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use keel_types::{Change, EntryKind, LedgerEntry, LedgerKey};

use crate::error::{IngestError, Result};

#[derive(Clone, Debug)]
struct CacheEntry {
    kind: EntryKind,
    before: Option<LedgerEntry>,
    after: Option<LedgerEntry>,
}

/// Coalesces the changes made to each ledger object within one window.
///
/// For every key only two snapshots are kept: the `before` of the first
/// change seen and the `after` of the last. Everything in between is
/// forgotten. A key whose coalesced sides are both absent (created then
/// removed) is dropped from [`ChangeCache::get_changes`].
///
/// Keys are held in a `BTreeMap`, so the net changes come out in key order.
#[derive(Clone, Debug, Default)]
pub struct ChangeCache {
    entries: BTreeMap<LedgerKey, CacheEntry>,
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_change(&mut self, change: Change) -> Result<()> {
        change.validate()?;
        let key = change.key().ok_or_else(|| {
            IngestError::state(format!("{} change has neither before nor after", change.kind))
        })?;

        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(CacheEntry {
                    kind: change.kind,
                    before: change.before,
                    after: change.after,
                });
            }
            Entry::Occupied(mut slot) => {
                slot.get_mut().after = change.after;
            }
        }
        Ok(())
    }

    /// Number of distinct keys buffered.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Net change per key, skipping keys that coalesced to nothing.
    pub fn get_changes(&self) -> Vec<Change> {
        self.entries
            .values()
            .filter(|e| e.before.is_some() || e.after.is_some())
            .map(|e| Change {
                kind: e.kind,
                before: e.before.clone(),
                after: e.after.clone(),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
