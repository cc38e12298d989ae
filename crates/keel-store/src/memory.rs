use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use keel_types::{EntryKind, LedgerEntry, LedgerKey};

use crate::error::{StoreError, StoreResult};
use crate::rows::{AssetStat, AssetStatKey, EntryRow};
use crate::traits::{AssetStatTable, EntryTable, SignerTable};

/// Write-call bookkeeping shared by the in-memory tables.
#[derive(Debug, Default)]
struct WriteGate {
    writes: AtomicU64,
    unavailable: AtomicBool,
}

impl WriteGate {
    fn enter(&self) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory table taken offline".into()));
        }
        Ok(())
    }

    fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

/// In-memory, `BTreeMap`-based history table for one entry kind.
///
/// Intended for tests and embedding. Every write method, including
/// batch inserts, increments a call counter so tests can assert that a
/// coalesced no-op reached no table at all.
pub struct InMemoryEntryTable {
    kind: EntryKind,
    rows: RwLock<BTreeMap<LedgerKey, EntryRow>>,
    gate: WriteGate,
}

impl InMemoryEntryTable {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            rows: RwLock::new(BTreeMap::new()),
            gate: WriteGate::default(),
        }
    }

    pub fn get(&self, key: &LedgerKey) -> Option<EntryRow> {
        self.rows.read().expect("lock poisoned").get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().expect("lock poisoned").is_empty()
    }

    /// All rows in key order.
    pub fn rows(&self) -> Vec<EntryRow> {
        self.rows
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Number of write calls made so far, successful or not.
    pub fn write_calls(&self) -> u64 {
        self.gate.writes()
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.gate.set_unavailable(unavailable);
    }

    fn check_kind(&self, entry: &LedgerEntry) -> StoreResult<()> {
        if entry.kind() != self.kind {
            return Err(StoreError::KindMismatch {
                expected: self.kind,
                actual: entry.kind(),
            });
        }
        Ok(())
    }

    fn insert_locked(
        map: &mut BTreeMap<LedgerKey, EntryRow>,
        entry: &LedgerEntry,
        ledger: u32,
    ) -> u64 {
        let key = entry.key();
        if map.contains_key(&key) {
            return 0;
        }
        map.insert(key, EntryRow::new(entry.clone(), ledger));
        1
    }
}

impl EntryTable for InMemoryEntryTable {
    fn kind(&self) -> EntryKind {
        self.kind
    }

    fn insert(&self, entry: &LedgerEntry, ledger: u32) -> StoreResult<u64> {
        self.gate.enter()?;
        self.check_kind(entry)?;
        let mut map = self.rows.write().expect("lock poisoned");
        Ok(Self::insert_locked(&mut map, entry, ledger))
    }

    fn update(&self, entry: &LedgerEntry, ledger: u32) -> StoreResult<u64> {
        self.gate.enter()?;
        self.check_kind(entry)?;
        let mut map = self.rows.write().expect("lock poisoned");
        match map.get_mut(&entry.key()) {
            Some(row) => {
                *row = EntryRow::new(entry.clone(), ledger);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn upsert(&self, entry: &LedgerEntry, ledger: u32) -> StoreResult<u64> {
        self.gate.enter()?;
        self.check_kind(entry)?;
        let mut map = self.rows.write().expect("lock poisoned");
        map.insert(entry.key(), EntryRow::new(entry.clone(), ledger));
        Ok(1)
    }

    fn remove(&self, key: &LedgerKey) -> StoreResult<u64> {
        self.gate.enter()?;
        let mut map = self.rows.write().expect("lock poisoned");
        Ok(u64::from(map.remove(key).is_some()))
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }

    fn insert_batch(&self, rows: &[EntryRow]) -> StoreResult<u64> {
        self.gate.enter()?;
        for row in rows {
            self.check_kind(&row.entry)?;
        }
        let mut map = self.rows.write().expect("lock poisoned");
        Ok(rows
            .iter()
            .map(|row| Self::insert_locked(&mut map, &row.entry, row.ledger))
            .sum())
    }
}

impl std::fmt::Debug for InMemoryEntryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEntryTable")
            .field("kind", &self.kind)
            .field("row_count", &self.len())
            .field("write_calls", &self.write_calls())
            .finish()
    }
}

/// In-memory signer table keyed by (account, signer).
#[derive(Debug, Default)]
pub struct InMemorySignerTable {
    rows: RwLock<BTreeMap<(String, String), i32>>,
    gate: WriteGate,
}

impl InMemorySignerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight of `signer` on `account_id`, if present.
    pub fn weight(&self, account_id: &str, signer: &str) -> Option<i32> {
        self.rows
            .read()
            .expect("lock poisoned")
            .get(&(account_id.to_string(), signer.to_string()))
            .copied()
    }

    /// Signers of one account in key order.
    pub fn signers_of(&self, account_id: &str) -> Vec<(String, i32)> {
        self.rows
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|((account, _), _)| account == account_id)
            .map(|((_, signer), weight)| (signer.clone(), *weight))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_calls(&self) -> u64 {
        self.gate.writes()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.gate.set_unavailable(unavailable);
    }
}

impl SignerTable for InMemorySignerTable {
    fn insert_signer(&self, account_id: &str, signer: &str, weight: i32) -> StoreResult<u64> {
        self.gate.enter()?;
        let mut map = self.rows.write().expect("lock poisoned");
        let key = (account_id.to_string(), signer.to_string());
        if map.contains_key(&key) {
            return Ok(0);
        }
        map.insert(key, weight);
        Ok(1)
    }

    fn remove_signer(&self, account_id: &str, signer: &str) -> StoreResult<u64> {
        self.gate.enter()?;
        let mut map = self.rows.write().expect("lock poisoned");
        let removed = map.remove(&(account_id.to_string(), signer.to_string()));
        Ok(u64::from(removed.is_some()))
    }

    fn count_signers(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }
}

/// In-memory asset statistics table.
#[derive(Debug, Default)]
pub struct InMemoryAssetStatTable {
    rows: RwLock<BTreeMap<AssetStatKey, AssetStat>>,
    gate: WriteGate,
}

impl InMemoryAssetStatTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_calls(&self) -> u64 {
        self.gate.writes()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.gate.set_unavailable(unavailable);
    }
}

impl AssetStatTable for InMemoryAssetStatTable {
    fn get_stat(&self, key: &AssetStatKey) -> StoreResult<Option<AssetStat>> {
        Ok(self.rows.read().expect("lock poisoned").get(key).cloned())
    }

    fn insert_stat(&self, stat: &AssetStat) -> StoreResult<u64> {
        self.gate.enter()?;
        let mut map = self.rows.write().expect("lock poisoned");
        if map.contains_key(&stat.key) {
            return Ok(0);
        }
        map.insert(stat.key.clone(), stat.clone());
        Ok(1)
    }

    fn update_stat(&self, stat: &AssetStat) -> StoreResult<u64> {
        self.gate.enter()?;
        let mut map = self.rows.write().expect("lock poisoned");
        match map.get_mut(&stat.key) {
            Some(existing) => {
                *existing = stat.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn remove_stat(&self, key: &AssetStatKey) -> StoreResult<u64> {
        self.gate.enter()?;
        let mut map = self.rows.write().expect("lock poisoned");
        Ok(u64::from(map.remove(key).is_some()))
    }

    fn count_stats(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }
}
