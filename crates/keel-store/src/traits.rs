use keel_types::{EntryKind, LedgerEntry, LedgerKey};

use crate::error::StoreResult;
use crate::rows::{AssetStat, AssetStatKey, EntryRow, SignerRow};

/// History table for one entry kind.
///
/// Every write returns the number of rows it affected. Implementations must
/// not treat a zero count as an error: inserting an existing key, or
/// updating/removing a missing one, affects zero rows and returns `Ok(0)`.
/// Deciding what a count other than one means is the caller's job.
pub trait EntryTable: Send + Sync {
    /// The entry kind this table holds.
    fn kind(&self) -> EntryKind;

    fn insert(&self, entry: &LedgerEntry, ledger: u32) -> StoreResult<u64>;

    fn update(&self, entry: &LedgerEntry, ledger: u32) -> StoreResult<u64>;

    /// Insert or overwrite. Affects one row either way.
    fn upsert(&self, entry: &LedgerEntry, ledger: u32) -> StoreResult<u64>;

    fn remove(&self, key: &LedgerKey) -> StoreResult<u64>;

    /// Number of rows currently stored.
    fn count(&self) -> StoreResult<u64>;

    /// Insert many rows at once and return the total affected.
    ///
    /// Default implementation calls `insert()` for each row. Backends may
    /// override to use a single round-trip.
    fn insert_batch(&self, rows: &[EntryRow]) -> StoreResult<u64> {
        let mut affected = 0;
        for row in rows {
            affected += self.insert(&row.entry, row.ledger)?;
        }
        Ok(affected)
    }
}

/// Account signer rows.
pub trait SignerTable: Send + Sync {
    fn insert_signer(&self, account_id: &str, signer: &str, weight: i32) -> StoreResult<u64>;

    fn remove_signer(&self, account_id: &str, signer: &str) -> StoreResult<u64>;

    fn insert_signers(&self, rows: &[SignerRow]) -> StoreResult<u64> {
        let mut affected = 0;
        for row in rows {
            affected += self.insert_signer(&row.account_id, &row.signer, row.weight)?;
        }
        Ok(affected)
    }

    fn count_signers(&self) -> StoreResult<u64>;
}

/// Persisted asset statistics.
pub trait AssetStatTable: Send + Sync {
    /// Returns `Ok(None)` if no stat exists for the key.
    fn get_stat(&self, key: &AssetStatKey) -> StoreResult<Option<AssetStat>>;

    fn insert_stat(&self, stat: &AssetStat) -> StoreResult<u64>;

    fn update_stat(&self, stat: &AssetStat) -> StoreResult<u64>;

    fn remove_stat(&self, key: &AssetStatKey) -> StoreResult<u64>;

    fn insert_stats(&self, stats: &[AssetStat]) -> StoreResult<u64> {
        let mut affected = 0;
        for stat in stats {
            affected += self.insert_stat(stat)?;
        }
        Ok(affected)
    }

    fn count_stats(&self) -> StoreResult<u64>;
}
