use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::{debug, info, warn};

use keel_store::{
    new_asset_stat_batch_insert_builder, AssetStat, AssetStatKey, AssetStatTable,
    BatchInsertBuilder,
};
use keel_types::{Change, EntryKind, LedgerEntry, LedgerHeader, TrustLineEntry};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::processors::{expect_one_row, ChangeProcessor, ProcessingMode};
use crate::stats::{StatAggregator, StatValue};

/// Build the asset stats processor in the given mode.
pub fn asset_stats_processor(
    table: Arc<dyn AssetStatTable>,
    header: &LedgerHeader,
    mode: ProcessingMode,
    config: &IngestConfig,
) -> Box<dyn ChangeProcessor> {
    match mode {
        ProcessingMode::Bootstrap => Box::new(AssetStatsProcessor::new(
            header,
            BootstrapStatsCommit::new(table, config),
        )),
        ProcessingMode::Incremental => Box::new(AssetStatsProcessor::new(
            header,
            IncrementalStatsCommit::new(table),
        )),
    }
}

/// How accumulated deltas reach the stats table.
pub trait StatsCommit: Send {
    fn name(&self) -> &'static str;

    fn commit(&mut self, ledger: u32, deltas: &mut StatAggregator<AssetStatKey>) -> Result<()>;
}

/// Accumulates trustline deltas per asset and hands them to a
/// [`StatsCommit`] strategy at commit.
///
/// Each trustline contributes its balance to the amount and one to the
/// holder count. Native-asset lines are ignored.
pub struct AssetStatsProcessor<S> {
    ledger: u32,
    deltas: StatAggregator<AssetStatKey>,
    strategy: S,
}

impl<S: StatsCommit> AssetStatsProcessor<S> {
    pub fn new(header: &LedgerHeader, strategy: S) -> Self {
        Self {
            ledger: header.sequence,
            deltas: StatAggregator::new(),
            strategy,
        }
    }

    /// Deltas accumulated so far.
    pub fn deltas(&self) -> &StatAggregator<AssetStatKey> {
        &self.deltas
    }

    fn add_line(&mut self, line: &TrustLineEntry, sign: i32) -> Result<()> {
        if line.asset.is_native() {
            return Ok(());
        }
        let amount = BigInt::from(line.balance) * sign;
        self.deltas
            .add_delta(AssetStatKey::from_asset(&line.asset), &amount, sign)
    }
}

fn trust_line(entry: &Option<LedgerEntry>) -> Option<&TrustLineEntry> {
    entry.as_ref().and_then(LedgerEntry::as_trust_line)
}

impl<S: StatsCommit> ChangeProcessor for AssetStatsProcessor<S> {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    fn process_change(&mut self, change: Change) -> Result<()> {
        if change.kind != EntryKind::TrustLine {
            return Ok(());
        }
        change.validate()?;
        if change.change_type().is_none() {
            return Err(IngestError::state(
                "trustline change has neither before nor after",
            ));
        }
        if let Some(before) = trust_line(&change.before) {
            self.add_line(before, -1)?;
        }
        if let Some(after) = trust_line(&change.after) {
            self.add_line(after, 1)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.strategy.commit(self.ledger, &mut self.deltas)
    }
}

/// Inserts every group as a fresh stat.
pub struct BootstrapStatsCommit {
    batch: BatchInsertBuilder<AssetStat>,
}

impl BootstrapStatsCommit {
    pub fn new(table: Arc<dyn AssetStatTable>, config: &IngestConfig) -> Self {
        Self {
            batch: new_asset_stat_batch_insert_builder(table, config.max_batch_size),
        }
    }
}

impl StatsCommit for BootstrapStatsCommit {
    fn name(&self) -> &'static str {
        "bootstrap_asset_stats"
    }

    fn commit(&mut self, ledger: u32, deltas: &mut StatAggregator<AssetStatKey>) -> Result<()> {
        for (key, value) in deltas.all() {
            if value.amount.is_negative() || value.count <= 0 {
                return Err(IngestError::state(format!(
                    "bootstrap stat for {key} is not positive: amount {}, accounts {}",
                    value.amount, value.count
                )));
            }
            self.batch
                .add(AssetStat {
                    key: key.clone(),
                    amount: value.amount,
                    num_accounts: value.count,
                })
                .map_err(|e| IngestError::store("batch insert asset stats", e))?;
            deltas.remove(&key);
        }
        let summary = self
            .batch
            .exec()
            .map_err(|e| IngestError::store("batch insert asset stats", e))?;
        if !summary.is_exact() {
            return Err(IngestError::state(format!(
                "batch insert asset stats: {} rows affected, expected {}",
                summary.rows_affected, summary.rows_added
            )));
        }
        info!(ledger, assets = summary.rows_added, "bootstrap asset stats committed");
        Ok(())
    }
}

/// Folds each delta into the persisted stat.
///
/// Reads the current row, adds the delta, then inserts, updates, or removes
/// so that a stat exists exactly while its holder count is positive.
pub struct IncrementalStatsCommit {
    table: Arc<dyn AssetStatTable>,
}

impl IncrementalStatsCommit {
    pub fn new(table: Arc<dyn AssetStatTable>) -> Self {
        Self { table }
    }

    fn apply(&self, key: &AssetStatKey, delta: &StatValue) -> Result<()> {
        let current = self
            .table
            .get_stat(key)
            .map_err(|e| IngestError::store(format!("read asset stat {key}"), e))?;

        let (amount, count) = match &current {
            Some(stat) => (&stat.amount + &delta.amount, stat.num_accounts.checked_add(delta.count)),
            None => (delta.amount.clone(), Some(delta.count)),
        };
        let count = count
            .ok_or_else(|| IngestError::state(format!("holder count overflow for {key}")))?;

        if amount.is_negative() || count < 0 {
            warn!(asset = %key, %amount, count, "asset stat would go negative");
            return Err(IngestError::state(format!(
                "asset stat for {key} would be negative: amount {amount}, accounts {count}"
            )));
        }

        if count == 0 {
            if !amount.is_zero() {
                return Err(IngestError::state(format!(
                    "removing asset stat for {key} with non-zero amount {amount}"
                )));
            }
            if current.is_none() {
                return Ok(());
            }
            let rows = self
                .table
                .remove_stat(key)
                .map_err(|e| IngestError::store(format!("remove asset stat {key}"), e))?;
            expect_one_row(rows, format_args!("remove asset stat {key}"))?;
            return Ok(());
        }

        let stat = AssetStat {
            key: key.clone(),
            amount,
            num_accounts: count,
        };
        if current.is_some() {
            let rows = self
                .table
                .update_stat(&stat)
                .map_err(|e| IngestError::store(format!("update asset stat {key}"), e))?;
            expect_one_row(rows, format_args!("update asset stat {key}"))?;
        } else {
            let rows = self
                .table
                .insert_stat(&stat)
                .map_err(|e| IngestError::store(format!("insert asset stat {key}"), e))?;
            expect_one_row(rows, format_args!("insert asset stat {key}"))?;
        }
        Ok(())
    }
}

impl StatsCommit for IncrementalStatsCommit {
    fn name(&self) -> &'static str {
        "incremental_asset_stats"
    }

    fn commit(&mut self, ledger: u32, deltas: &mut StatAggregator<AssetStatKey>) -> Result<()> {
        let mut applied = 0usize;
        for (key, delta) in deltas.all() {
            if !delta.is_zero() {
                self.apply(&key, &delta)?;
                applied += 1;
            }
            deltas.remove(&key);
        }
        debug!(ledger, applied, "asset stats committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_store::InMemoryAssetStatTable;
    use keel_types::{Asset, EntryData};

    const ISSUER: &str = "GISSUER";

    fn line(account: &str, balance: i64) -> LedgerEntry {
        line_of(account, Asset::credit("USD", ISSUER).unwrap(), balance)
    }

    fn line_of(account: &str, asset: Asset, balance: i64) -> LedgerEntry {
        LedgerEntry::new(
            1,
            EntryData::TrustLine(TrustLineEntry {
                account_id: account.into(),
                asset,
                balance,
                limit: i64::MAX,
                flags: 0,
            }),
        )
    }

    fn usd_key() -> AssetStatKey {
        AssetStatKey::from_asset(&Asset::credit("USD", ISSUER).unwrap())
    }

    fn incremental(table: &Arc<InMemoryAssetStatTable>) -> AssetStatsProcessor<IncrementalStatsCommit> {
        AssetStatsProcessor::new(&LedgerHeader::new(2), IncrementalStatsCommit::new(table.clone()))
    }

    #[test]
    fn deltas_follow_trustline_changes() {
        let table = Arc::new(InMemoryAssetStatTable::new());
        let mut processor = incremental(&table);
        processor.process_change(Change::created(line("GA", 10))).unwrap();
        processor
            .process_change(Change::updated(line("GB", 5), line("GB", 8)).unwrap())
            .unwrap();
        processor.process_change(Change::removed(line("GC", 4))).unwrap();
        processor
            .process_change(Change::created(line_of("GD", Asset::Native, 99)))
            .unwrap();

        let delta = processor.deltas().get(&usd_key()).unwrap();
        assert_eq!(delta.amount, BigInt::from(10 + 3 - 4));
        assert_eq!(delta.count, 0);
        assert_eq!(processor.deltas().len(), 1);
    }

    #[test]
    fn bootstrap_inserts_totals() {
        let table = Arc::new(InMemoryAssetStatTable::new());
        let mut processor = AssetStatsProcessor::new(
            &LedgerHeader::new(1),
            BootstrapStatsCommit::new(table.clone(), &IngestConfig::default()),
        );
        processor.process_change(Change::created(line("GA", i64::MAX))).unwrap();
        processor.process_change(Change::created(line("GB", i64::MAX))).unwrap();
        processor.commit().unwrap();

        let stat = table.get_stat(&usd_key()).unwrap().unwrap();
        assert_eq!(stat.amount, BigInt::from(u64::MAX) - 1);
        assert_eq!(stat.num_accounts, 2);
        assert!(processor.deltas().is_empty());
    }

    #[test]
    fn incremental_inserts_updates_and_removes() {
        let table = Arc::new(InMemoryAssetStatTable::new());

        let mut first = incremental(&table);
        first.process_change(Change::created(line("GA", 10))).unwrap();
        first.commit().unwrap();
        assert_eq!(table.get_stat(&usd_key()).unwrap().unwrap().num_accounts, 1);

        let mut second = incremental(&table);
        second.process_change(Change::created(line("GB", 5))).unwrap();
        second.commit().unwrap();
        let stat = table.get_stat(&usd_key()).unwrap().unwrap();
        assert_eq!(stat.amount, BigInt::from(15));
        assert_eq!(stat.num_accounts, 2);

        let mut third = incremental(&table);
        third.process_change(Change::removed(line("GA", 10))).unwrap();
        third.process_change(Change::removed(line("GB", 5))).unwrap();
        third.commit().unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn zero_delta_groups_are_skipped() {
        let table = Arc::new(InMemoryAssetStatTable::new());
        let mut processor = incremental(&table);
        processor.process_change(Change::created(line("GA", 10))).unwrap();
        processor.process_change(Change::removed(line("GA", 10))).unwrap();
        processor.commit().unwrap();
        assert_eq!(table.write_calls(), 0);
        assert!(processor.deltas().is_empty());
    }

    #[test]
    fn negative_count_without_stat_is_fatal() {
        let table = Arc::new(InMemoryAssetStatTable::new());
        let mut processor = incremental(&table);
        processor.process_change(Change::removed(line("GA", 0))).unwrap();
        assert!(processor.commit().unwrap_err().is_fatal());
    }

    #[test]
    fn removal_with_leftover_amount_is_fatal() {
        let table = Arc::new(InMemoryAssetStatTable::new());
        table
            .insert_stat(&AssetStat {
                key: usd_key(),
                amount: BigInt::from(10),
                num_accounts: 1,
            })
            .unwrap();
        let mut processor = incremental(&table);
        processor.process_change(Change::removed(line("GA", 4))).unwrap();
        let err = processor.commit().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("non-zero amount"));
    }
}
