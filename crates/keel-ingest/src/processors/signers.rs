use std::sync::Arc;

use tracing::{debug, info};

use keel_store::{new_signer_batch_insert_builder, BatchInsertBuilder, SignerRow, SignerTable};
use keel_types::{Change, ChangeType, EntryKind, LedgerEntry, LedgerHeader};

use crate::cache::ChangeCache;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::processors::{expect_one_row, ChangeProcessor, ProcessingMode};

/// Build the signers processor in the given mode.
pub fn signers_processor(
    table: Arc<dyn SignerTable>,
    header: &LedgerHeader,
    mode: ProcessingMode,
    config: &IngestConfig,
) -> Box<dyn ChangeProcessor> {
    match mode {
        ProcessingMode::Bootstrap => Box::new(BootstrapSignersProcessor::new(table, header, config)),
        ProcessingMode::Incremental => {
            Box::new(IncrementalSignersProcessor::new(table, header, config))
        }
    }
}

fn signer_rows(entry: &LedgerEntry) -> Vec<SignerRow> {
    let Some(account) = entry.as_account() else {
        return Vec::new();
    };
    account
        .signer_summary()
        .into_iter()
        .map(|(signer, weight)| SignerRow {
            account_id: account.account_id.clone(),
            signer,
            weight,
        })
        .collect()
}

/// Loads the signers of every account in a full-state import.
pub struct BootstrapSignersProcessor {
    ledger: u32,
    batch: BatchInsertBuilder<SignerRow>,
}

impl BootstrapSignersProcessor {
    pub fn new(table: Arc<dyn SignerTable>, header: &LedgerHeader, config: &IngestConfig) -> Self {
        Self {
            ledger: header.sequence,
            batch: new_signer_batch_insert_builder(table, config.max_batch_size),
        }
    }
}

impl ChangeProcessor for BootstrapSignersProcessor {
    fn name(&self) -> &str {
        "bootstrap_signers"
    }

    fn process_change(&mut self, change: Change) -> Result<()> {
        if change.kind != EntryKind::Account {
            return Ok(());
        }
        change.validate()?;
        let entry = match (change.change_type(), &change.after) {
            (Some(ChangeType::Created), Some(entry)) => entry,
            (other, _) => {
                return Err(IngestError::state(format!(
                    "bootstrap signers import expects created accounts, got {}",
                    other.map_or_else(|| "an empty change".to_string(), |t| t.to_string())
                )))
            }
        };
        for row in signer_rows(entry) {
            self.batch
                .add(row)
                .map_err(|e| IngestError::store("batch insert signers", e))?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let summary = self
            .batch
            .exec()
            .map_err(|e| IngestError::store("batch insert signers", e))?;
        if !summary.is_exact() {
            return Err(IngestError::state(format!(
                "batch insert signers: {} rows affected, expected {}",
                summary.rows_affected, summary.rows_added
            )));
        }
        info!(
            ledger = self.ledger,
            signers = summary.rows_added,
            "bootstrap signers committed"
        );
        Ok(())
    }
}

/// Keeps signer rows in step with account changes, one ledger at a time.
///
/// Accounts whose signer set did not change are skipped. Otherwise every
/// signer of the coalesced `before` is removed and every signer of the
/// coalesced `after` is inserted.
pub struct IncrementalSignersProcessor {
    ledger: u32,
    table: Arc<dyn SignerTable>,
    cache: ChangeCache,
    flush_threshold: usize,
}

impl IncrementalSignersProcessor {
    pub fn new(table: Arc<dyn SignerTable>, header: &LedgerHeader, config: &IngestConfig) -> Self {
        Self {
            ledger: header.sequence,
            table,
            cache: ChangeCache::new(),
            flush_threshold: config.flush_threshold,
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.cache.is_empty() {
            return Ok(());
        }
        let mut removed = 0u64;
        let mut inserted = 0u64;
        for change in self.cache.get_changes() {
            let before = change.before.as_ref().map(signer_rows).unwrap_or_default();
            let after = change.after.as_ref().map(signer_rows).unwrap_or_default();
            if change.change_type() == Some(ChangeType::Updated) && before == after {
                continue;
            }

            for row in &before {
                let rows = self
                    .table
                    .remove_signer(&row.account_id, &row.signer)
                    .map_err(|e| IngestError::store("remove signer", e))?;
                expect_one_row(
                    rows,
                    format_args!("remove signer {} of {}", row.signer, row.account_id),
                )?;
                removed += 1;
            }
            for row in &after {
                let rows = self
                    .table
                    .insert_signer(&row.account_id, &row.signer, row.weight)
                    .map_err(|e| IngestError::store("insert signer", e))?;
                expect_one_row(
                    rows,
                    format_args!("insert signer {} of {}", row.signer, row.account_id),
                )?;
                inserted += 1;
            }
        }
        debug!(ledger = self.ledger, removed, inserted, "flushed signer changes");
        self.cache.clear();
        Ok(())
    }
}

impl ChangeProcessor for IncrementalSignersProcessor {
    fn name(&self) -> &str {
        "incremental_signers"
    }

    fn process_change(&mut self, change: Change) -> Result<()> {
        if change.kind != EntryKind::Account {
            return Ok(());
        }
        self.cache.add_change(change)?;
        if self.cache.size() > self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.flush()
    }
}
