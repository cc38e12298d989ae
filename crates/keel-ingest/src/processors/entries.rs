use std::sync::Arc;

use tracing::{debug, info, warn};

use keel_store::{new_entry_batch_insert_builder, BatchInsertBuilder, EntryRow, EntryTable};
use keel_types::{Change, ChangeType, EntryKind, LedgerHeader};

use crate::cache::ChangeCache;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::processors::{expect_one_row, ChangeProcessor, ProcessingMode};

/// Build the entry processor for `table` in the given mode.
pub fn entry_processor(
    table: Arc<dyn EntryTable>,
    header: &LedgerHeader,
    mode: ProcessingMode,
    config: &IngestConfig,
) -> Result<Box<dyn ChangeProcessor>> {
    let processor: Box<dyn ChangeProcessor> = match mode {
        ProcessingMode::Bootstrap => Box::new(BootstrapEntryProcessor::new(table, header, config)?),
        ProcessingMode::Incremental => {
            Box::new(IncrementalEntryProcessor::new(table, header, config))
        }
    };
    Ok(processor)
}

enum BootstrapSink {
    Bulk(BatchInsertBuilder<EntryRow>),
    /// The table already holds rows, so each entry is upserted.
    Upsert,
}

/// Imports the full state of one entry kind.
pub struct BootstrapEntryProcessor {
    name: String,
    kind: EntryKind,
    ledger: u32,
    table: Arc<dyn EntryTable>,
    sink: BootstrapSink,
    imported: u64,
}

impl BootstrapEntryProcessor {
    /// When the config asks for it, counts the table first and switches to
    /// per-row upserts if anything is already there.
    pub fn new(
        table: Arc<dyn EntryTable>,
        header: &LedgerHeader,
        config: &IngestConfig,
    ) -> Result<Self> {
        let kind = table.kind();
        let populated = if config.check_bootstrap_table_count {
            let rows = table
                .count()
                .map_err(|e| IngestError::store(format!("count {kind} rows"), e))?;
            rows > 0
        } else {
            false
        };

        let sink = if populated {
            warn!(kind = %kind, "table already populated, bootstrap falls back to upserts");
            BootstrapSink::Upsert
        } else {
            BootstrapSink::Bulk(new_entry_batch_insert_builder(
                Arc::clone(&table),
                config.max_batch_size,
            ))
        };

        Ok(Self {
            name: format!("bootstrap_{kind}"),
            kind,
            ledger: header.sequence,
            table,
            sink,
            imported: 0,
        })
    }

    /// True when the table was found populated at init.
    pub fn is_upserting(&self) -> bool {
        matches!(self.sink, BootstrapSink::Upsert)
    }
}

impl ChangeProcessor for BootstrapEntryProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_change(&mut self, change: Change) -> Result<()> {
        if change.kind != self.kind {
            return Ok(());
        }
        change.validate()?;
        let (kind, ledger) = (self.kind, self.ledger);
        let change_type = change.change_type();
        let entry = match (change_type, change.after) {
            (Some(ChangeType::Created), Some(entry)) => entry,
            _ => {
                return Err(IngestError::state(format!(
                    "bootstrap {kind} import expects created changes, got {}",
                    change_type.map_or_else(|| "an empty change".to_string(), |t| t.to_string()),
                )))
            }
        };

        match &mut self.sink {
            BootstrapSink::Bulk(builder) => builder
                .add(EntryRow::new(entry, ledger))
                .map_err(|e| IngestError::store(format!("batch insert {kind} rows"), e))?,
            BootstrapSink::Upsert => {
                let rows = self
                    .table
                    .upsert(&entry, ledger)
                    .map_err(|e| IngestError::store(format!("upsert {}", entry.key()), e))?;
                expect_one_row(rows, format_args!("upsert {}", entry.key()))?;
            }
        }
        self.imported += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let kind = self.kind;
        if let BootstrapSink::Bulk(builder) = &mut self.sink {
            let summary = builder
                .exec()
                .map_err(|e| IngestError::store(format!("batch insert {kind} rows"), e))?;
            if !summary.is_exact() {
                return Err(IngestError::state(format!(
                    "batch insert {kind} rows: {} rows affected, expected {}",
                    summary.rows_affected, summary.rows_added
                )));
            }
        }
        info!(
            kind = %self.kind,
            ledger = self.ledger,
            imported = self.imported,
            "bootstrap import committed"
        );
        Ok(())
    }
}

/// Applies one ledger's net changes for one entry kind.
pub struct IncrementalEntryProcessor {
    name: String,
    kind: EntryKind,
    ledger: u32,
    table: Arc<dyn EntryTable>,
    cache: ChangeCache,
    flush_threshold: usize,
    max_batch_size: usize,
}

impl IncrementalEntryProcessor {
    pub fn new(table: Arc<dyn EntryTable>, header: &LedgerHeader, config: &IngestConfig) -> Self {
        let kind = table.kind();
        Self {
            name: format!("incremental_{kind}"),
            kind,
            ledger: header.sequence,
            table,
            cache: ChangeCache::new(),
            flush_threshold: config.flush_threshold,
            max_batch_size: config.max_batch_size,
        }
    }

    /// Keys currently buffered.
    pub fn buffered(&self) -> usize {
        self.cache.size()
    }

    fn flush(&mut self) -> Result<()> {
        if self.cache.is_empty() {
            return Ok(());
        }
        let changes = self.cache.get_changes();
        let net = changes.len();
        let mut inserts =
            new_entry_batch_insert_builder(Arc::clone(&self.table), self.max_batch_size);
        let kind = self.kind;
        let insert_action = move || format!("batch insert {kind} rows");

        for change in changes {
            match (change.before, change.after) {
                (None, Some(after)) => inserts
                    .add(EntryRow::new(after, self.ledger))
                    .map_err(|e| IngestError::store(insert_action(), e))?,
                (Some(_), Some(after)) => {
                    let key = after.key();
                    let rows = self
                        .table
                        .update(&after, self.ledger)
                        .map_err(|e| IngestError::store(format!("update {key}"), e))?;
                    expect_one_row(rows, format_args!("update {key}"))?;
                }
                (Some(before), None) => {
                    let key = before.key();
                    let rows = self
                        .table
                        .remove(&key)
                        .map_err(|e| IngestError::store(format!("remove {key}"), e))?;
                    expect_one_row(rows, format_args!("remove {key}"))?;
                }
                (None, None) => {
                    return Err(IngestError::state(format!(
                        "{kind} change has neither before nor after"
                    )))
                }
            }
        }

        let summary = inserts
            .exec()
            .map_err(|e| IngestError::store(insert_action(), e))?;
        if !summary.is_exact() {
            return Err(IngestError::state(format!(
                "{}: {} rows affected, expected {}",
                insert_action(),
                summary.rows_affected,
                summary.rows_added
            )));
        }

        debug!(
            kind = %self.kind,
            ledger = self.ledger,
            buffered = self.cache.size(),
            net,
            inserted = summary.rows_added,
            "flushed entry changes"
        );
        self.cache.clear();
        Ok(())
    }
}

impl ChangeProcessor for IncrementalEntryProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_change(&mut self, change: Change) -> Result<()> {
        if change.kind != self.kind {
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
