use std::sync::Arc;

use tracing::debug;

use crate::error::StoreResult;
use crate::rows::{AssetStat, EntryRow, SignerRow};
use crate::traits::{AssetStatTable, EntryTable, SignerTable};

type FlushFn<R> = Box<dyn FnMut(&[R]) -> StoreResult<u64> + Send>;

/// Totals reported by [`BatchInsertBuilder::exec`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows handed to `add` since the last `exec`.
    pub rows_added: u64,
    /// Rows the backend reports as inserted.
    pub rows_affected: u64,
}

impl BatchSummary {
    /// True when every added row produced exactly one affected row.
    pub fn is_exact(&self) -> bool {
        self.rows_added == self.rows_affected
    }
}

/// Buffers rows and inserts them in chunks of at most `max_batch_size`.
///
/// `add` writes a full chunk as soon as one accumulates, so a builder never
/// holds more than `max_batch_size` rows. `exec` writes whatever is left and
/// returns the totals since the previous `exec`.
pub struct BatchInsertBuilder<R> {
    label: &'static str,
    max_batch_size: usize,
    pending: Vec<R>,
    summary: BatchSummary,
    flush: FlushFn<R>,
}

impl<R> BatchInsertBuilder<R> {
    /// Build around an arbitrary chunk writer. A `max_batch_size` of zero is
    /// treated as one.
    pub fn new<F>(label: &'static str, max_batch_size: usize, flush: F) -> Self
    where
        F: FnMut(&[R]) -> StoreResult<u64> + Send + 'static,
    {
        let max_batch_size = max_batch_size.max(1);
        Self {
            label,
            max_batch_size,
            pending: Vec::with_capacity(max_batch_size.min(1024)),
            summary: BatchSummary::default(),
            flush: Box::new(flush),
        }
    }

    pub fn add(&mut self, row: R) -> StoreResult<()> {
        self.pending.push(row);
        self.summary.rows_added += 1;
        if self.pending.len() >= self.max_batch_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    /// Rows buffered but not yet written.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn exec(&mut self) -> StoreResult<BatchSummary> {
        self.flush_pending()?;
        Ok(std::mem::take(&mut self.summary))
    }

    fn flush_pending(&mut self) -> StoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let affected = (self.flush)(&self.pending)?;
        debug!(
            table = self.label,
            rows = self.pending.len(),
            affected,
            "batch insert flushed"
        );
        self.summary.rows_affected += affected;
        self.pending.clear();
        Ok(())
    }
}

impl<R> std::fmt::Debug for BatchInsertBuilder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchInsertBuilder")
            .field("label", &self.label)
            .field("max_batch_size", &self.max_batch_size)
            .field("pending", &self.pending.len())
            .field("summary", &self.summary)
            .finish()
    }
}

/// Batch builder writing through [`EntryTable::insert_batch`].
pub fn new_entry_batch_insert_builder(
    table: Arc<dyn EntryTable>,
    max_batch_size: usize,
) -> BatchInsertBuilder<EntryRow> {
    BatchInsertBuilder::new("entries", max_batch_size, move |rows| {
        table.insert_batch(rows)
    })
}

/// Batch builder writing through [`SignerTable::insert_signers`].
pub fn new_signer_batch_insert_builder(
    table: Arc<dyn SignerTable>,
    max_batch_size: usize,
) -> BatchInsertBuilder<SignerRow> {
    BatchInsertBuilder::new("signers", max_batch_size, move |rows| {
        table.insert_signers(rows)
    })
}

/// Batch builder writing through [`AssetStatTable::insert_stats`].
pub fn new_asset_stat_batch_insert_builder(
    table: Arc<dyn AssetStatTable>,
    max_batch_size: usize,
) -> BatchInsertBuilder<AssetStat> {
    BatchInsertBuilder::new("asset_stats", max_batch_size, move |rows| {
        table.insert_stats(rows)
    })
}
