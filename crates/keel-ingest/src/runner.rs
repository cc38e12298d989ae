use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use keel_orderbook::OfferGraph;
use keel_store::{AssetStatTable, EntryTable, SignerTable};
use keel_types::{Change, EntryKind, LedgerHeader};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::processors::{
    asset_stats_processor, entry_processor, signers_processor, ChangeProcessor, ChangeStats,
    GroupChangeProcessor, OrderBookProcessor, ProcessingMode,
};

/// Cooperative cancellation flag shared between a runner and its owner.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The persistence capabilities a runner writes to.
#[derive(Clone)]
pub struct HistoryStores {
    entries: BTreeMap<EntryKind, Arc<dyn EntryTable>>,
    signers: Option<Arc<dyn SignerTable>>,
    asset_stats: Option<Arc<dyn AssetStatTable>>,
}

impl HistoryStores {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            signers: None,
            asset_stats: None,
        }
    }

    /// Register a table under its own kind, replacing any previous one.
    pub fn with_entry_table(mut self, table: Arc<dyn EntryTable>) -> Self {
        self.entries.insert(table.kind(), table);
        self
    }

    pub fn with_signers(mut self, table: Arc<dyn SignerTable>) -> Self {
        self.signers = Some(table);
        self
    }

    pub fn with_asset_stats(mut self, table: Arc<dyn AssetStatTable>) -> Self {
        self.asset_stats = Some(table);
        self
    }

    pub fn entry_table(&self, kind: EntryKind) -> Option<&Arc<dyn EntryTable>> {
        self.entries.get(&kind)
    }
}

impl Default for HistoryStores {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HistoryStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStores")
            .field("entry_kinds", &self.entries.keys().collect::<Vec<_>>())
            .field("signers", &self.signers.is_some())
            .field("asset_stats", &self.asset_stats.is_some())
            .finish()
    }
}

/// Drives one ledger at a time through the processor group.
///
/// A run builds fresh processors for the header and mode, feeds every
/// change, commits, and finally publishes the queued graph operations under
/// the ledger's sequence. Any failure discards the queued graph operations
/// and leaves [`LedgerRunner::last_committed`] where it was, so the same
/// ledger can be replayed.
pub struct LedgerRunner {
    stores: HistoryStores,
    graph: Arc<dyn OfferGraph>,
    config: IngestConfig,
    last_committed: Option<u32>,
}

impl LedgerRunner {
    pub fn new(stores: HistoryStores, graph: Arc<dyn OfferGraph>, config: IngestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stores,
            graph,
            config,
            last_committed: None,
        })
    }

    /// Sequence of the last ledger committed by this runner.
    pub fn last_committed(&self) -> Option<u32> {
        self.last_committed
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Build the processor group for one unit of work.
    pub fn build_processors(
        &self,
        header: &LedgerHeader,
        mode: ProcessingMode,
    ) -> Result<GroupChangeProcessor> {
        let mut group = GroupChangeProcessor::new(Vec::new());
        for table in self.stores.entries.values() {
            group.push(entry_processor(Arc::clone(table), header, mode, &self.config)?);
        }
        if let Some(table) = &self.stores.signers {
            group.push(signers_processor(Arc::clone(table), header, mode, &self.config));
        }
        if let Some(table) = &self.stores.asset_stats {
            group.push(asset_stats_processor(Arc::clone(table), header, mode, &self.config));
        }
        group.push(Box::new(OrderBookProcessor::new(Arc::clone(&self.graph))));
        Ok(group)
    }

    /// Process and commit one ledger.
    ///
    /// In incremental mode, once a ledger has been committed the next one
    /// must follow it directly. A bootstrap run resets the graph first and
    /// may start at any sequence.
    pub fn run_ledger<I>(
        &mut self,
        header: &LedgerHeader,
        mode: ProcessingMode,
        changes: I,
        cancel: &CancelToken,
    ) -> Result<ChangeStats>
    where
        I: IntoIterator<Item = Change>,
    {
        if mode == ProcessingMode::Incremental {
            if let Some(last) = self.last_committed {
                let expected = last.wrapping_add(1);
                if header.sequence != expected {
                    return Err(IngestError::OutOfOrder {
                        expected,
                        actual: header.sequence,
                    });
                }
            }
        } else {
            self.graph.clear();
        }

        match self.process(header, mode, changes, cancel) {
            Ok(stats) => {
                self.last_committed = Some(header.sequence);
                info!(
                    ledger = header.sequence,
                    mode = %mode,
                    changes = stats.total(),
                    "ledger committed"
                );
                Ok(stats)
            }
            Err(err) => {
                self.graph.discard();
                if err.is_fatal() {
                    warn!(ledger = header.sequence, error = %err, "ingestion halted on state error");
                } else {
                    warn!(ledger = header.sequence, error = %err, "ledger not committed");
                }
                Err(err)
            }
        }
    }

    fn process<I>(
        &self,
        header: &LedgerHeader,
        mode: ProcessingMode,
        changes: I,
        cancel: &CancelToken,
    ) -> Result<ChangeStats>
    where
        I: IntoIterator<Item = Change>,
    {
        let mut group = self.build_processors(header, mode)?;
        for change in changes {
            if cancel.is_cancelled() {
                return Err(IngestError::Cancelled);
            }
            group.process_change(change)?;
        }
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        group.commit()?;
        self.graph.apply(header.sequence)?;
        Ok(group.stats().clone())
    }
}

impl std::fmt::Debug for LedgerRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerRunner")
            .field("stores", &self.stores)
            .field("config", &self.config)
            .field("last_committed", &self.last_committed)
            .finish()
    }
}
