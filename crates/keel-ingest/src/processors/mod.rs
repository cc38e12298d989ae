//! Processors project ledger changes into history tables and the offer
//! graph.
//!
//! Each processor owns its per-window state (a [`ChangeCache`] or a
//! [`StatAggregator`]) and is built for one unit of work: one bootstrap pass
//! or one ledger. The [`ProcessingMode`] picks the implementation at
//! construction time; there is no processor that branches on mode per call.
//!
//! [`ChangeCache`]: crate::cache::ChangeCache
//! [`StatAggregator`]: crate::stats::StatAggregator

use std::fmt;

use tracing::warn;

use keel_types::Change;

use crate::error::{IngestError, Result};

pub mod asset_stats;
pub mod entries;
pub mod group;
pub mod orderbook;
pub mod signers;

pub use asset_stats::{
    asset_stats_processor, AssetStatsProcessor, BootstrapStatsCommit, IncrementalStatsCommit,
    StatsCommit,
};
pub use entries::{entry_processor, BootstrapEntryProcessor, IncrementalEntryProcessor};
pub use group::{ChangeStats, GroupChangeProcessor};
pub use orderbook::OrderBookProcessor;
pub use signers::{signers_processor, BootstrapSignersProcessor, IncrementalSignersProcessor};

/// How a unit of work is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessingMode {
    /// Full-state import. Every change must be a creation.
    Bootstrap,
    /// Per-ledger deltas.
    Incremental,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap => f.write_str("bootstrap"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// The contract every processor implements.
///
/// `process_change` is called once per incoming change, in ledger order.
/// Changes of kinds the processor does not project are ignored. `commit`
/// ends the unit of work; the processor is not reused afterwards.
pub trait ChangeProcessor: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn process_change(&mut self, change: Change) -> Result<()>;

    fn commit(&mut self) -> Result<()>;
}

/// Promote any affected-row count other than one to a state error.
pub(crate) fn expect_one_row(rows: u64, action: fmt::Arguments<'_>) -> Result<()> {
    if rows == 1 {
        return Ok(());
    }
    warn!(rows, action = %action, "unexpected affected-row count");
    Err(IngestError::state(format!(
        "{action}: {rows} rows affected, expected 1"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_row_is_accepted() {
        assert!(expect_one_row(1, format_args!("update offer 1")).is_ok());
        let err = expect_one_row(0, format_args!("update offer 1")).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "state error: update offer 1: 0 rows affected, expected 1"
        );
        assert!(expect_one_row(2, format_args!("remove")).is_err());
    }
}
