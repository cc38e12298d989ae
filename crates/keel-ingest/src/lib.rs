//! Ledger change ingestion for keel.
//!
//! A closed ledger arrives as a stream of [`Change`](keel_types::Change)s,
//! several of which may touch the same object. This crate coalesces them per
//! object, applies the net effect to the history tables, checks that every
//! write landed on exactly one row, and keeps the shared offer graph current.
//!
//! # Building Blocks
//!
//! - [`ChangeCache`] -- first-before / last-after coalescing per key
//! - [`StatAggregator`] -- arbitrary-precision per-group sums
//! - [`processors`] -- one [`ChangeProcessor`] per projection, built for a
//!   [`ProcessingMode`]
//! - [`LedgerRunner`] -- feeds a ledger through the processors, commits, and
//!   publishes the offer graph
//!
//! # Failure Model
//!
//! A write that affects anything other than one row, or an accounting
//! invariant that breaks, is an [`IngestError::State`]: the history store no
//! longer matches the ledger and the cursor must stop. Store I/O failures are
//! returned as [`IngestError::Store`] without retrying.

pub mod cache;
pub mod config;
pub mod error;
pub mod processors;
pub mod runner;
pub mod stats;

pub use cache::ChangeCache;
pub use config::{ConfigError, IngestConfig};
pub use error::{IngestError, Result};
pub use processors::{ChangeProcessor, ChangeStats, GroupChangeProcessor, ProcessingMode};
pub use runner::{CancelToken, HistoryStores, LedgerRunner};
pub use stats::{StatAggregator, StatValue};
