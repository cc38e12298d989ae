//! Persistence capability for keel.
//!
//! The ingestion engine treats history storage as an opaque set of tables,
//! one per projected entity. Each write reports how many rows it affected;
//! the engine, not the store, decides whether that count means the stored
//! state has diverged from the ledger.
//!
//! # Tables
//!
//! - [`EntryTable`] -- one per [`keel_types::EntryKind`]
//! - [`SignerTable`] -- (account, signer) rows
//! - [`AssetStatTable`] -- aggregated holdings per asset
//!
//! Bulk loads go through a [`BatchInsertBuilder`], which writes fixed-size
//! chunks as rows are added.
//!
//! # Storage Backends
//!
//! - [`InMemoryEntryTable`], [`InMemorySignerTable`],
//!   [`InMemoryAssetStatTable`] -- `BTreeMap`-based tables for tests and
//!   embedding

pub mod batch;
pub mod error;
pub mod memory;
pub mod rows;
pub mod traits;

pub use batch::{
    new_asset_stat_batch_insert_builder, new_entry_batch_insert_builder,
    new_signer_batch_insert_builder, BatchInsertBuilder, BatchSummary,
};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryAssetStatTable, InMemoryEntryTable, InMemorySignerTable};
pub use rows::{AssetStat, AssetStatKey, EntryRow, SignerRow};
pub use traits::{AssetStatTable, EntryTable, SignerTable};
