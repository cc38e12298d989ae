//! Foundation types for keel.
//!
//! Every other keel crate depends on `keel-types`. The types here describe the
//! change-stream produced by closing ledgers: entry snapshots, their natural
//! keys, and the before/after [`Change`] pairs consumed by ingestion.
//!
//! # Key Types
//!
//! - [`LedgerEntry`] / [`EntryData`] -- Snapshot of one chain-state object
//! - [`LedgerKey`] -- Natural key, totally ordered
//! - [`Change`] / [`ChangeType`] -- Before/after pair and its classification
//! - [`Asset`] / [`Price`] -- Traded assets and exact rational prices
//! - [`LedgerHeader`] -- Sequence and close time of a ledger

pub mod asset;
pub mod change;
pub mod entry;
pub mod error;
pub mod header;
pub mod key;
pub mod price;

pub use asset::{Asset, AssetType};
pub use change::{Change, ChangeType};
pub use entry::{
    AccountEntry, BalanceId, ClaimableBalanceEntry, DataEntry, EntryData, EntryKind, LedgerEntry,
    OfferEntry, Signer, TrustLineEntry,
};
pub use error::TypeError;
pub use header::LedgerHeader;
pub use key::LedgerKey;
pub use price::Price;
