use thiserror::Error;

use crate::entry::EntryKind;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid asset code {0:?}: must be 1-12 ASCII alphanumerics")]
    InvalidAssetCode(String),

    #[error("invalid price {n}/{d}: denominator must be positive")]
    InvalidPrice { n: i32, d: i32 },

    #[error("snapshot kind mismatch: change is {expected}, snapshot is {actual}")]
    KindMismatch { expected: EntryKind, actual: EntryKind },

    #[error("before and after snapshots describe different ledger keys")]
    KeyMismatch,
}
