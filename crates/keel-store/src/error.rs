use keel_types::EntryKind;

/// Errors from history store operations.
///
/// Every variant describes an I/O-level failure of the backend. Whether a
/// failed write means the stored state diverged from the ledger is decided
/// by the caller from the affected-row count, not from these errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A backend constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A row of the wrong kind was handed to a table.
    #[error("table holds {expected} rows, got {actual}")]
    KindMismatch {
        expected: EntryKind,
        actual: EntryKind,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
