use keel_orderbook::OrderBookError;
use keel_store::StoreError;
use keel_types::TypeError;

use crate::config::ConfigError;

/// Errors produced while ingesting a ledger.
///
/// Two classes matter to the caller. [`IngestError::State`] means the
/// persisted history no longer agrees with the ledger; the cursor must stop
/// and an operator has to intervene. [`IngestError::Store`] is an I/O
/// failure of the persistence capability; replaying the same ledger from a
/// consistent pre-state is safe. Nothing in this crate retries.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The store diverged from the ledger, or an accounting invariant broke.
    #[error("state error: {0}")]
    State(String),

    /// A persistence call failed.
    #[error("store error during {action}: {source}")]
    Store {
        action: String,
        #[source]
        source: StoreError,
    },

    /// The offer graph rejected a batch.
    #[error("order book graph: {0}")]
    Graph(#[from] OrderBookError),

    /// A change was malformed.
    #[error("invalid change: {0}")]
    Type(#[from] TypeError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The run was cancelled between changes.
    #[error("ingestion cancelled")]
    Cancelled,

    /// A ledger was handed over out of sequence.
    #[error("ledger {actual} out of order, expected {expected}")]
    OutOfOrder { expected: u32, actual: u32 },
}

impl IngestError {
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn store(action: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            action: action.into(),
            source,
        }
    }

    /// The cursor must not advance past this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::State(_) | Self::Type(_) | Self::Graph(_))
    }

    /// Replaying the same ledger may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
