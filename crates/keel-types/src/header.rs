use serde::{Deserialize, Serialize};

/// Header of a closed ledger, the unit of work for incremental ingestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub sequence: u32,
    /// Close time, seconds since the Unix epoch.
    pub close_time: i64,
    pub protocol_version: u32,
}

impl LedgerHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            sequence,
            close_time: 0,
            protocol_version: 0,
        }
    }
}
