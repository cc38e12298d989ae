use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use keel_types::{Asset, AssetType, LedgerEntry, LedgerKey};

/// A ledger entry as persisted, with the ledger that last wrote it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRow {
    pub entry: LedgerEntry,
    pub ledger: u32,
}

impl EntryRow {
    pub fn new(entry: LedgerEntry, ledger: u32) -> Self {
        Self { entry, ledger }
    }

    pub fn key(&self) -> LedgerKey {
        self.entry.key()
    }
}

/// One (account, signer) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignerRow {
    pub account_id: String,
    pub signer: String,
    pub weight: i32,
}

/// Grouping key for asset statistics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetStatKey {
    pub asset_type: AssetType,
    pub code: String,
    pub issuer: String,
}

impl AssetStatKey {
    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            asset_type: asset.asset_type(),
            code: asset.code().to_string(),
            issuer: asset.issuer().to_string(),
        }
    }
}

impl fmt::Display for AssetStatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.asset_type, self.code, self.issuer)
    }
}

/// Aggregated holdings of one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStat {
    pub key: AssetStatKey,
    pub amount: BigInt,
    pub num_accounts: i32,
}
