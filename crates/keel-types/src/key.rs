use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::entry::{BalanceId, EntryKind};

/// Natural key of a ledger entry.
///
/// Keys are totally ordered so that keyed collections iterate in the same
/// order for the same contents.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LedgerKey {
    Account { account_id: String },
    Offer { seller_id: String, offer_id: i64 },
    TrustLine { account_id: String, asset: Asset },
    ClaimableBalance { balance_id: BalanceId },
    Data { account_id: String, name: String },
}

impl LedgerKey {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Account { .. } => EntryKind::Account,
            Self::Offer { .. } => EntryKind::Offer,
            Self::TrustLine { .. } => EntryKind::TrustLine,
            Self::ClaimableBalance { .. } => EntryKind::ClaimableBalance,
            Self::Data { .. } => EntryKind::Data,
        }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account { account_id } => write!(f, "account:{account_id}"),
            Self::Offer {
                seller_id,
                offer_id,
            } => write!(f, "offer:{seller_id}:{offer_id}"),
            Self::TrustLine { account_id, asset } => write!(f, "trustline:{account_id}:{asset}"),
            Self::ClaimableBalance { balance_id } => write!(f, "claimable_balance:{balance_id}"),
            Self::Data { account_id, name } => write!(f, "data:{account_id}:{name}"),
        }
    }
}
