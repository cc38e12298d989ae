use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::TypeError;
use crate::key::LedgerKey;
use crate::price::Price;

/// The kind of chain-state object a ledger entry describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryKind {
    Account,
    Offer,
    TrustLine,
    ClaimableBalance,
    Data,
}

impl EntryKind {
    pub const ALL: [EntryKind; 5] = [
        Self::Account,
        Self::Offer,
        Self::TrustLine,
        Self::ClaimableBalance,
        Self::Data,
    ];
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Account => "account",
            Self::Offer => "offer",
            Self::TrustLine => "trustline",
            Self::ClaimableBalance => "claimable_balance",
            Self::Data => "data",
        };
        f.write_str(s)
    }
}

/// A non-master signer attached to an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub key: String,
    pub weight: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub account_id: String,
    pub balance: i64,
    pub sequence: i64,
    pub num_sub_entries: u32,
    pub home_domain: String,
    /// Master weight, low, medium, high.
    pub thresholds: [u8; 4],
    pub signers: Vec<Signer>,
}

impl AccountEntry {
    pub fn new(account_id: impl Into<String>, balance: i64) -> Self {
        Self {
            account_id: account_id.into(),
            balance,
            sequence: 0,
            num_sub_entries: 0,
            home_domain: String::new(),
            thresholds: [1, 0, 0, 0],
            signers: Vec::new(),
        }
    }

    pub fn master_weight(&self) -> u8 {
        self.thresholds[0]
    }

    /// Every key able to sign for this account, with its weight.
    ///
    /// The master key is the account id itself and is only listed while its
    /// weight is non-zero.
    pub fn signer_summary(&self) -> BTreeMap<String, i32> {
        let mut summary = BTreeMap::new();
        if self.master_weight() > 0 {
            summary.insert(self.account_id.clone(), i32::from(self.master_weight()));
        }
        for signer in &self.signers {
            summary.insert(signer.key.clone(), signer.weight);
        }
        summary
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferEntry {
    pub seller_id: String,
    pub offer_id: i64,
    pub selling: Asset,
    pub buying: Asset,
    pub amount: i64,
    pub price: Price,
    pub flags: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLineEntry {
    pub account_id: String,
    pub asset: Asset,
    pub balance: i64,
    pub limit: i64,
    pub flags: u32,
}

/// 32-byte claimable balance identifier, rendered as hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceId([u8; 32]);

impl BalanceId {
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for BalanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BalanceId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for BalanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimableBalanceEntry {
    pub balance_id: BalanceId,
    pub asset: Asset,
    pub amount: i64,
    pub claimants: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub account_id: String,
    pub name: String,
    pub value: Vec<u8>,
}

/// Kind-specific body of a ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryData {
    Account(AccountEntry),
    Offer(OfferEntry),
    TrustLine(TrustLineEntry),
    ClaimableBalance(ClaimableBalanceEntry),
    Data(DataEntry),
}

impl EntryData {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Account(_) => EntryKind::Account,
            Self::Offer(_) => EntryKind::Offer,
            Self::TrustLine(_) => EntryKind::TrustLine,
            Self::ClaimableBalance(_) => EntryKind::ClaimableBalance,
            Self::Data(_) => EntryKind::Data,
        }
    }
}

/// Snapshot of one addressable chain-state object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub last_modified_ledger: u32,
    pub data: EntryData,
}

impl LedgerEntry {
    pub fn new(last_modified_ledger: u32, data: EntryData) -> Self {
        Self {
            last_modified_ledger,
            data,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.data.kind()
    }

    /// The natural key identifying this object across its lifetime.
    pub fn key(&self) -> LedgerKey {
        match &self.data {
            EntryData::Account(a) => LedgerKey::Account {
                account_id: a.account_id.clone(),
            },
            EntryData::Offer(o) => LedgerKey::Offer {
                seller_id: o.seller_id.clone(),
                offer_id: o.offer_id,
            },
            EntryData::TrustLine(t) => LedgerKey::TrustLine {
                account_id: t.account_id.clone(),
                asset: t.asset.clone(),
            },
            EntryData::ClaimableBalance(c) => LedgerKey::ClaimableBalance {
                balance_id: c.balance_id,
            },
            EntryData::Data(d) => LedgerKey::Data {
                account_id: d.account_id.clone(),
                name: d.name.clone(),
            },
        }
    }

    pub fn as_account(&self) -> Option<&AccountEntry> {
        match &self.data {
            EntryData::Account(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_offer(&self) -> Option<&OfferEntry> {
        match &self.data {
            EntryData::Offer(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_trust_line(&self) -> Option<&TrustLineEntry> {
        match &self.data {
            EntryData::TrustLine(t) => Some(t),
            _ => None,
        }
    }
}
