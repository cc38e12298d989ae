use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::{EntryKind, LedgerEntry};
use crate::error::TypeError;
use crate::key::LedgerKey;

/// Classification of a before/after pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeType {
    Created,
    Updated,
    Removed,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// One ledger entry's mutation within a unit of work.
///
/// `before` absent means the entry was created, `after` absent means it was
/// removed, both present means it was updated. A change with neither side is
/// malformed; the checked constructors never produce one, but values decoded
/// from upstream may, so consumers must still call [`Change::change_type`]
/// and handle `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: EntryKind,
    pub before: Option<LedgerEntry>,
    pub after: Option<LedgerEntry>,
}

impl Change {
    pub fn created(after: LedgerEntry) -> Self {
        Self {
            kind: after.kind(),
            before: None,
            after: Some(after),
        }
    }

    pub fn removed(before: LedgerEntry) -> Self {
        Self {
            kind: before.kind(),
            before: Some(before),
            after: None,
        }
    }

    /// Build an update, checking both snapshots describe the same object.
    pub fn updated(before: LedgerEntry, after: LedgerEntry) -> Result<Self, TypeError> {
        if before.kind() != after.kind() {
            return Err(TypeError::KindMismatch {
                expected: before.kind(),
                actual: after.kind(),
            });
        }
        if before.key() != after.key() {
            return Err(TypeError::KeyMismatch);
        }
        Ok(Self {
            kind: before.kind(),
            before: Some(before),
            after: Some(after),
        })
    }

    /// Check that every present snapshot matches `kind`.
    pub fn validate(&self) -> Result<(), TypeError> {
        for entry in [&self.before, &self.after].into_iter().flatten() {
            if entry.kind() != self.kind {
                return Err(TypeError::KindMismatch {
                    expected: self.kind,
                    actual: entry.kind(),
                });
            }
        }
        Ok(())
    }

    /// `None` when both sides are absent.
    pub fn change_type(&self) -> Option<ChangeType> {
        match (&self.before, &self.after) {
            (None, Some(_)) => Some(ChangeType::Created),
            (Some(_), Some(_)) => Some(ChangeType::Updated),
            (Some(_), None) => Some(ChangeType::Removed),
            (None, None) => None,
        }
    }

    /// Key of the affected object, taken from whichever side is present.
    pub fn key(&self) -> Option<LedgerKey> {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map(LedgerEntry::key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{AccountEntry, EntryData};

    fn account(id: &str, balance: i64) -> LedgerEntry {
        LedgerEntry::new(1, EntryData::Account(AccountEntry::new(id, balance)))
    }

    #[test]
    fn classification() {
        assert_eq!(
            Change::created(account("GA", 1)).change_type(),
            Some(ChangeType::Created)
        );
        assert_eq!(
            Change::removed(account("GA", 1)).change_type(),
            Some(ChangeType::Removed)
        );
        let updated = Change::updated(account("GA", 1), account("GA", 2)).unwrap();
        assert_eq!(updated.change_type(), Some(ChangeType::Updated));

        let empty = Change {
            kind: EntryKind::Account,
            before: None,
            after: None,
        };
        assert_eq!(empty.change_type(), None);
        assert_eq!(empty.key(), None);
    }

    #[test]
    fn update_requires_same_key() {
        assert_eq!(
            Change::updated(account("GA", 1), account("GB", 1)),
            Err(TypeError::KeyMismatch)
        );
    }

    #[test]
    fn validate_detects_kind_mismatch() {
        let change = Change {
            kind: EntryKind::Offer,
            before: None,
            after: Some(account("GA", 1)),
        };
        assert_eq!(
            change.validate(),
            Err(TypeError::KindMismatch {
                expected: EntryKind::Offer,
                actual: EntryKind::Account
            })
        );
    }

    #[test]
    fn serde_roundtrip_keeps_sides() {
        let change = Change::removed(account("GA", 7));
        let json = serde_json::to_string(&change).unwrap();
        let back: Change = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
    }
}
