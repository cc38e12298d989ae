use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::error::{IngestError, Result};

/// Accumulated amount and holder count of one group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatValue {
    pub amount: BigInt,
    pub count: i32,
}

impl StatValue {
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero() && self.count == 0
    }
}

/// Sums signed deltas per group key.
///
/// Amounts are arbitrary precision so sums over many holders never wrap.
/// Groups appear on their first delta and leave only through
/// [`StatAggregator::remove`]; a group that sums back to zero stays tracked.
#[derive(Clone, Debug)]
pub struct StatAggregator<K> {
    groups: BTreeMap<K, StatValue>,
}

impl<K: Ord + Clone + std::fmt::Display> StatAggregator<K> {
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }

    /// Apply a delta, creating the group at zero if needed.
    ///
    /// Fails only if the holder count leaves the `i32` range.
    pub fn add_delta(&mut self, key: K, amount: &BigInt, count: i32) -> Result<()> {
        let value = self.groups.entry(key.clone()).or_default();
        let next = value.count.checked_add(count).ok_or_else(|| {
            IngestError::state(format!("holder count overflow for {key}"))
        })?;
        value.amount += amount;
        value.count = next;
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<&StatValue> {
        self.groups.get(key)
    }

    /// Every tracked group in key order, whatever its sign.
    pub fn all(&self) -> Vec<(K, StatValue)> {
        self.groups
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Stop tracking a group, returning its last value.
    pub fn remove(&mut self, key: &K) -> Option<StatValue> {
        self.groups.remove(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<K: Ord + Clone + std::fmt::Display> Default for StatAggregator<K> {
    fn default() -> Self {
        Self::new()
    }
}
