use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Rational offer price `n / d`.
///
/// Comparison is exact: two prices are ordered by cross-multiplying in
/// 64-bit space, so `1/2` and `2/4` compare equal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Price {
    pub n: i32,
    pub d: i32,
}

impl Price {
    pub fn new(n: i32, d: i32) -> Result<Self, TypeError> {
        if d <= 0 {
            return Err(TypeError::InvalidPrice { n, d });
        }
        Ok(Self { n, d })
    }

    /// Lossy floating-point view, for display and persistence columns.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.n) / f64::from(self.d)
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i64::from(self.n) * i64::from(other.d);
        let rhs = i64::from(other.n) * i64::from(self.d);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.n, self.d)
    }
}
