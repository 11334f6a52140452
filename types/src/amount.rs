//! Currency amount, stored in raw units.
//!
//! Amounts are fixed-point u128 values to avoid floating-point errors.
//! The smallest unit is 1 raw; voting weight is measured in the same unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// An amount of currency (or delegated voting weight) in raw units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub const fn raw(value: u128) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `self * bps / 10_000` without overflowing on supply-scale values.
    ///
    /// Used for quorum and threshold fractions expressed in basis points.
    pub fn multiply_bps(self, bps: u32) -> Self {
        if self.0 > u128::MAX / 10_000 {
            Self(self.0 / 10_000 * bps as u128)
        } else {
            Self(self.0 * bps as u128 / 10_000)
        }
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc.saturating_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} raw", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_arithmetic() {
        let a = Amount::raw(100);
        let b = Amount::raw(30);
        assert_eq!(a.checked_add(b), Some(Amount::raw(130)));
        assert_eq!(a.checked_sub(b), Some(Amount::raw(70)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount::MAX.checked_add(Amount::raw(1)), None);
    }

    #[test]
    fn bps_fraction() {
        // 67% of 10_000 = 6_700
        assert_eq!(Amount::raw(10_000).multiply_bps(6_700), Amount::raw(6_700));
        assert_eq!(Amount::ZERO.multiply_bps(6_700), Amount::ZERO);
    }

    #[test]
    fn bps_fraction_of_max_supply() {
        let delta = Amount::MAX.multiply_bps(6_700);
        // Roughly 67% of u128::MAX; the divide-first path loses at most
        // 9_999 raw of precision.
        assert!(delta.value() > u128::MAX / 2);
        assert!(delta.value() < u128::MAX / 10_000 * 6_701);
    }

    #[test]
    fn sum_saturates() {
        let total: Amount = [Amount::MAX, Amount::raw(5)].into_iter().sum();
        assert_eq!(total, Amount::MAX);
    }
}
