//! Fixed-point money.
//!
//! All ledger arithmetic runs on `Money`: a signed 64-bit integer count of
//! micro-units (six decimal places). Floats enter through [`Money::from_f64`],
//! which rounds to nearest (ties away from zero), and leave through
//! [`Money::to_f64`] at read time. Between those two points nothing is
//! rounded, so the same input sequence yields the same bits on every run.
//!
//! The operator impls assume values in range. The ledger goes through the
//! `checked_*` methods wherever a fill could overflow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Micro-units per whole unit.
pub const SCALE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_raw(raw: i64) -> Self {
        Money(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Whole units.
    pub const fn from_units(units: i64) -> Self {
        Money(units * SCALE)
    }

    pub fn from_f64(value: f64) -> Self {
        Money((value * SCALE as f64).round() as i64)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn checked_add(self, rhs: Money) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    pub fn checked_mul_lots(self, lots: i64) -> Option<Self> {
        self.0.checked_mul(lots).map(Money)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

/// Price × lots.
impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, lots: i64) -> Money {
        Money(self.0 * lots)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    /// Exact decimal rendering, always six fractional digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u64;
        write!(f, "{sign}{}.{:06}", abs / scale, abs % scale)
    }
}
