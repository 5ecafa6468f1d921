use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct Percentage(Decimal);

impl Percentage {
    pub const ZERO: Percentage = Percentage(Decimal::ZERO);
    pub const ONE_HUNDRED: Percentage = Percentage(Decimal::ONE_HUNDRED);

    #[must_use]
    pub fn from(v: Decimal) -> Self {
        Self(v)
    }

    #[must_use]
    pub fn from_int(d: i64) -> Self {
        Percentage::from(Decimal::new(d, 0))
    }

    #[must_use]
    pub fn apply_to(&self, d: Decimal) -> Decimal {
        d * self.0 / dec!(100)
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// An amount of money as a whole number of minor currency units (cents).
///
/// Every stored result of the engine is a `Money`. Intermediate arithmetic
/// is carried as [`Decimal`] and coerced back through [`Money::round`] so
/// fractional drift never crosses an item boundary.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Converts a major-unit amount to minor units: `round(major × 100)`.
    #[must_use]
    pub fn from_major(major: Decimal) -> Self {
        Self::round(major * dec!(100))
    }

    /// Coerces a decimal minor-unit amount to a whole number of minor units,
    /// rounding half away from zero (not banker's rounding).
    #[must_use]
    pub fn round(minor: Decimal) -> Self {
        Self(
            minor
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or_default(),
        )
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// The exact decimal value in minor units, for intermediate arithmetic.
    #[must_use]
    pub fn as_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Decimal::new(self.0, 2))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}
