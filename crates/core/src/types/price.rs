//! Money amounts using decimal arithmetic.
//!
//! Amounts are kept at cent precision: every constructor rounds to two
//! decimal places, half away from zero. On the wire a [`Money`] is a plain
//! JSON number so that persisted carts stay readable by any consumer.

use core::fmt;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Money`] amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// NaN, infinite, or too large to represent.
    #[error("amount must be a finite number")]
    NotFinite,
    /// Below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// Not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// A non-negative amount in the store currency.
///
/// ```
/// use paperback_core::Money;
///
/// let price = Money::try_from(10.125).unwrap();
/// assert_eq!(price.to_string(), "$10.13");
/// assert_eq!(price.times(2).unwrap().to_string(), "$20.26");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal, rounding to cents.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        Ok(Self(round_cents(amount)))
    }

    /// Create an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::new(i64::try_from(cents).unwrap_or(i64::MAX), 2))
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply by a quantity, returning `None` on overflow.
    #[must_use]
    pub fn times(self, quantity: u32) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(|amount| Self(round_cents(amount)))
    }

    /// Add two amounts, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Lossy conversion for JSON output.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

fn round_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

impl TryFrom<f64> for Money {
    type Error = MoneyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        let amount = Decimal::from_f64(value).ok_or(MoneyError::NotFinite)?;
        Self::new(amount)
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> Self {
        money.to_f64()
    }
}

impl std::str::FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('$');
        let amount = trimmed
            .parse::<Decimal>()
            .map_err(|_| MoneyError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}
