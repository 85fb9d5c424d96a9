//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A day of 400 small sales summed in f64 drifts by cents, and the       │
//! │  daily cash declaration no longer balances.                            │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal                                          │
//! │    12.10 + 0.20 = 12.30 exactly                                        │
//! │    Rounded to two decimals only when displayed                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use solo_core::money::Money;
//!
//! let price = Money::from_cents(1050); // 10.50
//! let line = price.times(Decimal::from(3));
//! assert_eq!(line.to_string(), "31.50");
//! ```

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the restaurant's currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative values appear in expected-cash deltas
/// - **Exact arithmetic**: no rounding until display
/// - **Transparent serde**: stored as the decimal string, e.g. `"12.50"`
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► SaleLine.price (snapshot) ──► Sale.total_price      │
/// │                                                                         │
/// │  Ingredient.cost ──► product_cost() ──► KPI COGS / loss value          │
/// │                                                                         │
/// │  Employee.monthly_salary ──► SalaryLine.final_salary ──► Charge        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Creates Money from an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates Money from an integer number of cents.
    ///
    /// ## Example
    /// ```rust
    /// use solo_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Creates Money from whole currency units.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Parses an amount typed by a user or read from a CSV cell.
    ///
    /// Accepts a comma as decimal separator ("12,5").
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw.trim().replace(',', ".");
        Decimal::from_str(&cleaned).ok().map(Money)
    }

    /// Returns the exact underlying amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a (possibly fractional) quantity.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use solo_core::money::Money;
    ///
    /// let cost_per_kg = Money::from_cents(250);
    /// let used = cost_per_kg.times(Decimal::new(4, 1)); // 0.4 kg
    /// assert_eq!(used, Money::from_cents(100));
    /// ```
    #[inline]
    pub fn times(&self, quantity: Decimal) -> Self {
        Money(self.0 * quantity)
    }

    /// Keeps `percent`% of the amount (100 = unchanged, 50 = half).
    #[inline]
    pub fn percent(&self, percent: Decimal) -> Self {
        Money(self.0 * percent / Decimal::ONE_HUNDRED)
    }

    /// Divides by an integer count, exact to 28 significant digits.
    ///
    /// Returns zero when `divisor` is zero.
    pub fn divided_by(&self, divisor: Decimal) -> Self {
        if divisor.is_zero() {
            return Money::zero();
        }
        Money(self.0 / divisor)
    }

    /// Ratio of two amounts (0 when `other` is zero).
    pub fn ratio_to(&self, other: Money) -> Decimal {
        if other.is_zero() {
            Decimal::ZERO
        } else {
            self.0 / other.0
        }
    }

    /// Returns the larger of `self` and zero.
    #[inline]
    pub fn clamp_non_negative(&self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            *self
        }
    }

    /// Rounded to cents, half away from zero.
    pub fn rounded(&self) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// True when the two amounts differ by less than one cent.
    pub fn approx_eq(&self, other: Money) -> bool {
        (self.0 - other.0).abs() < Decimal::new(1, 2)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Two-decimal rendering, e.g. `"12.50"`.
///
/// The currency label ("Mad") is added by the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_units(5).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::new(Decimal::new(12345, 3)).to_string(), "12.35");
    }

    #[test]
    fn test_small_amounts_do_not_drift() {
        let total: Money = (0..1000).map(|_| Money::from_cents(10)).sum();
        assert_eq!(total, Money::from_units(100));
    }

    #[test]
    fn test_parse_accepts_comma() {
        assert_eq!(Money::parse("12,5"), Some(Money::from_cents(1250)));
        assert_eq!(Money::parse(" 8.75 "), Some(Money::from_cents(875)));
        assert_eq!(Money::parse("abc"), None);
    }

    #[test]
    fn test_percent_and_ratio() {
        let ten = Money::from_units(10);
        assert_eq!(ten.percent(Decimal::from(50)), Money::from_units(5));
        assert_eq!(ten.ratio_to(Money::zero()), Decimal::ZERO);
        assert_eq!(
            Money::from_units(18).ratio_to(Money::from_units(30)),
            Decimal::new(6, 1)
        );
    }

    #[test]
    fn test_approx_eq_within_a_cent() {
        let a = Money::new(Decimal::new(5000_004, 3));
        assert!(a.approx_eq(Money::from_units(5000)));
        assert!(!Money::from_cents(500_002).approx_eq(Money::from_units(5000)));
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_units(-3).clamp_non_negative(), Money::zero());
        assert_eq!(
            Money::from_units(3).clamp_non_negative(),
            Money::from_units(3)
        );
    }
}
