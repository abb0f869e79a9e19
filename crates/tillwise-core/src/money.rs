//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A draft order is edited many times before payment. Every edit that     │
//! │  re-derives tax or a gift card split from a float drifts a little,      │
//! │  and the authorized charge stops matching the displayed total.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every stored amount is i64 cents; ratios are basis points;           │
//! │    every division rounds half away from zero, explicitly.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillwise_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let doubled = price * 2;             // $21.98
//! let total = price + Money::from_cents(500);
//! assert_eq!(total.cents(), 1599);
//! assert_eq!(doubled.cents(), 2198);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{DiscountRate, TaxRate, BPS_SCALE};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate totals may go negative while the
///   allocator works out how much gift card charge to pull back
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: serializes as a bare integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax on this amount, rounding half away from zero.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    /// use tillwise_core::types::TaxRate;
    ///
    /// let base = Money::from_cents(1000);     // $10.00
    /// let rate = TaxRate::from_bps(825);      // 8.25%
    /// assert_eq!(base.calculate_tax(rate).cents(), 83); // 82.5 → 83
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.scale_bps(i64::from(rate.bps()))
    }

    /// Returns the discount amount for a percentage code: `round(pct × self)`.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    /// use tillwise_core::types::DiscountRate;
    ///
    /// let subtotal = Money::from_cents(10000);
    /// assert_eq!(subtotal.percent_off(DiscountRate::from_bps(1000)).cents(), 1000);
    /// ```
    pub fn percent_off(&self, rate: DiscountRate) -> Money {
        self.scale_bps(i64::from(rate.bps()))
    }

    /// Multiplies by `factor_bps / 10000`, rounding half away from zero.
    ///
    /// The factor may exceed 10000 or be negative; the proportional tax
    /// adjustment uses factors like `10000 - (new_pct - old_pct)`.
    pub fn scale_bps(&self, factor_bps: i64) -> Money {
        // i128 keeps large totals from overflowing during the multiply
        let scaled = div_round_half_away(
            i128::from(self.0) * i128::from(factor_bps),
            i128::from(BPS_SCALE),
        );
        Money(saturate(scaled))
    }
}

/// Integer division rounding half away from zero (`2.5 → 3`, `-2.5 → -3`).
///
/// `den` must be positive.
pub(crate) fn div_round_half_away(num: i128, den: i128) -> i128 {
    let quotient = num / den;
    let remainder = num % den;
    if remainder.abs() * 2 >= den {
        quotient + num.signum()
    } else {
        quotient
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// This is for logs. Frontends format for display themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(div_round_half_away(25, 10), 3);
        assert_eq!(div_round_half_away(-25, 10), -3);
        assert_eq!(div_round_half_away(24, 10), 2);
        assert_eq!(div_round_half_away(-24, 10), -2);
        assert_eq!(div_round_half_away(0, 10), 0);
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // $10.00 at 8.25% = 82.5 cents → 83
        let amount = Money::from_cents(1000);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(825)).cents(), 83);

        // $1.00 at 10.25% = 10.25 cents → 10
        let amount = Money::from_cents(100);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(1025)).cents(), 10);
    }

    #[test]
    fn test_scale_bps_proportional_tax() {
        // round(0.9 × 800) = 720
        assert_eq!(Money::from_cents(800).scale_bps(9000).cents(), 720);
        // round(1.1 × 805) = 885.5 → 886
        assert_eq!(Money::from_cents(805).scale_bps(11000).cents(), 886);
        // negative amounts round away from zero too
        assert_eq!(Money::from_cents(-5).scale_bps(5000).cents(), -3);
    }

    #[test]
    fn test_percent_off() {
        let subtotal = Money::from_cents(999);
        // 15% of 9.99 = 149.85 → 150
        assert_eq!(subtotal.percent_off(DiscountRate::from_bps(1500)).cents(), 150);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }

    #[test]
    fn test_min_max() {
        let a = Money::from_cents(30);
        let b = Money::from_cents(50);
        assert_eq!(a.min(b), a);
        assert_eq!(a.max(b), b);
    }
}
