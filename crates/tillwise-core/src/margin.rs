//! # Margin Comparison
//!
//! Compares what fulfilling an order costs (the provider's cost estimate)
//! against what the customer pays for it.
//!
//! ```text
//! price    = pre_gift_card_total − (tax, when CA tax was collected)
//! estimate = round_half_away(estimate.total, cents)
//!
//!   estimate ≥ price            ──► Exceeded
//!   estimate × 6 ≥ price × 5    ──► Warning   (within 20% of the price)
//!   otherwise                   ──► Healthy
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::draft::DraftOrder;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::CostEstimate;

/// Outcome of comparing a cost estimate with the order price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginVerdict {
    Healthy,
    Warning,
    Exceeded,
}

impl MarginVerdict {
    /// Whether the verdict should page someone.
    pub fn needs_alert(&self) -> bool {
        !matches!(self, MarginVerdict::Healthy)
    }
}

/// The numbers behind a [`MarginVerdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginCheck {
    pub estimate: Money,
    pub price: Money,
    pub verdict: MarginVerdict,
}

/// Converts a decimal currency amount to cents, rounding half away from zero.
///
/// Amounts too large for `i64` cents are rejected, never wrapped.
pub fn estimate_to_cents(amount: Decimal) -> Result<Money, ValidationError> {
    let too_large = || ValidationError::InvalidFormat {
        field: "estimate".to_string(),
        reason: format!("{} does not fit in cents", amount),
    };
    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(too_large)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(too_large)?;
    Ok(Money::from_cents(cents))
}

/// The parts of a [`CostEstimate`] the checkout acts on, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateCents {
    pub tax: Money,
    pub total: Money,
}

impl CostEstimate {
    /// Converts tax and total to cents; fails before anything is applied.
    pub fn to_cents(&self) -> Result<EstimateCents, ValidationError> {
        Ok(EstimateCents {
            tax: estimate_to_cents(self.tax)?,
            total: estimate_to_cents(self.total)?,
        })
    }
}

/// Classifies `estimate` against `price`.
pub fn compare_estimate_to_price(estimate: Money, price: Money) -> MarginVerdict {
    if estimate >= price {
        return MarginVerdict::Exceeded;
    }
    let estimate = i128::from(estimate.cents()) * 6;
    let price = i128::from(price.cents()) * 5;
    if estimate >= price {
        MarginVerdict::Warning
    } else {
        MarginVerdict::Healthy
    }
}

impl DraftOrder {
    /// Price the cost estimate is compared against.
    pub fn comparison_price(&self) -> Money {
        if self.ca_tax {
            self.pre_gift_card_total - self.tax
        } else {
            self.pre_gift_card_total
        }
    }

    /// Compares an estimated cost (in cents) with this order's price.
    pub fn margin_check(&self, estimate: Money) -> MarginCheck {
        let price = self.comparison_price();
        MarginCheck {
            estimate,
            price,
            verdict: compare_estimate_to_price(estimate, price),
        }
    }
}
