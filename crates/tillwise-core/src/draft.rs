//! # Draft Order
//!
//! The mutable aggregate one checkout session edits until payment.
//!
//! ## Money Flow
//! ```text
//! subtotal ──(− discount)──► post_discount_total
//!                                   │
//!                 + shipping + tax  ▼
//!                            post_tax_total
//!                                   │
//!                            + tip  ▼
//!                         pre_gift_card_total
//!                                   │
//!                − gift_card_sum    ▼
//!                                 total ──► Payment intent
//! ```
//!
//! ## Edits Are Transactions
//! Every public edit runs against a working copy of the order and only
//! replaces `self` when the whole edit, reconciliation included, succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quotes::QuoteCache;
use crate::types::{
    Address, CostEstimate, GiftCardAllocation, LineItem, OrderDiscount, ShippingRate, TaxRate,
};
use crate::MIN_REMAINDER;

// =============================================================================
// Draft Order
// =============================================================================

/// An in-progress, pre-payment order.
///
/// ## Invariants
/// - `total == pre_gift_card_total - gift_card_sum`
/// - `gift_card_sum == Σ charged`
/// - `0 ≤ charged ≤ amount_available` for every card
/// - `total == 0 || total ≥ 50` whenever gift cards are attached
/// - `post_tax_total == post_discount_total + shipping + tax`
/// - `pre_gift_card_total == post_tax_total + tip`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftOrder {
    pub id: String,
    pub store_id: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,

    pub subtotal: Money,
    /// Holds the post-discount total, not the amount taken off.
    pub order_level_discount: Money,
    pub post_discount_total: Money,
    pub shipping: Money,
    pub tax: Money,
    pub post_tax_total: Money,
    pub tip: Money,
    pub pre_gift_card_total: Money,
    pub gift_card_sum: Money,
    pub total: Money,

    #[serde(default)]
    pub order_discount: Option<OrderDiscount>,
    #[serde(default)]
    pub gift_cards: Vec<GiftCardAllocation>,

    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub active_shipping_rate: Option<ShippingRate>,
    #[serde(default)]
    pub all_shipping_rates: QuoteCache<Vec<ShippingRate>>,
    #[serde(default)]
    pub all_order_estimates: QuoteCache<CostEstimate>,

    #[serde(default)]
    pub ca_tax: bool,
    #[serde(default)]
    pub ca_tax_rate: TaxRate,

    pub stripe_payment_intent_id: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftOrder {
    /// Creates the draft at the cart → checkout transition.
    ///
    /// Shipping, tax, tip and gift cards all start at zero, so every derived
    /// total equals the subtotal.
    pub fn from_line_items(
        store_id: impl Into<String>,
        line_items: Vec<LineItem>,
        payment_intent_id: impl Into<String>,
    ) -> Self {
        let subtotal: Money = line_items.iter().map(LineItem::line_total).sum();
        let now = Utc::now();

        DraftOrder {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.into(),
            line_items,
            subtotal,
            order_level_discount: subtotal,
            post_discount_total: subtotal,
            shipping: Money::zero(),
            tax: Money::zero(),
            post_tax_total: subtotal,
            tip: Money::zero(),
            pre_gift_card_total: subtotal,
            gift_card_sum: Money::zero(),
            total: subtotal,
            order_discount: None,
            gift_cards: Vec::new(),
            shipping_method: None,
            shipping_address: None,
            active_shipping_rate: None,
            all_shipping_rates: QuoteCache::default(),
            all_order_estimates: QuoteCache::default(),
            ca_tax: false,
            ca_tax_rate: TaxRate::zero(),
            stripe_payment_intent_id: payment_intent_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Flat view of the money fields for API responses and UI bindings.
    pub fn totals(&self) -> DraftTotals {
        DraftTotals::from(self)
    }

    /// Sum of the charges on every attached gift card.
    pub fn charged_sum(&self) -> Money {
        self.gift_cards.iter().map(|card| card.charged).sum()
    }

    /// Returns the first violated monetary invariant, if any.
    pub fn check_invariants(&self) -> CoreResult<()> {
        if self.post_tax_total != self.post_discount_total + self.shipping + self.tax {
            return Err(CoreError::InvariantViolated(format!(
                "post_tax_total {} != post_discount_total {} + shipping {} + tax {}",
                self.post_tax_total, self.post_discount_total, self.shipping, self.tax
            )));
        }
        if self.pre_gift_card_total != self.post_tax_total + self.tip {
            return Err(CoreError::InvariantViolated(format!(
                "pre_gift_card_total {} != post_tax_total {} + tip {}",
                self.pre_gift_card_total, self.post_tax_total, self.tip
            )));
        }
        if self.gift_card_sum != self.charged_sum() {
            return Err(CoreError::InvariantViolated(format!(
                "gift_card_sum {} != sum of charges {}",
                self.gift_card_sum,
                self.charged_sum()
            )));
        }
        if self.total != self.pre_gift_card_total - self.gift_card_sum {
            return Err(CoreError::InvariantViolated(format!(
                "total {} != pre_gift_card_total {} - gift_card_sum {}",
                self.total, self.pre_gift_card_total, self.gift_card_sum
            )));
        }
        if let Some(card) = self
            .gift_cards
            .iter()
            .find(|card| card.charged.is_negative() || card.charged > card.amount_available)
        {
            return Err(CoreError::InvariantViolated(format!(
                "gift card {} charged {} of {}",
                card.id, card.charged, card.amount_available
            )));
        }
        if !self.gift_cards.is_empty() && !self.total.is_zero() && self.total < MIN_REMAINDER {
            return Err(CoreError::InvariantViolated(format!(
                "total {} is below the {} minimum remainder",
                self.total, MIN_REMAINDER
            )));
        }
        Ok(())
    }

    /// `post_discount_total + shipping + tax`.
    pub(crate) fn recompute_post_tax_total(&mut self) {
        self.post_tax_total = self.post_discount_total + self.shipping + self.tax;
    }

    /// Runs `edit` on a working copy and commits it only on success.
    pub(crate) fn transact<F>(&mut self, edit: F) -> CoreResult<TotalChange>
    where
        F: FnOnce(&mut DraftOrder) -> CoreResult<TotalChange>,
    {
        let mut working = self.clone();
        let change = edit(&mut working)?;
        *self = working;
        Ok(change)
    }
}

// =============================================================================
// Total Change
// =============================================================================

/// Outcome of an edit: the payable total before and after.
///
/// The payment intent must be updated exactly when [`TotalChange::changed`]
/// is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalChange {
    pub previous: Money,
    pub current: Money,
}

impl TotalChange {
    /// An edit that left the total where it was.
    pub fn unchanged(total: Money) -> Self {
        TotalChange {
            previous: total,
            current: total,
        }
    }

    /// Whether the payable total moved.
    #[inline]
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

// =============================================================================
// Draft Totals (API view)
// =============================================================================

/// Money summary of a draft order for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftTotals {
    pub subtotal_cents: i64,
    pub order_level_discount_cents: i64,
    pub post_discount_total_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub post_tax_total_cents: i64,
    pub tip_cents: i64,
    pub pre_gift_card_total_cents: i64,
    pub gift_card_sum_cents: i64,
    pub total_cents: i64,
    pub gift_card_count: usize,
}

impl From<&DraftOrder> for DraftTotals {
    fn from(order: &DraftOrder) -> Self {
        DraftTotals {
            subtotal_cents: order.subtotal.cents(),
            order_level_discount_cents: order.order_level_discount.cents(),
            post_discount_total_cents: order.post_discount_total.cents(),
            shipping_cents: order.shipping.cents(),
            tax_cents: order.tax.cents(),
            post_tax_total_cents: order.post_tax_total.cents(),
            tip_cents: order.tip.cents(),
            pre_gift_card_total_cents: order.pre_gift_card_total.cents(),
            gift_card_sum_cents: order.gift_card_sum.cents(),
            total_cents: order.total.cents(),
            gift_card_count: order.gift_cards.len(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
