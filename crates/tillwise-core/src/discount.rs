//! # Discount Applicator
//!
//! Applies or removes a percentage-off code and carries the change through
//! tax and the gift card allocation.
//!
//! ## Edit Flow
//! ```text
//! apply_discount("SPRING10")
//!      │
//!      ├── lookup in PricingSnapshot ── unknown ──► DiscountNotFound
//!      ├── eligibility rules ────────── fail ─────► DiscountNotEligible
//!      ▼
//! post_discount_total = subtotal − round(pct × subtotal)
//! tax                 = round((1 − (new_pct − old_pct)) × tax)
//! post_tax_total      = post_discount_total + tax + shipping
//! pre_gift_card_total = post_tax_total + tip
//!      │
//!      ▼
//! reconcile(Base)  ──► TotalChange
//! ```
//!
//! Tax is adjusted from the previously computed tax rather than recomputed
//! from the new base, so switching from one code to another scales by the
//! difference between the two percentages.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::allocator::ReconcileTarget;
use crate::draft::{DraftOrder, TotalChange};
use crate::error::{CoreError, CoreResult};
use crate::pricing::PricingSnapshot;
use crate::types::{DiscountRate, OrderDiscount};
use crate::validation::{validate_discount_bps, validate_discount_code};

impl DraftOrder {
    /// Applies a discount code from the pricing snapshot.
    ///
    /// Replaces any code already on the order.
    pub fn apply_discount(
        &mut self,
        code: &str,
        snapshot: &PricingSnapshot,
        now: DateTime<Utc>,
    ) -> CoreResult<TotalChange> {
        validate_discount_code(code)?;

        let discount = snapshot
            .discount(code)
            .ok_or_else(|| CoreError::DiscountNotFound(code.trim().to_string()))?;
        validate_discount_bps(discount.rate.bps())?;
        self.check_eligibility(discount, now)?;

        let discount = discount.clone();
        self.transact(|working| {
            let old_rate = working.current_discount_rate();
            working.reprice_discount(old_rate, discount.rate);
            debug!(
                order_id = %working.id,
                code = %discount.code,
                snapshot_version = snapshot.version,
                "Applied discount code"
            );
            working.order_discount = Some(discount);
            let pre_gift_card_total = working.pre_gift_card_total;
            working.reconcile(ReconcileTarget::Base {
                pre_gift_card_total,
            })
        })
    }

    /// Removes the discount code; a no-op when none is applied.
    pub fn remove_discount(&mut self) -> CoreResult<TotalChange> {
        let Some(old_rate) = self.order_discount.as_ref().map(|d| d.rate) else {
            return Ok(TotalChange::unchanged(self.total));
        };

        self.transact(|working| {
            working.reprice_discount(old_rate, DiscountRate::zero());
            working.order_discount = None;
            let pre_gift_card_total = working.pre_gift_card_total;
            working.reconcile(ReconcileTarget::Base {
                pre_gift_card_total,
            })
        })
    }

    fn current_discount_rate(&self) -> DiscountRate {
        self.order_discount
            .as_ref()
            .map(|discount| discount.rate)
            .unwrap_or_default()
    }

    fn check_eligibility(&self, discount: &OrderDiscount, now: DateTime<Utc>) -> CoreResult<()> {
        if let Some(expires_at) = discount.rules.expires_at {
            if now >= expires_at {
                return Err(CoreError::DiscountNotEligible {
                    code: discount.code.clone(),
                    reason: format!("expired at {}", expires_at.to_rfc3339()),
                });
            }
        }
        if let Some(min_subtotal) = discount.rules.min_subtotal {
            if self.subtotal < min_subtotal {
                return Err(CoreError::DiscountNotEligible {
                    code: discount.code.clone(),
                    reason: format!("requires a subtotal of at least {}", min_subtotal),
                });
            }
        }
        Ok(())
    }

    /// Recomputes every pre-gift-card field for a move from `old` to `new`.
    fn reprice_discount(&mut self, old: DiscountRate, new: DiscountRate) {
        let discount_amount = self.subtotal.percent_off(new);
        self.post_discount_total = self.subtotal - discount_amount;
        // stores the post-discount total, not the discount amount
        self.order_level_discount = self.post_discount_total;
        self.tax = self
            .tax
            .scale_bps(DiscountRate::tax_adjustment_bps(old, new));
        self.recompute_post_tax_total();
        self.pre_gift_card_total = self.post_tax_total + self.tip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{DiscountRules, GiftCardAllocation, LineItem};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn snapshot() -> PricingSnapshot {
        PricingSnapshot::default()
            .with_version(3)
            .with_discount(OrderDiscount::percentage("SPRING10", DiscountRate::from_bps(1000)))
            .with_discount(OrderDiscount::percentage("VIP20", DiscountRate::from_bps(2000)))
            .with_discount(OrderDiscount {
                code: "BIGSPEND".into(),
                rate: DiscountRate::from_bps(1500),
                rules: DiscountRules {
                    min_subtotal: Some(Money::from_cents(20_000)),
                    expires_at: None,
                },
            })
            .with_discount(OrderDiscount {
                code: "WINTER".into(),
                rate: DiscountRate::from_bps(1000),
                rules: DiscountRules {
                    min_subtotal: None,
                    expires_at: Some(now() - Duration::days(1)),
                },
            })
    }

    /// subtotal 10000, tax 800, shipping 500.
    fn priced_order() -> DraftOrder {
        let mut order = DraftOrder::from_line_items(
            "store-1",
            vec![LineItem::new("TEE-L", "Tee", Money::from_cents(5000), 2)],
            "pi_test",
        );
        order.tax = Money::from_cents(800);
        order.shipping = Money::from_cents(500);
        order.recompute_post_tax_total();
        order.pre_gift_card_total = order.post_tax_total;
        order.total = order.pre_gift_card_total;
        order
    }

    #[test]
    fn test_ten_percent_discount_scales_tax() {
        let mut order = priced_order();
        assert_eq!(order.total.cents(), 11_300);

        let change = order.apply_discount("spring10", &snapshot(), now()).unwrap();

        assert_eq!(order.post_discount_total.cents(), 9000);
        assert_eq!(order.tax.cents(), 720);
        assert_eq!(order.post_tax_total.cents(), 10_220);
        assert_eq!(order.total.cents(), 10_220);
        assert_eq!(change.previous.cents(), 11_300);
        assert!(change.changed());
        assert!(order.check_invariants().is_ok());
    }

    #[test]
    fn test_order_level_discount_holds_post_discount_total() {
        let mut order = priced_order();
        order.apply_discount("SPRING10", &snapshot(), now()).unwrap();
        assert_eq!(order.order_level_discount, order.post_discount_total);
    }

    #[test]
    fn test_reapplying_same_code_is_idempotent() {
        let mut once = priced_order();
        once.apply_discount("SPRING10", &snapshot(), now()).unwrap();

        let mut twice = once.clone();
        let change = twice.apply_discount("SPRING10", &snapshot(), now()).unwrap();

        assert!(!change.changed());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_switching_codes_scales_tax_by_difference() {
        let mut order = priced_order();
        order.apply_discount("SPRING10", &snapshot(), now()).unwrap();
        order.apply_discount("VIP20", &snapshot(), now()).unwrap();

        assert_eq!(order.post_discount_total.cents(), 8000);
        // 720 × (1 − 0.10)
        assert_eq!(order.tax.cents(), 648);
        assert_eq!(order.total.cents(), 8000 + 648 + 500);
    }

    #[test]
    fn test_remove_discount_restores_base() {
        let mut order = priced_order();
        order.apply_discount("SPRING10", &snapshot(), now()).unwrap();

        let change = order.remove_discount().unwrap();

        assert!(order.order_discount.is_none());
        assert_eq!(order.post_discount_total.cents(), 10_000);
        // 720 × 1.10
        assert_eq!(order.tax.cents(), 792);
        assert_eq!(change.current.cents(), 10_000 + 792 + 500);
    }

    #[test]
    fn test_remove_without_discount_is_noop() {
        let mut order = priced_order();
        let before = order.clone();
        let change = order.remove_discount().unwrap();
        assert!(!change.changed());
        assert_eq!(order, before);
    }

    #[test]
    fn test_unknown_code() {
        let mut order = priced_order();
        let err = order.apply_discount("NOPE", &snapshot(), now()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountNotFound(code) if code == "NOPE"));
    }

    #[test]
    fn test_ineligible_codes() {
        let mut order = priced_order();
        let before = order.clone();

        let err = order.apply_discount("BIGSPEND", &snapshot(), now()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountNotEligible { .. }));

        let err = order.apply_discount("WINTER", &snapshot(), now()).unwrap_err();
        assert!(err.to_string().contains("expired"));

        assert_eq!(order, before);
    }

    #[test]
    fn test_discount_shrinks_gift_cards() {
        let mut order = priced_order();
        let mut card = GiftCardAllocation::new("gc1", "GIFT", Money::from_cents(20_000));
        card.charged = Money::from_cents(11_300);
        order.gift_cards.push(card);
        order.gift_card_sum = Money::from_cents(11_300);
        order.total = Money::zero();

        let change = order.apply_discount("SPRING10", &snapshot(), now()).unwrap();

        assert_eq!(order.gift_cards[0].charged.cents(), 10_220);
        assert_eq!(order.total.cents(), 0);
        assert!(!change.changed());
    }
}
