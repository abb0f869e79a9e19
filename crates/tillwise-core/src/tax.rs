//! # Tax Application
//!
//! The pure half of tax handling. Deciding which rate applies (live lookup,
//! cached fallback, default) happens in the checkout crate; this module only
//! writes the result into the order and rebalances.
//!
//! ```text
//! California address ──► apply_ca_tax_rate(rate)   tax = rate × post_discount_total
//! anywhere else       ──► clear_ca_tax()           then, once an estimate arrives,
//!                         apply_estimated_tax(tax) tax = estimate.tax
//! ```

use tracing::debug;

use crate::allocator::ReconcileTarget;
use crate::draft::{DraftOrder, TotalChange};
use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{Address, TaxRate};
use crate::validation::{validate_non_negative, validate_tax_rate_bps};

/// Whether the address falls in the jurisdiction with live rate lookups
/// (California, United States).
///
/// ```rust
/// use tillwise_core::{tax::is_dynamic_tax_jurisdiction, Address};
///
/// let mut address = Address { state: "california".into(), country: "us".into(), ..Address::default() };
/// assert!(is_dynamic_tax_jurisdiction(&address));
/// address.state = "OR".into();
/// assert!(!is_dynamic_tax_jurisdiction(&address));
/// ```
pub fn is_dynamic_tax_jurisdiction(address: &Address) -> bool {
    let state = address.state.trim();
    address.country.trim().eq_ignore_ascii_case("US")
        && (state.eq_ignore_ascii_case("CA") || state.eq_ignore_ascii_case("California"))
}

impl DraftOrder {
    /// Marks the order as taxed in California at `rate`.
    pub fn apply_ca_tax_rate(&mut self, rate: TaxRate) -> CoreResult<TotalChange> {
        validate_tax_rate_bps(rate.bps())?;

        self.transact(|working| {
            working.ca_tax = true;
            working.ca_tax_rate = rate;
            let tax = working.post_discount_total.calculate_tax(rate);
            debug!(order_id = %working.id, rate_bps = rate.bps(), tax = %tax, "Applying CA tax");
            working.set_tax(tax)
        })
    }

    /// Leaves the California regime.
    ///
    /// The CA tax already charged stays in `tax` and in every total until
    /// [`DraftOrder::apply_estimated_tax`] replaces it, so the payable amount
    /// does not move here.
    pub fn clear_ca_tax(&mut self) {
        self.ca_tax = false;
        self.ca_tax_rate = TaxRate::zero();
    }

    /// Uses the tax quoted by the cost estimate provider (non-CA orders).
    pub fn apply_estimated_tax(&mut self, tax: Money) -> CoreResult<TotalChange> {
        validate_non_negative("estimated tax", tax)?;
        if tax == self.tax {
            return Ok(TotalChange::unchanged(self.total));
        }
        self.transact(|working| working.set_tax(tax))
    }

    fn set_tax(&mut self, tax: Money) -> CoreResult<TotalChange> {
        self.tax = tax;
        self.recompute_post_tax_total();
        let pre_gift_card_total = self.post_tax_total + self.tip;
        self.reconcile(ReconcileTarget::Base {
            pre_gift_card_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineItem;

    fn order() -> DraftOrder {
        DraftOrder::from_line_items(
            "store-1",
            vec![LineItem::new("LAMP", "Lamp", Money::from_cents(4000), 1)],
            "pi_test",
        )
    }

    #[test]
    fn test_jurisdiction_matching() {
        let ca = Address {
            state: " ca ".into(),
            country: "US".into(),
            ..Address::default()
        };
        assert!(is_dynamic_tax_jurisdiction(&ca));

        let canada = Address {
            state: "CA".into(),
            country: "CA".into(),
            ..Address::default()
        };
        assert!(!is_dynamic_tax_jurisdiction(&canada));
    }

    #[test]
    fn test_apply_ca_tax_rate() {
        let mut order = order();
        let change = order.apply_ca_tax_rate(TaxRate::from_bps(1025)).unwrap();

        // 4000 × 10.25% = 410
        assert_eq!(order.tax.cents(), 410);
        assert!(order.ca_tax);
        assert_eq!(order.total.cents(), 4410);
        assert_eq!(change.previous.cents(), 4000);
        assert!(order.check_invariants().is_ok());
    }

    #[test]
    fn test_clear_ca_tax_keeps_charged_tax_until_estimate() {
        let mut order = order();
        order.apply_ca_tax_rate(TaxRate::from_bps(725)).unwrap();
        let total = order.total;

        order.clear_ca_tax();

        assert!(!order.ca_tax);
        assert!(order.ca_tax_rate.is_zero());
        assert_eq!(order.tax.cents(), 290);
        assert_eq!(order.total, total);
        assert!(order.check_invariants().is_ok());
    }

    #[test]
    fn test_apply_estimated_tax_after_leaving_ca() {
        let mut order = order();
        order.apply_ca_tax_rate(TaxRate::from_bps(725)).unwrap();
        order.clear_ca_tax();
        assert!(!order.ca_tax);
        assert!(order.ca_tax_rate.is_zero());

        let change = order.apply_estimated_tax(Money::from_cents(333)).unwrap();
        assert_eq!(order.total.cents(), 4333);
        assert!(change.changed());

        let change = order.apply_estimated_tax(Money::from_cents(333)).unwrap();
        assert!(!change.changed());
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        let mut order = order();
        assert!(order.apply_ca_tax_rate(TaxRate::from_bps(10_001)).is_err());
        assert!(order.tax.is_zero());
    }
}
