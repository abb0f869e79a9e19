//! Shipping rate selection.

use tracing::debug;

use crate::allocator::ReconcileTarget;
use crate::draft::{DraftOrder, TotalChange};
use crate::error::CoreResult;
use crate::types::{Address, ShippingRate};
use crate::validation::validate_non_negative;

impl DraftOrder {
    /// Makes `rate` the active shipping rate for `method` and `address`.
    pub fn select_shipping_rate(
        &mut self,
        method: &str,
        address: &Address,
        rate: ShippingRate,
    ) -> CoreResult<TotalChange> {
        validate_non_negative("shipping rate", rate.rate)?;

        self.transact(|working| {
            debug!(order_id = %working.id, rate_id = %rate.id, shipping = %rate.rate, "Selecting shipping rate");
            working.shipping = rate.rate;
            working.shipping_method = Some(method.to_string());
            working.shipping_address = Some(address.clone());
            working.active_shipping_rate = Some(rate);
            working.recompute_post_tax_total();
            let pre_gift_card_total = working.post_tax_total + working.tip;
            working.reconcile(ReconcileTarget::Base {
                pre_gift_card_total,
            })
        })
    }
}
