//! # Tip Manager
//!
//! A tip sits between the post-tax total and the gift cards:
//! `pre_gift_card_total = post_tax_total + tip`. Lowering it can leave the gift
//! cards covering more than the order, in which case the allocator releases
//! charge (last card first, partial redemptions before full ones).

use tracing::debug;

use crate::allocator::ReconcileTarget;
use crate::draft::{DraftOrder, TotalChange};
use crate::error::CoreResult;
use crate::money::Money;
use crate::validation::validate_non_negative;

impl DraftOrder {
    /// Sets the tip, replacing any previous amount.
    pub fn add_tip(&mut self, tip: Money) -> CoreResult<TotalChange> {
        validate_non_negative("tip", tip)?;
        if tip == self.tip {
            return Ok(TotalChange::unchanged(self.total));
        }
        self.set_tip(tip)
    }

    /// Clears the tip; a no-op when no tip was added.
    pub fn remove_tip(&mut self) -> CoreResult<TotalChange> {
        if self.tip.is_zero() {
            return Ok(TotalChange::unchanged(self.total));
        }
        self.set_tip(Money::zero())
    }

    fn set_tip(&mut self, tip: Money) -> CoreResult<TotalChange> {
        self.transact(|working| {
            debug!(order_id = %working.id, from = %working.tip, to = %tip, "Updating tip");
            working.tip = tip;
            let pre_gift_card_total = working.post_tax_total + tip;
            working.reconcile(ReconcileTarget::Base {
                pre_gift_card_total,
            })
        })
    }
}
