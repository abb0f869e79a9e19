//! # Gift Card Allocator
//!
//! Restores `total == pre_gift_card_total - gift_card_sum` after any edit,
//! while keeping the remainder at 0 or at least [`MIN_REMAINDER`].
//!
//! ## Reconciliation Passes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  naive = pre_gift_card_total - gift_card_sum                            │
//! │                                                                         │
//! │  naive < 0 ──► REDUCE: walk cards last → first                          │
//! │                  pass 1: partial (non-full) cards only                  │
//! │                  pass 2: every card                                     │
//! │                  still short ──► ConstraintUnsatisfiable                │
//! │                                                                         │
//! │  naive < 50, or a full-amount card has balance left                     │
//! │            ──► TOP UP: walk cards first → last, full-amount cards only  │
//! │                  charge min(naive, headroom) until naive == 0           │
//! │                  1..=49 left ──► PULL BACK 50 - naive (last → first,    │
//! │                                  partial cards first), else fail        │
//! │                                                                         │
//! │  otherwise  ──► accept naive                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tie-Break Order
//! Reductions always prefer partial redemptions over "use everything" cards
//! and walk the list from the most recently attached card backwards. Top-ups
//! walk forwards. Several allocations can satisfy the invariants; this order
//! picks exactly one of them, and callers rely on that choice being stable.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::draft::{DraftOrder, TotalChange};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::GiftCardAllocation;
use crate::validation::{validate_gift_card_id, validate_non_negative};
use crate::MIN_REMAINDER;

// =============================================================================
// Reconcile Target
// =============================================================================

/// What changed and must be held fixed while the allocator rebalances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "origin")]
pub enum ReconcileTarget {
    /// A gift card charge changed; `pre_gift_card_total` is held fixed.
    ///
    /// `gift_card_sum` must equal the sum of the (already edited) charges.
    GiftCardEdit { gift_card_sum: Money },

    /// Discount, tax, tip or shipping changed; the current gift card charges
    /// are the starting point and `pre_gift_card_total` takes the new value.
    Base { pre_gift_card_total: Money },
}

// =============================================================================
// Public Operations
// =============================================================================

impl DraftOrder {
    /// Attaches a redeemed gift card with nothing charged yet.
    ///
    /// The total never moves, but the minimum-remainder rule starts to apply:
    /// attaching to an order whose total is between 1 and 49 cents is
    /// rejected and the card is not kept. Charging happens through
    /// [`DraftOrder::apply_gift_card`].
    pub fn attach_gift_card(
        &mut self,
        id: &str,
        code: &str,
        amount_available: Money,
        message: Option<String>,
    ) -> CoreResult<()> {
        validate_gift_card_id(id)?;
        validate_non_negative("gift card balance", amount_available)?;

        if self.gift_cards.iter().any(|card| card.id == id) {
            return Err(CoreError::DuplicateGiftCard(id.to_string()));
        }

        let mut card = GiftCardAllocation::new(id, code, amount_available);
        card.message = message;

        self.transact(|working| {
            working.gift_cards.push(card);
            let pre_gift_card_total = working.pre_gift_card_total;
            working.reconcile(ReconcileTarget::Base {
                pre_gift_card_total,
            })
        })?;
        Ok(())
    }

    /// Charges `requested` (or the whole balance) to an attached gift card.
    ///
    /// ## Behavior
    /// - Refused when the order has nothing left to pay
    /// - `requested` is clamped to the card balance
    /// - A charge that does not move is a no-op
    /// - Otherwise the allocator rebalances with the new gift card sum
    pub fn apply_gift_card(
        &mut self,
        card_id: &str,
        requested: Money,
        use_full_amount: bool,
    ) -> CoreResult<TotalChange> {
        if !self.total.is_positive() {
            return Err(CoreError::NothingToPay {
                total_cents: self.total.cents(),
            });
        }
        validate_non_negative("requested gift card amount", requested)?;

        let index = self.gift_card_index(card_id)?;

        self.transact(|working| {
            let card = &mut working.gift_cards[index];
            let new_charged = if use_full_amount {
                card.amount_available
            } else {
                requested.min(card.amount_available)
            };
            let delta = card.charged - new_charged;
            card.use_full_amount = use_full_amount;

            if delta.is_zero() {
                debug!(card_id, "Gift card charge unchanged");
                return Ok(TotalChange::unchanged(working.total));
            }

            card.charged = new_charged;
            let target = working.gift_card_sum - delta;
            working.reconcile(ReconcileTarget::GiftCardEdit {
                gift_card_sum: target,
            })
        })
    }

    /// Detaches a gift card, rebalancing if it was paying for part of the order.
    pub fn remove_gift_card(&mut self, card_id: &str) -> CoreResult<TotalChange> {
        let index = self.gift_card_index(card_id)?;

        self.transact(|working| {
            let removed = working.gift_cards.remove(index);
            let target = working.gift_card_sum - removed.charged;
            working.reconcile(ReconcileTarget::GiftCardEdit {
                gift_card_sum: target,
            })
        })
    }

    /// Rebalances gift card charges and commits the aggregate totals.
    ///
    /// Nothing is written unless every pass succeeds.
    pub fn reconcile(&mut self, target: ReconcileTarget) -> CoreResult<TotalChange> {
        let previous = self.total;
        let mut cards = self.gift_cards.clone();

        let (pre_gift_card_total, starting_sum) = match target {
            ReconcileTarget::GiftCardEdit { gift_card_sum } => {
                let charged: Money = cards.iter().map(|card| card.charged).sum();
                if charged != gift_card_sum {
                    return Err(CoreError::InvariantViolated(format!(
                        "target gift card sum {} does not match charges {}",
                        gift_card_sum, charged
                    )));
                }
                (self.pre_gift_card_total, gift_card_sum)
            }
            ReconcileTarget::Base {
                pre_gift_card_total,
            } => (pre_gift_card_total, self.gift_card_sum),
        };

        let total = rebalance(&mut cards, pre_gift_card_total - starting_sum)?;
        let gift_card_sum: Money = cards.iter().map(|card| card.charged).sum();

        self.gift_cards = cards;
        self.pre_gift_card_total = pre_gift_card_total;
        self.gift_card_sum = gift_card_sum;
        self.total = total;

        debug!(
            order_id = %self.id,
            previous = %previous,
            total = %total,
            gift_card_sum = %gift_card_sum,
            "Reconciled draft order"
        );

        Ok(TotalChange {
            previous,
            current: total,
        })
    }

    fn gift_card_index(&self, card_id: &str) -> CoreResult<usize> {
        self.gift_cards
            .iter()
            .position(|card| card.id == card_id)
            .ok_or_else(|| CoreError::GiftCardNotFound(card_id.to_string()))
    }
}

// =============================================================================
// Rebalancing Passes
// =============================================================================

/// Adjusts `cards` in place and returns the resulting total.
fn rebalance(cards: &mut [GiftCardAllocation], naive: Money) -> CoreResult<Money> {
    if naive.is_negative() {
        let shortfall = pull_back(cards, -naive);
        if shortfall.is_positive() {
            return Err(CoreError::unsatisfiable(format!(
                "gift cards exceed the order by {} after every charge was released",
                shortfall
            )));
        }
        debug!(released = %(-naive), "Reduced over-allocated gift cards");
        return Ok(Money::zero());
    }

    if cards.is_empty() {
        return Ok(naive);
    }

    let needs_top_up = naive < MIN_REMAINDER
        || cards
            .iter()
            .any(|card| card.use_full_amount && card.charged < card.amount_available);
    if !needs_top_up {
        return Ok(naive);
    }

    let mut remaining = naive;
    for card in cards.iter_mut() {
        if remaining.is_zero() {
            break;
        }
        if !card.use_full_amount || !card.headroom().is_positive() {
            continue;
        }
        let charge = remaining.min(card.headroom());
        card.charged += charge;
        remaining -= charge;
        debug!(card_id = %card.id, charge = %charge, "Topped up full-amount gift card");
    }

    if remaining.is_negative() {
        return Err(CoreError::unsatisfiable(format!(
            "top-up left a negative total of {}",
            remaining
        )));
    }

    if remaining.is_positive() && remaining < MIN_REMAINDER {
        let needed = MIN_REMAINDER - remaining;
        let shortfall = pull_back(cards, needed);
        if shortfall.is_positive() {
            return Err(CoreError::unsatisfiable(format!(
                "remainder of {} cannot reach 0 or {}",
                remaining, MIN_REMAINDER
            )));
        }
        debug!(pulled_back = %needed, "Raised remainder to the minimum");
        return Ok(MIN_REMAINDER);
    }

    Ok(remaining)
}

/// Releases up to `amount` of charge, last card first: partial cards in one
/// pass, then every card. Returns what could not be released.
fn pull_back(cards: &mut [GiftCardAllocation], amount: Money) -> Money {
    let mut outstanding = amount;

    for full_cards_allowed in [false, true] {
        for card in cards.iter_mut().rev() {
            if !outstanding.is_positive() {
                return Money::zero();
            }
            if card.use_full_amount && !full_cards_allowed {
                continue;
            }
            let release = outstanding.min(card.charged);
            card.charged -= release;
            outstanding -= release;
        }
    }

    outstanding.max(Money::zero())
}

// =============================================================================
// Unit Tests
// =============================================================================
