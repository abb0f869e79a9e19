//! # Checkout Session
//!
//! Owns one draft order for the length of a checkout and runs every edit
//! against it, followed by a payment intent update whenever the payable total
//! moved.
//!
//! ## Session Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CheckoutSession                                 │
//! │                                                                         │
//! │   &mut self edit ──► tillwise-core op ──► TotalChange                   │
//! │                                              │                          │
//! │                            changed? ─── no ──┴──► Ok(change)            │
//! │                               │ yes                                     │
//! │                               ▼                                         │
//! │            PaymentIntentSynchronizer::update_authorized_amount          │
//! │                               │                                         │
//! │                 ok ──► Ok(change)    error ──► SyncDivergence           │
//! │                                      (order keeps the new total)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edits take `&mut self`, so at most one edit per session is ever in flight.
//! Hosts that share a session between requests wrap it in a
//! `tokio::sync::Mutex`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use tillwise_core::{
    Address, Contact, DraftOrder, DraftTotals, Money, PricingSnapshot, TotalChange,
};

use crate::config::EngineConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::estimate::{refresh_cost_estimate, EstimateOutcome, EstimateProviders};
use crate::providers::{bounded, Providers};
use crate::shipping::{refresh_shipping_rates, QuotePolicy};
use crate::tax::{resolve_tax_rate, PostalRateCache, TaxResolution};

/// Source of the current time; replaced in tests to step past TTLs.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One customer's checkout.
pub struct CheckoutSession {
    order: DraftOrder,
    providers: Providers,
    config: Arc<EngineConfig>,
    snapshot: PricingSnapshot,
    postal_rates: PostalRateCache,
    clock: Clock,
}

impl CheckoutSession {
    /// Starts a session for an existing draft order.
    pub fn new(order: DraftOrder, providers: Providers, config: Arc<EngineConfig>) -> Self {
        let snapshot = config.pricing_snapshot();
        CheckoutSession {
            order,
            providers,
            config,
            snapshot,
            postal_rates: PostalRateCache::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the clock used for quote TTLs and timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn order(&self) -> &DraftOrder {
        &self.order
    }

    pub fn totals(&self) -> DraftTotals {
        self.order.totals()
    }

    pub fn pricing_snapshot(&self) -> &PricingSnapshot {
        &self.snapshot
    }

    // =========================================================================
    // Core Edits
    // =========================================================================

    pub async fn apply_discount(&mut self, code: &str) -> CheckoutResult<TotalChange> {
        let now = self.now();
        let change = self.order.apply_discount(code, &self.snapshot, now)?;
        self.after_edit(change).await
    }

    pub async fn remove_discount(&mut self) -> CheckoutResult<TotalChange> {
        let change = self.order.remove_discount()?;
        self.after_edit(change).await
    }

    pub async fn add_tip(&mut self, tip: Money) -> CheckoutResult<TotalChange> {
        let change = self.order.add_tip(tip)?;
        self.after_edit(change).await
    }

    pub async fn remove_tip(&mut self) -> CheckoutResult<TotalChange> {
        let change = self.order.remove_tip()?;
        self.after_edit(change).await
    }

    /// Attaches a redeemed gift card; totals do not move until it is applied.
    ///
    /// Rejected when the order total is between 1 and 49 cents.
    pub fn attach_gift_card(
        &mut self,
        id: &str,
        code: &str,
        amount_available: Money,
        message: Option<String>,
    ) -> CheckoutResult<()> {
        self.order
            .attach_gift_card(id, code, amount_available, message)?;
        self.touch();
        Ok(())
    }

    pub async fn apply_gift_card(
        &mut self,
        card_id: &str,
        requested: Money,
        use_full_amount: bool,
    ) -> CheckoutResult<TotalChange> {
        let change = self
            .order
            .apply_gift_card(card_id, requested, use_full_amount)?;
        self.after_edit(change).await
    }

    pub async fn remove_gift_card(&mut self, card_id: &str) -> CheckoutResult<TotalChange> {
        let change = self.order.remove_gift_card(card_id)?;
        self.after_edit(change).await
    }

    // =========================================================================
    // Provider-Backed Edits
    // =========================================================================

    /// Resolves the contact's tax rate and applies (or clears) CA tax.
    pub async fn update_contact(
        &mut self,
        contact: &Contact,
    ) -> CheckoutResult<(TaxResolution, TotalChange)> {
        let resolution = resolve_tax_rate(
            self.providers.tax.as_ref(),
            contact,
            &self.snapshot,
            &mut self.postal_rates,
            self.config.provider_timeout(),
        )
        .await;

        let change = if resolution.ca_tax {
            self.order.apply_ca_tax_rate(resolution.rate)?
        } else {
            self.order.clear_ca_tax();
            TotalChange::unchanged(self.order.total)
        };

        let change = self.after_edit(change).await?;
        Ok((resolution, change))
    }

    /// Refreshes the shipping rate for `method` and `address`.
    pub async fn refresh_shipping_rates(
        &mut self,
        address: &Address,
        method: &str,
    ) -> CheckoutResult<TotalChange> {
        let now = self.now();
        let policy = QuotePolicy {
            ttl_secs: self.config.cache.shipping_ttl_secs,
            timeout: self.config.provider_timeout(),
        };
        let change = refresh_shipping_rates(
            &mut self.order,
            self.providers.shipping.as_ref(),
            address,
            method,
            now,
            policy,
        )
        .await?;
        self.after_edit(change).await
    }

    /// Refreshes the cost estimate and runs the margin check.
    pub async fn refresh_cost_estimate(
        &mut self,
        address: &Address,
        method: &str,
        client_ip: &str,
    ) -> CheckoutResult<EstimateOutcome> {
        let now = self.now();
        let policy = QuotePolicy {
            ttl_secs: self.config.cache.estimate_ttl_secs,
            timeout: self.config.provider_timeout(),
        };
        let providers = EstimateProviders {
            estimates: self.providers.estimates.as_ref(),
            rate_limiter: self.providers.rate_limiter.as_ref(),
            alerts: self.providers.alerts.clone(),
        };
        let mut outcome =
            refresh_cost_estimate(&mut self.order, providers, address, method, client_ip, now, policy)
                .await?;
        outcome.change = self.after_edit(outcome.change).await?;
        Ok(outcome)
    }

    /// Pushes the current total to the payment intent regardless of changes.
    ///
    /// Used to recover from [`CheckoutError::SyncDivergence`].
    pub async fn resync_payment_intent(&mut self) -> CheckoutResult<()> {
        self.sync_payment_intent(self.order.total).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn touch(&mut self) {
        self.order.updated_at = self.now();
    }

    async fn after_edit(&mut self, change: TotalChange) -> CheckoutResult<TotalChange> {
        self.touch();
        if change.changed() {
            info!(
                order_id = %self.order.id,
                previous = %change.previous,
                current = %change.current,
                "Draft order total changed"
            );
            self.sync_payment_intent(change.current).await?;
        }
        Ok(change)
    }

    async fn sync_payment_intent(&self, total: Money) -> CheckoutResult<()> {
        let intent_id = &self.order.stripe_payment_intent_id;
        let result = bounded(
            "payment intent",
            self.config.provider_timeout(),
            self.providers.payments.update_authorized_amount(intent_id, total),
        )
        .await;

        result.map_err(|err| {
            error!(
                order_id = %self.order.id,
                intent_id = %intent_id,
                total = %total,
                error = %err,
                "Payment intent update failed"
            );
            CheckoutError::SyncDivergence {
                intent_id: intent_id.clone(),
                reason: err.to_string(),
            }
        })
    }
}
