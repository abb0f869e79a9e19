//! # Cost Estimate Refresh
//!
//! Fetches what fulfilling the order will cost the store, uses its tax for
//! orders outside the CA regime, and raises a margin alert when the cost gets
//! close to (or above) the price.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RateLimiter::check(Store)  ─┐                                          │
//! │  RateLimiter::check(ClientIp)┴─ rejected ──► RateLimited (retryable)    │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  all_order_estimates[method::address] fresh? ── yes ──┐                 │
//! │            │ no                                       │                 │
//! │            ▼                                          │                 │
//! │  CostEstimateProvider::estimate                       │                 │
//! │            │                                          │                 │
//! │            ▼◄─────────────────────────────────────────┘                 │
//! │  tax, total ──► cents (oversized ──► rejected, order untouched)         │
//! │  !ca_tax ──► apply_estimated_tax(tax)                                   │
//! │  fetched ──► evict stale entries, store with now                        │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  margin_check ── Warning / Exceeded ──► dispatch_margin_alert (detached)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use tillwise_core::validation::validate_address;
use tillwise_core::{quote_key, Address, CostEstimate, DraftOrder, MarginCheck, TotalChange};

use crate::alerts::{dispatch_margin_alert, AlertHandle};
use crate::error::{CheckoutError, CheckoutResult};
use crate::providers::{bounded, AlertSink, CostEstimateProvider, MarginAlert, RateLimitKey, RateLimiter};
use crate::shipping::QuotePolicy;

/// Result of [`refresh_cost_estimate`].
#[derive(Debug)]
pub struct EstimateOutcome {
    pub estimate: CostEstimate,
    /// Total change caused by applying the estimated tax.
    pub change: TotalChange,
    pub margin: MarginCheck,
    /// Set when an alert was dispatched.
    pub alert: Option<AlertHandle>,
}

/// Provider handles the estimate refresh needs.
pub struct EstimateProviders<'a> {
    pub estimates: &'a dyn CostEstimateProvider,
    pub rate_limiter: &'a dyn RateLimiter,
    pub alerts: Arc<dyn AlertSink>,
}

/// Refreshes the cost estimate for `method` and `address` and checks the margin.
pub async fn refresh_cost_estimate(
    order: &mut DraftOrder,
    providers: EstimateProviders<'_>,
    address: &Address,
    method: &str,
    client_ip: &str,
    now: DateTime<Utc>,
    policy: QuotePolicy,
) -> CheckoutResult<EstimateOutcome> {
    validate_address(address)?;

    for key in [
        RateLimitKey::Store(order.store_id.clone()),
        RateLimitKey::ClientIp(client_ip.to_string()),
    ] {
        if let Err(rejected) = providers.rate_limiter.check(&key).await {
            info!(order_id = %order.id, key = %rejected.key, "Cost estimate rate limited");
            return Err(CheckoutError::RateLimited {
                scope: rejected.key.to_string(),
            });
        }
    }

    let key = quote_key(method, address);
    let (estimate, fetched) = match order.all_order_estimates.get_fresh(&key, now, policy.ttl_secs) {
        Some(cached) => {
            debug!(order_id = %order.id, key = %key, "Cost estimate cache hit");
            (cached.clone(), false)
        }
        None => {
            let fetched = bounded(
                "cost estimate",
                policy.timeout,
                providers.estimates.estimate(address, method, &order.line_items),
            )
            .await?;
            (fetched, true)
        }
    };

    // nothing on the order moves until both amounts converted
    let cents = estimate.to_cents()?;

    let change = if order.ca_tax {
        TotalChange::unchanged(order.total)
    } else {
        order.apply_estimated_tax(cents.tax)?
    };

    if fetched {
        let evicted = order.all_order_estimates.evict_expired(now, policy.ttl_secs);
        if evicted > 0 {
            debug!(order_id = %order.id, evicted, "Evicted stale cost estimates");
        }
        order.all_order_estimates.insert(key, estimate.clone(), now);
    }

    let margin = order.margin_check(cents.total);
    info!(
        order_id = %order.id,
        estimate = %margin.estimate,
        price = %margin.price,
        verdict = ?margin.verdict,
        "Compared cost estimate to price"
    );

    let alert = margin.verdict.needs_alert().then(|| {
        let alert = MarginAlert {
            alert_id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            store_id: order.store_id.clone(),
            verdict: margin.verdict,
            estimate: margin.estimate,
            price: margin.price,
            subject: MarginAlert::subject_for(margin.verdict, &order.id),
        };
        dispatch_margin_alert(providers.alerts.clone(), alert)
    });

    Ok(EstimateOutcome {
        estimate,
        change,
        margin,
        alert,
    })
}
