//! # Shipping Quote Refresh
//!
//! Keeps the draft order's shipping rate current for a method and address.
//!
//! ```text
//! key = "{method}::{canonical address}"
//!
//! fresh entry in all_shipping_rates ──► select first cached rate
//! missing / older than TTL ───────────► ShippingQuoteProvider::list_rates
//!                                         ├── empty ──► ExternalUnavailable
//!                                         └── rates ──► select first, evict stale
//!                                                       entries, store with now
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use tillwise_core::validation::validate_address;
use tillwise_core::{quote_key, Address, DraftOrder, TotalChange};

use crate::error::{CheckoutError, CheckoutResult};
use crate::providers::{bounded, ShippingQuoteProvider};

/// How long shipping quotes stay valid, and how long a provider call may take.
#[derive(Debug, Clone, Copy)]
pub struct QuotePolicy {
    pub ttl_secs: i64,
    pub timeout: Duration,
}

/// Refreshes (or re-selects) the active shipping rate.
pub async fn refresh_shipping_rates(
    order: &mut DraftOrder,
    provider: &dyn ShippingQuoteProvider,
    address: &Address,
    method: &str,
    now: DateTime<Utc>,
    policy: QuotePolicy,
) -> CheckoutResult<TotalChange> {
    validate_address(address)?;
    let key = quote_key(method, address);

    if let Some(rates) = order.all_shipping_rates.get_fresh(&key, now, policy.ttl_secs) {
        let first = rates
            .first()
            .cloned()
            .ok_or_else(|| CheckoutError::unavailable("shipping quotes", "cached quote has no rates"))?;
        debug!(order_id = %order.id, key = %key, "Shipping quote cache hit");
        return Ok(order.select_shipping_rate(method, address, first)?);
    }

    let rates = bounded(
        "shipping quotes",
        policy.timeout,
        provider.list_rates(address, &order.line_items),
    )
    .await?;

    let first = rates
        .first()
        .cloned()
        .ok_or_else(|| CheckoutError::unavailable("shipping quotes", "no rates returned for address"))?;

    info!(
        order_id = %order.id,
        key = %key,
        rate_count = rates.len(),
        selected = %first.id,
        "Fetched shipping rates"
    );

    let change = order.select_shipping_rate(method, address, first)?;
    let evicted = order.all_shipping_rates.evict_expired(now, policy.ttl_secs);
    if evicted > 0 {
        debug!(order_id = %order.id, evicted, "Evicted stale shipping quotes");
    }
    order.all_shipping_rates.insert(key, rates, now);
    Ok(change)
}
