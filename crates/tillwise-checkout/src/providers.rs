//! # External Providers
//!
//! Narrow async interfaces to the services a checkout session talks to.
//! Their internals live elsewhere; a session only sees these traits.
//!
//! ## Provider Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CheckoutSession                                │
//! │                                                                         │
//! │   total changed ───────────► PaymentIntentSynchronizer                  │
//! │   CA address ──────────────► TaxRateProvider                            │
//! │   shipping quote miss ─────► ShippingQuoteProvider                      │
//! │   cost estimate miss ──────► RateLimiter ──► CostEstimateProvider       │
//! │   margin Warning/Exceeded ─► AlertSink (detached task)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call made by the session is wrapped in the configured timeout, so
//! implementations do not need their own.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tillwise_core::{Address, CostEstimate, LineItem, MarginVerdict, Money, ShippingRate};

use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Provider Error
// =============================================================================

/// Failure reported by a provider implementation.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        ProviderError(message.into())
    }
}

/// Rejection from the rate limiter.
#[derive(Debug, Clone, Error)]
#[error("rate limited: {key}")]
pub struct RateLimited {
    pub key: RateLimitKey,
}

/// What a rate limit window is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RateLimitKey {
    Store(String),
    ClientIp(String),
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitKey::Store(id) => write!(f, "store:{}", id),
            RateLimitKey::ClientIp(ip) => write!(f, "ip:{}", ip),
        }
    }
}

// =============================================================================
// Provider Traits
// =============================================================================

/// Keeps the authorized amount on the payment intent equal to the order total.
#[async_trait]
pub trait PaymentIntentSynchronizer: Send + Sync {
    async fn update_authorized_amount(
        &self,
        intent_id: &str,
        new_total: Money,
    ) -> Result<(), ProviderError>;
}

/// Live sales tax rates for the dynamic jurisdiction.
#[async_trait]
pub trait TaxRateProvider: Send + Sync {
    /// Returns the combined rate as a fraction (`0.0725`).
    async fn lookup_rate(&self, address: &Address) -> Result<f64, ProviderError>;
}

/// Shipping rate quotes for an address and a set of line items.
#[async_trait]
pub trait ShippingQuoteProvider: Send + Sync {
    async fn list_rates(
        &self,
        address: &Address,
        line_items: &[LineItem],
    ) -> Result<Vec<ShippingRate>, ProviderError>;
}

/// What fulfilling the order will cost the store.
#[async_trait]
pub trait CostEstimateProvider: Send + Sync {
    async fn estimate(
        &self,
        address: &Address,
        method: &str,
        line_items: &[LineItem],
    ) -> Result<CostEstimate, ProviderError>;
}

/// Sliding-window limiter guarding the cost estimate provider.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &RateLimitKey) -> Result<(), RateLimited>;
}

/// Receives margin alerts. Delivery is best effort.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify_margin_alert(&self, alert: MarginAlert) -> Result<(), ProviderError>;
}

// =============================================================================
// Margin Alert
// =============================================================================

/// Payload sent to the [`AlertSink`] when an estimate eats into the margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginAlert {
    pub alert_id: String,
    pub order_id: String,
    pub store_id: String,
    pub verdict: MarginVerdict,
    pub estimate: Money,
    pub price: Money,
    pub subject: String,
}

impl MarginAlert {
    /// One-line subject used by email-style sinks.
    pub fn subject_for(verdict: MarginVerdict, order_id: &str) -> String {
        match verdict {
            MarginVerdict::Exceeded => format!("Order {} costs more to fulfil than it sells for", order_id),
            MarginVerdict::Warning => format!("Order {} is within 20% of its fulfilment cost", order_id),
            MarginVerdict::Healthy => format!("Order {} margin is healthy", order_id),
        }
    }
}

// =============================================================================
// Bounded Calls
// =============================================================================

/// Awaits a provider call for at most `limit`.
///
/// Provider errors become [`CheckoutError::ExternalUnavailable`], an elapsed
/// deadline becomes [`CheckoutError::Timeout`].
pub async fn bounded<T, F>(provider: &str, limit: Duration, call: F) -> CheckoutResult<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CheckoutError::unavailable(provider, err)),
        Err(_) => Err(CheckoutError::Timeout {
            provider: provider.to_string(),
            secs: limit.as_secs(),
        }),
    }
}

// =============================================================================
// Provider Bundle
// =============================================================================

/// The set of providers one session uses.
#[derive(Clone)]
pub struct Providers {
    pub payments: Arc<dyn PaymentIntentSynchronizer>,
    pub tax: Arc<dyn TaxRateProvider>,
    pub shipping: Arc<dyn ShippingQuoteProvider>,
    pub estimates: Arc<dyn CostEstimateProvider>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub alerts: Arc<dyn AlertSink>,
}

/// Limiter that admits everything (single-tenant tools, replay).
pub struct NoLimit;

#[async_trait]
impl RateLimiter for NoLimit {
    async fn check(&self, _key: &RateLimitKey) -> Result<(), RateLimited> {
        Ok(())
    }
}
