//! # tillwise-checkout: Checkout Orchestration for Tillwise
//!
//! Runs a customer's checkout against one draft order: applies edits through
//! `tillwise-core`, talks to tax, shipping, cost estimate and payment
//! providers, and keeps the payment intent in step with the order total.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Session Architecture                      │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 CheckoutSession (session.rs)                     │  │
//! │  │                                                                  │  │
//! │  │  One per checkout; &mut self edits; payment intent sync         │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Tax resolver   │  │ Shipping       │  │ Cost estimate          │    │
//! │  │ (tax.rs)       │  │ (shipping.rs)  │  │ (estimate.rs)          │    │
//! │  │                │  │                │  │                        │    │
//! │  │ live rate,     │  │ TTL cached     │  │ rate limited, margin   │    │
//! │  │ ZIP fallbacks  │  │ quotes         │  │ check, alerts.rs       │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  providers.rs: async traits + timeouts   config.rs: checkout.toml      │
//! │  telemetry.rs: tracing bootstrap         error.rs: CheckoutError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tillwise_checkout::{CheckoutSession, EngineConfig};
//!
//! let config = Arc::new(EngineConfig::load_or_default(None));
//! let mut session = CheckoutSession::new(order, providers, config);
//!
//! session.apply_discount("SPRING10").await?;
//! session.attach_gift_card("gc_1", "HOLIDAY", Money::from_cents(2500), None)?;
//! session.apply_gift_card("gc_1", Money::zero(), true).await?;
//! println!("Due: {}", session.order().total);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod config;
pub mod error;
pub mod estimate;
pub mod providers;
pub mod session;
pub mod shipping;
pub mod tax;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerts::{dispatch_margin_alert, AlertHandle};
pub use config::EngineConfig;
pub use error::{CheckoutError, CheckoutResult};
pub use estimate::EstimateOutcome;
pub use providers::{
    AlertSink, CostEstimateProvider, MarginAlert, PaymentIntentSynchronizer, ProviderError,
    Providers, RateLimitKey, RateLimited, RateLimiter, ShippingQuoteProvider, TaxRateProvider,
};
pub use session::{CheckoutSession, Clock};
pub use tax::{TaxRateSource, TaxResolution};
pub use telemetry::init_tracing;
