//! # tillwise-core: Pure Reconciliation Logic for Draft Orders
//!
//! This crate is the **heart** of Tillwise Checkout. It keeps every derived
//! money field of an in-progress order consistent while the customer edits it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tillwise Checkout Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               tillwise-checkout (CheckoutSession)               │   │
//! │  │   Tax lookup ─ Shipping quotes ─ Cost estimates ─ Payment sync  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain method calls                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ tillwise-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   draft   │  │ allocator │  │ discount  │  │   │
//! │  │   │   Money   │  │DraftOrder │  │ reconcile │  │    tip    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │    tax    │  │  quotes   │  │  margin   │  │  pricing  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • DETERMINISTIC EDITS                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Rates, addresses, line items, gift cards, quotes
//! - [`draft`] - The `DraftOrder` aggregate and its invariants
//! - [`allocator`] - Gift card reconciliation (the multi-pass rebalance)
//! - [`discount`] - Percentage discount codes and proportional tax
//! - [`tip`] - Tip edits
//! - [`tax`] - Applying a resolved tax rate or an estimated tax amount
//! - [`quotes`] - TTL cache for shipping rates and cost estimates
//! - [`shipping`] - Selecting the active shipping rate
//! - [`margin`] - Cost estimate vs. price comparison
//! - [`pricing`] - Versioned pricing snapshot (discount table, tax fallbacks)
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tillwise_core::{DraftOrder, LineItem, Money};
//!
//! let mut order = DraftOrder::from_line_items(
//!     "store-1",
//!     vec![LineItem::new("sku-1", "Poster", Money::from_cents(2500), 2)],
//!     "pi_123",
//! );
//!
//! let change = order.add_tip(Money::from_cents(300)).unwrap();
//! assert!(change.changed());
//! assert_eq!(order.total.cents(), 5300);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod discount;
pub mod draft;
pub mod error;
pub mod margin;
pub mod money;
pub mod pricing;
pub mod quotes;
pub mod shipping;
pub mod tax;
pub mod tip;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocator::ReconcileTarget;
pub use draft::{DraftOrder, DraftTotals, TotalChange};
pub use error::{CoreError, CoreResult, ValidationError};
pub use margin::{
    compare_estimate_to_price, estimate_to_cents, EstimateCents, MarginCheck, MarginVerdict,
};
pub use money::Money;
pub use pricing::PricingSnapshot;
pub use quotes::{quote_key, CachedQuote, QuoteCache};
pub use tax::is_dynamic_tax_jurisdiction;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Smallest non-zero amount left for the card processor once gift cards apply.
///
/// ## Business Reason
/// Card processors refuse charges below 50 cents, so a gift-carded order must
/// either be fully covered (total 0) or leave at least this much.
pub const MIN_REMAINDER: Money = Money::from_cents(50);

/// Tax rate used when the live lookup fails and no cached rate exists (10.25%).
pub const DEFAULT_TAX_RATE: TaxRate = TaxRate::from_bps(1025);

/// Default validity of a cached shipping rate or cost estimate, in seconds.
pub const DEFAULT_QUOTE_TTL_SECS: i64 = 60 * 60;
