//! # Domain Types
//!
//! Value types the draft order is built from.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    TaxRate      │   │  DiscountRate   │   │ GiftCardAllocation  │   │
//! │  │  bps (u32)      │   │  bps (u32)      │   │  amount_available   │   │
//! │  │  1025 = 10.25%  │   │  1000 = 10%     │   │  charged            │   │
//! │  └─────────────────┘   └─────────────────┘   │  use_full_amount    │   │
//! │                                              └─────────────────────┘   │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Address      │   │   LineItem      │   │ ShippingRate /      │   │
//! │  │  canonical key  │   │  price × qty    │   │ CostEstimate        │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Basis points in one whole (100%).
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1025 bps = 10.25% (the fallback California rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a fraction as returned by rate APIs (`0.0725`).
    ///
    /// Returns `None` for negative, non-finite or absurd (> 100%) values.
    pub fn from_fraction(rate: f64) -> Option<Self> {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return None;
        }
        Some(TaxRate((rate * BPS_SCALE as f64).round() as u32))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Percentage-off rate of a discount code, in basis points (1000 = 10% off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a discount rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// No discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    /// Factor (in bps) applied to a previously computed tax when the discount
    /// moves from `old` to `new`: `1 − (new − old)`.
    ///
    /// ```rust
    /// use tillwise_core::types::DiscountRate;
    ///
    /// let none = DiscountRate::zero();
    /// let ten = DiscountRate::from_bps(1000);
    /// assert_eq!(DiscountRate::tax_adjustment_bps(none, ten), 9000);
    /// assert_eq!(DiscountRate::tax_adjustment_bps(ten, none), 11000);
    /// ```
    pub fn tax_adjustment_bps(old: DiscountRate, new: DiscountRate) -> i64 {
        BPS_SCALE - (i64::from(new.0) - i64::from(old.0))
    }
}

// =============================================================================
// Addresses & Contacts
// =============================================================================

/// A shipping address as entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    /// State or province code (`CA`) or name (`California`).
    pub state: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

impl Address {
    /// Canonical form used in cache keys: every field trimmed, lower-cased
    /// and joined with `|`, so cosmetic edits do not defeat the cache.
    pub fn canonical(&self) -> String {
        [
            self.line1.as_str(),
            self.line2.as_deref().unwrap_or(""),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .iter()
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
    }

    /// First five characters of the postal code (ZIP without the +4 suffix).
    pub fn postal_prefix(&self) -> String {
        self.postal_code.trim().chars().take(5).collect()
    }
}

/// Customer contact details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub address: Address,
}

// =============================================================================
// Line Items
// =============================================================================

/// A priced line on the draft order.
///
/// Prices are frozen when the cart turns into a draft; the catalog is only a
/// read source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// Shipping weight of one unit, in grams.
    #[serde(default)]
    pub weight_grams: u32,
}

impl LineItem {
    /// Creates a line item with no weight information.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        LineItem {
            sku: sku.into(),
            name: name.into(),
            unit_price,
            quantity,
            weight_grams: 0,
        }
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

// =============================================================================
// Discounts
// =============================================================================

/// Rules that decide whether a discount code applies to an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscountRules {
    /// Minimum subtotal before the code can be used.
    #[serde(default)]
    pub min_subtotal: Option<Money>,
    /// Instant after which the code is no longer accepted.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A percentage-off discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDiscount {
    pub code: String,
    pub rate: DiscountRate,
    #[serde(default)]
    pub rules: DiscountRules,
}

impl OrderDiscount {
    /// Creates an unrestricted discount code.
    pub fn percentage(code: impl Into<String>, rate: DiscountRate) -> Self {
        OrderDiscount {
            code: code.into(),
            rate,
            rules: DiscountRules::default(),
        }
    }
}

// =============================================================================
// Gift Cards
// =============================================================================

/// A gift card redeemed against the draft order.
///
/// ## Invariant
/// `0 ≤ charged ≤ amount_available` after every successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GiftCardAllocation {
    pub id: String,
    pub code: String,
    /// Remaining balance on the card when it was attached.
    pub amount_available: Money,
    /// Amount of this order paid by the card.
    pub charged: Money,
    /// The customer asked to spend the whole balance, as far as the order allows.
    pub use_full_amount: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl GiftCardAllocation {
    /// Creates an attached but not yet charged card.
    pub fn new(id: impl Into<String>, code: impl Into<String>, amount_available: Money) -> Self {
        GiftCardAllocation {
            id: id.into(),
            code: code.into(),
            amount_available,
            charged: Money::zero(),
            use_full_amount: false,
            message: None,
        }
    }

    /// Balance still available on the card for this order.
    #[inline]
    pub fn headroom(&self) -> Money {
        self.amount_available - self.charged
    }
}

// =============================================================================
// Provider Quotes
// =============================================================================

/// A shipping rate returned by the rate-quote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: String,
    pub name: String,
    pub rate: Money,
    #[serde(default)]
    pub min_delivery_days: Option<u32>,
    #[serde(default)]
    pub max_delivery_days: Option<u32>,
}

/// What fulfilling the order costs the store, as quoted by the cost-estimate
/// provider. Amounts are decimal currency units (`"12.34"`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostEstimate {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

// =============================================================================
// Unit Tests
// =============================================================================
