//! # Pricing Snapshot
//!
//! Read-only pricing settings an edit runs against: the discount code table,
//! per-postal-prefix tax fallbacks and the default tax rate.
//!
//! A snapshot is built once (usually from configuration) and handed to each
//! edit by reference. Bumping `version` lets a session tell which settings a
//! draft was priced with.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{OrderDiscount, TaxRate};
use crate::DEFAULT_TAX_RATE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub version: u64,
    /// Discount codes, keyed by upper-cased code.
    #[serde(default)]
    pub discounts: HashMap<String, OrderDiscount>,
    /// Fallback tax rates, keyed by 5-character postal prefix.
    #[serde(default)]
    pub tax_fallbacks: HashMap<String, TaxRate>,
    pub default_tax_rate: TaxRate,
}

impl Default for PricingSnapshot {
    fn default() -> Self {
        PricingSnapshot {
            version: 0,
            discounts: HashMap::new(),
            tax_fallbacks: HashMap::new(),
            default_tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

impl PricingSnapshot {
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Adds (or replaces) a discount code.
    pub fn with_discount(mut self, discount: OrderDiscount) -> Self {
        self.discounts
            .insert(normalize_code(&discount.code), discount);
        self
    }

    /// Adds a fallback rate for a postal prefix.
    pub fn with_tax_fallback(mut self, postal_prefix: impl Into<String>, rate: TaxRate) -> Self {
        self.tax_fallbacks.insert(postal_prefix.into(), rate);
        self
    }

    pub fn with_default_tax_rate(mut self, rate: TaxRate) -> Self {
        self.default_tax_rate = rate;
        self
    }

    /// Looks up a discount code, ignoring case and surrounding whitespace.
    pub fn discount(&self, code: &str) -> Option<&OrderDiscount> {
        self.discounts.get(&normalize_code(code))
    }

    /// Fallback rate for a postal prefix, if one is configured.
    pub fn tax_fallback(&self, postal_prefix: &str) -> Option<TaxRate> {
        self.tax_fallbacks.get(postal_prefix).copied()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
