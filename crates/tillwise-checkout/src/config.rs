//! # Checkout Configuration
//!
//! Configuration management for the checkout engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILLWISE_STORE_ID=store-001                                        │
//! │     TILLWISE_PROVIDER_TIMEOUT_SECS=5                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/checkout/checkout.toml (Linux)                           │
//! │     ~/Library/Application Support/com.tillwise.checkout/ (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     10s timeouts, 1h quote TTL, 10.25% default tax                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [store]
//! id = "store-001"
//! name = "Mission Street"
//!
//! [providers]
//! timeout_secs = 10
//!
//! [cache]
//! shipping_ttl_secs = 3600
//! estimate_ttl_secs = 3600
//!
//! [tax]
//! default_rate_bps = 1025
//! postal_fallbacks = { "94110" = 863, "90210" = 1025 }
//!
//! [discounts]
//! version = 4
//! [discounts.codes.SPRING10]
//! percent_bps = 1000
//! min_subtotal_cents = 2000
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tillwise_core::validation::{validate_discount_bps, validate_discount_code, validate_tax_rate_bps};
use tillwise_core::{
    DiscountRate, DiscountRules, Money, OrderDiscount, PricingSnapshot, TaxRate,
    DEFAULT_QUOTE_TTL_SECS, DEFAULT_TAX_RATE,
};

use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Store Configuration
// =============================================================================

/// The store checkout sessions run for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            id: "default-store".to_string(),
            name: "Default Store".to_string(),
        }
    }
}

// =============================================================================
// Provider Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Upper bound on any single provider call (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// How long provider quotes stay valid on a draft order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl")]
    pub shipping_ttl_secs: i64,

    #[serde(default = "default_ttl")]
    pub estimate_ttl_secs: i64,
}

fn default_ttl() -> i64 {
    DEFAULT_QUOTE_TTL_SECS
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            shipping_ttl_secs: default_ttl(),
            estimate_ttl_secs: default_ttl(),
        }
    }
}

// =============================================================================
// Tax Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Rate used when the live lookup fails and no fallback matches.
    #[serde(default = "default_tax_bps")]
    pub default_rate_bps: u32,

    /// Last known rates by 5-character postal prefix.
    #[serde(default)]
    pub postal_fallbacks: BTreeMap<String, u32>,
}

fn default_tax_bps() -> u32 {
    DEFAULT_TAX_RATE.bps()
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            default_rate_bps: default_tax_bps(),
            postal_fallbacks: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Discount Settings
// =============================================================================

/// One entry of the discount code table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCodeConfig {
    pub percent_bps: u32,

    #[serde(default)]
    pub min_subtotal_cents: Option<i64>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscountSettings {
    /// Bumped whenever the code table changes.
    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub codes: BTreeMap<String, DiscountCodeConfig>,
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete checkout engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub providers: ProviderSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub discounts: DiscountSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| CheckoutError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CheckoutResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CheckoutError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CheckoutError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| CheckoutError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CheckoutResult<()> {
        if self.store.id.trim().is_empty() {
            return Err(CheckoutError::InvalidConfig("store.id must not be empty".into()));
        }

        if self.providers.timeout_secs == 0 {
            return Err(CheckoutError::InvalidConfig(
                "providers.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.cache.shipping_ttl_secs <= 0 || self.cache.estimate_ttl_secs <= 0 {
            return Err(CheckoutError::InvalidConfig(
                "cache TTLs must be greater than 0".into(),
            ));
        }

        validate_tax_rate_bps(self.tax.default_rate_bps)
            .map_err(|e| CheckoutError::InvalidConfig(e.to_string()))?;
        for (prefix, bps) in &self.tax.postal_fallbacks {
            validate_tax_rate_bps(*bps).map_err(|e| {
                CheckoutError::InvalidConfig(format!("tax.postal_fallbacks.{}: {}", prefix, e))
            })?;
        }

        for (code, entry) in &self.discounts.codes {
            validate_discount_code(code)
                .and_then(|_| validate_discount_bps(entry.percent_bps))
                .map_err(|e| CheckoutError::InvalidConfig(format!("discounts.codes.{}: {}", code, e)))?;
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("TILLWISE_STORE_ID") {
            debug!(store_id = %id, "Overriding store ID from environment");
            self.store.id = id;
        }

        if let Ok(name) = std::env::var("TILLWISE_STORE_NAME") {
            self.store.name = name;
        }

        if let Ok(timeout) = std::env::var("TILLWISE_PROVIDER_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.providers.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid TILLWISE_PROVIDER_TIMEOUT_SECS"),
            }
        }

        if let Ok(ttl) = std::env::var("TILLWISE_QUOTE_TTL_SECS") {
            if let Ok(secs) = ttl.parse::<i64>() {
                debug!(ttl_secs = secs, "Overriding quote TTLs from environment");
                self.cache.shipping_ttl_secs = secs;
                self.cache.estimate_ttl_secs = secs;
            }
        }

        if let Ok(bps) = std::env::var("TILLWISE_DEFAULT_TAX_BPS") {
            if let Ok(bps) = bps.parse::<u32>() {
                self.tax.default_rate_bps = bps;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tillwise", "checkout")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn store_id(&self) -> &str {
        &self.store.id
    }

    /// Provider call timeout.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.timeout_secs)
    }

    /// Builds the pricing snapshot edits run against.
    pub fn pricing_snapshot(&self) -> PricingSnapshot {
        let mut snapshot = PricingSnapshot::default()
            .with_version(self.discounts.version)
            .with_default_tax_rate(TaxRate::from_bps(self.tax.default_rate_bps));

        for (prefix, bps) in &self.tax.postal_fallbacks {
            snapshot = snapshot.with_tax_fallback(prefix.clone(), TaxRate::from_bps(*bps));
        }

        for (code, entry) in &self.discounts.codes {
            snapshot = snapshot.with_discount(OrderDiscount {
                code: code.clone(),
                rate: DiscountRate::from_bps(entry.percent_bps),
                rules: DiscountRules {
                    min_subtotal: entry.min_subtotal_cents.map(Money::from_cents),
                    expires_at: entry.expires_at,
                },
            });
        }

        snapshot
    }
}
