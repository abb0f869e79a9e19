//! # Tax Resolver
//!
//! Decides which tax rate a contact's address gets.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Address outside CA, US ──► NotApplicable (tax comes from the estimate) │
//! │                                                                         │
//! │  Address in CA, US                                                      │
//! │    1. TaxRateProvider::lookup_rate ── ok ──► Live (remembered by ZIP)   │
//! │                                      │                                  │
//! │                                    error / timeout / bad rate           │
//! │                                      ▼                                  │
//! │    2. Rate seen earlier this session for the ZIP prefix                 │
//! │    3. Configured fallback for the ZIP prefix                            │
//! │    4. Configured default (10.25%)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed lookup is never fatal: the resolution carries the error message
//! in `lookup_error` and the best fallback rate.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tillwise_core::{is_dynamic_tax_jurisdiction, Contact, PricingSnapshot, TaxRate};

use crate::error::CheckoutError;
use crate::providers::{bounded, TaxRateProvider};

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRateSource {
    Live,
    SessionCache,
    PostalFallback,
    Default,
    NotApplicable,
}

/// Outcome of [`resolve_tax_rate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxResolution {
    /// The address is in the dynamic jurisdiction.
    pub ca_tax: bool,
    pub rate: TaxRate,
    pub source: TaxRateSource,
    /// Why the live lookup was not used, when it failed.
    pub lookup_error: Option<String>,
}

impl TaxResolution {
    fn not_applicable() -> Self {
        TaxResolution {
            ca_tax: false,
            rate: TaxRate::zero(),
            source: TaxRateSource::NotApplicable,
            lookup_error: None,
        }
    }
}

/// Rates returned by live lookups, keyed by postal prefix.
#[derive(Debug, Clone, Default)]
pub struct PostalRateCache {
    rates: HashMap<String, TaxRate>,
}

impl PostalRateCache {
    pub fn record(&mut self, postal_prefix: String, rate: TaxRate) {
        self.rates.insert(postal_prefix, rate);
    }

    pub fn get(&self, postal_prefix: &str) -> Option<TaxRate> {
        self.rates.get(postal_prefix).copied()
    }
}

/// Resolves the tax rate for `contact`.
pub async fn resolve_tax_rate(
    provider: &dyn TaxRateProvider,
    contact: &Contact,
    snapshot: &PricingSnapshot,
    cache: &mut PostalRateCache,
    timeout: Duration,
) -> TaxResolution {
    let address = &contact.address;
    if !is_dynamic_tax_jurisdiction(address) {
        debug!(state = %address.state, country = %address.country, "Address outside CA tax regime");
        return TaxResolution::not_applicable();
    }

    let postal_prefix = address.postal_prefix();
    let lookup = bounded("tax rate", timeout, provider.lookup_rate(address))
        .await
        .and_then(|fraction| {
            TaxRate::from_fraction(fraction).ok_or_else(|| {
                CheckoutError::unavailable("tax rate", format!("unusable rate {}", fraction))
            })
        });

    match lookup {
        Ok(rate) => {
            debug!(postal_prefix = %postal_prefix, rate_bps = rate.bps(), "Live tax rate");
            cache.record(postal_prefix, rate);
            TaxResolution {
                ca_tax: true,
                rate,
                source: TaxRateSource::Live,
                lookup_error: None,
            }
        }
        Err(err) => {
            let (rate, source) = fallback_rate(&postal_prefix, snapshot, cache);
            warn!(
                postal_prefix = %postal_prefix,
                error = %err,
                rate_bps = rate.bps(),
                source = ?source,
                "Tax rate lookup failed, using fallback"
            );
            TaxResolution {
                ca_tax: true,
                rate,
                source,
                lookup_error: Some(err.to_string()),
            }
        }
    }
}

fn fallback_rate(
    postal_prefix: &str,
    snapshot: &PricingSnapshot,
    cache: &PostalRateCache,
) -> (TaxRate, TaxRateSource) {
    if let Some(rate) = cache.get(postal_prefix) {
        return (rate, TaxRateSource::SessionCache);
    }
    if let Some(rate) = snapshot.tax_fallback(postal_prefix) {
        return (rate, TaxRateSource::PostalFallback);
    }
    (snapshot.default_tax_rate, TaxRateSource::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use tillwise_core::Address;

    struct FixedRate(Result<f64, String>);

    #[async_trait]
    impl TaxRateProvider for FixedRate {
        async fn lookup_rate(&self, _address: &Address) -> Result<f64, ProviderError> {
            self.0.clone().map_err(ProviderError::new)
        }
    }

    fn contact(state: &str, zip: &str) -> Contact {
        Contact {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            address: Address {
                line1: "1 Market St".into(),
                line2: None,
                city: "San Francisco".into(),
                state: state.into(),
                postal_code: zip.into(),
                country: "US".into(),
            },
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_live_rate_is_recorded() {
        let mut cache = PostalRateCache::default();
        let resolution = resolve_tax_rate(
            &FixedRate(Ok(0.0725)),
            &contact("CA", "94105-1200"),
            &PricingSnapshot::default(),
            &mut cache,
            TIMEOUT,
        )
        .await;

        assert!(resolution.ca_tax);
        assert_eq!(resolution.rate.bps(), 725);
        assert_eq!(resolution.source, TaxRateSource::Live);
        assert_eq!(cache.get("94105"), Some(TaxRate::from_bps(725)));
    }

    #[tokio::test]
    async fn test_failure_uses_session_cache_then_fallback_then_default() {
        let down = FixedRate(Err("503".into()));
        let snapshot = PricingSnapshot::default().with_tax_fallback("90210", TaxRate::from_bps(950));
        let mut cache = PostalRateCache::default();
        cache.record("94105".into(), TaxRate::from_bps(863));

        let cached = resolve_tax_rate(&down, &contact("CA", "94105"), &snapshot, &mut cache, TIMEOUT).await;
        assert_eq!(cached.source, TaxRateSource::SessionCache);
        assert_eq!(cached.rate.bps(), 863);
        assert!(cached.lookup_error.as_deref().unwrap_or_default().contains("503"));

        let fallback = resolve_tax_rate(&down, &contact("california", "90210"), &snapshot, &mut cache, TIMEOUT).await;
        assert_eq!(fallback.source, TaxRateSource::PostalFallback);
        assert_eq!(fallback.rate.bps(), 950);

        let default = resolve_tax_rate(&down, &contact("CA", "95814"), &snapshot, &mut cache, TIMEOUT).await;
        assert_eq!(default.source, TaxRateSource::Default);
        assert_eq!(default.rate.bps(), 1025);
    }

    #[tokio::test]
    async fn test_unusable_rate_falls_back() {
        let mut cache = PostalRateCache::default();
        let resolution = resolve_tax_rate(
            &FixedRate(Ok(-1.0)),
            &contact("CA", "94105"),
            &PricingSnapshot::default(),
            &mut cache,
            TIMEOUT,
        )
        .await;
        assert_eq!(resolution.source, TaxRateSource::Default);
        assert!(cache.get("94105").is_none());
    }

    #[tokio::test]
    async fn test_outside_jurisdiction() {
        let mut cache = PostalRateCache::default();
        let resolution = resolve_tax_rate(
            &FixedRate(Ok(0.09)),
            &contact("NV", "89501"),
            &PricingSnapshot::default(),
            &mut cache,
            TIMEOUT,
        )
        .await;
        assert!(!resolution.ca_tax);
        assert!(resolution.rate.is_zero());
        assert_eq!(resolution.source, TaxRateSource::NotApplicable);
    }
}
