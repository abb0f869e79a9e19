//! # Quote Cache
//!
//! Provider answers (shipping rates, cost estimates) stored on the draft
//! order, keyed by shipping method and canonical address.
//!
//! The cache never reads the clock: callers pass `now` and the TTL, which
//! keeps expiry checks deterministic in tests.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Cache key for a quote: `"{method}::{canonical address}"`.
///
/// ```rust
/// use tillwise_core::{quote_key, Address};
///
/// let address = Address {
///     line1: "1 Main St".into(),
///     city: "Oakland".into(),
///     state: "CA".into(),
///     postal_code: "94607".into(),
///     country: "US".into(),
///     ..Address::default()
/// };
/// assert_eq!(quote_key("ground", &address), "ground::1 main st||oakland|ca|94607|us");
/// ```
pub fn quote_key(method: &str, address: &Address) -> String {
    format!("{}::{}", method.trim().to_lowercase(), address.canonical())
}

/// A provider answer and when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedQuote<T> {
    pub fetched_at: DateTime<Utc>,
    pub value: T,
}

impl<T> CachedQuote<T> {
    /// True while `now - fetched_at` is below `ttl_secs`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        now.signed_duration_since(self.fetched_at) < Duration::seconds(ttl_secs)
    }
}

/// Keyed quotes with time-based expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteCache<T> {
    entries: HashMap<String, CachedQuote<T>>,
}

impl<T> Default for QuoteCache<T> {
    fn default() -> Self {
        QuoteCache {
            entries: HashMap::new(),
        }
    }
}

impl<T> QuoteCache<T> {
    /// Returns the cached value for `key` unless it has expired.
    pub fn get_fresh(&self, key: &str, now: DateTime<Utc>, ttl_secs: i64) -> Option<&T> {
        self.entries
            .get(key)
            .filter(|quote| quote.is_fresh(now, ttl_secs))
            .map(|quote| &quote.value)
    }

    /// Stores `value` under `key`, replacing any older quote.
    pub fn insert(&mut self, key: impl Into<String>, value: T, fetched_at: DateTime<Utc>) {
        self.entries
            .insert(key.into(), CachedQuote { fetched_at, value });
    }

    /// Drops every quote that is no longer fresh.
    pub fn evict_expired(&mut self, now: DateTime<Utc>, ttl_secs: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, quote| quote.is_fresh(now, ttl_secs));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
