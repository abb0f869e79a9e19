//! # Checkout Error Types
//!
//! Error types for checkout orchestration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Domain      │  │   Providers     │  │    Configuration        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(..)       │  │  External-      │  │  InvalidConfig          │ │
//! │  │                 │  │   Unavailable   │  │  ConfigLoadFailed       │ │
//! │  │                 │  │  Timeout        │  │  ConfigSaveFailed       │ │
//! │  │                 │  │  RateLimited    │  │  Io                     │ │
//! │  │                 │  │  SyncDivergence │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A provider failure is never turned into a $0 amount. Either a fallback
//! with a real value is used (tax) or the error reaches the caller.

use thiserror::Error;

use tillwise_core::CoreError;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Checkout error type covering domain and provider failures.
#[derive(Debug, Error)]
pub enum CheckoutError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// The edit was rejected by the core; the draft order is unchanged.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// A provider answered with an error or an unusable result.
    #[error("{provider} unavailable: {reason}")]
    ExternalUnavailable { provider: String, reason: String },

    /// A provider did not answer in time.
    #[error("{provider} timed out after {secs} seconds")]
    Timeout { provider: String, secs: u64 },

    /// The rate limiter refused the request.
    #[error("Rate limit exceeded for {scope}")]
    RateLimited { scope: String },

    /// The draft order total moved but the payment intent was not updated.
    ///
    /// Fails the request that produced it, but not the session: the order
    /// keeps the new total and [`CheckoutSession::resync_payment_intent`]
    /// brings the intent back in line. Retryable, never fatal.
    ///
    /// [`CheckoutSession::resync_payment_intent`]: crate::CheckoutSession::resync_payment_intent
    #[error("Payment intent {intent_id} out of sync: {reason}")]
    SyncDivergence { intent_id: String, reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid engine configuration.
    #[error("Invalid checkout configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// File system error (replay input, config directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<toml::de::Error> for CheckoutError {
    fn from(err: toml::de::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CheckoutError {
    fn from(err: toml::ser::Error) -> Self {
        CheckoutError::ConfigSaveFailed(err.to_string())
    }
}

impl From<tillwise_core::ValidationError> for CheckoutError {
    fn from(err: tillwise_core::ValidationError) -> Self {
        CheckoutError::Core(CoreError::Validation(err))
    }
}

impl CheckoutError {
    /// Shorthand for [`CheckoutError::ExternalUnavailable`].
    pub fn unavailable(provider: &str, reason: impl ToString) -> Self {
        CheckoutError::ExternalUnavailable {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl CheckoutError {
    /// Returns true if repeating the same call may succeed.
    ///
    /// ## Retryable Errors
    /// - Provider outages and timeouts
    /// - Rate limiter rejections
    /// - Payment intent divergence (re-sync)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::ExternalUnavailable { .. }
                | CheckoutError::Timeout { .. }
                | CheckoutError::RateLimited { .. }
                | CheckoutError::SyncDivergence { .. }
        )
    }

    /// Returns true if the session cannot continue without operator action.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CheckoutError::Core(CoreError::InvariantViolated(_))
                | CheckoutError::InvalidConfig(_)
                | CheckoutError::ConfigLoadFailed(_)
        )
    }
}
