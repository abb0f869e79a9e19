//! # Error Types
//!
//! Domain-specific error types for tillwise-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillwise-core errors (this file)                                      │
//! │  ├── CoreError        - Reconciliation and domain failures             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tillwise-checkout errors (separate crate)                             │
//! │  └── CheckoutError    - Provider, rate limit and payment sync failures │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` is raised before anything on the draft order is written:
//! a rejected edit leaves the order exactly as it was.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Reconciliation and domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Gift card edits are refused once the order is fully paid.
    #[error("Nothing to pay: order total is {total_cents} cents")]
    NothingToPay { total_cents: i64 },

    /// The gift card is not attached to this draft order.
    #[error("Gift card not found: {0}")]
    GiftCardNotFound(String),

    /// A gift card with the same id is already attached.
    #[error("Gift card {0} is already attached to this order")]
    DuplicateGiftCard(String),

    /// The discount code is not in the pricing snapshot.
    #[error("Discount code not found: {0}")]
    DiscountNotFound(String),

    /// The discount code exists but this order does not qualify.
    #[error("Discount code {code} cannot be applied: {reason}")]
    DiscountNotEligible { code: String, reason: String },

    /// Gift card rebalancing cannot reach a valid state.
    ///
    /// ## When This Occurs
    /// - Reducing every gift card charge to zero still leaves a negative total
    /// - The remainder lands between 1 and 49 cents and there is not enough
    ///   gift card charge to pull back to reach 50
    #[error("Unable to apply gift cards correctly under current system: {reason}")]
    ConstraintUnsatisfiable { reason: String },

    /// A monetary invariant of the draft order does not hold.
    #[error("Draft order invariant violated: {0}")]
    InvariantViolated(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::ConstraintUnsatisfiable`].
    pub(crate) fn unsatisfiable(reason: impl Into<String>) -> Self {
        CoreError::ConstraintUnsatisfiable {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Monetary amount must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed decimal amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
