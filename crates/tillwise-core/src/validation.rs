//! # Validation Module
//!
//! Input checks run before an edit touches the draft order.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront                                                    │
//! │  └── Form checks, immediate feedback                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Core edit (THIS MODULE)                                       │
//! │  ├── Negative cents, blank codes, malformed addresses                   │
//! │  └── Runs before the working copy is touched                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Allocator                                                     │
//! │  └── Invariants that depend on the whole order                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillwise_core::validation::{validate_discount_code, validate_non_negative};
//! use tillwise_core::Money;
//!
//! validate_discount_code("SPRING10").unwrap();
//! assert!(validate_non_negative("tip", Money::from_cents(-1)).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Address, BPS_SCALE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted discount code or gift card id.
const MAX_CODE_LEN: usize = 64;

// =============================================================================
// Money Validators
// =============================================================================

/// Rejects negative amounts. Zero is allowed (clearing a tip, a $0 charge).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if i64::from(bps) > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }
    Ok(())
}

/// Validates a discount percentage in basis points (0% to 100%).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if i64::from(bps) > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }
    Ok(())
}

// =============================================================================
// Code Validators
// =============================================================================

/// Validates a discount code.
///
/// ## Rules
/// - Must not be blank
/// - At most 64 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use tillwise_core::validation::validate_discount_code;
///
/// assert!(validate_discount_code("SPRING-10").is_ok());
/// assert!(validate_discount_code("  ").is_err());
/// assert!(validate_discount_code("10% OFF").is_err());
/// ```
pub fn validate_discount_code(code: &str) -> ValidationResult<()> {
    validate_code("discount code", code)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "discount code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }
    Ok(())
}

/// Validates a gift card id (non-blank, bounded length).
pub fn validate_gift_card_id(id: &str) -> ValidationResult<()> {
    validate_code("gift card id", id)
}

fn validate_code(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Address Validators
// =============================================================================

/// Validates the parts of an address the providers key on.
///
/// ## Rules
/// - `line1`, `city`, `postal_code` and `country` are required
/// - `country` is a two-letter code
pub fn validate_address(address: &Address) -> ValidationResult<()> {
    for (field, value) in [
        ("line1", &address.line1),
        ("city", &address.city),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }
    }

    let country = address.country.trim();
    if country.chars().count() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "country".to_string(),
            reason: "must be a two-letter country code".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
