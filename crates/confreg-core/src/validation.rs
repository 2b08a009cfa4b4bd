//! # Validation Module
//!
//! Input checks that run before any pricing or persistence.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request layer                                                │
//! │  └── Deserialization, required fields                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Discount code shape (normalized before lookup)                    │
//! │  └── Child counts, tier prices, discount values                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE (event_id, code)                                           │
//! │  └── CHECK (used_count <= usage_limit)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An expired or used-up discount code is NOT a validation error. It is a
//! normal rejection, see [`crate::discount`].

use crate::error::ValidationError;
use crate::money::{Money, BPS_PER_WHOLE};
use crate::types::{DiscountType, PriceTier};
use crate::{MAX_CHILDREN_PER_REGISTRATION, MAX_DISCOUNT_CODE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Discount Codes
// =============================================================================

/// Normalizes a discount code as typed by an attendee.
///
/// ## Rules
/// - Surrounding whitespace is dropped and letters are upper-cased
/// - Must not be empty
/// - At most 32 characters
/// - Only letters, digits, hyphens and underscores
///
/// ## Example
/// ```rust
/// use confreg_core::validation::normalize_code;
///
/// assert_eq!(normalize_code("  early-bird ").unwrap(), "EARLY-BIRD");
/// assert!(normalize_code("").is_err());
/// assert!(normalize_code("SAVE 20").is_err());
/// ```
pub fn normalize_code(raw: &str) -> ValidationResult<String> {
    let code = raw.trim().to_ascii_uppercase();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "discount code".to_string(),
        });
    }

    if code.chars().count() > MAX_DISCOUNT_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "discount code".to_string(),
            max: MAX_DISCOUNT_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "discount code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code)
}

/// Validates a discount value for its type.
///
/// ## Rules
/// - Percentage: 1 to 10000 basis points (0.01% to 100%)
/// - Fixed: a positive number of cents
pub fn validate_discount_value(discount_type: DiscountType, value: i64) -> ValidationResult<()> {
    match discount_type {
        DiscountType::Percentage if !(1..=BPS_PER_WHOLE).contains(&value) => {
            Err(ValidationError::OutOfRange {
                field: "discount value".to_string(),
                min: 1,
                max: BPS_PER_WHOLE,
            })
        }
        DiscountType::Fixed if value <= 0 => Err(ValidationError::MustBePositive {
            field: "discount value".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the number of child tickets on a registration.
pub fn validate_child_count(count: u32) -> ValidationResult<()> {
    if count > MAX_CHILDREN_PER_REGISTRATION {
        return Err(ValidationError::OutOfRange {
            field: "child count".to_string(),
            min: 0,
            max: MAX_CHILDREN_PER_REGISTRATION as i64,
        });
    }

    Ok(())
}

/// Validates a tier list before it is stored.
///
/// ## Rules
/// - Labels must not be empty
/// - Prices must be non-negative
pub fn validate_price_tiers(tiers: &[PriceTier]) -> ValidationResult<()> {
    for tier in tiers {
        if tier.label.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "tier label".to_string(),
            });
        }
        validate_price(tier.price)?;
    }

    Ok(())
}

/// Validates a price. Zero is allowed (free tickets).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("save20").unwrap(), "SAVE20");
        assert_eq!(normalize_code(" VIP_2025 ").unwrap(), "VIP_2025");

        assert!(matches!(
            normalize_code("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            normalize_code(&"A".repeat(33)),
            Err(ValidationError::TooLong { max: 32, .. })
        ));
        assert!(matches!(
            normalize_code("50%OFF"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_discount_value() {
        assert!(validate_discount_value(DiscountType::Percentage, 2000).is_ok());
        assert!(validate_discount_value(DiscountType::Percentage, 10_000).is_ok());
        assert!(validate_discount_value(DiscountType::Percentage, 10_001).is_err());
        assert!(validate_discount_value(DiscountType::Percentage, 0).is_err());
        assert!(validate_discount_value(DiscountType::Fixed, 5000).is_ok());
        assert!(validate_discount_value(DiscountType::Fixed, 0).is_err());
    }

    #[test]
    fn test_validate_child_count() {
        assert!(validate_child_count(0).is_ok());
        assert!(validate_child_count(MAX_CHILDREN_PER_REGISTRATION).is_ok());
        assert!(validate_child_count(MAX_CHILDREN_PER_REGISTRATION + 1).is_err());
    }

    #[test]
    fn test_validate_price_tiers() {
        let ok = vec![PriceTier::open("Regular", Money::from_major(500))];
        assert!(validate_price_tiers(&ok).is_ok());

        let unlabeled = vec![PriceTier::open(" ", Money::from_major(500))];
        assert!(validate_price_tiers(&unlabeled).is_err());

        let negative = vec![PriceTier::open("Refund", Money::from_cents(-1))];
        assert!(validate_price_tiers(&negative).is_err());
    }
}
