//! # Error Types
//!
//! Domain-specific error types for confreg-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  confreg-core errors (this file)                                       │
//! │  ├── CoreError        - Domain failures (missing event, bad state)     │
//! │  ├── ValidationError  - Malformed input (codes, amounts, counts)       │
//! │  └── Inconsistency    - paid + pending > total (reported, not thrown)  │
//! │                                                                         │
//! │  confreg-db errors (separate crate)                                    │
//! │  └── DbError          - Persistence failures, propagated unchanged     │
//! │                                                                         │
//! │  confreg-engine errors                                                 │
//! │  └── EngineError      - What the request layer sees                    │
//! │                                                                         │
//! │  NOT errors: a full activity or an expired discount code. Those are    │
//! │  ordinary rejection results returned as values.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The event referenced by a registration or quote does not exist.
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// Registration cannot be found.
    #[error("Registration not found: {0}")]
    RegistrationNotFound(String),

    /// The requested activity is not offered by the event.
    #[error("Event {event_id} has no activity named '{activity}'")]
    UnknownActivity { event_id: String, activity: String },

    /// A cancelled registration was asked to change price or payment.
    ///
    /// ## When This Occurs
    /// - Organizer edits a registration after it was cancelled
    /// - Attendee tries to settle a pending amount on a cancelled registration
    #[error("Registration {0} is cancelled")]
    RegistrationCancelled(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before pricing runs.
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

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed amount, unknown zone, bad code shape).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Inconsistency
// =============================================================================

/// A payment record that breaks the ledger invariant.
///
/// Inconsistencies are logged and surfaced to the caller. They never block
/// a write and are never silently clamped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    /// `paid_amount + pending_amount` exceeds `total_price` beyond the epsilon.
    #[error("paid {paid_amount} + pending {pending_amount} exceeds total {total_price}")]
    OverCommitted {
        paid_amount: Money,
        pending_amount: Money,
        total_price: Money,
    },

    /// A stored row had `paid = true` while still carrying a pending amount.
    #[error("row marked paid while {pending_amount} is still pending")]
    PaidWithPending { pending_amount: Money },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownActivity {
            event_id: "evt-1".to_string(),
            activity: "Golf".to_string(),
        };
        assert_eq!(err.to_string(), "Event evt-1 has no activity named 'Golf'");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "discount code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(
            core_err.to_string(),
            "Validation error: discount code is required"
        );
    }

    #[test]
    fn test_inconsistency_message() {
        let report = Inconsistency::OverCommitted {
            paid_amount: Money::from_cents(50000),
            pending_amount: Money::from_cents(30000),
            total_price: Money::from_cents(70000),
        };
        assert_eq!(
            report.to_string(),
            "paid $500.00 + pending $300.00 exceeds total $700.00"
        );
    }
}
