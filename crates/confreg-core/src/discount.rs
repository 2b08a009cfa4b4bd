//! # Discount Validator
//!
//! Side-effect-free checks on a discount code, plus the arithmetic of
//! applying one to a subtotal.
//!
//! ## Validation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (a) expiry_date set  →  expiry_date >= now        else  Expired        │
//! │  (b) usage_limit set  →  used_count < usage_limit  else  LimitReached   │
//! │                                                                         │
//! │  validate() NEVER consumes a use. used_count is bumped by the storage   │
//! │  layer, once, after a registration that newly attaches the code has    │
//! │  been written.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, BPS_PER_WHOLE};
use crate::types::{DiscountCode, DiscountType};

/// Why a code cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRejection {
    NotFound,
    WrongEvent,
    Expired,
    UsageLimitReached,
}

impl DiscountRejection {
    /// User-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            DiscountRejection::NotFound => "not found",
            DiscountRejection::WrongEvent => "not valid for this event",
            DiscountRejection::Expired => "expired",
            DiscountRejection::UsageLimitReached => "usage limit reached",
        }
    }
}

impl std::fmt::Display for DiscountRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of [`DiscountCode::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountValidation {
    pub valid: bool,
    pub error: Option<DiscountRejection>,
}

impl DiscountValidation {
    fn ok() -> Self {
        DiscountValidation {
            valid: true,
            error: None,
        }
    }

    fn rejected(reason: DiscountRejection) -> Self {
        DiscountValidation {
            valid: false,
            error: Some(reason),
        }
    }

    /// Converts into a `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<(), DiscountRejection> {
        match self.error {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

impl DiscountCode {
    /// Checks expiry and usage limit. Does not modify `used_count`.
    pub fn validate(&self, now: DateTime<Utc>) -> DiscountValidation {
        if let Some(expiry) = self.expiry_date {
            if expiry < now {
                return DiscountValidation::rejected(DiscountRejection::Expired);
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return DiscountValidation::rejected(DiscountRejection::UsageLimitReached);
            }
        }
        DiscountValidation::ok()
    }

    /// Like [`validate`](Self::validate), but also rejects codes that belong
    /// to another event.
    pub fn validate_for_event(&self, event_id: &str, now: DateTime<Utc>) -> DiscountValidation {
        if self.event_id != event_id {
            return DiscountValidation::rejected(DiscountRejection::WrongEvent);
        }
        self.validate(now)
    }

    /// The amount this code takes off `subtotal`.
    ///
    /// Never more than the subtotal, so the discounted total floors at zero.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        if !subtotal.is_positive() {
            return Money::zero();
        }
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                subtotal.percentage(self.discount_value.clamp(0, BPS_PER_WHOLE))
            }
            DiscountType::Fixed => Money::from_cents(self.discount_value.max(0)),
        };
        raw.min(subtotal)
    }

    /// A fixed-amount stand-in for a code whose row no longer exists.
    ///
    /// Used when re-pricing a registration that recorded `discount_amount`
    /// against a code that has since been deleted: the recorded amount keeps
    /// applying instead of silently disappearing.
    pub fn fixed_snapshot(event_id: &str, code: &str, amount: Money) -> Self {
        DiscountCode {
            id: String::new(),
            event_id: event_id.to_string(),
            code: code.to_string(),
            discount_type: DiscountType::Fixed,
            discount_value: amount.cents(),
            expiry_date: None,
            usage_limit: None,
            used_count: 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code(discount_type: DiscountType, value: i64) -> DiscountCode {
        DiscountCode {
            id: "dc-1".to_string(),
            event_id: "evt-1".to_string(),
            code: "SAVE".to_string(),
            discount_type,
            discount_value: value,
            expiry_date: None,
            usage_limit: None,
            used_count: 0,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let c = code(DiscountType::Percentage, 2000);
        assert_eq!(c.discount_for(Money::from_major(500)), Money::from_major(100));
    }

    #[test]
    fn test_fixed_discount() {
        let c = code(DiscountType::Fixed, 5000);
        assert_eq!(c.discount_for(Money::from_major(500)), Money::from_major(50));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let c = code(DiscountType::Fixed, 5000);
        assert_eq!(c.discount_for(Money::from_major(30)), Money::from_major(30));
        assert_eq!(c.discount_for(Money::zero()), Money::zero());
    }

    #[test]
    fn test_percentage_capped_at_whole() {
        let c = code(DiscountType::Percentage, 15_000);
        assert_eq!(c.discount_for(Money::from_major(80)), Money::from_major(80));
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let now = Utc::now();
        let mut c = code(DiscountType::Fixed, 100);
        c.expiry_date = Some(now);
        assert!(c.validate(now).valid);

        c.expiry_date = Some(now - Duration::seconds(1));
        let result = c.validate(now);
        assert!(!result.valid);
        assert_eq!(result.error, Some(DiscountRejection::Expired));
    }

    #[test]
    fn test_usage_limit_reached_after_one_use() {
        let now = Utc::now();
        let mut c = code(DiscountType::Fixed, 100);
        c.usage_limit = Some(1);
        assert!(c.validate(now).valid);

        c.used_count = 1;
        assert_eq!(
            c.validate(now).into_result(),
            Err(DiscountRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_validate_has_no_side_effects() {
        let now = Utc::now();
        let mut c = code(DiscountType::Fixed, 100);
        c.usage_limit = Some(1);
        let _ = c.validate(now);
        let _ = c.validate(now);
        assert_eq!(c.used_count, 0);
    }

    #[test]
    fn test_wrong_event() {
        let c = code(DiscountType::Fixed, 100);
        assert_eq!(
            c.validate_for_event("evt-2", Utc::now()).error,
            Some(DiscountRejection::WrongEvent)
        );
    }

    #[test]
    fn test_fixed_snapshot() {
        let c = DiscountCode::fixed_snapshot("evt-1", "GONE", Money::from_major(75));
        assert_eq!(c.discount_for(Money::from_major(500)), Money::from_major(75));
        assert!(c.validate(Utc::now()).valid);
    }
}
