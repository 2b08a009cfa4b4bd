//! # Request Outcomes
//!
//! A full activity or an unusable discount code is an ordinary answer to a
//! registration request, not a failure. Operations that can refuse return
//! [`Outcome`] inside their `Result`; errors stay reserved for missing
//! records, bad input, and storage faults.
//!
//! ```text
//! EngineResult<Outcome<T>>
//!   Err(EngineError)            storage / validation / not found
//!   Ok(Rejected(Rejection))     activity full, discount invalid
//!   Ok(Accepted(T))             done
//! ```

use serde::Serialize;

use confreg_core::DiscountRejection;

/// A user-facing refusal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Every seat in the activity is held by a committed registration.
    ActivityFull { activity: String, seat_limit: u32 },

    /// The discount code cannot be applied.
    DiscountInvalid {
        code: String,
        reason: DiscountRejection,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::ActivityFull {
                activity,
                seat_limit,
            } => write!(f, "{activity} is full ({seat_limit} seats)"),
            Rejection::DiscountInvalid { code, reason } => {
                write!(f, "Discount code {code} is {reason}")
            }
        }
    }
}

/// Either the operation's result or the reason it was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Accepted(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// The accepted value, if any.
    pub fn accepted(self) -> Option<T> {
        match self {
            Outcome::Accepted(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    /// The rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Accepted(_) => None,
            Outcome::Rejected(rejection) => Some(rejection),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Accepted(value) => Outcome::Accepted(f(value)),
            Outcome::Rejected(rejection) => Outcome::Rejected(rejection),
        }
    }
}

impl<T> From<Rejection> for Outcome<T> {
    fn from(rejection: Rejection) -> Self {
        Outcome::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages() {
        let full = Rejection::ActivityFull {
            activity: "Golf".into(),
            seat_limit: 2,
        };
        assert_eq!(full.to_string(), "Golf is full (2 seats)");

        let expired = Rejection::DiscountInvalid {
            code: "SAVE20".into(),
            reason: DiscountRejection::Expired,
        };
        assert_eq!(expired.to_string(), "Discount code SAVE20 is expired");
    }

    #[test]
    fn test_outcome_accessors() {
        let ok: Outcome<u32> = Outcome::Accepted(7);
        assert!(ok.is_accepted());
        assert_eq!(ok.clone().map(|v| v * 2).accepted(), Some(14));

        let refused: Outcome<u32> = Rejection::ActivityFull {
            activity: "Golf".into(),
            seat_limit: 1,
        }
        .into();
        assert!(!refused.is_accepted());
        assert!(refused.rejection().is_some());
        assert_eq!(refused.accepted(), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let refused: Outcome<u32> = Rejection::DiscountInvalid {
            code: "ONCE".into(),
            reason: DiscountRejection::UsageLimitReached,
        }
        .into();
        let json = serde_json::to_value(&refused).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["value"]["kind"], "discount_invalid");
        assert_eq!(json["value"]["reason"], "usage_limit_reached");
    }
}
