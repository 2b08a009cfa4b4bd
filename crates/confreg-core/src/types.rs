//! # Domain Types
//!
//! Core domain types shared by pricing, persistence and the service layer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Event       │   │  DiscountCode   │   │  Registration   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  tier lists ×3  │   │  code (upper)   │   │  selections     │       │
//! │  │  breakfast      │   │  type + value   │   │  discount       │       │
//! │  │  activities     │   │  expiry / limit │   │  payment state  │       │
//! │  │  (read-only)    │   │  used_count     │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Ownership: an Event is read-only input to pricing. A Registration     │
//! │  exclusively owns its payment fields. used_count only grows.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::payment::PaymentState;

// =============================================================================
// Price Tiers
// =============================================================================

/// Which tier list of an event a tier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TierCategory {
    Registration,
    Spouse,
    Child,
}

impl TierCategory {
    /// All categories, in storage order.
    pub const ALL: [TierCategory; 3] = [
        TierCategory::Registration,
        TierCategory::Spouse,
        TierCategory::Child,
    ];
}

/// A price bracket valid over a date range.
///
/// ## Boundaries
/// `start_date` is inclusive and `end_date` covers the whole civil day it
/// names. Both are calendar strings (`YYYY-MM-DD`) exactly as organizers
/// entered them; resolution happens at selection time in the civil zone.
///
/// List POSITION, not date order, decides fallback: the last tier of a list
/// is the walk-in price used when no range matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub label: String,
    pub price: Money,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl PriceTier {
    /// A tier with no date bounds.
    pub fn open(label: impl Into<String>, price: Money) -> Self {
        PriceTier {
            label: label.into(),
            price,
            start_date: None,
            end_date: None,
        }
    }

    /// A tier bounded by calendar dates; either side may be omitted.
    pub fn dated(
        label: impl Into<String>,
        price: Money,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Self {
        PriceTier {
            label: label.into(),
            price,
            start_date: start_date.map(str::to_string),
            end_date: end_date.map(str::to_string),
        }
    }
}

// =============================================================================
// Event
// =============================================================================

/// An optional activity with a seat limit (`None` = unlimited).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub seat_limit: Option<u32>,
}

/// A conference event, as consumed by pricing. Never mutated by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    /// Used when the registration tier list is empty.
    pub default_price: Money,
    pub registration_tiers: Vec<PriceTier>,
    pub spouse_tiers: Vec<PriceTier>,
    pub child_tiers: Vec<PriceTier>,
    pub breakfast_price: Option<Money>,
    /// Last civil day breakfast can be bought (inclusive).
    pub breakfast_end_date: Option<String>,
    pub activities: Vec<Activity>,
}

impl Event {
    /// Returns the tier list for a category.
    pub fn tiers(&self, category: TierCategory) -> &[PriceTier] {
        match category {
            TierCategory::Registration => &self.registration_tiers,
            TierCategory::Spouse => &self.spouse_tiers,
            TierCategory::Child => &self.child_tiers,
        }
    }

    /// Finds an activity by name, ignoring case and surrounding whitespace.
    pub fn activity(&self, name: &str) -> Option<&Activity> {
        let wanted = name.trim();
        self.activities
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(wanted))
    }
}

// =============================================================================
// Discount Codes
// =============================================================================

/// How a discount code reduces the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Multiplies the running total. Value is in basis points (2000 = 20%).
    Percentage,
    /// Subtracts a flat amount. Value is in cents (5000 = $50.00).
    Fixed,
}

/// A discount code scoped to one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: String,
    pub event_id: String,
    /// Normalized (trimmed, upper-case). Unique per event.
    pub code: String,
    pub discount_type: DiscountType,
    /// Hundredths: basis points for percentages, cents for fixed amounts.
    pub discount_value: i64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
}

// =============================================================================
// Registration
// =============================================================================

/// Lifecycle status. Cancellation is a flag, never a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[default]
    Active,
    Cancelled,
}

/// Who is performing a create or edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// An organizer acting through the admin console.
    Privileged,
    /// The attendee themselves.
    Attendee,
}

/// The price-affecting choices on a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    pub wants_spouse: bool,
    pub spouse_name: Option<String>,
    pub wants_breakfast: bool,
    pub child_count: u32,
    pub activity: Option<String>,
}

/// A conference registration and its payment ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: RegistrationStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub selections: Selections,
    pub discount_code: Option<String>,
    pub discount_amount: Money,
    pub payment: PaymentState,
    /// Identifier returned by the card gateway, if any.
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Whether this registration holds a seat.
    pub fn is_committed(&self) -> bool {
        self.status == RegistrationStatus::Active && self.cancelled_at.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with_activities() -> Event {
        Event {
            id: "evt-1".to_string(),
            name: "Annual Conference".to_string(),
            default_price: Money::from_major(400),
            registration_tiers: vec![PriceTier::open("Regular", Money::from_major(500))],
            spouse_tiers: vec![],
            child_tiers: vec![],
            breakfast_price: None,
            breakfast_end_date: None,
            activities: vec![
                Activity {
                    name: "Golf".to_string(),
                    seat_limit: Some(2),
                },
                Activity {
                    name: "City Tour".to_string(),
                    seat_limit: None,
                },
            ],
        }
    }

    #[test]
    fn test_activity_lookup_ignores_case() {
        let event = event_with_activities();
        assert_eq!(event.activity(" golf ").unwrap().seat_limit, Some(2));
        assert!(event.activity("city tour").unwrap().seat_limit.is_none());
        assert!(event.activity("Sailing").is_none());
    }

    #[test]
    fn test_tiers_by_category() {
        let event = event_with_activities();
        assert_eq!(event.tiers(TierCategory::Registration).len(), 1);
        assert!(event.tiers(TierCategory::Child).is_empty());
    }

    #[test]
    fn test_registration_status_default() {
        assert_eq!(RegistrationStatus::default(), RegistrationStatus::Active);
    }

    #[test]
    fn test_dated_tier() {
        let tier = PriceTier::dated("Early", Money::from_major(300), None, Some("2025-12-11"));
        assert!(tier.start_date.is_none());
        assert_eq!(tier.end_date.as_deref(), Some("2025-12-11"));
    }
}
