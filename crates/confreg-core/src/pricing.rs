//! # Price Composer
//!
//! Composes a registration's total from its selected components.
//!
//! ## Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. base       registration tier at `now`, else event default price     │
//! │  2. + spouse   spouse tier at `now`            (if spouse selected)     │
//! │  3. + bfast    flat breakfast price            (if selected AND         │
//! │                now < end_of_day_succ(breakfast_end_date))               │
//! │  4. + kids     child tier at `now` × child_count                        │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │     subtotal                                                            │
//! │  5. - discount percentage of subtotal, or flat amount; capped so the   │
//! │                total never goes below zero                              │
//! │  ═════════════════════════════════════════════════════════════════════  │
//! │     total                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is pure: `now` and the civil zone are parameters and
//! no clock is read. Identical inputs give identical prices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::civil_time::CivilZone;
use crate::money::Money;
use crate::tier::select_tier;
use crate::types::{DiscountCode, Event, Selections, TierCategory};

/// Line items of a computed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base: Money,
    pub spouse: Money,
    pub breakfast: Money,
    pub children: Money,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// The `{total, discountAmount}` pair returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub total: Money,
    pub discount_amount: Money,
}

impl From<PriceBreakdown> for PriceQuote {
    fn from(breakdown: PriceBreakdown) -> Self {
        PriceQuote {
            total: breakdown.total,
            discount_amount: breakdown.discount_amount,
        }
    }
}

/// Base registration price at `now`.
pub fn base_price(event: &Event, now: DateTime<Utc>, zone: &CivilZone) -> Money {
    select_tier(event.tiers(TierCategory::Registration), now, zone)
        .map(|tier| tier.price)
        .unwrap_or(event.default_price)
}

/// Spouse ticket price at `now`; zero when the event sells none.
pub fn spouse_price(event: &Event, now: DateTime<Utc>, zone: &CivilZone) -> Money {
    select_tier(event.tiers(TierCategory::Spouse), now, zone)
        .map(|tier| tier.price)
        .unwrap_or_default()
}

/// Price of one child ticket at `now`; zero when the event sells none.
pub fn child_unit_price(event: &Event, now: DateTime<Utc>, zone: &CivilZone) -> Money {
    select_tier(event.tiers(TierCategory::Child), now, zone)
        .map(|tier| tier.price)
        .unwrap_or_default()
}

/// The breakfast add-on price if it can still be bought at `now`.
pub fn breakfast_price(event: &Event, now: DateTime<Utc>, zone: &CivilZone) -> Option<Money> {
    let price = event.breakfast_price?;
    let window_open = event
        .breakfast_end_date
        .as_deref()
        .and_then(|raw| zone.resolve_end(raw))
        .map_or(true, |end| now < end);
    window_open.then_some(price)
}

/// Computes every line item for a set of selections.
pub fn compute_breakdown(
    event: &Event,
    selections: &Selections,
    discount: Option<&DiscountCode>,
    now: DateTime<Utc>,
    zone: &CivilZone,
) -> PriceBreakdown {
    let base = base_price(event, now, zone);

    let spouse = if selections.wants_spouse {
        spouse_price(event, now, zone)
    } else {
        Money::zero()
    };

    let breakfast = if selections.wants_breakfast {
        breakfast_price(event, now, zone).unwrap_or_default()
    } else {
        Money::zero()
    };

    let children = child_unit_price(event, now, zone).multiply_quantity(selections.child_count as i64);

    let subtotal = base + spouse + breakfast + children;
    let discount_amount = discount
        .map(|code| code.discount_for(subtotal))
        .unwrap_or_default();

    PriceBreakdown {
        base,
        spouse,
        breakfast,
        children,
        subtotal,
        discount_amount,
        total: (subtotal - discount_amount).floor_at_zero(),
    }
}

/// Total price of a registration draft at `now`.
pub fn compute_total(
    event: &Event,
    selections: &Selections,
    discount: Option<&DiscountCode>,
    now: DateTime<Utc>,
    zone: &CivilZone,
) -> Money {
    compute_breakdown(event, selections, discount, now, zone).total
}

/// Total and discount amount of a registration draft at `now`.
///
/// The discount is applied as given; checking that it is still valid is the
/// caller's job.
pub fn compute_registration_price(
    event: &Event,
    selections: &Selections,
    discount: Option<&DiscountCode>,
    now: DateTime<Utc>,
    zone: &CivilZone,
) -> PriceQuote {
    compute_breakdown(event, selections, discount, now, zone).into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountType, PriceTier};

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn event() -> Event {
        Event {
            id: "evt-1".to_string(),
            name: "Annual Conference".to_string(),
            default_price: Money::from_major(450),
            registration_tiers: vec![
                PriceTier::dated("Early", Money::from_major(400), None, Some("2025-12-11")),
                PriceTier::open("Regular", Money::from_major(500)),
            ],
            spouse_tiers: vec![PriceTier::open("Spouse", Money::from_major(200))],
            child_tiers: vec![PriceTier::open("Child", Money::from_major(75))],
            breakfast_price: Some(Money::from_major(40)),
            breakfast_end_date: Some("2025-12-11".to_string()),
            activities: vec![],
        }
    }

    fn discount(discount_type: DiscountType, value: i64) -> DiscountCode {
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

    const LATE: &str = "2026-01-05T15:00:00Z";

    #[test]
    fn test_base_only() {
        let zone = CivilZone::default();
        let total = compute_total(&event(), &Selections::default(), None, utc(LATE), &zone);
        assert_eq!(total, Money::from_major(500));
    }

    #[test]
    fn test_default_price_without_tiers() {
        let zone = CivilZone::default();
        let mut event = event();
        event.registration_tiers.clear();
        let total = compute_total(&event, &Selections::default(), None, utc(LATE), &zone);
        assert_eq!(total, Money::from_major(450));
    }

    #[test]
    fn test_all_components() {
        let zone = CivilZone::default();
        let selections = Selections {
            wants_spouse: true,
            spouse_name: Some("Sam".to_string()),
            wants_breakfast: true,
            child_count: 2,
            activity: None,
        };
        // Dec 11, 23:00 EST: early tier and breakfast both still open.
        let now = utc("2025-12-12T04:00:00Z");
        let breakdown = compute_breakdown(&event(), &selections, None, now, &zone);
        assert_eq!(breakdown.base, Money::from_major(400));
        assert_eq!(breakdown.spouse, Money::from_major(200));
        assert_eq!(breakdown.breakfast, Money::from_major(40));
        assert_eq!(breakdown.children, Money::from_major(150));
        assert_eq!(breakdown.total, Money::from_major(790));
    }

    #[test]
    fn test_breakfast_closes_at_next_civil_midnight() {
        let zone = CivilZone::default();
        let selections = Selections {
            wants_breakfast: true,
            ..Selections::default()
        };
        let closed = utc("2025-12-12T05:00:00Z");
        let breakdown = compute_breakdown(&event(), &selections, None, closed, &zone);
        assert_eq!(breakdown.breakfast, Money::zero());
        assert!(breakfast_price(&event(), closed, &zone).is_none());
    }

    #[test]
    fn test_percentage_discount_500_to_400() {
        let zone = CivilZone::default();
        let code = discount(DiscountType::Percentage, 2000);
        let quote =
            compute_registration_price(&event(), &Selections::default(), Some(&code), utc(LATE), &zone);
        assert_eq!(quote.total.to_decimal_string(), "400.00");
        assert_eq!(quote.discount_amount, Money::from_major(100));
    }

    #[test]
    fn test_fixed_discount_500_to_450() {
        let zone = CivilZone::default();
        let code = discount(DiscountType::Fixed, 5000);
        let quote =
            compute_registration_price(&event(), &Selections::default(), Some(&code), utc(LATE), &zone);
        assert_eq!(quote.total.to_decimal_string(), "450.00");
    }

    #[test]
    fn test_fixed_discount_floors_at_zero() {
        let zone = CivilZone::default();
        let mut event = event();
        event.registration_tiers = vec![PriceTier::open("Student", Money::from_major(30))];
        let code = discount(DiscountType::Fixed, 5000);
        let quote =
            compute_registration_price(&event, &Selections::default(), Some(&code), utc(LATE), &zone);
        assert_eq!(quote.total, Money::zero());
        assert_eq!(quote.discount_amount, Money::from_major(30));
    }

    #[test]
    fn test_percentage_applies_to_running_total() {
        let zone = CivilZone::default();
        let selections = Selections {
            wants_spouse: true,
            ..Selections::default()
        };
        let code = discount(DiscountType::Percentage, 1000);
        let quote = compute_registration_price(&event(), &selections, Some(&code), utc(LATE), &zone);
        assert_eq!(quote.discount_amount, Money::from_major(70));
        assert_eq!(quote.total, Money::from_major(630));
    }

    #[test]
    fn test_compute_total_is_pure() {
        let zone = CivilZone::default();
        let event = event();
        let selections = Selections {
            wants_spouse: true,
            wants_breakfast: true,
            child_count: 3,
            ..Selections::default()
        };
        let now = utc("2025-12-01T12:00:00Z");
        let first = compute_total(&event, &selections, None, now, &zone);
        for _ in 0..10 {
            assert_eq!(compute_total(&event, &selections, None, now, &zone), first);
        }
    }
}
