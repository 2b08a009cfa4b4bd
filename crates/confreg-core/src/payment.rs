//! # Payment Reconciler
//!
//! The payment state machine of a registration, and the two reconciliation
//! paths that move it: organizer edits and attendee payment completion.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PaymentStatus State Machine                        │
//! │                                                                         │
//! │   on_create (attendee)           on_create (organizer, not paid)        │
//! │          │                                  │                           │
//! │          ▼                                  ▼                           │
//! │   ┌────────────┐   increase    ┌──────────────────────────┐             │
//! │   │   Unpaid   │──────────────►│      PartiallyPaid       │◄──┐         │
//! │   │ paid_amount│               │ paid, pending, reason    │   │increase │
//! │   └─────┬──────┘◄──────────────└────────────┬─────────────┘───┘         │
//! │         │       decrease / completion       │                           │
//! │         │       leaving paid < total        │ completion                │
//! │         │                                   │ (paid += pending)         │
//! │         │ completion                        ▼                           │
//! │         └──────────────────────────►┌────────────┐                      │
//! │                                     │ FullyPaid  │──increase──► Partial │
//! │       on_create (mark paid) ───────►│ paid_amount│                      │
//! │                                     └────────────┘                      │
//! │                                                                         │
//! │  `paid = true` with a pending amount cannot be constructed.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Rules
//! - `paid_amount` only grows. Completion adds to it, never replaces it.
//! - `original_total_price` is captured on the first increase and kept.
//! - `paid_at` is stamped the first time the registration is fully paid.
//! - Completion never touches `total_price`.
//! - A decrease clears the pending amount. Refunds are not modeled.
//! - `paid + pending <= total` is checked and REPORTED; it never blocks a
//!   write and is never clamped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::civil_time::CivilZone;
use crate::error::{CoreError, CoreResult, Inconsistency};
use crate::money::Money;
use crate::pricing::{breakfast_price, child_unit_price, compute_registration_price, spouse_price};
use crate::types::{Actor, DiscountCode, Event, Registration, RegistrationStatus, Selections};
use crate::validation::validate_child_count;

/// Separator used when several reasons accumulate on one pending amount.
pub const REASON_SEPARATOR: &str = "; ";

// =============================================================================
// Payment Status
// =============================================================================

/// Where a registration stands with respect to payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing is pending. Money may be owed through the card gateway.
    Unpaid { paid_amount: Money },

    /// An organizer edit left an amount to collect.
    PartiallyPaid {
        paid_amount: Money,
        pending_amount: Money,
        reason: String,
    },

    /// `paid_amount` covers the total.
    FullyPaid { paid_amount: Money },
}

impl PaymentStatus {
    /// Amount collected so far.
    pub fn paid_amount(&self) -> Money {
        match self {
            PaymentStatus::Unpaid { paid_amount }
            | PaymentStatus::PartiallyPaid { paid_amount, .. }
            | PaymentStatus::FullyPaid { paid_amount } => *paid_amount,
        }
    }

    /// Amount an organizer edit left to collect.
    pub fn pending_amount(&self) -> Money {
        match self {
            PaymentStatus::PartiallyPaid { pending_amount, .. } => *pending_amount,
            _ => Money::zero(),
        }
    }

    /// Why the pending amount exists.
    pub fn reason(&self) -> Option<&str> {
        match self {
            PaymentStatus::PartiallyPaid { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::FullyPaid { .. })
    }
}

// =============================================================================
// Persisted Columns
// =============================================================================

/// The flattened payment fields as stored on a registration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentColumns {
    pub total_price: Money,
    pub paid: bool,
    pub paid_amount: Money,
    pub pending_payment_amount: Money,
    pub pending_payment_reason: Option<String>,
    pub original_total_price: Option<Money>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Payment State
// =============================================================================

/// All money-tracking fields of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentState {
    pub total_price: Money,
    pub original_total_price: Option<Money>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
}

impl PaymentState {
    /// A fresh state with nothing collected or pending.
    pub fn unpaid(total_price: Money) -> Self {
        PaymentState {
            total_price,
            original_total_price: None,
            paid_at: None,
            status: PaymentStatus::Unpaid {
                paid_amount: Money::zero(),
            },
        }
    }

    pub fn paid_amount(&self) -> Money {
        self.status.paid_amount()
    }

    pub fn pending_amount(&self) -> Money {
        self.status.pending_amount()
    }

    pub fn is_paid(&self) -> bool {
        self.status.is_paid()
    }

    /// Raises the total by `delta` and adds it to the pending amount.
    ///
    /// Non-positive deltas are ignored.
    pub fn apply_increase(&mut self, delta: Money, reason: &str) {
        if !delta.is_positive() {
            return;
        }

        self.original_total_price.get_or_insert(self.total_price);
        self.total_price += delta;

        let paid_amount = self.paid_amount();
        self.status = match std::mem::replace(
            &mut self.status,
            PaymentStatus::Unpaid { paid_amount },
        ) {
            PaymentStatus::PartiallyPaid {
                pending_amount,
                reason: existing,
                ..
            } => PaymentStatus::PartiallyPaid {
                paid_amount,
                pending_amount: pending_amount + delta,
                reason: join_reasons(&existing, reason),
            },
            PaymentStatus::Unpaid { .. } | PaymentStatus::FullyPaid { .. } => {
                PaymentStatus::PartiallyPaid {
                    paid_amount,
                    pending_amount: delta,
                    reason: reason.to_string(),
                }
            }
        };
    }

    /// Lowers the total to `new_total` and clears any pending amount.
    ///
    /// Money already collected stays collected; an overpayment shows up as
    /// an [`Inconsistency`] rather than a refund.
    pub fn apply_decrease(&mut self, new_total: Money, now: DateTime<Utc>) {
        self.total_price = new_total;
        self.settle_status(self.paid_amount(), now);
    }

    /// Moves the total to `new_total`, dispatching to an increase or decrease.
    pub fn reprice(&mut self, new_total: Money, reason: &str, now: DateTime<Utc>) {
        let delta = new_total - self.total_price;
        if delta.is_positive() {
            self.apply_increase(delta, reason);
        } else if delta.is_negative() {
            self.apply_decrease(new_total, now);
        }
    }

    /// Collects whatever is owed and returns the amount settled.
    ///
    /// - `PartiallyPaid`: the pending amount moves into `paid_amount`.
    /// - `Unpaid`: the outstanding balance (`total - paid`) is collected,
    ///   which is how a gateway payment lands for attendee-created rows.
    /// - `FullyPaid`: nothing to do.
    pub fn complete_pending(&mut self, now: DateTime<Utc>) -> Money {
        let settled = match &self.status {
            PaymentStatus::PartiallyPaid { pending_amount, .. } => *pending_amount,
            PaymentStatus::Unpaid { paid_amount } => {
                (self.total_price - *paid_amount).floor_at_zero()
            }
            PaymentStatus::FullyPaid { .. } => return Money::zero(),
        };
        self.settle_status(self.paid_amount() + settled, now);
        settled
    }

    /// Picks FullyPaid or Unpaid for a state with nothing pending.
    fn settle_status(&mut self, paid_amount: Money, now: DateTime<Utc>) {
        if paid_amount >= self.total_price && (paid_amount.is_positive() || self.total_price.is_zero()) {
            self.paid_at.get_or_insert(now);
            self.status = PaymentStatus::FullyPaid { paid_amount };
        } else {
            self.status = PaymentStatus::Unpaid { paid_amount };
        }
    }

    /// Reports `paid + pending > total + epsilon`.
    pub fn check_consistency(&self, epsilon: Money) -> Option<Inconsistency> {
        let paid_amount = self.paid_amount();
        let pending_amount = self.pending_amount();
        if paid_amount + pending_amount > self.total_price + epsilon {
            Some(Inconsistency::OverCommitted {
                paid_amount,
                pending_amount,
                total_price: self.total_price,
            })
        } else {
            None
        }
    }

    /// Flattens into persisted columns.
    pub fn to_columns(&self) -> PaymentColumns {
        PaymentColumns {
            total_price: self.total_price,
            paid: self.is_paid(),
            paid_amount: self.paid_amount(),
            pending_payment_amount: self.pending_amount(),
            pending_payment_reason: self.status.reason().map(str::to_string),
            original_total_price: self.original_total_price,
            paid_at: self.paid_at,
        }
    }

    /// Rebuilds the state from persisted columns.
    ///
    /// Rows written before the tagged model existed can claim `paid = true`
    /// while still carrying a pending amount. Those map to `PartiallyPaid`
    /// (the money is still owed) and the conflict is returned for logging.
    pub fn from_columns(columns: PaymentColumns) -> (Self, Option<Inconsistency>) {
        let pending = columns.pending_payment_amount;
        let mut report = None;

        let status = if pending.is_positive() {
            if columns.paid {
                report = Some(Inconsistency::PaidWithPending {
                    pending_amount: pending,
                });
            }
            PaymentStatus::PartiallyPaid {
                paid_amount: columns.paid_amount,
                pending_amount: pending,
                reason: columns.pending_payment_reason.unwrap_or_default(),
            }
        } else if columns.paid {
            PaymentStatus::FullyPaid {
                paid_amount: columns.paid_amount,
            }
        } else {
            PaymentStatus::Unpaid {
                paid_amount: columns.paid_amount,
            }
        };

        let state = PaymentState {
            total_price: columns.total_price,
            original_total_price: columns.original_total_price,
            paid_at: columns.paid_at,
            status,
        };
        (state, report)
    }
}

fn join_reasons(existing: &str, added: &str) -> String {
    match (existing.is_empty(), added.is_empty()) {
        (true, _) => added.to_string(),
        (_, true) => existing.to_string(),
        _ => format!("{existing}{REASON_SEPARATOR}{added}"),
    }
}

// =============================================================================
// Create
// =============================================================================

/// Initial payment state of a new registration.
///
/// Organizer-created registrations that are not marked paid owe the full
/// total as a pending amount. Attendee registrations owe through the card
/// gateway, so nothing is pending.
pub fn on_create(total: Money, actor: Actor, mark_paid: bool, now: DateTime<Utc>) -> PaymentState {
    let mut state = PaymentState::unpaid(total);
    if mark_paid {
        state.paid_at = Some(now);
        state.status = PaymentStatus::FullyPaid { paid_amount: total };
    } else if actor == Actor::Privileged && total.is_positive() {
        state.status = PaymentStatus::PartiallyPaid {
            paid_amount: Money::zero(),
            pending_amount: total,
            reason: format!("Registration created by organizer; {total} due"),
        };
    }
    state
}

// =============================================================================
// Organizer Update
// =============================================================================

/// Changes an organizer requests on an existing registration.
///
/// `None` leaves a field as it is. `activity: Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminPatch {
    pub price_override: Option<Money>,
    pub wants_spouse: Option<bool>,
    pub spouse_name: Option<String>,
    pub wants_breakfast: Option<bool>,
    pub child_count: Option<u32>,
    pub activity: Option<Option<String>>,
    /// A discount code to attach, already normalized.
    pub discount_code: Option<String>,
}

impl AdminPatch {
    /// Applies the patch to the current selections.
    pub fn merge(&self, current: &Selections) -> Selections {
        Selections {
            wants_spouse: self.wants_spouse.unwrap_or(current.wants_spouse),
            spouse_name: self
                .spouse_name
                .clone()
                .or_else(|| current.spouse_name.clone()),
            wants_breakfast: self.wants_breakfast.unwrap_or(current.wants_breakfast),
            child_count: self.child_count.unwrap_or(current.child_count),
            activity: match &self.activity {
                Some(activity) => activity.clone(),
                None => current.activity.clone(),
            },
        }
    }
}

/// Everything an organizer update writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminReconciliation {
    pub selections: Selections,
    pub payment: PaymentState,
    /// The flattened `payment`, ready to persist.
    pub fields: PaymentColumns,
    pub discount_code: Option<String>,
    pub discount_amount: Money,
    /// `new total - old total`; negative on a decrease.
    pub price_delta: Money,
    /// Amount added to the pending balance by this update.
    pub pending_delta: Money,
    /// Reason attached to `pending_delta`, if any.
    pub reason: Option<String>,
}

/// Reconciles an organizer edit.
///
/// Newly added spouse, breakfast and child tickets are itemized in the
/// reason at their list price. With a `price_override` the override
/// replaces the existing total and newly added tickets are charged on top
/// of it. Otherwise the whole price is recomputed at `now`, which also
/// picks up tier drift since the registration was priced; any extra
/// discount the recompute grants on the added tickets gets its own line so
/// the itemized amounts add up to `pending_delta`. `discount` is the code
/// to apply on recompute, already validated by the caller.
pub fn reconcile_admin_update(
    existing: &Registration,
    patch: &AdminPatch,
    event: &Event,
    discount: Option<&DiscountCode>,
    now: DateTime<Utc>,
    zone: &CivilZone,
) -> CoreResult<AdminReconciliation> {
    if existing.status == RegistrationStatus::Cancelled {
        return Err(CoreError::RegistrationCancelled(existing.id.clone()));
    }

    let before = &existing.selections;
    let after = patch.merge(before);
    validate_child_count(after.child_count)?;
    if let Some(activity) = after.activity.as_deref() {
        if event.activity(activity).is_none() {
            return Err(CoreError::UnknownActivity {
                event_id: event.id.clone(),
                activity: activity.to_string(),
            });
        }
    }

    let mut reasons = Vec::new();
    let mut itemized = Money::zero();

    if after.wants_spouse && !before.wants_spouse {
        let price = spouse_price(event, now, zone);
        itemized += price;
        reasons.push(format!("Spouse ticket added ({price})"));
    }
    if after.wants_breakfast && !before.wants_breakfast {
        if let Some(price) = breakfast_price(event, now, zone) {
            itemized += price;
            reasons.push(format!("Breakfast added ({price})"));
        }
    }
    if after.child_count > before.child_count {
        let added = after.child_count - before.child_count;
        let price = child_unit_price(event, now, zone).multiply_quantity(added as i64);
        itemized += price;
        let noun = if added == 1 { "ticket" } else { "tickets" };
        reasons.push(format!("{added} child {noun} added ({price})"));
    }

    let old_total = existing.payment.total_price;
    let (new_total, discount_amount) = match patch.price_override {
        Some(price) => {
            reasons.insert(0, format!("Price set by organizer ({old_total} to {price})"));
            (price + itemized, existing.discount_amount)
        }
        None => {
            let quote = compute_registration_price(event, &after, discount, now, zone);
            let extra_discount = (quote.discount_amount - existing.discount_amount).floor_at_zero();
            if extra_discount.is_positive() {
                reasons.push(format!("Discount applied ({})", Money::zero() - extra_discount));
            }
            let drift = quote.total - old_total - itemized + extra_discount;
            if drift.is_positive() {
                reasons.push(format!("Price tier change ({drift})"));
            }
            (quote.total, quote.discount_amount)
        }
    };

    let price_delta = new_total - old_total;
    let pending_delta = price_delta.floor_at_zero();
    let reason = if pending_delta.is_positive() {
        if reasons.is_empty() {
            reasons.push("Price adjusted by organizer".to_string());
        }
        Some(reasons.join(REASON_SEPARATOR))
    } else {
        None
    };

    let mut payment = existing.payment.clone();
    payment.reprice(new_total, reason.as_deref().unwrap_or_default(), now);

    Ok(AdminReconciliation {
        selections: after,
        fields: payment.to_columns(),
        payment,
        discount_code: patch
            .discount_code
            .clone()
            .or_else(|| existing.discount_code.clone()),
        discount_amount,
        price_delta,
        pending_delta,
        reason,
    })
}

// =============================================================================
// Attendee Payment Completion
// =============================================================================

/// Result of an attendee settling what they owe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCompletion {
    pub payment: PaymentState,
    pub fields: PaymentColumns,
    /// Amount collected by this completion.
    pub settled: Money,
}

/// Settles the pending (or outstanding) amount of a registration.
///
/// `total_price` is read from `existing`, never from the client, so a stale
/// total cannot overwrite the real one.
pub fn apply_user_payment_completion(
    existing: &Registration,
    now: DateTime<Utc>,
) -> CoreResult<PaymentCompletion> {
    if existing.status == RegistrationStatus::Cancelled {
        return Err(CoreError::RegistrationCancelled(existing.id.clone()));
    }

    let mut payment = existing.payment.clone();
    let settled = payment.complete_pending(now);
    if !payment.is_paid() {
        warn!(
            registration_id = %existing.id,
            paid_amount = %payment.paid_amount(),
            total_price = %payment.total_price,
            "Payment completed but registration is still short of its total"
        );
    }

    Ok(PaymentCompletion {
        fields: payment.to_columns(),
        payment,
        settled,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Activity, DiscountType, PriceTier};

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn now() -> DateTime<Utc> {
        utc("2026-01-05T15:00:00Z")
    }

    fn event() -> Event {
        Event {
            id: "evt-1".to_string(),
            name: "Annual Conference".to_string(),
            default_price: Money::from_major(500),
            registration_tiers: vec![PriceTier::open("Regular", Money::from_major(500))],
            spouse_tiers: vec![PriceTier::open("Spouse", Money::from_major(200))],
            child_tiers: vec![PriceTier::open("Child", Money::from_major(75))],
            breakfast_price: Some(Money::from_major(40)),
            breakfast_end_date: Some("2026-02-01".to_string()),
            activities: vec![Activity {
                name: "Golf".to_string(),
                seat_limit: Some(2),
            }],
        }
    }

    fn registration(payment: PaymentState) -> Registration {
        Registration {
            id: "reg-1".to_string(),
            event_id: "evt-1".to_string(),
            user_id: "user-1".to_string(),
            status: RegistrationStatus::Active,
            cancelled_at: None,
            selections: Selections::default(),
            discount_code: None,
            discount_amount: Money::zero(),
            payment,
            payment_reference: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn fully_paid(total: Money) -> PaymentState {
        on_create(total, Actor::Attendee, true, now())
    }

    #[test]
    fn test_admin_create_unpaid_then_user_completes() {
        let total = Money::from_major(500);
        let state = on_create(total, Actor::Privileged, false, now());
        assert_eq!(state.pending_amount(), total);
        assert!(!state.is_paid());

        let reg = registration(state);
        let done = apply_user_payment_completion(&reg, now()).unwrap();
        assert_eq!(done.settled, total);
        assert_eq!(done.fields.paid_amount, total);
        assert_eq!(done.fields.pending_payment_amount, Money::zero());
        assert!(done.fields.paid);
        assert_eq!(done.fields.total_price, total);
        assert_eq!(done.fields.paid_at, Some(now()));
    }

    #[test]
    fn test_attendee_create_has_nothing_pending() {
        let state = on_create(Money::from_major(500), Actor::Attendee, false, now());
        assert_eq!(state.pending_amount(), Money::zero());
        assert_eq!(state.status, PaymentStatus::Unpaid { paid_amount: Money::zero() });
    }

    #[test]
    fn test_admin_adds_spouse_to_paid_registration() {
        let reg = registration(fully_paid(Money::from_major(500)));
        let patch = AdminPatch {
            wants_spouse: Some(true),
            spouse_name: Some("Sam".to_string()),
            ..AdminPatch::default()
        };
        let result =
            reconcile_admin_update(&reg, &patch, &event(), None, now(), &CivilZone::default())
                .unwrap();

        assert_eq!(result.fields.total_price, Money::from_major(700));
        assert_eq!(result.fields.pending_payment_amount, Money::from_major(200));
        assert_eq!(result.fields.paid_amount, Money::from_major(500));
        assert!(!result.fields.paid);
        assert_eq!(result.fields.original_total_price, Some(Money::from_major(500)));
        assert_eq!(result.pending_delta, Money::from_major(200));
        assert_eq!(result.reason.as_deref(), Some("Spouse ticket added ($200.00)"));
        assert_eq!(result.selections.spouse_name.as_deref(), Some("Sam"));
    }

    #[test]
    fn test_itemized_reasons_are_joined() {
        let reg = registration(fully_paid(Money::from_major(500)));
        let patch = AdminPatch {
            wants_breakfast: Some(true),
            child_count: Some(2),
            ..AdminPatch::default()
        };
        let result =
            reconcile_admin_update(&reg, &patch, &event(), None, now(), &CivilZone::default())
                .unwrap();
        assert_eq!(result.pending_delta, Money::from_major(190));
        assert_eq!(
            result.reason.as_deref(),
            Some("Breakfast added ($40.00); 2 child tickets added ($150.00)")
        );
    }

    #[test]
    fn test_tier_drift_surfaces_as_pending() {
        let reg = registration(fully_paid(Money::from_major(450)));
        let result = reconcile_admin_update(
            &reg,
            &AdminPatch::default(),
            &event(),
            None,
            now(),
            &CivilZone::default(),
        )
        .unwrap();
        assert_eq!(result.pending_delta, Money::from_major(50));
        assert_eq!(result.reason.as_deref(), Some("Price tier change ($50.00)"));
    }

    #[test]
    fn test_original_total_snapshots_once() {
        let mut reg = registration(fully_paid(Money::from_major(500)));
        let zone = CivilZone::default();

        let first = AdminPatch {
            wants_spouse: Some(true),
            ..AdminPatch::default()
        };
        let result = reconcile_admin_update(&reg, &first, &event(), None, now(), &zone).unwrap();
        reg.payment = result.payment;
        reg.selections = result.selections;

        let second = AdminPatch {
            child_count: Some(1),
            ..AdminPatch::default()
        };
        let result = reconcile_admin_update(&reg, &second, &event(), None, now(), &zone).unwrap();

        assert_eq!(result.fields.original_total_price, Some(Money::from_major(500)));
        assert_eq!(result.fields.total_price, Money::from_major(775));
        assert_eq!(result.fields.pending_payment_amount, Money::from_major(275));
        assert_eq!(
            result.fields.pending_payment_reason.as_deref(),
            Some("Spouse ticket added ($200.00); 1 child ticket added ($75.00)")
        );
    }

    #[test]
    fn test_price_override() {
        let reg = registration(fully_paid(Money::from_major(500)));
        let patch = AdminPatch {
            price_override: Some(Money::from_major(650)),
            ..AdminPatch::default()
        };
        let result =
            reconcile_admin_update(&reg, &patch, &event(), None, now(), &CivilZone::default())
                .unwrap();
        assert_eq!(result.fields.total_price, Money::from_major(650));
        assert_eq!(result.pending_delta, Money::from_major(150));
        assert_eq!(
            result.reason.as_deref(),
            Some("Price set by organizer ($500.00 to $650.00)")
        );
    }

    #[test]
    fn test_price_override_with_added_spouse_charges_both() {
        let reg = registration(fully_paid(Money::from_major(500)));
        let patch = AdminPatch {
            price_override: Some(Money::from_major(600)),
            wants_spouse: Some(true),
            ..AdminPatch::default()
        };
        let result =
            reconcile_admin_update(&reg, &patch, &event(), None, now(), &CivilZone::default())
                .unwrap();

        assert_eq!(result.fields.total_price, Money::from_major(800));
        assert_eq!(result.price_delta, Money::from_major(300));
        assert_eq!(result.pending_delta, Money::from_major(300));
        assert_eq!(result.fields.pending_payment_amount, Money::from_major(300));
        assert_eq!(
            result.reason.as_deref(),
            Some("Price set by organizer ($500.00 to $600.00); Spouse ticket added ($200.00)")
        );
    }

    #[test]
    fn test_added_spouse_reason_shows_discount_share() {
        let code = DiscountCode {
            id: "dc-1".to_string(),
            event_id: "evt-1".to_string(),
            code: "SAVE20".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 2000,
            expiry_date: None,
            usage_limit: None,
            used_count: 1,
        };
        let mut reg = registration(fully_paid(Money::from_major(400)));
        reg.discount_code = Some("SAVE20".to_string());
        reg.discount_amount = Money::from_major(100);

        let patch = AdminPatch {
            wants_spouse: Some(true),
            ..AdminPatch::default()
        };
        let result = reconcile_admin_update(
            &reg,
            &patch,
            &event(),
            Some(&code),
            now(),
            &CivilZone::default(),
        )
        .unwrap();

        assert_eq!(result.fields.total_price, Money::from_major(560));
        assert_eq!(result.discount_amount, Money::from_major(140));
        assert_eq!(result.pending_delta, Money::from_major(160));
        assert_eq!(
            result.reason.as_deref(),
            Some("Spouse ticket added ($200.00); Discount applied (-$40.00)")
        );
    }

    #[test]
    fn test_decrease_clears_pending_without_refund() {
        let mut state = on_create(Money::from_major(500), Actor::Privileged, false, now());
        state.apply_decrease(Money::from_major(300), now());
        assert_eq!(state.pending_amount(), Money::zero());
        assert_eq!(state.total_price, Money::from_major(300));
        assert_eq!(state.status, PaymentStatus::Unpaid { paid_amount: Money::zero() });

        let mut paid = fully_paid(Money::from_major(500));
        paid.apply_decrease(Money::from_major(300), now());
        assert!(paid.is_paid());
        assert_eq!(paid.paid_amount(), Money::from_major(500));
        assert!(paid.check_consistency(Money::from_cents(1)).is_some());
    }

    #[test]
    fn test_decrease_to_below_paid_marks_fully_paid_once() {
        let mut state = PaymentState::unpaid(Money::from_major(500));
        state.status = PaymentStatus::PartiallyPaid {
            paid_amount: Money::from_major(300),
            pending_amount: Money::from_major(200),
            reason: "Spouse ticket added ($200.00)".to_string(),
        };
        let later = utc("2026-01-06T15:00:00Z");
        state.apply_decrease(Money::from_major(300), later);
        assert!(state.is_paid());
        assert_eq!(state.paid_at, Some(later));
    }

    #[test]
    fn test_completion_adds_to_paid_amount() {
        let mut state = fully_paid(Money::from_major(500));
        state.apply_increase(Money::from_major(200), "Spouse ticket added ($200.00)");
        let settled = state.complete_pending(utc("2026-02-01T00:00:00Z"));
        assert_eq!(settled, Money::from_major(200));
        assert_eq!(state.paid_amount(), Money::from_major(700));
        assert_eq!(state.total_price, Money::from_major(700));
        // paid_at was stamped at the first full payment and is kept.
        assert_eq!(state.paid_at, Some(now()));
    }

    #[test]
    fn test_completion_on_fully_paid_is_noop() {
        let mut state = fully_paid(Money::from_major(500));
        let before = state.clone();
        assert_eq!(state.complete_pending(now()), Money::zero());
        assert_eq!(state, before);
    }

    #[test]
    fn test_completion_short_of_total_stays_unpaid() {
        let mut state = PaymentState::unpaid(Money::from_major(700));
        state.apply_increase(Money::from_major(200), "Spouse ticket added ($200.00)");
        // total is now 900 with 200 pending and nothing paid yet.
        state.complete_pending(now());
        assert!(!state.is_paid());
        assert_eq!(state.paid_amount(), Money::from_major(200));
        assert!(state.paid_at.is_none());
    }

    #[test]
    fn test_cancelled_registration_rejected() {
        let mut reg = registration(fully_paid(Money::from_major(500)));
        reg.status = RegistrationStatus::Cancelled;
        assert!(matches!(
            apply_user_payment_completion(&reg, now()),
            Err(CoreError::RegistrationCancelled(_))
        ));
        assert!(reconcile_admin_update(
            &reg,
            &AdminPatch::default(),
            &event(),
            None,
            now(),
            &CivilZone::default()
        )
        .is_err());
    }

    #[test]
    fn test_unknown_activity_rejected() {
        let reg = registration(fully_paid(Money::from_major(500)));
        let patch = AdminPatch {
            activity: Some(Some("Sailing".to_string())),
            ..AdminPatch::default()
        };
        let err = reconcile_admin_update(&reg, &patch, &event(), None, now(), &CivilZone::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownActivity { .. }));
    }

    #[test]
    fn test_columns_roundtrip_and_legacy_rows() {
        let mut state = fully_paid(Money::from_major(500));
        state.apply_increase(Money::from_major(200), "Spouse ticket added ($200.00)");
        let (restored, report) = PaymentState::from_columns(state.to_columns());
        assert_eq!(restored, state);
        assert!(report.is_none());

        let mut legacy = state.to_columns();
        legacy.paid = true;
        let (restored, report) = PaymentState::from_columns(legacy);
        assert!(!restored.is_paid());
        assert_eq!(
            report,
            Some(Inconsistency::PaidWithPending {
                pending_amount: Money::from_major(200)
            })
        );
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let status = PaymentStatus::FullyPaid {
            paid_amount: Money::from_major(500),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "fully_paid");
        assert_eq!(json["paid_amount"], 50000);
    }

    #[test]
    fn test_consistency_epsilon() {
        let mut state = PaymentState::unpaid(Money::from_major(500));
        state.status = PaymentStatus::PartiallyPaid {
            paid_amount: Money::from_cents(30001),
            pending_amount: Money::from_major(200),
            reason: String::new(),
        };
        assert!(state.check_consistency(Money::from_cents(1)).is_none());
        assert!(state.check_consistency(Money::zero()).is_some());
    }
}
