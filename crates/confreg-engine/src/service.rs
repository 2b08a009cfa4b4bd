//! # Registration Service
//!
//! Request-level orchestration: one read-decide-write sequence per call.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     create_registration()                               │
//! │                                                                         │
//! │  1. read event ─────────────────────► EventNotFound                    │
//! │  2. activity seat check ────────────► Rejected(ActivityFull)           │
//! │  3. discount lookup + validate ─────► Rejected(DiscountInvalid)        │
//! │  4. compute_registration_price(now)                                    │
//! │  5. payment::on_create(actor, mark_paid)                               │
//! │  6. INSERT registration                                                │
//! │  7. discount used_count + 1   (only after 6 succeeded)                 │
//! │                                                                         │
//! │  Steps 2 and 7 are separate statements from step 6. Nothing here       │
//! │  locks across them: two concurrent creates can both pass step 2 for    │
//! │  the last seat. The discount counter is guarded in SQL, so the loser   │
//! │  of a race for the last use is logged, not double-counted.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation takes `now` from the caller. Nothing below reads the
//! clock, which keeps tier selection reproducible in tests and in the
//! `reprice` tool.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use confreg_core::capacity::{self, CapacityDecision};
use confreg_core::payment::{
    apply_user_payment_completion, on_create, reconcile_admin_update, AdminPatch,
};
use confreg_core::pricing::compute_registration_price;
use confreg_core::validation::{normalize_code, validate_child_count};
use confreg_core::{
    Actor, CivilZone, CoreError, DiscountCode, DiscountRejection, Event, Inconsistency, Money,
    PaymentColumns, PriceQuote, Registration, RegistrationStatus, Selections,
};
use confreg_db::Database;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::outcome::{Outcome, Rejection};

// =============================================================================
// Requests and Results
// =============================================================================

/// A registration to create.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub event_id: String,
    pub user_id: String,
    pub selections: Selections,
    /// Raw code as typed; normalized before lookup.
    pub discount_code: Option<String>,
    pub actor: Actor,
    /// Organizer marks the registration as already paid (cash, cheque).
    pub mark_paid: bool,
    pub payment_reference: Option<String>,
}

/// What an attendee may change on their own registration.
///
/// Neither field affects the price.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub spouse_name: Option<String>,
    /// `Some(None)` drops the current activity and frees its seat.
    pub activity: Option<Option<String>>,
}

/// The persisted result of an organizer edit.
#[derive(Debug, Clone)]
pub struct AdminUpdateResult {
    pub registration: Registration,
    /// The payment columns that were written.
    pub fields: PaymentColumns,
    pub price_delta: Money,
    pub pending_delta: Money,
    pub reason: Option<String>,
    /// Set when the written state has `paid + pending > total`.
    pub inconsistency: Option<Inconsistency>,
}

/// One registration's line in a reprice run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepriceLine {
    pub registration_id: String,
    pub stored_total: Money,
    /// Price the registration should have been quoted at `created_at`.
    pub expected_total: Money,
    /// `expected_total - stored_total`
    pub drift: Money,
    /// The organizer already moved this total up; the row is reported but
    /// never corrected.
    pub organizer_adjusted: bool,
    pub applied: bool,
}

// =============================================================================
// Service
// =============================================================================

/// Pricing and payment reconciliation over the registration store.
#[derive(Debug, Clone)]
pub struct RegistrationService {
    db: Database,
    zone: CivilZone,
    epsilon: Money,
}

impl RegistrationService {
    /// Creates a service with a one-cent inconsistency tolerance.
    pub fn new(db: Database, zone: CivilZone) -> Self {
        RegistrationService {
            db,
            zone,
            epsilon: Money::from_cents(1),
        }
    }

    /// Overrides the `paid + pending <= total` tolerance.
    pub fn with_epsilon(mut self, epsilon: Money) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Opens the configured database and builds a service over it.
    pub async fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let zone = config.civil_zone()?;
        let db = Database::new(config.db_config()).await?;
        info!(zone = %zone.name(), "Registration service ready");
        Ok(Self::new(db, zone).with_epsilon(config.epsilon()))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn zone(&self) -> &CivilZone {
        &self.zone
    }

    // =========================================================================
    // Exposed Operations
    // =========================================================================

    /// Prices a draft without writing anything.
    ///
    /// A discount code is validated but not consumed.
    pub async fn quote(
        &self,
        event_id: &str,
        selections: &Selections,
        discount_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<Outcome<PriceQuote>> {
        let event = self.load_event(event_id).await?;
        validate_child_count(selections.child_count).map_err(CoreError::from)?;

        let discount = match discount_code {
            Some(raw) => match self.resolve_discount(event_id, raw, now).await? {
                Ok(code) => Some(code),
                Err(rejection) => return Ok(Outcome::Rejected(rejection)),
            },
            None => None,
        };

        let quote =
            compute_registration_price(&event, selections, discount.as_ref(), now, &self.zone);
        debug!(event_id = %event_id, total = %quote.total, "Quoted registration");
        Ok(Outcome::Accepted(quote))
    }

    /// Creates a registration.
    pub async fn create_registration(
        &self,
        request: NewRegistration,
        now: DateTime<Utc>,
    ) -> EngineResult<Outcome<Registration>> {
        let event = self.load_event(&request.event_id).await?;

        let mut selections = request.selections;
        validate_child_count(selections.child_count).map_err(CoreError::from)?;

        if let Some(activity) = selections.activity.as_deref() {
            match self.claim_seat(&event, activity, None).await? {
                Ok(canonical) => selections.activity = Some(canonical),
                Err(rejection) => {
                    warn!(event_id = %event.id, %rejection, "Registration rejected");
                    return Ok(Outcome::Rejected(rejection));
                }
            }
        }

        let discount = match request.discount_code.as_deref() {
            Some(raw) => match self.resolve_discount(&event.id, raw, now).await? {
                Ok(code) => Some(code),
                Err(rejection) => {
                    warn!(event_id = %event.id, %rejection, "Registration rejected");
                    return Ok(Outcome::Rejected(rejection));
                }
            },
            None => None,
        };

        let quote =
            compute_registration_price(&event, &selections, discount.as_ref(), now, &self.zone);
        let payment = on_create(quote.total, request.actor, request.mark_paid, now);

        let registration = Registration {
            id: Uuid::new_v4().to_string(),
            event_id: event.id.clone(),
            user_id: request.user_id,
            status: RegistrationStatus::Active,
            cancelled_at: None,
            selections,
            discount_code: discount.as_ref().map(|code| code.code.clone()),
            discount_amount: quote.discount_amount,
            payment,
            payment_reference: request.payment_reference,
            created_at: now,
            updated_at: now,
        };

        self.db.registrations().insert(&registration).await?;

        if let Some(code) = &discount {
            self.consume_discount(&event.id, &code.code, &registration.id)
                .await?;
        }

        info!(
            registration_id = %registration.id,
            event_id = %event.id,
            total = %registration.payment.total_price,
            pending = %registration.payment.pending_amount(),
            "Registration created"
        );
        Ok(Outcome::Accepted(registration))
    }

    /// Applies an organizer edit and reconciles the payment state.
    pub async fn admin_update(
        &self,
        registration_id: &str,
        patch: AdminPatch,
        now: DateTime<Utc>,
    ) -> EngineResult<Outcome<AdminUpdateResult>> {
        let existing = self.load_active_registration(registration_id).await?;
        let event = self.load_event(&existing.event_id).await?;
        let mut patch = patch;

        if let Some(Some(activity)) = patch.activity.clone() {
            if activity_changed(&existing.selections, &activity) {
                match self.claim_seat(&event, &activity, Some(&existing.id)).await? {
                    Ok(canonical) => patch.activity = Some(Some(canonical)),
                    Err(rejection) => {
                        warn!(registration_id = %existing.id, %rejection, "Organizer edit rejected");
                        return Ok(Outcome::Rejected(rejection));
                    }
                }
            }
        }

        let mut newly_attached = None;
        let discount = match patch.discount_code.as_deref() {
            Some(raw) => {
                let code = normalize_code(raw).map_err(CoreError::from)?;
                if existing.discount_code.as_deref() == Some(code.as_str()) {
                    patch.discount_code = Some(code);
                    self.attached_discount(&existing).await?
                } else {
                    match self.resolve_discount(&event.id, &code, now).await? {
                        Ok(found) => {
                            patch.discount_code = Some(found.code.clone());
                            newly_attached = Some(found.code.clone());
                            Some(found)
                        }
                        Err(rejection) => {
                            warn!(registration_id = %existing.id, %rejection, "Organizer edit rejected");
                            return Ok(Outcome::Rejected(rejection));
                        }
                    }
                }
            }
            None => self.attached_discount(&existing).await?,
        };

        let reconciliation =
            reconcile_admin_update(&existing, &patch, &event, discount.as_ref(), now, &self.zone)?;

        let inconsistency = reconciliation.payment.check_consistency(self.epsilon);
        if let Some(inconsistency) = &inconsistency {
            warn!(registration_id = %existing.id, %inconsistency, "Payment state inconsistent after organizer edit");
        }

        let registration = Registration {
            selections: reconciliation.selections,
            discount_code: reconciliation.discount_code,
            discount_amount: reconciliation.discount_amount,
            payment: reconciliation.payment,
            updated_at: now,
            ..existing
        };
        self.db.registrations().update(&registration).await?;

        if let Some(code) = newly_attached {
            self.consume_discount(&event.id, &code, &registration.id)
                .await?;
        }

        info!(
            registration_id = %registration.id,
            delta = %reconciliation.price_delta,
            pending_delta = %reconciliation.pending_delta,
            total = %registration.payment.total_price,
            "Organizer reconciliation applied"
        );

        Ok(Outcome::Accepted(AdminUpdateResult {
            registration,
            fields: reconciliation.fields,
            price_delta: reconciliation.price_delta,
            pending_delta: reconciliation.pending_delta,
            reason: reconciliation.reason,
            inconsistency,
        }))
    }

    /// Applies an attendee edit. The price is left alone.
    pub async fn user_update(
        &self,
        registration_id: &str,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> EngineResult<Outcome<Registration>> {
        let mut registration = self.load_active_registration(registration_id).await?;

        if let Some(activity) = patch.activity {
            match activity {
                Some(activity) if activity_changed(&registration.selections, &activity) => {
                    let event = self.load_event(&registration.event_id).await?;
                    match self
                        .claim_seat(&event, &activity, Some(&registration.id))
                        .await?
                    {
                        Ok(canonical) => registration.selections.activity = Some(canonical),
                        Err(rejection) => {
                            warn!(registration_id = %registration.id, %rejection, "Attendee edit rejected");
                            return Ok(Outcome::Rejected(rejection));
                        }
                    }
                }
                Some(_) => {}
                None => registration.selections.activity = None,
            }
        }

        if let Some(name) = patch.spouse_name {
            registration.selections.spouse_name = Some(name);
        }

        registration.updated_at = now;
        self.db.registrations().update(&registration).await?;

        info!(registration_id = %registration.id, "Attendee edit saved");
        Ok(Outcome::Accepted(registration))
    }

    /// Settles what the attendee owes after the card gateway confirms.
    ///
    /// The stored total is authoritative; nothing from the client can
    /// change it here.
    pub async fn complete_user_payment(
        &self,
        registration_id: &str,
        payment_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult<Registration> {
        let existing = self.load_registration(registration_id).await?;
        let completion = apply_user_payment_completion(&existing, now)?;

        if let Some(inconsistency) = completion.payment.check_consistency(self.epsilon) {
            warn!(registration_id = %existing.id, %inconsistency, "Payment state inconsistent after completion");
        }

        let registration = Registration {
            payment: completion.payment,
            payment_reference: payment_reference.or(existing.payment_reference.clone()),
            updated_at: now,
            ..existing
        };
        self.db.registrations().update(&registration).await?;

        info!(
            registration_id = %registration.id,
            settled = %completion.settled,
            paid = registration.payment.is_paid(),
            "Payment completed"
        );
        Ok(registration)
    }

    /// Cancels a registration and frees its seat.
    ///
    /// Returns `false` if it was already cancelled.
    pub async fn cancel_registration(
        &self,
        registration_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let cancelled = self.db.registrations().cancel(registration_id, now).await?;
        if cancelled {
            info!(registration_id = %registration_id, "Registration cancelled");
        } else {
            debug!(registration_id = %registration_id, "Registration already cancelled");
        }
        Ok(cancelled)
    }

    /// Whether `activity` still has a free seat.
    ///
    /// `exclude_id` leaves the registration being edited out of the count.
    pub async fn check_activity_capacity(
        &self,
        event_id: &str,
        activity: &str,
        exclude_id: Option<&str>,
    ) -> EngineResult<bool> {
        let event = self.load_event(event_id).await?;
        Ok(self.claim_seat(&event, activity, exclude_id).await?.is_ok())
    }

    /// Recomputes every active registration of an event as of its
    /// `created_at` and reports the drift from the stored total.
    ///
    /// With `apply`, each drifted registration is pushed through the
    /// organizer reconciliation with the corrected price as an override.
    /// Rows carrying an `original_total_price` were already repriced by an
    /// organizer after creation, so their drift is reported but left alone.
    pub async fn reprice_event(
        &self,
        event_id: &str,
        apply: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<RepriceLine>> {
        let event = self.load_event(event_id).await?;
        let registrations = self.db.registrations().list_active_for_event(event_id).await?;

        let mut lines = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let discount = self.attached_discount(&registration).await?;
            let expected = compute_registration_price(
                &event,
                &registration.selections,
                discount.as_ref(),
                registration.created_at,
                &self.zone,
            );
            let stored_total = registration.payment.total_price;
            let drift = expected.total - stored_total;
            let organizer_adjusted = registration.payment.original_total_price.is_some();

            let mut applied = false;
            if apply && !drift.is_zero() && organizer_adjusted {
                warn!(
                    registration_id = %registration.id,
                    delta = %drift,
                    "Skipping organizer-adjusted registration"
                );
            } else if apply && !drift.is_zero() {
                let patch = AdminPatch {
                    price_override: Some(expected.total),
                    ..AdminPatch::default()
                };
                let reconciliation = reconcile_admin_update(
                    &registration,
                    &patch,
                    &event,
                    discount.as_ref(),
                    now,
                    &self.zone,
                )?;
                let corrected = Registration {
                    payment: reconciliation.payment,
                    discount_amount: expected.discount_amount,
                    updated_at: now,
                    ..registration.clone()
                };
                self.db.registrations().update(&corrected).await?;
                applied = true;
                info!(
                    registration_id = %registration.id,
                    delta = %drift,
                    "Stored total corrected"
                );
            }

            lines.push(RepriceLine {
                registration_id: registration.id,
                stored_total,
                expected_total: expected.total,
                drift,
                organizer_adjusted,
                applied,
            });
        }

        Ok(lines)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_event(&self, event_id: &str) -> EngineResult<Event> {
        self.db
            .events()
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| CoreError::EventNotFound(event_id.to_string()).into())
    }

    async fn load_registration(&self, registration_id: &str) -> EngineResult<Registration> {
        self.db
            .registrations()
            .get_by_id(registration_id)
            .await?
            .ok_or_else(|| CoreError::RegistrationNotFound(registration_id.to_string()).into())
    }

    async fn load_active_registration(&self, registration_id: &str) -> EngineResult<Registration> {
        let registration = self.load_registration(registration_id).await?;
        if !registration.is_committed() {
            return Err(CoreError::RegistrationCancelled(registration.id).into());
        }
        Ok(registration)
    }

    /// Checks that `activity` exists and has a free seat.
    ///
    /// Returns the event's spelling of the activity name on success.
    async fn claim_seat(
        &self,
        event: &Event,
        activity: &str,
        exclude_id: Option<&str>,
    ) -> EngineResult<Result<String, Rejection>> {
        let offered = event
            .activity(activity)
            .ok_or_else(|| CoreError::UnknownActivity {
                event_id: event.id.clone(),
                activity: activity.to_string(),
            })?;

        let committed = self
            .db
            .registrations()
            .count_committed(&event.id, &offered.name, exclude_id)
            .await?;

        match capacity::evaluate(offered.seat_limit, committed) {
            CapacityDecision::Full { seat_limit } => Ok(Err(Rejection::ActivityFull {
                activity: offered.name.clone(),
                seat_limit,
            })),
            decision => {
                debug!(event_id = %event.id, activity = %offered.name, ?decision, "Seat available");
                Ok(Ok(offered.name.clone()))
            }
        }
    }

    /// Looks up a code for an event and checks it can be applied now.
    async fn resolve_discount(
        &self,
        event_id: &str,
        raw: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Result<DiscountCode, Rejection>> {
        let code = normalize_code(raw).map_err(CoreError::from)?;
        let repo = self.db.discount_codes();

        let reject = |reason: DiscountRejection| -> EngineResult<Result<DiscountCode, Rejection>> {
            Ok(Err(Rejection::DiscountInvalid {
                code: code.clone(),
                reason,
            }))
        };

        let found = match repo.find_by_code(event_id, &code).await? {
            Some(found) => found,
            None => {
                return match repo.find_any_by_code(&code).await? {
                    Some(_) => reject(DiscountRejection::WrongEvent),
                    None => reject(DiscountRejection::NotFound),
                };
            }
        };

        match found.validate_for_event(event_id, now).into_result() {
            Ok(()) => Ok(Ok(found)),
            Err(reason) => reject(reason),
        }
    }

    /// The code already on a registration, for re-pricing.
    ///
    /// An attached code is not re-validated: it was valid when attached and
    /// keeps applying. A code whose row is gone applies its recorded amount.
    async fn attached_discount(
        &self,
        registration: &Registration,
    ) -> EngineResult<Option<DiscountCode>> {
        let Some(code) = registration.discount_code.as_deref() else {
            return Ok(None);
        };

        let found = self
            .db
            .discount_codes()
            .find_by_code(&registration.event_id, code)
            .await?;

        Ok(Some(found.unwrap_or_else(|| {
            warn!(
                registration_id = %registration.id,
                code = %code,
                "Attached discount code no longer exists; keeping recorded amount"
            );
            DiscountCode::fixed_snapshot(&registration.event_id, code, registration.discount_amount)
        })))
    }

    /// Counts one use of a code that was just attached.
    async fn consume_discount(
        &self,
        event_id: &str,
        code: &str,
        registration_id: &str,
    ) -> EngineResult<()> {
        let counted = self.db.discount_codes().increment_usage(event_id, code).await?;
        if !counted {
            warn!(
                registration_id = %registration_id,
                code = %code,
                "Discount code usage limit reached by a concurrent request; registration kept"
            );
        }
        Ok(())
    }
}

fn activity_changed(current: &Selections, requested: &str) -> bool {
    match current.activity.as_deref() {
        Some(existing) => !existing.trim().eq_ignore_ascii_case(requested.trim()),
        None => true,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
