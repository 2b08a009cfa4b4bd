//! # Registration Repository
//!
//! Persistence for registrations and the committed-seat count behind the
//! capacity guard.
//!
//! ## Payment Columns
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PaymentState (tagged)            registrations row (flat)              │
//! │  ─────────────────────            ──────────────────────────────────    │
//! │  total_price           ◄────────► total_price_cents                     │
//! │  status.is_paid()      ◄────────► paid                                  │
//! │  status.paid_amount()  ◄────────► paid_amount_cents                     │
//! │  status.pending_amount ◄────────► pending_payment_amount_cents          │
//! │  status.reason()       ◄────────► pending_payment_reason                │
//! │  original_total_price  ◄────────► original_total_price_cents            │
//! │  paid_at               ◄────────► paid_at                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows that claim `paid = 1` while still carrying a pending amount are
//! loaded as partially paid and logged.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};

use confreg_core::{
    Money, PaymentColumns, PaymentState, Registration, RegistrationStatus, Selections,
};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct RegistrationRow {
    id: String,
    event_id: String,
    user_id: String,
    status: RegistrationStatus,
    cancelled_at: Option<DateTime<Utc>>,
    wants_spouse: bool,
    spouse_name: Option<String>,
    wants_breakfast: bool,
    child_count: u32,
    activity: Option<String>,
    discount_code: Option<String>,
    discount_amount_cents: i64,
    total_price_cents: i64,
    paid: bool,
    paid_amount_cents: i64,
    pending_payment_amount_cents: i64,
    pending_payment_reason: Option<String>,
    original_total_price_cents: Option<i64>,
    paid_at: Option<DateTime<Utc>>,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RegistrationRow {
    fn into_registration(self) -> Registration {
        let (payment, inconsistency) = PaymentState::from_columns(PaymentColumns {
            total_price: Money::from_cents(self.total_price_cents),
            paid: self.paid,
            paid_amount: Money::from_cents(self.paid_amount_cents),
            pending_payment_amount: Money::from_cents(self.pending_payment_amount_cents),
            pending_payment_reason: self.pending_payment_reason,
            original_total_price: self.original_total_price_cents.map(Money::from_cents),
            paid_at: self.paid_at,
        });

        if let Some(inconsistency) = inconsistency {
            warn!(
                registration_id = %self.id,
                %inconsistency,
                "Stored payment columns conflict; loaded as partially paid"
            );
        }

        Registration {
            id: self.id,
            event_id: self.event_id,
            user_id: self.user_id,
            status: self.status,
            cancelled_at: self.cancelled_at,
            selections: Selections {
                wants_spouse: self.wants_spouse,
                spouse_name: self.spouse_name,
                wants_breakfast: self.wants_breakfast,
                child_count: self.child_count,
                activity: self.activity,
            },
            discount_code: self.discount_code,
            discount_amount: Money::from_cents(self.discount_amount_cents),
            payment,
            payment_reference: self.payment_reference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, event_id, user_id, status, cancelled_at,
        wants_spouse, spouse_name, wants_breakfast, child_count, activity,
        discount_code, discount_amount_cents,
        total_price_cents, paid, paid_amount_cents,
        pending_payment_amount_cents, pending_payment_reason,
        original_total_price_cents, paid_at, payment_reference,
        created_at, updated_at
    FROM registrations
"#;

/// Repository for registrations.
#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: SqlitePool,
}

impl RegistrationRepository {
    /// Creates a new RegistrationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegistrationRepository { pool }
    }

    /// Inserts a new registration.
    pub async fn insert(&self, registration: &Registration) -> DbResult<()> {
        debug!(
            registration_id = %registration.id,
            event_id = %registration.event_id,
            total = %registration.payment.total_price,
            "Inserting registration"
        );

        let columns = registration.payment.to_columns();
        let selections = &registration.selections;

        sqlx::query(
            r#"
            INSERT INTO registrations (
                id, event_id, user_id, status, cancelled_at,
                wants_spouse, spouse_name, wants_breakfast, child_count, activity,
                discount_code, discount_amount_cents,
                total_price_cents, paid, paid_amount_cents,
                pending_payment_amount_cents, pending_payment_reason,
                original_total_price_cents, paid_at, payment_reference,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17,
                ?18, ?19, ?20,
                ?21, ?22
            )
            "#,
        )
        .bind(&registration.id)
        .bind(&registration.event_id)
        .bind(&registration.user_id)
        .bind(registration.status)
        .bind(registration.cancelled_at)
        .bind(selections.wants_spouse)
        .bind(&selections.spouse_name)
        .bind(selections.wants_breakfast)
        .bind(selections.child_count)
        .bind(&selections.activity)
        .bind(&registration.discount_code)
        .bind(registration.discount_amount.cents())
        .bind(columns.total_price.cents())
        .bind(columns.paid)
        .bind(columns.paid_amount.cents())
        .bind(columns.pending_payment_amount.cents())
        .bind(columns.pending_payment_reason)
        .bind(columns.original_total_price.map(|m| m.cents()))
        .bind(columns.paid_at)
        .bind(&registration.payment_reference)
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes back every mutable field of a registration.
    pub async fn update(&self, registration: &Registration) -> DbResult<()> {
        debug!(registration_id = %registration.id, "Updating registration");

        let columns = registration.payment.to_columns();
        let selections = &registration.selections;

        let result = sqlx::query(
            r#"
            UPDATE registrations SET
                status = ?2,
                cancelled_at = ?3,
                wants_spouse = ?4,
                spouse_name = ?5,
                wants_breakfast = ?6,
                child_count = ?7,
                activity = ?8,
                discount_code = ?9,
                discount_amount_cents = ?10,
                total_price_cents = ?11,
                paid = ?12,
                paid_amount_cents = ?13,
                pending_payment_amount_cents = ?14,
                pending_payment_reason = ?15,
                original_total_price_cents = ?16,
                paid_at = ?17,
                payment_reference = ?18,
                updated_at = ?19
            WHERE id = ?1
            "#,
        )
        .bind(&registration.id)
        .bind(registration.status)
        .bind(registration.cancelled_at)
        .bind(selections.wants_spouse)
        .bind(&selections.spouse_name)
        .bind(selections.wants_breakfast)
        .bind(selections.child_count)
        .bind(&selections.activity)
        .bind(&registration.discount_code)
        .bind(registration.discount_amount.cents())
        .bind(columns.total_price.cents())
        .bind(columns.paid)
        .bind(columns.paid_amount.cents())
        .bind(columns.pending_payment_amount.cents())
        .bind(columns.pending_payment_reason)
        .bind(columns.original_total_price.map(|m| m.cents()))
        .bind(columns.paid_at)
        .bind(&registration.payment_reference)
        .bind(registration.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Registration", &registration.id));
        }

        Ok(())
    }

    /// Gets a registration by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Registration>> {
        let row: Option<RegistrationRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(RegistrationRow::into_registration))
    }

    /// Lists the active registrations of an event, oldest first.
    pub async fn list_active_for_event(&self, event_id: &str) -> DbResult<Vec<Registration>> {
        let rows: Vec<RegistrationRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE event_id = ?1 AND status = 'active' AND cancelled_at IS NULL ORDER BY created_at, id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(event_id = %event_id, count = rows.len(), "Listed active registrations");
        Ok(rows.into_iter().map(RegistrationRow::into_registration).collect())
    }

    /// Counts registrations that hold a seat in an activity.
    ///
    /// A registration holds a seat when it is active and has no
    /// cancellation timestamp. Activity names compare case-insensitively.
    /// `exclude_id` leaves one registration out, so an edit does not count
    /// against its own seat.
    pub async fn count_committed(
        &self,
        event_id: &str,
        activity: &str,
        exclude_id: Option<&str>,
    ) -> DbResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM registrations
            WHERE event_id = ?1
              AND activity = ?2
              AND status = 'active'
              AND cancelled_at IS NULL
              AND (?3 IS NULL OR id <> ?3)
            "#,
        )
        .bind(event_id)
        .bind(activity.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        debug!(event_id = %event_id, activity = %activity, count, "Counted committed seats");
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Cancels a registration, freeing its seat.
    ///
    /// ## Returns
    /// * `Ok(true)` - The registration was active and is now cancelled
    /// * `Ok(false)` - It was already cancelled
    pub async fn cancel(&self, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE registrations SET
                status = 'cancelled',
                cancelled_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish "already cancelled" from "no such registration".
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM registrations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(false),
            None => Err(DbError::not_found("Registration", id)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::fixtures::{sample_event, sample_registration};
    use confreg_core::{payment, Actor};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.events().insert(&sample_event("evt-1")).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = db.registrations();
        let mut reg = sample_registration("reg-1", "evt-1", Some("Golf"));
        reg.payment = payment::on_create(Money::from_major(500), Actor::Privileged, false, reg.created_at);
        repo.insert(&reg).await.unwrap();

        let loaded = repo.get_by_id("reg-1").await.unwrap().unwrap();
        assert_eq!(loaded.payment, reg.payment);
        assert_eq!(loaded.selections, reg.selections);
        assert_eq!(loaded.status, RegistrationStatus::Active);
        assert!(repo.get_by_id("reg-x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_event_rejected() {
        let db = setup().await;
        let reg = sample_registration("reg-1", "evt-missing", None);
        let err = db.registrations().insert(&reg).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_count_committed_ignores_case_and_cancelled() {
        let db = setup().await;
        let repo = db.registrations();
        repo.insert(&sample_registration("reg-1", "evt-1", Some("Golf")))
            .await
            .unwrap();
        repo.insert(&sample_registration("reg-2", "evt-1", Some("golf")))
            .await
            .unwrap();
        repo.insert(&sample_registration("reg-3", "evt-1", Some("City Tour")))
            .await
            .unwrap();

        assert_eq!(repo.count_committed("evt-1", "GOLF", None).await.unwrap(), 2);
        assert_eq!(
            repo.count_committed("evt-1", "Golf", Some("reg-1")).await.unwrap(),
            1
        );

        assert!(repo.cancel("reg-2", Utc::now()).await.unwrap());
        assert_eq!(repo.count_committed("evt-1", "Golf", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let db = setup().await;
        let repo = db.registrations();
        repo.insert(&sample_registration("reg-1", "evt-1", None))
            .await
            .unwrap();

        assert!(repo.cancel("reg-1", Utc::now()).await.unwrap());
        assert!(!repo.cancel("reg-1", Utc::now()).await.unwrap());
        assert!(matches!(
            repo.cancel("reg-x", Utc::now()).await,
            Err(DbError::NotFound { .. })
        ));

        let loaded = repo.get_by_id("reg-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, RegistrationStatus::Cancelled);
        assert!(loaded.cancelled_at.is_some());
        assert!(repo.list_active_for_event("evt-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_writes_payment_columns() {
        let db = setup().await;
        let repo = db.registrations();
        let mut reg = sample_registration("reg-1", "evt-1", None);
        reg.payment = payment::on_create(Money::from_major(500), Actor::Attendee, true, reg.created_at);
        repo.insert(&reg).await.unwrap();

        reg.payment
            .apply_increase(Money::from_major(200), "Spouse ticket added ($200.00)");
        reg.selections.wants_spouse = true;
        repo.update(&reg).await.unwrap();

        let loaded = repo.get_by_id("reg-1").await.unwrap().unwrap();
        let columns = loaded.payment.to_columns();
        assert_eq!(columns.total_price, Money::from_major(700));
        assert_eq!(columns.pending_payment_amount, Money::from_major(200));
        assert_eq!(columns.original_total_price, Some(Money::from_major(500)));
        assert!(!columns.paid);
        assert!(loaded.selections.wants_spouse);

        let missing = sample_registration("reg-x", "evt-1", None);
        assert!(matches!(
            repo.update(&missing).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_legacy_paid_with_pending_row_loads_as_partial() {
        let db = setup().await;
        let repo = db.registrations();
        repo.insert(&sample_registration("reg-1", "evt-1", None))
            .await
            .unwrap();

        sqlx::query(
            "UPDATE registrations SET paid = 1, paid_amount_cents = 50000, pending_payment_amount_cents = 20000 WHERE id = ?1",
        )
        .bind("reg-1")
        .execute(db.pool())
        .await
        .unwrap();

        let loaded = repo.get_by_id("reg-1").await.unwrap().unwrap();
        assert!(!loaded.payment.is_paid());
        assert_eq!(loaded.payment.pending_amount(), Money::from_major(200));
    }
}
