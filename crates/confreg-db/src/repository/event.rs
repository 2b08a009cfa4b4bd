//! # Event Repository
//!
//! Stores events together with their tier lists and activities.
//!
//! ## Layout
//! ```text
//! events ─┬─< price_tiers  (category, position)  position = list order
//!         └─< activities   (name COLLATE NOCASE, seat_limit)
//! ```
//!
//! An event and its children are written in one transaction, so a reader
//! never sees an event without its tiers.

use chrono::Utc;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use confreg_core::{Activity, Event, Money, PriceTier, TierCategory};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct EventRow {
    id: String,
    name: String,
    default_price_cents: i64,
    breakfast_price_cents: Option<i64>,
    breakfast_end_date: Option<String>,
}

#[derive(Debug, FromRow)]
struct TierRow {
    category: TierCategory,
    label: String,
    price_cents: i64,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    name: String,
    seat_limit: Option<u32>,
}

/// Repository for events, tiers and activities.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Creates a new EventRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    /// Inserts an event with all of its tiers and activities.
    pub async fn insert(&self, event: &Event) -> DbResult<()> {
        debug!(event_id = %event.id, name = %event.name, "Inserting event");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO events (
                id, name, default_price_cents,
                breakfast_price_cents, breakfast_end_date,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.default_price.cents())
        .bind(event.breakfast_price.map(|price| price.cents()))
        .bind(&event.breakfast_end_date)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for category in TierCategory::ALL {
            insert_tiers(&mut tx, &event.id, category, event.tiers(category)).await?;
        }

        for (position, activity) in event.activities.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO activities (event_id, position, name, seat_limit)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&event.id)
            .bind(position as i64)
            .bind(activity.name.trim())
            .bind(activity.seat_limit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Replaces one tier list of an event, keeping the given order.
    pub async fn replace_tiers(
        &self,
        event_id: &str,
        category: TierCategory,
        tiers: &[PriceTier],
    ) -> DbResult<()> {
        debug!(event_id = %event_id, ?category, count = tiers.len(), "Replacing tiers");

        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE events SET updated_at = ?2 WHERE id = ?1")
            .bind(event_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Event", event_id));
        }

        sqlx::query("DELETE FROM price_tiers WHERE event_id = ?1 AND category = ?2")
            .bind(event_id)
            .bind(category)
            .execute(&mut *tx)
            .await?;

        insert_tiers(&mut tx, event_id, category, tiers).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Gets an event snapshot by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Event))` - Event found, tiers in list order
    /// * `Ok(None)` - Event not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, default_price_cents, breakfast_price_cents, breakfast_end_date
            FROM events
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tiers: Vec<TierRow> = sqlx::query_as(
            r#"
            SELECT category, label, price_cents, start_date, end_date
            FROM price_tiers
            WHERE event_id = ?1
            ORDER BY category, position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let activities: Vec<ActivityRow> = sqlx::query_as(
            r#"
            SELECT name, seat_limit
            FROM activities
            WHERE event_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut event = Event {
            id: row.id,
            name: row.name,
            default_price: Money::from_cents(row.default_price_cents),
            registration_tiers: Vec::new(),
            spouse_tiers: Vec::new(),
            child_tiers: Vec::new(),
            breakfast_price: row.breakfast_price_cents.map(Money::from_cents),
            breakfast_end_date: row.breakfast_end_date,
            activities: activities
                .into_iter()
                .map(|a| Activity {
                    name: a.name,
                    seat_limit: a.seat_limit,
                })
                .collect(),
        };

        for tier in tiers {
            let list = match tier.category {
                TierCategory::Registration => &mut event.registration_tiers,
                TierCategory::Spouse => &mut event.spouse_tiers,
                TierCategory::Child => &mut event.child_tiers,
            };
            list.push(PriceTier {
                label: tier.label,
                price: Money::from_cents(tier.price_cents),
                start_date: tier.start_date,
                end_date: tier.end_date,
            });
        }

        debug!(event_id = %id, "Loaded event snapshot");
        Ok(Some(event))
    }
}

async fn insert_tiers(
    tx: &mut Transaction<'_, Sqlite>,
    event_id: &str,
    category: TierCategory,
    tiers: &[PriceTier],
) -> DbResult<()> {
    for (position, tier) in tiers.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO price_tiers (
                event_id, category, position, label, price_cents, start_date, end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(event_id)
        .bind(category)
        .bind(position as i64)
        .bind(&tier.label)
        .bind(tier.price.cents())
        .bind(&tier.start_date)
        .bind(&tier.end_date)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::fixtures::sample_event;

    #[tokio::test]
    async fn test_insert_and_load_event() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.events();
        repo.insert(&sample_event("evt-1")).await.unwrap();

        let event = repo.get_by_id("evt-1").await.unwrap().unwrap();
        assert_eq!(event.default_price, Money::from_major(450));
        assert_eq!(event.registration_tiers.len(), 2);
        assert_eq!(event.registration_tiers[0].label, "Early");
        assert_eq!(event.registration_tiers[1].label, "Regular");
        assert_eq!(event.spouse_tiers[0].price, Money::from_major(200));
        assert!(event.child_tiers.is_empty());
        assert_eq!(event.breakfast_price, Some(Money::from_major(40)));
        assert_eq!(event.activities[0].seat_limit, Some(2));
        assert_eq!(event.activities[1].seat_limit, None);
    }

    #[tokio::test]
    async fn test_missing_event() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.events().get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_tiers_keeps_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.events();
        repo.insert(&sample_event("evt-1")).await.unwrap();

        let tiers = vec![
            PriceTier::open("Late", Money::from_major(550)),
            PriceTier::open("Walk-in", Money::from_major(600)),
        ];
        repo.replace_tiers("evt-1", TierCategory::Registration, &tiers)
            .await
            .unwrap();

        let event = repo.get_by_id("evt-1").await.unwrap().unwrap();
        assert_eq!(event.registration_tiers, tiers);
        assert_eq!(event.spouse_tiers.len(), 1);

        let err = repo
            .replace_tiers("evt-x", TierCategory::Spouse, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_activity_names_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut event = sample_event("evt-1");
        event.activities.push(Activity {
            name: "GOLF".to_string(),
            seat_limit: None,
        });
        let err = db.events().insert(&event).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(db.events().get_by_id("evt-1").await.unwrap().is_none());
    }
}
