//! # Discount Code Repository
//!
//! Lookup and usage counting for discount codes.
//!
//! ## Usage Counting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate()           read-only, in confreg-core                     │
//! │  2. registration write   INSERT / UPDATE registrations                  │
//! │  3. increment_usage()    UPDATE ... SET used_count = used_count + 1     │
//! │                          WHERE usage_limit IS NULL                      │
//! │                             OR used_count < usage_limit                 │
//! │                                                                         │
//! │  Step 3 runs only after step 2 succeeded. When two requests race for    │
//! │  the last use, the conditional UPDATE lets exactly one through and the  │
//! │  other sees 0 rows affected. used_count can never pass usage_limit.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use confreg_core::{DiscountCode, DiscountType};

use crate::error::DbResult;

#[derive(Debug, FromRow)]
struct DiscountCodeRow {
    id: String,
    event_id: String,
    code: String,
    discount_type: DiscountType,
    discount_value: i64,
    expiry_date: Option<DateTime<Utc>>,
    usage_limit: Option<u32>,
    used_count: u32,
}

impl From<DiscountCodeRow> for DiscountCode {
    fn from(row: DiscountCodeRow) -> Self {
        DiscountCode {
            id: row.id,
            event_id: row.event_id,
            code: row.code,
            discount_type: row.discount_type,
            discount_value: row.discount_value,
            expiry_date: row.expiry_date,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, event_id, code, discount_type, discount_value,
           expiry_date, usage_limit, used_count
    FROM discount_codes
"#;

/// Repository for discount codes.
#[derive(Debug, Clone)]
pub struct DiscountCodeRepository {
    pool: SqlitePool,
}

impl DiscountCodeRepository {
    /// Creates a new DiscountCodeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountCodeRepository { pool }
    }

    /// Inserts a discount code. The code must already be normalized.
    pub async fn insert(&self, code: &DiscountCode) -> DbResult<()> {
        debug!(event_id = %code.event_id, code = %code.code, "Inserting discount code");

        sqlx::query(
            r#"
            INSERT INTO discount_codes (
                id, event_id, code, discount_type, discount_value,
                expiry_date, usage_limit, used_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&code.id)
        .bind(&code.event_id)
        .bind(&code.code)
        .bind(code.discount_type)
        .bind(code.discount_value)
        .bind(code.expiry_date)
        .bind(code.usage_limit)
        .bind(code.used_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finds a code for an event by its normalized text.
    pub async fn find_by_code(&self, event_id: &str, code: &str) -> DbResult<Option<DiscountCode>> {
        debug!(event_id = %event_id, code = %code, "Looking up discount code");

        let row: Option<DiscountCodeRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE event_id = ?1 AND code = ?2"))
                .bind(event_id)
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(DiscountCode::from))
    }

    /// Finds a code by its normalized text, whatever event it belongs to.
    ///
    /// Used to tell "no such code" apart from "code for another event".
    pub async fn find_any_by_code(&self, code: &str) -> DbResult<Option<DiscountCode>> {
        let row: Option<DiscountCodeRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE code = ?1 LIMIT 1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(DiscountCode::from))
    }

    /// Consumes one use of a code if any remain.
    ///
    /// ## Returns
    /// * `Ok(true)` - `used_count` was incremented
    /// * `Ok(false)` - the limit was already reached, or the code is gone
    pub async fn increment_usage(&self, event_id: &str, code: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE discount_codes
            SET used_count = used_count + 1
            WHERE event_id = ?1
              AND code = ?2
              AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(event_id)
        .bind(code)
        .execute(&self.pool)
        .await?;

        let incremented = result.rows_affected() == 1;
        debug!(event_id = %event_id, code = %code, incremented, "Discount usage update");
        Ok(incremented)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
