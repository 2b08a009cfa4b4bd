//! # Database Errors
//!
//! `sqlx` failures, sorted into the cases callers branch on.
//!
//! ```text
//! sqlx::Error ──► DbError ──► EngineError::Db ──► ErrorCode
//!                    │
//!                    ├─ constraint failures   → ValidationError at the request layer
//!                    ├─ NotFound              → NotFound
//!                    └─ everything else       → DatabaseError, never retried here
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Same discount code twice for one event, or a reused registration id.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at an event that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Negative money, a negative seat limit, or `used_count` past
    /// `usage_limit`.
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a schema constraint refused the write.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::CheckViolation { .. }
        )
    }

    /// Sorts a SQLite error message by constraint kind.
    ///
    /// SQLite only reports the kind in the text:
    /// `UNIQUE constraint failed: discount_codes.event_id, discount_codes.code`,
    /// `FOREIGN KEY constraint failed`, `CHECK constraint failed: ...`.
    fn from_sqlite_message(message: &str) -> Self {
        if let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ") {
            let field = columns
                .split(", ")
                .map(|column| column.rsplit('.').next().unwrap_or(column))
                .collect::<Vec<_>>()
                .join(", ");
            return DbError::duplicate(field, "unknown");
        }
        if message.starts_with("FOREIGN KEY constraint failed") {
            return DbError::ForeignKeyViolation {
                message: message.to_string(),
            };
        }
        if message.starts_with("CHECK constraint failed") {
            return DbError::CheckViolation {
                message: message.to_string(),
            };
        }
        DbError::QueryFailed(message.to_string())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_sqlite_messages() {
        let err = DbError::from_sqlite_message(
            "UNIQUE constraint failed: discount_codes.event_id, discount_codes.code",
        );
        assert!(
            matches!(&err, DbError::UniqueViolation { field, .. } if field == "event_id, code")
        );
        assert!(err.is_constraint());

        let err = DbError::from_sqlite_message("CHECK constraint failed: used_count <= usage_limit");
        assert!(matches!(err, DbError::CheckViolation { .. }));

        let err = DbError::from_sqlite_message("FOREIGN KEY constraint failed");
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let err = DbError::from_sqlite_message("no such table: tiers");
        assert!(matches!(err, DbError::QueryFailed(_)));
        assert!(!err.is_constraint());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(
            DbError::not_found("Registration", "reg-1").to_string(),
            "Registration not found: reg-1"
        );
        assert_eq!(
            DbError::duplicate("code", "SAVE20").to_string(),
            "Duplicate code: 'SAVE20' already exists"
        );
    }
}
