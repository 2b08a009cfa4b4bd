//! # Engine Error Type
//!
//! Unified error type for [`RegistrationService`](crate::RegistrationService)
//! operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  confreg-core ── CoreError ──┐                                         │
//! │                              │                                          │
//! │  confreg-db ──── DbError ────┼──► EngineError ──► code() ──► caller    │
//! │                              │                                          │
//! │  config ──────── ConfigError ┘                                         │
//! │                                                                         │
//! │  Full activities and invalid discount codes never take this path.      │
//! │  They come back as Outcome::Rejected.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use confreg_core::CoreError;
use confreg_db::DbError;

use crate::config::ConfigError;

/// Errors returned by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Machine-readable error codes for the request layer.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Registration not found: reg-123" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Database operation failed (500)
    DatabaseError,

    /// Business rule refused the request (422)
    BusinessLogic,

    /// Engine misconfigured
    ConfigError,
}

impl EngineError {
    /// Classifies the error for the request layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(err) => match err {
                CoreError::EventNotFound(_) | CoreError::RegistrationNotFound(_) => {
                    ErrorCode::NotFound
                }
                CoreError::UnknownActivity { .. } | CoreError::Validation(_) => {
                    ErrorCode::ValidationError
                }
                CoreError::RegistrationCancelled(_) => ErrorCode::BusinessLogic,
            },
            EngineError::Db(DbError::NotFound { .. }) => ErrorCode::NotFound,
            EngineError::Db(err) if err.is_constraint() => ErrorCode::ValidationError,
            EngineError::Db(_) => ErrorCode::DatabaseError,
            EngineError::Config(_) => ErrorCode::ConfigError,
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
