//! # confreg-engine: Registration Orchestration
//!
//! Ties the pure pricing and payment logic of `confreg-core` to the SQLite
//! repositories of `confreg-db`, and carries the ambient pieces every
//! binary needs: configuration, tracing, and a single error type.
//!
//! ## Request Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller ──► RegistrationService::admin_update(id, patch, now)          │
//! │                 │                                                       │
//! │                 ├─ read registration + event      (confreg-db)         │
//! │                 ├─ seat check / discount check    (confreg-db + core)  │
//! │                 ├─ reconcile_admin_update          (confreg-core)       │
//! │                 ├─ write registration             (confreg-db)         │
//! │                 └─ count discount use             (confreg-db)         │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  EngineResult<Outcome<AdminUpdateResult>>                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use confreg_engine::{init_tracing, EngineConfig, RegistrationService};
//!
//! let config = EngineConfig::load(None)?;
//! init_tracing(&config.logging);
//! let service = RegistrationService::from_config(&config).await?;
//! let quote = service.quote("evt-1", &selections, Some("SAVE20"), chrono::Utc::now()).await?;
//! ```

pub mod config;
pub mod error;
pub mod outcome;
pub mod service;
pub mod telemetry;

pub use config::{ConfigError, DatabaseSettings, EngineConfig, LoggingSettings, PricingSettings};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use outcome::{Outcome, Rejection};
pub use service::{
    AdminUpdateResult, NewRegistration, RegistrationService, RepriceLine, UserPatch,
};
pub use telemetry::init_tracing;
