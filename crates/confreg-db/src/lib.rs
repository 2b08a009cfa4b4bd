//! # confreg-db: Database Layer for the Registration Engine
//!
//! SQLite persistence for events, discount codes and registrations, using
//! sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Registration Data Flow                               │
//! │                                                                         │
//! │  RegistrationService (confreg-engine)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    confreg-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │   │   │
//! │  │   │               │    │ EventRepo      │   │              │   │   │
//! │  │   │ SqlitePool    │◄───│ DiscountRepo   │   │ 001_init.sql │   │   │
//! │  │   │               │    │ RegistrationRepo│  │              │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Capacity counts and discount-usage increments are separate statements
//! from the registration write. The discount counter is guarded by a
//! conditional UPDATE and a CHECK constraint; seat counts are not, so
//! concurrent creates can over-admit an activity.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use confreg_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./confreg.db")).await?;
//! let event = db.events().get_by_id("evt-1").await?;
//! let taken = db.registrations().count_committed("evt-1", "Golf", None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::discount::DiscountCodeRepository;
pub use repository::event::EventRepository;
pub use repository::registration::RegistrationRepository;
