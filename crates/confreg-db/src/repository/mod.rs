//! # Repository Module
//!
//! Database repository implementations for the registration engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  RegistrationService                                                   │
//! │       │                                                                 │
//! │       │  db.registrations().count_committed("evt", "Golf", None)       │
//! │       ▼                                                                 │
//! │  RegistrationRepository                                                │
//! │  ├── insert / update / get_by_id                                       │
//! │  ├── count_committed                                                   │
//! │  └── cancel                                                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Rows are mapped into confreg-core types at this boundary; nothing     │
//! │  above it sees cents columns or flag integers.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`EventRepository`](event::EventRepository) - Events, tier lists, activities
//! - [`DiscountCodeRepository`](discount::DiscountCodeRepository) - Codes and usage counts
//! - [`RegistrationRepository`](registration::RegistrationRepository) - Registrations and seats

pub mod discount;
pub mod event;
pub mod registration;
