//! # confreg-core: Pure Pricing & Payment Logic
//!
//! Date-sensitive tier pricing in a fixed civil time zone, discount rules,
//! capacity decisions and the registration payment state machine. No I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Conference Registration Engine                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              confreg-engine (RegistrationService)               │   │
//! │  │   quote, create, admin_update, complete_payment, cancel, ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ confreg-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   civil_time ──► tier ──► pricing ──► discount                  │   │
//! │  │                                │                                │   │
//! │  │                  capacity ─────┴──► payment                     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS IN PRICING              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  confreg-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, committed-seat counts        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`civil_time`] - Calendar date → UTC instant in the civil zone
//! - [`tier`] - Active tier selection with last-tier fallback
//! - [`pricing`] - Price composition and discount application
//! - [`discount`] - Discount code validation
//! - [`capacity`] - Seat-limit admission decision
//! - [`payment`] - Payment state machine and reconciliation
//! - [`money`] - Integer-cent money type
//! - [`types`] - Events, tiers, codes, registrations
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use confreg_core::pricing::compute_registration_price;
//! use confreg_core::{CivilZone, Event, Money, PriceTier, Selections};
//!
//! let event = Event {
//!     id: "evt-1".to_string(),
//!     name: "Annual Conference".to_string(),
//!     default_price: Money::from_major(500),
//!     registration_tiers: vec![
//!         PriceTier::dated("Early", Money::from_major(400), None, Some("2025-12-11")),
//!         PriceTier::open("Regular", Money::from_major(500)),
//!     ],
//!     spouse_tiers: vec![],
//!     child_tiers: vec![],
//!     breakfast_price: None,
//!     breakfast_end_date: None,
//!     activities: vec![],
//! };
//!
//! // 11pm on Dec 11 in New York is still early-bird.
//! let now = Utc.with_ymd_and_hms(2025, 12, 12, 4, 0, 0).unwrap();
//! let quote = compute_registration_price(
//!     &event,
//!     &Selections::default(),
//!     None,
//!     now,
//!     &CivilZone::default(),
//! );
//! assert_eq!(quote.total.to_decimal_string(), "400.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod capacity;
pub mod civil_time;
pub mod discount;
pub mod error;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod tier;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use capacity::CapacityDecision;
pub use civil_time::{CivilZone, DEFAULT_CIVIL_ZONE};
pub use discount::{DiscountRejection, DiscountValidation};
pub use error::{CoreError, CoreResult, Inconsistency, ValidationError};
pub use money::Money;
pub use payment::{AdminPatch, PaymentColumns, PaymentState, PaymentStatus};
pub use pricing::{PriceBreakdown, PriceQuote};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum child tickets on one registration.
///
/// Catches typos like 20 instead of 2 before they turn into a pending
/// balance the attendee has to dispute.
pub const MAX_CHILDREN_PER_REGISTRATION: u32 = 20;

/// Maximum length of a normalized discount code.
pub const MAX_DISCOUNT_CODE_LEN: usize = 32;
