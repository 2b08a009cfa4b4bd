//! # Capacity Guard
//!
//! The admission decision for a seat-limited activity. Counting committed
//! registrations is a storage concern (`confreg-db`); this module only
//! compares the count against the limit.
//!
//! ```text
//! seat_limit   committed   decision
//! ──────────   ─────────   ─────────────────────────
//! None         any         Unlimited
//! Some(2)      1           Available { remaining: 1 }
//! Some(2)      2           Full { seat_limit: 2 }
//! ```
//!
//! The count and the subsequent write are separate statements, so two
//! concurrent creates can both observe a free seat. The storage layer does
//! not add a constraint for this; over-admission under load is possible.

use serde::{Deserialize, Serialize};

/// Whether one more registration fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapacityDecision {
    Unlimited,
    Available { remaining: u32 },
    Full { seat_limit: u32 },
}

impl CapacityDecision {
    /// `true` unless the activity is full.
    pub fn admits(&self) -> bool {
        !matches!(self, CapacityDecision::Full { .. })
    }
}

/// Decides admission for one more registration.
///
/// `committed` must already exclude the registration being edited.
pub fn evaluate(seat_limit: Option<u32>, committed: u32) -> CapacityDecision {
    match seat_limit {
        None => CapacityDecision::Unlimited,
        Some(limit) if committed >= limit => CapacityDecision::Full { seat_limit: limit },
        Some(limit) => CapacityDecision::Available {
            remaining: limit - committed,
        },
    }
}
