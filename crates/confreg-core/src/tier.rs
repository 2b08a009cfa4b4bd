//! # Tier Selector
//!
//! Picks the active price tier for an instant.
//!
//! ## Selection Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tiers (list order = authorial intent)                                  │
//! │                                                                         │
//! │  [0] Early-bird   start: -           end: 2025-10-31                    │
//! │  [1] Regular      start: 2025-11-01  end: 2025-12-11                    │
//! │  [2] Late         start: 2025-12-12  end: 2026-01-15                    │
//! │  [3] Walk-in      start: -           end: -                             │
//! │                                                                         │
//! │  1. First tier with  start <= instant < end  wins                       │
//! │     (missing start = -inf, end resolved to the next civil midnight)     │
//! │  2. No match  → LAST tier in the list (not the cheapest, not latest)    │
//! │  3. Empty list → None                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::civil_time::CivilZone;
use crate::types::PriceTier;

/// Whether `instant` lies inside a tier's `[start, end)` window.
pub fn tier_contains(tier: &PriceTier, instant: DateTime<Utc>, zone: &CivilZone) -> bool {
    let after_start = tier
        .start_date
        .as_deref()
        .and_then(|raw| zone.resolve_start(raw))
        .map_or(true, |start| start <= instant);

    let before_end = tier
        .end_date
        .as_deref()
        .and_then(|raw| zone.resolve_end(raw))
        .map_or(true, |end| instant < end);

    after_start && before_end
}

/// Selects the tier active at `instant`.
///
/// Returns the first tier whose window contains the instant, the last tier
/// when none do, or `None` for an empty list.
pub fn select_tier<'a>(
    tiers: &'a [PriceTier],
    instant: DateTime<Utc>,
    zone: &CivilZone,
) -> Option<&'a PriceTier> {
    tiers
        .iter()
        .find(|tier| tier_contains(tier, instant, zone))
        .or_else(|| tiers.last())
}

// =============================================================================
// Unit Tests
// =============================================================================
