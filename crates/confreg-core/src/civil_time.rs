//! # Civil Time Zone Resolver
//!
//! Converts calendar dates into UTC instants in one fixed regional zone.
//!
//! ## Why Not The Server Clock's Zone?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "Early-bird ends 2025-12-11" means the END of Dec 11 where the         │
//! │  conference happens, not where the server is deployed.                  │
//! │                                                                         │
//! │  civil zone: America/New_York (configurable)                            │
//! │                                                                         │
//! │  midnight(2025-12-11)         = 2025-12-11T05:00:00Z   (EST, -05:00)    │
//! │  end_of_day_succ(2025-12-11)  = 2025-12-12T05:00:00Z   (exclusive)      │
//! │                                                                         │
//! │  Any instant t with  midnight <= t < end_of_day_succ  is "on Dec 11".   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm
//! Guess UTC midnight, read the civil wall clock at that instant, shift the
//! guess by the observed difference, and repeat until the wall clock reads
//! 00:00. Offsets change at most once around a midnight, so this converges
//! in two corrections. When midnight itself is skipped by a DST jump the
//! guesses oscillate around the gap, and the civil day starts at the first
//! candidate whose wall-clock date is the requested date.
//!
//! ## Parse Fallback
//! Boundary strings that are not `YYYY-MM-DD` are parsed as UTC timestamps
//! and a warning is logged. Strings that are not dates at all are treated
//! as an open bound. Availability wins over precision here: a typo in a tier
//! date must not take registration offline.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::ValidationError;

/// Zone used when configuration does not name one.
pub const DEFAULT_CIVIL_ZONE: &str = "America/New_York";

/// Wall-clock corrections attempted before treating midnight as skipped.
const MAX_CORRECTIONS: usize = 4;

/// Calendar format of tier boundaries and the breakfast cutoff.
const CALENDAR_FORMAT: &str = "%Y-%m-%d";

/// Timestamp shapes accepted by the UTC fallback, after RFC 3339.
const FALLBACK_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

// =============================================================================
// Civil Zone
// =============================================================================

/// The fixed regional zone for all date-boundary math.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilZone {
    tz: Tz,
}

impl CivilZone {
    /// Wraps an IANA zone.
    pub const fn new(tz: Tz) -> Self {
        CivilZone { tz }
    }

    /// Looks up a zone by its IANA name (e.g. `"America/Chicago"`).
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        name.trim()
            .parse::<Tz>()
            .map(CivilZone::new)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "civil_zone".to_string(),
                reason: format!("'{}' is not an IANA time zone", name.trim()),
            })
    }

    /// The underlying zone.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// The IANA name of the zone.
    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Current instant.
    ///
    /// Instants are zone-independent, so comparing this against resolved
    /// boundaries is always well-defined. Pricing functions never call this;
    /// callers read the clock once and thread `now` through.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// The civil calendar date an instant falls on.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// The UTC instant at which `date` begins in the civil zone.
    pub fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let target = date.and_time(NaiveTime::MIN);
        let mut guess = Utc.from_utc_datetime(&target);
        let mut candidates = Vec::with_capacity(MAX_CORRECTIONS + 1);

        for _ in 0..=MAX_CORRECTIONS {
            let wall = guess.with_timezone(&self.tz).naive_local();
            if wall == target {
                return guess;
            }
            candidates.push(guess);
            guess -= wall - target;
        }

        // Midnight is inside a DST gap.
        candidates
            .into_iter()
            .filter(|candidate| self.date_of(*candidate) == date)
            .min()
            .unwrap_or_else(|| {
                warn!(
                    %date,
                    zone = self.name(),
                    "Civil midnight did not converge; using UTC midnight"
                );
                Utc.from_utc_datetime(&target)
            })
    }

    /// The start of the civil day AFTER `date`: an exclusive upper bound,
    /// so an end date of Dec 11 covers all of Dec 11.
    pub fn end_of_day_succ(&self, date: NaiveDate) -> DateTime<Utc> {
        match date.succ_opt() {
            Some(next) => self.midnight(next),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Resolves an inclusive start boundary. `None` means unbounded.
    pub fn resolve_start(&self, raw: &str) -> Option<DateTime<Utc>> {
        self.resolve(raw, Boundary::Start)
    }

    /// Resolves an exclusive end boundary. `None` means unbounded.
    pub fn resolve_end(&self, raw: &str) -> Option<DateTime<Utc>> {
        self.resolve(raw, Boundary::End)
    }

    fn resolve(&self, raw: &str, boundary: Boundary) -> Option<DateTime<Utc>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, CALENDAR_FORMAT) {
            return Some(match boundary {
                Boundary::Start => self.midnight(date),
                Boundary::End => self.end_of_day_succ(date),
            });
        }

        match parse_naive_utc(trimmed) {
            Some(instant) => {
                warn!(
                    raw = %trimmed,
                    zone = self.name(),
                    "Boundary is not a calendar date; interpreting it as a UTC timestamp"
                );
                Some(instant)
            }
            None => {
                warn!(raw = %trimmed, "Unparseable boundary date; treating it as open");
                None
            }
        }
    }
}

impl Default for CivilZone {
    fn default() -> Self {
        CivilZone::new(chrono_tz::America::New_York)
    }
}

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Start,
    End,
}

/// Parses timestamps without consulting the civil zone.
fn parse_naive_utc(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    FALLBACK_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_midnight_in_standard_time() {
        let zone = CivilZone::default();
        assert_eq!(zone.midnight(date(2025, 12, 11)), utc("2025-12-11T05:00:00Z"));
    }

    #[test]
    fn test_midnight_in_daylight_time() {
        let zone = CivilZone::default();
        assert_eq!(zone.midnight(date(2025, 7, 4)), utc("2025-07-04T04:00:00Z"));
    }

    #[test]
    fn test_end_of_day_succ_is_next_midnight() {
        let zone = CivilZone::default();
        assert_eq!(
            zone.end_of_day_succ(date(2025, 12, 11)),
            utc("2025-12-12T05:00:00Z")
        );
    }

    #[test]
    fn test_fall_back_day_lasts_25_hours() {
        let zone = CivilZone::default();
        let start = zone.midnight(date(2025, 11, 2));
        let end = zone.end_of_day_succ(date(2025, 11, 2));
        assert_eq!(start, utc("2025-11-02T04:00:00Z"));
        assert_eq!(end, utc("2025-11-03T05:00:00Z"));
        assert_eq!((end - start).num_hours(), 25);
    }

    #[test]
    fn test_spring_forward_day_lasts_23_hours() {
        let zone = CivilZone::default();
        let start = zone.midnight(date(2025, 3, 9));
        let end = zone.end_of_day_succ(date(2025, 3, 9));
        assert_eq!((end - start).num_hours(), 23);
    }

    #[test]
    fn test_midnight_skipped_by_dst_gap() {
        // Chile springs forward at local midnight: 2024-09-08 00:00 never
        // happens, the day starts at 01:00 -03:00.
        let zone = CivilZone::from_name("America/Santiago").unwrap();
        let start = zone.midnight(date(2024, 9, 8));
        assert_eq!(start, utc("2024-09-08T04:00:00Z"));
        assert_eq!(zone.date_of(start), date(2024, 9, 8));
        assert_eq!(zone.date_of(start - chrono::Duration::seconds(1)), date(2024, 9, 7));
    }

    #[test]
    fn test_zone_independent_of_utc_offset_sign() {
        let tokyo = CivilZone::from_name("Asia/Tokyo").unwrap();
        assert_eq!(tokyo.midnight(date(2025, 1, 1)), utc("2024-12-31T15:00:00Z"));
    }

    #[test]
    fn test_resolve_calendar_boundaries() {
        let zone = CivilZone::default();
        assert_eq!(zone.resolve_start("2025-12-11"), Some(utc("2025-12-11T05:00:00Z")));
        assert_eq!(zone.resolve_end("2025-12-11"), Some(utc("2025-12-12T05:00:00Z")));
        assert_eq!(zone.resolve_end("   "), None);
    }

    #[test]
    fn test_resolve_falls_back_to_utc_timestamp() {
        let zone = CivilZone::default();
        assert_eq!(
            zone.resolve_end("2025-12-11T10:30:00Z"),
            Some(utc("2025-12-11T10:30:00Z"))
        );
        assert_eq!(
            zone.resolve_start("2025-12-11 10:30:00"),
            Some(utc("2025-12-11T10:30:00Z"))
        );
    }

    #[test]
    fn test_resolve_garbage_is_open() {
        let zone = CivilZone::default();
        assert_eq!(zone.resolve_start("next tuesday"), None);
        assert_eq!(zone.resolve_end("2025-13-45"), None);
    }

    #[test]
    fn test_unknown_zone_rejected() {
        assert!(CivilZone::from_name("Mars/Olympus_Mons").is_err());
        assert_eq!(CivilZone::from_name(DEFAULT_CIVIL_ZONE).unwrap().name(), "America/New_York");
    }
}
