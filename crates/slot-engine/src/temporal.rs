//! Operating-timezone normalization.
//!
//! Every local-time field in the engine (schedule hours, slot starts, slot
//! labels) is wall-clock time in one fixed operating timezone. Storage and
//! wire boundaries use UTC. [`TimeNormalizer`] is the only place the two
//! meet.
//!
//! # Wire timestamps
//!
//! Both forms are accepted and normalize identically:
//!
//! - zone-less ISO 8601 (`"2026-03-16T14:00"`, `"2026-03-16 14:00:00"`) is
//!   read as operating-local wall-clock time
//! - RFC 3339 with `Z` or an explicit offset (`"2026-03-16T18:00:00Z"`) is
//!   converted into the operating timezone first
//!
//! # DST
//!
//! A local time that occurs twice (fall-back) maps to the earlier instant.
//! A local time that never occurs (spring-forward gap) is an error rather
//! than a guess.

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::SlotError;

/// The operating timezone used when no override is configured.
///
/// All providers share it; there is no per-provider zone.
pub const DEFAULT_OPERATING_TIMEZONE: &str = "America/New_York";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Converts between operating-local wall-clock time and UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    tz: Tz,
}

impl TimeNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Build a normalizer from an IANA timezone name.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::InvalidTimezone`] if the name is not a valid IANA
    /// timezone.
    pub fn from_name(name: &str) -> Result<Self, SlotError> {
        parse_timezone(name).map(Self::new)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Convert an operating-local wall-clock time to a UTC instant.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::NonexistentLocalTime`] when `local` falls inside a
    /// spring-forward gap.
    pub fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, SlotError> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => Err(SlotError::NonexistentLocalTime(format!(
                "'{}' does not exist in {}",
                local,
                self.tz.name()
            ))),
        }
    }

    /// Convert a UTC instant to operating-local wall-clock time.
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz).naive_local()
    }

    /// The operating-local calendar date containing `instant`.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date()
    }

    /// Parse a wire timestamp into operating-local wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::InvalidTimestamp`] if `s` matches none of the
    /// accepted forms.
    pub fn parse_local(&self, s: &str) -> Result<NaiveDateTime, SlotError> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(self.to_local(dt.with_timezone(&Utc)));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .ok_or_else(|| {
                SlotError::InvalidTimestamp(format!(
                    "'{}': expected ISO 8601 local time or RFC 3339",
                    s
                ))
            })
    }

    /// Parse a wire timestamp straight to a UTC instant.
    pub fn parse_utc(&self, s: &str) -> Result<DateTime<Utc>, SlotError> {
        let local = self.parse_local(s)?;
        self.to_utc(local)
    }

    /// The UTC offset in effect around midday on `date` (e.g. `"-05:00"`).
    pub fn utc_offset_on(&self, date: NaiveDate) -> String {
        let offset_secs = self.offset_secs_on(date);
        format_utc_offset(offset_secs)
    }

    /// Whether daylight saving time is in effect around midday on `date`.
    pub fn dst_active_on(&self, date: NaiveDate) -> bool {
        // Compare against the January offset; if they differ, DST is on.
        let jan = NaiveDate::from_ymd_opt(date.year(), 1, 15).unwrap_or(date);
        self.offset_secs_on(date) != self.offset_secs_on(jan)
    }

    fn offset_secs_on(&self, date: NaiveDate) -> i32 {
        let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
        match self.tz.offset_from_local_datetime(&noon) {
            LocalResult::Single(o) | LocalResult::Ambiguous(o, _) => o.fix().local_minus_utc(),
            LocalResult::None => self.tz.offset_from_utc_datetime(&noon).fix().local_minus_utc(),
        }
    }
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::new(chrono_tz::America::New_York)
    }
}

/// Parse an IANA timezone string into `Tz`.
pub(crate) fn parse_timezone(s: &str) -> Result<Tz, SlotError> {
    s.parse::<Tz>()
        .map_err(|_| SlotError::InvalidTimezone(format!("'{}'", s)))
}

/// Format a UTC offset as a string (e.g., "-05:00", "+09:00").
fn format_utc_offset(offset_secs: i32) -> String {
    let sign = if offset_secs >= 0 { "+" } else { "-" };
    let abs_secs = offset_secs.unsigned_abs();
    let hours = abs_secs / 3600;
    let minutes = (abs_secs % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}

// ── Tests ───────────────────────────────────────────────────────────────────
