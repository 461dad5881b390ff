//! Provider working-schedule configuration.
//!
//! A [`ScheduleConfig`] is read fresh from the settings store on every engine
//! call and passed explicitly into each computation. Nothing here caches it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::SlotError;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Local wall-clock time of day at minute resolution. Wire form is `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: 0 };

    /// # Errors
    ///
    /// Returns [`SlotError::InvalidTimeOfDay`] if `hour >= 24` or `minute >= 60`.
    pub fn new(hour: u32, minute: u32) -> Result<Self, SlotError> {
        if hour >= 24 || minute >= 60 {
            return Err(SlotError::InvalidTimeOfDay(format!(
                "{hour:02}:{minute:02} is out of range"
            )));
        }
        Ok(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// Minutes since local midnight.
    pub fn minutes(self) -> u32 {
        self.minutes as u32
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.minutes() / 60, self.minutes() % 60, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotError::InvalidTimeOfDay(format!("'{s}': expected HH:MM"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = SlotError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// A provider's bookable working schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Weekday numbers, 0 = Sunday through 6 = Saturday. Empty means no
    /// bookable days.
    pub working_days: BTreeSet<u8>,
    pub start_time: TimeOfDay,
    /// `00:00` denotes midnight at the end of the day.
    pub end_time: TimeOfDay,
    pub session_duration_minutes: u32,
    #[serde(default)]
    pub break_between_sessions_minutes: u32,
    /// Global switch; when false the provider accepts no bookings.
    pub is_available: bool,
}

impl ScheduleConfig {
    /// Check the invariants the slot grid depends on.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::InvalidSchedule`] for a zero session length or a
    /// weekday number outside `0..=6`.
    pub fn validate(&self) -> Result<(), SlotError> {
        if self.session_duration_minutes == 0 {
            return Err(SlotError::InvalidSchedule(
                "session duration must be positive".to_string(),
            ));
        }
        if let Some(day) = self.working_days.iter().find(|d| **d > 6) {
            return Err(SlotError::InvalidSchedule(format!(
                "weekday {day} is outside 0 (Sunday)..6 (Saturday)"
            )));
        }
        Ok(())
    }

    /// Spacing between successive slot starts.
    pub fn grid_step_minutes(&self) -> u32 {
        self.session_duration_minutes + self.break_between_sessions_minutes
    }

    pub fn works_on(&self, weekday: Weekday) -> bool {
        self.working_days
            .contains(&(weekday.num_days_from_sunday() as u8))
    }

    /// The bookable window as minute offsets from local midnight, if any.
    ///
    /// An `end_time` of `00:00` closes the window at midnight ending the day.
    /// Any other `end_time` at or before `start_time` has no window; overnight
    /// spans are not supported.
    pub fn business_window(&self) -> Option<(u32, u32)> {
        let start = self.start_time.minutes();
        let end = if self.end_time == TimeOfDay::MIDNIGHT {
            MINUTES_PER_DAY
        } else {
            self.end_time.minutes()
        };
        (end > start).then_some((start, end))
    }

    /// Local datetime at which the business window opens on `date`.
    pub(crate) fn opening_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start_time.to_naive_time())
    }
}

/// Minutes since local midnight of `t`'s own date; `None` unless `t` falls on
/// a whole minute.
pub(crate) fn whole_minute_of_day(t: NaiveDateTime) -> Option<u32> {
    if t.second() != 0 || t.nanosecond() != 0 {
        return None;
    }
    Some(t.hour() * 60 + t.minute())
}

/// Weekday number on the 0 = Sunday convention used by `working_days`.
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekday_schedule() -> ScheduleConfig {
        ScheduleConfig {
            working_days: [1, 2, 3, 4, 5].into_iter().collect(),
            start_time: "10:00".parse().unwrap(),
            end_time: "18:00".parse().unwrap(),
            session_duration_minutes: 60,
            break_between_sessions_minutes: 0,
            is_available: true,
        }
    }

    #[test]
    fn test_time_of_day_parse_and_display() {
        let t: TimeOfDay = "9:05".parse().unwrap();
        assert_eq!(t.minutes(), 545);
        assert_eq!(t.to_string(), "09:05");
        assert_eq!("23:59".parse::<TimeOfDay>().unwrap().minutes(), 1439);
    }

    #[test]
    fn test_time_of_day_rejects_garbage() {
        for bad in ["24:00", "12:60", "1200", "12:5", ":30", "ab:cd", ""] {
            let err = bad.parse::<TimeOfDay>().unwrap_err();
            assert!(
                err.to_string().contains("Invalid time of day"),
                "{bad}: got {err}"
            );
        }
    }

    #[test]
    fn test_schedule_serde_wire_form() {
        let json = r#"{
            "working_days": [1, 2, 3, 4, 5],
            "start_time": "10:00",
            "end_time": "18:00",
            "session_duration_minutes": 60,
            "is_available": true
        }"#;
        let parsed: ScheduleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, weekday_schedule());

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["start_time"], "10:00");
        assert_eq!(out["break_between_sessions_minutes"], 0);
    }

    #[test]
    fn test_schedule_serde_rejects_bad_time() {
        let json = r#"{
            "working_days": [],
            "start_time": "25:00",
            "end_time": "18:00",
            "session_duration_minutes": 60,
            "is_available": true
        }"#;
        assert!(serde_json::from_str::<ScheduleConfig>(json).is_err());
    }

    #[test]
    fn test_validate_zero_session() {
        let mut s = weekday_schedule();
        s.session_duration_minutes = 0;
        s.break_between_sessions_minutes = 15;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("session duration"), "got: {err}");
    }

    #[test]
    fn test_validate_weekday_out_of_range() {
        let mut s = weekday_schedule();
        s.working_days.insert(7);
        assert!(s.validate().is_err());
        assert!(weekday_schedule().validate().is_ok());
    }

    #[test]
    fn test_grid_step_includes_break() {
        let mut s = weekday_schedule();
        s.session_duration_minutes = 45;
        s.break_between_sessions_minutes = 15;
        assert_eq!(s.grid_step_minutes(), 60);
    }

    #[test]
    fn test_works_on_uses_sunday_zero() {
        let s = weekday_schedule();
        assert!(s.works_on(Weekday::Mon));
        assert!(s.works_on(Weekday::Fri));
        assert!(!s.works_on(Weekday::Sun));
        assert!(!s.works_on(Weekday::Sat));
    }

    #[test]
    fn test_business_window() {
        let mut s = weekday_schedule();
        assert_eq!(s.business_window(), Some((600, 1080)));

        s.end_time = TimeOfDay::MIDNIGHT;
        assert_eq!(s.business_window(), Some((600, 1440)));

        s.end_time = "09:00".parse().unwrap();
        assert_eq!(s.business_window(), None);

        s.end_time = s.start_time;
        assert_eq!(s.business_window(), None);
    }

    #[test]
    fn test_whole_minute_of_day() {
        let t = NaiveDate::from_ymd_opt(2026, 3, 16)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(whole_minute_of_day(t), Some(870));
        let with_secs = t + chrono::Duration::seconds(5);
        assert_eq!(whole_minute_of_day(with_secs), None);
    }

    #[test]
    fn test_weekday_number() {
        // March 15 2026 is a Sunday
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(weekday_number(sunday), 0);
        assert_eq!(weekday_number(sunday.succ_opt().unwrap()), 1);
    }
}
