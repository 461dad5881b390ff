//! Per-day availability: generated slots annotated booked/free.
//!
//! The composition is read-only. Callers fetch reservations for the whole
//! range in one ledger query and pass them in; [`compute_availability`] never
//! touches storage.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::conflict::{has_conflict, Interval};
use crate::error::SlotError;
use crate::schedule::{weekday_number, ScheduleConfig};
use crate::slots::{generate_slots, slot_interval};
use crate::temporal::TimeNormalizer;

/// One candidate slot as presented to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start_local: NaiveDateTime,
    /// Display label, e.g. `"2:00 PM"`.
    pub label: String,
    pub is_booked: bool,
}

/// All slots of one operating-local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u8,
    /// UTC offset of the operating timezone on this date (e.g. `"-04:00"`).
    pub utc_offset: String,
    pub slots: Vec<TimeSlot>,
}

impl DayAvailability {
    pub fn free_slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter().filter(|s| !s.is_booked)
    }

    /// True when the day has slots and every one is booked.
    pub fn is_fully_booked(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|s| s.is_booked)
    }
}

/// The local dates `from, from+1, .., from+days-1`, stopping early at the
/// last representable date.
pub fn date_range(from: NaiveDate, days: u32) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take(days as usize)
}

/// UTC bounds `[start of first day, start of day after last)` for a single
/// ledger range query covering `days` local days from `from`.
///
/// # Errors
///
/// [`SlotError::InvalidRequest`] when the day after the range is not a
/// representable date.
pub fn utc_bounds(
    normalizer: &TimeNormalizer,
    from: NaiveDate,
    days: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SlotError> {
    let end = from
        .checked_add_days(Days::new(days as u64))
        .ok_or_else(|| {
            SlotError::InvalidRequest(format!("{days} days from {from} is out of range"))
        })?;
    Ok((day_start_utc(normalizer, from), day_start_utc(normalizer, end)))
}

/// Start of a local day as a UTC instant. Midnight can fall in a DST gap in
/// some zones, so fall back to the first valid hour.
fn day_start_utc(normalizer: &TimeNormalizer, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|h| normalizer.to_utc(midnight + Duration::hours(h)).ok())
        .unwrap_or_else(|| midnight.and_utc())
}

/// Annotate one day's slots against local busy intervals.
pub fn day_availability(
    config: &ScheduleConfig,
    date: NaiveDate,
    busy: &[Interval<NaiveDateTime>],
    normalizer: &TimeNormalizer,
) -> DayAvailability {
    // Starts inside a spring-forward gap never happen on the wall clock.
    let slots = generate_slots(config, date)
        .into_iter()
        .filter(|start| normalizer.to_utc(*start).is_ok())
        .map(|start| TimeSlot {
            start_local: start,
            label: format_slot_label(start),
            is_booked: has_conflict(&slot_interval(config, start), busy),
        })
        .collect();

    DayAvailability {
        date,
        weekday: weekday_number(date),
        utc_offset: normalizer.utc_offset_on(date),
        slots,
    }
}

/// Availability for `days` consecutive local days starting at `from`.
///
/// `busy` holds the blocking reservations over the whole range in local
/// time. Days without free slots are kept so callers can render them as
/// fully booked.
pub fn compute_availability(
    config: &ScheduleConfig,
    from: NaiveDate,
    days: u32,
    busy: &[Interval<NaiveDateTime>],
    normalizer: &TimeNormalizer,
) -> Vec<DayAvailability> {
    date_range(from, days)
        .map(|date| {
            let day_end = date
                .succ_opt()
                .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN));
            let day = Interval::new(date.and_time(NaiveTime::MIN), day_end);
            let todays: Vec<_> = busy.iter().copied().filter(|b| b.overlaps(&day)).collect();
            day_availability(config, date, &todays, normalizer)
        })
        .collect()
}

fn format_slot_label(start: NaiveDateTime) -> String {
    start.format("%-I:%M %p").to_string()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
    }

    fn config() -> ScheduleConfig {
        ScheduleConfig {
            working_days: [1, 2, 3, 4, 5].into_iter().collect(),
            start_time: "10:00".parse().unwrap(),
            end_time: "18:00".parse().unwrap(),
            session_duration_minutes: 60,
            break_between_sessions_minutes: 0,
            is_available: true,
        }
    }

    fn local(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_single_booking_marks_one_slot() {
        let busy = [Interval::starting_at(local(monday(), 14, 0), 60)];
        let day = day_availability(&config(), monday(), &busy, &TimeNormalizer::default());
        assert_eq!(day.slots.len(), 8);
        let booked: Vec<_> = day.slots.iter().filter(|s| s.is_booked).collect();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].start_local, local(monday(), 14, 0));
        assert_eq!(booked[0].label, "2:00 PM");
        assert_eq!(day.weekday, 1);
        assert_eq!(day.utc_offset, "-04:00");
    }

    #[test]
    fn test_partial_overlap_books_both_neighbours() {
        let busy = [Interval::starting_at(local(monday(), 12, 30), 60)];
        let day = day_availability(&config(), monday(), &busy, &TimeNormalizer::default());
        let booked: Vec<_> = day
            .slots
            .iter()
            .filter(|s| s.is_booked)
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(booked, ["12:00 PM", "1:00 PM"]);
    }

    #[test]
    fn test_back_to_back_booking_leaves_neighbours_free() {
        let busy = [Interval::starting_at(local(monday(), 11, 0), 60)];
        let day = day_availability(&config(), monday(), &busy, &TimeNormalizer::default());
        assert_eq!(day.free_slots().count(), 7);
    }

    #[test]
    fn test_fully_booked_day_still_returned() {
        let busy = [Interval::new(local(monday(), 9, 0), local(monday(), 19, 0))];
        let days = compute_availability(&config(), monday(), 1, &busy, &TimeNormalizer::default());
        assert_eq!(days.len(), 1);
        assert!(days[0].is_fully_booked());
        assert_eq!(days[0].free_slots().count(), 0);
    }

    #[test]
    fn test_range_keeps_days_off_with_no_slots() {
        // Mon 16 .. Sun 29 March 2026
        let days = compute_availability(&config(), monday(), 14, &[], &TimeNormalizer::default());
        assert_eq!(days.len(), 14);
        let weekend: Vec<_> = days.iter().filter(|d| d.slots.is_empty()).collect();
        assert_eq!(weekend.len(), 4);
        assert!(weekend.iter().all(|d| d.weekday == 0 || d.weekday == 6));
        assert!(!weekend[0].is_fully_booked());
    }

    #[test]
    fn test_busy_intervals_land_on_their_own_day() {
        let tuesday = monday().succ_opt().unwrap();
        let busy = [Interval::starting_at(local(tuesday, 10, 0), 60)];
        let days = compute_availability(&config(), monday(), 2, &busy, &TimeNormalizer::default());
        assert_eq!(days[0].free_slots().count(), 8);
        assert!(days[1].slots[0].is_booked);
    }

    #[test]
    fn test_utc_bounds_cover_local_days() {
        let n = TimeNormalizer::default();
        let (start, end) = utc_bounds(&n, monday(), 14).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-16T04:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-03-30T04:00:00+00:00");
    }

    #[test]
    fn test_utc_bounds_across_dst_change() {
        // Sat Mar 7 .. Mon Mar 9 2026 spans the spring-forward on Mar 8.
        let n = TimeNormalizer::default();
        let sat = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let (start, end) = utc_bounds(&n, sat, 2).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-07T05:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-03-09T04:00:00+00:00");
    }

    #[test]
    fn test_utc_bounds_past_last_date_is_invalid_request() {
        let n = TimeNormalizer::default();
        let err = utc_bounds(&n, NaiveDate::MAX, 1).unwrap_err();
        assert!(matches!(err, SlotError::InvalidRequest(_)), "got: {err}");
        assert!(utc_bounds(&n, NaiveDate::MAX.pred_opt().unwrap(), 1).is_ok());
        assert_eq!(date_range(NaiveDate::MAX, 3).count(), 1);
    }

    fn around_the_clock() -> ScheduleConfig {
        ScheduleConfig {
            working_days: (0..=6).collect(),
            start_time: "00:00".parse().unwrap(),
            end_time: "04:00".parse().unwrap(),
            session_duration_minutes: 60,
            break_between_sessions_minutes: 0,
            is_available: true,
        }
    }

    fn labels(day: &DayAvailability) -> Vec<(&str, bool)> {
        day.slots
            .iter()
            .map(|s| (s.label.as_str(), s.is_booked))
            .collect()
    }

    #[test]
    fn test_spring_forward_gap_start_is_not_offered() {
        // 02:00-03:00 does not exist in New York on 2026-03-08.
        let n = TimeNormalizer::default();
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let day = day_availability(&around_the_clock(), sunday, &[], &n);
        assert_eq!(
            labels(&day),
            [("12:00 AM", false), ("1:00 AM", false), ("3:00 AM", false)]
        );
        assert!(day.slots.iter().all(|s| n.to_utc(s.start_local).is_ok()));
    }

    #[test]
    fn test_fall_back_repeated_hour_booked_by_either_instant() {
        use crate::reservation::{Reservation, ReservationStatus};
        use chrono::TimeZone;

        let n = TimeNormalizer::default();
        let sunday = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 30, 12, 0, 0).unwrap();
        // 05:00Z is 01:00 EDT, 06:00Z is 01:00 EST: the same wall-clock hour.
        for start_utc in [
            Utc.with_ymd_and_hms(2026, 11, 1, 5, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 11, 1, 6, 0, 0).unwrap(),
        ] {
            let mut r = Reservation::pending(1, "p1".into(), start_utc, 60, now, None);
            r.status = ReservationStatus::Confirmed;
            let busy = crate::conflict::busy_intervals(&[r], &n, now);
            let days = compute_availability(&around_the_clock(), sunday, 1, &busy, &n);
            assert_eq!(
                labels(&days[0]),
                [
                    ("12:00 AM", false),
                    ("1:00 AM", true),
                    ("2:00 AM", false),
                    ("3:00 AM", false)
                ],
                "reservation at {start_utc}"
            );
        }

        let (start, end) = utc_bounds(&n, sunday, 1).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-11-01T04:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-11-02T05:00:00+00:00");
    }

    #[test]
    fn test_label_format() {
        assert_eq!(format_slot_label(local(monday(), 9, 30)), "9:30 AM");
        assert_eq!(format_slot_label(local(monday(), 0, 0)), "12:00 AM");
    }
}
