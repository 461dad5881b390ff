//! Slot generation for a single working day.
//!
//! Slots start at `start_time` and step by `session + break` minutes. A slot
//! is emitted only if its whole session fits before `end_time`; slots are
//! never truncated. The output depends on nothing but the arguments.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::conflict::Interval;
use crate::schedule::ScheduleConfig;

/// Ordered local start times of the bookable slots on `date`.
///
/// Empty when the provider is not accepting bookings, `date` is not a working
/// day, there is no business window, or not even one session fits.
pub fn generate_slots(config: &ScheduleConfig, date: NaiveDate) -> Vec<NaiveDateTime> {
    if !config.is_available || !config.works_on(date.weekday()) {
        return Vec::new();
    }
    let session = config.session_duration_minutes;
    let step = config.grid_step_minutes();
    if session == 0 || step == 0 {
        return Vec::new();
    }
    let Some((open, close)) = config.business_window() else {
        return Vec::new();
    };

    let midnight = date.and_time(NaiveTime::MIN);
    (open..)
        .step_by(step as usize)
        .take_while(|offset| offset + session <= close)
        .map(|offset| midnight + Duration::minutes(offset as i64))
        .collect()
}

/// The interval a session starting at `start` would occupy.
pub fn slot_interval(config: &ScheduleConfig, start: NaiveDateTime) -> Interval<NaiveDateTime> {
    Interval::starting_at(start, config.session_duration_minutes as i64)
}

// ── Tests ───────────────────────────────────────────────────────────────────
