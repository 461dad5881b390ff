//! Booking validation.
//!
//! A request enters as [`ValidationState::Received`] and passes through the
//! gates in a fixed order. The first gate that fails moves it to
//! [`ValidationState::Rejected`] with that gate's reason and no later gate
//! runs; a request that clears every gate ends [`ValidationState::Accepted`].
//!
//! | # | Gate            | Rejection                 |
//! |---|-----------------|---------------------------|
//! | 1 | availability    | `PROVIDER_NOT_ACCEPTING`  |
//! | 2 | working day     | `DAY_OFF`                 |
//! | 3 | business hours  | `OUTSIDE_BUSINESS_HOURS`  |
//! | 4 | grid alignment  | `MISALIGNED_SLOT`         |
//! | 5 | overlap         | `TIME_CONFLICT`           |
//!
//! No gate adjusts the request (for example by snapping to the nearest slot).
//! Validation here is advisory; the ledger re-checks overlap atomically when
//! the hold is written.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::conflict::{has_conflict, Interval};
use crate::error::SlotError;
use crate::reservation::ProviderId;
use crate::schedule::{whole_minute_of_day, ScheduleConfig};
use crate::temporal::TimeNormalizer;

/// A client's request to book a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub provider_id: ProviderId,
    pub service_duration_minutes: i64,
    /// Minor currency units.
    #[serde(default)]
    pub price_amount: u64,
    /// Wire timestamp; zone-less means operating-local time.
    pub requested_start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Why a request was turned away. Every reason is client-correctable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    ProviderNotAccepting,
    DayOff,
    OutsideBusinessHours,
    MisalignedSlot,
    TimeConflict,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::ProviderNotAccepting => "PROVIDER_NOT_ACCEPTING",
            RejectionReason::DayOff => "DAY_OFF",
            RejectionReason::OutsideBusinessHours => "OUTSIDE_BUSINESS_HOURS",
            RejectionReason::MisalignedSlot => "MISALIGNED_SLOT",
            RejectionReason::TimeConflict => "TIME_CONFLICT",
        }
    }

    /// Message suitable for showing to the person booking.
    pub fn message(&self) -> &'static str {
        match self {
            RejectionReason::ProviderNotAccepting => {
                "This provider is not accepting bookings right now."
            }
            RejectionReason::DayOff => "The provider does not work on the requested day.",
            RejectionReason::OutsideBusinessHours => {
                "The requested time falls outside the provider's working hours."
            }
            RejectionReason::MisalignedSlot => {
                "The requested time does not match an available slot start."
            }
            RejectionReason::TimeConflict => "The requested time is already booked.",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationState {
    Received,
    Accepted,
    Rejected(RejectionReason),
}

impl ValidationState {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationState::Accepted)
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            ValidationState::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// A request whose timestamp and duration have been normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposedBooking {
    pub start_local: NaiveDateTime,
    pub duration_minutes: u32,
}

impl ProposedBooking {
    /// Parse and check the input fields of `request`.
    ///
    /// # Errors
    ///
    /// [`SlotError::InvalidRequest`] for a non-positive duration,
    /// [`SlotError::InvalidTimestamp`] for an unparsable start.
    pub fn from_request(
        request: &BookingRequest,
        normalizer: &TimeNormalizer,
    ) -> Result<Self, SlotError> {
        if request.service_duration_minutes <= 0 {
            return Err(SlotError::InvalidRequest(format!(
                "service duration must be positive, got {}",
                request.service_duration_minutes
            )));
        }
        let duration_minutes = u32::try_from(request.service_duration_minutes).map_err(|_| {
            SlotError::InvalidRequest(format!(
                "service duration {} is too large",
                request.service_duration_minutes
            ))
        })?;
        let start_local = normalizer.parse_local(&request.requested_start)?;
        Ok(Self {
            start_local,
            duration_minutes,
        })
    }

    pub fn interval(&self) -> Interval<NaiveDateTime> {
        Interval::starting_at(self.start_local, self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Availability,
    WorkingDay,
    BusinessHours,
    Alignment,
    Overlap,
}

const GATE_ORDER: [Gate; 5] = [
    Gate::Availability,
    Gate::WorkingDay,
    Gate::BusinessHours,
    Gate::Alignment,
    Gate::Overlap,
];

/// Runs a proposed booking through the gates for one provider schedule.
#[derive(Debug, Clone, Copy)]
pub struct BookingValidator<'a> {
    config: &'a ScheduleConfig,
}

impl<'a> BookingValidator<'a> {
    pub fn new(config: &'a ScheduleConfig) -> Self {
        Self { config }
    }

    /// Drive `proposed` from `Received` to a final state.
    ///
    /// `busy` must be the provider's blocking reservations in local time,
    /// read fresh for this call.
    pub fn validate(
        &self,
        proposed: &ProposedBooking,
        busy: &[Interval<NaiveDateTime>],
    ) -> ValidationState {
        let state = GATE_ORDER
            .iter()
            .fold(ValidationState::Received, |state, gate| match state {
                ValidationState::Received => match self.check(*gate, proposed, busy) {
                    Some(reason) => ValidationState::Rejected(reason),
                    None => ValidationState::Received,
                },
                done => done,
            });
        match state {
            ValidationState::Received => ValidationState::Accepted,
            done => done,
        }
    }

    fn check(
        &self,
        gate: Gate,
        proposed: &ProposedBooking,
        busy: &[Interval<NaiveDateTime>],
    ) -> Option<RejectionReason> {
        let passed = match gate {
            Gate::Availability => self.config.is_available,
            Gate::WorkingDay => self.config.works_on(proposed.start_local.weekday()),
            Gate::BusinessHours => self.within_business_hours(proposed),
            Gate::Alignment => self.on_grid(proposed),
            Gate::Overlap => !has_conflict(&proposed.interval(), busy),
        };
        if passed {
            return None;
        }
        Some(match gate {
            Gate::Availability => RejectionReason::ProviderNotAccepting,
            Gate::WorkingDay => RejectionReason::DayOff,
            Gate::BusinessHours => RejectionReason::OutsideBusinessHours,
            Gate::Alignment => RejectionReason::MisalignedSlot,
            Gate::Overlap => RejectionReason::TimeConflict,
        })
    }

    fn within_business_hours(&self, proposed: &ProposedBooking) -> bool {
        let Some((open, close)) = self.config.business_window() else {
            return false;
        };
        let midnight = proposed.start_local.date().and_time(NaiveTime::MIN);
        let window = Interval::new(
            midnight + Duration::minutes(open as i64),
            midnight + Duration::minutes(close as i64),
        );
        window.contains(&proposed.interval())
    }

    fn on_grid(&self, proposed: &ProposedBooking) -> bool {
        let step = self.config.grid_step_minutes();
        let open = self.config.start_time.minutes();
        match whole_minute_of_day(proposed.start_local) {
            Some(minute) if step > 0 && minute >= open => (minute - open) % step == 0,
            _ => false,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
