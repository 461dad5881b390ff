//! The caller-facing booking engine.
//!
//! [`BookingEngine`] wires a [`ScheduleStore`], a [`ReservationLedger`] and a
//! [`TimeNormalizer`] together. It holds no per-provider state: every call
//! reads the schedule and the reservations it needs at that moment.
//!
//! Callers provide `now`; the engine never reads the system clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::availability::{compute_availability, utc_bounds, DayAvailability};
use crate::config::{EngineConfig, MAX_AVAILABILITY_DAYS};
use crate::conflict::{busy_intervals, Interval};
use crate::error::{LedgerError, Result, SlotError};
use crate::ledger::{NewReservation, ReservationLedger, ScheduleStore};
use crate::reservation::{Reservation, ReservationId, ReservationStatus};
use crate::schedule::ScheduleConfig;
use crate::temporal::TimeNormalizer;
use crate::validator::{
    BookingRequest, BookingValidator, ProposedBooking, RejectionReason, ValidationState,
};

/// Result of [`BookingEngine::validate_and_reserve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingOutcome {
    /// A PENDING hold was written.
    Reserved { reservation: Reservation },
    Rejected { reason: RejectionReason },
}

impl BookingOutcome {
    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            BookingOutcome::Reserved { reservation } => Some(reservation),
            BookingOutcome::Rejected { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            BookingOutcome::Reserved { .. } => None,
            BookingOutcome::Rejected { reason } => Some(*reason),
        }
    }
}

pub struct BookingEngine<S, L> {
    config: EngineConfig,
    normalizer: TimeNormalizer,
    schedules: S,
    ledger: L,
}

impl<S: ScheduleStore, L: ReservationLedger> BookingEngine<S, L> {
    pub fn new(config: EngineConfig, schedules: S, ledger: L) -> Self {
        let normalizer = TimeNormalizer::new(config.operating_timezone);
        Self {
            config,
            normalizer,
            schedules,
            ledger,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        &self.normalizer
    }

    pub fn schedules(&self) -> &S {
        &self.schedules
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Annotated slots for `days` local days starting at `from`.
    ///
    /// Reservations for the whole range come from a single ledger query.
    ///
    /// # Errors
    ///
    /// [`SlotError::UnknownProvider`], [`SlotError::InvalidRequest`] for a
    /// range outside `1..=366` days or one running past the last
    /// representable date, or any ledger failure.
    pub fn get_availability(
        &self,
        provider_id: &str,
        from: NaiveDate,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DayAvailability>> {
        if days == 0 || days > MAX_AVAILABILITY_DAYS {
            return Err(SlotError::InvalidRequest(format!(
                "availability range must be within 1..={MAX_AVAILABILITY_DAYS} days, got {days}"
            )));
        }
        let schedule = self.schedule(provider_id)?;
        let (range_start, range_end) = utc_bounds(&self.normalizer, from, days)?;
        let reservations = self
            .ledger
            .reservations_between(provider_id, range_start, range_end)?;
        let busy = busy_intervals(&reservations, &self.normalizer, now);
        debug!(
            provider_id,
            %from,
            days,
            blocking = busy.len(),
            "computing availability"
        );
        Ok(compute_availability(
            &schedule,
            from,
            days,
            &busy,
            &self.normalizer,
        ))
    }

    /// Availability for the configured default range starting today
    /// (operating-local date of `now`).
    pub fn upcoming_availability(
        &self,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<DayAvailability>> {
        let today = self.normalizer.local_date(now);
        self.get_availability(provider_id, today, self.config.availability_days, now)
    }

    /// Run every gate against a fresh ledger read without writing anything.
    ///
    /// A request that passes every gate but names a local time skipped by a
    /// DST transition is an error, the same as in
    /// [`validate_and_reserve`](Self::validate_and_reserve).
    pub fn validate(&self, request: &BookingRequest, now: DateTime<Utc>) -> Result<ValidationState> {
        let schedule = self.schedule(&request.provider_id)?;
        let proposed = ProposedBooking::from_request(request, &self.normalizer)?;
        let state = self.run_gates(&request.provider_id, &schedule, &proposed, now)?;
        if state.is_accepted() {
            self.normalizer.to_utc(proposed.start_local)?;
        }
        Ok(state)
    }

    /// Validate `request` against the live ledger and, if every gate passes,
    /// write a PENDING hold.
    ///
    /// Business-rule failures come back as [`BookingOutcome::Rejected`]. A
    /// conflict raised by the ledger's own commit-time check (another request
    /// won the race after validation passed) is reported the same way as
    /// `TIME_CONFLICT`.
    ///
    /// # Errors
    ///
    /// Input errors (unknown provider, bad timestamp, non-positive duration,
    /// nonexistent local time) and ledger failures. Ledger failures are never
    /// read as "slot free".
    pub fn validate_and_reserve(
        &self,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome> {
        let provider_id = request.provider_id.as_str();
        let schedule = self.schedule(provider_id)?;
        let proposed = ProposedBooking::from_request(request, &self.normalizer)?;

        let state = self.run_gates(provider_id, &schedule, &proposed, now)?;
        if let Some(reason) = state.rejection() {
            debug!(provider_id, start = %proposed.start_local, %reason, "booking rejected");
            return Ok(BookingOutcome::Rejected { reason });
        }
        let start_utc = self.normalizer.to_utc(proposed.start_local)?;

        let new = NewReservation {
            provider_id: request.provider_id.clone(),
            start_utc,
            duration_minutes: proposed.duration_minutes,
            price_amount: request.price_amount,
            notes: request.notes.clone(),
            location: request.location.clone(),
            hold_ttl: self.config.hold_ttl,
        };
        match self.ledger.insert_pending(new, now) {
            Ok(reservation) => {
                info!(
                    provider_id,
                    reservation_id = reservation.id,
                    start = %proposed.start_local,
                    "booking accepted, hold placed"
                );
                Ok(BookingOutcome::Reserved { reservation })
            }
            Err(LedgerError::Conflict { existing }) => {
                warn!(
                    provider_id,
                    start = %proposed.start_local,
                    existing,
                    "commit-time conflict after validation passed; concurrent booking won the race"
                );
                Ok(BookingOutcome::Rejected {
                    reason: RejectionReason::TimeConflict,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mark a hold as paid.
    pub fn confirm(&self, id: ReservationId, now: DateTime<Utc>) -> Result<Reservation> {
        Ok(self
            .ledger
            .transition(id, ReservationStatus::Confirmed, now)?)
    }

    pub fn cancel(&self, id: ReservationId, now: DateTime<Utc>) -> Result<Reservation> {
        Ok(self
            .ledger
            .transition(id, ReservationStatus::Cancelled, now)?)
    }

    /// Mark a confirmed booking as delivered.
    pub fn complete(&self, id: ReservationId, now: DateTime<Utc>) -> Result<Reservation> {
        Ok(self
            .ledger
            .transition(id, ReservationStatus::Completed, now)?)
    }

    /// Return lapsed holds to free capacity.
    pub fn release_expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<ReservationId>> {
        let released = self.ledger.release_expired_holds(now)?;
        if !released.is_empty() {
            warn!(count = released.len(), ids = ?released, "released expired holds");
        }
        Ok(released)
    }

    fn schedule(&self, provider_id: &str) -> Result<ScheduleConfig> {
        let schedule = self
            .schedules
            .schedule_for(provider_id)?
            .ok_or_else(|| SlotError::UnknownProvider(provider_id.to_string()))?;
        schedule.validate()?;
        Ok(schedule)
    }

    fn run_gates(
        &self,
        provider_id: &str,
        schedule: &ScheduleConfig,
        proposed: &ProposedBooking,
        now: DateTime<Utc>,
    ) -> Result<ValidationState> {
        let busy = self.busy_on_day(provider_id, proposed.start_local, now)?;
        Ok(BookingValidator::new(schedule).validate(proposed, &busy))
    }

    fn busy_on_day(
        &self,
        provider_id: &str,
        start_local: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Result<Vec<Interval<NaiveDateTime>>> {
        let (from, to) = utc_bounds(&self.normalizer, start_local.date(), 1)?;
        let reservations = self.ledger.reservations_between(provider_id, from, to)?;
        Ok(busy_intervals(&reservations, &self.normalizer, now))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
