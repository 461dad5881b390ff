//! Storage collaborators: the provider settings store and the reservation
//! ledger.
//!
//! The engine reads through these traits and proposes writes; it owns no
//! persistence. A [`ReservationLedger`] must make [`insert_pending`] an atomic
//! check-and-insert: the overlap test against blocking reservations and the
//! insert happen under one critical section (a serializable transaction or an
//! exclusion constraint in a database, a lock here). The engine's own
//! conflict check is only an early answer for the caller.
//!
//! [`insert_pending`]: ReservationLedger::insert_pending

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::reservation::{ProviderId, Reservation, ReservationId, ReservationStatus};
use crate::schedule::ScheduleConfig;

/// Read access to provider schedules.
pub trait ScheduleStore {
    /// The provider's current schedule, or `None` for an unknown provider.
    fn schedule_for(&self, provider_id: &str) -> Result<Option<ScheduleConfig>, LedgerError>;
}

/// A reservation the engine wants the ledger to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub provider_id: ProviderId,
    pub start_utc: DateTime<Utc>,
    pub duration_minutes: u32,
    pub price_amount: u64,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub hold_ttl: Duration,
}

/// Reservation storage.
pub trait ReservationLedger {
    /// Reservations of `provider_id` whose interval intersects `[from, to)`,
    /// in any status, ordered by start.
    fn reservations_between(
        &self,
        provider_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, LedgerError>;

    /// Atomically re-check for overlap and insert a PENDING hold expiring at
    /// `now + hold_ttl`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Conflict`] when a reservation blocking at `now`
    /// overlaps the new interval.
    fn insert_pending(
        &self,
        reservation: NewReservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError>;

    /// Move a reservation to `to`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidTransition`] for transitions the lifecycle does
    /// not allow, [`LedgerError::HoldExpired`] when confirming a lapsed hold.
    fn transition(
        &self,
        id: ReservationId,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError>;

    /// Cancel every PENDING hold whose deadline has passed at `now`.
    fn release_expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<ReservationId>, LedgerError>;
}

// ── In-memory implementations ───────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryScheduleStore {
    schedules: RwLock<HashMap<ProviderId, ScheduleConfig>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, provider_id: impl Into<ProviderId>, schedule: ScheduleConfig) {
        let mut guard = self
            .schedules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(provider_id.into(), schedule);
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    fn schedule_for(&self, provider_id: &str) -> Result<Option<ScheduleConfig>, LedgerError> {
        let guard = self
            .schedules
            .read()
            .map_err(|_| LedgerError::Unavailable("schedule store lock poisoned".to_string()))?;
        Ok(guard.get(provider_id).cloned())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: ReservationId,
    by_provider: HashMap<ProviderId, Vec<Reservation>>,
}

impl LedgerState {
    fn find_mut(&mut self, id: ReservationId) -> Option<&mut Reservation> {
        self.by_provider
            .values_mut()
            .flat_map(|rs| rs.iter_mut())
            .find(|r| r.id == id)
    }
}

/// A process-local ledger. One mutex serializes every write, which makes
/// `insert_pending` a serializable read-check-insert.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load existing reservations as-is, keeping their ids. No overlap check
    /// is applied; this mirrors rows already committed elsewhere.
    pub fn seed(&self, reservations: impl IntoIterator<Item = Reservation>) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        for r in reservations {
            state.next_id = state.next_id.max(r.id);
            let rows = state.by_provider.entry(r.provider_id.clone()).or_default();
            rows.push(r);
            rows.sort_by_key(|r| r.start_utc);
        }
        Ok(())
    }

    pub fn get(&self, id: ReservationId) -> Result<Option<Reservation>, LedgerError> {
        let mut state = self.lock()?;
        Ok(state.find_mut(id).map(|r| r.clone()))
    }

    /// Every stored reservation, ordered by id.
    pub fn snapshot(&self) -> Result<Vec<Reservation>, LedgerError> {
        let state = self.lock()?;
        let mut all: Vec<_> = state.by_provider.values().flatten().cloned().collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".to_string()))
    }
}

impl ReservationLedger for InMemoryLedger {
    fn reservations_between(
        &self,
        provider_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, LedgerError> {
        let state = self.lock()?;
        let rows = state
            .by_provider
            .get(provider_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.start_utc < to && r.end_utc() > from)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        debug!(provider_id, %from, %to, count = rows.len(), "ledger range read");
        Ok(rows)
    }

    fn insert_pending(
        &self,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError> {
        let deadline = now.checked_add_signed(new.hold_ttl).ok_or_else(|| {
            LedgerError::InvalidHoldWindow(format!(
                "{} minutes from {now} is out of range",
                new.hold_ttl.num_minutes()
            ))
        })?;
        let mut state = self.lock()?;
        let id = state.next_id.checked_add(1).ok_or(LedgerError::IdsExhausted)?;
        let mut reservation = Reservation::pending(
            id,
            new.provider_id.clone(),
            new.start_utc,
            new.duration_minutes,
            now,
            Some(deadline),
        );
        reservation.price_amount = new.price_amount;
        reservation.notes = new.notes;
        reservation.location = new.location;

        let rows = state.by_provider.entry(new.provider_id).or_default();
        let candidate = reservation.utc_interval();
        if let Some(existing) = rows
            .iter()
            .find(|r| r.blocks_at(now) && candidate.overlaps(&r.utc_interval()))
        {
            return Err(LedgerError::Conflict {
                existing: existing.id,
            });
        }

        rows.push(reservation.clone());
        rows.sort_by_key(|r| r.start_utc);
        state.next_id = id;
        info!(
            reservation_id = id,
            provider_id = %reservation.provider_id,
            start = %reservation.start_utc,
            "hold created"
        );
        Ok(reservation)
    }

    fn transition(
        &self,
        id: ReservationId,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError> {
        let mut state = self.lock()?;
        let r = state.find_mut(id).ok_or(LedgerError::NotFound(id))?;
        if !r.status.can_transition_to(to) {
            return Err(LedgerError::InvalidTransition {
                id,
                from: r.status,
                to,
            });
        }
        if to == ReservationStatus::Confirmed && r.hold_expired_at(now) {
            return Err(LedgerError::HoldExpired(id));
        }
        let from = r.status;
        r.status = to;
        if to != ReservationStatus::Pending {
            r.hold_expires_at = None;
        }
        info!(reservation_id = id, %from, %to, "reservation transitioned");
        Ok(r.clone())
    }

    fn release_expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<ReservationId>, LedgerError> {
        let mut state = self.lock()?;
        let mut released = Vec::new();
        for r in state.by_provider.values_mut().flat_map(|rs| rs.iter_mut()) {
            if r.hold_expired_at(now) {
                r.status = ReservationStatus::Cancelled;
                r.hold_expires_at = None;
                released.push(r.id);
            }
        }
        released.sort_unstable();
        Ok(released)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
