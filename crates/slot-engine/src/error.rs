//! Error types for slot-engine operations.
//!
//! Business-rule rejections are not errors: they travel as
//! [`RejectionReason`](crate::validator::RejectionReason) inside an `Ok`.
//! Everything here is either a malformed input or a storage failure.

use thiserror::Error;

use crate::reservation::{ReservationId, ReservationStatus};

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Nonexistent local time: {0}")]
    NonexistentLocalTime(String),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SlotError {
    /// Whether the caller may retry the same call unchanged.
    ///
    /// Only infrastructure failures qualify; every other variant needs the
    /// caller to change its input first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SlotError::Ledger(e) if e.is_retryable())
    }
}

/// Failures raised by a [`ReservationLedger`](crate::ledger::ReservationLedger)
/// or [`ScheduleStore`](crate::ledger::ScheduleStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The commit-time guard found a blocking reservation over the interval.
    #[error("Interval overlaps reservation {existing}")]
    Conflict { existing: ReservationId },

    #[error("Reservation not found: {0}")]
    NotFound(ReservationId),

    #[error("Invalid transition for reservation {id}: {from} -> {to}")]
    InvalidTransition {
        id: ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Hold expired for reservation {0}")]
    HoldExpired(ReservationId),

    /// The hold deadline `now + ttl` is not representable.
    #[error("Invalid hold window: {0}")]
    InvalidHoldWindow(String),

    #[error("Reservation ids exhausted")]
    IdsExhausted,

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, SlotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        let infra = SlotError::from(LedgerError::Unavailable("connection reset".into()));
        assert!(infra.is_retryable());

        let conflict = SlotError::from(LedgerError::Conflict { existing: 7 });
        assert!(!conflict.is_retryable());
        assert!(!SlotError::InvalidTimestamp("x".into()).is_retryable());
        assert!(!SlotError::from(LedgerError::IdsExhausted).is_retryable());
        assert!(!SlotError::from(LedgerError::InvalidHoldWindow("ttl".into())).is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = SlotError::from(LedgerError::InvalidTransition {
            id: 3,
            from: ReservationStatus::Cancelled,
            to: ReservationStatus::Confirmed,
        });
        assert_eq!(
            err.to_string(),
            "Invalid transition for reservation 3: CANCELLED -> CONFIRMED"
        );
    }
}
