//! Reservation records and their status lifecycle.
//!
//! ```text
//! PENDING ──confirm──▶ CONFIRMED ──complete──▶ COMPLETED
//!    │                     │
//!    └──cancel──▶ CANCELLED ◀──cancel──┘
//! ```
//!
//! CANCELLED and COMPLETED are terminal. A PENDING reservation is a hold: it
//! carries `hold_expires_at` and stops blocking capacity once that passes,
//! whether or not anything has swept it yet.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::Interval;
use crate::temporal::TimeNormalizer;

pub type ReservationId = u64;
pub type ProviderId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled) | (Confirmed, Completed)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub provider_id: ProviderId,
    pub start_utc: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: ReservationStatus,
    /// Minor currency units.
    #[serde(default)]
    pub price_amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set while PENDING; cleared on confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_expires_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// A fresh hold with no price or notes attached.
    pub fn pending(
        id: ReservationId,
        provider_id: ProviderId,
        start_utc: DateTime<Utc>,
        duration_minutes: u32,
        created_at: DateTime<Utc>,
        hold_expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            provider_id,
            start_utc,
            duration_minutes,
            status: ReservationStatus::Pending,
            price_amount: 0,
            notes: None,
            location: None,
            created_at,
            hold_expires_at,
        }
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.utc_interval().end
    }

    pub fn utc_interval(&self) -> Interval<DateTime<Utc>> {
        Interval::starting_at(self.start_utc, self.duration_minutes as i64)
    }

    /// The reservation as operating-local wall-clock time.
    pub fn local_interval(&self, normalizer: &TimeNormalizer) -> Interval<NaiveDateTime> {
        Interval::starting_at(
            normalizer.to_local(self.start_utc),
            self.duration_minutes as i64,
        )
    }

    pub fn hold_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Pending
            && self.hold_expires_at.is_some_and(|deadline| now >= deadline)
    }

    /// Whether this reservation occupies capacity at `now`.
    pub fn blocks_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            ReservationStatus::Confirmed => true,
            ReservationStatus::Pending => !self.hold_expired_at(now),
            ReservationStatus::Completed | ReservationStatus::Cancelled => false,
        }
    }
}
