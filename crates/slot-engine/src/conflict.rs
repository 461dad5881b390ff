//! Booking-conflict detection.
//!
//! Two intervals conflict iff they share at least one instant under half-open
//! semantics: `a.start < b.end && a.end > b.start`. Touching intervals
//! (`a.end == b.start`) do not conflict, so back-to-back bookings are legal.
//!
//! [`Interval`] is generic over the time type. Advisory checks compare
//! operating-local wall-clock time (`NaiveDateTime`); the ledger's commit
//! guard compares UTC instants with the same predicate.

use std::ops::Add;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;

use crate::reservation::Reservation;
use crate::temporal::TimeNormalizer;

/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord + Copy> Interval<T> {
    pub fn new(start: T, end: T) -> Self {
        debug_assert!(start <= end, "interval must not end before it starts");
        Self { start, end }
    }

    /// Whether the two intervals share any instant.
    pub fn overlaps(&self, other: &Interval<T>) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Interval<T>) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl<T> Interval<T>
where
    T: Ord + Copy + Add<Duration, Output = T>,
{
    /// `[start, start + minutes)`.
    pub fn starting_at(start: T, minutes: i64) -> Self {
        Self::new(start, start + Duration::minutes(minutes))
    }
}

/// The first interval in `existing` that overlaps `candidate`.
pub fn find_conflict<'a, T, I>(candidate: &Interval<T>, existing: I) -> Option<&'a Interval<T>>
where
    T: Ord + Copy + 'a,
    I: IntoIterator<Item = &'a Interval<T>>,
{
    existing.into_iter().find(|busy| candidate.overlaps(busy))
}

pub fn has_conflict<'a, T, I>(candidate: &Interval<T>, existing: I) -> bool
where
    T: Ord + Copy + 'a,
    I: IntoIterator<Item = &'a Interval<T>>,
{
    find_conflict(candidate, existing).is_some()
}

/// Local-time intervals of the reservations that still block capacity at
/// `now`. Completed, cancelled and expired-hold reservations are dropped.
pub fn busy_intervals(
    reservations: &[Reservation],
    normalizer: &TimeNormalizer,
    now: DateTime<Utc>,
) -> Vec<Interval<NaiveDateTime>> {
    let mut busy: Vec<_> = reservations
        .iter()
        .filter(|r| r.blocks_at(now))
        .map(|r| r.local_interval(normalizer))
        .collect();
    busy.sort_by_key(|i| i.start);
    busy
}

// ── Tests ───────────────────────────────────────────────────────────────────
