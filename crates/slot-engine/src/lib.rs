//! # slot-engine
//!
//! Deterministic appointment availability and booking-conflict checks for a
//! single operating timezone.
//!
//! The engine turns a provider's weekly schedule into bookable slots, marks
//! the ones already taken, and validates new booking requests against the
//! schedule and the live reservation ledger before placing a short-lived
//! PENDING hold.
//!
//! ## Modules
//!
//! - [`temporal`]: Operating-timezone normalization, DST gap and overlap handling
//! - [`schedule`]: Provider weekly schedule and business window
//! - [`slots`]: Slot grid generation for one local day
//! - [`conflict`]: Half-open interval overlap detection
//! - [`reservation`]: Reservation records and lifecycle states
//! - [`availability`]: Per-day slots annotated booked/free
//! - [`validator`]: Ordered booking gates producing accept/reject
//! - [`ledger`]: Storage traits and in-memory implementations
//! - [`engine`]: The caller-facing facade
//! - [`config`]: Engine configuration and environment overrides
//! - [`error`]: Error types

pub mod availability;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod reservation;
pub mod schedule;
pub mod slots;
pub mod temporal;
pub mod validator;

pub use availability::{compute_availability, DayAvailability, TimeSlot};
pub use config::EngineConfig;
pub use conflict::{find_conflict, has_conflict, Interval};
pub use engine::{BookingEngine, BookingOutcome};
pub use error::{LedgerError, SlotError};
pub use ledger::{
    InMemoryLedger, InMemoryScheduleStore, NewReservation, ReservationLedger, ScheduleStore,
};
pub use reservation::{ProviderId, Reservation, ReservationId, ReservationStatus};
pub use schedule::{ScheduleConfig, TimeOfDay};
pub use slots::generate_slots;
pub use temporal::{TimeNormalizer, DEFAULT_OPERATING_TIMEZONE};
pub use validator::{
    BookingRequest, BookingValidator, ProposedBooking, RejectionReason, ValidationState,
};
