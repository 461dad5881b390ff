//! Availability benchmarks.
//!
//! - `generate_slots`: one working day on a 15-minute grid
//! - `compute_availability`: 14 days against a dense ledger
//! - `engine_get_availability`: the same range through the engine, including
//!   the ledger range read

use std::hint::black_box;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use slot_engine::conflict::busy_intervals;
use slot_engine::{
    compute_availability, generate_slots, BookingEngine, EngineConfig, InMemoryLedger,
    InMemoryScheduleStore, Reservation, ReservationStatus, ScheduleConfig, TimeNormalizer,
};

fn schedule(session: u32) -> ScheduleConfig {
    ScheduleConfig {
        working_days: [1, 2, 3, 4, 5, 6].into_iter().collect(),
        start_time: "08:00".parse().unwrap(),
        end_time: "20:00".parse().unwrap(),
        session_duration_minutes: session,
        break_between_sessions_minutes: 0,
        is_available: true,
    }
}

fn from() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// One confirmed hour every other hour of every day in the range.
fn reservations(days: i64) -> Vec<Reservation> {
    let first = Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap();
    (0..days)
        .flat_map(|d| (0..6).map(move |h| first + Duration::days(d) + Duration::hours(2 * h)))
        .enumerate()
        .map(|(i, start)| {
            let mut r = Reservation::pending(i as u64 + 1, "bench".into(), start, 60, now(), None);
            r.status = ReservationStatus::Confirmed;
            r
        })
        .collect()
}

fn bench_generate_slots(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_slots");
    for session in [15u32, 30, 60] {
        let config = schedule(session);
        group.bench_with_input(BenchmarkId::from_parameter(session), &config, |b, cfg| {
            b.iter(|| generate_slots(black_box(cfg), black_box(from())));
        });
    }
    group.finish();
}

fn bench_compute_availability(c: &mut Criterion) {
    let normalizer = TimeNormalizer::default();
    let config = schedule(30);
    let rows = reservations(14);
    let busy = busy_intervals(&rows, &normalizer, now());

    let mut group = c.benchmark_group("compute_availability");
    group.throughput(Throughput::Elements(14));
    group.bench_function("14_days", |b| {
        b.iter(|| {
            compute_availability(
                black_box(&config),
                from(),
                14,
                black_box(&busy),
                &normalizer,
            )
        });
    });
    group.finish();
}

fn bench_engine_get_availability(c: &mut Criterion) {
    let schedules = InMemoryScheduleStore::new();
    schedules.upsert("bench", schedule(30));
    let ledger = InMemoryLedger::new();
    ledger.seed(reservations(14)).unwrap();
    let engine = BookingEngine::new(EngineConfig::default(), schedules, ledger);

    c.bench_function("engine_get_availability_14_days", |b| {
        b.iter(|| {
            engine
                .get_availability(black_box("bench"), from(), 14, now())
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_generate_slots,
    bench_compute_availability,
    bench_engine_get_availability
);
criterion_main!(benches);
