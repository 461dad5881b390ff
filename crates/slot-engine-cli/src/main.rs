//! slotctl - query availability and place booking holds from a JSON fixture.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use slot_engine::config::hold_ttl_from_minutes;
use slot_engine::{
    BookingEngine, BookingOutcome, BookingRequest, EngineConfig, InMemoryLedger,
    InMemoryScheduleStore, TimeNormalizer,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod fixture;

use fixture::Fixture;

/// Exit status when a booking is rejected by a business rule.
const EXIT_REJECTED: u8 = 2;

type Engine = BookingEngine<InMemoryScheduleStore, InMemoryLedger>;

#[derive(Parser, Debug)]
#[command(name = "slotctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Operating timezone (IANA name); overrides SLOT_ENGINE_TIMEZONE
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Hold lifetime in minutes; overrides SLOT_ENGINE_HOLD_TTL_MINUTES
    #[arg(long, global = true)]
    hold_ttl: Option<i64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Common {
    /// Fixture with provider schedules and existing reservations
    #[arg(short, long)]
    fixture: PathBuf,

    /// Evaluation instant (RFC 3339, or local time in the operating zone).
    /// Defaults to the system clock.
    #[arg(long)]
    now: Option<String>,
}

#[derive(Args, Debug)]
struct RequestArgs {
    #[arg(short, long)]
    provider: String,

    /// Requested start, e.g. 2026-03-16T11:00 or 2026-03-16T15:00:00Z
    #[arg(short, long)]
    start: String,

    /// Service duration in minutes
    #[arg(short, long)]
    duration: i64,

    /// Price in minor currency units
    #[arg(long, default_value_t = 0)]
    price: u64,

    #[arg(long)]
    notes: Option<String>,

    #[arg(long)]
    location: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print annotated slots for a provider
    Availability {
        #[command(flatten)]
        common: Common,

        #[arg(short, long)]
        provider: String,

        /// First local date (defaults to today in the operating zone)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Number of days (defaults to SLOT_ENGINE_AVAILABILITY_DAYS or 14)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Check a booking request without writing anything
    Validate {
        #[command(flatten)]
        common: Common,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Validate a request and place a PENDING hold
    Book {
        #[command(flatten)]
        common: Common,

        #[command(flatten)]
        request: RequestArgs,

        /// Write the updated reservations back to the fixture
        #[arg(long)]
        save: bool,
    },

    /// Confirm a held reservation
    Confirm {
        #[command(flatten)]
        common: Common,

        #[arg(long)]
        id: u64,

        #[arg(long)]
        save: bool,
    },

    /// Cancel a reservation
    Cancel {
        #[command(flatten)]
        common: Common,

        #[arg(long)]
        id: u64,

        #[arg(long)]
        save: bool,
    },

    /// Cancel every hold whose deadline has passed
    ReleaseHolds {
        #[command(flatten)]
        common: Common,

        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = engine_config(&cli)?;

    match cli.command {
        Commands::Availability {
            common,
            provider,
            from,
            days,
        } => {
            let (engine, now) = open(&common, &config)?;
            let from = from.unwrap_or_else(|| engine.normalizer().local_date(now));
            let days = days.unwrap_or(config.availability_days);
            let availability = engine.get_availability(&provider, from, days, now)?;
            print_json(&availability)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { common, request } => {
            let (engine, now) = open(&common, &config)?;
            let state = engine.validate(&request.into_request(), now)?;
            print_json(&state)?;
            Ok(if state.is_accepted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_REJECTED)
            })
        }
        Commands::Book {
            common,
            request,
            save,
        } => {
            let (engine, now) = open(&common, &config)?;
            let outcome = engine.validate_and_reserve(&request.into_request(), now)?;
            print_json(&outcome)?;
            match outcome {
                BookingOutcome::Reserved { .. } => {
                    if save {
                        persist(&common, &engine)?;
                    }
                    Ok(ExitCode::SUCCESS)
                }
                BookingOutcome::Rejected { .. } => Ok(ExitCode::from(EXIT_REJECTED)),
            }
        }
        Commands::Confirm { common, id, save } => {
            let (engine, now) = open(&common, &config)?;
            let reservation = engine.confirm(id, now)?;
            print_json(&reservation)?;
            if save {
                persist(&common, &engine)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cancel { common, id, save } => {
            let (engine, now) = open(&common, &config)?;
            let reservation = engine.cancel(id, now)?;
            print_json(&reservation)?;
            if save {
                persist(&common, &engine)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::ReleaseHolds { common, save } => {
            let (engine, now) = open(&common, &config)?;
            let released = engine.release_expired_holds(now)?;
            print_json(&released)?;
            if save {
                persist(&common, &engine)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

impl RequestArgs {
    fn into_request(self) -> BookingRequest {
        BookingRequest {
            provider_id: self.provider,
            service_duration_minutes: self.duration,
            price_amount: self.price,
            requested_start: self.start,
            notes: self.notes,
            location: self.location,
        }
    }
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env().context("invalid SLOT_ENGINE_* environment")?;
    if let Some(name) = &cli.timezone {
        config.operating_timezone = TimeNormalizer::from_name(name)?.timezone();
    }
    if let Some(minutes) = cli.hold_ttl {
        config.hold_ttl = hold_ttl_from_minutes(minutes)?;
    }
    config.validate()?;
    Ok(config)
}

fn open(common: &Common, config: &EngineConfig) -> Result<(Engine, DateTime<Utc>)> {
    let fixture = Fixture::load(&common.fixture)?;
    info!(
        providers = fixture.providers.len(),
        reservations = fixture.reservations.len(),
        "fixture loaded"
    );
    let engine = fixture.into_engine(config.clone())?;
    let now = match &common.now {
        Some(raw) => engine
            .normalizer()
            .parse_utc(raw)
            .with_context(|| format!("invalid --now value '{raw}'"))?,
        None => Utc::now(),
    };
    Ok((engine, now))
}

/// Rewrite the fixture with the engine's current reservations.
fn persist(common: &Common, engine: &Engine) -> Result<()> {
    let mut fixture = Fixture::load(&common.fixture)?;
    fixture.reservations = engine.ledger().snapshot()?;
    fixture.save(&common.fixture)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
