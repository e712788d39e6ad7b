//! `schedule` CLI — check conflicts and suggest free slots against a booking file.
//!
//! ## Usage
//!
//! ```sh
//! # Who is already booked between 14:00 and 15:00?
//! schedule conflicts -b bookings.json --start "2026-03-16 14:00:00" \
//!     --end "2026-03-16 15:00:00" --participants alice,bob
//!
//! # Propose alternative one-hour slots
//! schedule suggest -b bookings.json --start "2026-03-16 14:00:00" \
//!     --end "2026-03-16 15:00:00" --participants alice,bob --max 3
//!
//! # List events overlapping a range
//! schedule planning -b bookings.json --start 2026-03-16T00:00:00Z --end 2026-03-17T00:00:00Z
//! ```
//!
//! The booking file is a JSON array of `{"participant": ..., "event": {...}}` rows.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use schedule_engine::{
    ConflictDetector, EventService, FreeSlotSuggester, MemoryStore, ParticipantBooking,
    ParticipantId, ScheduleConfig, StepPolicy, TimeWindow,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Schedule-conflict detection and free-slot suggestion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON (overrides log.json from the config)
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Args)]
struct Query {
    /// JSON booking file
    #[arg(short, long)]
    bookings: String,
    /// Window start ("YYYY-MM-DD HH:MM:SS" or RFC 3339)
    #[arg(long)]
    start: String,
    /// Window end ("YYYY-MM-DD HH:MM:SS" or RFC 3339)
    #[arg(long)]
    end: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Report participants already booked during the window
    Conflicts {
        #[command(flatten)]
        query: Query,
        /// Comma-separated participant ids
        #[arg(short, long)]
        participants: String,
    },
    /// Suggest free slots of the same duration as the window
    Suggest {
        #[command(flatten)]
        query: Query,
        /// Comma-separated participant ids
        #[arg(short, long)]
        participants: String,
        /// Maximum number of suggestions (overrides suggest.max_suggestions)
        #[arg(long)]
        max: Option<usize>,
        /// Cursor stepping: "advance" or "stall" (overrides suggest.step)
        #[arg(long)]
        step: Option<String>,
    },
    /// List events overlapping the window
    Planning {
        #[command(flatten)]
        query: Query,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => ScheduleConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path))?,
        None => ScheduleConfig::default(),
    };
    init_tracing(&config, cli.log_json);

    match cli.command {
        Commands::Conflicts {
            query,
            participants,
        } => {
            let (store, window) = load_query(&query)?;
            let participants = parse_participants(&participants);
            let groups = ConflictDetector::new(&store)
                .detect_conflicts(&window, &participants)
                .context("Conflict check failed")?;
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
        Commands::Suggest {
            query,
            participants,
            max,
            step,
        } => {
            let (store, window) = load_query(&query)?;
            let participants = parse_participants(&participants);

            let mut options = config.suggest.to_options();
            if let Some(max) = max {
                anyhow::ensure!(max > 0, "--max must be at least 1");
                options.max_suggestions = max;
            }
            if let Some(step) = step.as_deref() {
                options.step = parse_step(step)?;
            }

            let slots = FreeSlotSuggester::with_options(&store, options)
                .suggest_free_slots(&window, &participants)
                .context("Slot suggestion failed")?;
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        Commands::Planning { query } => {
            let (store, window) = load_query(&query)?;
            let events = EventService::new(store)
                .fetch_planning(&window)
                .context("Planning query failed")?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable JSON.
fn init_tracing(config: &ScheduleConfig, force_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    if force_json || config.log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_query(query: &Query) -> Result<(MemoryStore, TimeWindow)> {
    let window = TimeWindow::parse(&query.start, &query.end).context("Invalid --start/--end")?;
    let store = load_bookings(&query.bookings)?;
    Ok((store, window))
}

fn load_bookings(path: &str) -> Result<MemoryStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))?;
    let rows: Vec<ParticipantBooking> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse booking file: {}", path))?;
    tracing::debug!(rows = rows.len(), path, "loaded bookings");
    Ok(MemoryStore::from_bookings(rows))
}

/// `alice, bob,,carol` → `["alice", "bob", "carol"]`.
fn parse_participants(raw: &str) -> Vec<ParticipantId> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ParticipantId::from)
        .collect()
}

fn parse_step(raw: &str) -> Result<StepPolicy> {
    match raw {
        "advance" => Ok(StepPolicy::Advance),
        "stall" => Ok(StepPolicy::Stall),
        other => anyhow::bail!(
            "Unknown step policy: '{}'. Available policies: advance, stall",
            other
        ),
    }
}
