//! `lessons` CLI: expand, validate, book and bill tutoring lessons from the
//! command line.
//!
//! ## Usage
//!
//! ```sh
//! # Expand a weekly lesson into its occurrences
//! lessons expand --start 2024-01-01T10:00:00Z --end-date 2024-01-18 --mode Weekly
//!
//! # Validate a request against a student's and tutor's schedule (exit 1 if rejected)
//! lessons validate -i request.json --schedule schedule.json
//!
//! # Book a batch of requests in order, with a custom policy
//! lessons --policy policy.json book -i requests.json --schedule schedule.json
//!
//! # Price a request
//! echo '{"student_id":1,"subject":"Python","start":"2024-01-01T10:00:00Z","duration_minutes":60}' \
//!   | lessons bill
//! ```
//!
//! Set `RUST_LOG=debug` to see validation and commit decisions on stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use lesson_engine::billing::occurrences_amount;
use lesson_engine::expander::expand_occurrences;
use lesson_engine::lesson::LessonId;
use lesson_engine::validator::Violation;
use lesson_engine::{
    InMemorySchedule, LessonRequest, LessonValidator, RecurrenceMode, ScheduleEntry,
    SchedulingError, SchedulingPolicy, ValidationOutcome,
};
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{self, Read};
use std::process;

#[derive(Parser)]
#[command(
    name = "lessons",
    version,
    about = "Lesson scheduling: recurrence, conflicts, validation, billing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Scheduling policy JSON file (built-in defaults if omitted)
    #[arg(long, global = true)]
    policy: Option<String>,

    /// Pin the current time (RFC 3339); defaults to the system clock
    #[arg(long, global = true, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    /// Output file (writes to stdout if omitted)
    #[arg(short, long, global = true)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a lesson into its dated occurrences
    Expand {
        /// First occurrence (RFC 3339)
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        /// Last date (inclusive, YYYY-MM-DD) a recurring lesson may fall on
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// None, Daily, Weekly or Monthly
        #[arg(long, default_value = "None")]
        mode: RecurrenceMode,
        /// Minutes per occurrence
        #[arg(long, default_value_t = 60)]
        duration: u32,
    },
    /// Validate one lesson request; exits with status 1 if it is rejected
    Validate {
        /// Request JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// JSON array of existing schedule entries
        #[arg(long)]
        schedule: Option<String>,
    },
    /// Validate and commit a list of requests in order
    Book {
        /// JSON array of requests (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// JSON array of existing schedule entries to seed the store with
        #[arg(long)]
        schedule: Option<String>,
    },
    /// Price one lesson request
    Bill {
        /// Request JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[derive(Serialize)]
struct OccurrenceView {
    start: String,
    end: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum BookingReport {
    Booked {
        index: usize,
        lesson_id: LessonId,
        occurrences: usize,
        amount: Decimal,
    },
    Rejected {
        index: usize,
        violations: Vec<Violation>,
    },
    /// Accepted on validation but refused by the store.
    Conflict { index: usize, reason: String },
}

#[derive(Serialize)]
struct BookingSummary<'a> {
    bookings: Vec<BookingReport>,
    schedule: &'a [ScheduleEntry],
}

#[derive(Serialize)]
struct Bill {
    occurrences: usize,
    duration_minutes: u32,
    rate_per_minute: Decimal,
    amount: Decimal,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let validator = load_validator(cli.policy.as_deref())?;
    let now = cli.now.unwrap_or_else(Utc::now);
    let output = cli.output.as_deref();

    match cli.command {
        Commands::Expand {
            start,
            end_date,
            mode,
            duration,
        } => {
            let tz = validator.timezone();
            let occurrences = expand_occurrences(start, duration, end_date, mode, &tz)
                .context("Failed to expand lesson")?;
            let views: Vec<OccurrenceView> = occurrences
                .iter()
                .map(|o| OccurrenceView {
                    start: o.start.with_timezone(&tz).to_rfc3339(),
                    end: o.end().with_timezone(&tz).to_rfc3339(),
                })
                .collect();
            write_json(output, &views)?;
        }
        Commands::Validate { input, schedule } => {
            let request: LessonRequest = parse_json(&read_input(input.as_deref())?)
                .context("Failed to parse lesson request")?;
            let store = load_schedule(schedule.as_deref())?;
            let outcome = validator
                .validate_with(&request, &store, now)
                .context("Failed to validate lesson request")?;
            write_json(output, &outcome)?;
            if !outcome.is_accepted() {
                process::exit(1);
            }
        }
        Commands::Book { input, schedule } => {
            let requests: Vec<LessonRequest> = parse_json(&read_input(input.as_deref())?)
                .context("Failed to parse lesson requests")?;
            let mut store = load_schedule(schedule.as_deref())?;
            let bookings = book_all(&validator, &mut store, &requests, now)?;
            write_json(
                output,
                &BookingSummary {
                    bookings,
                    schedule: store.entries(),
                },
            )?;
        }
        Commands::Bill { input } => {
            let request: LessonRequest = parse_json(&read_input(input.as_deref())?)
                .context("Failed to parse lesson request")?;
            let rate = validator.policy().rate_per_minute;
            let occurrences = request
                .occurrences(&validator.timezone())
                .context("Failed to expand lesson")?;
            let amount = occurrences_amount(&occurrences, rate).context("Failed to bill lesson")?;
            write_json(
                output,
                &Bill {
                    occurrences: occurrences.len(),
                    duration_minutes: request.duration_minutes,
                    rate_per_minute: rate,
                    amount,
                },
            )?;
        }
    }

    Ok(())
}

/// Validate each request against the store as it stands, committing accepted
/// ones before moving on to the next.
fn book_all(
    validator: &LessonValidator,
    store: &mut InMemorySchedule,
    requests: &[LessonRequest],
    now: DateTime<Utc>,
) -> Result<Vec<BookingReport>> {
    let rate = validator.policy().rate_per_minute;
    let mut reports = Vec::with_capacity(requests.len());

    for (index, request) in requests.iter().enumerate() {
        let outcome = validator
            .validate_with(request, &*store, now)
            .with_context(|| format!("Failed to validate request {}", index))?;

        let report = match &outcome {
            ValidationOutcome::Rejected { violations } => BookingReport::Rejected {
                index,
                violations: violations.clone(),
            },
            ValidationOutcome::Accepted { occurrences, .. } => {
                // Priced before committing so an unbillable request stores nothing.
                let amount = occurrences_amount(occurrences, rate)
                    .with_context(|| format!("Failed to bill request {}", index))?;
                match store.commit(&outcome) {
                    Ok(lesson_id) => {
                        info!("request {} booked as lesson {}", index, lesson_id);
                        BookingReport::Booked {
                            index,
                            lesson_id,
                            occurrences: occurrences.len(),
                            amount,
                        }
                    }
                    Err(SchedulingError::CommitConflict(reason)) => {
                        BookingReport::Conflict { index, reason }
                    }
                    Err(e) => {
                        return Err(anyhow::Error::new(e)
                            .context(format!("Failed to commit request {}", index)))
                    }
                }
            }
        };
        reports.push(report);
    }

    Ok(reports)
}

fn load_validator(path: Option<&str>) -> Result<LessonValidator> {
    let policy = match path {
        Some(path) => {
            let json = read_file(path)?;
            SchedulingPolicy::from_json_str(&json)
                .with_context(|| format!("Invalid policy file: {}", path))?
        }
        None => SchedulingPolicy::default(),
    };
    LessonValidator::new(policy).context("Invalid scheduling policy")
}

fn load_schedule(path: Option<&str>) -> Result<InMemorySchedule> {
    let entries: Vec<ScheduleEntry> = match path {
        Some(path) => parse_json(&read_file(path)?)
            .with_context(|| format!("Invalid schedule file: {}", path))?,
        None => Vec::new(),
    };
    Ok(InMemorySchedule::from_entries(entries))
}

fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 datetime: {}", e))
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => read_file(path),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
