//! WASM bindings for lesson-engine.
//!
//! Exposes lesson expansion, conflict detection, request validation and
//! billing to JavaScript via `wasm-bindgen`. All complex types are passed as
//! JSON strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p lesson-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir pkg/ \
//!   target/wasm32-unknown-unknown/release/lesson_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use lesson_engine::lesson::Occurrence;
use lesson_engine::{
    LessonRequest, LessonValidator, RecurrenceMode, ScheduleEntry, SchedulingPolicy,
    DEFAULT_RATE_PER_MINUTE,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct OccurrenceDto {
    start: String,
    end: String,
    duration_minutes: u32,
}

impl OccurrenceDto {
    fn new(o: &Occurrence, tz: &Tz) -> Self {
        Self {
            start: o.start.with_timezone(tz).to_rfc3339(),
            end: o.end().with_timezone(tz).to_rfc3339(),
            duration_minutes: o.duration_minutes,
        }
    }
}

#[derive(Serialize)]
struct ConflictDto {
    occurrence: OccurrenceDto,
    entry: ScheduleEntry,
    overlap_minutes: i64,
}

/// Candidate occurrence passed from JavaScript.
#[derive(Deserialize)]
struct OccurrenceInput {
    start: String,
    duration_minutes: u32,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts both RFC 3339 (with timezone offset, e.g., "2024-01-10T10:00:00+00:00")
/// and naive time (e.g., "2024-01-10T10:00:00"), which is interpreted as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, JsValue> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| JsValue::from_str(&format!("Invalid datetime '{}': {}", s, e)))
}

fn parse_date(s: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| JsValue::from_str(&format!("Invalid date '{}': {}", s, e)))
}

fn parse_timezone(s: &str) -> Result<Tz, JsValue> {
    s.parse::<Tz>()
        .map_err(|_| JsValue::from_str(&format!("Invalid timezone: {}", s)))
}

fn parse_schedule_json(json: &str) -> Result<Vec<ScheduleEntry>, JsValue> {
    serde_json::from_str(json)
        .map_err(|e| JsValue::from_str(&format!("Invalid schedule JSON: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Expand a lesson into its dated occurrences.
///
/// Returns a JSON string containing an array of `{start, end, duration_minutes}`
/// objects with RFC 3339 datetimes in `timezone`.
///
/// # Arguments
/// - `start` -- First occurrence (ISO 8601)
/// - `end_date` -- Optional last date (`YYYY-MM-DD`, inclusive, local)
/// - `mode` -- "None", "Daily", "Weekly" or "Monthly"
/// - `duration_minutes` -- Duration of each occurrence
/// - `timezone` -- IANA timezone whose calendar days the series steps through
#[wasm_bindgen(js_name = "expandLessonDates")]
pub fn expand_lesson_dates(
    start: &str,
    end_date: Option<String>,
    mode: &str,
    duration_minutes: u32,
    timezone: &str,
) -> Result<String, JsValue> {
    let start = parse_datetime(start)?;
    let end_date = end_date.as_deref().map(parse_date).transpose()?;
    let mode: RecurrenceMode = mode.parse().map_err(to_js_error)?;
    let tz = parse_timezone(timezone)?;

    let occurrences =
        lesson_engine::expander::expand_occurrences(start, duration_minutes, end_date, mode, &tz)
            .map_err(to_js_error)?;

    let dtos: Vec<OccurrenceDto> = occurrences.iter().map(|o| OccurrenceDto::new(o, &tz)).collect();
    to_json(&dtos)
}

/// Find every collision between candidate occurrences and a schedule.
///
/// `occurrences_json` is a JSON array of `{start, duration_minutes}`;
/// `schedule_json` a JSON array of schedule entries. Entries belonging to
/// `exclude_lesson_id` (a `BigInt` on the JavaScript side) are ignored.
/// Returns a JSON array of `{occurrence, entry, overlap_minutes}` objects.
#[wasm_bindgen(js_name = "findLessonConflicts")]
pub fn find_lesson_conflicts(
    occurrences_json: &str,
    schedule_json: &str,
    exclude_lesson_id: Option<u64>,
) -> Result<String, JsValue> {
    let inputs: Vec<OccurrenceInput> = serde_json::from_str(occurrences_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid occurrences JSON: {}", e)))?;
    let occurrences = inputs
        .iter()
        .map(|input| Ok(Occurrence::new(parse_datetime(&input.start)?, input.duration_minutes)))
        .collect::<Result<Vec<_>, JsValue>>()?;
    let schedule = parse_schedule_json(schedule_json)?;

    let conflicts = lesson_engine::find_conflicts(&occurrences, &schedule, exclude_lesson_id);

    let dtos: Vec<ConflictDto> = conflicts
        .into_iter()
        .map(|c| ConflictDto {
            occurrence: OccurrenceDto::new(&c.occurrence, &chrono_tz::UTC),
            entry: c.entry,
            overlap_minutes: c.overlap_minutes,
        })
        .collect();
    to_json(&dtos)
}

/// Validate a lesson request against the student's and tutor's schedules.
///
/// Returns the validation outcome as JSON: `{"status": "accepted", request,
/// occurrences}` or `{"status": "rejected", violations}`. A rejection is a
/// normal return value; only malformed input throws.
///
/// # Arguments
/// - `request_json` -- The lesson request
/// - `student_schedule_json` / `tutor_schedule_json` -- JSON arrays of schedule entries
/// - `policy_json` -- Optional scheduling policy (defaults otherwise)
/// - `now` -- Optional ISO 8601 "current time" (defaults to the system clock)
#[wasm_bindgen(js_name = "validateLessonRequest")]
pub fn validate_lesson_request(
    request_json: &str,
    student_schedule_json: &str,
    tutor_schedule_json: &str,
    policy_json: Option<String>,
    now: Option<String>,
) -> Result<String, JsValue> {
    let request: LessonRequest = serde_json::from_str(request_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid request JSON: {}", e)))?;
    let student_schedule = parse_schedule_json(student_schedule_json)?;
    let tutor_schedule = parse_schedule_json(tutor_schedule_json)?;
    let policy = match policy_json.as_deref() {
        Some(json) => SchedulingPolicy::from_json_str(json).map_err(to_js_error)?,
        None => SchedulingPolicy::default(),
    };
    let now = match now.as_deref() {
        Some(s) => parse_datetime(s)?,
        None => Utc::now(),
    };

    let validator = LessonValidator::new(policy).map_err(to_js_error)?;
    let outcome = validator
        .validate_at(&request, &student_schedule, &tutor_schedule, now)
        .map_err(to_js_error)?;
    to_json(&outcome)
}

/// Billable amount: `duration_minutes * rate_per_minute * occurrence_count`,
/// rounded to cents and returned as a decimal string (e.g. "90.00").
///
/// `rate_per_minute` is a decimal string; the default rate applies if omitted.
/// Throws if the product does not fit in a decimal.
#[wasm_bindgen(js_name = "calculateLessonAmount")]
pub fn calculate_lesson_amount(
    duration_minutes: u32,
    occurrence_count: u32,
    rate_per_minute: Option<String>,
) -> Result<String, JsValue> {
    let rate = match rate_per_minute.as_deref() {
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| JsValue::from_str(&format!("Invalid rate '{}': {}", s, e)))?,
        None => DEFAULT_RATE_PER_MINUTE,
    };
    let amount = lesson_engine::calculate_amount(duration_minutes, occurrence_count as usize, rate)
        .map_err(to_js_error)?;
    Ok(amount.to_string())
}
