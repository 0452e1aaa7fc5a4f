//! Recurrence expansion -- turns an anchor date-time and a recurrence mode into
//! the concrete dates a lesson series occupies.
//!
//! Every recurring mode is an RFC 5545 `FREQ=DAILY;INTERVAL=n` rule expanded by
//! the `rrule` crate in the anchor's timezone, so the wall-clock time of every
//! occurrence matches the anchor's even when a DST transition falls inside the
//! series. Occurrences in a DST gap move forward by the length of the gap;
//! ambiguous times take the earlier instant.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use rrule::{Frequency, RRule, RRuleSet};

use crate::error::{Result, SchedulingError};
use crate::lesson::Occurrence;
use crate::recurrence::RecurrenceMode;

/// Expand an anchor into its ordered occurrence dates.
///
/// - `RecurrenceMode::None` always yields exactly `[anchor]`.
/// - Recurring modes step by 1, 7 or 30 days while the occurrence's local date
///   is on or before `end_date` (inclusive bound).
/// - A recurring mode without an end date yields `[anchor]`; the validator
///   reports that combination as a mismatch.
/// - An end date before the anchor's date yields an empty sequence.
///
/// The series is not capped: a daily lesson over several years expands to
/// every one of its days.
///
/// # Errors
/// Returns `SchedulingError::DateOutOfRange` if the end date is at the edge of
/// chrono's range, or `SchedulingError::InvalidRule` if `rrule` refuses the
/// series (e.g. an anchor year outside -10000..=10000).
pub fn expand(
    anchor: DateTime<Tz>,
    end_date: Option<NaiveDate>,
    mode: RecurrenceMode,
) -> Result<Vec<DateTime<Tz>>> {
    let (stride, end_date) = match (mode.stride_days(), end_date) {
        (Some(stride), Some(end_date)) => (stride, end_date),
        _ => return Ok(vec![anchor]),
    };

    let tz = anchor.timezone();
    let anchor_date = anchor.date_naive();
    if anchor_date > end_date {
        return Ok(Vec::new());
    }

    let rule_set = series_rule(&anchor, stride, end_date)?;

    // The anchor goes in as given: `rrule` drops sub-second precision and
    // would re-resolve an ambiguous anchor to the earlier instant.
    let mut occurrences = vec![anchor];
    occurrences.extend(
        (&rule_set)
            .into_iter()
            .map(|dt| dt.with_timezone(&tz))
            .skip_while(|dt| dt.date_naive() <= anchor_date)
            .take_while(|dt| dt.date_naive() <= end_date),
    );

    Ok(occurrences)
}

/// Like [`expand`], but takes the recurrence mode as a string.
///
/// # Errors
/// Returns `SchedulingError::InvalidRecurrenceMode` for anything other than
/// `None`, `Daily`, `Weekly` or `Monthly`.
pub fn expand_str(
    anchor: DateTime<Tz>,
    end_date: Option<NaiveDate>,
    mode: &str,
) -> Result<Vec<DateTime<Tz>>> {
    expand(anchor, end_date, mode.parse()?)
}

/// Number of occurrences [`expand`] would produce, without materializing them.
pub fn occurrence_count(
    anchor_date: NaiveDate,
    end_date: Option<NaiveDate>,
    mode: RecurrenceMode,
) -> usize {
    match (mode.stride_days(), end_date) {
        (Some(_), Some(end)) if end < anchor_date => 0,
        (Some(stride), Some(end)) => {
            let span = (end - anchor_date).num_days() as u64;
            (span / u64::from(stride)) as usize + 1
        }
        _ => 1,
    }
}

/// Expand a UTC start instant into [`Occurrence`]s, interpreting wall-clock
/// dates in `tz`.
pub fn expand_occurrences(
    start: DateTime<Utc>,
    duration_minutes: u32,
    end_date: Option<NaiveDate>,
    mode: RecurrenceMode,
    tz: &Tz,
) -> Result<Vec<Occurrence>> {
    let anchor = start.with_timezone(tz);
    Ok(expand(anchor, end_date, mode)?
        .into_iter()
        .map(|dt| Occurrence::new(dt.with_timezone(&Utc), duration_minutes))
        .collect())
}

/// `FREQ=DAILY;INTERVAL=stride` from the anchor.
///
/// `rrule` wants UNTIL in UTC for a zoned DTSTART. Midnight UTC two days past
/// `end_date` lies after the end of `end_date` in every zone; the caller cuts
/// the series at the local end date.
fn series_rule(anchor: &DateTime<Tz>, stride: u16, end_date: NaiveDate) -> Result<RRuleSet> {
    let until = end_date
        .checked_add_days(Days::new(2))
        .ok_or_else(|| SchedulingError::DateOutOfRange(format!("{} + 2 days", end_date)))?
        .and_time(NaiveTime::default())
        .and_utc();

    RRule::new(Frequency::Daily)
        .interval(stride)
        .until(until.with_timezone(&rrule::Tz::UTC))
        .build(anchor.with_timezone(&rrule::Tz::Tz(anchor.timezone())))
        .map_err(|e| SchedulingError::InvalidRule(e.to_string()))
}
