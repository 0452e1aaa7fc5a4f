//! Billable amounts for lessons and lesson series.
//!
//! A series is billed as one amount: per-occurrence duration times the rate,
//! times the number of occurrences the expander produces. Amounts are rounded
//! to cents.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{Result, SchedulingError};
use crate::expander;
use crate::lesson::{Lesson, LessonRequest, Occurrence};

/// Price of one lesson minute when no policy overrides it.
pub const DEFAULT_RATE_PER_MINUTE: Decimal = dec!(0.50);

/// `duration_minutes * rate_per_minute * occurrence_count`, rounded to 2
/// decimal places.
///
/// # Errors
/// Returns `SchedulingError::AmountOverflow` if the product does not fit in a
/// `Decimal`.
pub fn calculate_amount(
    duration_minutes: u32,
    occurrence_count: usize,
    rate_per_minute: Decimal,
) -> Result<Decimal> {
    Decimal::from(duration_minutes)
        .checked_mul(rate_per_minute)
        .and_then(|per_occurrence| per_occurrence.checked_mul(Decimal::from(occurrence_count)))
        .map(|amount| amount.round_dp(2))
        .ok_or_else(|| {
            SchedulingError::AmountOverflow(format!(
                "{} min x {} x {} occurrence(s)",
                duration_minutes, rate_per_minute, occurrence_count
            ))
        })
}

/// Amount for a request's whole series, counting occurrences in `tz`.
pub fn request_amount(request: &LessonRequest, rate_per_minute: Decimal, tz: &Tz) -> Result<Decimal> {
    let count = expander::occurrence_count(
        request.start.with_timezone(tz).date_naive(),
        request.end_date,
        request.recurrence,
    );
    calculate_amount(request.duration_minutes, count, rate_per_minute)
}

pub fn lesson_amount(lesson: &Lesson, rate_per_minute: Decimal, tz: &Tz) -> Result<Decimal> {
    let count = expander::occurrence_count(
        lesson.start.with_timezone(tz).date_naive(),
        lesson.end_date,
        lesson.recurrence,
    );
    calculate_amount(lesson.duration_minutes, count, rate_per_minute)
}

/// Amount for an already-expanded occurrence list, e.g. the occurrences of an
/// accepted validation outcome.
pub fn occurrences_amount(occurrences: &[Occurrence], rate_per_minute: Decimal) -> Result<Decimal> {
    occurrences
        .iter()
        .try_fold(Decimal::ZERO, |total, o| {
            Decimal::from(o.duration_minutes)
                .checked_mul(rate_per_minute)
                .and_then(|amount| total.checked_add(amount))
        })
        .map(|total| total.round_dp(2))
        .ok_or_else(|| {
            SchedulingError::AmountOverflow(format!(
                "{} occurrence(s) at {} per minute",
                occurrences.len(),
                rate_per_minute
            ))
        })
}
