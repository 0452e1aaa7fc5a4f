//! Tests for lesson billing.

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::UTC;
use lesson_engine::billing::{lesson_amount, occurrences_amount, request_amount};
use lesson_engine::lesson::Occurrence;
use lesson_engine::{
    calculate_amount, Lesson, LessonRequest, LessonValidator, RecurrenceMode, SchedulingError,
    SchedulingPolicy, DEFAULT_RATE_PER_MINUTE,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn new_years_lesson(mode: RecurrenceMode, end: Option<NaiveDate>) -> LessonRequest {
    LessonRequest::new(1, "Python", Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(), 60)
        .with_recurrence(mode, end)
}

#[test]
fn amount_is_duration_times_rate_times_count() {
    assert_eq!(calculate_amount(60, 1, dec!(0.50)).unwrap(), dec!(30.00));
    assert_eq!(calculate_amount(90, 4, dec!(1.25)).unwrap(), dec!(450.00));
    assert_eq!(calculate_amount(45, 3, dec!(10)).unwrap(), dec!(1350));
}

#[test]
fn zero_occurrences_cost_nothing() {
    assert_eq!(calculate_amount(60, 0, dec!(0.50)).unwrap(), Decimal::ZERO);
}

#[test]
fn amounts_are_rounded_to_cents() {
    // 45 * 0.3333 = 14.9985
    assert_eq!(calculate_amount(45, 1, dec!(0.3333)).unwrap(), dec!(15.00));
    assert_eq!(calculate_amount(45, 1, dec!(0.3333)).unwrap().scale(), 2);
}

#[test]
fn default_rate_is_fifty_cents() {
    assert_eq!(DEFAULT_RATE_PER_MINUTE, dec!(0.50));
}

#[test]
fn non_recurring_request_is_billed_once() {
    let req = new_years_lesson(RecurrenceMode::None, None);

    assert_eq!(request_amount(&req, DEFAULT_RATE_PER_MINUTE, &UTC).unwrap(), dec!(30));
}

#[test]
fn recurring_requests_are_billed_per_expanded_occurrence() {
    let cases = [
        // 1, 2, 3, 4 January
        (RecurrenceMode::Daily, date(2024, 1, 4), dec!(120)),
        // 1, 8, 15 January
        (RecurrenceMode::Weekly, date(2024, 1, 18), dec!(90)),
        // 1 January, 31 January, 1 March
        (RecurrenceMode::Monthly, date(2024, 3, 2), dec!(90)),
    ];

    for (mode, end, expected) in cases {
        let req = new_years_lesson(mode, Some(end));
        assert_eq!(
            request_amount(&req, DEFAULT_RATE_PER_MINUTE, &UTC).unwrap(),
            expected,
            "{mode} until {end}"
        );
    }
}

#[test]
fn lesson_and_occurrence_amounts_agree_with_request_amount() {
    let req = new_years_lesson(RecurrenceMode::Weekly, Some(date(2024, 2, 29)));
    let lesson = Lesson::from_request(3, req.clone());
    let occurrences = req.occurrences(&UTC).unwrap();

    let expected = request_amount(&req, dec!(0.75), &UTC).unwrap();

    assert_eq!(lesson_amount(&lesson, dec!(0.75), &UTC).unwrap(), expected);
    assert_eq!(occurrences_amount(&occurrences, dec!(0.75)).unwrap(), expected);
    assert_eq!(occurrences.len(), 9);
}

// ---------------------------------------------------------------------------
// Overflow
// ---------------------------------------------------------------------------

#[test]
fn overflowing_amount_is_an_error() {
    let result = calculate_amount(240, 1000, Decimal::MAX / dec!(10));

    assert!(
        matches!(result, Err(SchedulingError::AmountOverflow(_))),
        "{:?}",
        result
    );
}

#[test]
fn overflowing_occurrence_sum_is_an_error() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
    let occurrences = vec![Occurrence::new(start, 240); 1000];

    let result = occurrences_amount(&occurrences, Decimal::MAX / dec!(10));

    assert!(
        matches!(result, Err(SchedulingError::AmountOverflow(_))),
        "{:?}",
        result
    );
}

#[test]
fn huge_policy_rate_bills_as_an_error_not_a_crash() {
    let policy = SchedulingPolicy {
        rate_per_minute: Decimal::MAX,
        ..SchedulingPolicy::default()
    };
    let validator = LessonValidator::new(policy).unwrap();
    let req = new_years_lesson(RecurrenceMode::Daily, Some(date(2024, 1, 4)));

    let result = request_amount(&req, validator.policy().rate_per_minute, &UTC);

    assert!(
        matches!(result, Err(SchedulingError::AmountOverflow(_))),
        "{:?}",
        result
    );
}
