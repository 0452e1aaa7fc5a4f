//! Lesson request validation.
//!
//! Every rule is checked on every request and all violations are returned
//! together, so a form can flag each offending field at once. A request is
//! accepted as a whole or not at all: one conflicting occurrence rejects the
//! entire series.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, trace};
use serde::Serialize;

use crate::conflict;
use crate::error::Result;
use crate::expander;
use crate::lesson::{LessonRequest, Occurrence, ScheduleEntry};
use crate::policy::SchedulingPolicy;
use crate::store::ScheduleSource;

/// Display format for lesson times in user-facing messages.
const MESSAGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The request field a violation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Subject,
    Duration,
    PreferredDate,
    EndDate,
}

/// Whose schedule a conflict was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Student,
    Tutor,
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::Student => f.write_str("student"),
            Participant::Tutor => f.write_str("tutor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum ViolationKind {
    BlankSubject,
    InvalidDuration,
    PastDate,
    RecurrenceEndDateMismatch,
    EndDateBeforeStart,
    OutsideWorkingHours,
    /// Carries the colliding lesson so the message can name it.
    ScheduleConflict {
        participant: Participant,
        subject: String,
        start: DateTime<Utc>,
    },
}

impl ViolationKind {
    pub fn name(&self) -> &'static str {
        match self {
            ViolationKind::BlankSubject => "BlankSubject",
            ViolationKind::InvalidDuration => "InvalidDuration",
            ViolationKind::PastDate => "PastDate",
            ViolationKind::RecurrenceEndDateMismatch => "RecurrenceEndDateMismatch",
            ViolationKind::EndDateBeforeStart => "EndDateBeforeStart",
            ViolationKind::OutsideWorkingHours => "OutsideWorkingHours",
            ViolationKind::ScheduleConflict { .. } => "ScheduleConflict",
        }
    }
}

/// One broken rule: where, what, and a message fit for the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: Field,
    #[serde(flatten)]
    pub kind: ViolationKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The normalized request and every occurrence to persist.
    Accepted {
        request: LessonRequest,
        occurrences: Vec<Occurrence>,
    },
    Rejected { violations: Vec<Violation> },
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted { .. })
    }

    /// Violations of a rejected request; empty when accepted.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationOutcome::Accepted { .. } => &[],
            ValidationOutcome::Rejected { violations } => violations,
        }
    }

    /// Names of the violated rules, in report order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.violations().iter().map(|v| v.kind.name()).collect()
    }

    /// Whether any violation is attached to `field`.
    pub fn has_error(&self, field: Field) -> bool {
        self.violations().iter().any(|v| v.field == field)
    }
}

/// Applies a [`SchedulingPolicy`] to lesson requests.
#[derive(Debug, Clone)]
pub struct LessonValidator {
    policy: SchedulingPolicy,
    tz: Tz,
}

impl Default for LessonValidator {
    fn default() -> Self {
        Self {
            policy: SchedulingPolicy::default(),
            tz: chrono_tz::UTC,
        }
    }
}

impl LessonValidator {
    /// # Errors
    /// Returns `SchedulingError::InvalidTimezone` or
    /// `SchedulingError::InvalidPolicy` if the policy cannot be applied.
    pub fn new(policy: SchedulingPolicy) -> Result<Self> {
        policy.check()?;
        let tz = policy.tz()?;
        Ok(Self { policy, tz })
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Validate against the current time.
    pub fn validate(
        &self,
        request: &LessonRequest,
        student_schedule: &[ScheduleEntry],
        tutor_schedule: &[ScheduleEntry],
    ) -> Result<ValidationOutcome> {
        self.validate_at(request, student_schedule, tutor_schedule, Utc::now())
    }

    /// Validate with an explicit clock. `now` only feeds the future-date rule.
    ///
    /// # Errors
    /// Only hard failures (expansion leaving chrono's date range) are errors;
    /// broken business rules come back as `ValidationOutcome::Rejected`.
    pub fn validate_at(
        &self,
        request: &LessonRequest,
        student_schedule: &[ScheduleEntry],
        tutor_schedule: &[ScheduleEntry],
        now: DateTime<Utc>,
    ) -> Result<ValidationOutcome> {
        let mut violations = Vec::new();

        if request.subject.trim().is_empty() {
            violations.push(Violation {
                field: Field::Subject,
                kind: ViolationKind::BlankSubject,
                message: "Please choose a subject.".to_string(),
            });
        }

        self.check_duration(request.duration_minutes, &mut violations);

        if request.start <= now {
            violations.push(Violation {
                field: Field::PreferredDate,
                kind: ViolationKind::PastDate,
                message: "The lesson date must be in the future.".to_string(),
            });
        }

        let anchor_date = request.start.with_timezone(&self.tz).date_naive();
        let series_usable = self.check_recurrence(request, anchor_date, &mut violations);

        // With an unusable recurrence there is no series to speak of; the
        // remaining rules still apply to the first lesson.
        let occurrences = if series_usable {
            expander::expand_occurrences(
                request.start,
                request.duration_minutes,
                request.end_date,
                request.recurrence,
                &self.tz,
            )?
        } else {
            vec![Occurrence::new(request.start, request.duration_minutes)]
        };
        trace!(
            "student {}: checking {} occurrence(s) of {}",
            request.student_id,
            occurrences.len(),
            request.recurrence
        );

        if let Some(outside) = occurrences.iter().find(|o| !self.within_working_hours(o)) {
            violations.push(Violation {
                field: Field::PreferredDate,
                kind: ViolationKind::OutsideWorkingHours,
                message: format!(
                    "Lessons must start at or after {} and end by {} (requested {} to {}).",
                    self.policy.opening_time.format("%H:%M"),
                    self.policy.closing_time.format("%H:%M"),
                    outside.start.with_timezone(&self.tz).format(MESSAGE_TIME_FORMAT),
                    outside.end().with_timezone(&self.tz).format("%H:%M"),
                ),
            });
        }

        self.check_conflicts(
            request,
            &occurrences,
            Participant::Student,
            student_schedule,
            &mut violations,
        );
        self.check_conflicts(
            request,
            &occurrences,
            Participant::Tutor,
            tutor_schedule,
            &mut violations,
        );

        if violations.is_empty() {
            debug!(
                "accepted lesson request for student {}: {} occurrence(s)",
                request.student_id,
                occurrences.len()
            );
            Ok(ValidationOutcome::Accepted {
                request: normalize(request),
                occurrences,
            })
        } else {
            debug!(
                "rejected lesson request for student {}: {:?}",
                request.student_id,
                violations.iter().map(|v| v.kind.name()).collect::<Vec<_>>()
            );
            Ok(ValidationOutcome::Rejected { violations })
        }
    }

    /// Fetch the student's and (if assigned) the tutor's upcoming lessons from
    /// `source`, then validate against them.
    pub fn validate_with<S: ScheduleSource + ?Sized>(
        &self,
        request: &LessonRequest,
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<ValidationOutcome> {
        let student_schedule = source.student_schedule(request.student_id, now);
        let tutor_schedule = request
            .tutor_id
            .map(|tutor_id| source.tutor_schedule(tutor_id, now))
            .unwrap_or_default();
        self.validate_at(request, &student_schedule, &tutor_schedule, now)
    }

    fn check_duration(&self, duration_minutes: u32, violations: &mut Vec<Violation>) {
        let granularity = self.policy.duration_granularity_minutes;
        if duration_minutes == 0 || duration_minutes % granularity != 0 {
            violations.push(Violation {
                field: Field::Duration,
                kind: ViolationKind::InvalidDuration,
                message: format!("Duration must be in {} minute increments.", granularity),
            });
        }

        let (min, max) = (
            self.policy.min_duration_minutes,
            self.policy.max_duration_minutes,
        );
        if duration_minutes < min || duration_minutes > max {
            violations.push(Violation {
                field: Field::Duration,
                kind: ViolationKind::InvalidDuration,
                message: format!("Duration must be between {} and {} minutes.", min, max),
            });
        }
    }

    /// Returns whether the recurrence and end date describe a series that can
    /// be expanded.
    fn check_recurrence(
        &self,
        request: &LessonRequest,
        anchor_date: NaiveDate,
        violations: &mut Vec<Violation>,
    ) -> bool {
        let mut usable = true;

        match (request.recurrence.is_recurring(), request.end_date) {
            (true, None) => {
                violations.push(Violation {
                    field: Field::EndDate,
                    kind: ViolationKind::RecurrenceEndDateMismatch,
                    message: "Please enter an end date for the recurrence.".to_string(),
                });
                usable = false;
            }
            (false, Some(_)) => {
                violations.push(Violation {
                    field: Field::EndDate,
                    kind: ViolationKind::RecurrenceEndDateMismatch,
                    message: "Recurrence must be set to have a recurrence end date.".to_string(),
                });
                usable = false;
            }
            _ => {}
        }

        if let Some(end_date) = request.end_date {
            if end_date < anchor_date {
                violations.push(Violation {
                    field: Field::EndDate,
                    kind: ViolationKind::EndDateBeforeStart,
                    message: "Recurrence end date must be after the lesson date.".to_string(),
                });
                usable = false;
            }
        }

        usable
    }

    /// Start no earlier than opening, end no later than closing, same local
    /// day.
    fn within_working_hours(&self, occurrence: &Occurrence) -> bool {
        let start = occurrence.start.with_timezone(&self.tz).naive_local();
        let end = occurrence.end().with_timezone(&self.tz).naive_local();

        start.time() >= self.policy.opening_time
            && start.time() < self.policy.closing_time
            && end.date() == start.date()
            && end.time() <= self.policy.closing_time
    }

    fn check_conflicts(
        &self,
        request: &LessonRequest,
        occurrences: &[Occurrence],
        participant: Participant,
        schedule: &[ScheduleEntry],
        violations: &mut Vec<Violation>,
    ) {
        // Each colliding entry is reported once, however many occurrences it blocks.
        let mut colliding: Vec<&ScheduleEntry> = Vec::new();
        for occurrence in occurrences {
            for entry in conflict::find_overlaps(occurrence, schedule, request.lesson_id) {
                if !colliding.iter().any(|seen| std::ptr::eq(*seen, entry)) {
                    colliding.push(entry);
                }
            }
        }

        for entry in colliding {
            let when = entry.start.with_timezone(&self.tz).format(MESSAGE_TIME_FORMAT);
            let message = match participant {
                Participant::Student => format!(
                    "The requested lesson time overlaps with an existing lesson: {} on {}",
                    entry.subject, when
                ),
                Participant::Tutor => format!(
                    "The tutor already has a lesson at the requested time: {} on {}",
                    entry.subject, when
                ),
            };
            violations.push(Violation {
                field: Field::PreferredDate,
                kind: ViolationKind::ScheduleConflict {
                    participant,
                    subject: entry.subject.clone(),
                    start: entry.start,
                },
                message,
            });
        }
    }
}

/// Validate with the default policy and the current time.
pub fn validate(
    request: &LessonRequest,
    student_schedule: &[ScheduleEntry],
    tutor_schedule: &[ScheduleEntry],
) -> Result<ValidationOutcome> {
    LessonValidator::default().validate(request, student_schedule, tutor_schedule)
}

fn normalize(request: &LessonRequest) -> LessonRequest {
    let mut normalized = request.clone();
    normalized.subject = request.subject.trim().to_string();
    normalized.notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
        .map(str::to_string);
    normalized
}
