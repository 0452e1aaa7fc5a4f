//! Lesson data model: requests coming in, occurrences going out, and the
//! committed schedule entries conflicts are checked against.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expander;
use crate::recurrence::RecurrenceMode;

pub type LessonId = u64;
pub type StudentId = u64;
pub type TutorId = u64;

/// One concrete lesson slot derived from a (possibly recurring) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl Occurrence {
    pub fn new(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    /// Exclusive end of the slot.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_minutes as i64)
    }
}

/// An already-committed lesson occurrence belonging to a student and,
/// optionally, a tutor. Supplied by the persistence layer; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Identity of the lesson this entry belongs to. Used to exclude a lesson
    /// from its own conflict check when it is being updated.
    #[serde(default)]
    pub id: Option<LessonId>,
    pub student_id: StudentId,
    #[serde(default)]
    pub tutor_id: Option<TutorId>,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl ScheduleEntry {
    pub fn end(&self) -> DateTime<Utc> {
        self.occurrence().end()
    }

    pub fn occurrence(&self) -> Occurrence {
        Occurrence::new(self.start, self.duration_minutes)
    }
}

/// A lesson as submitted by a student, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRequest {
    /// Set when the request updates an existing lesson.
    #[serde(default)]
    pub lesson_id: Option<LessonId>,
    pub student_id: StudentId,
    #[serde(default)]
    pub tutor_id: Option<TutorId>,
    pub subject: String,
    /// First occurrence. Wall-clock rules read it in the policy's timezone.
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub recurrence: RecurrenceMode,
    /// Last date (inclusive, local) a recurring lesson may fall on.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LessonRequest {
    /// A one-off request with no tutor assigned yet.
    pub fn new(
        student_id: StudentId,
        subject: impl Into<String>,
        start: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            lesson_id: None,
            student_id,
            tutor_id: None,
            subject: subject.into(),
            start,
            duration_minutes,
            recurrence: RecurrenceMode::None,
            end_date: None,
            notes: None,
        }
    }

    pub fn with_tutor(mut self, tutor_id: TutorId) -> Self {
        self.tutor_id = Some(tutor_id);
        self
    }

    pub fn with_recurrence(mut self, recurrence: RecurrenceMode, end_date: Option<NaiveDate>) -> Self {
        self.recurrence = recurrence;
        self.end_date = end_date;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Mark the request as an update of lesson `lesson_id`.
    pub fn updating(mut self, lesson_id: LessonId) -> Self {
        self.lesson_id = Some(lesson_id);
        self
    }

    pub fn occurrences(&self, tz: &Tz) -> Result<Vec<Occurrence>> {
        expander::expand_occurrences(
            self.start,
            self.duration_minutes,
            self.end_date,
            self.recurrence,
            tz,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LessonStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A persisted lesson: an accepted request with an identity and a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub student_id: StudentId,
    #[serde(default)]
    pub tutor_id: Option<TutorId>,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub recurrence: RecurrenceMode,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: LessonStatus,
}

impl Lesson {
    /// A pending lesson built from an accepted request.
    pub fn from_request(id: LessonId, request: LessonRequest) -> Self {
        Self {
            id,
            student_id: request.student_id,
            tutor_id: request.tutor_id,
            subject: request.subject,
            start: request.start,
            duration_minutes: request.duration_minutes,
            recurrence: request.recurrence,
            end_date: request.end_date,
            notes: request.notes,
            status: LessonStatus::Pending,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.tutor_id.is_some()
    }

    /// Assign `tutor_id` and approve the lesson.
    pub fn approve(&mut self, tutor_id: TutorId) {
        self.tutor_id = Some(tutor_id);
        self.status = LessonStatus::Approved;
    }

    pub fn reject(&mut self) {
        self.status = LessonStatus::Rejected;
    }

    /// The request this lesson would be re-validated as when edited.
    pub fn to_request(&self) -> LessonRequest {
        LessonRequest {
            lesson_id: Some(self.id),
            student_id: self.student_id,
            tutor_id: self.tutor_id,
            subject: self.subject.clone(),
            start: self.start,
            duration_minutes: self.duration_minutes,
            recurrence: self.recurrence,
            end_date: self.end_date,
            notes: self.notes.clone(),
        }
    }

    /// Every date the lesson series occupies.
    pub fn occurrences(&self, tz: &Tz) -> Result<Vec<Occurrence>> {
        expander::expand_occurrences(
            self.start,
            self.duration_minutes,
            self.end_date,
            self.recurrence,
            tz,
        )
    }

    /// The first occurrence starting strictly after `now`, if the series has
    /// one left.
    pub fn next_occurrence(&self, now: DateTime<Utc>, tz: &Tz) -> Result<Option<Occurrence>> {
        Ok(self.occurrences(tz)?.into_iter().find(|o| o.start > now))
    }

    /// One schedule entry per occurrence, all carrying this lesson's id.
    pub fn to_schedule_entries(&self, tz: &Tz) -> Result<Vec<ScheduleEntry>> {
        Ok(self
            .occurrences(tz)?
            .into_iter()
            .map(|o| ScheduleEntry {
                id: Some(self.id),
                student_id: self.student_id,
                tutor_id: self.tutor_id,
                subject: self.subject.clone(),
                start: o.start,
                duration_minutes: o.duration_minutes,
            })
            .collect())
    }
}
