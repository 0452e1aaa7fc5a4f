//! The persistence seam: where existing schedules come from and where accepted
//! lessons go.
//!
//! Validation works on a snapshot, so two requests for the same slot can both
//! pass it. [`InMemorySchedule::commit`] repeats the conflict check against its
//! current contents and inserts all occurrences or none; that check, not the
//! validator's, decides what gets stored.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::conflict;
use crate::error::{Result, SchedulingError};
use crate::lesson::{LessonId, LessonRequest, Occurrence, ScheduleEntry, StudentId, TutorId};
use crate::validator::ValidationOutcome;

/// Read access to committed lessons, one participant at a time.
pub trait ScheduleSource {
    /// Entries of `student_id` starting at or after `from`.
    fn student_schedule(&self, student_id: StudentId, from: DateTime<Utc>) -> Vec<ScheduleEntry>;

    /// Entries of `tutor_id` starting at or after `from`.
    fn tutor_schedule(&self, tutor_id: TutorId, from: DateTime<Utc>) -> Vec<ScheduleEntry>;
}

#[derive(Debug, Clone)]
pub struct InMemorySchedule {
    entries: Vec<ScheduleEntry>,
    /// `None` once `LessonId::MAX` has been handed out.
    next_id: Option<LessonId>,
}

impl Default for InMemorySchedule {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: Some(1),
        }
    }
}

impl InMemorySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store. New lesson ids continue after the highest seeded id.
    pub fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        let next_id = match entries.iter().filter_map(|e| e.id).max() {
            Some(id) => id.checked_add(1),
            None => Some(1),
        };
        Self { entries, next_id }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry as-is, without any checks.
    pub fn insert(&mut self, entry: ScheduleEntry) {
        if let Some(id) = entry.id {
            self.mark_used(id);
        }
        self.entries.push(entry);
    }

    /// Store every occurrence of an accepted outcome under one lesson id.
    ///
    /// An update (`request.lesson_id` set) replaces that lesson's entries and
    /// keeps its id; a new request gets a fresh id.
    ///
    /// # Errors
    /// - `SchedulingError::RejectedRequest` if the outcome was a rejection.
    /// - `SchedulingError::CommitConflict` if any occurrence now collides with
    ///   a stored entry of the same student or tutor. Nothing is stored.
    /// - `SchedulingError::LessonIdsExhausted` if a new lesson needs an id
    ///   after `LessonId::MAX` is taken.
    pub fn commit(&mut self, outcome: &ValidationOutcome) -> Result<LessonId> {
        let (request, occurrences) = match outcome {
            ValidationOutcome::Accepted {
                request,
                occurrences,
            } => (request, occurrences),
            ValidationOutcome::Rejected { violations } => {
                return Err(SchedulingError::RejectedRequest(violations.len()));
            }
        };

        self.recheck(request, occurrences)?;

        let id = match request.lesson_id {
            Some(id) => {
                self.entries.retain(|e| e.id != Some(id));
                id
            }
            None => self.next_id.ok_or(SchedulingError::LessonIdsExhausted)?,
        };
        self.mark_used(id);

        self.entries.extend(occurrences.iter().map(|o| ScheduleEntry {
            id: Some(id),
            student_id: request.student_id,
            tutor_id: request.tutor_id,
            subject: request.subject.clone(),
            start: o.start,
            duration_minutes: o.duration_minutes,
        }));
        debug!(
            "committed lesson {} for student {}: {} occurrence(s)",
            id,
            request.student_id,
            occurrences.len()
        );

        Ok(id)
    }

    fn mark_used(&mut self, id: LessonId) {
        if self.next_id.is_some_and(|next| id >= next) {
            self.next_id = id.checked_add(1);
        }
    }

    fn recheck(&self, request: &LessonRequest, occurrences: &[Occurrence]) -> Result<()> {
        let relevant: Vec<ScheduleEntry> = self
            .entries
            .iter()
            .filter(|e| {
                e.student_id == request.student_id
                    || (request.tutor_id.is_some() && e.tutor_id == request.tutor_id)
            })
            .cloned()
            .collect();

        let conflicts = conflict::find_conflicts(occurrences, &relevant, request.lesson_id);
        if let Some(first) = conflicts.first() {
            warn!(
                "commit for student {} lost a race: {} conflicting occurrence(s)",
                request.student_id,
                conflicts.len()
            );
            return Err(SchedulingError::CommitConflict(format!(
                "{} at {} overlaps {} at {}",
                request.subject, first.occurrence.start, first.entry.subject, first.entry.start
            )));
        }
        Ok(())
    }
}

impl ScheduleSource for InMemorySchedule {
    fn student_schedule(&self, student_id: StudentId, from: DateTime<Utc>) -> Vec<ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.student_id == student_id && e.start >= from)
            .cloned()
            .collect()
    }

    fn tutor_schedule(&self, tutor_id: TutorId, from: DateTime<Utc>) -> Vec<ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.tutor_id == Some(tutor_id) && e.start >= from)
            .cloned()
            .collect()
    }
}
