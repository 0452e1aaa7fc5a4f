//! Detect lesson occurrences that collide with a participant's schedule.
//!
//! Lessons occupy half-open intervals `[start, start + duration)`. Back-to-back
//! lessons (one ends exactly when the next starts) are NOT conflicts.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::lesson::{LessonId, Occurrence, ScheduleEntry};

/// A detected collision between a candidate occurrence and an existing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub occurrence: Occurrence,
    pub entry: ScheduleEntry,
    pub overlap_minutes: i64,
}

/// Whether `[a_start, a_start + a_minutes)` and `[b_start, b_start + b_minutes)`
/// intersect.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_minutes: u32,
    b_start: DateTime<Utc>,
    b_minutes: u32,
) -> bool {
    let a_end = a_start + Duration::minutes(a_minutes as i64);
    let b_end = b_start + Duration::minutes(b_minutes as i64);
    a_start < b_end && b_start < a_end
}

/// Whether `candidate` collides with any entry in `existing`.
pub fn overlaps(candidate: &Occurrence, existing: &[ScheduleEntry]) -> bool {
    existing.iter().any(|entry| collides(candidate, entry))
}

/// The entries in `existing` that collide with `candidate`, in input order.
///
/// Entries whose `id` equals `exclude` are skipped, so a lesson being updated
/// never conflicts with its own stored occurrences.
pub fn find_overlaps<'a>(
    candidate: &Occurrence,
    existing: &'a [ScheduleEntry],
    exclude: Option<LessonId>,
) -> Vec<&'a ScheduleEntry> {
    existing
        .iter()
        .filter(|entry| !is_excluded(entry, exclude))
        .filter(|entry| collides(candidate, entry))
        .collect()
}

/// Find every (occurrence, entry) pair that collides.
///
/// The overlap duration is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn find_conflicts(
    occurrences: &[Occurrence],
    existing: &[ScheduleEntry],
    exclude: Option<LessonId>,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for occurrence in occurrences {
        for entry in find_overlaps(occurrence, existing, exclude) {
            let overlap_start = occurrence.start.max(entry.start);
            let overlap_end = occurrence.end().min(entry.end());
            conflicts.push(Conflict {
                occurrence: *occurrence,
                entry: entry.clone(),
                overlap_minutes: (overlap_end - overlap_start).num_minutes(),
            });
        }
    }

    conflicts
}

fn collides(candidate: &Occurrence, entry: &ScheduleEntry) -> bool {
    intervals_overlap(
        candidate.start,
        candidate.duration_minutes,
        entry.start,
        entry.duration_minutes,
    )
}

fn is_excluded(entry: &ScheduleEntry, exclude: Option<LessonId>) -> bool {
    exclude.is_some() && entry.id == exclude
}
