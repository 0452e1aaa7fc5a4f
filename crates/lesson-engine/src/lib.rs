//! # lesson-engine
//!
//! Scheduling core for a tutoring marketplace: expands lesson requests into
//! dated occurrences, checks them against the student's and tutor's existing
//! lessons, enforces the centre's temporal rules and prices the result.
//!
//! Everything here is a pure computation over values passed in. Existing
//! schedules arrive as snapshots; the [`store`] module defines where they come
//! from and provides an in-memory store whose commit is the final word on
//! conflicts.
//!
//! ## Modules
//!
//! - [`recurrence`] — `None` / `Daily` / `Weekly` / `Monthly` (30-day stride)
//! - [`expander`] — anchor + end date + mode → ordered occurrence dates
//! - [`conflict`] — half-open interval overlap against schedule entries
//! - [`validator`] — all business rules, accumulated into one outcome
//! - [`billing`] — amounts from duration, occurrence count and rate
//! - [`lesson`] — requests, occurrences, schedule entries, lessons
//! - [`policy`] — working hours, duration bounds, timezone, rate
//! - [`store`] — schedule source trait and in-memory store
//! - [`error`] — Error types

pub mod billing;
pub mod conflict;
pub mod error;
pub mod expander;
pub mod lesson;
pub mod policy;
pub mod recurrence;
pub mod store;
pub mod validator;

pub use billing::{calculate_amount, DEFAULT_RATE_PER_MINUTE};
pub use conflict::{find_conflicts, find_overlaps, overlaps};
pub use error::SchedulingError;
pub use expander::{expand, expand_str};
pub use lesson::{Lesson, LessonRequest, LessonStatus, Occurrence, ScheduleEntry};
pub use policy::SchedulingPolicy;
pub use recurrence::RecurrenceMode;
pub use store::{InMemorySchedule, ScheduleSource};
pub use validator::{validate, LessonValidator, ValidationOutcome, Violation, ViolationKind};
