//! Error types for lesson-engine operations.
//!
//! These are hard errors: malformed input or a failed commit. A lesson request
//! that merely breaks a business rule is not an error; it comes back as a
//! [`crate::validator::ValidationOutcome::Rejected`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Invalid recurrence mode: '{0}' (expected None, Daily, Weekly or Monthly)")]
    InvalidRecurrenceMode(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid scheduling policy: {0}")]
    InvalidPolicy(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// A billed amount does not fit in a `Decimal`.
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// The store refused to commit because another lesson took the slot after
    /// the request was validated.
    #[error("Commit rejected: {0}")]
    CommitConflict(String),

    #[error("Cannot commit a rejected lesson request ({0} violation(s))")]
    RejectedRequest(usize),

    #[error("No lesson ids left: {} is already taken", u64::MAX)]
    LessonIdsExhausted,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
