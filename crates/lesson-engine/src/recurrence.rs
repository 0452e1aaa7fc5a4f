//! Recurrence modes for lesson series.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;

/// How a lesson request repeats.
///
/// `Monthly` is a fixed 30-day stride, not a calendar month: a lesson on
/// 31 January repeats on 1 March in a leap year, never on "the last day of
/// February".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecurrenceMode {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RecurrenceMode {
    /// All modes in declaration order.
    pub const ALL: [RecurrenceMode; 4] = [
        RecurrenceMode::None,
        RecurrenceMode::Daily,
        RecurrenceMode::Weekly,
        RecurrenceMode::Monthly,
    ];

    /// Days between consecutive occurrences, or `None` for a one-off lesson.
    pub fn stride_days(self) -> Option<u16> {
        match self {
            RecurrenceMode::None => None,
            RecurrenceMode::Daily => Some(1),
            RecurrenceMode::Weekly => Some(7),
            RecurrenceMode::Monthly => Some(30),
        }
    }

    pub fn is_recurring(self) -> bool {
        self != RecurrenceMode::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceMode::None => "None",
            RecurrenceMode::Daily => "Daily",
            RecurrenceMode::Weekly => "Weekly",
            RecurrenceMode::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for RecurrenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceMode {
    type Err = SchedulingError;

    /// Parse a mode name. Matching ignores ASCII case and surrounding
    /// whitespace; anything else (including the empty string) is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        RecurrenceMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SchedulingError::InvalidRecurrenceMode(s.to_string()))
    }
}

impl TryFrom<String> for RecurrenceMode {
    type Error = SchedulingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecurrenceMode> for String {
    fn from(mode: RecurrenceMode) -> Self {
        mode.as_str().to_string()
    }
}
