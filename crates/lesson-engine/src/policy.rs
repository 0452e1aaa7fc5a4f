//! Scheduling policy: the tunable constants behind the validation rules and
//! billing.
//!
//! Defaults reproduce the tutoring centre's rules (08:00-20:00 working hours,
//! 30-240 minute lessons in 15 minute steps, 0.50 per minute). A policy can be
//! loaded from JSON; omitted keys keep their default, unknown keys are refused.

use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::billing::DEFAULT_RATE_PER_MINUTE;
use crate::error::{Result, SchedulingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulingPolicy {
    /// IANA timezone the working-hours window and end dates are read in.
    pub timezone: String,
    /// Earliest wall-clock time a lesson may start.
    pub opening_time: NaiveTime,
    /// Latest wall-clock time a lesson may end.
    pub closing_time: NaiveTime,
    pub min_duration_minutes: u32,
    pub max_duration_minutes: u32,
    pub duration_granularity_minutes: u32,
    pub rate_per_minute: Decimal,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            closing_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default(),
            min_duration_minutes: 30,
            max_duration_minutes: 240,
            duration_granularity_minutes: 15,
            rate_per_minute: DEFAULT_RATE_PER_MINUTE,
        }
    }
}

impl SchedulingPolicy {
    /// Parse and check a policy from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: SchedulingPolicy = serde_json::from_str(json)?;
        policy.check()?;
        Ok(policy)
    }

    /// Reject policies no request could ever satisfy, and unknown timezones.
    pub fn check(&self) -> Result<()> {
        self.tz()?;
        if self.opening_time >= self.closing_time {
            return Err(SchedulingError::InvalidPolicy(format!(
                "opening time {} must be before closing time {}",
                self.opening_time, self.closing_time
            )));
        }
        if self.duration_granularity_minutes == 0 {
            return Err(SchedulingError::InvalidPolicy(
                "duration granularity must be positive".to_string(),
            ));
        }
        if self.min_duration_minutes > self.max_duration_minutes {
            return Err(SchedulingError::InvalidPolicy(format!(
                "minimum duration {} exceeds maximum duration {}",
                self.min_duration_minutes, self.max_duration_minutes
            )));
        }
        if self.rate_per_minute.is_sign_negative() {
            return Err(SchedulingError::InvalidPolicy(format!(
                "rate per minute {} must not be negative",
                self.rate_per_minute
            )));
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| SchedulingError::InvalidTimezone(self.timezone.clone()))
    }
}
