//! Rental-period temporal math
//!
//! Rental intervals are half-open in business terms but every comparison in
//! the booking rules is inclusive on both ends. Day and hour counts always
//! round up: a rental of five days and one minute bills six days.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod { start: String, end: String },
}

/// The scheduled interval of a rental contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriod {
    /// Scheduled pickup time (inclusive)
    pub start: DateTime<Utc>,
    /// Scheduled return time (inclusive)
    pub end: DateTime<Utc>,
}

impl RentalPeriod {
    /// Creates a new period, rejecting empty or inverted intervals
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start >= end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Number of billable rental days, rounded up
    pub fn rental_days(&self) -> i64 {
        ceil_days(self.start, self.end)
    }

    /// Returns this period widened by `days` on both sides
    pub fn widen_days(&self, days: i64) -> RentalPeriod {
        RentalPeriod {
            start: self.start - Duration::days(days),
            end: self.end + Duration::days(days),
        }
    }

    /// Inclusive interval-overlap test: `a.start <= b.end && a.end >= b.start`
    pub fn overlaps(&self, other: &RentalPeriod) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// True if the scheduled return time has passed
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end < now
    }

    /// True if the scheduled pickup time has been reached
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start <= now
    }
}

/// Whole days between two instants, rounded up; zero when `end <= start`
pub fn ceil_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let secs = (end - start).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 86_399) / 86_400
    }
}

/// Whole hours between two instants, rounded up; zero when `end <= start`
pub fn ceil_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let secs = (end - start).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 3_599) / 3_600
    }
}

/// Chargeable late hours for a return
///
/// `ceil(actual_end - scheduled_end in hours) - grace_hours`. A result of
/// zero or less means the return is within the grace window and no late
/// charge applies.
pub fn late_hours(
    scheduled_end: DateTime<Utc>,
    actual_end: DateTime<Utc>,
    grace_hours: i64,
) -> i64 {
    ceil_hours(scheduled_end, actual_end) - grace_hours
}
