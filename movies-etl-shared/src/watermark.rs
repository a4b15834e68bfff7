//! Watermark timestamps.
//!
//! A watermark is the inclusive "modified since" boundary of an extraction
//! pass. It is persisted as `YYYY-MM-DD HH:MM:SS` in UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use thiserror::Error;

/// Persisted text format of a watermark.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Error returned when a persisted watermark cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid watermark '{value}': {reason}")]
pub struct WatermarkParseError {
    pub value: String,
    pub reason: String,
}

/// Inclusive lower bound for "modified since" comparisons, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(NaiveDateTime);

impl Watermark {
    /// The earliest watermark: `0001-01-01 00:00:00`.
    pub fn min() -> Self {
        let date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
        Self(date.and_time(NaiveTime::default()))
    }

    /// Truncate a UTC instant to whole seconds.
    pub fn from_utc(at: DateTime<Utc>) -> Self {
        let naive = at.naive_utc();
        Self(naive.with_nanosecond(0).unwrap_or(naive))
    }

    /// The watermark as a UTC instant, suitable for query parameters.
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.0.and_utc()
    }

    /// Parse the persisted form.
    ///
    /// A trailing `+0000` offset, as written by older state records, is accepted.
    pub fn parse(value: &str) -> Result<Self, WatermarkParseError> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_suffix("+0000").unwrap_or(trimmed);
        NaiveDateTime::parse_from_str(trimmed, WATERMARK_FORMAT)
            .map(Self)
            .map_err(|e| WatermarkParseError {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::min()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WATERMARK_FORMAT))
    }
}

impl FromStr for Watermark {
    type Err = WatermarkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
