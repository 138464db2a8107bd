//! Display formatting for durations and dates

use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};

/// A duration split into clock fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub millis: u64,
}

impl TimeParts {
    pub fn from_ms(ms: u64) -> Self {
        let total_secs = ms / 1000;
        Self {
            hours: total_secs / 3600,
            minutes: (total_secs % 3600) / 60,
            seconds: total_secs % 60,
            millis: ms % 1000,
        }
    }
}

/// `HH:MM:SS.mmm`
impl fmt::Display for TimeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.millis
        )
    }
}

/// Format milliseconds as "HH:MM:SS.mmm"
pub fn format_time(ms: u64) -> String {
    TimeParts::from_ms(ms).to_string()
}

/// Compact form for lap deltas: "MM:SS.mmm", or "SS.mmm" under a minute
pub fn format_time_short(ms: u64) -> String {
    let total_secs = ms / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    let millis = ms % 1000;
    if minutes > 0 {
        format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
    } else {
        format!("{:02}.{:03}", seconds, millis)
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2023-11-14T22:13:20.000Z`
pub fn iso8601(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Long header date, e.g. `Tuesday, November 14, 2023`
pub fn format_date(epoch_ms: i64, utc_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or_default()
        .with_timezone(&offset)
        .format("%A, %B %-d, %Y")
        .to_string()
}

/// Milliseconds from `epoch_ms` to the next local midnight (a full day when
/// already at midnight)
pub fn ms_until_next_midnight(epoch_ms: i64, utc_offset_minutes: i32) -> i64 {
    let local = epoch_ms + i64::from(utc_offset_minutes) * 60_000;
    DAY_MS - local.rem_euclid(DAY_MS)
}
