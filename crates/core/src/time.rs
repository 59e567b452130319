//! Timestamp normalization.
//!
//! Every time shown in a report is moved onto one UTC offset: the offset of the
//! machine at the moment the report is generated. The offset a commit was
//! authored in is not consulted.

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;

/// Pattern used for the build creation time, e.g. `09/22/2023 12:00:00 AM -0700`.
pub const BUILD_CREATED_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p %z";

/// Pattern used for the time of a change row, e.g. `2023-09-09 22:43:56 +0000`.
pub const ROW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// The wall clock and UTC offset of a single report run.
///
/// A `RunClock` is captured once and passed to everything that needs the
/// current time, so all rows of a report share the same offset.
///
/// # Examples
///
/// ```
/// use chrono::{DateTime, FixedOffset};
/// use commit_insights_core::time::RunClock;
///
/// let now = DateTime::from_timestamp(1695366000, 0).unwrap();
/// let clock = RunClock::fixed(now, FixedOffset::west_opt(7 * 3600).unwrap());
///
/// assert_eq!(clock.format_build_created(None), "09/22/2023 12:00:00 AM -0700");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl RunClock {
    /// Captures the current time and the local UTC offset.
    pub fn system() -> Self {
        let local = Local::now();
        Self {
            now: local.with_timezone(&Utc),
            offset: local.offset().fix(),
        }
    }

    pub fn fixed(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Moves a UTC instant onto the run offset.
    ///
    /// The instant itself is unchanged, so normalizing an already normalized
    /// value gives the same result.
    pub fn normalize(&self, time: DateTime<Utc>) -> DateTime<FixedOffset> {
        time.with_timezone(&self.offset)
    }

    /// Formats the build creation time, defaulting to the run's current time
    /// when no valid epoch is supplied.
    pub fn format_build_created(&self, epoch_seconds: Option<i64>) -> String {
        let created = epoch_seconds
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(self.now);
        self.normalize(created)
            .format(BUILD_CREATED_FORMAT)
            .to_string()
    }
}

/// Parses a base-10 count of seconds since the Unix epoch.
pub fn parse_epoch(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

pub fn format_row_time(time: &DateTime<FixedOffset>) -> String {
    time.format(ROW_TIME_FORMAT).to_string()
}
