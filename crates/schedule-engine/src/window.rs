//! Time windows and the shared overlap predicate.
//!
//! Both the conflict detector and the free-slot suggester decide "busy" through
//! [`overlaps`], so a slot judged free by one is judged conflict-free by the other.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// An absolute `[start, end]` interval.
///
/// Fields are public so store records can be built directly; [`TimeWindow::new`]
/// is the checked constructor for caller-supplied windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `end < start`.
    ///
    /// A zero-length window (`end == start`) is accepted; it is a point query.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let window = Self { start, end };
        window.ensure_ordered()?;
        Ok(window)
    }

    /// Parse both bounds with [`parse_timestamp`] and build a checked window.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    pub(crate) fn ensure_ordered(&self) -> Result<()> {
        if self.is_inverted() {
            return Err(ScheduleError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Inclusive overlap test, see [`overlaps`].
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        overlaps(self, other)
    }

    /// Expand to whole UTC calendar days: midnight of the start day minus
    /// `extra_days` through the last instant of the end day plus `extra_days`.
    ///
    /// Saturates at the representable range instead of overflowing.
    pub fn day_span(&self, extra_days: u32) -> TimeWindow {
        let extra_days = i64::from(extra_days);
        let start = Duration::try_days(extra_days)
            .and_then(|pad| start_of_day(self.start.date_naive()).checked_sub_signed(pad))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = Duration::try_days(extra_days + 1)
            .and_then(|pad| start_of_day(self.end.date_naive()).checked_add_signed(pad))
            .and_then(|next| next.checked_sub_signed(Duration::milliseconds(1)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        TimeWindow { start, end }
    }
}

/// `a.start <= b.end && a.end >= b.start`.
///
/// Closed at both ends: back-to-back windows (one ends exactly when the other
/// starts) count as overlapping.
pub fn overlaps(a: &TimeWindow, b: &TimeWindow) -> bool {
    a.start <= b.end && a.end >= b.start
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Parse a timestamp into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (e.g. "2026-03-16T14:00:00+01:00") and naive
/// "YYYY-MM-DD HH:MM:SS" / "YYYY-MM-DDTHH:MM:SS", which are read as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| ScheduleError::InvalidTimestamp(s.to_string()))
}
