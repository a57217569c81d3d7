//! Work-log time arithmetic.
//!
//! A ticket accumulates work intervals; at most one per user is open at a
//! time. Elapsed time is the sum of closed intervals plus the open one up to
//! `now`, reported in whole minutes.

use chrono::{DateTime, Utc};

/// A single timed work interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkInterval {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkInterval {
    /// Milliseconds covered by this interval as of `now`.
    ///
    /// Open intervals run until `now`. Negative spans (clock skew between the
    /// backend and this host, or an end before the start) count as zero.
    #[must_use]
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).num_milliseconds().max(0)
    }

    /// Whether the interval is still running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Total whole minutes worked across `intervals` as of `now`.
///
/// Milliseconds are summed first and floored once, so two 30-second
/// intervals add up to one minute.
#[must_use]
pub fn minutes_worked<'a, I>(intervals: I, now: DateTime<Utc>) -> i64
where
    I: IntoIterator<Item = &'a WorkInterval>,
{
    let total_ms: i64 = intervals.into_iter().map(|wl| wl.elapsed_ms(now)).sum();
    total_ms / 60_000
}

/// Whether any interval is still open.
#[must_use]
pub fn has_active_work<'a, I>(intervals: I) -> bool
where
    I: IntoIterator<Item = &'a WorkInterval>,
{
    intervals.into_iter().any(WorkInterval::is_active)
}

/// Format minutes as zero-padded `HH:MM`.
///
/// Hours do not wrap at 24: 1500 minutes is `25:00`.
#[must_use]
pub fn format_hhmm(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
