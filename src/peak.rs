//! Daily peak-hour window classification
//!
//! A peak window is a clock-time interval with no date. It may wrap past
//! midnight: 22:00-06:00 is peak from 22:00 to the following 06:00.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Check if a local time of day falls inside the peak window.
///
/// `start <= end`: peak when `start <= t < end`.
/// `start > end`: peak when `t >= start` or `t < end`.
/// Without both bounds there is no peak window and the result is `false`.
pub fn is_peak_time(
    local_time: NaiveTime,
    peak_start: Option<NaiveTime>,
    peak_end: Option<NaiveTime>,
) -> bool {
    match (peak_start, peak_end) {
        (Some(start), Some(end)) if start <= end => local_time >= start && local_time < end,
        (Some(start), Some(end)) => local_time >= start || local_time < end,
        _ => false,
    }
}

/// Recurring daily peak interval, in local clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PeakWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build from hour/minute pairs, `None` if out of range
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, local_time: NaiveTime) -> bool {
        is_peak_time(local_time, Some(self.start), Some(self.end))
    }

    /// Check an instant against the window using the given local convention
    pub fn contains_instant(&self, instant: DateTime<Utc>, tz: Tz) -> bool {
        self.contains(instant.with_timezone(&tz).time())
    }

    /// Wall-clock time of `[period_start, period_end)` spent inside the window.
    ///
    /// The period is cut at every local occurrence of the window bounds;
    /// each resulting segment lies entirely on one side of the window, so
    /// classifying its first instant classifies the whole segment.
    pub fn peak_duration(
        &self,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        tz: Tz,
    ) -> Duration {
        if period_end <= period_start {
            return Duration::zero();
        }

        let mut cuts = vec![period_start, period_end];
        let first_day = period_start.with_timezone(&tz).date_naive();
        let last_day = period_end.with_timezone(&tz).date_naive();

        let mut day = first_day.pred_opt().unwrap_or(first_day);
        while day <= last_day {
            for bound in [self.start, self.end] {
                for instant in resolve_local(tz, day.and_time(bound)) {
                    if instant > period_start && instant < period_end {
                        cuts.push(instant);
                    }
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        cuts.sort();
        cuts.dedup();

        cuts.windows(2)
            .filter(|seg| self.contains_instant(seg[0], tz))
            .fold(Duration::zero(), |acc, seg| acc + (seg[1] - seg[0]))
    }

    /// Share of the period inside the window, in `[0.0, 1.0]`.
    ///
    /// A zero-length period is classified by its single instant.
    pub fn peak_fraction(
        &self,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        tz: Tz,
    ) -> f64 {
        let total = (period_end - period_start).num_milliseconds();
        if total <= 0 {
            return if self.contains_instant(period_start, tz) {
                1.0
            } else {
                0.0
            };
        }
        let peak = self.peak_duration(period_start, period_end, tz).num_milliseconds();
        (peak as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// UTC instants for a local wall-clock time.
///
/// Both instants are returned in a DST fold. In a DST gap the time is moved
/// forward to the first valid local time.
fn resolve_local(tz: Tz, local: NaiveDateTime) -> Vec<DateTime<Utc>> {
    let mut candidate = local;
    // Gaps are at most a few hours; 16 quarter-hour steps cover every zone.
    for _ in 0..=16 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(t) => return vec![t.with_timezone(&Utc)],
            LocalResult::Ambiguous(a, b) => {
                return vec![a.with_timezone(&Utc), b.with_timezone(&Utc)]
            }
            LocalResult::None => candidate += Duration::minutes(15),
        }
    }
    Vec::new()
}
