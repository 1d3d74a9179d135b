//! Consumption statistics and time-bucketed breakdowns
//!
//! [`aggregate`] reduces a reading series over a period into summary
//! statistics plus one breakdown entry per bucket. [`RunningStats`] is the
//! incremental accumulator behind it, usable on streams that should not be
//! materialized.

use crate::error::AnalysisError;
use crate::reading::ConsumptionReading;
use crate::site::DeviceId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Incremental count/sum/min/max/mean/variance accumulator.
///
/// Mean and variance use Welford's update so long series of near-equal
/// values do not lose precision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of values
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut stats = Self::new();
        for value in values {
            stats.push(value);
        }
        stats
    }

    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        self.count += 1;
        self.sum += value;

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Combine two accumulators (Chan et al. parallel update).
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;

        self.mean += delta * n_b / n;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n;
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean, or 0.0 when empty
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Minimum, or 0.0 when empty
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    /// Maximum, or 0.0 when empty
    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }

    /// Sample variance (n - 1 denominator), 0.0 with fewer than 2 values
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).max(0.0)
    }

    pub fn sample_std_dev(&self) -> f64 {
        self.sample_variance().sqrt()
    }

    /// Snapshot as consumption statistics
    pub fn to_stats(&self) -> ConsumptionStats {
        ConsumptionStats {
            total: self.sum,
            average: self.mean(),
            peak: self.max(),
            min: self.min(),
            data_points: self.count,
        }
    }
}

/// Aggregate numbers over a set of readings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionStats {
    /// Sum of consumption (kWh)
    pub total: f64,
    /// Mean consumption per reading (kWh)
    pub average: f64,
    /// Largest single reading (kWh)
    pub peak: f64,
    /// Smallest single reading (kWh)
    pub min: f64,
    /// Number of readings
    pub data_points: u64,
}

/// Width of the breakdown buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    QuarterHour,
    Hour,
    #[default]
    Day,
    Week,
    /// Arbitrary width, in seconds
    Custom { seconds: i64 },
}

impl Granularity {
    /// Bucket width
    pub fn width(&self) -> Duration {
        match self {
            Granularity::QuarterHour => Duration::minutes(15),
            Granularity::Hour => Duration::hours(1),
            Granularity::Day => Duration::days(1),
            Granularity::Week => Duration::weeks(1),
            // Out of range widths collapse to zero and are rejected by `bucket_count`
            Granularity::Custom { seconds } => {
                Duration::try_seconds(*seconds).unwrap_or_else(Duration::zero)
            }
        }
    }

    fn width_ms(&self) -> Result<i64, AnalysisError> {
        let ms = self.width().num_milliseconds();
        if ms <= 0 {
            let seconds = match self {
                Granularity::Custom { seconds } => *seconds,
                _ => self.width().num_seconds(),
            };
            return Err(AnalysisError::InvalidGranularity { seconds });
        }
        Ok(ms)
    }

    /// Reject non-positive widths
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.width_ms().map(|_| ())
    }

    /// Number of buckets needed to cover `[start, end)`; the last one may be
    /// partial.
    pub fn bucket_count(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, AnalysisError> {
        if end < start {
            return Err(AnalysisError::InvalidPeriod { start, end });
        }
        let width = self.width_ms()?;
        let span = (end - start).num_milliseconds();
        let count = span / width + i64::from(span % width != 0);
        usize::try_from(count).map_err(|_| AnalysisError::InvalidPeriod { start, end })
    }
}

/// One bucket of a breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    /// Bucket start
    pub timestamp: DateTime<Utc>,
    /// Summed consumption in the bucket (kWh)
    pub consumption: f64,
}

/// Statistics and breakdown for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionAnalysisResult {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub granularity: Granularity,
    #[serde(flatten)]
    pub stats: ConsumptionStats,
    /// Ordered by timestamp, one entry per bucket
    pub breakdown: Vec<BreakdownEntry>,
}

impl ConsumptionAnalysisResult {
    /// Sum of the breakdown consumption values
    pub fn breakdown_total(&self) -> f64 {
        self.breakdown.iter().map(|b| b.consumption).sum()
    }
}

/// Summarize readings in `[period_start, period_end)` into statistics and a
/// breakdown anchored at `period_start`.
///
/// Empty buckets are kept with zero consumption. With no readings in range
/// every statistic is zero.
pub fn aggregate(
    readings: &[ConsumptionReading],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    granularity: Granularity,
) -> Result<ConsumptionAnalysisResult, AnalysisError> {
    let bucket_count = granularity.bucket_count(period_start, period_end)?;
    let width_ms = granularity.width_ms()?;

    let mut buckets = vec![0.0_f64; bucket_count];
    let mut running = RunningStats::new();

    for reading in readings
        .iter()
        .filter(|r| r.is_within(period_start, period_end))
    {
        reading.validate()?;

        let offset = (reading.timestamp_utc - period_start).num_milliseconds();
        let idx = (offset / width_ms) as usize;
        // idx < bucket_count holds since the reading is strictly before period_end
        buckets[idx] += reading.consumption_kwh;
        running.push(reading.consumption_kwh);
    }

    let breakdown: Vec<BreakdownEntry> = buckets
        .into_iter()
        .enumerate()
        .map(|(i, consumption)| BreakdownEntry {
            // Bucket starts lie in [period_start, period_end), so the offset fits
            timestamp: period_start + Duration::milliseconds(width_ms.saturating_mul(i as i64)),
            consumption,
        })
        .collect();

    // Total is re-derived from the breakdown so both always agree exactly.
    let mut stats = running.to_stats();
    stats.total = breakdown.iter().map(|b| b.consumption).sum();

    log::trace!(
        "aggregated {} readings into {} buckets ({:?})",
        stats.data_points,
        breakdown.len(),
        granularity
    );

    Ok(ConsumptionAnalysisResult {
        period_start,
        period_end,
        granularity,
        stats,
        breakdown,
    })
}

/// Change between two periods
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub current_total: f64,
    pub previous_total: f64,
    /// current - previous (kWh)
    pub change_kwh: f64,
    /// Relative change in percent; `None` when the previous total is zero
    pub change_percent: Option<f64>,
}

/// Compare the totals of two periods
pub fn compare_periods(current: &ConsumptionStats, previous: &ConsumptionStats) -> PeriodComparison {
    let change_kwh = current.total - previous.total;
    let change_percent = if previous.total == 0.0 {
        None
    } else {
        Some(change_kwh / previous.total * 100.0)
    };

    PeriodComparison {
        current_total: current.total,
        previous_total: previous.total,
        change_kwh,
        change_percent,
    }
}

/// Per-device statistics over all given readings
pub fn totals_by_device(readings: &[ConsumptionReading]) -> BTreeMap<DeviceId, ConsumptionStats> {
    let mut per_device: BTreeMap<DeviceId, RunningStats> = BTreeMap::new();
    for reading in readings {
        per_device
            .entry(reading.device_id.clone())
            .or_default()
            .push(reading.consumption_kwh);
    }
    per_device
        .into_iter()
        .map(|(id, stats)| (id, stats.to_stats()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn reading(day: u32, hour: u32, kwh: f64) -> ConsumptionReading {
        ConsumptionReading::new("meter-1", ts(day, hour), kwh)
    }

    #[test]
    fn test_running_stats_basic() {
        let stats = RunningStats::from_values([10.0, 20.0, 30.0]);
        assert_eq!(stats.count(), 3);
        assert_relative_eq!(stats.mean(), 20.0);
        assert_relative_eq!(stats.sample_std_dev(), 10.0);
        assert_relative_eq!(stats.min(), 10.0);
        assert_relative_eq!(stats.max(), 30.0);
    }

    #[test]
    fn test_running_stats_empty_is_zero() {
        let stats = RunningStats::new();
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.min(), 0.0);
        assert_eq!(stats.max(), 0.0);
        assert_eq!(stats.sample_std_dev(), 0.0);
    }

    #[test]
    fn test_running_stats_constant_has_zero_std() {
        let stats = RunningStats::from_values([10.0, 10.0, 10.0, 10.0]);
        assert_eq!(stats.sample_std_dev(), 0.0);
    }

    #[test]
    fn test_running_stats_merge() {
        let mut a = RunningStats::from_values([1.0, 2.0, 3.0]);
        let b = RunningStats::from_values([4.0, 5.0]);
        a.merge(&b);

        let all = RunningStats::from_values([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(a.count(), all.count());
        assert_relative_eq!(a.mean(), all.mean(), epsilon = 1e-12);
        assert_relative_eq!(a.sample_variance(), all.sample_variance(), epsilon = 1e-12);
        assert_relative_eq!(a.min(), 1.0);
        assert_relative_eq!(a.max(), 5.0);
    }

    #[test]
    fn test_aggregate_basic() {
        let readings = vec![reading(1, 1, 2.0), reading(1, 5, 4.0), reading(2, 3, 6.0)];
        let result = aggregate(&readings, ts(1, 0), ts(3, 0), Granularity::Day).unwrap();

        assert_relative_eq!(result.stats.total, 12.0);
        assert_relative_eq!(result.stats.average, 4.0);
        assert_relative_eq!(result.stats.peak, 6.0);
        assert_relative_eq!(result.stats.min, 2.0);
        assert_eq!(result.stats.data_points, 3);

        assert_eq!(result.breakdown.len(), 2);
        assert_relative_eq!(result.breakdown[0].consumption, 6.0);
        assert_relative_eq!(result.breakdown[1].consumption, 6.0);
        assert_eq!(result.breakdown[1].timestamp, ts(2, 0));
    }

    #[test]
    fn test_aggregate_excludes_period_end() {
        let readings = vec![reading(1, 0, 1.0), reading(2, 0, 5.0)];
        let result = aggregate(&readings, ts(1, 0), ts(2, 0), Granularity::Hour).unwrap();
        assert_eq!(result.stats.data_points, 1);
        assert_eq!(result.breakdown.len(), 24);
    }

    #[test]
    fn test_aggregate_empty() {
        let result = aggregate(&[], ts(1, 0), ts(1, 6), Granularity::Hour).unwrap();
        assert_eq!(result.stats, ConsumptionStats::default());
        assert_eq!(result.breakdown.len(), 6);
        assert!(result.breakdown.iter().all(|b| b.consumption == 0.0));
        assert!(!result.stats.average.is_nan());
    }

    #[test]
    fn test_aggregate_partial_last_bucket() {
        let start = ts(1, 0);
        let end = start + Duration::minutes(90);
        let readings = vec![ConsumptionReading::new(
            "meter-1",
            start + Duration::minutes(80),
            3.0,
        )];
        let result = aggregate(&readings, start, end, Granularity::Hour).unwrap();
        assert_eq!(result.breakdown.len(), 2);
        assert_relative_eq!(result.breakdown[1].consumption, 3.0);
    }

    #[test]
    fn test_aggregate_zero_length_period() {
        let result = aggregate(&[reading(1, 0, 1.0)], ts(1, 0), ts(1, 0), Granularity::Day).unwrap();
        assert!(result.breakdown.is_empty());
        assert_eq!(result.stats.data_points, 0);
    }

    #[test]
    fn test_aggregate_extreme_custom_width() {
        let huge = Granularity::Custom {
            seconds: i64::MAX / 1000,
        };
        assert!(huge.validate().is_ok());

        let result = aggregate(&[], ts(1, 0), ts(2, 0), huge).unwrap();
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].timestamp, ts(1, 0));

        let readings = vec![reading(1, 3, 2.0), reading(1, 20, 5.0)];
        let result = aggregate(&readings, ts(1, 0), ts(2, 0), huge).unwrap();
        assert_relative_eq!(result.breakdown[0].consumption, 7.0);
        assert_relative_eq!(result.stats.total, 7.0);

        // Beyond the representable range the width is rejected, not wrapped
        assert!(matches!(
            aggregate(&[], ts(1, 0), ts(2, 0), Granularity::Custom { seconds: i64::MAX }),
            Err(AnalysisError::InvalidGranularity { .. })
        ));
    }

    #[test]
    fn test_aggregate_rejects_bad_input() {
        assert!(matches!(
            aggregate(&[], ts(2, 0), ts(1, 0), Granularity::Day),
            Err(AnalysisError::InvalidPeriod { .. })
        ));
        assert!(matches!(
            aggregate(&[], ts(1, 0), ts(2, 0), Granularity::Custom { seconds: 0 }),
            Err(AnalysisError::InvalidGranularity { .. })
        ));
        assert!(matches!(
            aggregate(&[reading(1, 2, -1.0)], ts(1, 0), ts(2, 0), Granularity::Day),
            Err(AnalysisError::InvalidReading { .. })
        ));
    }

    #[test]
    fn test_total_matches_breakdown() {
        let readings: Vec<_> = (0..48)
            .map(|h| {
                ConsumptionReading::new("meter-1", ts(1, 0) + Duration::hours(h), 0.1 * h as f64)
            })
            .collect();
        let result = aggregate(
            &readings,
            ts(1, 0),
            ts(3, 0),
            Granularity::Custom { seconds: 7 * 3600 },
        )
        .unwrap();
        assert_eq!(result.stats.total, result.breakdown_total());
    }

    #[test]
    fn test_compare_periods() {
        let current = ConsumptionStats {
            total: 120.0,
            ..Default::default()
        };
        let previous = ConsumptionStats {
            total: 100.0,
            ..Default::default()
        };
        let cmp = compare_periods(&current, &previous);
        assert_relative_eq!(cmp.change_kwh, 20.0);
        assert_relative_eq!(cmp.change_percent.unwrap(), 20.0);

        let cmp = compare_periods(&current, &ConsumptionStats::default());
        assert!(cmp.change_percent.is_none());
    }

    #[test]
    fn test_totals_by_device() {
        let readings = vec![
            ConsumptionReading::new("a", ts(1, 0), 1.0),
            ConsumptionReading::new("b", ts(1, 0), 5.0),
            ConsumptionReading::new("a", ts(1, 1), 3.0),
        ];
        let totals = totals_by_device(&readings);
        assert_eq!(totals.len(), 2);
        assert_relative_eq!(totals[&DeviceId::from("a")].total, 4.0);
        assert_eq!(totals[&DeviceId::from("b")].data_points, 1);
    }
}
