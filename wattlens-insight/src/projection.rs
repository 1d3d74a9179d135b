// Wattlens Insight - Historical baselines and projection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Linear consumption projection.
//!
//! The historical average daily consumption is extrapolated over the
//! horizon: `projected = average_daily_kwh * horizon_days`. Days are UTC
//! calendar days and only days with at least one reading count towards the
//! average.

use crate::config::ProjectionConfig;
use crate::error::{InsightError, Result};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use wattlens::{
    aggregate, calculate_cost, ConsumptionCostCalculation, ConsumptionReading, Granularity,
    TariffSchedule,
};

const MS_PER_DAY: f64 = 86_400_000.0;

/// How far a projection can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    /// Fewer distinct days of history than configured.
    Low,
}

/// Projected consumption over a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub projected_kwh: f64,
    /// Total consumption divided by the number of days that have at least
    /// one reading. Days without readings inside the history span do not
    /// pull the average down.
    pub average_daily_kwh: f64,
    /// Distinct days with readings used for the average.
    pub days_of_history: usize,
    pub horizon_days: f64,
    pub confidence: Confidence,
    /// Least-squares slope of daily totals (kWh per day, per day).
    /// Informational only; the projection itself is flat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_trend: Option<f64>,
}

impl Projection {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence == Confidence::Low
    }
}

/// Projects consumption from historical daily averages.
#[derive(Debug, Clone, Default)]
pub struct ConsumptionProjector {
    config: ProjectionConfig,
}

impl ConsumptionProjector {
    pub fn new(config: ProjectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Project the consumption of `readings` over `horizon`.
    pub fn project(&self, readings: &[ConsumptionReading], horizon: Duration) -> Result<Projection> {
        if horizon < Duration::zero() {
            return Err(InsightError::NegativeHorizon {
                seconds: horizon.num_seconds(),
            });
        }
        let horizon_days = horizon.num_milliseconds() as f64 / MS_PER_DAY;

        let latest_day = match readings.iter().map(|r| r.timestamp_utc.date_naive()).max() {
            Some(day) => day,
            None => {
                log::debug!("projection without history");
                return Ok(empty_projection(horizon_days));
            }
        };

        let earliest_day = readings
            .iter()
            .map(|r| r.timestamp_utc.date_naive())
            .min()
            .unwrap_or(latest_day);

        // A lookback reaching past the earliest reading adds only empty days
        let first_day = match self.config.lookback_days {
            Some(days) => latest_day
                .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
                .map_or(earliest_day, |day| day.max(earliest_day)),
            None => earliest_day,
        };

        let period_start = midnight(first_day);
        let period_end = midnight(latest_day) + Duration::days(1);
        let analysis = aggregate(readings, period_start, period_end, Granularity::Day)?;

        let days_with_data: BTreeSet<i64> = readings
            .iter()
            .filter(|r| r.is_within(period_start, period_end))
            .map(|r| (r.timestamp_utc.date_naive() - first_day).num_days())
            .collect();
        let days_of_history = days_with_data.len();

        let average_daily_kwh = if days_of_history == 0 {
            0.0
        } else {
            analysis.stats.total / days_of_history as f64
        };

        let daily_points: Vec<(f64, f64)> = days_with_data
            .iter()
            .filter_map(|&idx| {
                analysis
                    .breakdown
                    .get(idx as usize)
                    .map(|entry| (idx as f64, entry.consumption))
            })
            .collect();

        let confidence = if days_of_history < self.config.min_days_for_confidence as usize {
            Confidence::Low
        } else {
            Confidence::High
        };

        log::debug!(
            "projection over {:.2} days from {} days of history ({:?})",
            horizon_days,
            days_of_history,
            confidence
        );

        Ok(Projection {
            projected_kwh: average_daily_kwh * horizon_days,
            average_daily_kwh,
            days_of_history,
            horizon_days,
            confidence,
            daily_trend: linear_slope(&daily_points),
        })
    }
}

/// Project with the default configuration.
pub fn project(readings: &[ConsumptionReading], horizon: Duration) -> Result<Projection> {
    ConsumptionProjector::default().project(readings, horizon)
}

/// Price a projection over the horizon starting at `horizon_start`.
pub fn project_cost(
    projection: &Projection,
    horizon_start: DateTime<Utc>,
    schedule: &TariffSchedule,
) -> Result<ConsumptionCostCalculation> {
    let horizon_ms = (projection.horizon_days * MS_PER_DAY).round() as i64;
    let horizon_end = horizon_start + Duration::milliseconds(horizon_ms);
    calculate_cost(projection.projected_kwh, horizon_start, horizon_end, schedule)
        .map_err(InsightError::from)
}

fn empty_projection(horizon_days: f64) -> Projection {
    Projection {
        projected_kwh: 0.0,
        average_daily_kwh: 0.0,
        days_of_history: 0,
        horizon_days,
        confidence: Confidence::Low,
        daily_trend: None,
    }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Simple linear regression slope, `None` with fewer than two distinct x.
fn linear_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for &(x, y) in points {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    Some((n * sum_xy - sum_x * sum_y) / denom)
}
