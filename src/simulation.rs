//! Simulation accuracy
//!
//! A simulation is a stored estimate of consumption and cost for a future
//! period. Once the period has happened, the realized consumption is compared
//! against the estimate as a signed percentage error.

use crate::error::SimulationError;
use crate::reading::ConsumptionReading;
use crate::tariff::{calculate_cost, TariffFlag, TariffInfo, TariffSchedule};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed percentage error of a realized consumption against its estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "percent")]
pub enum Variance {
    Computed(f64),
    /// Estimate was zero; no percentage exists
    NotComputable,
}

impl Variance {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Variance::Computed(p) => Some(*p),
            Variance::NotComputable => None,
        }
    }

    pub fn is_computable(&self) -> bool {
        matches!(self, Variance::Computed(_))
    }
}

/// Stored estimate plus, once known, its realized outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    pub estimated_consumption: f64,
    pub estimated_cost: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub tariff_used: TariffInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_used: Option<TariffFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_consumption: Option<f64>,
    /// Derived from `real_consumption`; set through [`with_real_consumption`](Self::with_real_consumption)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<Variance>,
}

impl SimulationRecord {
    /// Price an estimate with the cost engine and record the rates used
    pub fn estimate(
        estimated_kwh: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        schedule: &TariffSchedule,
    ) -> Result<Self> {
        check_consumption("estimated_consumption", estimated_kwh)?;
        if end_date < start_date {
            return Err(SimulationError::InvalidPeriod {
                start: start_date,
                end: end_date,
            }
            .into());
        }

        let bill = calculate_cost(estimated_kwh, start_date, end_date, schedule)?;
        Ok(Self {
            estimated_consumption: estimated_kwh,
            estimated_cost: bill.total_cost,
            start_date,
            end_date,
            tariff_used: bill.tariff_info,
            flag_used: Some(schedule.current_flag()),
            real_consumption: None,
            variance: None,
        })
    }

    /// Record the realized consumption and derive the variance
    pub fn with_real_consumption(mut self, real_kwh: f64) -> Result<Self> {
        let variance = evaluate(&self, real_kwh)?;
        self.real_consumption = Some(real_kwh);
        self.variance = Some(variance);
        Ok(self)
    }

    /// Sum the readings of the simulated period and record them as realized
    pub fn with_realized_readings(self, readings: &[ConsumptionReading]) -> Result<Self> {
        let real = realized_consumption(&self, readings);
        self.with_real_consumption(real)
    }
}

/// Signed percentage error `(real - estimated) / estimated * 100`.
///
/// A zero estimate yields [`Variance::NotComputable`].
pub fn evaluate(
    simulation: &SimulationRecord,
    real_consumption: f64,
) -> std::result::Result<Variance, SimulationError> {
    check_consumption("estimated_consumption", simulation.estimated_consumption)?;
    check_consumption("real_consumption", real_consumption)?;

    let estimated = simulation.estimated_consumption;
    if estimated == 0.0 {
        return Ok(Variance::NotComputable);
    }
    Ok(Variance::Computed(
        (real_consumption - estimated) / estimated * 100.0,
    ))
}

/// Total consumption of the readings inside `[start_date, end_date)`
pub fn realized_consumption(simulation: &SimulationRecord, readings: &[ConsumptionReading]) -> f64 {
    readings
        .iter()
        .filter(|r| r.is_within(simulation.start_date, simulation.end_date))
        .map(|r| r.consumption_kwh)
        .sum()
}

/// Mean computed variance.
///
/// Records without a variance, or with one that is not computable, are left
/// out. `None` when nothing remains.
pub fn average_variance(records: &[SimulationRecord]) -> Option<f64> {
    let computed: Vec<f64> = computed_variances(records).collect();
    if computed.is_empty() {
        return None;
    }
    Some(computed.iter().sum::<f64>() / computed.len() as f64)
}

/// Accuracy over a set of simulations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracySummary {
    /// Records with a computed variance
    pub evaluated: usize,
    /// Records without one (never evaluated or zero estimate)
    pub excluded: usize,
    pub mean_variance: Option<f64>,
    pub mean_absolute_variance: Option<f64>,
    /// Evaluated records with `|variance| <= tolerance_percent`
    pub within_tolerance: usize,
    pub tolerance_percent: f64,
}

pub fn accuracy_summary(records: &[SimulationRecord], tolerance_percent: f64) -> AccuracySummary {
    let mut evaluated = 0usize;
    let mut sum = 0.0;
    let mut abs_sum = 0.0;
    let mut within_tolerance = 0usize;

    for v in computed_variances(records) {
        evaluated += 1;
        sum += v;
        abs_sum += v.abs();
        if v.abs() <= tolerance_percent {
            within_tolerance += 1;
        }
    }

    let excluded = records.len() - evaluated;
    if excluded > 0 {
        log::debug!("{} simulations excluded from accuracy summary", excluded);
    }

    let mean = |total: f64| (evaluated > 0).then(|| total / evaluated as f64);
    AccuracySummary {
        evaluated,
        excluded,
        mean_variance: mean(sum),
        mean_absolute_variance: mean(abs_sum),
        within_tolerance,
        tolerance_percent,
    }
}

fn computed_variances(records: &[SimulationRecord]) -> impl Iterator<Item = f64> + '_ {
    records
        .iter()
        .filter_map(|r| r.variance.and_then(|v| v.percent()))
}

fn check_consumption(field: &'static str, value: f64) -> std::result::Result<(), SimulationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::InvalidConsumption { field, value });
    }
    Ok(())
}
