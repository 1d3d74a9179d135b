// Wattlens Insight - Historical baselines and projection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Consumption anomaly detection against per-device baselines.
//!
//! Each reading is compared with the mean and sample standard deviation of
//! the readings that precede it for the same device, the reading itself
//! excluded. A reading is anomalous when
//! `|consumption - mean| > sensitivity_factor * std_dev`.

use crate::baseline::{BaselineStats, RollingBaseline};
use crate::config::AnomalyConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wattlens::{ConsumptionReading, DeviceId};

/// Anomaly severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Beyond `sensitivity_factor` standard deviations.
    Warning,
    /// Beyond `critical_factor` standard deviations.
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// A flagged reading with the baseline it was judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub reading: ConsumptionReading,
    pub baseline_mean: f64,
    pub baseline_std_dev: f64,
    /// Number of prior readings in the baseline.
    pub baseline_count: usize,
    /// `consumption - baseline_mean`, signed.
    pub deviation: f64,
    pub sensitivity_factor: f64,
    pub severity: Severity,
}

impl Anomaly {
    /// Deviation in standard deviations, `None` when the baseline is flat.
    pub fn sigmas(&self) -> Option<f64> {
        if self.baseline_std_dev > 0.0 {
            Some(self.deviation / self.baseline_std_dev)
        } else {
            None
        }
    }

    /// Human readable description built only from the fields above.
    pub fn message(&self) -> String {
        let direction = if self.deviation >= 0.0 { "above" } else { "below" };
        format!(
            "[{}] device {} consumed {:.2} kWh at {}, {:.2} kWh {} baseline mean {:.2} kWh \
             (std dev {:.2}, {} prior readings, threshold {}x)",
            self.severity.as_str(),
            self.reading.device_id,
            self.reading.consumption_kwh,
            self.reading.timestamp_utc.to_rfc3339(),
            self.deviation.abs(),
            direction,
            self.baseline_mean,
            self.baseline_std_dev,
            self.baseline_count,
            self.sensitivity_factor,
        )
    }
}

/// Result of classifying one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum BaselineOutcome {
    /// Too few prior readings; the reading is not classified.
    InsufficientHistory { available: usize, required: usize },
    /// Within the band.
    Normal { mean: f64, std_dev: f64 },
    Anomalous(Anomaly),
}

impl BaselineOutcome {
    pub fn anomaly(&self) -> Option<&Anomaly> {
        match self {
            BaselineOutcome::Anomalous(anomaly) => Some(anomaly),
            _ => None,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, BaselineOutcome::Anomalous(_))
    }
}

/// Streaming detector keeping one rolling baseline per device.
///
/// Readings of a device must be observed in timestamp order.
pub struct AnomalyDetector {
    config: AnomalyConfig,
    baselines: HashMap<DeviceId, RollingBaseline>,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            baselines: HashMap::new(),
        })
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Classify a reading, then add it to its device's baseline.
    ///
    /// A negative or non-finite reading is rejected and leaves the baseline
    /// untouched.
    pub fn observe(&mut self, reading: &ConsumptionReading) -> Result<BaselineOutcome> {
        reading.validate()?;

        let lookback = self.config.lookback;
        let baseline = self
            .baselines
            .entry(reading.device_id.clone())
            .or_insert_with(|| RollingBaseline::new(lookback));

        let outcome = match baseline.stats(self.config.min_baseline) {
            None => BaselineOutcome::InsufficientHistory {
                available: baseline.len(),
                required: self.config.min_baseline,
            },
            Some(stats) => classify(reading, stats, &self.config),
        };

        baseline.push(reading.consumption_kwh);
        Ok(outcome)
    }

    /// Forget one device's history.
    pub fn reset_device(&mut self, device_id: &DeviceId) {
        self.baselines.remove(device_id);
    }

    pub fn tracked_devices(&self) -> usize {
        self.baselines.len()
    }
}

fn classify(
    reading: &ConsumptionReading,
    stats: BaselineStats,
    config: &AnomalyConfig,
) -> BaselineOutcome {
    let deviation = reading.consumption_kwh - stats.mean;
    let magnitude = deviation.abs();

    if magnitude <= config.sensitivity_factor * stats.std_dev {
        return BaselineOutcome::Normal {
            mean: stats.mean,
            std_dev: stats.std_dev,
        };
    }

    let severity = if magnitude > config.critical_factor * stats.std_dev {
        Severity::Critical
    } else {
        Severity::Warning
    };

    BaselineOutcome::Anomalous(Anomaly {
        reading: reading.clone(),
        baseline_mean: stats.mean,
        baseline_std_dev: stats.std_dev,
        baseline_count: stats.count,
        deviation,
        sensitivity_factor: config.sensitivity_factor,
        severity,
    })
}

/// Outcome of a batch detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    /// Flagged readings, grouped by device and in timestamp order.
    pub anomalies: Vec<Anomaly>,
    /// Readings that had enough history to be classified.
    pub evaluated: usize,
    /// Readings skipped for lack of history.
    pub skipped_insufficient_history: usize,
}

/// Flag anomalous readings using the default critical factor.
///
/// Readings may come from several devices and in any order; each device is
/// baselined on its own history only.
pub fn detect_anomalies(
    readings: &[ConsumptionReading],
    lookback: usize,
    sensitivity_factor: f64,
) -> Result<AnomalyReport> {
    let config = AnomalyConfig::default()
        .with_lookback(lookback)
        .with_sensitivity(sensitivity_factor);
    detect_anomalies_with(readings, &config)
}

/// Flag anomalous readings with a full configuration.
pub fn detect_anomalies_with(
    readings: &[ConsumptionReading],
    config: &AnomalyConfig,
) -> Result<AnomalyReport> {
    let mut detector = AnomalyDetector::new(config.clone())?;

    let mut ordered: Vec<&ConsumptionReading> = readings.iter().collect();
    ordered.sort_by(|a, b| {
        a.device_id
            .cmp(&b.device_id)
            .then(a.timestamp_utc.cmp(&b.timestamp_utc))
    });

    let mut report = AnomalyReport::default();
    for reading in ordered {
        match detector.observe(reading)? {
            BaselineOutcome::InsufficientHistory { .. } => report.skipped_insufficient_history += 1,
            BaselineOutcome::Normal { .. } => report.evaluated += 1,
            BaselineOutcome::Anomalous(anomaly) => {
                report.evaluated += 1;
                report.anomalies.push(anomaly);
            }
        }
    }

    log::debug!(
        "anomaly scan: {} flagged, {} evaluated, {} skipped for history",
        report.anomalies.len(),
        report.evaluated,
        report.skipped_insufficient_history
    );

    Ok(report)
}
