// Wattlens Testdata - Core generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Consumption series generation.
//!
//! Each device draws power along its [`LoadProfile`]; every sample converts
//! that draw into kWh over the sample interval, adds Gaussian noise and
//! applies any injected anomaly. Identical seeds give identical series.

use crate::anomalies::{AnomalyState, InjectedAnomaly};
use crate::patterns::LoadProfile;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use wattlens::ConsumptionReading;

const NOMINAL_VOLTAGE: f64 = 230.0;

/// Generation errors.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Sample interval must be positive, got {0}s")]
    InvalidInterval(i64),

    #[error("Invalid noise for device {device_id}: {std}")]
    InvalidNoise { device_id: String, std: f64 },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// First sample instant.
    pub start: DateTime<Utc>,
    /// Interval between samples in seconds.
    pub sample_interval_secs: i64,
    /// Number of samples per device.
    pub num_samples: usize,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start: Utc
                .timestamp_opt(1_706_745_600, 0) // 2024-02-01 00:00:00 UTC
                .single()
                .unwrap_or_default(),
            sample_interval_secs: 3600, // hourly
            num_samples: 24 * 7,        // one week
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn with_sample_interval_secs(mut self, secs: i64) -> Self {
        self.sample_interval_secs = secs;
        self
    }

    pub fn with_sample_interval_minutes(mut self, minutes: i64) -> Self {
        self.sample_interval_secs = minutes * 60;
        self
    }

    pub fn with_num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    /// Set duration in days (calculates num_samples from interval).
    pub fn with_duration_days(mut self, days: f64) -> Self {
        let total_secs = days * 86_400.0;
        self.num_samples = if self.sample_interval_secs > 0 {
            (total_secs / self.sample_interval_secs as f64).ceil() as usize
        } else {
            0
        };
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::seconds(self.sample_interval_secs)
    }

    /// Exclusive end of the generated period.
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp(self.num_samples)
    }

    fn timestamp(&self, sample: usize) -> DateTime<Utc> {
        self.start + Duration::seconds(self.sample_interval_secs * sample as i64)
    }
}

/// One simulated meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub device_id: String,
    pub profile: LoadProfile,
    /// Standard deviation of additive noise, in kWh per sample.
    pub noise_std: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<InjectedAnomaly>,
    /// Also emit voltage, current, power factor and temperature.
    pub electrical: bool,
}

impl DeviceProfile {
    pub fn new(device_id: &str, profile: LoadProfile) -> Self {
        Self {
            device_id: device_id.to_string(),
            profile,
            noise_std: 0.0,
            anomaly: None,
            electrical: false,
        }
    }

    pub fn with_noise(mut self, std: f64) -> Self {
        self.noise_std = std;
        self
    }

    pub fn with_anomaly(mut self, anomaly: InjectedAnomaly) -> Self {
        self.anomaly = Some(anomaly);
        self
    }

    pub fn with_electrical(mut self) -> Self {
        self.electrical = true;
        self
    }
}

/// Where an anomaly altered a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionMarker {
    pub device_id: String,
    pub sample: usize,
    pub timestamp: DateTime<Utc>,
    /// False when the reading was dropped.
    pub emitted: bool,
}

/// Generated readings plus ground truth about injected anomalies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedSeries {
    /// Grouped by device, each device in timestamp order.
    pub readings: Vec<ConsumptionReading>,
    pub injected: Vec<InjectionMarker>,
}

impl GeneratedSeries {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.injected.iter().filter(|m| !m.emitted).count()
    }

    pub fn to_json(&self) -> Result<String, GeneratorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), GeneratorError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, GeneratorError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Generate readings for every device over the configured period.
pub fn generate_readings(
    config: &GeneratorConfig,
    devices: &[DeviceProfile],
) -> Result<GeneratedSeries, GeneratorError> {
    if config.sample_interval_secs <= 0 {
        return Err(GeneratorError::InvalidInterval(config.sample_interval_secs));
    }

    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let interval_hours = config.sample_interval_secs as f64 / 3600.0;
    let mut series = GeneratedSeries::default();

    for device in devices {
        let noise = if device.noise_std > 0.0 {
            Some(
                Normal::new(0.0, device.noise_std).map_err(|_| GeneratorError::InvalidNoise {
                    device_id: device.device_id.clone(),
                    std: device.noise_std,
                })?,
            )
        } else if device.noise_std == 0.0 {
            None
        } else {
            return Err(GeneratorError::InvalidNoise {
                device_id: device.device_id.clone(),
                std: device.noise_std,
            });
        };

        let mut anomaly_state = AnomalyState::default();

        for i in 0..config.num_samples {
            let timestamp = config.timestamp(i);
            let mut kwh = device.profile.kw_at(timestamp) * interval_hours;
            if let Some(ref dist) = noise {
                kwh += dist.sample(&mut rng);
            }
            kwh = kwh.max(0.0);

            let value = match device.anomaly {
                Some(ref anomaly) if anomaly.is_active(i) => {
                    let since = anomaly.samples_since_start(i);
                    let v = anomaly_state.apply(&anomaly.kind, kwh, since);
                    series.injected.push(InjectionMarker {
                        device_id: device.device_id.clone(),
                        sample: i,
                        timestamp,
                        emitted: v.is_some(),
                    });
                    v
                }
                _ => Some(kwh),
            };

            let Some(kwh) = value.map(|v| v.max(0.0)) else {
                continue;
            };

            let mut reading = ConsumptionReading::new(device.device_id.as_str(), timestamp, kwh);
            if device.electrical {
                reading = with_electrical(reading, kwh / interval_hours, &mut rng);
            }
            series.readings.push(reading);
        }
    }

    Ok(series)
}

fn with_electrical(reading: ConsumptionReading, kw: f64, rng: &mut StdRng) -> ConsumptionReading {
    let voltage = NOMINAL_VOLTAGE + (rng.gen::<f64>() - 0.5) * 8.0;
    let power_factor = rng.gen_range(0.85..0.98);
    let current = kw * 1000.0 / (voltage * power_factor);
    let temperature = 30.0 + kw.min(100.0) * 0.2 + rng.gen::<f64>() * 2.0;
    reading
        .with_voltage(voltage)
        .with_current(current)
        .with_power_factor(power_factor)
        .with_temperature(temperature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomalies::AnomalyKind;
    use approx::assert_relative_eq;

    fn flat(id: &str, kw: f64) -> DeviceProfile {
        DeviceProfile::new(id, LoadProfile::Flat { kw })
    }

    #[test]
    fn test_config_builder() {
        let config = GeneratorConfig::new()
            .with_sample_interval_minutes(15)
            .with_duration_days(1.0)
            .with_seed(7);
        assert_eq!(config.sample_interval_secs, 900);
        assert_eq!(config.num_samples, 96);
        assert_eq!(config.end() - config.start, Duration::days(1));
    }

    #[test]
    fn test_flat_energy_per_sample() {
        let config = GeneratorConfig::new()
            .with_sample_interval_minutes(15)
            .with_num_samples(8)
            .with_seed(1);
        let series = generate_readings(&config, &[flat("m", 4.0)]).unwrap();
        assert_eq!(series.len(), 8);
        for r in &series.readings {
            assert_relative_eq!(r.consumption_kwh, 1.0);
        }
        assert_eq!(
            series.readings[1].timestamp_utc - series.readings[0].timestamp_utc,
            Duration::minutes(15)
        );
    }

    #[test]
    fn test_seed_reproducible() {
        let config = GeneratorConfig::new().with_num_samples(48).with_seed(42);
        let devices = [flat("a", 2.0).with_noise(0.3).with_electrical()];
        let first = generate_readings(&config, &devices).unwrap();
        let second = generate_readings(&config, &devices).unwrap();
        assert_eq!(first.readings, second.readings);
    }

    #[test]
    fn test_never_negative() {
        let config = GeneratorConfig::new().with_num_samples(500).with_seed(3);
        let series = generate_readings(&config, &[flat("a", 0.1).with_noise(2.0)]).unwrap();
        assert!(series.readings.iter().all(|r| r.consumption_kwh >= 0.0));
    }

    #[test]
    fn test_dropout_removes_readings() {
        let config = GeneratorConfig::new().with_num_samples(24).with_seed(5);
        let device = flat("a", 1.0)
            .with_anomaly(InjectedAnomaly::new(AnomalyKind::Dropout, 10).with_duration(4));
        let series = generate_readings(&config, &[device]).unwrap();
        assert_eq!(series.len(), 20);
        assert_eq!(series.dropped(), 4);
        assert_eq!(series.injected[0].sample, 10);
    }

    #[test]
    fn test_spike_marker() {
        let config = GeneratorConfig::new().with_num_samples(24).with_seed(5);
        let device = flat("a", 1.0)
            .with_anomaly(InjectedAnomaly::new(AnomalyKind::spike(10.0), 12).with_duration(1));
        let series = generate_readings(&config, &[device]).unwrap();
        assert_relative_eq!(series.readings[12].consumption_kwh, 10.0);
        assert_eq!(series.injected.len(), 1);
        assert_eq!(series.injected[0].timestamp, series.readings[12].timestamp_utc);
    }

    #[test]
    fn test_electrical_fields() {
        let config = GeneratorConfig::new().with_num_samples(4).with_seed(9);
        let series = generate_readings(&config, &[flat("a", 5.0).with_electrical()]).unwrap();
        let r = &series.readings[0];
        assert!(r.voltage.unwrap() > 220.0);
        let pf = r.power_factor.unwrap();
        assert!((0.85..0.98).contains(&pf));
        assert!(r.current.is_some() && r.temperature.is_some());
    }

    #[test]
    fn test_invalid_inputs() {
        let config = GeneratorConfig::new().with_sample_interval_secs(0);
        assert!(matches!(
            generate_readings(&config, &[flat("a", 1.0)]),
            Err(GeneratorError::InvalidInterval(0))
        ));

        let config = GeneratorConfig::new();
        assert!(matches!(
            generate_readings(&config, &[flat("a", 1.0).with_noise(-1.0)]),
            Err(GeneratorError::InvalidNoise { .. })
        ));
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let config = GeneratorConfig::new().with_num_samples(6).with_seed(11);
        let series = generate_readings(&config, &[flat("a", 1.5)]).unwrap();

        series.save_json(&path).unwrap();
        let loaded = GeneratedSeries::load_json(&path).unwrap();
        assert_eq!(loaded.readings, series.readings);
    }
}
