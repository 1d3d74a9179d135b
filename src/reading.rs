//! Consumption readings
//!
//! A reading is an immutable fact reported by a metering device. Corrections
//! are new readings, never edits.

use crate::error::AnalysisError;
use crate::site::DeviceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single metered consumption value for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionReading {
    /// Reporting device
    pub device_id: DeviceId,
    /// Measurement instant
    pub timestamp_utc: DateTime<Utc>,
    /// Energy consumed, in kWh
    pub consumption_kwh: f64,
    /// Line voltage, in volts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    /// Line current, in amperes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Power factor (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_factor: Option<f64>,
    /// Device temperature, in °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl ConsumptionReading {
    /// Create a reading with only the required fields
    pub fn new(
        device_id: impl Into<DeviceId>,
        timestamp_utc: DateTime<Utc>,
        consumption_kwh: f64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp_utc,
            consumption_kwh,
            voltage: None,
            current: None,
            power_factor: None,
            temperature: None,
        }
    }

    /// Attach a voltage measurement
    pub fn with_voltage(mut self, voltage: f64) -> Self {
        self.voltage = Some(voltage);
        self
    }

    /// Attach a current measurement
    pub fn with_current(mut self, current: f64) -> Self {
        self.current = Some(current);
        self
    }

    /// Attach a power factor measurement
    pub fn with_power_factor(mut self, power_factor: f64) -> Self {
        self.power_factor = Some(power_factor);
        self
    }

    /// Attach a temperature measurement
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Check the units contract: consumption is finite and non-negative
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.consumption_kwh.is_finite() || self.consumption_kwh < 0.0 {
            return Err(AnalysisError::InvalidReading {
                device_id: self.device_id.to_string(),
                timestamp: self.timestamp_utc,
                value: self.consumption_kwh,
            });
        }
        Ok(())
    }

    /// Check if the reading falls in the half-open range `[start, end)`
    pub fn is_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.timestamp_utc >= start && self.timestamp_utc < end
    }
}

/// Sort readings by device, then by timestamp.
///
/// Stable, so readings sharing a timestamp keep their arrival order.
pub fn sort_by_device_and_time(readings: &mut [ConsumptionReading]) {
    readings.sort_by(|a, b| {
        a.device_id
            .cmp(&b.device_id)
            .then(a.timestamp_utc.cmp(&b.timestamp_utc))
    });
}
