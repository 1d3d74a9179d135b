//! Error types for Wattlens
//!
//! Every precondition violation the core detects is returned as one of these
//! errors. Insufficient data and non-computable metrics are not errors; they
//! are variants of the result types themselves.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for Wattlens operations
pub type Result<T> = std::result::Result<T, WattlensError>;

/// Main error type for Wattlens operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WattlensError {
    /// Tariff or cost calculation error
    #[error("Tariff error: {0}")]
    Tariff(#[from] TariffError),

    /// Consumption analysis error
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Alert configuration or evaluation error
    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    /// Simulation error
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the tariff schedule and cost engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TariffError {
    /// Peak tariff and peak window must be configured together
    #[error("Incomplete peak configuration: {missing} is missing")]
    IncompletePeakConfig { missing: &'static str },

    /// A per-kWh rate is negative or not a number
    #[error("Invalid rate for {field}: {value}")]
    InvalidRate { field: &'static str, value: f64 },

    /// Consumption quantity is negative or not a number
    #[error("Invalid consumption: {0} kWh")]
    InvalidConsumption(f64),

    /// Period end is before period start
    #[error("Invalid period: end {end} is before start {start}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Errors raised by the statistics aggregator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Period end is before period start
    #[error("Invalid period: end {end} is before start {start}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Bucket width must be strictly positive
    #[error("Invalid bucket granularity: {seconds}s")]
    InvalidGranularity { seconds: i64 },

    /// A reading carries a negative or non-finite consumption
    #[error("Invalid reading for device {device_id} at {timestamp}: {value} kWh")]
    InvalidReading {
        device_id: String,
        timestamp: DateTime<Utc>,
        value: f64,
    },
}

/// Errors raised by alert configuration and evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    /// An alert must be scoped to exactly one of plant, area or device
    #[error("Invalid alert scope: {count} entity levels given, exactly one required")]
    InvalidScope { count: usize },

    /// Value or threshold is not a finite number
    #[error("Non-finite {field}: {value}")]
    NonFiniteValue { field: &'static str, value: f64 },

    /// Equality tolerance must be finite and non-negative
    #[error("Invalid epsilon: {0}")]
    InvalidEpsilon(f64),
}

/// Errors raised by simulation records and accuracy evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Estimated or realized consumption is negative or not a number
    #[error("Invalid {field}: {value} kWh")]
    InvalidConsumption { field: &'static str, value: f64 },

    /// Simulation end date is before its start date
    #[error("Invalid simulation period: end {end} is before start {start}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    /// Configuration document is malformed
    #[error("Malformed configuration: {0}")]
    Parse(String),

    /// A configuration value is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WattlensError::Tariff(TariffError::IncompletePeakConfig {
            missing: "peak_end",
        });
        let msg = format!("{}", err);
        assert!(msg.contains("peak_end"));
        assert!(msg.contains("Incomplete"));
    }

    #[test]
    fn test_error_conversion() {
        let alert_err = AlertError::InvalidScope { count: 2 };
        let err: WattlensError = alert_err.into();
        assert!(matches!(err, WattlensError::Alert(_)));
    }
}
