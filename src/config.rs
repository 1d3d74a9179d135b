//! Analytics configuration
//!
//! Tunables shared by the surrounding service. Every field has a default, so
//! a partial JSON document only needs to name what it changes.

use crate::alert::{AlertEvaluationEngine, DEFAULT_EQ_EPSILON};
use crate::error::ConfigError;
use crate::stats::Granularity;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Master configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub alerts: AlertConfig,
    pub stats: StatsConfig,
    pub simulation: SimulationConfig,
}

/// Alert evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Tolerance for `EQ` comparisons
    pub eq_epsilon: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            eq_epsilon: DEFAULT_EQ_EPSILON,
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Breakdown granularity when the caller names none
    pub default_granularity: Granularity,
}

/// Simulation accuracy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Largest |variance| (percent) still counted as accurate
    pub accuracy_tolerance_percent: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accuracy_tolerance_percent: 10.0,
        }
    }
}

impl AnalyticsConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_json(&json)?;
        log::debug!("loaded analytics configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let epsilon = self.alerts.eq_epsilon;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(ConfigError::Invalid {
                field: "alerts.eq_epsilon",
                reason: format!("must be finite and non-negative, got {}", epsilon),
            });
        }

        self.stats
            .default_granularity
            .validate()
            .map_err(|e| ConfigError::Invalid {
                field: "stats.default_granularity",
                reason: e.to_string(),
            })?;

        let tolerance = self.simulation.accuracy_tolerance_percent;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "simulation.accuracy_tolerance_percent",
                reason: format!("must be finite and non-negative, got {}", tolerance),
            });
        }

        Ok(())
    }

    /// Alert engine using the configured epsilon
    pub fn alert_engine(&self) -> Result<AlertEvaluationEngine, ConfigError> {
        AlertEvaluationEngine::new(self.alerts.eq_epsilon).map_err(|e| ConfigError::Invalid {
            field: "alerts.eq_epsilon",
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.alerts.eq_epsilon, 1e-6);
        assert_eq!(config.stats.default_granularity, Granularity::Day);
        assert_eq!(config.simulation.accuracy_tolerance_percent, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AnalyticsConfig::default();
        let json = config.to_json().unwrap();
        let parsed = AnalyticsConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_json() {
        let config =
            AnalyticsConfig::from_json(r#"{"stats": {"default_granularity": "hour"}}"#).unwrap();
        assert_eq!(config.stats.default_granularity, Granularity::Hour);
        assert_eq!(config.alerts.eq_epsilon, 1e-6);
    }

    #[test]
    fn test_validation_errors() {
        let err = AnalyticsConfig::from_json(r#"{"alerts": {"eq_epsilon": -0.5}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "alerts.eq_epsilon",
                ..
            }
        ));

        let err = AnalyticsConfig::from_json(
            r#"{"stats": {"default_granularity": {"custom": {"seconds": 0}}}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "stats.default_granularity",
                ..
            }
        ));

        let err = AnalyticsConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"simulation": {{"accuracy_tolerance_percent": 5.0}}}}"#).unwrap();

        let config = AnalyticsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.simulation.accuracy_tolerance_percent, 5.0);
        assert_eq!(config.alert_engine().unwrap().epsilon(), 1e-6);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AnalyticsConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
