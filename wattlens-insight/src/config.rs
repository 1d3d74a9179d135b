// Wattlens Insight - Historical baselines and projection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Baseline analytics configuration.

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fewest prior readings that yield a sample standard deviation.
pub const MIN_BASELINE: usize = 2;

/// Master configuration for baseline analytics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Anomaly detection settings.
    pub anomaly: AnomalyConfig,

    /// Projection settings.
    pub projection: ProjectionConfig,
}

impl InsightConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anomaly(mut self, anomaly: AnomalyConfig) -> Self {
        self.anomaly = anomaly;
        self
    }

    pub fn with_projection(mut self, projection: ProjectionConfig) -> Self {
        self.projection = projection;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| InsightError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| InsightError::Config(e.to_string()))
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| InsightError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)?;
        log::debug!("loaded insight configuration from {}", path.display());
        Ok(config)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .map_err(|e| InsightError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.anomaly.validate()?;
        self.projection.validate()
    }
}

/// Anomaly detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Number of preceding readings per device forming the baseline.
    pub lookback: usize,

    /// Deviation beyond this many standard deviations is a warning.
    pub sensitivity_factor: f64,

    /// Deviation beyond this many standard deviations is critical.
    pub critical_factor: f64,

    /// Prior readings required before a reading can be classified.
    pub min_baseline: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            lookback: 30, // a month of daily readings
            sensitivity_factor: 2.0,
            critical_factor: 3.0,
            min_baseline: MIN_BASELINE,
        }
    }
}

impl AnomalyConfig {
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Set the warning factor, raising the critical factor to match if needed.
    pub fn with_sensitivity(mut self, sensitivity_factor: f64) -> Self {
        self.sensitivity_factor = sensitivity_factor;
        if self.critical_factor < sensitivity_factor {
            self.critical_factor = sensitivity_factor;
        }
        self
    }

    pub fn with_critical_factor(mut self, critical_factor: f64) -> Self {
        self.critical_factor = critical_factor;
        self
    }

    pub fn with_min_baseline(mut self, min_baseline: usize) -> Self {
        self.min_baseline = min_baseline;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_baseline < MIN_BASELINE {
            return Err(InsightError::InvalidLookback {
                lookback: self.min_baseline,
                minimum: MIN_BASELINE,
            });
        }
        if self.lookback < self.min_baseline {
            return Err(InsightError::InvalidLookback {
                lookback: self.lookback,
                minimum: self.min_baseline,
            });
        }
        if !self.sensitivity_factor.is_finite() || self.sensitivity_factor < 0.0 {
            return Err(InsightError::InvalidSensitivity {
                field: "sensitivity_factor",
                value: self.sensitivity_factor,
            });
        }
        if !self.critical_factor.is_finite() || self.critical_factor < self.sensitivity_factor {
            return Err(InsightError::InvalidSensitivity {
                field: "critical_factor",
                value: self.critical_factor,
            });
        }
        Ok(())
    }
}

/// Projection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Only use history within this many days of the latest reading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<u32>,

    /// Distinct days of history below which a projection is low-confidence.
    pub min_days_for_confidence: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            lookback_days: None,
            min_days_for_confidence: 2,
        }
    }
}

impl ProjectionConfig {
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookback_days == Some(0) {
            return Err(InsightError::InvalidLookback {
                lookback: 0,
                minimum: 1,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InsightConfig::default();
        assert_eq!(config.anomaly.sensitivity_factor, 2.0);
        assert_eq!(config.anomaly.critical_factor, 3.0);
        assert_eq!(config.anomaly.min_baseline, 2);
        assert_eq!(config.projection.min_days_for_confidence, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = InsightConfig::new()
            .with_projection(ProjectionConfig::default().with_lookback_days(90));
        let json = config.to_json().unwrap();
        let parsed = InsightConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_anomaly_thresholds() {
        let config = AnomalyConfig::default();
        assert!(config.critical_factor > config.sensitivity_factor);

        let raised = AnomalyConfig::default().with_sensitivity(4.0);
        assert_eq!(raised.critical_factor, 4.0);
        assert!(raised.validate().is_ok());
    }

    #[test]
    fn test_rejects_short_lookback() {
        let config = AnomalyConfig::default().with_lookback(1);
        assert_eq!(
            config.validate(),
            Err(InsightError::InvalidLookback {
                lookback: 1,
                minimum: 2
            })
        );

        let config = AnomalyConfig::default().with_min_baseline(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_factors() {
        let config = AnomalyConfig::default().with_sensitivity(-1.0);
        assert!(matches!(
            config.validate(),
            Err(InsightError::InvalidSensitivity {
                field: "sensitivity_factor",
                ..
            })
        ));

        let config = AnomalyConfig::default().with_critical_factor(1.0);
        assert!(matches!(
            config.validate(),
            Err(InsightError::InvalidSensitivity {
                field: "critical_factor",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_json() {
        let config = InsightConfig::from_json(r#"{"anomaly": {"lookback": 7}}"#).unwrap();
        assert_eq!(config.anomaly.lookback, 7);
        assert_eq!(config.anomaly.sensitivity_factor, 2.0);
    }
}
