// Wattlens Insight - Historical baselines and projection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for baseline analytics.
//!
//! Too little history is never an error here; it is reported through
//! [`BaselineOutcome::InsufficientHistory`](crate::BaselineOutcome) and
//! [`Confidence::Low`](crate::Confidence).

use thiserror::Error;
use wattlens::WattlensError;

/// Result type alias for insight operations.
pub type Result<T> = std::result::Result<T, InsightError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightError {
    /// Lookback window smaller than the minimum baseline.
    #[error("Invalid lookback: {lookback} readings, at least {minimum} required")]
    InvalidLookback { lookback: usize, minimum: usize },

    /// Sensitivity factor negative, non-finite, or ordered wrongly.
    #[error("Invalid {field}: {value}")]
    InvalidSensitivity { field: &'static str, value: f64 },

    /// Projection horizon before now.
    #[error("Negative projection horizon: {seconds}s")]
    NegativeHorizon { seconds: i64 },

    /// Configuration document could not be parsed.
    #[error("Malformed configuration: {0}")]
    Config(String),

    /// Error from the core crate.
    #[error(transparent)]
    Core(#[from] WattlensError),
}

impl From<wattlens::AnalysisError> for InsightError {
    fn from(err: wattlens::AnalysisError) -> Self {
        InsightError::Core(err.into())
    }
}

impl From<wattlens::TariffError> for InsightError {
    fn from(err: wattlens::TariffError) -> Self {
        InsightError::Core(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InsightError::InvalidLookback {
            lookback: 1,
            minimum: 2,
        };
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_core_conversion() {
        let err: InsightError = wattlens::TariffError::InvalidConsumption(-1.0).into();
        assert!(matches!(err, InsightError::Core(WattlensError::Tariff(_))));
    }
}
