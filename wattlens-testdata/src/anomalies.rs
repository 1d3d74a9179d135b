// Wattlens Testdata - Anomaly injection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly injection for exercising detection.

use serde::{Deserialize, Serialize};

/// When and what to inject into a device's series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedAnomaly {
    pub kind: AnomalyKind,
    /// Sample index when the anomaly starts.
    pub start_sample: usize,
    /// Duration in samples (None = until end).
    pub duration_samples: Option<usize>,
}

impl InjectedAnomaly {
    pub fn new(kind: AnomalyKind, start_sample: usize) -> Self {
        Self {
            kind,
            start_sample,
            duration_samples: None,
        }
    }

    pub fn with_duration(mut self, samples: usize) -> Self {
        self.duration_samples = Some(samples);
        self
    }

    pub fn is_active(&self, sample_idx: usize) -> bool {
        if sample_idx < self.start_sample {
            return false;
        }
        match self.duration_samples {
            Some(duration) => sample_idx < self.start_sample + duration,
            None => true,
        }
    }

    pub fn samples_since_start(&self, sample_idx: usize) -> usize {
        sample_idx.saturating_sub(self.start_sample)
    }
}

/// Kind of consumption anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// One sample multiplied by `factor` at the start.
    Spike { factor: f64 },

    /// Meter reports nothing; readings are missing.
    Dropout,

    /// Constant kWh offset per sample (e.g. equipment left on).
    BiasShift { offset_kwh: f64 },

    /// Consumption grows by `rate_per_sample` kWh each sample.
    Drift { rate_per_sample: f64 },

    /// Meter repeats the first value of the anomaly.
    Stuck,
}

impl AnomalyKind {
    pub fn spike(factor: f64) -> Self {
        AnomalyKind::Spike { factor }
    }

    pub fn bias_shift(offset_kwh: f64) -> Self {
        AnomalyKind::BiasShift { offset_kwh }
    }

    pub fn drift(rate_per_sample: f64) -> Self {
        AnomalyKind::Drift { rate_per_sample }
    }
}

/// Per-device injection state.
#[derive(Debug, Clone, Default)]
pub struct AnomalyState {
    stuck_value: Option<f64>,
}

impl AnomalyState {
    /// Apply an anomaly to a sample. `None` means the reading is dropped.
    pub fn apply(
        &mut self,
        kind: &AnomalyKind,
        kwh: f64,
        samples_since_start: usize,
    ) -> Option<f64> {
        match kind {
            AnomalyKind::Spike { factor } => {
                if samples_since_start == 0 {
                    Some(kwh * factor)
                } else {
                    Some(kwh)
                }
            }
            AnomalyKind::Dropout => None,
            AnomalyKind::BiasShift { offset_kwh } => Some(kwh + offset_kwh),
            AnomalyKind::Drift { rate_per_sample } => {
                Some(kwh + rate_per_sample * (samples_since_start + 1) as f64)
            }
            AnomalyKind::Stuck => Some(*self.stuck_value.get_or_insert(kwh)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_window() {
        let anomaly = InjectedAnomaly::new(AnomalyKind::Dropout, 10).with_duration(5);
        assert!(!anomaly.is_active(9));
        assert!(anomaly.is_active(10));
        assert!(anomaly.is_active(14));
        assert!(!anomaly.is_active(15));

        let open = InjectedAnomaly::new(AnomalyKind::Stuck, 3);
        assert!(open.is_active(1_000));
        assert_eq!(open.samples_since_start(7), 4);
    }

    #[test]
    fn test_spike_only_first_sample() {
        let mut state = AnomalyState::default();
        let kind = AnomalyKind::spike(4.0);
        assert_eq!(state.apply(&kind, 2.5, 0), Some(10.0));
        assert_eq!(state.apply(&kind, 2.5, 1), Some(2.5));
    }

    #[test]
    fn test_stuck_repeats() {
        let mut state = AnomalyState::default();
        assert_eq!(state.apply(&AnomalyKind::Stuck, 3.0, 0), Some(3.0));
        assert_eq!(state.apply(&AnomalyKind::Stuck, 8.0, 1), Some(3.0));
    }

    #[test]
    fn test_drift_and_bias() {
        let mut state = AnomalyState::default();
        assert_eq!(state.apply(&AnomalyKind::drift(0.5), 1.0, 3), Some(3.0));
        assert_eq!(state.apply(&AnomalyKind::bias_shift(2.0), 1.0, 0), Some(3.0));
        assert_eq!(state.apply(&AnomalyKind::Dropout, 1.0, 0), None);
    }
}
