// Wattlens Insight - Historical baselines and projection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Rolling per-device consumption baselines.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use wattlens::RunningStats;

/// Mean and spread of a baseline window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineStats {
    pub mean: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    pub count: usize,
}

/// The last `capacity` consumption values of one device.
#[derive(Debug, Clone)]
pub struct RollingBaseline {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingBaseline {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a value, evicting the oldest once full.
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Statistics over the window, `None` below `min_count` values.
    pub fn stats(&self, min_count: usize) -> Option<BaselineStats> {
        if self.values.len() < min_count.max(1) {
            return None;
        }
        let running = RunningStats::from_values(self.values.iter().copied());
        Some(BaselineStats {
            mean: running.mean(),
            std_dev: running.sample_std_dev(),
            count: self.values.len(),
        })
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_baseline_new() {
        let baseline = RollingBaseline::new(5);
        assert!(baseline.is_empty());
        assert_eq!(baseline.capacity(), 5);
        assert!(baseline.stats(2).is_none());
    }

    #[test]
    fn test_baseline_stats() {
        let mut baseline = RollingBaseline::new(10);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            baseline.push(v);
        }
        let stats = baseline.stats(2).unwrap();
        assert_eq!(stats.count, 8);
        assert_relative_eq!(stats.mean, 5.0, epsilon = 1e-12);
        // sample variance = 32 / 7
        assert_relative_eq!(stats.std_dev, (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_baseline_eviction() {
        let mut baseline = RollingBaseline::new(3);
        for v in [100.0, 1.0, 2.0, 3.0] {
            baseline.push(v);
        }
        assert_eq!(baseline.len(), 3);
        assert_relative_eq!(baseline.stats(2).unwrap().mean, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_history_has_zero_spread() {
        let mut baseline = RollingBaseline::new(4);
        for _ in 0..4 {
            baseline.push(10.0);
        }
        let stats = baseline.stats(2).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean, 10.0);
    }

    #[test]
    fn test_minimum_count() {
        let mut baseline = RollingBaseline::new(4);
        baseline.push(1.0);
        assert!(baseline.stats(2).is_none());
        baseline.push(3.0);
        assert!(baseline.stats(2).is_some());
        baseline.clear();
        assert!(baseline.is_empty());
    }
}
