// Wattlens Insight - Historical baselines and projection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Wattlens Insight
//!
//! Analytics that judge a device against its own history:
//! - **Anomaly detection**: per-device rolling baseline, z-style band with
//!   warning and critical levels
//! - **Projection**: average daily consumption extrapolated over a horizon,
//!   flagged low-confidence when history is thin
//!
//! Neither ever fails for lack of data. A reading with too little history is
//! reported as [`BaselineOutcome::InsufficientHistory`]; a projection from too
//! few days carries [`Confidence::Low`].
//!
//! ## Anomaly detection
//!
//! ```rust
//! use wattlens::ConsumptionReading;
//! use wattlens_insight::detect_anomalies;
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let readings: Vec<_> = [10.0, 10.0, 10.0, 10.0, 40.0]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, kwh)| ConsumptionReading::new("meter-1", start + Duration::days(i as i64), *kwh))
//!     .collect();
//!
//! let report = detect_anomalies(&readings, 30, 2.0).unwrap();
//! assert_eq!(report.anomalies.len(), 1);
//! assert_eq!(report.skipped_insufficient_history, 2);
//! ```
//!
//! ## Projection
//!
//! ```rust
//! use wattlens::ConsumptionReading;
//! use wattlens_insight::{project, Confidence};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let day = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
//! let readings = vec![
//!     ConsumptionReading::new("meter-1", day, 20.0),
//!     ConsumptionReading::new("meter-1", day + Duration::days(1), 30.0),
//! ];
//!
//! let projection = project(&readings, Duration::days(30)).unwrap();
//! assert_eq!(projection.confidence, Confidence::High);
//! assert!((projection.projected_kwh - 750.0).abs() < 1e-9);
//! ```

pub mod anomaly;
pub mod baseline;
pub mod config;
pub mod error;
pub mod projection;

// Re-exports
pub use anomaly::{
    detect_anomalies, detect_anomalies_with, Anomaly, AnomalyDetector, AnomalyReport,
    BaselineOutcome, Severity,
};
pub use baseline::{BaselineStats, RollingBaseline};
pub use config::{AnomalyConfig, InsightConfig, ProjectionConfig};
pub use error::{InsightError, Result};
pub use projection::{project, project_cost, Confidence, ConsumptionProjector, Projection};
