// Wattlens Testdata - Synthetic consumption series
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Wattlens Testdata
//!
//! Synthetic meter data for exercising the Wattlens analytics.
//!
//! - **Load profiles**: flat, diurnal, bimodal (households), shifts (plants),
//!   weekday/weekend combinations
//! - **Anomaly injection**: spikes, dropouts, bias shifts, drift, stuck meters
//! - **Ground truth**: every injected anomaly is recorded alongside the
//!   readings so detection can be scored
//!
//! ## Quick Start
//!
//! ```rust
//! use wattlens_testdata::{generate_readings, DeviceProfile, GeneratorConfig, LoadProfile};
//! use wattlens_testdata::{AnomalyKind, InjectedAnomaly};
//!
//! // Two weeks of hourly readings for an office meter
//! let config = GeneratorConfig::new()
//!     .with_duration_days(14.0)
//!     .with_seed(42);
//!
//! let office = DeviceProfile::new("office-1", LoadProfile::office(2.0, 20.0))
//!     .with_noise(0.2)
//!     .with_anomaly(InjectedAnomaly::new(AnomalyKind::spike(8.0), 200).with_duration(1));
//!
//! let series = generate_readings(&config, &[office]).unwrap();
//! assert_eq!(series.len(), 14 * 24);
//! assert_eq!(series.injected.len(), 1);
//! ```

pub mod anomalies;
pub mod generator;
pub mod patterns;

// Re-exports for convenience
pub use anomalies::{AnomalyKind, AnomalyState, InjectedAnomaly};
pub use generator::{
    generate_readings, DeviceProfile, GeneratedSeries, GeneratorConfig, GeneratorError,
    InjectionMarker,
};
pub use patterns::LoadProfile;
