//! # Wattlens - Energy consumption analytics core
//!
//! Pure, synchronous computations over consumption readings that a caller
//! has already fetched: tariff costing, aggregation, alert decisions and
//! simulation accuracy. Nothing here performs I/O or keeps state between
//! calls.
//!
//! ## Key Features
//!
//! - **Peak-aware costing**: base, peak and flag surcharge with peak windows
//!   that may wrap past midnight
//! - **Bucketed aggregation**: totals and an all-buckets breakdown that always
//!   sums to the total
//! - **Alert decisions**: exhaustive comparison dispatch with deterministic
//!   messages
//! - **Simulation accuracy**: signed variance that is never faked when the
//!   estimate is zero
//!
//! ## Quick Start
//!
//! ```rust
//! use wattlens::{aggregate, ConsumptionReading, Granularity};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let readings: Vec<_> = (0..48)
//!     .map(|h| ConsumptionReading::new("meter-1", start + Duration::hours(h), 1.5))
//!     .collect();
//!
//! let result = aggregate(&readings, start, start + Duration::days(2), Granularity::Day).unwrap();
//! assert_eq!(result.breakdown.len(), 2);
//! assert!((result.stats.total - 72.0).abs() < 1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`peak`]: Peak window classification
//! - [`tariff`]: Tariff schedules and the cost engine
//! - [`stats`]: Running statistics and bucketed aggregation
//! - [`alert`]: Alert rule evaluation
//! - [`simulation`]: Estimate vs. realized consumption
//! - [`site`]: Plant / area / device hierarchy
//! - [`config`]: Serializable tunables

// Modules
pub mod alert;
pub mod config;
pub mod error;
pub mod peak;
pub mod reading;
pub mod simulation;
pub mod site;
pub mod stats;
pub mod tariff;

// Re-exports for convenient access
pub use alert::{
    AlertConfiguration, AlertEvaluationEngine, AlertEvaluationResult, AlertTimeWindow, AlertType,
    ComparisonType,
};
pub use config::AnalyticsConfig;
pub use error::{
    AlertError, AnalysisError, ConfigError, Result, SimulationError, TariffError, WattlensError,
};
pub use peak::{is_peak_time, PeakWindow};
pub use reading::ConsumptionReading;
pub use simulation::{AccuracySummary, SimulationRecord, Variance};
pub use site::{AreaId, DeviceId, PlantId, ScopeLevel, SiteDirectory, SiteScope};
pub use stats::{
    aggregate, compare_periods, totals_by_device, BreakdownEntry, ConsumptionAnalysisResult,
    ConsumptionStats, Granularity, PeriodComparison, RunningStats,
};
pub use tariff::{
    calculate_cost, calculate_cost_for_readings, ConsumptionCostCalculation, FlagValues,
    TariffFlag, TariffInfo, TariffSchedule,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
