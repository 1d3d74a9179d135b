//! Tariff schedules and consumption costing
//!
//! A schedule has a base rate, an optional peak rate bound to a daily
//! [`PeakWindow`], and a per-kWh flag surcharge selected by the currently
//! active [`TariffFlag`].
//!
//! ```rust
//! use wattlens::peak::PeakWindow;
//! use wattlens::tariff::{calculate_cost, FlagValues, TariffFlag, TariffSchedule};
//! use chrono::{TimeZone, Utc};
//!
//! let schedule = TariffSchedule::new(0.50, FlagValues::new(0.0, 0.02, 0.04, 0.06), TariffFlag::Yellow)
//!     .unwrap()
//!     .with_peak(1.20, PeakWindow::from_hm((18, 0), (21, 0)).unwrap())
//!     .unwrap();
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
//! let bill = calculate_cost(240.0, start, end, &schedule).unwrap();
//!
//! assert!((bill.peak_consumption - 30.0).abs() < 1e-9);
//! assert!((bill.total_cost - (bill.regular_cost + bill.peak_cost + bill.flag_cost)).abs() < 1e-9);
//! ```

use crate::error::TariffError;
use crate::peak::PeakWindow;
use crate::reading::ConsumptionReading;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Surcharge level applied system-wide according to generation conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TariffFlag {
    #[default]
    Green,
    Yellow,
    Red1,
    Red2,
}

impl TariffFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TariffFlag::Green => "green",
            TariffFlag::Yellow => "yellow",
            TariffFlag::Red1 => "red1",
            TariffFlag::Red2 => "red2",
        }
    }
}

impl fmt::Display for TariffFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kWh surcharge for each flag level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagValues {
    pub green: f64,
    pub yellow: f64,
    pub red1: f64,
    pub red2: f64,
}

impl FlagValues {
    pub fn new(green: f64, yellow: f64, red1: f64, red2: f64) -> Self {
        Self {
            green,
            yellow,
            red1,
            red2,
        }
    }

    pub fn value(&self, flag: TariffFlag) -> f64 {
        match flag {
            TariffFlag::Green => self.green,
            TariffFlag::Yellow => self.yellow,
            TariffFlag::Red1 => self.red1,
            TariffFlag::Red2 => self.red2,
        }
    }

    fn validate(&self) -> Result<(), TariffError> {
        check_rate("flag_values.green", self.green)?;
        check_rate("flag_values.yellow", self.yellow)?;
        check_rate("flag_values.red1", self.red1)?;
        check_rate("flag_values.red2", self.red2)
    }
}

/// Peak rate and the window it applies to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPricing {
    pub tariff_per_kwh: f64,
    pub window: PeakWindow,
}

/// Validated tariff schedule.
///
/// The peak rate and its window only exist together, so a schedule with a
/// peak rate but no window cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TariffScheduleRecord", into = "TariffScheduleRecord")]
pub struct TariffSchedule {
    base_tariff_per_kwh: f64,
    peak: Option<PeakPricing>,
    flag_values: FlagValues,
    current_flag: TariffFlag,
    timezone: Tz,
}

impl TariffSchedule {
    /// Schedule without peak pricing, peak window evaluated in UTC
    pub fn new(
        base_tariff_per_kwh: f64,
        flag_values: FlagValues,
        current_flag: TariffFlag,
    ) -> Result<Self, TariffError> {
        check_rate("base_tariff_per_kwh", base_tariff_per_kwh)?;
        flag_values.validate()?;
        Ok(Self {
            base_tariff_per_kwh,
            peak: None,
            flag_values,
            current_flag,
            timezone: Tz::UTC,
        })
    }

    /// Add peak pricing
    pub fn with_peak(mut self, tariff_per_kwh: f64, window: PeakWindow) -> Result<Self, TariffError> {
        check_rate("peak_tariff_per_kwh", tariff_per_kwh)?;
        self.peak = Some(PeakPricing {
            tariff_per_kwh,
            window,
        });
        Ok(self)
    }

    /// Set the local-time convention used to classify peak hours
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Switch the active flag
    pub fn with_flag(mut self, flag: TariffFlag) -> Self {
        self.current_flag = flag;
        self
    }

    pub fn base_tariff_per_kwh(&self) -> f64 {
        self.base_tariff_per_kwh
    }

    pub fn peak(&self) -> Option<&PeakPricing> {
        self.peak.as_ref()
    }

    pub fn peak_tariff_per_kwh(&self) -> Option<f64> {
        self.peak.map(|p| p.tariff_per_kwh)
    }

    pub fn peak_window(&self) -> Option<PeakWindow> {
        self.peak.map(|p| p.window)
    }

    pub fn flag_values(&self) -> &FlagValues {
        &self.flag_values
    }

    pub fn current_flag(&self) -> TariffFlag {
        self.current_flag
    }

    /// Surcharge of the active flag
    pub fn current_flag_value(&self) -> f64 {
        self.flag_values.value(self.current_flag)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Audit summary of the rates in force
    pub fn tariff_info(&self) -> TariffInfo {
        TariffInfo {
            base_tariff: self.base_tariff_per_kwh,
            peak_tariff: self.peak_tariff_per_kwh(),
            current_flag: self.current_flag,
            flag_value: self.current_flag_value(),
        }
    }
}

/// Flat schedule record as exchanged with storage and the external API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffScheduleRecord {
    pub base_tariff_per_kwh: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_tariff_per_kwh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_start: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_end: Option<NaiveTime>,
    pub flag_values: FlagValues,
    #[serde(default)]
    pub current_flag: TariffFlag,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

fn default_timezone() -> Tz {
    Tz::UTC
}

impl TryFrom<TariffScheduleRecord> for TariffSchedule {
    type Error = TariffError;

    fn try_from(record: TariffScheduleRecord) -> Result<Self, Self::Error> {
        let schedule = TariffSchedule::new(
            record.base_tariff_per_kwh,
            record.flag_values,
            record.current_flag,
        )?
        .with_timezone(record.timezone);

        match (record.peak_tariff_per_kwh, record.peak_start, record.peak_end) {
            (None, None, None) => Ok(schedule),
            (Some(tariff), Some(start), Some(end)) => {
                schedule.with_peak(tariff, PeakWindow::new(start, end))
            }
            (None, _, _) => Err(TariffError::IncompletePeakConfig {
                missing: "peak_tariff_per_kwh",
            }),
            (_, None, _) => Err(TariffError::IncompletePeakConfig {
                missing: "peak_start",
            }),
            (_, _, None) => Err(TariffError::IncompletePeakConfig {
                missing: "peak_end",
            }),
        }
    }
}

impl From<TariffSchedule> for TariffScheduleRecord {
    fn from(schedule: TariffSchedule) -> Self {
        Self {
            base_tariff_per_kwh: schedule.base_tariff_per_kwh,
            peak_tariff_per_kwh: schedule.peak_tariff_per_kwh(),
            peak_start: schedule.peak.map(|p| p.window.start),
            peak_end: schedule.peak.map(|p| p.window.end),
            flag_values: schedule.flag_values,
            current_flag: schedule.current_flag,
            timezone: schedule.timezone,
        }
    }
}

/// Rates used for a bill, reported alongside it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffInfo {
    pub base_tariff: f64,
    pub peak_tariff: Option<f64>,
    pub current_flag: TariffFlag,
    pub flag_value: f64,
}

/// Priced consumption for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionCostCalculation {
    pub consumption_kwh: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub regular_consumption: f64,
    pub peak_consumption: f64,
    pub regular_cost: f64,
    pub peak_cost: f64,
    pub flag_cost: f64,
    /// Always `regular_cost + peak_cost + flag_cost`
    pub total_cost: f64,
    pub tariff_info: TariffInfo,
}

/// Price an aggregate consumption over a period.
///
/// Without a peak rate everything is billed at the base rate. With one, the
/// consumption is split between peak and off-peak in proportion to the
/// wall-clock share of `[period_start, period_end)` inside the peak window.
pub fn calculate_cost(
    consumption_kwh: f64,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    schedule: &TariffSchedule,
) -> Result<ConsumptionCostCalculation, TariffError> {
    check_consumption(consumption_kwh)?;
    check_period(period_start, period_end)?;

    let peak_consumption = match schedule.peak {
        Some(peak) if consumption_kwh > 0.0 => {
            let fraction = peak
                .window
                .peak_fraction(period_start, period_end, schedule.timezone);
            consumption_kwh * fraction
        }
        _ => 0.0,
    };

    Ok(price(
        consumption_kwh,
        peak_consumption,
        period_start,
        period_end,
        schedule,
    ))
}

/// Price a reading series over a period.
///
/// Each reading in `[period_start, period_end)` is billed as peak or off-peak
/// according to its own local timestamp.
pub fn calculate_cost_for_readings(
    readings: &[ConsumptionReading],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    schedule: &TariffSchedule,
) -> Result<ConsumptionCostCalculation, TariffError> {
    check_period(period_start, period_end)?;

    let mut consumption_kwh = 0.0;
    let mut peak_consumption = 0.0;

    for reading in readings
        .iter()
        .filter(|r| r.is_within(period_start, period_end))
    {
        check_consumption(reading.consumption_kwh)?;
        consumption_kwh += reading.consumption_kwh;

        let in_peak = schedule.peak.map_or(false, |p| {
            p.window
                .contains_instant(reading.timestamp_utc, schedule.timezone)
        });
        if in_peak {
            peak_consumption += reading.consumption_kwh;
        }
    }

    Ok(price(
        consumption_kwh,
        peak_consumption,
        period_start,
        period_end,
        schedule,
    ))
}

fn price(
    consumption_kwh: f64,
    peak_consumption: f64,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    schedule: &TariffSchedule,
) -> ConsumptionCostCalculation {
    let regular_consumption = consumption_kwh - peak_consumption;
    let peak_rate = schedule
        .peak_tariff_per_kwh()
        .unwrap_or(schedule.base_tariff_per_kwh);

    let regular_cost = regular_consumption * schedule.base_tariff_per_kwh;
    let peak_cost = peak_consumption * peak_rate;
    let flag_cost = consumption_kwh * schedule.current_flag_value();
    let total_cost = regular_cost + peak_cost + flag_cost;

    log::trace!(
        "priced {:.3} kWh ({:.3} peak) at flag {}: total {:.4}",
        consumption_kwh,
        peak_consumption,
        schedule.current_flag,
        total_cost
    );

    ConsumptionCostCalculation {
        consumption_kwh,
        period_start,
        period_end,
        regular_consumption,
        peak_consumption,
        regular_cost,
        peak_cost,
        flag_cost,
        total_cost,
        tariff_info: schedule.tariff_info(),
    }
}

fn check_rate(field: &'static str, value: f64) -> Result<(), TariffError> {
    if !value.is_finite() || value < 0.0 {
        return Err(TariffError::InvalidRate { field, value });
    }
    Ok(())
}

fn check_consumption(consumption_kwh: f64) -> Result<(), TariffError> {
    if !consumption_kwh.is_finite() || consumption_kwh < 0.0 {
        return Err(TariffError::InvalidConsumption(consumption_kwh));
    }
    Ok(())
}

fn check_period(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), TariffError> {
    if end < start {
        return Err(TariffError::InvalidPeriod { start, end });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn flags() -> FlagValues {
        FlagValues::new(0.0, 0.01874, 0.03971, 0.09492)
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap()
    }

    fn peak_schedule() -> TariffSchedule {
        TariffSchedule::new(0.60, flags(), TariffFlag::Green)
            .unwrap()
            .with_peak(1.50, PeakWindow::from_hm((18, 0), (21, 0)).unwrap())
            .unwrap()
    }

    #[test]
    fn test_no_peak_all_regular() {
        let schedule = TariffSchedule::new(0.60, flags(), TariffFlag::Yellow).unwrap();
        let bill = calculate_cost(100.0, day(1), day(2), &schedule).unwrap();

        assert_eq!(bill.peak_consumption, 0.0);
        assert_eq!(bill.peak_cost, 0.0);
        assert_relative_eq!(bill.regular_consumption, 100.0);
        assert_relative_eq!(bill.regular_cost, 60.0);
        assert_relative_eq!(bill.flag_cost, 1.874);
        assert_relative_eq!(bill.total_cost, 61.874);
        assert!(bill.tariff_info.peak_tariff.is_none());
    }

    #[test]
    fn test_peak_split_by_wall_clock() {
        let bill = calculate_cost(240.0, day(1), day(3), &peak_schedule()).unwrap();

        // 3h of 24h in peak
        assert_relative_eq!(bill.peak_consumption, 30.0, epsilon = 1e-9);
        assert_relative_eq!(bill.regular_consumption, 210.0, epsilon = 1e-9);
        assert_relative_eq!(bill.peak_cost, 45.0, epsilon = 1e-9);
        assert_relative_eq!(bill.regular_cost, 126.0, epsilon = 1e-9);
        assert_eq!(bill.flag_cost, 0.0);
        assert_eq!(
            bill.total_cost,
            bill.regular_cost + bill.peak_cost + bill.flag_cost
        );
    }

    #[test]
    fn test_zero_consumption() {
        let bill = calculate_cost(0.0, day(1), day(2), &peak_schedule().with_flag(TariffFlag::Red2))
            .unwrap();
        assert_eq!(bill.total_cost, 0.0);
        assert_eq!(bill.peak_consumption, 0.0);
        assert_eq!(bill.flag_cost, 0.0);
    }

    #[test]
    fn test_zero_length_period_uses_instant() {
        let at = day(1) + Duration::hours(19);
        let bill = calculate_cost(10.0, at, at, &peak_schedule()).unwrap();
        assert_relative_eq!(bill.peak_consumption, 10.0);

        let at = day(1) + Duration::hours(9);
        let bill = calculate_cost(10.0, at, at, &peak_schedule()).unwrap();
        assert_eq!(bill.peak_consumption, 0.0);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let schedule = peak_schedule();
        assert_eq!(
            calculate_cost(-1.0, day(1), day(2), &schedule),
            Err(TariffError::InvalidConsumption(-1.0))
        );
        assert!(matches!(
            calculate_cost(1.0, day(2), day(1), &schedule),
            Err(TariffError::InvalidPeriod { .. })
        ));
        assert!(matches!(
            TariffSchedule::new(-0.1, flags(), TariffFlag::Green),
            Err(TariffError::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_flag_surcharge_levels() {
        let values = flags();
        for flag in [
            TariffFlag::Green,
            TariffFlag::Yellow,
            TariffFlag::Red1,
            TariffFlag::Red2,
        ] {
            let schedule = TariffSchedule::new(0.5, values, flag).unwrap();
            let bill = calculate_cost(50.0, day(1), day(2), &schedule).unwrap();
            assert_relative_eq!(bill.flag_cost, 50.0 * values.value(flag));
            assert_eq!(bill.tariff_info.current_flag, flag);
        }
    }

    #[test]
    fn test_readings_classified_individually() {
        let readings = vec![
            ConsumptionReading::new("m", day(1) + Duration::hours(8), 2.0),
            ConsumptionReading::new("m", day(1) + Duration::hours(19), 5.0),
            ConsumptionReading::new("m", day(1) + Duration::hours(20), 3.0),
            ConsumptionReading::new("m", day(2) + Duration::hours(19), 100.0),
        ];
        let bill = calculate_cost_for_readings(&readings, day(1), day(2), &peak_schedule()).unwrap();

        assert_relative_eq!(bill.consumption_kwh, 10.0);
        assert_relative_eq!(bill.peak_consumption, 8.0);
        assert_relative_eq!(bill.regular_consumption, 2.0);
        assert_relative_eq!(bill.peak_cost, 12.0);
    }

    #[test]
    fn test_record_requires_complete_peak() {
        let json = r#"{
            "baseTariffPerKwh": 0.6,
            "peakTariffPerKwh": 1.5,
            "peakStart": "18:00:00",
            "flagValues": {"green": 0.0, "yellow": 0.01, "red1": 0.02, "red2": 0.03},
            "currentFlag": "red1"
        }"#;
        let err = serde_json::from_str::<TariffSchedule>(json).unwrap_err();
        assert!(err.to_string().contains("peak_end"));

        let json = r#"{
            "baseTariffPerKwh": 0.6,
            "peakStart": "18:00:00",
            "peakEnd": "21:00:00",
            "flagValues": {"green": 0.0, "yellow": 0.01, "red1": 0.02, "red2": 0.03}
        }"#;
        let err = serde_json::from_str::<TariffSchedule>(json).unwrap_err();
        assert!(err.to_string().contains("peak_tariff_per_kwh"));
    }

    #[test]
    fn test_record_roundtrip_with_timezone() {
        let json = r#"{
            "baseTariffPerKwh": 0.6,
            "peakTariffPerKwh": 1.5,
            "peakStart": "18:00:00",
            "peakEnd": "21:00:00",
            "flagValues": {"green": 0.0, "yellow": 0.01, "red1": 0.02, "red2": 0.03},
            "currentFlag": "red1",
            "timezone": "America/Sao_Paulo"
        }"#;
        let schedule: TariffSchedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.current_flag(), TariffFlag::Red1);
        assert_eq!(schedule.peak_tariff_per_kwh(), Some(1.5));
        assert_eq!(schedule.timezone().name(), "America/Sao_Paulo");

        let back = serde_json::to_string(&schedule).unwrap();
        let again: TariffSchedule = serde_json::from_str(&back).unwrap();
        assert_eq!(schedule, again);
    }
}
