// Wattlens Testdata - Load profiles
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Daily load profiles.
//!
//! A profile gives the average power draw (kW) of a device at a UTC instant.
//! The generator turns it into energy per sample.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Shape of a device's demand over the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadProfile {
    /// Constant draw.
    Flat { kw: f64 },

    /// Single bell around `peak_hour`.
    ///
    /// `kw = base + (peak - base) * exp(-d² / (2 * spread²))`, with `d` the
    /// circular hour distance to `peak_hour`.
    Diurnal {
        base_kw: f64,
        peak_kw: f64,
        peak_hour: f64,
        spread: f64,
    },

    /// Morning and evening bells (households).
    Bimodal {
        base_kw: f64,
        peak_kw: f64,
        morning_hour: f64,
        evening_hour: f64,
        spread: f64,
    },

    /// Production shift: `on_kw` inside `[start_hour, end_hour)`, else `off_kw`.
    /// The shift may wrap past midnight.
    Shift {
        off_kw: f64,
        on_kw: f64,
        start_hour: u32,
        end_hour: u32,
    },

    /// Separate shapes for weekdays and weekends.
    Weekly {
        weekday: Box<LoadProfile>,
        weekend: Box<LoadProfile>,
    },
}

impl LoadProfile {
    /// Average power draw at `instant`, in kW.
    pub fn kw_at(&self, instant: DateTime<Utc>) -> f64 {
        let hour = instant.hour() as f64 + instant.minute() as f64 / 60.0;
        match self {
            LoadProfile::Flat { kw } => *kw,

            LoadProfile::Diurnal {
                base_kw,
                peak_kw,
                peak_hour,
                spread,
            } => base_kw + (peak_kw - base_kw) * bell(hour, *peak_hour, *spread),

            LoadProfile::Bimodal {
                base_kw,
                peak_kw,
                morning_hour,
                evening_hour,
                spread,
            } => {
                let factor =
                    bell(hour, *morning_hour, *spread).max(bell(hour, *evening_hour, *spread));
                base_kw + (peak_kw - base_kw) * factor
            }

            LoadProfile::Shift {
                off_kw,
                on_kw,
                start_hour,
                end_hour,
            } => {
                let h = instant.hour();
                let on = if start_hour <= end_hour {
                    h >= *start_hour && h < *end_hour
                } else {
                    h >= *start_hour || h < *end_hour
                };
                if on {
                    *on_kw
                } else {
                    *off_kw
                }
            }

            LoadProfile::Weekly { weekday, weekend } => match instant.weekday() {
                Weekday::Sat | Weekday::Sun => weekend.kw_at(instant),
                _ => weekday.kw_at(instant),
            },
        }
    }

    /// Office building: daytime bell on weekdays, standby on weekends.
    pub fn office(standby_kw: f64, peak_kw: f64) -> Self {
        LoadProfile::Weekly {
            weekday: Box::new(LoadProfile::Diurnal {
                base_kw: standby_kw,
                peak_kw,
                peak_hour: 13.0,
                spread: 3.0,
            }),
            weekend: Box::new(LoadProfile::Flat { kw: standby_kw }),
        }
    }

    /// Household: morning and evening peaks.
    pub fn residential(base_kw: f64, peak_kw: f64) -> Self {
        LoadProfile::Bimodal {
            base_kw,
            peak_kw,
            morning_hour: 7.5,
            evening_hour: 19.5,
            spread: 1.5,
        }
    }

    /// Two-shift plant running 06:00-22:00.
    pub fn factory(idle_kw: f64, running_kw: f64) -> Self {
        LoadProfile::Shift {
            off_kw: idle_kw,
            on_kw: running_kw,
            start_hour: 6,
            end_hour: 22,
        }
    }
}

fn bell(hour: f64, center: f64, spread: f64) -> f64 {
    let diff = (hour - center).abs();
    let diff = if diff > 12.0 { 24.0 - diff } else { diff };
    if spread <= 0.0 {
        return if diff == 0.0 { 1.0 } else { 0.0 };
    }
    (-diff * diff / (2.0 * spread * spread)).exp()
}
