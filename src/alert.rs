//! Alert rule evaluation
//!
//! [`AlertEvaluationEngine::evaluate`] is a pure decision: it applies the
//! configured comparison to a value and reports whether the alert should
//! fire. Remembering that an alert already fired, and not re-firing until the
//! condition clears, is the caller's bookkeeping.

use crate::error::AlertError;
use crate::reading::ConsumptionReading;
use crate::site::SiteScope;
use crate::stats::RunningStats;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default tolerance for [`ComparisonType::Eq`]
pub const DEFAULT_EQ_EPSILON: f64 = 1e-6;

/// Comparison applied as `current_value <op> threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonType {
    Gt,
    Gte,
    Lt,
    Lte,
    /// Equal within the engine's epsilon
    Eq,
}

impl ComparisonType {
    /// Apply the comparison
    pub fn holds(&self, value: f64, threshold: f64, epsilon: f64) -> bool {
        match self {
            ComparisonType::Gt => value > threshold,
            ComparisonType::Gte => value >= threshold,
            ComparisonType::Lt => value < threshold,
            ComparisonType::Lte => value <= threshold,
            ComparisonType::Eq => (value - threshold).abs() <= epsilon,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonType::Gt => "GT",
            ComparisonType::Gte => "GTE",
            ComparisonType::Lt => "LT",
            ComparisonType::Lte => "LTE",
            ComparisonType::Eq => "EQ",
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            ComparisonType::Gt => "above",
            ComparisonType::Gte => "at or above",
            ComparisonType::Lt => "below",
            ComparisonType::Lte => "at or below",
            ComparisonType::Eq => "equal to",
        }
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantity an alert watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// Summed consumption over the window (kWh)
    Consumption,
    /// Monetary cost over the window, priced by the caller
    Cost,
    /// Largest single reading in the window (kWh)
    Demand,
    /// Mean voltage (V)
    Voltage,
    /// Mean current (A)
    Current,
    /// Mean power factor
    PowerFactor,
    /// Mean device temperature (°C)
    Temperature,
}

impl AlertType {
    pub fn label(&self) -> &'static str {
        match self {
            AlertType::Consumption => "Consumption",
            AlertType::Cost => "Cost",
            AlertType::Demand => "Demand",
            AlertType::Voltage => "Voltage",
            AlertType::Current => "Current",
            AlertType::PowerFactor => "Power factor",
            AlertType::Temperature => "Temperature",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            AlertType::Consumption | AlertType::Demand => "kWh",
            AlertType::Cost => "",
            AlertType::Voltage => "V",
            AlertType::Current => "A",
            AlertType::PowerFactor => "",
            AlertType::Temperature => "°C",
        }
    }

    /// Derive the value this alert type compares from the readings of its
    /// window and scope.
    ///
    /// Returns `None` when the readings carry nothing to compare: no readings
    /// at all, no reading with the optional measurement, or [`AlertType::Cost`],
    /// which needs a tariff and is priced by the caller.
    pub fn current_value<'a, I>(&self, readings: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a ConsumptionReading>,
    {
        let field: fn(&ConsumptionReading) -> Option<f64> = match self {
            AlertType::Cost => return None,
            AlertType::Consumption | AlertType::Demand => |r| Some(r.consumption_kwh),
            AlertType::Voltage => |r| r.voltage,
            AlertType::Current => |r| r.current,
            AlertType::PowerFactor => |r| r.power_factor,
            AlertType::Temperature => |r| r.temperature,
        };

        let stats = RunningStats::from_values(readings.into_iter().filter_map(field));
        if stats.is_empty() {
            return None;
        }

        Some(match self {
            AlertType::Consumption => stats.sum(),
            AlertType::Demand => stats.max(),
            _ => stats.mean(),
        })
    }
}

/// Window over which an alert's value is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertTimeWindow {
    /// Last 5 minutes
    Realtime,
    Hour,
    Day,
    Week,
    /// Rolling 30 days
    Month,
}

impl AlertTimeWindow {
    pub fn duration(&self) -> Duration {
        match self {
            AlertTimeWindow::Realtime => Duration::minutes(5),
            AlertTimeWindow::Hour => Duration::hours(1),
            AlertTimeWindow::Day => Duration::days(1),
            AlertTimeWindow::Week => Duration::weeks(1),
            AlertTimeWindow::Month => Duration::days(30),
        }
    }

    /// Half-open range `[now - duration, now)` the caller should fetch
    pub fn range_ending_at(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.duration(), now)
    }
}

/// User-defined alert rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfiguration {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub threshold: f64,
    pub comparison_type: ComparisonType,
    pub time_window: AlertTimeWindow,
    pub scope: SiteScope,
    pub is_active: bool,
}

impl AlertConfiguration {
    /// Active alert with the given rule
    pub fn new(
        alert_type: AlertType,
        comparison_type: ComparisonType,
        threshold: f64,
        scope: SiteScope,
    ) -> Self {
        Self {
            alert_type,
            threshold,
            comparison_type,
            time_window: AlertTimeWindow::Day,
            scope,
            is_active: true,
        }
    }

    pub fn with_time_window(mut self, time_window: AlertTimeWindow) -> Self {
        self.time_window = time_window;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Decision for one alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvaluationResult {
    /// Comparison holds and the alert is active
    pub should_trigger: bool,
    /// Comparison holds, regardless of activation
    pub condition_met: bool,
    pub current_value: f64,
    pub threshold: f64,
    pub comparison_type: ComparisonType,
    /// Reproducible from the fields above plus the engine's `EQ` epsilon
    pub message: String,
}

/// Applies alert rules to values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvaluationEngine {
    epsilon: f64,
}

impl Default for AlertEvaluationEngine {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EQ_EPSILON,
        }
    }
}

impl AlertEvaluationEngine {
    /// Engine with a custom tolerance for `EQ` comparisons
    pub fn new(epsilon: f64) -> Result<Self, AlertError> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(AlertError::InvalidEpsilon(epsilon));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Decide whether `configuration` fires for `current_value`
    ///
    /// The message is a function of the alert type, value, threshold,
    /// comparison and the engine's `EQ` epsilon: for `EQ` the epsilon decides
    /// whether the text reads "is equal to" or "is not equal to". Other
    /// comparisons ignore it.
    pub fn evaluate(
        &self,
        configuration: &AlertConfiguration,
        current_value: f64,
    ) -> Result<AlertEvaluationResult, AlertError> {
        check_finite("current_value", current_value)?;
        check_finite("threshold", configuration.threshold)?;

        let condition_met =
            configuration
                .comparison_type
                .holds(current_value, configuration.threshold, self.epsilon);

        Ok(AlertEvaluationResult {
            should_trigger: condition_met && configuration.is_active,
            condition_met,
            current_value,
            threshold: configuration.threshold,
            comparison_type: configuration.comparison_type,
            message: alert_message(
                configuration.alert_type,
                current_value,
                configuration.threshold,
                configuration.comparison_type,
                condition_met,
            ),
        })
    }

    /// Evaluate many alerts, each with its own value
    pub fn evaluate_all<'a, I>(&self, alerts: I) -> Result<Vec<AlertEvaluationResult>, AlertError>
    where
        I: IntoIterator<Item = (&'a AlertConfiguration, f64)>,
    {
        alerts
            .into_iter()
            .map(|(configuration, value)| self.evaluate(configuration, value))
            .collect()
    }

    /// Derive the value from readings and evaluate.
    ///
    /// `readings` must already be restricted to the alert's scope and time
    /// window. `Ok(None)` when there is nothing to compare.
    pub fn evaluate_readings<'a, I>(
        &self,
        configuration: &AlertConfiguration,
        readings: I,
    ) -> Result<Option<AlertEvaluationResult>, AlertError>
    where
        I: IntoIterator<Item = &'a ConsumptionReading>,
    {
        match configuration.alert_type.current_value(readings) {
            Some(value) => self.evaluate(configuration, value).map(Some),
            None => {
                log::debug!(
                    "no {} value for alert on {}",
                    configuration.alert_type.label(),
                    configuration.scope.id()
                );
                Ok(None)
            }
        }
    }
}

fn alert_message(
    alert_type: AlertType,
    current_value: f64,
    threshold: f64,
    comparison_type: ComparisonType,
    condition_met: bool,
) -> String {
    let unit = match alert_type.unit() {
        "" => String::new(),
        unit => format!(" {}", unit),
    };
    let negation = if condition_met { "" } else { "not " };
    format!(
        "{} alert: current value {:.2}{} is {}{} threshold {:.2}{}",
        alert_type.label(),
        current_value,
        unit,
        negation,
        comparison_type.phrase(),
        threshold,
        unit,
    )
}

fn check_finite(field: &'static str, value: f64) -> Result<(), AlertError> {
    if !value.is_finite() {
        return Err(AlertError::NonFiniteValue { field, value });
    }
    Ok(())
}
