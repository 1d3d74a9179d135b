//! Monthly report - a plant's month of readings priced, summarized and checked
//! against alerts, then compared with the simulation made before the month.
//!
//! Run with: cargo run --example monthly_report

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Europe::Paris;
use wattlens::{
    aggregate, calculate_cost_for_readings, compare_periods, AlertConfiguration,
    AlertEvaluationEngine, AlertType, AreaId, ComparisonType, ConsumptionReading, FlagValues,
    Granularity, PeakWindow, PlantId, ScopeLevel, SimulationRecord, SiteDirectory, SiteScope,
    TariffFlag, TariffSchedule,
};

fn main() -> wattlens::Result<()> {
    let directory = SiteDirectory::new()
        .with_device("press-1", "assembly", "lyon")
        .with_device("press-2", "assembly", "lyon")
        .with_device("oven-1", "paint", "lyon")
        .with_device("hvac-1", "offices", "lyon");

    // Two months of hourly readings: day shifts on the presses, a steady oven
    let december = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
    let january = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let february = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

    let mut readings = Vec::new();
    let hours = (february - december).num_hours();
    for h in 0..hours {
        let ts = december + Duration::hours(h);
        let growth = if ts >= january { 1.08 } else { 1.0 };
        let (press_1, press_2, hvac) = if (6..22).contains(&ts.hour()) {
            (12.0, 9.0, 4.0)
        } else {
            (1.0, 0.8, 1.5)
        };
        readings.push(ConsumptionReading::new("press-1", ts, press_1 * growth));
        readings.push(ConsumptionReading::new("press-2", ts, press_2 * growth));
        readings.push(ConsumptionReading::new("oven-1", ts, 18.0));
        readings.push(ConsumptionReading::new("hvac-1", ts, hvac));
    }

    let flags = FlagValues::new(0.0, 0.019, 0.045, 0.078);
    let evening = PeakWindow::from_hm((18, 0), (21, 0)).unwrap();
    let schedule = TariffSchedule::new(0.18, flags, TariffFlag::Yellow)?
        .with_peak(0.31, evening)?
        .with_timezone(Paris);

    // A forecast made before the month started
    let simulation = SimulationRecord::estimate(26_000.0, january, february, &schedule)?;

    println!("=== Wattlens Monthly Report: January 2024 ===");
    println!();

    let previous = aggregate(&readings, december, january, Granularity::Week)?;
    let current = aggregate(&readings, january, february, Granularity::Week)?;
    let change = compare_periods(&current.stats, &previous.stats);

    println!("Consumption");
    println!("  total:        {:>12.1} kWh", current.stats.total);
    println!("  average:      {:>12.2} kWh/reading", current.stats.average);
    println!("  peak reading: {:>12.2} kWh", current.stats.peak);
    match change.change_percent {
        Some(pct) => println!(
            "  vs December:  {:>+12.1} kWh ({:+.1}%)",
            change.change_kwh, pct
        ),
        None => println!("  vs December:  {:>+12.1} kWh", change.change_kwh),
    }
    println!();

    println!("Weekly breakdown");
    for bucket in &current.breakdown {
        let week = bucket.timestamp.format("%Y-%m-%d");
        println!("  {}  {:>10.1} kWh", week, bucket.consumption);
    }
    println!();

    let month = readings_in(&readings, january, february);
    println!("By area");
    for (area, stats) in directory.rollup(&month, ScopeLevel::Area) {
        println!("  {:<10} {:>10.1} kWh", area, stats.total);
    }
    println!();

    let bill = calculate_cost_for_readings(&readings, january, february, &schedule)?;
    println!("Cost (flag {})", bill.tariff_info.current_flag);
    println!(
        "  off-peak: {:>10.1} kWh  {:>10.2}",
        bill.regular_consumption, bill.regular_cost
    );
    println!(
        "  peak:     {:>10.1} kWh  {:>10.2}",
        bill.peak_consumption, bill.peak_cost
    );
    println!("  flag:                    {:>10.2}", bill.flag_cost);
    println!("  total:                   {:>10.2}", bill.total_cost);
    println!();

    let engine = AlertEvaluationEngine::default();
    let alerts = [
        AlertConfiguration::new(
            AlertType::Cost,
            ComparisonType::Gt,
            5_000.0,
            SiteScope::Plant(PlantId::new("lyon")),
        ),
        AlertConfiguration::new(
            AlertType::Demand,
            ComparisonType::Gte,
            12.5,
            SiteScope::Area(AreaId::new("assembly")),
        ),
    ];

    println!("Alerts");
    let cost_result = engine.evaluate(&alerts[0], bill.total_cost)?;
    println!(
        "  [{}] {}",
        marker(cost_result.should_trigger),
        cost_result.message
    );

    let assembly = directory.readings_in_scope(&month, &alerts[1].scope);
    if let Some(result) = engine.evaluate_readings(&alerts[1], assembly)? {
        println!("  [{}] {}", marker(result.should_trigger), result.message);
    }
    println!();

    let evaluated = simulation.with_realized_readings(&readings)?;
    println!("Forecast accuracy");
    println!("  estimated: {:>12.1} kWh", evaluated.estimated_consumption);
    if let Some(real) = evaluated.real_consumption {
        println!("  realized:  {:>12.1} kWh", real);
    }
    match evaluated.variance.and_then(|v| v.percent()) {
        Some(pct) => println!("  variance:  {:>+12.1}%", pct),
        None => println!("  variance:  not computable"),
    }

    Ok(())
}

fn readings_in(
    readings: &[ConsumptionReading],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<ConsumptionReading> {
    readings
        .iter()
        .filter(|r| r.is_within(start, end))
        .cloned()
        .collect()
}

fn marker(triggered: bool) -> &'static str {
    if triggered {
        "FIRE"
    } else {
        " ok "
    }
}
