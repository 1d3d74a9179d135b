//! Stress tests for Wattlens
//!
//! Run with: cargo test --release stress -- --ignored

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Europe::Paris;
use std::time::Instant;
use wattlens::*;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// A year of quarter-hour readings for `devices` meters.
fn year_of_readings(devices: usize) -> Vec<ConsumptionReading> {
    let samples = 365 * 96;
    let mut readings = Vec::with_capacity(devices * samples);
    for d in 0..devices {
        let id = format!("meter-{:03}", d);
        for i in 0..samples {
            let hour = (i % 96) as f64 / 4.0;
            let swing = (hour / 24.0 * std::f64::consts::TAU).sin().abs();
            let kwh = 0.5 + swing * (1.0 + d as f64 * 0.1);
            readings.push(ConsumptionReading::new(
                id.as_str(),
                start() + Duration::minutes(15 * i as i64),
                kwh,
            ));
        }
    }
    readings
}

#[test]
#[ignore] // Run manually with --ignored
fn stress_test_aggregate() {
    let readings = year_of_readings(30);
    let end = start() + Duration::days(365);

    let begin = Instant::now();
    let result = aggregate(&readings, start(), end, Granularity::QuarterHour).unwrap();
    let elapsed = begin.elapsed();
    let rate = readings.len() as f64 / elapsed.as_secs_f64();

    println!("Aggregated {} readings in {:?}", readings.len(), elapsed);
    println!("Rate: {:.0} readings/second", rate);

    assert_eq!(result.breakdown.len(), 365 * 96);
    assert!((result.breakdown_total() - result.stats.total).abs() < 1e-9);
    assert!(
        rate > 1_000_000.0,
        "Should aggregate at least 1M readings/s, got {:.0}",
        rate
    );
}

#[test]
#[ignore]
fn stress_test_cost_for_readings() {
    let readings = year_of_readings(10);
    let end = start() + Duration::days(365);
    let flags = FlagValues::new(0.0, 0.02, 0.04, 0.06);
    let schedule = TariffSchedule::new(0.5, flags, TariffFlag::Red1)
        .unwrap()
        .with_peak(0.9, PeakWindow::from_hm((18, 0), (21, 0)).unwrap())
        .unwrap()
        .with_timezone(Paris);

    let begin = Instant::now();
    let bill = calculate_cost_for_readings(&readings, start(), end, &schedule).unwrap();
    let elapsed = begin.elapsed();
    let rate = readings.len() as f64 / elapsed.as_secs_f64();

    println!("Priced {} readings in {:?}", readings.len(), elapsed);
    println!("Rate: {:.0} readings/second", rate);

    // 3 of 24 local hours, whatever the DST offset
    let share = bill.peak_consumption / bill.consumption_kwh;
    assert!(share > 0.05 && share < 0.25, "peak share {}", share);
    assert!(
        rate > 200_000.0,
        "Should price at least 200k readings/s, got {:.0}",
        rate
    );
}

#[test]
#[ignore]
fn stress_test_peak_duration_multi_year() {
    let window = PeakWindow::from_hm((22, 0), (6, 0)).unwrap();
    let end = start() + Duration::days(365 * 4);

    let begin = Instant::now();
    let peak = window.peak_duration(start(), end, Paris);
    let elapsed = begin.elapsed();

    println!("Peak duration over four years in {:?}", elapsed);

    // Eight hours a night, give or take the DST shifts
    let expected = Duration::hours(8 * 365 * 4);
    assert!((peak - expected).num_hours().abs() <= 8);
}

#[test]
#[ignore]
fn stress_test_alert_batch() {
    let engine = AlertEvaluationEngine::default();
    let alerts: Vec<AlertConfiguration> = (0..10_000)
        .map(|i| {
            let comparison = match i % 5 {
                0 => ComparisonType::Gt,
                1 => ComparisonType::Gte,
                2 => ComparisonType::Lt,
                3 => ComparisonType::Lte,
                _ => ComparisonType::Eq,
            };
            AlertConfiguration::new(
                AlertType::Consumption,
                comparison,
                i as f64,
                SiteScope::Device(DeviceId::new(format!("meter-{}", i))),
            )
        })
        .collect();

    let iterations = 100;
    let begin = Instant::now();
    for round in 0..iterations {
        let results = engine
            .evaluate_all(alerts.iter().map(|a| (a, round as f64 * 100.0)))
            .unwrap();
        assert_eq!(results.len(), alerts.len());
    }
    let elapsed = begin.elapsed();
    let rate = (iterations * alerts.len()) as f64 / elapsed.as_secs_f64();

    println!("Evaluated {} alerts in {:?}", iterations * alerts.len(), elapsed);
    println!("Rate: {:.0} evaluations/second", rate);

    assert!(
        rate > 500_000.0,
        "Should evaluate at least 500k alerts/s, got {:.0}",
        rate
    );
}
