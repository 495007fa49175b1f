//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use pv_feasibility::DAYS_PER_MONTH;
use pv_feasibility::config::FeasibilityConfig;
use pv_feasibility::consumption::{BillingHistory, BillingRecord};
use pv_feasibility::irradiance::raster::AscRasterFile;
use pv_feasibility::irradiance::{IrradianceLookup, IrradianceProfile, Location};
use pv_feasibility::runner::AnalysisSettings;

/// Monthly consumption of the 2023 reference household (kWh).
pub const ENERGY_2023: [f64; 12] = [
    82.0, 71.0, 73.0, 70.0, 67.0, 63.0, 77.0, 81.0, 64.0, 62.0, 65.0, 62.0,
];

/// Path relative to the crate root.
pub fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

/// Quito, inside the bundled rasters.
pub fn quito() -> Location {
    Location::new(-0.22985, -78.52495).expect("Quito is a valid location")
}

/// The twelve 2023 bills of the reference household.
pub fn billing_2023() -> BillingHistory {
    const PRETAX: [&str; 12] = [
        "7.53", "6.5", "6.69", "6.41", "6.13", "5.75", "7.06", "7.43", "5.85", "5.67", "5.95",
        "5.67",
    ];
    const TOTAL: [&str; 12] = [
        "8.66", "7.95", "8.08", "7.88", "7.69", "8.03", "8.82", "9.05", "8.08", "7.97", "8.14",
        "7.97",
    ];
    let records = (0..12)
        .map(|i| {
            let date = format!("2023-{:02}-{}", i + 1, if i == 1 { 28 } else { 24 });
            BillingRecord::parse(
                i + 1,
                None,
                &date,
                &ENERGY_2023[i].to_string(),
                PRETAX[i],
                TOTAL[i],
            )
            .expect("reference bill should parse")
        })
        .collect();
    BillingHistory::new(records)
}

/// A history where every month bills `energy_kwh` at the given unit prices.
pub fn flat_history(energy_kwh: f64, pretax: f64, full: f64) -> BillingHistory {
    let records = (1..=12u32)
        .map(|m| {
            let date = chrono::NaiveDate::from_ymd_opt(2023, m, 15).expect("valid date");
            BillingRecord::new(
                m as usize,
                None,
                date,
                energy_kwh,
                energy_kwh * pretax,
                energy_kwh * full,
            )
            .expect("valid record")
        })
        .collect();
    BillingHistory::new(records)
}

/// Profile with no seasonality: every month produces `daily * 30` kWh/kWp.
pub fn flat_irradiance(daily: f64) -> IrradianceProfile {
    IrradianceProfile::from_monthly(daily, [daily * DAYS_PER_MONTH; 12])
        .expect("flat profile should build")
}

/// Lookup over the bundled ESRI ASCII rasters.
pub fn bundled_lookup() -> IrradianceLookup<AscRasterFile> {
    IrradianceLookup::from_paths(
        &repo_path("data/rasters/ghi_daily.asc"),
        &repo_path("data/rasters/monthly"),
    )
    .expect("bundled rasters should open")
}

/// Engine settings of the demo preset (75% coverage, 20% losses, 25 years, 8%).
pub fn demo_settings() -> AnalysisSettings {
    AnalysisSettings::from_config(&FeasibilityConfig::demo())
}
