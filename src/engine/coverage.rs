//! Per-bill solar coverage and the simple payback estimate.

use serde::Serialize;

use crate::consumption::{BillingHistory, ConsumptionProfile};

use super::sizing::SizingResult;

/// Solar generation set against one billed month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCoverage {
    pub year: i32,
    pub month: u32,
    pub consumption_kwh: f64,
    pub generation_kwh: f64,
    /// `generation / consumption * 100`; `None` for a zero-consumption bill.
    pub coverage_pct: Option<f64>,
    /// Generation in excess of consumption (kWh).
    pub surplus_kwh: f64,
}

/// Coverage of every billed month by the expected production of its calendar
/// month.
pub fn monthly_coverage(history: &BillingHistory, sizing: &SizingResult) -> Vec<MonthlyCoverage> {
    history
        .records()
        .iter()
        .map(|record| {
            let generation_kwh =
                sizing.expected_monthly_production_kwh[record.month() as usize - 1];
            let consumption_kwh = record.energy_kwh;
            MonthlyCoverage {
                year: record.year(),
                month: record.month(),
                consumption_kwh,
                generation_kwh,
                coverage_pct: (consumption_kwh > 0.0)
                    .then(|| generation_kwh / consumption_kwh * 100.0),
                surplus_kwh: (generation_kwh - consumption_kwh).max(0.0),
            }
        })
        .collect()
}

/// Undiscounted first-year view of the investment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleEconomics {
    pub investment: f64,
    /// Pre-tax bill value of the mean consumption over a year ($).
    pub annual_savings: f64,
    /// `investment / annual_savings`; `None` when savings are not positive.
    pub simple_payback_years: Option<f64>,
}

impl SimpleEconomics {
    pub fn new(profile: &ConsumptionProfile, investment: f64) -> Self {
        let annual_savings = profile.mean_kwh * profile.pretax_tariff * 12.0;
        Self {
            investment,
            annual_savings,
            simple_payback_years: (annual_savings > 0.0).then(|| investment / annual_savings),
        }
    }
}
