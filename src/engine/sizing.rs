//! Closed-form PV system sizing.

use serde::Serialize;
use tracing::info;

use crate::DAYS_PER_MONTH;
use crate::consumption::ConsumptionProfile;
use crate::error::{FeasibilityError, Result};
use crate::irradiance::{IrradianceProfile, MONTHS};

/// Recommended capacity and the production it yields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingResult {
    /// Capacity that offsets 100% of mean consumption (kWp).
    pub full_coverage_kwp: f64,
    /// Capacity for the requested coverage target (kWp).
    pub target_kwp: f64,
    pub coverage_target: f64,
    pub loss_factor: f64,
    /// Derated monthly production per installed kWp (kWh/kWp).
    pub production_per_kwp: f64,
    /// Expected production of `target_kwp` per calendar month (kWh).
    pub expected_monthly_production_kwh: [f64; MONTHS],
    /// Derated monthly production per kWp from the daily average (kWh/kWp),
    /// the base of the multi-year projection.
    pub monthly_production_base_kwh: f64,
    /// Seasonal shape applied to the base, January..December.
    pub monthly_factors: [f64; MONTHS],
}

impl SizingResult {
    /// Mean of the expected monthly production (kWh).
    pub fn mean_monthly_production_kwh(&self) -> f64 {
        self.expected_monthly_production_kwh.iter().sum::<f64>() / MONTHS as f64
    }
}

/// Sizes a system to cover `coverage_target` of mean consumption.
///
/// # Arguments
///
/// * `profile` - Consumption profile (uses `mean_kwh`)
/// * `irradiance` - Irradiance profile of the site
/// * `loss_factor` - Derating multiplier in (0, 1]
/// * `coverage_target` - Fraction of consumption to offset, in [0, 1]
///
/// # Errors
///
/// Returns `InvalidParameter` naming `loss_factor` or `coverage_target` when
/// out of range, and `DivisionByZero` when the derated production per kWp is
/// not positive.
pub fn size(
    profile: &ConsumptionProfile,
    irradiance: &IrradianceProfile,
    loss_factor: f64,
    coverage_target: f64,
) -> Result<SizingResult> {
    if loss_factor.is_nan() || loss_factor <= 0.0 || loss_factor > 1.0 {
        return Err(FeasibilityError::invalid_parameter(
            "loss_factor",
            loss_factor,
            "must be in (0, 1]",
        ));
    }
    if !(0.0..=1.0).contains(&coverage_target) {
        return Err(FeasibilityError::invalid_parameter(
            "coverage_target",
            coverage_target,
            "must be in [0, 1]",
        ));
    }

    let production_per_kwp = irradiance.annual_mean() * loss_factor;
    if production_per_kwp.is_nan() || production_per_kwp <= 0.0 {
        return Err(FeasibilityError::DivisionByZero(
            "production per kWp is not positive",
        ));
    }

    let full_coverage_kwp = profile.mean_kwh / production_per_kwp;
    let target_kwp = full_coverage_kwp * coverage_target;
    let expected_monthly_production_kwh = irradiance.monthly_values.map(|v| target_kwp * v);

    info!(full_coverage_kwp, target_kwp, production_per_kwp, "system sized");

    Ok(SizingResult {
        full_coverage_kwp,
        target_kwp,
        coverage_target,
        loss_factor,
        production_per_kwp,
        expected_monthly_production_kwh,
        monthly_production_base_kwh: irradiance.daily_average * DAYS_PER_MONTH * loss_factor,
        monthly_factors: irradiance.monthly_factors,
    })
}

/// Up-front cost of `target_kwp` at `cost_per_wp` dollars per installed watt.
pub fn initial_investment(target_kwp: f64, cost_per_wp: f64) -> f64 {
    target_kwp * 1000.0 * cost_per_wp
}
