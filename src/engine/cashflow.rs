//! Multi-year cash-flow projection under degradation and tariff escalation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FeasibilityError, Result};

use super::sizing::SizingResult;

/// Default yearly tariff increase (2%).
pub const DEFAULT_TARIFF_ESCALATION: f64 = 0.02;
/// Default yearly panel output loss (0.5%).
pub const DEFAULT_DEGRADATION: f64 = 0.005;

/// Economic inputs of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParams {
    /// Energy price in the first year ($/kWh).
    pub tariff: f64,
    /// Number of projected years.
    pub horizon_years: u32,
    /// Fixed yearly maintenance cost ($).
    pub maintenance_per_year: f64,
    /// Yearly relative tariff increase.
    pub tariff_escalation: f64,
    /// Yearly relative production loss.
    pub degradation_per_year: f64,
    /// Up-front cost ($), entered as a negative flow at year 0.
    pub initial_investment: f64,
}

impl ProjectionParams {
    fn validate(&self) -> Result<()> {
        let non_negative = [
            ("tariff", self.tariff),
            ("maintenance_per_year", self.maintenance_per_year),
            ("initial_investment", self.initial_investment),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(FeasibilityError::invalid_parameter(
                    name,
                    value,
                    "must be finite and >= 0",
                ));
            }
        }
        if !self.tariff_escalation.is_finite() || self.tariff_escalation <= -1.0 {
            return Err(FeasibilityError::invalid_parameter(
                "tariff_escalation",
                self.tariff_escalation,
                "must be finite and > -1",
            ));
        }
        if !(0.0..1.0).contains(&self.degradation_per_year) {
            return Err(FeasibilityError::invalid_parameter(
                "degradation_per_year",
                self.degradation_per_year,
                "must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Breakdown of one projected year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualProjection {
    /// Project year, starting at 1.
    pub year: u32,
    pub production_kwh: f64,
    /// Tariff applied this year ($/kWh).
    pub tariff: f64,
    pub revenue: f64,
    pub maintenance: f64,
    /// `revenue - maintenance`.
    pub net: f64,
}

/// Signed yearly cash flows: index 0 is the negative investment, then one net
/// saving per projected year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowSeries {
    values: Vec<f64>,
    years: Vec<AnnualProjection>,
}

impl CashFlowSeries {
    /// Wraps a raw series without a yearly breakdown.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            values,
            years: Vec::new(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Yearly breakdown, empty for series built with [`CashFlowSeries::from_values`].
    pub fn years(&self) -> &[AnnualProjection] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Up-front cost (the negated first flow).
    pub fn initial_investment(&self) -> f64 {
        self.values.first().map_or(0.0, |v| -v)
    }

    /// Running sum of the series.
    pub fn cumulative(&self) -> Vec<f64> {
        self.values
            .iter()
            .scan(0.0, |acc, v| {
                *acc += v;
                Some(*acc)
            })
            .collect()
    }

    /// Undiscounted sum of all yearly savings (year 0 excluded).
    pub fn total_net_savings(&self) -> f64 {
        self.values.iter().skip(1).sum()
    }

    /// Total savings over the investment; `None` for a zero investment.
    pub fn benefit_cost_ratio(&self) -> Option<f64> {
        let investment = self.initial_investment();
        (investment != 0.0).then(|| self.total_net_savings() / investment)
    }

    /// Returns `true` if no entry is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// Projects yearly net savings of a sized system.
///
/// Year `y` produces `sum_m(target_kwp * base * factor_m) * (1 - degradation)^(y-1)`
/// kWh, sold at the year's tariff, minus maintenance. The tariff grows by
/// `tariff_escalation` after each year. The result is a pure function of its
/// inputs.
///
/// # Errors
///
/// Returns `InvalidParameter` for out-of-range economic inputs.
pub fn project(sizing: &SizingResult, params: &ProjectionParams) -> Result<CashFlowSeries> {
    params.validate()?;

    let horizon = params.horizon_years as usize;
    let mut values = Vec::with_capacity(horizon + 1);
    let mut years = Vec::with_capacity(horizon);
    values.push(-params.initial_investment);

    let mut tariff = params.tariff;
    for year in 1..=params.horizon_years {
        let decay = (1.0 - params.degradation_per_year).powi(year as i32 - 1);
        let production_kwh: f64 = sizing
            .monthly_factors
            .iter()
            .map(|factor| sizing.target_kwp * sizing.monthly_production_base_kwh * factor * decay)
            .sum();
        let revenue = production_kwh * tariff;
        let net = revenue - params.maintenance_per_year;

        values.push(net);
        years.push(AnnualProjection {
            year,
            production_kwh,
            tariff,
            revenue,
            maintenance: params.maintenance_per_year,
            net,
        });

        tariff *= 1.0 + params.tariff_escalation;
    }

    debug!(
        horizon_years = params.horizon_years,
        initial_investment = params.initial_investment,
        first_year_net = values.get(1).copied(),
        "cash flow projected"
    );
    Ok(CashFlowSeries { values, years })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizing(target_kwp: f64, base: f64) -> SizingResult {
        SizingResult {
            full_coverage_kwp: target_kwp,
            target_kwp,
            coverage_target: 1.0,
            loss_factor: 0.8,
            production_per_kwp: base,
            expected_monthly_production_kwh: [target_kwp * base; 12],
            monthly_production_base_kwh: base,
            monthly_factors: [1.0; 12],
        }
    }

    fn params(horizon_years: u32) -> ProjectionParams {
        ProjectionParams {
            tariff: 0.12,
            horizon_years,
            maintenance_per_year: 20.0,
            tariff_escalation: DEFAULT_TARIFF_ESCALATION,
            degradation_per_year: DEFAULT_DEGRADATION,
            initial_investment: 600.0,
        }
    }

    #[test]
    fn anchored_by_negative_investment() {
        for horizon in [0, 1, 10, 25] {
            let cf = project(&sizing(0.5, 108.0), &params(horizon)).unwrap();
            assert_eq!(cf.len(), horizon as usize + 1);
            assert_eq!(cf.values()[0], -600.0);
            assert_eq!(cf.years().len(), horizon as usize);
        }
    }

    #[test]
    fn first_year_has_no_degradation() {
        let cf = project(&sizing(0.5, 100.0), &params(3)).unwrap();
        let y1 = &cf.years()[0];
        assert!((y1.production_kwh - 600.0).abs() < 1e-9);
        assert!((y1.revenue - 72.0).abs() < 1e-9);
        assert!((y1.net - 52.0).abs() < 1e-9);
    }

    #[test]
    fn degradation_and_escalation_compound() {
        let cf = project(&sizing(0.5, 100.0), &params(3)).unwrap();
        let y3 = &cf.years()[2];
        assert!((y3.production_kwh - 600.0 * 0.995_f64.powi(2)).abs() < 1e-9);
        assert!((y3.tariff - 0.12 * 1.02_f64.powi(2)).abs() < 1e-12);
    }

    #[test]
    fn flat_economics_give_constant_savings() {
        let p = ProjectionParams {
            tariff_escalation: 0.0,
            degradation_per_year: 0.0,
            ..params(5)
        };
        let cf = project(&sizing(0.5, 100.0), &p).unwrap();
        assert!(cf.values()[1..].iter().all(|&v| v == cf.values()[1]));
    }

    #[test]
    fn projection_is_pure() {
        let a = project(&sizing(0.7, 112.0), &params(25)).unwrap();
        let b = project(&sizing(0.7, 112.0), &params(25)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cumulative_and_ratio_helpers() {
        let cf = CashFlowSeries::from_values(vec![-100.0, 30.0, 30.0, 60.0]);
        assert_eq!(cf.cumulative(), vec![-100.0, -70.0, -40.0, 20.0]);
        assert_eq!(cf.total_net_savings(), 120.0);
        assert_eq!(cf.benefit_cost_ratio(), Some(1.2));
        assert_eq!(CashFlowSeries::from_values(vec![0.0, 5.0]).benefit_cost_ratio(), None);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let s = sizing(0.5, 100.0);
        let bad = [
            ProjectionParams {
                tariff: -0.1,
                ..params(5)
            },
            ProjectionParams {
                tariff: f64::NAN,
                ..params(5)
            },
            ProjectionParams {
                degradation_per_year: 1.0,
                ..params(5)
            },
            ProjectionParams {
                tariff_escalation: -1.0,
                ..params(5)
            },
            ProjectionParams {
                initial_investment: f64::INFINITY,
                ..params(5)
            },
        ];
        for p in bad {
            assert!(matches!(
                project(&s, &p),
                Err(FeasibilityError::InvalidParameter { .. })
            ));
        }
    }
}
