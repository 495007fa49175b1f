//! Consumption profile built from a billing history.

/// Appliance catalogue and synthesised billing histories.
pub mod appliances;
/// Billing records, cell normalisation, and CSV ingestion.
pub mod billing;
pub mod classify;

use serde::Serialize;
use tracing::debug;

use crate::error::{FeasibilityError, Result};

pub use billing::{BillingHistory, BillingRecord};
pub use classify::{ClassificationBands, ConsumerClass, StabilityLabel};

/// Span of the billing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisPeriod {
    /// Number of billed months.
    pub months: usize,
    pub first_year: i32,
    pub last_year: i32,
}

/// Descriptive statistics and average tariffs of a billing history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionProfile {
    /// Mean monthly consumption (kWh).
    pub mean_kwh: f64,
    pub min_kwh: f64,
    pub max_kwh: f64,
    /// Sample standard deviation of monthly consumption (kWh).
    pub stddev_kwh: f64,
    /// Average energy price before taxes ($/kWh).
    pub pretax_tariff: f64,
    /// Average price including taxes and fees ($/kWh).
    pub full_tariff: f64,
    pub mean_amount_pretax: f64,
    pub max_amount_pretax: f64,
    pub mean_amount_total: f64,
    pub period: AnalysisPeriod,
}

impl ConsumptionProfile {
    /// `stddev / mean`, the input to the stability classification.
    pub fn coefficient_of_variation(&self) -> f64 {
        self.stddev_kwh / self.mean_kwh
    }

    /// Stability label under the given bands.
    pub fn stability(&self, bands: &ClassificationBands) -> StabilityLabel {
        bands.stability(self.coefficient_of_variation())
    }

    /// Consumer class under the given bands.
    pub fn consumer_class(&self, bands: &ClassificationBands) -> ConsumerClass {
        bands.consumer_class(self.mean_kwh)
    }
}

/// Computes the consumption profile of a billing history.
///
/// A single-record history has a standard deviation of zero.
///
/// # Errors
///
/// Returns `EmptyHistory` for a history without records and
/// `DivisionByZero` when mean consumption is zero.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use pv_feasibility::consumption::{build, BillingHistory, BillingRecord};
///
/// let date = NaiveDate::from_ymd_opt(2023, 1, 24).unwrap();
/// let record = BillingRecord::new(1, None, date, 80.0, 8.0, 10.0).unwrap();
/// let profile = build(&BillingHistory::new(vec![record])).unwrap();
/// assert_eq!(profile.pretax_tariff, 0.1);
/// assert_eq!(profile.full_tariff, 0.125);
/// ```
pub fn build(history: &BillingHistory) -> Result<ConsumptionProfile> {
    let records = history.records();
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(FeasibilityError::EmptyHistory);
    };

    let n = records.len() as f64;
    let energy: Vec<f64> = records.iter().map(|r| r.energy_kwh).collect();
    let mean_kwh = energy.iter().sum::<f64>() / n;
    if mean_kwh == 0.0 {
        return Err(FeasibilityError::DivisionByZero("mean monthly consumption is zero"));
    }

    let min_kwh = energy.iter().copied().fold(f64::INFINITY, f64::min);
    let max_kwh = energy.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let stddev_kwh = if records.len() > 1 {
        let sq: f64 = energy.iter().map(|e| (e - mean_kwh).powi(2)).sum();
        (sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    let mean_amount_pretax = records.iter().map(|r| r.amount_pretax).sum::<f64>() / n;
    let max_amount_pretax = records
        .iter()
        .map(|r| r.amount_pretax)
        .fold(f64::NEG_INFINITY, f64::max);
    let mean_amount_total = records.iter().map(|r| r.amount_total).sum::<f64>() / n;

    let profile = ConsumptionProfile {
        mean_kwh,
        min_kwh,
        max_kwh,
        stddev_kwh,
        pretax_tariff: mean_amount_pretax / mean_kwh,
        full_tariff: mean_amount_total / mean_kwh,
        mean_amount_pretax,
        max_amount_pretax,
        mean_amount_total,
        period: AnalysisPeriod {
            months: records.len(),
            first_year: first.year(),
            last_year: last.year(),
        },
    };
    debug!(
        months = profile.period.months,
        mean_kwh = profile.mean_kwh,
        stddev_kwh = profile.stddev_kwh,
        full_tariff = profile.full_tariff,
        "consumption profile built"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(month: u32, energy: f64, pretax: f64, total: f64) -> BillingRecord {
        let date = NaiveDate::from_ymd_opt(2023, month, 24).unwrap();
        BillingRecord::new(month as usize, None, date, energy, pretax, total).unwrap()
    }

    fn history() -> BillingHistory {
        BillingHistory::new(vec![
            record(3, 60.0, 6.0, 8.0),
            record(1, 80.0, 8.0, 10.0),
            record(2, 70.0, 7.0, 9.0),
        ])
    }

    #[test]
    fn statistics_of_three_months() {
        let p = build(&history()).unwrap();
        assert_eq!(p.mean_kwh, 70.0);
        assert_eq!(p.min_kwh, 60.0);
        assert_eq!(p.max_kwh, 80.0);
        // sample stddev of 60, 70, 80 is 10
        assert!((p.stddev_kwh - 10.0).abs() < 1e-12);
        assert!((p.pretax_tariff - 0.1).abs() < 1e-12);
        assert!((p.full_tariff - 9.0 / 70.0).abs() < 1e-12);
        assert_eq!(p.max_amount_pretax, 8.0);
        assert_eq!(p.period.months, 3);
        assert_eq!(p.period.first_year, 2023);
    }

    #[test]
    fn build_is_idempotent() {
        let h = history();
        assert_eq!(build(&h).unwrap(), build(&h).unwrap());
    }

    #[test]
    fn empty_history_fails() {
        let err = build(&BillingHistory::default()).unwrap_err();
        assert!(matches!(err, FeasibilityError::EmptyHistory));
    }

    #[test]
    fn zero_consumption_is_division_by_zero() {
        let h = BillingHistory::new(vec![record(1, 0.0, 0.0, 1.0), record(2, 0.0, 0.0, 1.0)]);
        let err = build(&h).unwrap_err();
        assert!(matches!(err, FeasibilityError::DivisionByZero(_)));
    }

    #[test]
    fn single_record_has_zero_spread() {
        let p = build(&BillingHistory::new(vec![record(5, 90.0, 9.0, 11.0)])).unwrap();
        assert_eq!(p.stddev_kwh, 0.0);
        assert_eq!(p.stability(&ClassificationBands::default()), StabilityLabel::VeryStable);
    }

    #[test]
    fn labels_follow_default_bands() {
        let p = build(&history()).unwrap();
        let bands = ClassificationBands::default();
        // cv = 10 / 70 ~ 0.143
        assert_eq!(p.stability(&bands), StabilityLabel::ModeratelyStable);
        assert_eq!(p.consumer_class(&bands), ConsumerClass::Residential);
    }
}
