//! Investment indicators of a cash-flow series: NPV, IRR and payback year.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{FeasibilityError, Result};

use super::cashflow::CashFlowSeries;

/// Starting rate of the Newton iteration.
const IRR_GUESS: f64 = 0.10;
/// Convergence tolerance on the rate step.
const IRR_TOLERANCE: f64 = 1e-10;
const IRR_MAX_ITERATIONS: usize = 100;
/// Largest accepted |NPV| at the root, relative to the largest flow.
const IRR_NPV_TOLERANCE: f64 = 1e-12;
/// Search interval of the bracketing fallback.
const IRR_LOWER: f64 = -0.99;
const IRR_UPPER: f64 = 10.0;
const IRR_SCAN_STEP: f64 = 0.01;

/// Year in which the investment is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payback {
    /// Index of the first year whose cumulative cash flow is non-negative.
    Year(usize),
    /// Cumulative cash flow stays negative over the whole horizon.
    NotRecovered,
}

impl fmt::Display for Payback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "year {year}"),
            Self::NotRecovered => f.write_str("not recovered"),
        }
    }
}

/// Sign of the NPV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Profitability {
    Profitable,
    Marginal,
    Unprofitable,
}

impl Profitability {
    pub fn from_npv(npv: f64) -> Self {
        if npv > 0.0 {
            Self::Profitable
        } else if npv < 0.0 {
            Self::Unprofitable
        } else {
            Self::Marginal
        }
    }
}

impl fmt::Display for Profitability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Profitable => "profitable",
            Self::Marginal => "marginal",
            Self::Unprofitable => "unprofitable",
        })
    }
}

/// IRR compared with the discount rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentDecision {
    Go,
    Marginal,
    NoGo,
}

impl InvestmentDecision {
    /// `None` when the IRR is undefined.
    pub fn from_irr(irr: Option<f64>, discount_rate: f64) -> Option<Self> {
        let irr = irr?;
        Some(if irr > discount_rate {
            Self::Go
        } else if irr < discount_rate {
            Self::NoGo
        } else {
            Self::Marginal
        })
    }
}

impl fmt::Display for InvestmentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Go => "go",
            Self::Marginal => "marginal",
            Self::NoGo => "no-go",
        })
    }
}

/// Indicators of one cash-flow series at one discount rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialIndicators {
    pub npv: f64,
    /// `None` when no rate zeroes the NPV.
    pub irr: Option<f64>,
    pub payback: Payback,
    pub discount_rate: f64,
}

impl FinancialIndicators {
    pub fn profitability(&self) -> Profitability {
        Profitability::from_npv(self.npv)
    }

    pub fn decision(&self) -> Option<InvestmentDecision> {
        InvestmentDecision::from_irr(self.irr, self.discount_rate)
    }
}

impl fmt::Display for FinancialIndicators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Financial Indicators ---")?;
        writeln!(
            f,
            "NPV:                   {:.2} $ at {:.2}%",
            self.npv,
            self.discount_rate * 100.0
        )?;
        match self.irr {
            Some(irr) => writeln!(f, "IRR:                   {:.2}%", irr * 100.0)?,
            None => writeln!(f, "IRR:                   undefined")?,
        }
        writeln!(f, "Payback:               {}", self.payback)?;
        writeln!(f, "Profitability:         {}", self.profitability())?;
        match self.decision() {
            Some(decision) => write!(f, "Decision:              {decision}"),
            None => write!(f, "Decision:              undefined"),
        }
    }
}

/// Net present value of `values` discounted at `rate`, index 0 undiscounted.
pub fn npv(values: &[f64], rate: f64) -> f64 {
    let one_plus_r = 1.0 + rate;
    let mut discount = 1.0;
    let mut total = 0.0;
    for (t, cf) in values.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        total += cf / discount;
    }
    total
}

/// Derivative of [`npv`] with respect to the rate.
fn npv_derivative(values: &[f64], rate: f64) -> f64 {
    let one_plus_r = 1.0 + rate;
    let mut discount = one_plus_r;
    let mut total = 0.0;
    for (t, cf) in values.iter().enumerate().skip(1) {
        discount *= one_plus_r;
        total -= t as f64 * cf / discount;
    }
    total
}

/// Internal rate of return of `values`.
///
/// Newton-Raphson from 10% (at most 100 iterations). A rate is accepted once
/// the step is below 1e-10 and |NPV| is below 1e-12 times the largest
/// absolute flow. If that does not converge to a rate above -100%, the
/// interval (-0.99, 10] is scanned in 1% steps for a sign change of the NPV,
/// which is then bisected to the same NPV tolerance or to float resolution.
///
/// # Errors
///
/// Returns `NoRealRoot` when the series never changes sign or no root lies in
/// the search interval.
pub fn irr(values: &[f64]) -> Result<f64> {
    let has_positive = values.iter().any(|&v| v > 0.0);
    let has_negative = values.iter().any(|&v| v < 0.0);
    if !(has_positive && has_negative) {
        return Err(FeasibilityError::NoRealRoot);
    }

    let largest = values.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let npv_tolerance = IRR_NPV_TOLERANCE * largest;
    if let Some(rate) = newton(values, npv_tolerance) {
        return Ok(rate);
    }
    debug!("newton iteration did not converge, bracketing irr");
    bracket(values, npv_tolerance).ok_or(FeasibilityError::NoRealRoot)
}

fn newton(values: &[f64], npv_tolerance: f64) -> Option<f64> {
    let mut rate = IRR_GUESS;
    for _ in 0..IRR_MAX_ITERATIONS {
        let slope = npv_derivative(values, rate);
        if slope == 0.0 || !slope.is_finite() {
            return None;
        }
        let step = npv(values, rate) / slope;
        rate -= step;
        if !rate.is_finite() || rate <= -1.0 {
            return None;
        }
        if step.abs() < IRR_TOLERANCE && npv(values, rate).abs() <= npv_tolerance {
            return Some(rate);
        }
    }
    None
}

fn bracket(values: &[f64], npv_tolerance: f64) -> Option<f64> {
    let mut lo = IRR_LOWER;
    let mut f_lo = npv(values, lo);
    while lo < IRR_UPPER {
        let hi = (lo + IRR_SCAN_STEP).min(IRR_UPPER);
        let f_hi = npv(values, hi);
        if f_lo == 0.0 {
            return Some(lo);
        }
        if f_lo.signum() != f_hi.signum() {
            return Some(bisect(values, lo, hi, f_lo, npv_tolerance));
        }
        lo = hi;
        f_lo = f_hi;
    }
    None
}

fn bisect(
    values: &[f64],
    mut lo: f64,
    mut hi: f64,
    mut f_lo: f64,
    npv_tolerance: f64,
) -> f64 {
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv(values, mid);
        // stop once the interval cannot be split further
        if f_mid.abs() <= npv_tolerance || mid <= lo || mid >= hi {
            return mid;
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// First index whose running cumulative sum is non-negative.
pub fn payback(values: &[f64]) -> Payback {
    let mut cumulative = 0.0;
    for (t, cf) in values.iter().enumerate() {
        cumulative += cf;
        if cumulative >= 0.0 {
            return Payback::Year(t);
        }
    }
    Payback::NotRecovered
}

/// Computes NPV, IRR and payback of a projected series.
///
/// An unsolvable IRR is reported as `irr: None`; the other indicators are
/// still produced.
///
/// # Errors
///
/// Returns `InvalidCashFlow` if any entry is NaN or infinite (no indicators
/// are produced) and `InvalidParameter` for a non-finite or <= -1 rate.
pub fn evaluate(cashflow: &CashFlowSeries, discount_rate: f64) -> Result<FinancialIndicators> {
    if !cashflow.is_finite() {
        return Err(FeasibilityError::InvalidCashFlow);
    }
    if !discount_rate.is_finite() || discount_rate <= -1.0 {
        return Err(FeasibilityError::invalid_parameter(
            "discount_rate",
            discount_rate,
            "must be finite and > -1",
        ));
    }

    let values = cashflow.values();
    let irr = match irr(values) {
        Ok(rate) => Some(rate),
        Err(err) => {
            warn!(%err, "irr undefined for this cash flow");
            None
        }
    };
    let indicators = FinancialIndicators {
        npv: npv(values, discount_rate),
        irr,
        payback: payback(values),
        discount_rate,
    };
    debug!(
        npv = indicators.npv,
        irr = ?indicators.irr,
        payback = %indicators.payback,
        "indicators evaluated"
    );
    Ok(indicators)
}
