//! Sizing, projection and evaluation of a grid-tied PV investment.
//!
//! Each stage is a pure function of its inputs: [`size`] turns a consumption
//! profile and an irradiance profile into a capacity, [`project`] turns the
//! capacity into yearly cash flows and [`evaluate`] reduces the flows to NPV,
//! IRR and payback.

pub mod cashflow;
pub mod coverage;
pub mod indicators;
pub mod sizing;

pub use cashflow::{
    AnnualProjection, CashFlowSeries, DEFAULT_DEGRADATION, DEFAULT_TARIFF_ESCALATION,
    ProjectionParams, project,
};
pub use coverage::{MonthlyCoverage, SimpleEconomics, monthly_coverage};
pub use indicators::{
    FinancialIndicators, InvestmentDecision, Payback, Profitability, evaluate, irr, npv, payback,
};
pub use sizing::{SizingResult, initial_investment, size};
