//! API response and query types.
//!
//! Cash-flow field names follow the CSV export columns.

use serde::{Deserialize, Serialize};

use crate::config::FeasibilityConfig;
use crate::engine::CashFlowSeries;
use crate::runner::FeasibilityReport;

/// Configuration plus the report computed from it.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub config: FeasibilityConfig,
    pub report: FeasibilityReport,
}

/// One year of the cash flow; year 0 carries the investment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowRecord {
    pub year: u32,
    pub production_kwh: f64,
    /// Tariff of the year ($/kWh); absent for year 0.
    pub tariff: Option<f64>,
    pub revenue: f64,
    pub maintenance: f64,
    /// Signed flow of the year.
    pub net: f64,
    pub cumulative: f64,
}

impl CashFlowRecord {
    /// Flattens a series into one record per year, year 0 first.
    pub fn from_series(series: &CashFlowSeries) -> Vec<Self> {
        let cumulative = series.cumulative();
        let mut records = Vec::with_capacity(series.len());
        if let (Some(&net), Some(&cum)) = (series.values().first(), cumulative.first()) {
            records.push(Self {
                year: 0,
                production_kwh: 0.0,
                tariff: None,
                revenue: 0.0,
                maintenance: 0.0,
                net,
                cumulative: cum,
            });
        }
        records.extend(
            series
                .years()
                .iter()
                .zip(cumulative.iter().skip(1))
                .map(|(y, &cum)| Self {
                    year: y.year,
                    production_kwh: y.production_kwh,
                    tariff: Some(y.tariff),
                    revenue: y.revenue,
                    maintenance: y.maintenance,
                    net: y.net,
                    cumulative: cum,
                }),
        );
        records
    }
}

/// Optional range query parameters for the cash-flow endpoint.
#[derive(Debug, Deserialize)]
pub struct CashFlowQuery {
    /// First year (inclusive).
    pub from: Option<u32>,
    /// Last year (inclusive).
    pub to: Option<u32>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
