//! End-to-end feasibility pipeline: sources -> profile -> sizing -> cash flow -> indicators.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::{ConsumptionSource, FeasibilityConfig, IrradianceSource};
use crate::consumption::appliances::synthesize_history;
use crate::consumption::{
    self, BillingHistory, BillingRecord, ClassificationBands, ConsumerClass, ConsumptionProfile,
    StabilityLabel,
};
use crate::engine::{
    self, CashFlowSeries, FinancialIndicators, InvestmentDecision, MonthlyCoverage,
    Profitability, ProjectionParams, SimpleEconomics, SizingResult,
};
use crate::error::{FeasibilityError, Result};
use crate::irradiance::{IrradianceLookup, IrradianceProfile, Location, MONTHS};

/// Engine parameters of one analysis, already converted to fractions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSettings {
    pub loss_factor: f64,
    pub coverage_target: f64,
    pub cost_per_wp: f64,
    pub lifetime_years: u32,
    pub horizon_years: u32,
    pub maintenance_per_year: f64,
    pub discount_rate: f64,
    pub tariff_escalation: f64,
    pub degradation_per_year: f64,
    pub bands: ClassificationBands,
}

impl AnalysisSettings {
    pub fn from_config(config: &FeasibilityConfig) -> Self {
        let e = &config.economics;
        Self {
            loss_factor: config.sizing.loss_factor(),
            coverage_target: config.sizing.coverage_target(),
            cost_per_wp: e.cost_per_wp,
            lifetime_years: e.lifetime_years,
            horizon_years: e.horizon_years,
            maintenance_per_year: e.maintenance_per_year,
            discount_rate: e.discount_rate,
            tariff_escalation: e.tariff_escalation,
            degradation_per_year: e.degradation_per_year,
            bands: config.classification.clone(),
        }
    }
}

/// Everything one feasibility run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeasibilityReport {
    pub location: Location,
    pub irradiance: IrradianceProfile,
    pub profile: ConsumptionProfile,
    pub stability: StabilityLabel,
    pub consumer_class: ConsumerClass,
    pub sizing: SizingResult,
    pub economics: SimpleEconomics,
    pub coverage: Vec<MonthlyCoverage>,
    pub cashflow: CashFlowSeries,
    pub indicators: FinancialIndicators,
    pub profitability: Profitability,
    pub decision: Option<InvestmentDecision>,
    pub lifetime_years: u32,
}

/// Runs the pure part of the pipeline on already-resolved inputs.
///
/// # Errors
///
/// Returns the first engine failure; later stages do not run.
pub fn analyze(
    history: &BillingHistory,
    irradiance: IrradianceProfile,
    location: Location,
    settings: &AnalysisSettings,
) -> Result<FeasibilityReport> {
    let profile = consumption::build(history)?;
    let sizing = engine::size(
        &profile,
        &irradiance,
        settings.loss_factor,
        settings.coverage_target,
    )?;
    let investment = engine::initial_investment(sizing.target_kwp, settings.cost_per_wp);

    let cashflow = engine::project(
        &sizing,
        &ProjectionParams {
            tariff: profile.full_tariff,
            horizon_years: settings.horizon_years,
            maintenance_per_year: settings.maintenance_per_year,
            tariff_escalation: settings.tariff_escalation,
            degradation_per_year: settings.degradation_per_year,
            initial_investment: investment,
        },
    )?;
    let indicators = engine::evaluate(&cashflow, settings.discount_rate)?;

    info!(
        target_kwp = sizing.target_kwp,
        investment,
        npv = indicators.npv,
        "feasibility analysis complete"
    );

    Ok(FeasibilityReport {
        location,
        stability: profile.stability(&settings.bands),
        consumer_class: profile.consumer_class(&settings.bands),
        economics: SimpleEconomics::new(&profile, investment),
        coverage: engine::monthly_coverage(history, &sizing),
        profitability: indicators.profitability(),
        decision: indicators.decision(),
        lifetime_years: settings.lifetime_years,
        irradiance,
        profile,
        sizing,
        cashflow,
        indicators,
    })
}

/// Resolves the configured sources and runs the full analysis.
///
/// # Errors
///
/// Returns `Config` if the configuration does not validate, and any source or
/// engine failure otherwise.
pub fn run_feasibility(config: &FeasibilityConfig) -> Result<FeasibilityReport> {
    let errors = config.validate();
    if !errors.is_empty() {
        let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(FeasibilityError::Config(joined.join("; ")));
    }

    let location = Location::new(config.location.latitude, config.location.longitude)?;
    let irradiance = load_irradiance(config, &location)?;
    let history = load_history(config)?;
    info!(
        records = history.len(),
        daily_irradiance = irradiance.daily_average,
        "inputs resolved"
    );

    analyze(
        &history,
        irradiance,
        location,
        &AnalysisSettings::from_config(config),
    )
}

fn load_irradiance(config: &FeasibilityConfig, location: &Location) -> Result<IrradianceProfile> {
    let irr = &config.irradiance;
    match irr.source {
        IrradianceSource::Raster => {
            let daily = irr
                .daily_raster
                .as_deref()
                .ok_or_else(|| missing("irradiance.daily_raster"))?;
            let monthly = irr
                .monthly_dir
                .as_deref()
                .ok_or_else(|| missing("irradiance.monthly_dir"))?;
            IrradianceLookup::from_paths(daily, monthly)?.lookup(location)
        }
        IrradianceSource::Fixed => {
            let values: [f64; MONTHS] =
                irr.monthly_values.as_slice().try_into().map_err(|_| {
                    FeasibilityError::Config(format!(
                        "irradiance.monthly_values must hold {MONTHS} values"
                    ))
                })?;
            IrradianceProfile::from_monthly(irr.daily_average, values)
        }
    }
}

fn load_history(config: &FeasibilityConfig) -> Result<BillingHistory> {
    let c = &config.consumption;
    match c.source {
        ConsumptionSource::Csv => {
            let path: &Path = c.csv_path.as_deref().ok_or_else(|| missing("consumption.csv_path"))?;
            BillingHistory::from_csv_path(path)
        }
        ConsumptionSource::Table => {
            let records = c
                .records
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    BillingRecord::parse(
                        i + 1,
                        row.invoice.as_deref(),
                        &row.date,
                        &row.energy_kwh.to_string(),
                        &row.amount_pretax.to_string(),
                        &row.amount_total.to_string(),
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(BillingHistory::new(records))
        }
        ConsumptionSource::Appliances => synthesize_history(&c.appliances, c.unit_prices(), c.year),
    }
}

fn missing(field: &str) -> FeasibilityError {
    FeasibilityError::Config(format!("{field} is not set"))
}

impl fmt::Display for FeasibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.profile;
        let s = &self.sizing;
        let e = &self.economics;

        writeln!(f, "--- Site ---")?;
        writeln!(
            f,
            "Location:              {:.5}, {:.5}",
            self.location.latitude, self.location.longitude
        )?;
        writeln!(
            f,
            "Daily irradiance:      {:.2} kWh/m2/day",
            self.irradiance.daily_average
        )?;
        writeln!(
            f,
            "Specific production:   {:.2} kWh/kWp/month",
            s.production_per_kwp
        )?;
        writeln!(f)?;
        writeln!(f, "--- Consumption ---")?;
        writeln!(
            f,
            "Billed months:         {} ({}-{})",
            p.period.months, p.period.first_year, p.period.last_year
        )?;
        writeln!(f, "Mean consumption:      {:.2} kWh/month", p.mean_kwh)?;
        writeln!(
            f,
            "Range:                 {:.2} - {:.2} kWh/month",
            p.min_kwh, p.max_kwh
        )?;
        writeln!(f, "Std deviation:         {:.2} kWh", p.stddev_kwh)?;
        writeln!(f, "Pre-tax tariff:        {:.4} $/kWh", p.pretax_tariff)?;
        writeln!(f, "Full tariff:           {:.4} $/kWh", p.full_tariff)?;
        writeln!(f, "Stability:             {}", self.stability)?;
        writeln!(f, "Consumer class:        {}", self.consumer_class)?;
        writeln!(f)?;
        writeln!(f, "--- System ---")?;
        writeln!(f, "Full coverage size:    {:.3} kWp", s.full_coverage_kwp)?;
        writeln!(
            f,
            "Target size:           {:.3} kWp ({:.0}% coverage, loss factor {:.2})",
            s.target_kwp,
            s.coverage_target * 100.0,
            s.loss_factor
        )?;
        writeln!(
            f,
            "Monthly production:    {:.2} kWh",
            s.mean_monthly_production_kwh()
        )?;
        writeln!(f, "Investment:            {:.2} $", e.investment)?;
        writeln!(f, "Annual savings:        {:.2} $", e.annual_savings)?;
        match e.simple_payback_years {
            Some(years) => writeln!(f, "Simple payback:        {years:.1} years")?,
            None => writeln!(f, "Simple payback:        undefined")?,
        }
        writeln!(f)?;
        writeln!(f, "--- Cash Flow ---")?;
        writeln!(
            f,
            "Horizon:               {} years (lifetime {})",
            self.cashflow.len().saturating_sub(1),
            self.lifetime_years
        )?;
        writeln!(
            f,
            "Total net savings:     {:.2} $",
            self.cashflow.total_net_savings()
        )?;
        match self.cashflow.benefit_cost_ratio() {
            Some(ratio) => writeln!(f, "Benefit/cost ratio:    {ratio:.2}")?,
            None => writeln!(f, "Benefit/cost ratio:    undefined")?,
        }
        writeln!(f)?;
        write!(f, "{}", self.indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeasibilityConfig;

    #[test]
    fn demo_config_is_deterministic() {
        let cfg = FeasibilityConfig::demo();
        let a = run_feasibility(&cfg).unwrap();
        let b = run_feasibility(&cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn demo_report_is_consistent() {
        let report = run_feasibility(&FeasibilityConfig::demo()).unwrap();
        assert_eq!(report.profile.period.months, 12);
        assert_eq!(report.cashflow.len(), 26);
        assert_eq!(report.cashflow.values()[0], -report.economics.investment);
        assert_eq!(report.coverage.len(), 12);
        assert_eq!(
            report.sizing.target_kwp,
            report.sizing.full_coverage_kwp * 0.75
        );
        assert_eq!(report.consumer_class, ConsumerClass::Residential);
    }

    #[test]
    fn appliance_preset_runs() {
        let report = run_feasibility(&FeasibilityConfig::appliances()).unwrap();
        assert_eq!(report.profile.period.months, 12);
        assert_eq!(report.profile.stddev_kwh, 0.0);
        assert_eq!(report.stability, StabilityLabel::VeryStable);
    }

    #[test]
    fn invalid_config_is_reported_before_running() {
        let mut cfg = FeasibilityConfig::demo();
        cfg.sizing.losses_pct = 150.0;
        let err = run_feasibility(&cfg).unwrap_err();
        assert!(
            matches!(err, FeasibilityError::Config(ref msg) if msg.contains("sizing.losses_pct"))
        );
    }

    #[test]
    fn empty_table_stops_the_pipeline() {
        let history = BillingHistory::default();
        let irradiance = IrradianceProfile::from_monthly(4.5, [135.0; 12]).unwrap();
        let location = Location::new(-0.2, -78.5).unwrap();
        let settings = AnalysisSettings::from_config(&FeasibilityConfig::demo());
        let err = analyze(&history, irradiance, location, &settings).unwrap_err();
        assert!(matches!(err, FeasibilityError::EmptyHistory));
    }

    #[test]
    fn display_lists_key_figures() {
        let text = run_feasibility(&FeasibilityConfig::demo()).unwrap().to_string();
        for label in [
            "Mean consumption:",
            "Target size:",
            "Investment:",
            "NPV:",
            "IRR:",
            "Payback:",
        ] {
            assert!(text.contains(label), "missing {label} in report");
        }
    }
}
