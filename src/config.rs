//! TOML-based run configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consumption::ClassificationBands;
use crate::consumption::appliances::{ApplianceUsage, UnitPrices};
use crate::engine::{DEFAULT_DEGRADATION, DEFAULT_TARIFF_ESCALATION};
use crate::irradiance::{LATITUDE_RANGE, LONGITUDE_RANGE, MONTHS};

/// Top-level run configuration parsed from TOML.
///
/// All sections have defaults matching the `demo` preset: a Quito household
/// with a year of bills and a fixed irradiance profile. Load from TOML with
/// [`FeasibilityConfig::from_toml_file`] or use [`FeasibilityConfig::demo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeasibilityConfig {
    /// Site coordinates.
    #[serde(default)]
    pub location: LocationConfig,
    /// Where the irradiance profile comes from.
    #[serde(default)]
    pub irradiance: IrradianceConfig,
    /// Where the billing history comes from.
    #[serde(default)]
    pub consumption: ConsumptionConfig,
    /// Coverage target and system losses.
    #[serde(default)]
    pub sizing: SizingConfig,
    /// Costs, horizon and financial assumptions.
    #[serde(default)]
    pub economics: EconomicsConfig,
    /// Band edges of the informational labels.
    #[serde(default)]
    pub classification: ClassificationBands,
}

impl Default for FeasibilityConfig {
    fn default() -> Self {
        Self::demo()
    }
}

/// Site coordinates (decimal degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        // Quito
        Self {
            latitude: -0.22985,
            longitude: -78.52495,
        }
    }
}

/// Irradiance source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrradianceSource {
    /// Sample one daily and twelve monthly `.asc` rasters.
    Raster,
    /// Use `daily_average` and `monthly_values` as given.
    Fixed,
}

/// Irradiance source parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IrradianceConfig {
    pub source: IrradianceSource,
    /// Daily-average GHI raster (`raster` source).
    pub daily_raster: Option<PathBuf>,
    /// Directory holding exactly twelve monthly `.asc` rasters (`raster` source).
    pub monthly_dir: Option<PathBuf>,
    /// Daily-average GHI in kWh/m²/day (`fixed` source).
    pub daily_average: f64,
    /// Monthly specific production in kWh/kWp, January first (`fixed` source).
    pub monthly_values: Vec<f64>,
}

impl Default for IrradianceConfig {
    fn default() -> Self {
        Self {
            source: IrradianceSource::Fixed,
            daily_raster: None,
            monthly_dir: None,
            daily_average: 4.6,
            monthly_values: vec![
                118.0, 108.0, 117.0, 110.0, 112.0, 110.0, 122.0, 125.0, 121.0, 119.0, 116.0, 117.0,
            ],
        }
    }
}

/// Billing source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumptionSource {
    /// Bills listed inline in `records`.
    Table,
    /// Bills read from `csv_path`.
    Csv,
    /// Twelve months synthesised from `appliances`.
    Appliances,
}

/// One bill as written in the `[[consumption.records]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BillingRow {
    #[serde(default)]
    pub invoice: Option<String>,
    pub date: String,
    pub energy_kwh: f64,
    pub amount_pretax: f64,
    pub amount_total: f64,
}

/// Billing source parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumptionConfig {
    pub source: ConsumptionSource,
    /// Billing export to read (`csv` source).
    pub csv_path: Option<PathBuf>,
    /// Inline bills (`table` source).
    pub records: Vec<BillingRow>,
    /// Selected appliances (`appliances` source).
    pub appliances: Vec<ApplianceUsage>,
    /// Pre-tax unit price, $/kWh (`appliances` source).
    pub pretax_price: f64,
    /// Tax-inclusive unit price, $/kWh (`appliances` source).
    pub full_price: f64,
    /// Year the synthesised bills are dated in (`appliances` source).
    pub year: i32,
}

impl Default for ConsumptionConfig {
    fn default() -> Self {
        const ENERGY: [f64; 12] = [
            82.0, 71.0, 73.0, 70.0, 67.0, 63.0, 77.0, 81.0, 64.0, 62.0, 65.0, 62.0,
        ];
        const PRETAX: [f64; 12] = [
            7.53, 6.5, 6.69, 6.41, 6.13, 5.75, 7.06, 7.43, 5.85, 5.67, 5.95, 5.67,
        ];
        const TOTAL: [f64; 12] = [
            8.66, 7.95, 8.08, 7.88, 7.69, 8.03, 8.82, 9.05, 8.08, 7.97, 8.14, 7.97,
        ];

        let records = (0..12)
            .map(|i| BillingRow {
                invoice: Some(format!("INV-2023-{:02}", i + 1)),
                date: format!("2023-{:02}-{}", i + 1, if i == 1 { 28 } else { 24 }),
                energy_kwh: ENERGY[i],
                amount_pretax: PRETAX[i],
                amount_total: TOTAL[i],
            })
            .collect();

        Self {
            source: ConsumptionSource::Table,
            csv_path: None,
            records,
            appliances: Vec::new(),
            pretax_price: 0.092,
            full_price: 0.117,
            year: 2024,
        }
    }
}

impl ConsumptionConfig {
    /// Unit prices used for appliance synthesis.
    pub fn unit_prices(&self) -> UnitPrices {
        UnitPrices {
            pretax: self.pretax_price,
            full: self.full_price,
        }
    }
}

/// Coverage target and losses, both in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingConfig {
    /// Share of mean consumption to offset (0-100).
    pub coverage_target_pct: f64,
    /// System losses (0-100); 20% gives a loss factor of 0.8.
    pub losses_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            coverage_target_pct: 75.0,
            losses_pct: 20.0,
        }
    }
}

impl SizingConfig {
    /// Coverage target as a fraction.
    pub fn coverage_target(&self) -> f64 {
        self.coverage_target_pct / 100.0
    }

    /// Derating multiplier, `1 - losses`.
    pub fn loss_factor(&self) -> f64 {
        1.0 - self.losses_pct / 100.0
    }
}

/// Economic assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EconomicsConfig {
    /// Installed cost per watt-peak ($/Wp).
    pub cost_per_wp: f64,
    /// Expected system lifetime (years).
    pub lifetime_years: u32,
    /// Financial horizon (years, at most the lifetime).
    pub horizon_years: u32,
    /// Yearly maintenance cost ($).
    pub maintenance_per_year: f64,
    pub discount_rate: f64,
    pub tariff_escalation: f64,
    pub degradation_per_year: f64,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            cost_per_wp: 1.20,
            lifetime_years: 25,
            horizon_years: 25,
            maintenance_per_year: 20.0,
            discount_rate: 0.08,
            tariff_escalation: DEFAULT_TARIFF_ESCALATION,
            degradation_per_year: DEFAULT_DEGRADATION,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"sizing.losses_pct"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl FeasibilityConfig {
    /// Quito household, twelve inline bills from 2023, fixed irradiance.
    pub fn demo() -> Self {
        Self {
            location: LocationConfig::default(),
            irradiance: IrradianceConfig::default(),
            consumption: ConsumptionConfig::default(),
            sizing: SizingConfig::default(),
            economics: EconomicsConfig::default(),
            classification: ClassificationBands::default(),
        }
    }

    /// Same site, consumption synthesised from a typical appliance set.
    pub fn appliances() -> Self {
        let usage = |name: &str, quantity, hours_per_day| ApplianceUsage {
            name: name.to_string(),
            quantity,
            hours_per_day,
        };
        Self {
            consumption: ConsumptionConfig {
                source: ConsumptionSource::Appliances,
                records: Vec::new(),
                appliances: vec![
                    usage("LED bulb", 6, 5.0),
                    usage("Refrigerator", 1, 10.0),
                    usage("LED TV", 1, 4.0),
                    usage("Phone charger", 3, 2.0),
                    usage("Laptop", 1, 3.0),
                    usage("Washing machine", 1, 0.5),
                    usage("Internet modem", 1, 24.0),
                ],
                ..ConsumptionConfig::default()
            },
            ..Self::demo()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "appliances"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "appliances" => Ok(Self::appliances()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let loc = &self.location;
        let (lat_min, lat_max) = LATITUDE_RANGE;
        if !(lat_min..=lat_max).contains(&loc.latitude) {
            errors.push(ConfigError::new(
                "location.latitude",
                format!("must be in [{lat_min}, {lat_max}]"),
            ));
        }
        let (lon_min, lon_max) = LONGITUDE_RANGE;
        if !(lon_min..=lon_max).contains(&loc.longitude) {
            errors.push(ConfigError::new(
                "location.longitude",
                format!("must be in [{lon_min}, {lon_max}]"),
            ));
        }

        let irr = &self.irradiance;
        match irr.source {
            IrradianceSource::Raster => {
                if irr.daily_raster.is_none() {
                    errors.push(ConfigError::new(
                        "irradiance.daily_raster",
                        "required when source = \"raster\"",
                    ));
                }
                if irr.monthly_dir.is_none() {
                    errors.push(ConfigError::new(
                        "irradiance.monthly_dir",
                        "required when source = \"raster\"",
                    ));
                }
            }
            IrradianceSource::Fixed => {
                if !(irr.daily_average.is_finite() && irr.daily_average > 0.0) {
                    errors.push(ConfigError::new("irradiance.daily_average", "must be > 0"));
                }
                if irr.monthly_values.len() != MONTHS {
                    errors.push(ConfigError::new(
                        "irradiance.monthly_values",
                        format!("must hold {MONTHS} values, got {}", irr.monthly_values.len()),
                    ));
                } else if irr.monthly_values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    errors.push(ConfigError::new(
                        "irradiance.monthly_values",
                        "must be finite and >= 0",
                    ));
                }
            }
        }

        let c = &self.consumption;
        match c.source {
            ConsumptionSource::Csv => {
                if c.csv_path.is_none() {
                    errors.push(ConfigError::new(
                        "consumption.csv_path",
                        "required when source = \"csv\"",
                    ));
                }
            }
            ConsumptionSource::Table => {
                if c.records.is_empty() {
                    errors.push(ConfigError::new(
                        "consumption.records",
                        "must not be empty when source = \"table\"",
                    ));
                }
            }
            ConsumptionSource::Appliances => {
                if c.appliances.is_empty() {
                    errors.push(ConfigError::new(
                        "consumption.appliances",
                        "must not be empty when source = \"appliances\"",
                    ));
                }
                if !(c.pretax_price.is_finite() && c.pretax_price >= 0.0) {
                    errors.push(ConfigError::new("consumption.pretax_price", "must be >= 0"));
                }
                if !(c.full_price.is_finite() && c.full_price >= c.pretax_price) {
                    errors.push(ConfigError::new(
                        "consumption.full_price",
                        "must be >= consumption.pretax_price",
                    ));
                }
            }
        }

        let s = &self.sizing;
        if !(0.0..=100.0).contains(&s.coverage_target_pct) {
            errors.push(ConfigError::new(
                "sizing.coverage_target_pct",
                "must be in [0, 100]",
            ));
        }
        if !(0.0..100.0).contains(&s.losses_pct) {
            errors.push(ConfigError::new("sizing.losses_pct", "must be in [0, 100)"));
        }

        let e = &self.economics;
        if !(e.cost_per_wp.is_finite() && e.cost_per_wp > 0.0) {
            errors.push(ConfigError::new("economics.cost_per_wp", "must be > 0"));
        }
        if e.lifetime_years == 0 {
            errors.push(ConfigError::new("economics.lifetime_years", "must be > 0"));
        }
        if e.horizon_years == 0 {
            errors.push(ConfigError::new("economics.horizon_years", "must be > 0"));
        } else if e.horizon_years > e.lifetime_years {
            errors.push(ConfigError::new(
                "economics.horizon_years",
                "must be <= economics.lifetime_years",
            ));
        }
        if !(e.maintenance_per_year.is_finite() && e.maintenance_per_year >= 0.0) {
            errors.push(ConfigError::new(
                "economics.maintenance_per_year",
                "must be >= 0",
            ));
        }
        if !(e.discount_rate.is_finite() && e.discount_rate > -1.0) {
            errors.push(ConfigError::new("economics.discount_rate", "must be > -1"));
        }
        if !(e.tariff_escalation.is_finite() && e.tariff_escalation > -1.0) {
            errors.push(ConfigError::new(
                "economics.tariff_escalation",
                "must be > -1",
            ));
        }
        if !(0.0..1.0).contains(&e.degradation_per_year) {
            errors.push(ConfigError::new(
                "economics.degradation_per_year",
                "must be in [0, 1)",
            ));
        }

        if !self.classification.is_ascending() {
            errors.push(ConfigError::new(
                "classification",
                "band edges must be finite and strictly increasing",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_preset_valid() {
        let cfg = FeasibilityConfig::demo();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "demo should be valid: {errors:?}");
    }

    #[test]
    fn all_presets_are_valid() {
        for name in FeasibilityConfig::PRESETS {
            let cfg = FeasibilityConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
        }
    }

    #[test]
    fn from_preset_unknown() {
        let err = FeasibilityConfig::from_preset("nonexistent").unwrap_err();
        assert_eq!(err.field, "preset");
        assert!(err.message.contains("unknown preset"));
    }

    #[test]
    fn demo_table_matches_the_2023_bills() {
        let c = ConsumptionConfig::default();
        assert_eq!(c.records.len(), 12);
        assert_eq!(c.records[0].energy_kwh, 82.0);
        assert_eq!(c.records[1].date, "2023-02-28");
        assert_eq!(c.records[11].amount_total, 7.97);
    }

    #[test]
    fn percentages_convert_to_fractions() {
        let s = SizingConfig::default();
        assert_eq!(s.coverage_target(), 0.75);
        assert!((s.loss_factor() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[location]
latitude = -2.17
longitude = -79.92

[irradiance]
source = "raster"
daily_raster = "data/rasters/ghi_daily.asc"
monthly_dir = "data/rasters/monthly"

[consumption]
source = "csv"
csv_path = "data/billing_2023.csv"

[sizing]
coverage_target_pct = 50
losses_pct = 15

[economics]
cost_per_wp = 1.1
horizon_years = 20
discount_rate = 0.1

[classification]
consumer_kwh = [40.0, 100.0, 700.0, 4000.0]
"#;
        let cfg = FeasibilityConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.as_ref().err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.irradiance.source, IrradianceSource::Raster);
        assert_eq!(cfg.consumption.source, ConsumptionSource::Csv);
        assert_eq!(cfg.sizing.coverage_target_pct, 50.0);
        assert_eq!(cfg.economics.horizon_years, 20);
        // untouched keys keep their defaults
        assert_eq!(cfg.economics.lifetime_years, 25);
        assert_eq!(cfg.classification.stability, [0.10, 0.20, 0.30]);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn inline_records_parse() {
        let toml = r#"
[consumption]
source = "table"

[[consumption.records]]
date = "2023-01-24"
energy_kwh = 80
amount_pretax = 7.5
amount_total = 8.6

[[consumption.records]]
invoice = "A-2"
date = "24.02.2023"
energy_kwh = 70
amount_pretax = 6.5
amount_total = 7.9
"#;
        let cfg = FeasibilityConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.consumption.records.len(), 2);
        assert_eq!(cfg.consumption.records[1].invoice.as_deref(), Some("A-2"));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[sizing]
coverage_target_pct = 75
bogus_field = true
"#;
        assert!(FeasibilityConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_source_is_rejected() {
        let toml = r#"
[irradiance]
source = "satellite"
"#;
        assert!(FeasibilityConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[sizing]
losses_pct = 10
"#;
        let cfg = FeasibilityConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.sizing.losses_pct, 10.0);
        assert_eq!(cfg.sizing.coverage_target_pct, 75.0);
        assert_eq!(cfg.location, LocationConfig::default());
        assert_eq!(cfg.consumption.records.len(), 12);
    }

    #[test]
    fn validation_catches_missing_raster_paths() {
        let mut cfg = FeasibilityConfig::demo();
        cfg.irradiance.source = IrradianceSource::Raster;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "irradiance.daily_raster"));
        assert!(errors.iter().any(|e| e.field == "irradiance.monthly_dir"));
    }

    #[test]
    fn validation_catches_short_monthly_values() {
        let mut cfg = FeasibilityConfig::demo();
        cfg.irradiance.monthly_values.truncate(11);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "irradiance.monthly_values"));
    }

    #[test]
    fn validation_catches_out_of_range_percentages() {
        let mut cfg = FeasibilityConfig::demo();
        cfg.sizing.coverage_target_pct = 120.0;
        cfg.sizing.losses_pct = 100.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "sizing.coverage_target_pct"));
        assert!(errors.iter().any(|e| e.field == "sizing.losses_pct"));
    }

    #[test]
    fn validation_catches_horizon_beyond_lifetime() {
        let mut cfg = FeasibilityConfig::demo();
        cfg.economics.horizon_years = 30;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "economics.horizon_years"));
    }

    #[test]
    fn validation_catches_location_outside_region() {
        let mut cfg = FeasibilityConfig::demo();
        cfg.location.latitude = 40.4;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "location.latitude"));
    }

    #[test]
    fn validation_catches_unordered_bands() {
        let mut cfg = FeasibilityConfig::demo();
        cfg.classification.consumer_kwh = [100.0, 50.0, 800.0, 5000.0];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "classification"));
    }

    #[test]
    fn appliances_preset_uses_appliance_source() {
        let cfg = FeasibilityConfig::appliances();
        assert_eq!(cfg.consumption.source, ConsumptionSource::Appliances);
        assert!(!cfg.consumption.appliances.is_empty());
    }
}
