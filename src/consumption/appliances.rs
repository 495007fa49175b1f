//! Billing history synthesised from household appliances and usage hours.
//!
//! Used when no bills are available: the user picks appliances from a fixed
//! catalogue, gives a quantity and daily hours of use, and the unit prices
//! printed on a bill.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DAYS_PER_MONTH;
use crate::error::{FeasibilityError, Result};

use super::billing::{BillingHistory, BillingRecord};

/// A catalogued appliance with its nominal power draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appliance {
    pub name: &'static str,
    pub watts: f64,
}

impl Appliance {
    const fn new(name: &'static str, watts: f64) -> Self {
        Self { name, watts }
    }
}

/// Common household appliances and their typical power (W).
pub const CATALOG: &[Appliance] = &[
    Appliance::new("LED bulb", 10.0),
    Appliance::new("LED TV", 80.0),
    Appliance::new("Refrigerator", 150.0),
    Appliance::new("Fan", 50.0),
    Appliance::new("Phone charger", 5.0),
    Appliance::new("Laptop", 65.0),
    Appliance::new("Desktop computer", 200.0),
    Appliance::new("Microwave", 1200.0),
    Appliance::new("Blender", 400.0),
    Appliance::new("Clothes iron", 1200.0),
    Appliance::new("Washing machine", 500.0),
    Appliance::new("Washing machine (heated)", 2000.0),
    Appliance::new("Clothes dryer", 3000.0),
    Appliance::new("Electric kettle", 1800.0),
    Appliance::new("Coffee maker", 900.0),
    Appliance::new("Vacuum cleaner", 1400.0),
    Appliance::new("Toaster", 800.0),
    Appliance::new("Electric stove (1 burner)", 1200.0),
    Appliance::new("Electric stove (4 burners)", 4000.0),
    Appliance::new("Electric shower", 3500.0),
    Appliance::new("Space heater", 1500.0),
    Appliance::new("Air conditioner (small)", 900.0),
    Appliance::new("Air conditioner (large)", 1800.0),
    Appliance::new("Freezer", 200.0),
    Appliance::new("Internet modem", 10.0),
    Appliance::new("Printer", 60.0),
];

/// Looks up a catalogue entry by name, ignoring ASCII case.
pub fn find(name: &str) -> Option<&'static Appliance> {
    CATALOG.iter().find(|a| a.name.eq_ignore_ascii_case(name.trim()))
}

/// One selected appliance and how it is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceUsage {
    /// Catalogue name.
    pub name: String,
    /// Number of identical units (must be >= 1).
    pub quantity: u32,
    /// Hours of use per day (0-24).
    pub hours_per_day: f64,
}

/// Electricity unit prices ($/kWh) as printed on a bill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitPrices {
    pub pretax: f64,
    pub full: f64,
}

impl ApplianceUsage {
    /// Daily energy of this entry (kWh).
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for unknown names, zero quantity, or hours
    /// outside [0, 24].
    pub fn daily_kwh(&self) -> Result<f64> {
        let appliance = find(&self.name).ok_or_else(|| {
            FeasibilityError::invalid_parameter("appliance", f64::NAN, "unknown appliance name")
        })?;
        if self.quantity == 0 {
            return Err(FeasibilityError::invalid_parameter(
                "quantity",
                0.0,
                "must be >= 1",
            ));
        }
        if !(0.0..=24.0).contains(&self.hours_per_day) {
            return Err(FeasibilityError::invalid_parameter(
                "hours_per_day",
                self.hours_per_day,
                "must be in [0, 24]",
            ));
        }
        Ok(appliance.watts * self.hours_per_day * f64::from(self.quantity) / 1000.0)
    }
}

/// Total daily energy of all selected appliances (kWh).
///
/// # Errors
///
/// Propagates the first invalid entry.
pub fn daily_energy_kwh(usages: &[ApplianceUsage]) -> Result<f64> {
    usages.iter().map(ApplianceUsage::daily_kwh).sum()
}

/// Builds a twelve-month history for `year` from appliance usage.
///
/// Every month bills `daily * 30` kWh at the given unit prices and is dated on
/// the first of the month.
///
/// # Errors
///
/// Returns `EmptyHistory` when no appliance is selected and
/// `InvalidParameter` for invalid entries, prices, or year.
pub fn synthesize_history(
    usages: &[ApplianceUsage],
    prices: UnitPrices,
    year: i32,
) -> Result<BillingHistory> {
    if usages.is_empty() {
        return Err(FeasibilityError::EmptyHistory);
    }
    if !(prices.pretax.is_finite() && prices.pretax >= 0.0) {
        return Err(FeasibilityError::invalid_parameter(
            "pretax_price",
            prices.pretax,
            "must be finite and >= 0",
        ));
    }
    if !(prices.full.is_finite() && prices.full >= prices.pretax) {
        return Err(FeasibilityError::invalid_parameter(
            "full_price",
            prices.full,
            "must be finite and >= pretax_price",
        ));
    }

    let daily = daily_energy_kwh(usages)?;
    let monthly = daily * DAYS_PER_MONTH;
    debug!(daily_kwh = daily, monthly_kwh = monthly, "synthesised appliance load");

    let mut records = Vec::with_capacity(12);
    for month in 1..=12 {
        let date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            FeasibilityError::invalid_parameter("year", f64::from(year), "not a representable year")
        })?;
        records.push(BillingRecord::new(
            month as usize,
            None,
            date,
            monthly,
            monthly * prices.pretax,
            monthly * prices.full,
        )?);
    }
    Ok(BillingHistory::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(name: &str, quantity: u32, hours_per_day: f64) -> ApplianceUsage {
        ApplianceUsage {
            name: name.to_string(),
            quantity,
            hours_per_day,
        }
    }

    const PRICES: UnitPrices = UnitPrices {
        pretax: 0.092,
        full: 0.117,
    };

    #[test]
    fn catalog_lookup_ignores_case() {
        assert_eq!(find("refrigerator").map(|a| a.watts), Some(150.0));
        assert!(find("Flux capacitor").is_none());
    }

    #[test]
    fn daily_energy_sums_entries() {
        // 4 bulbs x 10 W x 5 h = 0.2 kWh; fridge 150 W x 24 h = 3.6 kWh
        let usages = vec![usage("LED bulb", 4, 5.0), usage("Refrigerator", 1, 24.0)];
        let daily = daily_energy_kwh(&usages).unwrap();
        assert!((daily - 3.8).abs() < 1e-12);
    }

    #[test]
    fn synthesised_history_has_twelve_priced_months() {
        let usages = vec![usage("Refrigerator", 1, 24.0)];
        let history = synthesize_history(&usages, PRICES, 2024).unwrap();
        assert_eq!(history.len(), 12);
        let first = &history.records()[0];
        assert_eq!(first.month(), 1);
        assert!((first.energy_kwh - 108.0).abs() < 1e-9);
        assert!((first.amount_pretax - 108.0 * 0.092).abs() < 1e-9);
        assert!((first.amount_total - 108.0 * 0.117).abs() < 1e-9);
        assert_eq!(history.records()[11].month(), 12);
    }

    #[test]
    fn invalid_entries_are_rejected() {
        assert!(usage("Unknown gadget", 1, 1.0).daily_kwh().is_err());
        assert!(usage("Fan", 0, 1.0).daily_kwh().is_err());
        assert!(usage("Fan", 1, 25.0).daily_kwh().is_err());
    }

    #[test]
    fn empty_selection_is_empty_history() {
        let err = synthesize_history(&[], PRICES, 2024).unwrap_err();
        assert!(matches!(err, FeasibilityError::EmptyHistory));
    }

    #[test]
    fn full_price_below_pretax_is_rejected() {
        let prices = UnitPrices {
            pretax: 0.2,
            full: 0.1,
        };
        let err = synthesize_history(&[usage("Fan", 1, 1.0)], prices, 2024).unwrap_err();
        assert!(matches!(
            err,
            FeasibilityError::InvalidParameter {
                name: "full_price",
                ..
            }
        ));
    }
}
