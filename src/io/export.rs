//! CSV export for the yearly cash flow and the monthly production profile.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::engine::{CashFlowSeries, SizingResult};
use crate::irradiance::IrradianceProfile;

/// Column header of the cash-flow export.
const CASHFLOW_HEADER: &str = "year,production_kwh,tariff,revenue,maintenance,net,cumulative";

/// Column header of the monthly export.
const MONTHLY_HEADER: &str = "month,irradiance_kwh_per_kwp,factor,expected_production_kwh";

/// Exports the cash flow to a CSV file at the given path.
///
/// Row 0 holds the investment; rows 1..=horizon the projected years.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_cashflow_csv(cashflow: &CashFlowSeries, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_cashflow_csv(cashflow, io::BufWriter::new(file))
}

/// Writes the cash flow as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_cashflow_csv(cashflow: &CashFlowSeries, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(CASHFLOW_HEADER.split(','))?;

    let cumulative = cashflow.cumulative();
    if let (Some(first), Some(cum)) = (cashflow.values().first(), cumulative.first()) {
        wtr.write_record(&[
            "0".to_string(),
            "0.00".to_string(),
            String::new(),
            "0.00".to_string(),
            "0.00".to_string(),
            format!("{first:.2}"),
            format!("{cum:.2}"),
        ])?;
    }
    for (y, cum) in cashflow.years().iter().zip(cumulative.iter().skip(1)) {
        wtr.write_record(&[
            y.year.to_string(),
            format!("{:.2}", y.production_kwh),
            format!("{:.4}", y.tariff),
            format!("{:.2}", y.revenue),
            format!("{:.2}", y.maintenance),
            format!("{:.2}", y.net),
            format!("{cum:.2}"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports the monthly production profile to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_monthly_csv(
    irradiance: &IrradianceProfile,
    sizing: &SizingResult,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    write_monthly_csv(irradiance, sizing, io::BufWriter::new(file))
}

/// Writes one row per calendar month, January first.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_monthly_csv(
    irradiance: &IrradianceProfile,
    sizing: &SizingResult,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(MONTHLY_HEADER.split(','))?;

    for (m, ((value, factor), production)) in irradiance
        .monthly_values
        .iter()
        .zip(&irradiance.monthly_factors)
        .zip(&sizing.expected_monthly_production_kwh)
        .enumerate()
    {
        wtr.write_record(&[
            (m + 1).to_string(),
            format!("{value:.2}"),
            format!("{factor:.4}"),
            format!("{production:.2}"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ProjectionParams, project};

    fn sizing(irr: &IrradianceProfile) -> SizingResult {
        SizingResult {
            full_coverage_kwp: 1.0,
            target_kwp: 0.5,
            coverage_target: 0.5,
            loss_factor: 0.8,
            production_per_kwp: 100.0,
            expected_monthly_production_kwh: irr.monthly_values.map(|v| 0.5 * v),
            monthly_production_base_kwh: 100.0,
            monthly_factors: irr.monthly_factors,
        }
    }

    fn irradiance() -> IrradianceProfile {
        let mut monthly = [120.0; 12];
        monthly[0] = 132.0;
        monthly[6] = 108.0;
        IrradianceProfile::from_monthly(4.4, monthly).unwrap()
    }

    fn cashflow(horizon_years: u32) -> CashFlowSeries {
        let irr = irradiance();
        project(
            &sizing(&irr),
            &ProjectionParams {
                tariff: 0.12,
                horizon_years,
                maintenance_per_year: 20.0,
                tariff_escalation: 0.02,
                degradation_per_year: 0.005,
                initial_investment: 600.0,
            },
        )
        .unwrap()
    }

    fn to_string(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn cashflow_header_and_row_count() {
        let mut buf = Vec::new();
        write_cashflow_csv(&cashflow(10), &mut buf).unwrap();
        let text = to_string(buf);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CASHFLOW_HEADER);
        // header + year 0 + 10 projected years
        assert_eq!(lines.len(), 12);
        assert!(lines[1].starts_with("0,"));
        assert!(lines[1].ends_with("-600.00,-600.00"));
    }

    #[test]
    fn cumulative_column_ends_at_series_total() {
        let cf = cashflow(5);
        let mut buf = Vec::new();
        write_cashflow_csv(&cf, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let last = rdr.records().filter_map(|r| r.ok()).last().unwrap();
        let cum: f64 = last[6].parse().unwrap();
        let expected: f64 = cf.values().iter().sum();
        assert!((cum - expected).abs() < 0.01);
    }

    #[test]
    fn monthly_export_has_twelve_rows() {
        let irr = irradiance();
        let mut buf = Vec::new();
        write_monthly_csv(&irr, &sizing(&irr), &mut buf).unwrap();
        let text = to_string(buf);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], MONTHLY_HEADER);
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[1], "1,132.00,1.1000,66.00");
    }

    #[test]
    fn deterministic_output() {
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_cashflow_csv(&cashflow(25), &mut buf1).unwrap();
        write_cashflow_csv(&cashflow(25), &mut buf2).unwrap();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn export_writes_file() {
        let path = std::env::temp_dir().join(format!("pv_cashflow_{}.csv", std::process::id()));
        export_cashflow_csv(&cashflow(3), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text.lines().count(), 5);
    }
}
