//! Billing records, normalisation of raw billing cells, and CSV ingestion.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Serialize;

use crate::error::{FeasibilityError, Result};

/// Date layouts accepted for the billing date column.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Accepted header names per column: English first, then the utility export's.
const DATE_COLUMNS: &[&str] = &["date", "Fecha"];
const ENERGY_COLUMNS: &[&str] = &["energy_kwh", "Consumo subtotal"];
const PRETAX_COLUMNS: &[&str] = &["amount_pretax", "Monto"];
const TOTAL_COLUMNS: &[&str] = &["amount_total", "Total_pagar"];
const INVOICE_COLUMNS: &[&str] = &["invoice", "Factura"];

/// One monthly electricity bill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingRecord {
    /// Invoice identifier, if the source provides one.
    pub invoice: Option<String>,
    /// Issue date of the bill.
    pub date: NaiveDate,
    /// Billed consumption (kWh).
    pub energy_kwh: f64,
    /// Amount for the energy before taxes and municipal fees.
    pub amount_pretax: f64,
    /// Total amount paid, taxes included.
    pub amount_total: f64,
}

impl BillingRecord {
    /// Creates a record, enforcing `amount_total >= amount_pretax >= 0` and
    /// `energy_kwh >= 0`.
    ///
    /// `row` is the 1-based position used in error messages.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` when a value is non-finite or violates the
    /// ordering above.
    pub fn new(
        row: usize,
        invoice: Option<String>,
        date: NaiveDate,
        energy_kwh: f64,
        amount_pretax: f64,
        amount_total: f64,
    ) -> Result<Self> {
        for (name, v) in [
            ("energy_kwh", energy_kwh),
            ("amount_pretax", amount_pretax),
            ("amount_total", amount_total),
        ] {
            if !v.is_finite() {
                return Err(FeasibilityError::malformed(row, format!("{name} is not finite")));
            }
            if v < 0.0 {
                return Err(FeasibilityError::malformed(row, format!("{name} is negative")));
            }
        }
        if amount_total < amount_pretax {
            return Err(FeasibilityError::malformed(
                row,
                format!("amount_total ({amount_total}) is below amount_pretax ({amount_pretax})"),
            ));
        }
        Ok(Self {
            invoice,
            date,
            energy_kwh,
            amount_pretax,
            amount_total,
        })
    }

    /// Parses a record from raw text cells as typed or exported by a user.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` if any cell fails to parse.
    pub fn parse(
        row: usize,
        invoice: Option<&str>,
        date: &str,
        energy_kwh: &str,
        amount_pretax: &str,
        amount_total: &str,
    ) -> Result<Self> {
        let date = parse_date(date).ok_or_else(|| {
            FeasibilityError::malformed(row, format!("unrecognised date `{}`", date.trim()))
        })?;
        let energy = parse_number(energy_kwh).ok_or_else(|| {
            FeasibilityError::malformed(row, format!("invalid energy `{energy_kwh}`"))
        })?;
        let pretax = parse_money(amount_pretax).ok_or_else(|| {
            FeasibilityError::malformed(row, format!("invalid pre-tax amount `{amount_pretax}`"))
        })?;
        let total = parse_money(amount_total).ok_or_else(|| {
            FeasibilityError::malformed(row, format!("invalid total amount `{amount_total}`"))
        })?;
        let invoice = invoice
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self::new(row, invoice, date, energy, pretax, total)
    }

    /// Calendar year of the bill.
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Month of the bill, 1..=12.
    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// Billing records ordered by (year, month).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillingHistory {
    records: Vec<BillingRecord>,
}

impl BillingHistory {
    /// Wraps the records, sorting them by (year, month).
    ///
    /// The sort is stable: bills of the same month keep their input order.
    pub fn new(mut records: Vec<BillingRecord>) -> Self {
        records.sort_by_key(|r| (r.year(), r.month()));
        Self { records }
    }

    /// Reads a history from CSV with a header row.
    ///
    /// Required columns are the date, energy, pre-tax and total amounts;
    /// the invoice column is optional. Header names are trimmed before
    /// matching.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` for missing columns or unparseable cells
    /// and `Csv` for structural CSV errors.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let date_idx = column(&headers, DATE_COLUMNS)?;
        let energy_idx = column(&headers, ENERGY_COLUMNS)?;
        let pretax_idx = column(&headers, PRETAX_COLUMNS)?;
        let total_idx = column(&headers, TOTAL_COLUMNS)?;
        let invoice_idx = column(&headers, INVOICE_COLUMNS).ok();

        let mut records = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i + 1;
            let record = result?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            let cell = |idx: usize| record.get(idx).unwrap_or("");
            records.push(BillingRecord::parse(
                row,
                invoice_idx.map(cell),
                cell(date_idx),
                cell(energy_idx),
                cell(pretax_idx),
                cell(total_idx),
            )?);
        }
        Ok(Self::new(records))
    }

    /// Reads a history from a CSV file.
    ///
    /// # Errors
    ///
    /// See [`BillingHistory::from_csv_reader`]; I/O failures surface as `Io`.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn records(&self) -> &[BillingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn column(headers: &StringRecord, names: &[&str]) -> Result<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        .ok_or_else(|| FeasibilityError::malformed(0, format!("missing column `{}`", names[0])))
}

/// Parses a number after removing currency symbols, thousands separators and spaces.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a monetary amount and rounds it to cents.
pub fn parse_money(raw: &str) -> Option<f64> {
    parse_number(raw).map(|v| (v * 100.0).round() / 100.0)
}

/// Parses a billing date in any of the accepted layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}
