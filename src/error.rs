//! Typed failures of the feasibility engine.

use thiserror::Error;

/// Every way a feasibility computation can fail.
///
/// Engine failures are terminal for the computation that raised them: callers
/// receive the error and decide how to present it, nothing is replaced by a
/// default value.
#[derive(Debug, Error)]
pub enum FeasibilityError {
    /// Coordinates outside the valid range or the raster extent, or a
    /// non-finite / NODATA raster sample.
    #[error("invalid location ({latitude}, {longitude}): {reason}")]
    InvalidLocation {
        latitude: f64,
        longitude: f64,
        reason: String,
    },

    /// The billing history contains no records.
    #[error("billing history is empty")]
    EmptyHistory,

    /// A billing row is missing a required field or cannot be parsed.
    #[error("malformed billing record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    /// A ratio whose denominator is zero (mean consumption, production potential).
    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),

    /// An input parameter outside its accepted range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The cash-flow series contains NaN or infinite entries.
    #[error("cash-flow series contains non-finite values")]
    InvalidCashFlow,

    /// No discount rate zeroes the NPV of the series.
    #[error("IRR has no real root in the search interval")]
    NoRealRoot,

    /// A raster dataset could not be opened or parsed.
    #[error("raster dataset error: {0}")]
    Dataset(String),

    /// The run configuration failed validation or names no usable source.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FeasibilityError>;

impl FeasibilityError {
    pub(crate) fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            row,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_parameter() {
        let err = FeasibilityError::invalid_parameter("loss_factor", 1.5, "must be in (0, 1]");
        let s = err.to_string();
        assert!(s.contains("loss_factor"));
        assert!(s.contains("1.5"));
    }

    #[test]
    fn display_reports_row_of_malformed_record() {
        let err = FeasibilityError::malformed(3, "missing column `date`");
        assert_eq!(
            err.to_string(),
            "malformed billing record at row 3: missing column `date`"
        );
    }
}
