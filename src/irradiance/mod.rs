//! Point lookup of daily and monthly irradiance from raster datasets.

/// Raster sources (in-memory and file-backed ESRI ASCII grids).
pub mod raster;

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{FeasibilityError, Result};

pub use raster::{AscRasterFile, GridGeometry, GridRaster, RasterSource};

/// Number of calendar months in every monthly series.
pub const MONTHS: usize = 12;

/// Valid latitude range for the deployment region (degrees).
pub const LATITUDE_RANGE: (f64, f64) = (-5.0, 5.0);
/// Valid longitude range for the deployment region (degrees).
pub const LONGITUDE_RANGE: (f64, f64) = (-100.0, 100.0);

/// A validated geographic point used as the raster sampling key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Creates a location, checking that both coordinates are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLocation` for non-finite or out-of-range coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use pv_feasibility::irradiance::Location;
    ///
    /// assert!(Location::new(-0.22985, -78.52495).is_ok());
    /// assert!(Location::new(12.0, -78.5).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let invalid = |reason: &str| FeasibilityError::InvalidLocation {
            latitude,
            longitude,
            reason: reason.to_string(),
        };
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(invalid("coordinates must be finite"));
        }
        let (lat_min, lat_max) = LATITUDE_RANGE;
        if !(lat_min..=lat_max).contains(&latitude) {
            return Err(invalid("latitude must be in [-5, 5]"));
        }
        let (lon_min, lon_max) = LONGITUDE_RANGE;
        if !(lon_min..=lon_max).contains(&longitude) {
            return Err(invalid("longitude must be in [-100, 100]"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Irradiance figures for one location.
///
/// `monthly_values` are specific PV output per month (kWh per installed kWp),
/// January first. `monthly_factors` are those values divided by their mean, so
/// the factors always average to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrradianceProfile {
    /// Daily-average global horizontal irradiance (kWh/m²/day).
    pub daily_average: f64,
    /// Monthly specific production (kWh/kWp per month), January..December.
    pub monthly_values: [f64; MONTHS],
    /// Ratio of each month's value to the annual mean.
    pub monthly_factors: [f64; MONTHS],
}

impl IrradianceProfile {
    /// Builds a profile from a daily average and twelve monthly values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for non-finite inputs and `DivisionByZero`
    /// when the monthly mean is not positive.
    pub fn from_monthly(daily_average: f64, monthly_values: [f64; MONTHS]) -> Result<Self> {
        if !daily_average.is_finite() {
            return Err(FeasibilityError::invalid_parameter(
                "daily_average",
                daily_average,
                "must be finite",
            ));
        }
        if let Some(bad) = monthly_values.iter().find(|v| !v.is_finite()) {
            return Err(FeasibilityError::invalid_parameter(
                "monthly_values",
                *bad,
                "must be finite",
            ));
        }

        let annual_mean = monthly_values.iter().sum::<f64>() / MONTHS as f64;
        if annual_mean <= 0.0 {
            return Err(FeasibilityError::DivisionByZero(
                "annual mean of monthly irradiance is not positive",
            ));
        }
        let monthly_factors = monthly_values.map(|v| v / annual_mean);

        Ok(Self {
            daily_average,
            monthly_values,
            monthly_factors,
        })
    }

    /// Mean of the twelve monthly values (kWh/kWp per month).
    pub fn annual_mean(&self) -> f64 {
        self.monthly_values.iter().sum::<f64>() / MONTHS as f64
    }
}

/// One daily raster plus twelve monthly rasters covering the same region.
pub struct IrradianceLookup<R: RasterSource> {
    daily: R,
    monthly: Vec<R>,
}

impl<R: RasterSource> IrradianceLookup<R> {
    /// Creates a lookup from a daily raster and the monthly rasters, January first.
    ///
    /// # Errors
    ///
    /// Returns `Dataset` unless exactly twelve monthly rasters are given.
    pub fn new(daily: R, monthly: Vec<R>) -> Result<Self> {
        if monthly.len() != MONTHS {
            return Err(FeasibilityError::Dataset(format!(
                "expected {MONTHS} monthly rasters, got {}",
                monthly.len()
            )));
        }
        Ok(Self { daily, monthly })
    }

    /// Samples all rasters at `location` and derives the monthly factors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLocation` when the point is outside any raster or any
    /// sample is non-finite (including NODATA cells), and `DivisionByZero`
    /// when the monthly mean is not positive.
    pub fn lookup(&self, location: &Location) -> Result<IrradianceProfile> {
        let daily_average = finite_sample(&self.daily, location, "daily")?;

        let mut monthly_values = [0.0; MONTHS];
        for (slot, raster) in monthly_values.iter_mut().zip(&self.monthly) {
            *slot = finite_sample(raster, location, "monthly")?;
        }

        let profile = IrradianceProfile::from_monthly(daily_average, monthly_values)?;
        debug!(
            latitude = location.latitude,
            longitude = location.longitude,
            daily_average,
            annual_mean = profile.annual_mean(),
            "irradiance sampled"
        );
        Ok(profile)
    }
}

impl IrradianceLookup<AscRasterFile> {
    /// Opens the daily raster at `daily` and the twelve `.asc` files in
    /// `monthly_dir`, ordered by file name.
    ///
    /// # Errors
    ///
    /// Returns `Dataset` if a raster cannot be opened or the directory does
    /// not hold exactly twelve `.asc` files.
    pub fn from_paths(daily: &Path, monthly_dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(monthly_dir).map_err(|e| {
            FeasibilityError::Dataset(format!("cannot list \"{}\": {e}", monthly_dir.display()))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_asc = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("asc"));
            if is_asc {
                paths.push(path);
            }
        }
        paths.sort();

        let daily = AscRasterFile::open(daily)?;
        let monthly = paths
            .iter()
            .map(|p| AscRasterFile::open(p))
            .collect::<Result<Vec<_>>>()?;
        Self::new(daily, monthly)
    }
}

fn finite_sample<R: RasterSource>(raster: &R, location: &Location, which: &str) -> Result<f64> {
    let value = raster.sample(location)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FeasibilityError::InvalidLocation {
            latitude: location.latitude,
            longitude: location.longitude,
            reason: format!("{which} irradiance sample is not finite"),
        })
    }
}
