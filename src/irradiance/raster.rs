//! Single-band raster access for irradiance datasets.
//!
//! Rasters are ESRI ASCII grids: a short `key value` header followed by the
//! cell values, one row per line from north to south. Coordinates are
//! geographic degrees (longitude on x, latitude on y).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{FeasibilityError, Result};

use super::Location;

/// Upper bound on cells reserved up front; larger grids grow as they are read.
const MAX_PREALLOCATED_CELLS: usize = 1 << 20;

/// A georeferenced single-band raster that can be sampled at a point.
///
/// Out-of-extent points are an `InvalidLocation` error. NODATA cells sample
/// as `NaN` so callers can reject them alongside other non-finite values.
pub trait RasterSource {
    /// Returns the cell value covering `location`.
    fn sample(&self, location: &Location) -> Result<f64>;
}

/// Extent and cell layout shared by every raster representation.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    pub ncols: usize,
    pub nrows: usize,
    /// West edge (degrees longitude).
    pub x_min: f64,
    /// North edge (degrees latitude).
    pub y_max: f64,
    /// Square cell edge length (degrees).
    pub cellsize: f64,
    pub nodata: Option<f64>,
}

impl GridGeometry {
    /// Row-major index of the cell covering `location`, or `None` outside the extent.
    ///
    /// The extent is half-open: the west and north edges belong to the grid,
    /// the east and south edges do not.
    pub fn cell_index(&self, location: &Location) -> Option<usize> {
        let col = ((location.longitude - self.x_min) / self.cellsize).floor();
        let row = ((self.y_max - location.latitude) / self.cellsize).floor();
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.ncols || row >= self.nrows {
            return None;
        }
        Some(row * self.ncols + col)
    }

    fn cell_count(&self) -> Result<usize> {
        self.ncols.checked_mul(self.nrows).ok_or_else(|| {
            FeasibilityError::Dataset(format!(
                "raster of {} x {} cells is too large",
                self.ncols, self.nrows
            ))
        })
    }

    fn decode(&self, raw: f64) -> f64 {
        match self.nodata {
            Some(nodata) if raw == nodata => f64::NAN,
            _ => raw,
        }
    }
}

fn out_of_extent(location: &Location) -> FeasibilityError {
    FeasibilityError::InvalidLocation {
        latitude: location.latitude,
        longitude: location.longitude,
        reason: "outside raster extent".to_string(),
    }
}

/// Fully loaded raster held in memory.
#[derive(Debug, Clone)]
pub struct GridRaster {
    geometry: GridGeometry,
    values: Vec<f64>,
}

impl GridRaster {
    /// Builds a raster from a geometry and row-major values (north row first).
    ///
    /// # Errors
    ///
    /// Returns `Dataset` if the value count does not match the geometry or the
    /// cell size is not positive.
    pub fn new(geometry: GridGeometry, values: Vec<f64>) -> Result<Self> {
        validate_geometry(&geometry)?;
        let expected = geometry.cell_count()?;
        if values.len() != expected {
            return Err(FeasibilityError::Dataset(format!(
                "expected {expected} cells, got {}",
                values.len()
            )));
        }
        Ok(Self { geometry, values })
    }

    /// Parses an ESRI ASCII grid from any buffered reader.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let (geometry, first_row) = read_header(&mut reader)?;
        let capacity = geometry.cell_count()?.min(MAX_PREALLOCATED_CELLS);
        let mut values = Vec::with_capacity(capacity);
        push_values(&first_row, &mut values)?;
        for line in reader.lines() {
            push_values(&line?, &mut values)?;
        }
        Self::new(geometry, values)
    }

    /// Parses an ESRI ASCII grid held in a string.
    pub fn from_asc_str(s: &str) -> Result<Self> {
        Self::from_reader(s.as_bytes())
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }
}

impl RasterSource for GridRaster {
    fn sample(&self, location: &Location) -> Result<f64> {
        let idx = self
            .geometry
            .cell_index(location)
            .ok_or_else(|| out_of_extent(location))?;
        Ok(self.geometry.decode(self.values[idx]))
    }
}

/// File-backed ASCII grid that is opened per sample.
///
/// Only the header is kept in memory. Each [`RasterSource::sample`] call opens
/// the file, streams to the requested cell, and drops the handle before
/// returning, on success and on every error path.
#[derive(Debug, Clone)]
pub struct AscRasterFile {
    path: PathBuf,
    geometry: GridGeometry,
}

impl AscRasterFile {
    /// Opens `path`, reads and validates its header, and releases the file.
    ///
    /// # Errors
    ///
    /// Returns `Dataset` if the file cannot be read or the header is invalid.
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = open_reader(path)?;
        let (geometry, _) = read_header(&mut reader).map_err(|e| with_path(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            geometry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    fn read_cell(&self, idx: usize) -> Result<f64> {
        let mut reader = open_reader(&self.path)?;
        let (_, first_row) = read_header(&mut reader)?;

        let mut seen = 0usize;
        let mut line = first_row;
        loop {
            for token in line.split_whitespace() {
                if seen == idx {
                    return parse_cell(token);
                }
                seen += 1;
            }
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
        }
        Err(FeasibilityError::Dataset(format!(
            "truncated raster: cell {idx} missing, only {seen} values"
        )))
    }
}

impl RasterSource for AscRasterFile {
    fn sample(&self, location: &Location) -> Result<f64> {
        let idx = self
            .geometry
            .cell_index(location)
            .ok_or_else(|| out_of_extent(location))?;
        let raw = self
            .read_cell(idx)
            .map_err(|e| with_path(&self.path, e))?;
        Ok(self.geometry.decode(raw))
    }
}

fn open_reader(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| FeasibilityError::Dataset(format!("cannot open \"{}\": {e}", path.display())))
}

fn with_path(path: &Path, err: FeasibilityError) -> FeasibilityError {
    match err {
        FeasibilityError::Dataset(msg) if !msg.contains(&*path.to_string_lossy()) => {
            FeasibilityError::Dataset(format!("\"{}\": {msg}", path.display()))
        }
        FeasibilityError::Io(e) => {
            FeasibilityError::Dataset(format!("\"{}\": {e}", path.display()))
        }
        other => other,
    }
}

fn validate_geometry(geometry: &GridGeometry) -> Result<()> {
    if geometry.ncols == 0 || geometry.nrows == 0 {
        return Err(FeasibilityError::Dataset(
            "raster must have at least one row and column".to_string(),
        ));
    }
    geometry.cell_count()?;
    if !(geometry.cellsize.is_finite() && geometry.cellsize > 0.0) {
        return Err(FeasibilityError::Dataset(format!(
            "cellsize must be > 0, got {}",
            geometry.cellsize
        )));
    }
    if !geometry.x_min.is_finite() || !geometry.y_max.is_finite() {
        return Err(FeasibilityError::Dataset(
            "raster origin must be finite".to_string(),
        ));
    }
    Ok(())
}

/// Reads the header and returns it with the first data line.
fn read_header<R: BufRead>(reader: &mut R) -> Result<(GridGeometry, String)> {
    let mut ncols = None;
    let mut nrows = None;
    let mut x_ll = None;
    let mut y_ll = None;
    let mut centered = false;
    let mut cellsize = None;
    let mut nodata = None;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            continue;
        };
        let key = key.to_ascii_lowercase();
        if key.parse::<f64>().is_ok() {
            break;
        }
        let value = parts.next().ok_or_else(|| {
            FeasibilityError::Dataset(format!("header `{key}` has no value"))
        })?;
        match key.as_str() {
            "ncols" => ncols = Some(parse_header_int(&key, value)?),
            "nrows" => nrows = Some(parse_header_int(&key, value)?),
            "xllcorner" => x_ll = Some(parse_header_float(&key, value)?),
            "yllcorner" => y_ll = Some(parse_header_float(&key, value)?),
            "xllcenter" => {
                x_ll = Some(parse_header_float(&key, value)?);
                centered = true;
            }
            "yllcenter" => {
                y_ll = Some(parse_header_float(&key, value)?);
                centered = true;
            }
            "cellsize" => cellsize = Some(parse_header_float(&key, value)?),
            "nodata_value" => nodata = Some(parse_header_float(&key, value)?),
            other => {
                return Err(FeasibilityError::Dataset(format!(
                    "unknown header key `{other}`"
                )));
            }
        }
    }

    let missing = |name: &str| FeasibilityError::Dataset(format!("missing header `{name}`"));
    let ncols = ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = nrows.ok_or_else(|| missing("nrows"))?;
    let x_ll = x_ll.ok_or_else(|| missing("xllcorner"))?;
    let y_ll = y_ll.ok_or_else(|| missing("yllcorner"))?;
    let cellsize = cellsize.ok_or_else(|| missing("cellsize"))?;

    let half = if centered { cellsize / 2.0 } else { 0.0 };
    let geometry = GridGeometry {
        ncols,
        nrows,
        x_min: x_ll - half,
        y_max: y_ll - half + nrows as f64 * cellsize,
        cellsize,
        nodata,
    };
    validate_geometry(&geometry)?;
    Ok((geometry, line))
}

fn parse_header_int(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| {
            FeasibilityError::Dataset(format!("header `{key}`: invalid integer `{value}`"))
        })
}

fn parse_header_float(key: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| {
            FeasibilityError::Dataset(format!("header `{key}`: invalid number `{value}`"))
        })
}

fn parse_cell(token: &str) -> Result<f64> {
    token
        .parse()
        .map_err(|_| FeasibilityError::Dataset(format!("invalid cell value `{token}`")))
}

fn push_values(line: &str, out: &mut Vec<f64>) -> Result<()> {
    for token in line.split_whitespace() {
        out.push(parse_cell(token)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = "\
ncols 3
nrows 2
xllcorner -80.0
yllcorner -2.0
cellsize 1.0
NODATA_value -9999
1.0 2.0 3.0
4.0 -9999 6.0
";

    fn loc(latitude: f64, longitude: f64) -> Location {
        Location {
            latitude,
            longitude,
        }
    }

    #[test]
    fn parses_header_and_values() {
        let raster = GridRaster::from_asc_str(GRID).unwrap();
        let g = raster.geometry();
        assert_eq!(g.ncols, 3);
        assert_eq!(g.nrows, 2);
        assert_eq!(g.x_min, -80.0);
        assert_eq!(g.y_max, 0.0);
        assert_eq!(g.nodata, Some(-9999.0));
    }

    #[test]
    fn samples_north_row_first() {
        let raster = GridRaster::from_asc_str(GRID).unwrap();
        assert_eq!(raster.sample(&loc(-0.5, -79.5)).unwrap(), 1.0);
        assert_eq!(raster.sample(&loc(-0.5, -77.5)).unwrap(), 3.0);
        assert_eq!(raster.sample(&loc(-1.5, -79.5)).unwrap(), 4.0);
    }

    #[test]
    fn nodata_samples_as_nan() {
        let raster = GridRaster::from_asc_str(GRID).unwrap();
        assert!(raster.sample(&loc(-1.5, -78.5)).unwrap().is_nan());
    }

    #[test]
    fn outside_extent_is_invalid_location() {
        let raster = GridRaster::from_asc_str(GRID).unwrap();
        for (lat, lon) in [(0.5, -79.5), (-2.5, -79.5), (-1.0, -80.5), (-1.0, -77.0)] {
            let err = raster.sample(&loc(lat, lon)).unwrap_err();
            assert!(
                matches!(err, FeasibilityError::InvalidLocation { .. }),
                "({lat}, {lon}) should be outside, got {err:?}"
            );
        }
    }

    #[test]
    fn center_registration_shifts_origin() {
        let asc = "ncols 1\nnrows 1\nxllcenter 0.5\nyllcenter 0.5\ncellsize 1\n7\n";
        let raster = GridRaster::from_asc_str(asc).unwrap();
        assert_eq!(raster.geometry().x_min, 0.0);
        assert_eq!(raster.geometry().y_max, 1.0);
        assert_eq!(raster.sample(&loc(0.5, 0.5)).unwrap(), 7.0);
    }

    #[test]
    fn value_count_mismatch_is_rejected() {
        let asc = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        assert!(matches!(
            GridRaster::from_asc_str(asc),
            Err(FeasibilityError::Dataset(_))
        ));
    }

    #[test]
    fn oversized_header_is_a_dataset_error() {
        let huge = usize::MAX / 2;
        let asc =
            format!("ncols {huge}\nnrows 4\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n");
        assert!(matches!(
            GridRaster::from_asc_str(&asc),
            Err(FeasibilityError::Dataset(_))
        ));

        // fits in usize but far more cells than the body holds
        let large = "ncols 4000000000\nnrows 4\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n";
        assert!(matches!(
            GridRaster::from_asc_str(large),
            Err(FeasibilityError::Dataset(_))
        ));
    }

    #[test]
    fn oversized_header_is_rejected_on_open() {
        let path = std::env::temp_dir().join(format!("pv_oversized_{}.asc", std::process::id()));
        let huge = usize::MAX / 3;
        std::fs::write(
            &path,
            format!("ncols {huge}\nnrows 5\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n"),
        )
        .unwrap();
        let result = AscRasterFile::open(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(FeasibilityError::Dataset(_))));
    }

    #[test]
    fn missing_header_is_rejected() {
        let asc = "ncols 1\nnrows 1\ncellsize 1\n5\n";
        let err = GridRaster::from_asc_str(asc).unwrap_err();
        assert!(err.to_string().contains("xllcorner"));
    }

    #[test]
    fn file_backed_raster_matches_in_memory() {
        let dir = std::env::temp_dir().join(format!("pvf-raster-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("grid.asc");
        std::fs::write(&path, GRID).unwrap();

        let file = AscRasterFile::open(&path).unwrap();
        let memory = GridRaster::from_asc_str(GRID).unwrap();
        assert_eq!(file.geometry(), memory.geometry());
        for (lat, lon) in [(-0.5, -79.5), (-0.5, -78.5), (-1.5, -77.5)] {
            assert_eq!(
                file.sample(&loc(lat, lon)).unwrap(),
                memory.sample(&loc(lat, lon)).unwrap()
            );
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_dataset_error() {
        let err = AscRasterFile::open(Path::new("does/not/exist.asc")).unwrap_err();
        assert!(matches!(err, FeasibilityError::Dataset(_)));
    }
}
