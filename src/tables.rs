//! Immutable table inputs: travel-time tables, ellipticity coefficients,
//! topography/bathymetry grid, and the station-separation variogram.
//!
//! Loading these from their on-disk formats is a collaborator's job; this
//! module owns the in-memory layout and the lookup edge semantics (range
//! checks, sentinel handling, longitude wraparound), which are part of the
//! core contract. Everything here is read-only after construction and is
//! shared freely across the parallel forward evaluations of a search.

use std::collections::HashMap;

use anyhow::{anyhow, ensure, Result};

use crate::interp::{spline_fit, spline_eval};

/// Sentinel in travel-time grids marking an unsampled (phase does not exist
/// at this distance/depth) node.
pub const TT_UNDEFINED: f64 = -999.0;

fn ensure_ascending(axis: &[f64], what: &str) -> Result<()> {
    ensure!(axis.len() >= 2, "{what} axis needs at least 2 samples");
    ensure!(
        axis.windows(2).all(|w| w[0] < w[1]),
        "{what} axis must be strictly ascending"
    );
    Ok(())
}

// ── Travel-time tables ──────────────────────────────────────────────────────

/// Per-phase travel-time grid over (distance, depth).
///
/// Row-major over depth rows: entry `(i_depth, j_delta)` sits at
/// `i_depth * deltas.len() + j_delta`. Negative entries ([`TT_UNDEFINED`])
/// mark grid nodes where the phase does not exist.
#[derive(Debug, Clone)]
pub struct TravelTimeTable {
    /// Distance samples, degrees, strictly ascending.
    pub deltas: Vec<f64>,
    /// Depth samples, km, strictly ascending.
    pub depths: Vec<f64>,
    /// Travel time, seconds.
    pub time: Vec<f64>,
    /// d(tt)/d(delta), s/deg.
    pub dtdd: Vec<f64>,
    /// d(tt)/d(depth), s/km.
    pub dtdh: Vec<f64>,
    /// Bounce-point distance from the epicentre, degrees; present only for
    /// depth phases (pP, sS, ...).
    pub bpdel: Option<Vec<f64>>,
}

impl TravelTimeTable {
    /// Validate axis ordering and grid sizes.
    pub fn new(
        deltas: Vec<f64>,
        depths: Vec<f64>,
        time: Vec<f64>,
        dtdd: Vec<f64>,
        dtdh: Vec<f64>,
        bpdel: Option<Vec<f64>>,
    ) -> Result<Self> {
        ensure_ascending(&deltas, "distance")?;
        ensure_ascending(&depths, "depth")?;
        let n = deltas.len() * depths.len();
        ensure!(time.len() == n, "time grid size mismatch");
        ensure!(dtdd.len() == n, "dtdd grid size mismatch");
        ensure!(dtdh.len() == n, "dtdh grid size mismatch");
        if let Some(ref b) = bpdel {
            ensure!(b.len() == n, "bounce-point grid size mismatch");
        }
        Ok(Self {
            deltas,
            depths,
            time,
            dtdd,
            dtdh,
            bpdel,
        })
    }

    /// Grid value at (depth row `i`, distance column `j`).
    #[inline]
    pub fn at(&self, grid: &[f64], i: usize, j: usize) -> f64 {
        grid[i * self.deltas.len() + j]
    }
}

// ── Ellipticity coefficient tables ──────────────────────────────────────────

/// tau0/tau1/tau2 coefficient grids for one phase class of the
/// Kennett & Gudmundsson (1996) ellipticity-correction tables.
#[derive(Debug, Clone)]
pub struct EllipticityEntry {
    /// Distance samples, degrees, strictly ascending.
    pub deltas: Vec<f64>,
    /// Depth samples, km, strictly ascending.
    pub depths: Vec<f64>,
    /// tau coefficient grids, row-major over depth rows like the TT grids.
    pub tau0: Vec<f64>,
    pub tau1: Vec<f64>,
    pub tau2: Vec<f64>,
}

/// Ellipticity coefficients keyed by canonical phase class.
#[derive(Debug, Clone, Default)]
pub struct EllipticityTable {
    entries: HashMap<String, EllipticityEntry>,
}

impl EllipticityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a phase class. Grids are validated like TT tables.
    pub fn insert(&mut self, phase: &str, entry: EllipticityEntry) -> Result<()> {
        ensure_ascending(&entry.deltas, "distance")?;
        ensure_ascending(&entry.depths, "depth")?;
        let n = entry.deltas.len() * entry.depths.len();
        ensure!(
            entry.tau0.len() == n && entry.tau1.len() == n && entry.tau2.len() == n,
            "tau grid size mismatch for {phase}"
        );
        self.entries.insert(phase.to_owned(), entry);
        Ok(())
    }

    pub fn get(&self, phase: &str) -> Option<&EllipticityEntry> {
        self.entries.get(phase)
    }
}

// ── Topography / bathymetry grid ────────────────────────────────────────────

/// Regular lat/lon grid of signed 16-bit elevation samples, metres.
///
/// Row-major from north to south: row 0 is `lat_max`, column 0 is `lon_min`.
/// Longitude wraps at the seam; latitude clamps at the poles.
#[derive(Debug, Clone)]
pub struct TopographyGrid {
    /// Elevation samples, metres (negative = bathymetry).
    pub elev: Vec<i16>,
    /// Number of latitude rows.
    pub n_lat: usize,
    /// Number of longitude columns.
    pub n_lon: usize,
    /// Northernmost row latitude, degrees.
    pub lat_max: f64,
    /// Westernmost column longitude, degrees.
    pub lon_min: f64,
    /// Grid spacing, degrees.
    pub resolution: f64,
}

impl TopographyGrid {
    pub fn new(
        elev: Vec<i16>,
        n_lat: usize,
        n_lon: usize,
        lat_max: f64,
        lon_min: f64,
        resolution: f64,
    ) -> Result<Self> {
        ensure!(n_lat >= 2 && n_lon >= 2, "topography grid too small");
        ensure!(resolution > 0.0, "topography resolution must be positive");
        ensure!(elev.len() == n_lat * n_lon, "topography grid size mismatch");
        Ok(Self {
            elev,
            n_lat,
            n_lon,
            lat_max,
            lon_min,
            resolution,
        })
    }

    /// Bilinear elevation sample at a geographic point, metres.
    ///
    /// Longitude wraps around the grid seam; latitude is clamped to the
    /// pole rows, so every query yields a value.
    pub fn sample(&self, lat: f64, lon: f64) -> f64 {
        let row = (self.lat_max - lat) / self.resolution;
        let col = (lon - self.lon_min).rem_euclid(360.0) / self.resolution;

        let i = (row.floor() as isize).clamp(0, self.n_lat as isize - 2) as usize;
        let t = (row - i as f64).clamp(0.0, 1.0);

        let j0 = (col.floor() as usize) % self.n_lon;
        let j1 = (j0 + 1) % self.n_lon;
        let u = (col - col.floor()).clamp(0.0, 1.0);

        let g = |r: usize, c: usize| self.elev[r * self.n_lon + c] as f64;
        (1.0 - t) * (1.0 - u) * g(i, j0)
            + (1.0 - t) * u * g(i, j1)
            + t * (1.0 - u) * g(i + 1, j0)
            + t * u * g(i + 1, j1)
    }
}

// ── Variogram ───────────────────────────────────────────────────────────────

/// Station-separation variogram: semivariance as a function of distance,
/// with precomputed natural-spline second derivatives for interpolation.
#[derive(Debug, Clone)]
pub struct Variogram {
    /// Separation samples, degrees, strictly ascending from 0.
    pub distance: Vec<f64>,
    /// Semivariance samples, s².
    pub semivariance: Vec<f64>,
    /// Spline second derivatives over the samples.
    pub y2: Vec<f64>,
    /// Sill: the semivariance plateau, s².
    pub sill: f64,
    /// Maximum separation at which phases are considered correlated, degrees.
    pub max_separation: f64,
}

impl Variogram {
    pub fn new(
        distance: Vec<f64>,
        semivariance: Vec<f64>,
        sill: f64,
        max_separation: f64,
    ) -> Result<Self> {
        ensure_ascending(&distance, "variogram separation")?;
        ensure!(
            semivariance.len() == distance.len(),
            "variogram sample count mismatch"
        );
        ensure!(sill > 0.0, "variogram sill must be positive");
        let y2 = spline_fit(&distance, &semivariance)
            .ok_or_else(|| anyhow!("variogram needs at least two samples"))?;
        Ok(Self {
            distance,
            semivariance,
            y2,
            sill,
            max_separation,
        })
    }

    /// Interpolated semivariance at a station separation, degrees.
    pub fn eval(&self, separation: f64) -> f64 {
        if separation <= self.distance[0] {
            return self.semivariance[0];
        }
        if separation >= *self.distance.last().unwrap() {
            return *self.semivariance.last().unwrap();
        }
        spline_eval(&self.distance, &self.semivariance, &self.y2, separation)
    }
}

// ── Bundle handed to the forward model ──────────────────────────────────────

/// All immutable inputs the forward model needs, bundled for passing around.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    /// Travel-time tables keyed by phase code.
    pub tt: HashMap<String, TravelTimeTable>,
    /// Ellipticity coefficients (empty table ⇒ zero corrections).
    pub ellipticity: EllipticityTable,
    /// Topography/bathymetry grid for bounce-point corrections.
    pub topography: Option<TopographyGrid>,
    /// Variogram for the correlated-error covariance.
    pub variogram: Option<Variogram>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_time_table_validates_shapes() {
        let t = TravelTimeTable::new(
            vec![0.0, 1.0],
            vec![0.0, 35.0],
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0; 4],
            None,
        );
        assert!(t.is_ok());

        let bad = TravelTimeTable::new(
            vec![1.0, 0.0],
            vec![0.0, 35.0],
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0; 4],
            None,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn topography_wraps_longitude_and_clamps_poles() {
        // 1-degree global-style grid, 5 rows from +2 to -2, 8 columns from -180.
        let mut elev = vec![0i16; 5 * 8];
        elev[2 * 8] = 800; // (lat 0, lon -180)
        let grid = TopographyGrid::new(elev, 5, 8, 2.0, -180.0, 1.0).unwrap();

        // Exactly on the sample.
        assert_eq!(grid.sample(0.0, -180.0), 800.0);
        // Same physical longitude from the east side of the seam.
        assert_eq!(grid.sample(0.0, 180.0), 800.0);
        // Beyond the last row: clamped, not panicking.
        let _ = grid.sample(-90.0, 0.0);
        let _ = grid.sample(90.0, 0.0);
    }

    #[test]
    fn variogram_clamps_to_sample_range() {
        let v = Variogram::new(
            vec![0.0, 1.0, 5.0, 10.0],
            vec![0.0, 0.8, 2.5, 3.0],
            3.0,
            10.0,
        )
        .unwrap();
        assert_eq!(v.eval(-1.0), 0.0);
        assert_eq!(v.eval(99.0), 3.0);
        assert!((v.eval(1.0) - 0.8).abs() < 1e-12);
        let mid = v.eval(3.0);
        assert!(mid > 0.8 && mid < 3.0);
    }
}
