//! Travel-time prediction: bicubic table lookup plus the physical
//! corrections applied on top of the tabulated times.
//!
//! Lookup flow for one `(phase, depth, delta)` query:
//!
//! 1. Range-check both axes against the phase's table; out of range ⇒ no
//!    prediction (the caller scores the phase as unusable, it is not an error).
//! 2. Locate a bounded bracketing window on each axis (up to 25 samples).
//!    If the query coincides with a grid sample on an axis, interpolation on
//!    that axis is skipped entirely — a query on a grid point returns the
//!    tabulated value with zero interpolation error.
//! 3. Otherwise fit a natural cubic spline along distance for every depth row
//!    of the window (skipping sentinel nodes), evaluate at the query
//!    distance, then spline the per-row values across depth.
//! 4. Apply, in order: ellipticity correction, station elevation correction,
//!    and for depth phases the bounce-point topography/bathymetry correction
//!    (plus the pwP water-column term).

pub mod corrections;
pub mod ellipticity;

use crate::interp::{spline_eval, spline_fit, MIN_SAMPLES};
use crate::tables::{TableSet, TravelTimeTable};

pub use corrections::{bounce_point_correction, elevation_correction, WaveType};
pub use ellipticity::ellipticity_correction;

/// Bracketing-window capacity per axis.
const MAX_WINDOW: usize = 25;
/// Tolerance for treating a query as coincident with a grid sample.
const GRID_EPS: f64 = 1e-8;

/// Everything the corrections need to know about the source-station pair.
#[derive(Debug, Clone, Copy)]
pub struct PredictContext {
    /// Trial epicentre latitude, degrees.
    pub ev_lat: f64,
    /// Trial epicentre longitude, degrees.
    pub ev_lon: f64,
    /// Event-to-station azimuth, degrees.
    pub esaz: f64,
    /// Station elevation, metres.
    pub station_elev: f64,
}

/// A successful travel-time prediction with its correction breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Corrected travel time, seconds.
    pub ttime: f64,
    /// Horizontal slowness d(tt)/d(delta), s/deg.
    pub dtdd: f64,
    /// Depth derivative d(tt)/d(depth), s/km.
    pub dtdh: f64,
    /// Bounce-point distance, degrees (depth phases only).
    pub bpdel: Option<f64>,
    /// Ellipticity correction applied, seconds.
    pub ellip_corr: f64,
    /// Station elevation correction applied, seconds.
    pub elev_corr: f64,
    /// Bounce-point topography/bathymetry (+ water column) correction, seconds.
    pub bounce_corr: f64,
}

/// True when `phase` is a depth phase (pP, sS, pwP, ...).
#[inline]
pub fn is_depth_phase(phase: &str) -> bool {
    matches!(phase.as_bytes().first(), Some(b'p') | Some(b's'))
}

/// Predict the travel time of `phase` at source depth `depth` (km) and
/// epicentral distance `delta` (degrees).
///
/// Returns `None` when the phase has no table, the query is outside the
/// tabulated range, or too few valid samples surround the query. When
/// `need_dtdh` is false the depth derivative is reported as 0 and its lookup
/// is skipped (the NA misfit never consumes it).
pub fn predict(
    tables: &TableSet,
    phase: &str,
    depth: f64,
    delta: f64,
    need_dtdh: bool,
    ctx: &PredictContext,
) -> Option<Prediction> {
    let table = tables.tt.get(phase)?;

    let tt = lookup(table, &table.time, delta, depth)?;
    let dtdd = lookup(table, &table.dtdd, delta, depth)?;
    let dtdh = if need_dtdh {
        lookup(table, &table.dtdh, delta, depth)?
    } else {
        0.0
    };

    let bpdel = if is_depth_phase(phase) {
        match table.bpdel {
            Some(ref grid) => lookup(table, grid, delta, depth),
            None => None,
        }
    } else {
        None
    };

    // Corrections, in order. Each degrades to zero when its inputs are
    // unavailable rather than failing the prediction.
    let ellip_corr =
        ellipticity_correction(&tables.ellipticity, phase, delta, depth, ctx.ev_lat, ctx.esaz);

    let elev_corr = elevation_correction(phase, ctx.station_elev, dtdd);

    let bounce_corr = match (bpdel, tables.topography.as_ref()) {
        (Some(bp), Some(topo)) => {
            bounce_point_correction(topo, phase, ctx.ev_lat, ctx.ev_lon, ctx.esaz, bp, dtdd)
        }
        _ => 0.0,
    };

    Some(Prediction {
        ttime: tt + ellip_corr + elev_corr + bounce_corr,
        dtdd,
        dtdh,
        bpdel,
        ellip_corr,
        elev_corr,
        bounce_corr,
    })
}

// ── Bicubic window lookup ───────────────────────────────────────────────────

/// Index window of up to [`MAX_WINDOW`] samples bracketing `x` in `axis`
/// (all samples if the axis is shorter). Returns `(start, end)` exclusive.
fn sample_window(axis: &[f64], x: f64) -> (usize, usize) {
    let n = axis.len();
    if n <= MAX_WINDOW {
        return (0, n);
    }
    let centre = crate::geo::bracket(axis, x);
    let half = MAX_WINDOW / 2;
    let start = centre.saturating_sub(half).min(n - MAX_WINDOW);
    (start, start + MAX_WINDOW)
}

/// Exact-coincidence test against a grid axis.
fn exact_index(axis: &[f64], x: f64) -> Option<usize> {
    let i = crate::geo::bracket(axis, x);
    if (axis[i] - x).abs() <= GRID_EPS {
        Some(i)
    } else if (axis[i + 1] - x).abs() <= GRID_EPS {
        Some(i + 1)
    } else {
        None
    }
}

/// Interpolate one grid of `table` at `(delta, depth)`.
///
/// Handles the four exact/interpolated axis combinations independently; grid
/// sentinel nodes (negative) are skipped, and an interpolated axis needs at
/// least [`MIN_SAMPLES`] valid samples or the lookup fails.
fn lookup(table: &TravelTimeTable, grid: &[f64], delta: f64, depth: f64) -> Option<f64> {
    if delta < table.deltas[0]
        || delta > *table.deltas.last().unwrap()
        || depth < table.depths[0]
        || depth > *table.depths.last().unwrap()
    {
        return None;
    }

    let exact_delta = exact_index(&table.deltas, delta);
    let exact_depth = exact_index(&table.depths, depth);

    match (exact_depth, exact_delta) {
        (Some(i), Some(j)) => {
            // Node validity is always judged on the time grid; derivative
            // grids may hold legitimate negative values.
            (table.at(&table.time, i, j) >= 0.0).then(|| table.at(grid, i, j))
        }
        (Some(i), None) => row_interp(table, grid, i, delta),
        (None, Some(j)) => {
            let (d0, d1) = sample_window(&table.depths, depth);
            let mut xs = Vec::with_capacity(d1 - d0);
            let mut ys = Vec::with_capacity(d1 - d0);
            for i in d0..d1 {
                let v = table.at(grid, i, j);
                if table.at(&table.time, i, j) >= 0.0 {
                    xs.push(table.depths[i]);
                    ys.push(v);
                }
            }
            axis_spline(&xs, &ys, depth)
        }
        (None, None) => {
            let (d0, d1) = sample_window(&table.depths, depth);
            let mut xs = Vec::with_capacity(d1 - d0);
            let mut ys = Vec::with_capacity(d1 - d0);
            for i in d0..d1 {
                if let Some(v) = row_interp(table, grid, i, delta) {
                    xs.push(table.depths[i]);
                    ys.push(v);
                }
            }
            axis_spline(&xs, &ys, depth)
        }
    }
}

/// Spline one depth row of `grid` along distance and evaluate at `delta`.
fn row_interp(table: &TravelTimeTable, grid: &[f64], row: usize, delta: f64) -> Option<f64> {
    let (c0, c1) = sample_window(&table.deltas, delta);
    let mut xs = Vec::with_capacity(c1 - c0);
    let mut ys = Vec::with_capacity(c1 - c0);
    for j in c0..c1 {
        // Validity is defined by the time grid: a sentinel travel time marks
        // the whole node missing, whatever the derivative grids hold there.
        if table.at(&table.time, row, j) >= 0.0 {
            xs.push(table.deltas[j]);
            ys.push(table.at(grid, row, j));
        }
    }
    axis_spline(&xs, &ys, delta)
}

fn axis_spline(xs: &[f64], ys: &[f64], x: f64) -> Option<f64> {
    if xs.len() < MIN_SAMPLES {
        return None;
    }
    if x < xs[0] || x > *xs.last().unwrap() {
        return None;
    }
    let y2 = spline_fit(xs, ys)?;
    Some(spline_eval(xs, ys, &y2, x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TravelTimeTable;

    /// Table with tt = 10·delta + depth, a 6×6 grid: spline-exact in the
    /// linear case so interpolated values can be checked tightly too.
    fn linear_table() -> TravelTimeTable {
        let deltas: Vec<f64> = (0..6).map(|j| j as f64 * 2.0).collect();
        let depths: Vec<f64> = (0..6).map(|i| i as f64 * 100.0).collect();
        let mut time = Vec::new();
        let mut dtdd = Vec::new();
        let mut dtdh = Vec::new();
        for h in &depths {
            for d in &deltas {
                time.push(10.0 * d + h);
                dtdd.push(10.0);
                dtdh.push(1.0);
            }
        }
        TravelTimeTable::new(deltas, depths, time, dtdd, dtdh, None).unwrap()
    }

    fn empty_ctx() -> PredictContext {
        PredictContext {
            ev_lat: 0.0,
            ev_lon: 0.0,
            esaz: 0.0,
            station_elev: 0.0,
        }
    }

    fn table_set() -> TableSet {
        let mut ts = TableSet::default();
        ts.tt.insert("P".to_owned(), linear_table());
        ts
    }

    #[test]
    fn exact_grid_point_returns_tabulated_value() {
        let ts = table_set();
        let p = predict(&ts, "P", 300.0, 4.0, true, &empty_ctx()).unwrap();
        assert_eq!(p.ttime, 340.0);
        assert_eq!(p.dtdd, 10.0);
        assert_eq!(p.dtdh, 1.0);
    }

    #[test]
    fn mixed_exact_and_interpolated_axes() {
        let ts = table_set();
        // Exact depth row, interpolated distance.
        let p = predict(&ts, "P", 300.0, 5.0, false, &empty_ctx()).unwrap();
        assert!((p.ttime - 350.0).abs() < 1e-9);
        // Exact distance, interpolated depth.
        let p = predict(&ts, "P", 250.0, 4.0, false, &empty_ctx()).unwrap();
        assert!((p.ttime - 290.0).abs() < 1e-9);
        // Both interpolated.
        let p = predict(&ts, "P", 250.0, 5.0, false, &empty_ctx()).unwrap();
        assert!((p.ttime - 300.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_fails_but_edge_succeeds() {
        let ts = table_set();
        assert!(predict(&ts, "P", 0.0, 10.0, false, &empty_ctx()).is_some());
        assert!(predict(&ts, "P", 0.0, 10.001, false, &empty_ctx()).is_none());
        assert!(predict(&ts, "P", 500.0, 4.0, false, &empty_ctx()).is_some());
        assert!(predict(&ts, "P", 500.001, 4.0, false, &empty_ctx()).is_none());
    }

    #[test]
    fn missing_table_fails() {
        let ts = table_set();
        assert!(predict(&ts, "ScS", 10.0, 40.0, false, &empty_ctx()).is_none());
    }

    #[test]
    fn sentinel_rows_are_skipped() {
        let mut table = linear_table();
        // Kill depth row 2 entirely: interpolation across depth must still
        // succeed from the remaining 5 rows.
        for j in 0..6 {
            table.time[2 * 6 + j] = crate::tables::TT_UNDEFINED;
        }
        let mut ts = TableSet::default();
        ts.tt.insert("P".to_owned(), table);
        let p = predict(&ts, "P", 250.0, 5.0, false, &empty_ctx()).unwrap();
        assert!((p.ttime - 300.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_valid_samples_fails() {
        let mut table = linear_table();
        // Leave only 3 valid distance columns in every row.
        for i in 0..6 {
            for j in 3..6 {
                table.time[i * 6 + j] = crate::tables::TT_UNDEFINED;
            }
        }
        let mut ts = TableSet::default();
        ts.tt.insert("P".to_owned(), table);
        assert!(predict(&ts, "P", 250.0, 1.0, false, &empty_ctx()).is_none());
    }
}
