//! Neighbourhood-Algorithm (NA) hypocentre search.
//!
//! Derivative-free global search over the free hypocentre parameters
//! (epicentre as distance/azimuth from the seed, origin time, depth), after
//! Sambridge (1999):
//!
//! 1. **Setup** — map the free parameters onto a normalized unit hypercube
//!    around the seed solution; one axis per free parameter.
//! 2. **Initial sample** — the seed itself plus a quasi-uniform SAS batch
//!    filling the space.
//! 3. **Resample** — each iteration, rank the whole ensemble by misfit
//!    (random tie-breaking), pick the best cells, and walk each cell's
//!    Voronoi region axis-by-axis: every step draws a quasi-random deviate
//!    inside the exact 1-D intersection of the axis line with the cell, so
//!    samples concentrate where the misfit is low without ever leaving the
//!    current best cells.
//! 4. **Report** — the lowest-misfit model of the final ensemble.
//!
//! The search is bit-reproducible: all generator state is scoped to the
//! invocation and seeded from [`NaConfig::seed`]. Sample generation is
//! sequential (the walk consumes shared generator state); misfit evaluation
//! of a generated batch runs on the rayon pool.

mod forward;
mod voronoi;

use std::io::Write;

use anyhow::{anyhow, ensure, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::geo::{delta_azimuth, point_at_delta_azimuth, KM_PER_DEG};
use crate::model::{Hypocentre, PhaseRecord, StationRecord};
use crate::quality::du_gap_sgap;
use crate::sequence::{Fibonacci, SasGenerator, Sobol1};
use crate::tables::TableSet;
use crate::Matrix;

use forward::Evaluator;
pub use forward::{MISFIT_NO_DATA, MISFIT_UNDERDETERMINED};

/// Hard ceiling on free location parameters.
pub const MAX_DIMS: usize = 4;
/// Hard ceiling on one sample batch (initial or per-iteration).
pub const MAX_SAMPLES: usize = 5000;
/// Hard ceiling on the whole ensemble over all iterations.
pub const MAX_MODELS: usize = 100_000;
/// Deepest hypocentre the search will propose, km.
const MAX_DEPTH_KM: f64 = 700.0;

// Correlated-error handling is pointless on large well-distributed networks
// and only slows the search down; see `du_gap_sgap`.
const CORRELATION_PHASE_LIMIT: usize = 30;
const CORRELATION_DU_LIMIT: f64 = 0.7;

/// NA search configuration.
#[derive(Debug, Clone)]
pub struct NaConfig {
    /// Search radius around the seed epicentre, km.
    pub radius_km: f64,
    /// Depth search half-range around the seed depth, km.
    pub depth_tol_km: f64,
    /// Origin-time search half-range around the seed time, s.
    pub otime_tol_s: f64,
    /// Lp-norm exponent for the misfit, in [1, 2].
    pub lp_norm: f64,
    /// Resampling iterations after the initial batch.
    pub max_iter: usize,
    /// Initial space-filling batch size.
    pub initial_samples: usize,
    /// Samples per resampling iteration.
    pub samples_per_iter: usize,
    /// Number of best Voronoi cells resampled each iteration.
    pub cells: usize,
    /// Generator seed; the same seed reproduces the search bit-for-bit.
    pub seed: i64,
    /// Use the variogram covariance and projection when scoring residuals.
    pub correlated_errors: bool,
}

impl Default for NaConfig {
    fn default() -> Self {
        Self {
            radius_km: 300.0,
            depth_tol_km: 300.0,
            otime_tol_s: 30.0,
            lp_norm: 1.0,
            max_iter: 5,
            initial_samples: 700,
            samples_per_iter: 200,
            cells: 25,
            seed: 5590,
            correlated_errors: true,
        }
    }
}

impl NaConfig {
    fn validate(&self) -> Result<()> {
        ensure!(self.radius_km > 0.0, "search radius must be positive");
        ensure!(self.depth_tol_km > 0.0, "depth tolerance must be positive");
        ensure!(self.otime_tol_s > 0.0, "origin-time tolerance must be positive");
        ensure!(
            (1.0..=2.0).contains(&self.lp_norm),
            "lp_norm must lie in [1, 2], got {}",
            self.lp_norm
        );
        ensure!(
            (1..=MAX_SAMPLES).contains(&self.initial_samples),
            "initial_samples must lie in 1..={MAX_SAMPLES}"
        );
        ensure!(
            self.max_iter == 0 || (1..=MAX_SAMPLES).contains(&self.samples_per_iter),
            "samples_per_iter must lie in 1..={MAX_SAMPLES}"
        );
        ensure!(self.cells >= 1, "at least one cell must be resampled");
        let total = self.initial_samples + self.max_iter * self.samples_per_iter;
        ensure!(
            total <= MAX_MODELS,
            "configuration would grow the ensemble to {total} models, ceiling is {MAX_MODELS}"
        );
        Ok(())
    }
}

/// Outcome classification of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaStatus {
    /// At least one trial model was acceptably constrained by the data.
    ModelFound,
    /// Every trial scored a sentinel misfit; the seed stands unimproved.
    NoAcceptableModel,
}

/// Search result: the best ensemble model and bookkeeping counters.
#[derive(Debug, Clone)]
pub struct NaResult {
    pub status: NaStatus,
    /// Best hypocentre, present iff `status` is [`NaStatus::ModelFound`].
    pub best: Option<Hypocentre>,
    /// Misfit of the best hypocentre.
    pub misfit: Option<f64>,
    /// Total forward-model evaluations.
    pub evaluations: usize,
    /// Resampling iterations actually run.
    pub iterations: usize,
    /// Whether residuals were scored through the covariance projection.
    pub correlated_errors_used: bool,
}

// ── Parameter space ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// Epicentre offset from the seed, degrees of arc.
    Distance,
    /// Epicentre offset direction, degrees clockwise from north.
    Azimuth,
    /// Origin time, epoch seconds.
    OriginTime,
    /// Depth, km.
    Depth,
}

/// The normalized search space: one unit axis per free parameter, with the
/// epicentre parametrized as (distance, azimuth) from the seed so the search
/// region is a disc rather than a lat/lon box.
struct NaSpace {
    seed: Hypocentre,
    axes: Vec<Axis>,
    ranges: Vec<(f64, f64)>,
}

impl NaSpace {
    fn new(seed: &Hypocentre, config: &NaConfig) -> Result<Self> {
        let mut axes = Vec::new();
        let mut ranges = Vec::new();

        if !seed.epicentre_fixed {
            axes.push(Axis::Distance);
            ranges.push((0.0, config.radius_km / KM_PER_DEG));
            axes.push(Axis::Azimuth);
            ranges.push((0.0, 360.0));
        }
        if !seed.time_fixed {
            axes.push(Axis::OriginTime);
            ranges.push((seed.time - config.otime_tol_s, seed.time + config.otime_tol_s));
        }
        if !seed.depth_fixed {
            let lo = (seed.depth - config.depth_tol_km).max(0.0);
            let hi = (seed.depth + config.depth_tol_km).min(MAX_DEPTH_KM);
            ensure!(hi > lo, "depth search range collapsed at {} km", seed.depth);
            axes.push(Axis::Depth);
            ranges.push((lo, hi));
        }

        ensure!(
            !axes.is_empty(),
            "all hypocentre parameters are fixed, nothing to search"
        );
        Ok(Self {
            seed: seed.clone(),
            axes,
            ranges,
        })
    }

    fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Normalized coordinates that map back to the seed solution itself.
    fn seed_point(&self) -> Vec<f64> {
        self.axes
            .iter()
            .zip(self.ranges.iter())
            .map(|(axis, &(lo, hi))| match axis {
                Axis::Distance | Axis::Azimuth => 0.0,
                Axis::OriginTime => 0.5,
                Axis::Depth => (self.seed.depth - lo) / (hi - lo),
            })
            .collect()
    }

    /// Denormalize one sample into a trial hypocentre.
    fn hypocentre(&self, scaled: &[f64]) -> Hypocentre {
        let mut trial = self.seed.clone();
        let mut dist = 0.0;
        let mut azim = 0.0;
        let mut moved = false;

        for ((axis, &(lo, hi)), &x) in self.axes.iter().zip(self.ranges.iter()).zip(scaled) {
            let raw = lo + x * (hi - lo);
            match axis {
                Axis::Distance => {
                    dist = raw;
                    moved = true;
                }
                Axis::Azimuth => azim = raw,
                Axis::OriginTime => trial.time = raw,
                Axis::Depth => trial.depth = raw,
            }
        }

        if moved {
            let (lat, lon) = point_at_delta_azimuth(self.seed.lat, self.seed.lon, dist, azim);
            trial.lat = lat;
            trial.lon = lon;
        }
        trial
    }
}

// ── Driver ──────────────────────────────────────────────────────────────────

/// Run the NA search for the best hypocentre around `seed`.
///
/// `phases` and `stations` are read-only inputs; `stations` must be sorted
/// ascending by `altsta` and every phase's station must resolve, otherwise
/// the search fails up front. `sink`, when given, receives one whitespace-
/// separated diagnostic line per evaluated sample
/// (`iteration sample lat lon depth time misfit`).
pub fn na_search(
    seed: &Hypocentre,
    phases: &[PhaseRecord],
    stations: &[StationRecord],
    tables: &TableSet,
    config: &NaConfig,
    mut sink: Option<&mut dyn Write>,
) -> Result<NaResult> {
    config.validate()?;
    ensure!(!phases.is_empty(), "no phases to locate with");
    ensure!(!stations.is_empty(), "empty station list");

    let space = NaSpace::new(seed, config)?;
    let nd = space.ndim();
    debug_assert!(nd <= MAX_DIMS);

    // Station index per phase, resolved once for the whole search.
    let mut sta_idx = Vec::with_capacity(phases.len());
    for p in phases {
        let idx = stations
            .binary_search_by(|s| s.altsta.as_str().cmp(p.sta.as_str()))
            .map_err(|_| anyhow!("phase station {} not in station list", p.sta))?;
        sta_idx.push(idx);
    }

    // Correlated-error decision: the configuration asks for it, a variogram
    // is available, and the network is small or lopsided enough to need it.
    let usable: Vec<usize> = (0..phases.len())
        .filter(|&i| phases[i].time.is_some() && !phases[i].purged)
        .collect();
    let azimuths: Vec<f64> = usable
        .iter()
        .map(|&i| {
            let s = &stations[sta_idx[i]];
            delta_azimuth(seed.lat, seed.lon, s.lat, s.lon).1
        })
        .collect();
    let quality = du_gap_sgap(&azimuths);
    let mut correlated = config.correlated_errors && tables.variogram.is_some();
    if correlated && usable.len() > CORRELATION_PHASE_LIMIT && quality.du < CORRELATION_DU_LIMIT {
        info!(
            nphases = usable.len(),
            du = quality.du,
            "large well-distributed network, disabling correlated errors"
        );
        correlated = false;
    }

    // Working phase order. With correlated errors the phases are sorted into
    // nearest-neighbour station order (then reading, then time) so the data
    // covariance comes out block-diagonal.
    let (work_phases, work_sta_idx, separation) = if correlated {
        let sep = station_separation(stations);
        let order = crate::cluster::nearest_neighbour_order(&sep)?;
        let mut rank = vec![0usize; stations.len()];
        for s in &order {
            rank[s.index] = s.x;
        }
        let mut perm: Vec<usize> = (0..phases.len()).collect();
        perm.sort_by(|&a, &b| {
            rank[sta_idx[a]]
                .cmp(&rank[sta_idx[b]])
                .then(phases[a].rdid.cmp(&phases[b].rdid))
                .then(
                    phases[a]
                        .time
                        .unwrap_or(f64::MAX)
                        .total_cmp(&phases[b].time.unwrap_or(f64::MAX)),
                )
        });
        let wp: Vec<PhaseRecord> = perm.iter().map(|&i| phases[i].clone()).collect();
        let wi: Vec<usize> = perm.iter().map(|&i| sta_idx[i]).collect();
        (wp, wi, Some(sep))
    } else {
        (phases.to_vec(), sta_idx, None)
    };

    let evaluator = Evaluator {
        phases: &work_phases,
        sta_idx: &work_sta_idx,
        stations,
        tables,
        separation: separation.as_ref(),
        lp_norm: config.lp_norm,
        ndim: nd,
        correlated,
    };

    // Generator state, all scoped to this invocation. One SAS sequence per
    // (axis, cell) pair; the vector mode for the initial batch uses the
    // first `nd` of them.
    let mut fib = Fibonacci::new(config.seed);
    let mut sas = SasGenerator::new(nd * config.cells, &mut fib)?;
    let mut sobol = Sobol1::new();

    let mut models: Vec<Vec<f64>> = Vec::new();
    let mut misfits: Vec<f64> = Vec::new();

    // Initial batch: the seed solution itself, then a space-filling sample.
    let mut batch: Vec<Vec<f64>> = Vec::with_capacity(config.initial_samples);
    batch.push(space.seed_point());
    let mut coords = vec![0.0; nd];
    while batch.len() < config.initial_samples {
        sas.next_vector(&mut coords)?;
        batch.push(coords.clone());
    }
    evaluate_batch(&evaluator, &space, 0, &batch, &mut models, &mut misfits, &mut sink)?;
    debug!(
        samples = misfits.len(),
        best = best_of(&misfits).map(|(_, m)| m),
        "initial NA sample done"
    );

    // Resampling iterations.
    let mut iterations = 0;
    for iter in 1..=config.max_iter {
        let ncells = config.cells.min(models.len());

        // Rank the ensemble; the pre-shuffle randomizes order among equal
        // misfits, the sort itself is stable.
        let mut ranked: Vec<usize> = (0..models.len()).collect();
        fib.jumble(&mut ranked);
        ranked.sort_by(|&a, &b| misfits[a].total_cmp(&misfits[b]));
        ranked.truncate(ncells);

        let mut batch: Vec<Vec<f64>> = Vec::with_capacity(config.samples_per_iter);
        for (cell_rank, &cell) in ranked.iter().enumerate() {
            let share = config.samples_per_iter / ncells
                + usize::from(cell_rank < config.samples_per_iter % ncells);
            if share == 0 {
                continue;
            }

            // Gibbs walk through this cell: starts at the cell's own model
            // and keeps moving sample to sample, one axis draw at a time
            // inside the exact 1-D Voronoi intersection.
            let mut xcur = models[cell].clone();
            for _ in 0..share {
                let mut pair = [0.0; 2];
                sobol.next_point(&mut pair);
                let start_axis = ((nd as f64 * pair[0]) as usize).min(nd - 1);

                let mut dlist = voronoi::seed_dlist(&models, &xcur, start_axis);
                let mut prev = start_axis;
                for step in 0..nd {
                    let axis = (start_axis + step) % nd;
                    if step > 0 {
                        voronoi::update_dlist(&mut dlist, &models, &xcur, prev, axis);
                    }
                    let (lo, hi) =
                        voronoi::axis_intersection(&models, &dlist, cell, axis, (0.0, 1.0));
                    let dev = sas.next_deviate(axis + cell_rank * nd)?;
                    if hi > lo {
                        xcur[axis] = lo + dev * (hi - lo);
                    }
                    prev = axis;
                }
                batch.push(xcur.clone());
            }
        }

        evaluate_batch(&evaluator, &space, iter, &batch, &mut models, &mut misfits, &mut sink)?;
        iterations = iter;
        debug!(
            iter,
            ensemble = misfits.len(),
            best = best_of(&misfits).map(|(_, m)| m),
            "NA iteration done"
        );
    }

    let evaluations = misfits.len();
    match best_of(&misfits) {
        Some((idx, misfit)) if misfit < MISFIT_UNDERDETERMINED => {
            let best = space.hypocentre(&models[idx]);
            info!(
                lat = best.lat,
                lon = best.lon,
                depth = best.depth,
                misfit,
                evaluations,
                "NA search found a model"
            );
            Ok(NaResult {
                status: NaStatus::ModelFound,
                best: Some(best),
                misfit: Some(misfit),
                evaluations,
                iterations,
                correlated_errors_used: correlated,
            })
        }
        _ => {
            info!(evaluations, "NA search found no acceptable model");
            Ok(NaResult {
                status: NaStatus::NoAcceptableModel,
                best: None,
                misfit: None,
                evaluations,
                iterations,
                correlated_errors_used: correlated,
            })
        }
    }
}

/// Score a generated batch on the rayon pool and append it to the ensemble.
fn evaluate_batch(
    evaluator: &Evaluator<'_>,
    space: &NaSpace,
    iter: usize,
    batch: &[Vec<f64>],
    models: &mut Vec<Vec<f64>>,
    misfits: &mut Vec<f64>,
    sink: &mut Option<&mut dyn Write>,
) -> Result<()> {
    let scores: Vec<f64> = batch
        .par_iter()
        .map(|coords| evaluator.misfit(&space.hypocentre(coords)))
        .collect();

    if let Some(w) = sink.as_deref_mut() {
        for (k, (coords, &misfit)) in batch.iter().zip(scores.iter()).enumerate() {
            let h = space.hypocentre(coords);
            writeln!(
                w,
                "{} {} {:.5} {:.5} {:.2} {:.3} {:.6}",
                iter,
                models.len() + k,
                h.lat,
                h.lon,
                h.depth,
                h.time,
                misfit
            )?;
        }
    }

    models.extend(batch.iter().cloned());
    misfits.extend(scores);
    Ok(())
}

/// Index and value of the smallest misfit in the ensemble.
fn best_of(misfits: &[f64]) -> Option<(usize, f64)> {
    misfits
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, &m)| (i, m))
}

/// Great-circle separation matrix (degrees) between all station pairs.
fn station_separation(stations: &[StationRecord]) -> Matrix {
    Matrix::from_fn(stations.len(), stations.len(), |i, j| {
        if i == j {
            0.0
        } else {
            delta_azimuth(stations[i].lat, stations[i].lon, stations[j].lat, stations[j].lon).0
        }
    })
}
