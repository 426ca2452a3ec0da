//! Forward model and misfit score for one trial hypocentre.
//!
//! Every NA sample gets a private clone of the working phase list, so the
//! evaluator is shared read-only across the rayon pool. For one trial:
//!
//! 1. recompute epicentral distance and azimuth for every phase,
//! 2. predict travel times with all corrections and form time residuals,
//! 3. drop phases that cannot be predicted or whose residual is gross,
//! 4. score the surviving residuals with an Lp norm, decorrelated through
//!    the covariance projection when correlated errors are on, plus a
//!    penalty for every phase the trial failed to fit at all.

use tracing::trace;

use crate::covariance::{build_covariance, ProjectionMatrix};
use crate::geo::delta_azimuth;
use crate::model::{Hypocentre, PhaseRecord, StationRecord};
use crate::tables::TableSet;
use crate::traveltime::{predict, PredictContext};
use crate::{Matrix, Vector};

/// Misfit reported when no phase at all could be predicted for the trial.
pub const MISFIT_NO_DATA: f64 = 9999.0;
/// Misfit reported when fewer defining phases remain than free parameters.
pub const MISFIT_UNDERDETERMINED: f64 = 999.0;

/// Residuals beyond this are treated as misassociated and made non-defining
/// for the trial rather than poisoning its misfit.
const GROSS_RESIDUAL: f64 = 60.0;

/// Shared, read-only context for scoring trial hypocentres.
pub struct Evaluator<'a> {
    /// Working phase list; when correlated errors are on this is already in
    /// nearest-neighbour station order so the covariance is block-diagonal.
    pub phases: &'a [PhaseRecord],
    /// Station index per working phase, resolved once up front.
    pub sta_idx: &'a [usize],
    pub stations: &'a [StationRecord],
    pub tables: &'a TableSet,
    /// Station separation matrix, present iff correlated errors are on.
    pub separation: Option<&'a Matrix>,
    /// Lp-norm exponent in [1, 2].
    pub lp_norm: f64,
    /// Free location parameters of the search.
    pub ndim: usize,
    pub correlated: bool,
}

impl Evaluator<'_> {
    /// Score one trial hypocentre. Always returns a finite value; trials the
    /// data cannot constrain get the sentinel scores above.
    pub fn misfit(&self, trial: &Hypocentre) -> f64 {
        let mut phases: Vec<PhaseRecord> = self.phases.to_vec();

        for (p, &si) in phases.iter_mut().zip(self.sta_idx.iter()) {
            let sta = &self.stations[si];
            let (delta, esaz) = delta_azimuth(trial.lat, trial.lon, sta.lat, sta.lon);
            p.delta = delta;
            p.esaz = esaz;
            p.ttime = None;
            p.resid = None;
            p.timedef = p.time.is_some() && !p.purged;
            if !p.timedef {
                continue;
            }

            let ctx = PredictContext {
                ev_lat: trial.lat,
                ev_lon: trial.lon,
                esaz,
                station_elev: sta.elev,
            };
            match predict(self.tables, &p.phase, trial.depth, delta, false, &ctx) {
                Some(pred) => {
                    p.ttime = Some(pred.ttime);
                    p.dtdd = pred.dtdd;
                    let resid = p.time.unwrap_or(0.0) - trial.time - pred.ttime;
                    p.resid = Some(resid);
                    if resid.abs() > GROSS_RESIDUAL {
                        p.timedef = false;
                    }
                }
                None => p.timedef = false,
            }
        }

        let defining: Vec<&PhaseRecord> = phases.iter().filter(|p| p.timedef).collect();
        let total = phases.len();
        let ndef = defining.len();
        if ndef == 0 {
            return MISFIT_NO_DATA;
        }
        if ndef < self.ndim {
            return MISFIT_UNDERDETERMINED;
        }

        let penalty = 4.0 * (total - ndef) as f64 / total as f64;

        if self.correlated {
            if let Some(score) = self.correlated_norm(&defining) {
                return score + penalty;
            }
            trace!(ndef, "projection unusable for trial, scoring uncorrelated");
        }

        let sum: f64 = defining
            .iter()
            .map(|p| self.lp(p.resid.unwrap_or(0.0) / p.measerr.max(f64::EPSILON)))
            .sum();
        sum / (ndef.saturating_sub(self.ndim)).max(1) as f64 + penalty
    }

    /// Lp score of the projection-decorrelated residuals, or `None` when the
    /// covariance cannot be built or loses so much rank that the projected
    /// system no longer overdetermines the trial.
    fn correlated_norm(&self, defining: &[&PhaseRecord]) -> Option<f64> {
        let separation = self.separation?;
        let variogram = self.tables.variogram.as_ref()?;

        let owned: Vec<PhaseRecord> = defining.iter().map(|p| (*p).clone()).collect();
        let cov = build_covariance(&owned, self.stations, separation, variogram).ok()?;
        let proj = ProjectionMatrix::new(&cov).ok()?;
        if proj.rank() < self.ndim {
            return None;
        }

        let residuals = Vector::from_iterator(
            owned.len(),
            owned.iter().map(|p| p.resid.unwrap_or(0.0)),
        );
        let w = proj.project(&residuals);
        let sum: f64 = w.iter().map(|&r| self.lp(r)).sum();
        Some(sum / (proj.rank().saturating_sub(self.ndim)).max(1) as f64)
    }

    #[inline]
    fn lp(&self, r: f64) -> f64 {
        if self.lp_norm == 1.0 {
            r.abs()
        } else {
            r.abs().powf(self.lp_norm)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TravelTimeTable;

    /// tt = 10·delta + depth/10 on a 6×6 grid covering 0..10 deg, 0..500 km.
    fn table_set() -> TableSet {
        let deltas: Vec<f64> = (0..6).map(|j| j as f64 * 2.0).collect();
        let depths: Vec<f64> = (0..6).map(|i| i as f64 * 100.0).collect();
        let mut time = Vec::new();
        let mut dtdd = Vec::new();
        let mut dtdh = Vec::new();
        for h in &depths {
            for d in &deltas {
                time.push(10.0 * d + h / 10.0);
                dtdd.push(10.0);
                dtdh.push(0.1);
            }
        }
        let mut ts = TableSet::default();
        ts.tt.insert(
            "P".to_owned(),
            TravelTimeTable::new(deltas, depths, time, dtdd, dtdh, None).unwrap(),
        );
        ts
    }

    fn stations() -> Vec<StationRecord> {
        // Sorted by altsta; spread in azimuth around (0, 0).
        [("AAA", 4.0, 0.0), ("BBB", 0.0, 4.0), ("CCC", -4.0, 0.0), ("DDD", 0.0, -4.0), ("EEE", 3.0, 3.0)]
            .iter()
            .map(|&(code, lat, lon)| StationRecord {
                sta: code.to_owned(),
                altsta: code.to_owned(),
                lat,
                lon,
                elev: 0.0,
            })
            .collect()
    }

    /// Phases with exact arrival times for the given truth hypocentre.
    fn phases_for(truth: &Hypocentre, stations: &[StationRecord], tables: &TableSet) -> Vec<PhaseRecord> {
        stations
            .iter()
            .map(|s| {
                let (delta, esaz) = delta_azimuth(truth.lat, truth.lon, s.lat, s.lon);
                let ctx = PredictContext {
                    ev_lat: truth.lat,
                    ev_lon: truth.lon,
                    esaz,
                    station_elev: s.elev,
                };
                let pred = predict(tables, "P", truth.depth, delta, false, &ctx).unwrap();
                PhaseRecord::new(&s.altsta, "P", Some(truth.time + pred.ttime))
            })
            .collect()
    }

    fn evaluator<'a>(
        phases: &'a [PhaseRecord],
        sta_idx: &'a [usize],
        stations: &'a [StationRecord],
        tables: &'a TableSet,
    ) -> Evaluator<'a> {
        Evaluator {
            phases,
            sta_idx,
            stations,
            tables,
            separation: None,
            lp_norm: 1.0,
            ndim: 4,
            correlated: false,
        }
    }

    #[test]
    fn truth_hypocentre_scores_zero() {
        let tables = table_set();
        let stations = stations();
        let truth = Hypocentre {
            lat: 0.0,
            lon: 0.0,
            depth: 150.0,
            time: 1000.0,
            ..Default::default()
        };
        let phases = phases_for(&truth, &stations, &tables);
        let sta_idx: Vec<usize> = (0..stations.len()).collect();
        let ev = evaluator(&phases, &sta_idx, &stations, &tables);

        assert!(ev.misfit(&truth) < 1e-9);
    }

    #[test]
    fn misfit_grows_away_from_the_truth() {
        let tables = table_set();
        let stations = stations();
        let truth = Hypocentre {
            lat: 0.0,
            lon: 0.0,
            depth: 150.0,
            time: 1000.0,
            ..Default::default()
        };
        let phases = phases_for(&truth, &stations, &tables);
        let sta_idx: Vec<usize> = (0..stations.len()).collect();
        let ev = evaluator(&phases, &sta_idx, &stations, &tables);

        let mut off = truth.clone();
        off.time += 2.0;
        let m_near = ev.misfit(&off);
        off.time += 3.0;
        let m_far = ev.misfit(&off);
        assert!(m_near > 0.0);
        assert!(m_far > m_near);
    }

    #[test]
    fn unpredictable_trial_scores_no_data() {
        let tables = table_set();
        let stations = stations();
        let truth = Hypocentre {
            lat: 0.0,
            lon: 0.0,
            depth: 150.0,
            time: 1000.0,
            ..Default::default()
        };
        let phases = phases_for(&truth, &stations, &tables);
        let sta_idx: Vec<usize> = (0..stations.len()).collect();
        let ev = evaluator(&phases, &sta_idx, &stations, &tables);

        // Depth far outside the table: no prediction for any phase.
        let mut off = truth.clone();
        off.depth = 650.0;
        assert_eq!(ev.misfit(&off), MISFIT_NO_DATA);
    }

    #[test]
    fn too_few_defining_phases_is_underdetermined() {
        let tables = table_set();
        let stations = stations();
        let truth = Hypocentre {
            lat: 0.0,
            lon: 0.0,
            depth: 150.0,
            time: 1000.0,
            ..Default::default()
        };
        let mut phases = phases_for(&truth, &stations, &tables);
        // Leave only three phases with usable times; four parameters free.
        phases[0].time = None;
        phases[1].purged = true;
        let sta_idx: Vec<usize> = (0..stations.len()).collect();
        let ev = evaluator(&phases, &sta_idx, &stations, &tables);

        assert_eq!(ev.misfit(&truth), MISFIT_UNDERDETERMINED);
    }

    #[test]
    fn gross_residual_becomes_penalty_not_misfit() {
        let tables = table_set();
        let stations = stations();
        let truth = Hypocentre {
            lat: 0.0,
            lon: 0.0,
            depth: 150.0,
            time: 1000.0,
            ..Default::default()
        };
        let mut phases = phases_for(&truth, &stations, &tables);
        // One wildly misassociated arrival, 300 s late.
        let late = phases[4].time.unwrap() + 300.0;
        phases[4].time = Some(late);
        let sta_idx: Vec<usize> = (0..stations.len()).collect();
        let ev = evaluator(&phases, &sta_idx, &stations, &tables);

        // Four clean phases fit exactly; the outlier only adds its penalty.
        let m = ev.misfit(&truth);
        assert!((m - 4.0 / 5.0).abs() < 1e-9, "got {m}");
    }
}
