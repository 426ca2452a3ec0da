//! Data covariance for correlated picking errors, and the projection matrix
//! that decorrelates residuals against it.
//!
//! Phases picked at nearby stations by the same analysts share systematic
//! error; the covariance of two defining phases is modelled from a station
//! separation variogram. Only phases of the **same type** correlate —
//! different ray paths are assumed independent — so after the phase list is
//! sorted by nearest-neighbour station order (see [`crate::cluster`]), then
//! reading id, then time, the matrix is block-diagonal. The sort is the
//! caller's job: the matrix is mathematically the same under any permutation,
//! but the block structure is what keeps the eigendecomposition well behaved.

use anyhow::{anyhow, ensure, Result};

use crate::model::{PhaseRecord, StationRecord};
use crate::tables::Variogram;
use crate::{Matrix, Vector};

/// Relative eigenvalue cutoff for the projection: eigenpairs below
/// `PROJECTION_EIGEN_CUTOFF × λ_max` are treated as a null space.
pub const PROJECTION_EIGEN_CUTOFF: f64 = 1e-5;

/// Assemble the data covariance matrix over `phases` (the defining set, in
/// the caller's sort order).
///
/// Diagonal: variogram sill + measurement error². Off-diagonal (i, j):
/// zero for different phase types; otherwise `sill − γ(separation)` when the
/// stations are within the variogram's correlation range, else zero. The
/// matrix is written symmetrically by construction.
///
/// `separation` is the station-pair distance matrix aligned with `stations`;
/// a phase whose station key is missing from `stations` fails the whole
/// build.
pub fn build_covariance(
    phases: &[PhaseRecord],
    stations: &[StationRecord],
    separation: &Matrix,
    variogram: &Variogram,
) -> Result<Matrix> {
    let n = phases.len();
    ensure!(n > 0, "covariance needs at least one defining phase");
    ensure!(
        separation.nrows() == stations.len() && separation.ncols() == stations.len(),
        "separation matrix does not match the station list"
    );

    // Station index per phase, resolved once.
    let mut sta_idx = Vec::with_capacity(n);
    for p in phases {
        let idx = stations
            .binary_search_by(|s| s.altsta.as_str().cmp(p.sta.as_str()))
            .map_err(|_| anyhow!("station {} not in station list", p.sta))?;
        sta_idx.push(idx);
    }

    let mut cov = Matrix::zeros(n, n);
    for i in 0..n {
        cov[(i, i)] = variogram.sill + phases[i].measerr * phases[i].measerr;
        for j in i + 1..n {
            if phases[i].phase_type() != phases[j].phase_type() {
                continue;
            }
            let sep = separation[(sta_idx[i], sta_idx[j])];
            if sep > variogram.max_separation {
                continue;
            }
            let c = variogram.sill - variogram.eval(sep);
            cov[(i, j)] = c;
            cov[(j, i)] = c;
        }
    }

    Ok(cov)
}

/// Whitening projection `W = Λ^{-1/2} Uᵀ` over the significant eigenpairs of
/// a data covariance matrix.
///
/// For a singular or near-singular covariance (co-located stations, repeated
/// picks) the projected system drops the null space: `rank` is the number of
/// independent data after decorrelation, and the misfit is computed from the
/// `rank` projected residuals instead of the raw ones.
#[derive(Debug, Clone)]
pub struct ProjectionMatrix {
    w: Matrix,
    rank: usize,
}

impl ProjectionMatrix {
    /// Eigendecompose `cov` and keep the eigenpairs above the relative
    /// cutoff. `cov` must be symmetric (as produced by [`build_covariance`]).
    pub fn new(cov: &Matrix) -> Result<Self> {
        ensure!(cov.nrows() == cov.ncols(), "covariance must be square");
        let n = cov.nrows();

        let eig = cov.clone().symmetric_eigen();
        let lambda_max = eig.eigenvalues.iter().cloned().fold(0.0f64, f64::max);
        ensure!(
            lambda_max > 0.0,
            "covariance has no positive eigenvalue"
        );
        let cutoff = PROJECTION_EIGEN_CUTOFF * lambda_max;

        let kept: Vec<usize> = (0..n)
            .filter(|&k| eig.eigenvalues[k] > cutoff)
            .collect();
        let rank = kept.len();

        let mut w = Matrix::zeros(rank, n);
        for (row, &k) in kept.iter().enumerate() {
            let scale = 1.0 / eig.eigenvalues[k].sqrt();
            for col in 0..n {
                w[(row, col)] = scale * eig.eigenvectors[(col, k)];
            }
        }

        Ok(Self { w, rank })
    }

    /// Number of independent data after projection.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Decorrelate and whiten a residual vector.
    pub fn project(&self, residuals: &Vector) -> Vector {
        &self.w * residuals
    }
}
