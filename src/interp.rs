//! Interpolation leaves: natural cubic splines (1-D) and bilinear lookup over
//! regular 2-D grids.
//!
//! The travel-time predictor builds its bicubic lookup out of repeated 1-D
//! natural-spline passes (one per depth row, then one across depth), so the
//! spline fit/eval pair here is the hot path of the whole forward model.

use crate::geo::bracket;

/// Minimum number of valid samples required along an interpolated axis.
pub const MIN_SAMPLES: usize = 4;

// ── Natural cubic spline ────────────────────────────────────────────────────

/// Fit a natural cubic spline through `(xs, ys)` and return the second
/// derivatives at the knots (zero at both ends).
///
/// `xs` must be strictly ascending and the same length as `ys`. Returns
/// `None` for fewer than two knots.
pub fn spline_fit(xs: &[f64], ys: &[f64]) -> Option<Vec<f64>> {
    let n = xs.len();
    if n < 2 || ys.len() != n {
        return None;
    }

    let mut y2 = vec![0.0; n];
    if n == 2 {
        return Some(y2);
    }

    // Tridiagonal sweep; `u` holds the decomposed right-hand side.
    let mut u = vec![0.0; n - 1];
    for i in 1..n - 1 {
        let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let d = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
            - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
        u[i] = (6.0 * d / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
    }

    y2[n - 1] = 0.0;
    for i in (0..n - 1).rev() {
        y2[i] = y2[i] * y2[i + 1] + u[i];
    }

    Some(y2)
}

/// Evaluate a fitted natural spline at `x`.
///
/// `y2` is the output of [`spline_fit`] for the same knots. Queries outside
/// the knot range extrapolate from the edge segment; the caller is expected
/// to range-check first.
pub fn spline_eval(xs: &[f64], ys: &[f64], y2: &[f64], x: f64) -> f64 {
    let i = bracket(xs, x);
    let h = xs[i + 1] - xs[i];
    let a = (xs[i + 1] - x) / h;
    let b = (x - xs[i]) / h;
    a * ys[i]
        + b * ys[i + 1]
        + ((a * a * a - a) * y2[i] + (b * b * b - b) * y2[i + 1]) * (h * h) / 6.0
}

// ── Bilinear lookup over a regular grid ─────────────────────────────────────

/// Bilinear interpolation of `grid[row][col]` sampled at `(row_axis, col_axis)`.
///
/// `grid` is row-major with `row_axis.len() * col_axis.len()` entries. A query
/// on a grid line reduces to linear interpolation on the other axis; a query
/// on a grid point returns the tabulated value exactly. Queries outside the
/// axis ranges return `None`.
pub fn bilinear(
    row_axis: &[f64],
    col_axis: &[f64],
    grid: &[f64],
    row: f64,
    col: f64,
) -> Option<f64> {
    if row_axis.len() < 2 || col_axis.len() < 2 {
        return None;
    }
    if row < row_axis[0]
        || row > *row_axis.last().unwrap()
        || col < col_axis[0]
        || col > *col_axis.last().unwrap()
    {
        return None;
    }

    let i = bracket(row_axis, row);
    let j = bracket(col_axis, col);
    let nc = col_axis.len();

    let t = (row - row_axis[i]) / (row_axis[i + 1] - row_axis[i]);
    let u = (col - col_axis[j]) / (col_axis[j + 1] - col_axis[j]);

    let g = |r: usize, c: usize| grid[r * nc + c];
    Some(
        (1.0 - t) * (1.0 - u) * g(i, j)
            + t * (1.0 - u) * g(i + 1, j)
            + t * u * g(i + 1, j + 1)
            + (1.0 - t) * u * g(i, j + 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spline_reproduces_knots() {
        let xs = [0.0, 1.0, 2.0, 3.5, 5.0];
        let ys = [1.0, 2.0, 0.5, -1.0, 3.0];
        let y2 = spline_fit(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert!((spline_eval(&xs, &ys, &y2, *x) - y).abs() < 1e-12);
        }
    }

    #[test]
    fn spline_is_exact_for_linear_data() {
        let xs = [0.0, 0.7, 1.9, 3.0, 4.2];
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 1.0).collect();
        let y2 = spline_fit(&xs, &ys).unwrap();
        for y2i in &y2 {
            assert!(y2i.abs() < 1e-12);
        }
        assert!((spline_eval(&xs, &ys, &y2, 2.3) - (3.0 * 2.3 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn spline_fit_rejects_degenerate_input() {
        assert!(spline_fit(&[1.0], &[2.0]).is_none());
        assert!(spline_fit(&[1.0, 2.0], &[2.0]).is_none());
    }

    #[test]
    fn bilinear_exact_on_grid_points_and_lines() {
        let rows = [0.0, 1.0, 2.0];
        let cols = [10.0, 20.0];
        // f(r, c) = 2r + c, linear so bilinear is exact everywhere.
        let grid: Vec<f64> = rows
            .iter()
            .flat_map(|r| cols.iter().map(move |c| 2.0 * r + c))
            .collect();

        assert_eq!(bilinear(&rows, &cols, &grid, 1.0, 20.0), Some(22.0));
        assert_eq!(bilinear(&rows, &cols, &grid, 0.5, 10.0), Some(11.0));
        let v = bilinear(&rows, &cols, &grid, 1.5, 17.0).unwrap();
        assert!((v - 20.0).abs() < 1e-12);
    }

    #[test]
    fn bilinear_rejects_out_of_range() {
        let rows = [0.0, 1.0];
        let cols = [0.0, 1.0];
        let grid = [0.0, 1.0, 2.0, 3.0];
        assert!(bilinear(&rows, &cols, &grid, 1.001, 0.5).is_none());
        assert!(bilinear(&rows, &cols, &grid, 0.5, -0.001).is_none());
        assert!(bilinear(&rows, &cols, &grid, 1.0, 1.0).is_some());
    }
}
