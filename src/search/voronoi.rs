//! Exact 1-D Voronoi-cell geometry for the NA axis walk.
//!
//! The resampling walk moves through a Voronoi cell one axis at a time. For
//! the line through the current point parallel to an axis, the intersection
//! with the cell is an interval bounded by perpendicular bisectors against
//! every other ensemble point. Computing those bisectors needs, per ensemble
//! point, its squared distance to the line — i.e. the full squared distance
//! *minus* the component along the walked axis. That list is seeded once per
//! walk and updated incrementally as the walk turns to the next axis, which
//! keeps one axis step at O(ensemble) instead of O(ensemble × dims).

/// Squared distances from each ensemble point to the line through `xcur`
/// parallel to `axis` (the axis component is excluded).
pub fn seed_dlist(models: &[Vec<f64>], xcur: &[f64], axis: usize) -> Vec<f64> {
    models
        .iter()
        .map(|m| {
            m.iter()
                .zip(xcur.iter())
                .enumerate()
                .filter(|&(k, _)| k != axis)
                .map(|(_, (a, b))| (a - b) * (a - b))
                .sum()
        })
        .collect()
}

/// Update `dlist` when the walk turns from `prev_axis` to `axis`.
///
/// `xcur` must already hold the new coordinate on `prev_axis`: that axis
/// component re-enters the distance, while the new axis component leaves it.
pub fn update_dlist(
    dlist: &mut [f64],
    models: &[Vec<f64>],
    xcur: &[f64],
    prev_axis: usize,
    axis: usize,
) {
    for (d, m) in dlist.iter_mut().zip(models.iter()) {
        let back_in = m[prev_axis] - xcur[prev_axis];
        let back_out = m[axis] - xcur[axis];
        *d += back_in * back_in - back_out * back_out;
    }
}

/// Intersection of the Voronoi cell of `models[cell]` with the axis line.
///
/// Returns `(lo, hi)` inside `range`, computed from the perpendicular
/// bisectors between the cell point and every other ensemble point. Ensemble
/// points with the same axis coordinate as the cell point have an axis-
/// parallel bisector and never bound the interval.
pub fn axis_intersection(
    models: &[Vec<f64>],
    dlist: &[f64],
    cell: usize,
    axis: usize,
    range: (f64, f64),
) -> (f64, f64) {
    let ca = models[cell][axis];
    let dc = dlist[cell];

    let (mut lo, mut hi) = range;
    for (j, m) in models.iter().enumerate() {
        if j == cell {
            continue;
        }
        let dx = ca - m[axis];
        if dx == 0.0 {
            continue;
        }
        let xi = 0.5 * (ca + m[axis] + (dlist[j] - dc) / dx);
        if dx > 0.0 {
            // The other point lies below the cell point on this axis: the
            // cell keeps everything above the bisector.
            if xi > lo {
                lo = xi;
            }
        } else if xi < hi {
            hi = xi;
        }
    }

    (lo, hi)
}
