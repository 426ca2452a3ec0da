//! Single-linkage station clustering (SLINK) and the nearest-neighbour
//! station ordering derived from it.
//!
//! Phases from nearby stations have correlated picking errors. Sorting the
//! phase list by a nearest-neighbour station order makes the data covariance
//! matrix block-diagonal, which keeps the projection step well conditioned.
//! The order comes from a single-linkage dendrogram of the station
//! separation matrix:
//!
//! 1. **SLINK** (Sibson 1973) builds the pointer representation in O(n²)
//!    time and O(n) working memory, identical in output to naive
//!    single-linkage clustering.
//! 2. The pointer representation becomes an array of `n − 1` merge nodes,
//!    sorted by ascending link distance, with child links re-derived against
//!    the sorted order and merge heights forced monotone.
//! 3. A tree walk assigns each station a visiting rank: at every merge the
//!    sub-cluster with the smaller existing order keeps its relative
//!    positions and the other sub-cluster is shifted behind it.

use anyhow::{ensure, Result};

use crate::Matrix;

/// A dendrogram child: either an input station or an earlier merge node.
///
/// (The legacy encoding packed both into one integer with negative values
/// meaning "internal node"; the enum removes the off-by-one bookkeeping.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Station(usize),
    Node(usize),
}

/// One internal merge of the single-linkage dendrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterNode {
    pub left: Child,
    pub right: Child,
    /// Single-linkage merge height; non-decreasing with node index.
    pub linkdist: f64,
    /// Number of stations in the subtree rooted here.
    pub leaves: usize,
}

/// Per-station visiting rank produced by the tree walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationOrder {
    /// Index into the original station array.
    pub index: usize,
    /// Nearest-neighbour visiting rank (0-based).
    pub x: usize,
}

// ── SLINK pointer representation ────────────────────────────────────────────

/// Sibson's SLINK: returns `(pointer, lambda)` where station `j` first joins
/// the cluster of station `pointer[j]` at height `lambda[j]`. The last
/// station's lambda is infinite by construction.
fn slink(separation: &Matrix) -> (Vec<usize>, Vec<f64>) {
    let n = separation.nrows();
    let mut pointer = vec![0usize; n];
    let mut lambda = vec![f64::INFINITY; n];
    let mut m = vec![0.0f64; n];

    for i in 0..n {
        pointer[i] = i;
        lambda[i] = f64::INFINITY;
        for j in 0..i {
            m[j] = separation[(i, j)];
        }
        for j in 0..i {
            let p = pointer[j];
            if lambda[j] >= m[j] {
                m[p] = m[p].min(lambda[j]);
                lambda[j] = m[j];
                pointer[j] = i;
            } else {
                m[p] = m[p].min(m[j]);
            }
        }
        for j in 0..i {
            if lambda[j] >= lambda[pointer[j]] {
                pointer[j] = i;
            }
        }
    }

    (pointer, lambda)
}

// ── Dendrogram construction ─────────────────────────────────────────────────

/// Build the sorted merge-node array from a station separation matrix.
///
/// `separation` must be square and symmetric with `n ≥ 1` stations; the
/// result has exactly `n − 1` nodes in ascending `linkdist` order.
pub fn cluster(separation: &Matrix) -> Result<Vec<ClusterNode>> {
    let n = separation.nrows();
    ensure!(n >= 1, "clustering needs at least one station");
    ensure!(
        separation.ncols() == n,
        "separation matrix must be square, got {}x{}",
        n,
        separation.ncols()
    );

    let (pointer, lambda) = slink(separation);

    // Merges in ascending link distance; ties resolved by input index so
    // equal-height merges keep a stable, input-determined order.
    let mut merge_order: Vec<usize> = (0..n.saturating_sub(1)).collect();
    merge_order.sort_by(|&a, &b| {
        lambda[a]
            .partial_cmp(&lambda[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    // Union-find over stations; `current` tracks the subtree that contains
    // each representative after the merges so far.
    let mut parent: Vec<usize> = (0..n).collect();
    let mut current: Vec<Child> = (0..n).map(Child::Station).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    let mut nodes: Vec<ClusterNode> = Vec::with_capacity(n.saturating_sub(1));
    for &j in &merge_order {
        let rl = find(&mut parent, j);
        let rr = find(&mut parent, pointer[j]);
        debug_assert_ne!(rl, rr, "pointer representation merged a cluster with itself");

        let left = current[rl];
        let right = current[rr];

        // Monotonicity: a parent never sits below a child it subsumes.
        let mut linkdist = lambda[j];
        for child in [left, right] {
            if let Child::Node(k) = child {
                linkdist = linkdist.max(nodes[k].linkdist);
            }
        }

        let leaves = child_leaves(&nodes, left) + child_leaves(&nodes, right);
        nodes.push(ClusterNode {
            left,
            right,
            linkdist,
            leaves,
        });

        parent[rl] = rr;
        let rep = find(&mut parent, rr);
        current[rep] = Child::Node(nodes.len() - 1);
    }

    Ok(nodes)
}

fn child_leaves(nodes: &[ClusterNode], child: Child) -> usize {
    match child {
        Child::Station(_) => 1,
        Child::Node(k) => nodes[k].leaves,
    }
}

// ── Tree walk → visiting order ──────────────────────────────────────────────

/// Nearest-neighbour station order for a separation matrix.
///
/// Runs [`cluster`] and walks the merges bottom-up: at every merge the
/// sub-cluster whose representative holds the smaller existing rank keeps
/// its relative positions (ties to the earlier-merged subtree) and the other
/// sub-cluster's members are shifted behind it by the keeper's member count.
/// The result is sorted by rank, i.e. it *is* the visiting sequence.
pub fn nearest_neighbour_order(separation: &Matrix) -> Result<Vec<StationOrder>> {
    let n = separation.nrows();
    let nodes = cluster(separation)?;

    let mut rank = vec![0usize; n];
    // Member lists per live cluster, keyed by the cluster's newest node.
    let mut members: Vec<Vec<usize>> = Vec::with_capacity(nodes.len());

    for node in &nodes {
        let left = take_members(&mut members, node.left);
        let right = take_members(&mut members, node.right);

        // Smaller existing rank keeps its positions; equal ranks favour the
        // left (earlier-merged) subtree.
        let (keep, shift) = if rank[right[0]] < rank[left[0]] {
            (right, left)
        } else {
            (left, right)
        };

        for &station in &shift {
            rank[station] += keep.len();
        }

        let mut merged = keep;
        merged.extend_from_slice(&shift);
        members.push(merged);
    }

    let mut order: Vec<StationOrder> = (0..n).map(|i| StationOrder { index: i, x: rank[i] }).collect();
    order.sort_by_key(|s| (s.x, s.index));
    Ok(order)
}

fn take_members(members: &mut [Vec<usize>], child: Child) -> Vec<usize> {
    match child {
        Child::Station(i) => vec![i],
        Child::Node(k) => std::mem::take(&mut members[k]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sep(entries: &[&[f64]]) -> Matrix {
        let n = entries.len();
        Matrix::from_fn(n, n, |i, j| entries[i][j])
    }

    /// Four stations on a line at 0, 1, 10, 12.
    fn line_matrix() -> Matrix {
        let pos: [f64; 4] = [0.0, 1.0, 10.0, 12.0];
        Matrix::from_fn(4, 4, |i, j| (pos[i] - pos[j]).abs())
    }

    #[test]
    fn merge_heights_match_single_linkage() {
        let nodes = cluster(&line_matrix()).unwrap();
        assert_eq!(nodes.len(), 3);
        // Single linkage: {0,1} at 1, {2,3} at 2, then the two groups at 9.
        let mut heights: Vec<f64> = nodes.iter().map(|n| n.linkdist).collect();
        heights.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(heights, vec![1.0, 2.0, 9.0]);
    }

    #[test]
    fn link_distances_are_monotone() {
        let m = sep(&[
            &[0.0, 3.0, 8.0, 1.0, 6.0],
            &[3.0, 0.0, 2.0, 4.0, 9.0],
            &[8.0, 2.0, 0.0, 7.0, 5.0],
            &[1.0, 4.0, 7.0, 0.0, 3.5],
            &[6.0, 9.0, 5.0, 3.5, 0.0],
        ]);
        let nodes = cluster(&m).unwrap();
        for w in nodes.windows(2) {
            assert!(w[0].linkdist <= w[1].linkdist);
        }
        // And no parent below its own internal children.
        for node in &nodes {
            for child in [node.left, node.right] {
                if let Child::Node(k) = child {
                    assert!(nodes[k].linkdist <= node.linkdist);
                }
            }
        }
    }

    #[test]
    fn leaf_counts_aggregate_to_n() {
        let nodes = cluster(&line_matrix()).unwrap();
        assert_eq!(nodes.last().unwrap().leaves, 4);
    }

    #[test]
    fn visiting_order_keeps_near_stations_adjacent() {
        let order = nearest_neighbour_order(&line_matrix()).unwrap();
        assert_eq!(order.len(), 4);
        // Ranks are a permutation of 0..4.
        let mut ranks: Vec<usize> = order.iter().map(|s| s.x).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![0, 1, 2, 3]);

        // Stations 0,1 (separation 1) and 2,3 (separation 2) must be
        // adjacent in the visiting sequence.
        let seq: Vec<usize> = order.iter().map(|s| s.index).collect();
        let pos = |i: usize| seq.iter().position(|&s| s == i).unwrap();
        assert_eq!(pos(0).abs_diff(pos(1)), 1);
        assert_eq!(pos(2).abs_diff(pos(3)), 1);
    }

    #[test]
    fn single_station_is_trivially_ordered() {
        let m = Matrix::zeros(1, 1);
        assert!(cluster(&m).unwrap().is_empty());
        let order = nearest_neighbour_order(&m).unwrap();
        assert_eq!(order, vec![StationOrder { index: 0, x: 0 }]);
    }
}
