//! Network geometry quality metrics from the azimuthal distribution of
//! defining stations.
//!
//! Three numbers summarize how well a network surrounds an epicentre:
//! the primary azimuthal gap (largest wedge with no station), the secondary
//! gap (largest wedge after removing any single station), and dU, a [0, 1]
//! measure of how far the sorted azimuths deviate from a perfectly uniform
//! spread (0 = uniform ring, →1 = all stations in one bearing).
//!
//! The NA search uses dU for one documented heuristic: with more than 30
//! associated phases and dU < 0.7 the network is large and well distributed
//! enough that correlated-error handling buys nothing and is switched off
//! for the search.

/// Azimuthal coverage metrics; see module docs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkQuality {
    /// Uniformity of the azimuthal distribution, [0, 1).
    pub du: f64,
    /// Primary azimuthal gap, degrees.
    pub gap: f64,
    /// Secondary azimuthal gap (one station removed), degrees.
    pub sgap: f64,
}

/// Compute dU, gap and sgap from event-to-station azimuths (degrees).
///
/// A single azimuth (or none) leaves the ring uncovered: gap and sgap are
/// 360 and dU is 1.
pub fn du_gap_sgap(azimuths: &[f64]) -> NetworkQuality {
    let n = azimuths.len();
    if n < 2 {
        return NetworkQuality {
            du: 1.0,
            gap: 360.0,
            sgap: 360.0,
        };
    }

    let mut az: Vec<f64> = azimuths.iter().map(|a| a.rem_euclid(360.0)).collect();
    az.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // Primary gap: largest difference between adjacent azimuths, including
    // the wraparound interval.
    let mut gap = 0.0f64;
    for i in 0..n {
        let next = if i + 1 == n { az[0] + 360.0 } else { az[i + 1] };
        gap = gap.max(next - az[i]);
    }

    // Secondary gap: for each station, the gap spanned when it is skipped;
    // the largest such span is what a single faulty station could open up.
    let mut sgap = 0.0f64;
    for i in 0..n {
        let prev = if i == 0 { az[n - 1] - 360.0 } else { az[i - 1] };
        let next = if i + 1 == n { az[0] + 360.0 } else { az[i + 1] };
        sgap = sgap.max(next - prev);
    }

    // dU: mean absolute deviation of the sorted azimuths from the uniform
    // ring anchored at the first station, normalized to [0, 1).
    let mut du = 0.0f64;
    for (i, a) in az.iter().enumerate() {
        let uniform = az[0] + 360.0 * i as f64 / n as f64;
        du += (a - uniform).abs();
    }
    du *= 2.0 / (360.0 * n as f64);

    NetworkQuality { du, gap, sgap }
}
