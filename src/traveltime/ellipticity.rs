//! Ellipticity corrections after Dziewonski & Gilbert, with the
//! Kennett & Gudmundsson (1996) tau coefficient tables.
//!
//! The correction at geocentric co-latitude θ and event-to-station azimuth ζ:
//!
//! ```text
//! dt = ¼(1 + 3cos2θ)·τ₀ + (√3/2)·sin2θ·cosζ·τ₁ + (√3/2)·sin²θ·cos2ζ·τ₂
//! ```
//!
//! Phase names are matched against the canonical class enumeration of the
//! published tables. Diffracted and core phases alias across distance: a "P"
//! reported beyond 100° is corrected as Pdif, and beyond 165° as PKPdf, with
//! the same scheme for S and the depth-phase variants. An unmatched
//! phase/distance combination contributes a **zero** correction — never a
//! failure.

use crate::geo::geocentric_colatitude;
use crate::interp::bilinear;
use crate::tables::{EllipticityEntry, EllipticityTable};

/// Canonical phase classes of the Kennett & Gudmundsson (1996) tables.
pub const PHASE_CLASSES: [&str; 57] = [
    "P", "Pdif", "PP", "PPP", "PcP", "PcS", "PKPab", "PKPbc", "PKPdf", "PKiKP",
    "PKKPab", "PKKPbc", "PKKPdf", "PKSab", "PKSbc", "PKSdf", "PKKSab", "PKKSbc", "PKKSdf",
    "pP", "pPdif", "pPKPab", "pPKPbc", "pPKPdf", "pPKiKP", "pS", "pSKSac", "pSKSdf",
    "sP", "sPdif", "sPKPab", "sPKPbc", "sPKPdf", "sPKiKP", "sS", "sSdif", "sSKSac", "sSKSdf",
    "S", "Sdif", "SS", "SSS", "ScP", "ScS", "SKSac", "SKSdf", "SKPab", "SKPbc", "SKPdf",
    "SKiKP", "SKKPab", "SKKPbc", "SKKPdf", "SKKSac", "SKKSdf", "SP", "PS",
];

/// Resolve a working phase code and distance to a canonical table class.
///
/// Returns `None` for phases outside the enumeration; the caller treats
/// that as a zero correction.
pub fn canonical_class(phase: &str, delta: f64) -> Option<&'static str> {
    // Distance-conditioned aliases: mantle phases diffract past ~100° and
    // are superseded by the core branches past ~165°.
    let resolved = match phase {
        "P" | "Pdif" | "Pdiff" => {
            if delta < 100.0 {
                "P"
            } else if delta < 165.0 {
                "Pdif"
            } else {
                "PKPdf"
            }
        }
        "S" | "Sdif" | "Sdiff" => {
            if delta < 100.0 {
                "S"
            } else if delta < 165.0 {
                "Sdif"
            } else {
                "SKSac"
            }
        }
        "pP" | "pPdif" | "pPdiff" => {
            if delta < 100.0 {
                "pP"
            } else if delta < 165.0 {
                "pPdif"
            } else {
                "pPKPdf"
            }
        }
        "sP" | "sPdif" | "sPdiff" => {
            if delta < 100.0 {
                "sP"
            } else if delta < 165.0 {
                "sPdif"
            } else {
                "sPKPdf"
            }
        }
        "sS" | "sSdif" | "sSdiff" => {
            if delta < 100.0 {
                "sS"
            } else if delta < 165.0 {
                "sSdif"
            } else {
                "sSKSac"
            }
        }
        // The water-surface reflection shares pP's path geometry.
        "pwP" => "pP",
        other => other,
    };

    PHASE_CLASSES.iter().find(|&&c| c == resolved).copied()
}

/// Interpolate one tau grid, clamped to the table edges (the published grids
/// stop short of some phases' full distance ranges; edge values extend).
fn tau_lookup(entry: &EllipticityEntry, grid: &[f64], delta: f64, depth: f64) -> f64 {
    let d = delta.clamp(entry.deltas[0], *entry.deltas.last().unwrap());
    let h = depth.clamp(entry.depths[0], *entry.depths.last().unwrap());
    bilinear(&entry.depths, &entry.deltas, grid, h, d).unwrap_or(0.0)
}

/// Ellipticity correction in seconds for a phase observed at `delta` degrees
/// from an epicentre at geographic latitude `ev_lat`, along azimuth `esaz`.
///
/// Zero when the phase/distance combination has no tabulated class.
pub fn ellipticity_correction(
    table: &EllipticityTable,
    phase: &str,
    delta: f64,
    depth: f64,
    ev_lat: f64,
    esaz: f64,
) -> f64 {
    let Some(class) = canonical_class(phase, delta) else {
        return 0.0;
    };
    let Some(entry) = table.get(class) else {
        return 0.0;
    };

    let colat = geocentric_colatitude(ev_lat);
    let azim = esaz.to_radians();

    let sc0 = 0.25 * (1.0 + 3.0 * (2.0 * colat).cos());
    let sc1 = 3f64.sqrt() / 2.0 * (2.0 * colat).sin();
    let sc2 = 3f64.sqrt() / 2.0 * colat.sin() * colat.sin();

    let tau0 = tau_lookup(entry, &entry.tau0, delta, depth);
    let tau1 = tau_lookup(entry, &entry.tau1, delta, depth);
    let tau2 = tau_lookup(entry, &entry.tau2, delta, depth);

    sc0 * tau0 + sc1 * azim.cos() * tau1 + sc2 * (2.0 * azim).cos() * tau2
}
