//! Station elevation and depth-phase bounce-point corrections.
//!
//! Both corrections are ray-geometry terms built from the horizontal
//! slowness: a wave arriving with slowness p at a surface of velocity v
//! makes an incidence angle with cos i = √(1 − (pv)²), and the extra (or
//! saved) vertical path length h costs h·cos i / v seconds.

use crate::geo::{point_at_delta_azimuth, KM_PER_DEG};
use crate::tables::TopographyGrid;

/// Surface P velocity, km/s (ak135 crust).
pub const P_SURFACE_VEL: f64 = 5.8;
/// Surface S velocity, km/s (ak135 crust).
pub const S_SURFACE_VEL: f64 = 3.46;
/// Water sound speed, km/s, for the pwP water-column term.
pub const WATER_VEL: f64 = 1.5;
/// Minimum water depth (km) for a pwP water-column correction.
pub const MIN_WATER_DEPTH: f64 = 1.5;

/// Wave type of a ray leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveType {
    P,
    S,
}

impl WaveType {
    pub fn surface_velocity(self) -> f64 {
        match self {
            WaveType::P => P_SURFACE_VEL,
            WaveType::S => S_SURFACE_VEL,
        }
    }
}

/// Wave type of the last leg: the last uppercase P or S in the phase code
/// ("PcS" arrives as S, "SKP" as P). `None` for codes with neither.
pub fn last_leg(phase: &str) -> Option<WaveType> {
    phase.bytes().rev().find_map(|b| match b {
        b'P' => Some(WaveType::P),
        b'S' => Some(WaveType::S),
        _ => None,
    })
}

/// Wave type of the first (upgoing) leg of a depth phase: the lowercase
/// prefix letter.
fn first_leg(phase: &str) -> Option<WaveType> {
    match phase.as_bytes().first() {
        Some(b'p') => Some(WaveType::P),
        Some(b's') => Some(WaveType::S),
        _ => None,
    }
}

/// Wave type of the surface-reflected downgoing leg of a depth phase: the
/// first uppercase P or S after the prefix.
fn reflected_leg(phase: &str) -> Option<WaveType> {
    phase.bytes().find_map(|b| match b {
        b'P' => Some(WaveType::P),
        b'S' => Some(WaveType::S),
        _ => None,
    })
}

/// cos(incidence) for horizontal slowness `p_km` (s/km) at velocity `v`
/// (km/s), with the radicand clipped so grazing rays never go complex.
#[inline]
fn cos_incidence(p_km: f64, v: f64) -> f64 {
    (1.0 - (p_km * v).powi(2).min(1.0)).sqrt()
}

/// Station elevation correction, seconds.
///
/// Positive for stations above sea level: the ray travels an extra
/// `elev·cos i / v` through near-surface material of the last leg's type.
/// Zero when the phase code names no P/S leg.
pub fn elevation_correction(phase: &str, station_elev_m: f64, dtdd: f64) -> f64 {
    let Some(wave) = last_leg(phase) else {
        return 0.0;
    };
    let v = wave.surface_velocity();
    let p_km = dtdd.abs() / KM_PER_DEG;
    station_elev_m / 1000.0 * cos_incidence(p_km, v) / v
}

/// Bounce-point topography/bathymetry correction for a depth phase, seconds.
///
/// The bounce point lies `bpdel` degrees from the epicentre along the
/// event-to-station azimuth (flipped 180° when the slowness is negative,
/// i.e. the ray leaves in the back direction). Elevation there shifts the
/// reflection surface away from the reference ellipsoid:
///
/// - `pP…`: both legs P at the bounce point — `2h·cos i_P / v_P`
/// - `sS…`: both legs S — `2h·cos i_S / v_S`
/// - `pS…`/`sP…`: one leg each — `h·(cos i_P / v_P + cos i_S / v_S)`
///
/// For `pwP` the reflection is at the sea surface; when the water column at
/// the bounce point is deeper than [`MIN_WATER_DEPTH`] km the two-way
/// transit through the water is added as well.
pub fn bounce_point_correction(
    topo: &TopographyGrid,
    phase: &str,
    ev_lat: f64,
    ev_lon: f64,
    esaz: f64,
    bpdel: f64,
    dtdd: f64,
) -> f64 {
    let (Some(up), Some(down)) = (first_leg(phase), reflected_leg(phase)) else {
        return 0.0;
    };

    let azim = if dtdd < 0.0 {
        (esaz + 180.0).rem_euclid(360.0)
    } else {
        esaz
    };
    let (bp_lat, bp_lon) = point_at_delta_azimuth(ev_lat, ev_lon, bpdel, azim);

    let elev_km = topo.sample(bp_lat, bp_lon) / 1000.0;
    let p_km = dtdd.abs() / KM_PER_DEG;

    let mut corr = match (up, down) {
        (WaveType::P, WaveType::P) => {
            2.0 * elev_km * cos_incidence(p_km, P_SURFACE_VEL) / P_SURFACE_VEL
        }
        (WaveType::S, WaveType::S) => {
            2.0 * elev_km * cos_incidence(p_km, S_SURFACE_VEL) / S_SURFACE_VEL
        }
        _ => {
            elev_km
                * (cos_incidence(p_km, P_SURFACE_VEL) / P_SURFACE_VEL
                    + cos_incidence(p_km, S_SURFACE_VEL) / S_SURFACE_VEL)
        }
    };

    if phase == "pwP" {
        let water_km = -elev_km;
        if water_km > MIN_WATER_DEPTH {
            corr += 2.0 * water_km * cos_incidence(p_km, WATER_VEL) / WATER_VEL;
        }
    }

    corr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TopographyGrid;

    fn flat_grid(elev: i16) -> TopographyGrid {
        TopographyGrid::new(vec![elev; 19 * 37], 19, 37, 90.0, -180.0, 10.0).unwrap()
    }

    #[test]
    fn last_leg_picks_final_uppercase_letter() {
        assert_eq!(last_leg("PcS"), Some(WaveType::S));
        assert_eq!(last_leg("SKP"), Some(WaveType::P));
        assert_eq!(last_leg("pP"), Some(WaveType::P));
        assert_eq!(last_leg("x"), None);
    }

    #[test]
    fn vertical_ray_elevation_correction_is_h_over_v() {
        // dtdd = 0: vertical incidence, cos i = 1.
        let c = elevation_correction("P", 5800.0, 0.0);
        assert!((c - 1.0).abs() < 1e-12);
        let c = elevation_correction("S", 3460.0, 0.0);
        assert!((c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn grazing_ray_correction_clips_to_zero() {
        // Slowness large enough that p·v > 1: radicand clipped, correction 0.
        let c = elevation_correction("P", 1000.0, 40.0);
        assert_eq!(c, 0.0);
    }

    #[test]
    fn pp_bounce_correction_doubles_the_leg() {
        let topo = flat_grid(1000); // 1 km of topography everywhere
        let c = bounce_point_correction(&topo, "pP", 0.0, 0.0, 90.0, 2.0, 0.0);
        assert!((c - 2.0 / P_SURFACE_VEL).abs() < 1e-12);
        let c = bounce_point_correction(&topo, "sS", 0.0, 0.0, 90.0, 2.0, 0.0);
        assert!((c - 2.0 / S_SURFACE_VEL).abs() < 1e-12);
        let c = bounce_point_correction(&topo, "sP", 0.0, 0.0, 90.0, 2.0, 0.0);
        assert!((c - (1.0 / P_SURFACE_VEL + 1.0 / S_SURFACE_VEL)).abs() < 1e-12);
    }

    #[test]
    fn pwp_adds_water_column_below_threshold_depth() {
        let deep = flat_grid(-4000); // 4 km of water
        let shallow = flat_grid(-1000); // 1 km: below the 1.5 km threshold

        let c_shallow = bounce_point_correction(&shallow, "pwP", 0.0, 0.0, 90.0, 2.0, 0.0);
        // Bathymetry term only, no water column.
        assert!((c_shallow - (2.0 * -1.0 / P_SURFACE_VEL)).abs() < 1e-12);

        let c_deep = bounce_point_correction(&deep, "pwP", 0.0, 0.0, 90.0, 2.0, 0.0);
        let expected = 2.0 * -4.0 / P_SURFACE_VEL + 2.0 * 4.0 / WATER_VEL;
        assert!((c_deep - expected).abs() < 1e-12);
    }
}
