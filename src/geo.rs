//! Spherical geometry leaves: epicentral distance, azimuth, destination
//! points, and the geographic→geocentric latitude conversion used by the
//! ellipticity correction.
//!
//! Distances (delta) and azimuths are in **degrees** throughout, matching the
//! travel-time table axes; azimuth is measured clockwise from north.

/// Earth flattening used for the geographic→geocentric conversion.
pub const FLATTENING: f64 = 1.0 / 298.257;

/// Mean kilometres per degree of arc at the surface.
pub const KM_PER_DEG: f64 = 111.195;

/// Epicentral distance (degrees) and forward azimuth (degrees, clockwise from
/// north) from point 1 to point 2, both given as geographic (lat, lon) degrees.
///
/// Spherical formulas; the ellipticity of the path itself is handled
/// downstream by the travel-time corrections, not here.
pub fn delta_azimuth(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let (sin_phi2, cos_phi2) = phi2.sin_cos();
    let (sin_dlon, cos_dlon) = dlon.sin_cos();

    let cos_delta =
        (sin_phi1 * sin_phi2 + cos_phi1 * cos_phi2 * cos_dlon).clamp(-1.0, 1.0);
    let delta = cos_delta.acos();

    // Azimuth undefined at coincident or antipodal points; report 0.
    let y = sin_dlon * cos_phi2;
    let x = cos_phi1 * sin_phi2 - sin_phi1 * cos_phi2 * cos_dlon;
    let azim = if y == 0.0 && x == 0.0 {
        0.0
    } else {
        y.atan2(x).to_degrees().rem_euclid(360.0)
    };

    (delta.to_degrees(), azim)
}

/// Destination point: starting at (lat, lon), travel `delta` degrees of arc
/// along `azimuth` degrees. Returns geographic (lat, lon) in degrees with
/// longitude normalized to [-180, 180).
pub fn point_at_delta_azimuth(lat: f64, lon: f64, delta: f64, azimuth: f64) -> (f64, f64) {
    let phi1 = lat.to_radians();
    let d = delta.to_radians();
    let az = azimuth.to_radians();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let (sin_d, cos_d) = d.sin_cos();

    let sin_phi2 = (sin_phi1 * cos_d + cos_phi1 * sin_d * az.cos()).clamp(-1.0, 1.0);
    let phi2 = sin_phi2.asin();
    let dlon = (az.sin() * sin_d * cos_phi1).atan2(cos_d - sin_phi1 * sin_phi2);

    let lat2 = phi2.to_degrees();
    let lon2 = (lon + dlon.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (lat2, lon2)
}

/// Geographic latitude (degrees) → geocentric co-latitude (radians).
///
/// The Dziewonski–Gilbert ellipticity formula is written in geocentric
/// co-latitude; `tan(lat_gc) = (1 - f)^2 tan(lat)`.
pub fn geocentric_colatitude(lat_deg: f64) -> f64 {
    let lat = lat_deg.to_radians();
    let gc = ((1.0 - FLATTENING) * (1.0 - FLATTENING) * lat.tan()).atan();
    std::f64::consts::FRAC_PI_2 - gc
}

/// Locate `x` in the ascending slice `xs`: returns the index `i` such that
/// `xs[i] <= x < xs[i + 1]`, clamped to `[0, xs.len() - 2]`.
///
/// Callers must ensure `xs.len() >= 2`; out-of-range queries clamp to the
/// edge interval (the interpolation layer does its own range checks first).
pub fn bracket(xs: &[f64], x: f64) -> usize {
    debug_assert!(xs.len() >= 2);
    match xs.partition_point(|&v| v <= x) {
        0 => 0,
        p => (p - 1).min(xs.len() - 2),
    }
}
