//! Spherical-earth helpers used by location-aware table recipes.
//!
//! Everything here is pure and stateless. Angles at the public boundary are in
//! degrees, offsets and distances in meters.

#![forbid(unsafe_code)]

use std::f64::consts::FRAC_PI_2;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.785;

pub type GeodesyResult<T> = Result<T, GeodesyError>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GeodesyError {
    #[error("input length mismatch: `{argument}` has {actual} values, expected {expected}")]
    LengthMismatch {
        argument: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Wrap `x` into the half-open interval `[min, max)`.
fn wrap(x: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    x - ((x - min) / span).floor() * span
}

fn clip_unit(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

/// Point reached by walking `distance_rad` (central angle) from `(lat0, lon0)`
/// along `azimuth_rad` (clockwise from north).
pub fn azidist_to_latlon(lat0: f64, lon0: f64, azimuth_rad: f64, distance_rad: f64) -> (f64, f64) {
    if distance_rad == 0.0 {
        return (lat0, wrap(lon0, -180.0, 180.0));
    }

    let a = distance_rad;
    let b = FRAC_PI_2 - lat0.to_radians();

    let alpha_sign = if azimuth_rad < 0.0 { -1.0 } else { 1.0 };
    let alpha = azimuth_rad * alpha_sign;

    let (sin_a, cos_a) = a.sin_cos();
    let (sin_b, cos_b) = b.sin_cos();

    let cos_c = clip_unit(cos_a * cos_b + sin_a * sin_b * alpha.cos());
    let c = cos_c.acos();
    let sin_c = c.sin();

    // Degenerate at the poles: no longitude change.
    let denom = sin_b * sin_c;
    let gamma = if denom.abs() < 1e-15 {
        0.0
    } else {
        clip_unit((cos_a - cos_b * cos_c) / denom).acos()
    };

    let lat = (FRAC_PI_2 - c).to_degrees();
    let lon = wrap(lon0 + gamma.to_degrees() * alpha_sign, -180.0, 180.0);
    (lat, lon)
}

/// Shift a reference point by a local north/east offset.
pub fn ne_to_latlon_point(lat0: f64, lon0: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let distance_rad = north_m.hypot(east_m) / EARTH_RADIUS_M;
    let azimuth_rad = east_m.atan2(north_m);
    azidist_to_latlon(lat0, lon0, azimuth_rad, distance_rad)
}

/// Vectorized [`ne_to_latlon_point`] over equal-length inputs.
pub fn ne_to_latlon(
    lat0: &[f64],
    lon0: &[f64],
    north_m: &[f64],
    east_m: &[f64],
) -> GeodesyResult<(Vec<f64>, Vec<f64>)> {
    let n = lat0.len();
    for (argument, values) in [("lon0", lon0), ("north_m", north_m), ("east_m", east_m)] {
        if values.len() != n {
            return Err(GeodesyError::LengthMismatch {
                argument,
                expected: n,
                actual: values.len(),
            });
        }
    }

    let mut lats = Vec::with_capacity(n);
    let mut lons = Vec::with_capacity(n);
    for i in 0..n {
        let (lat, lon) = ne_to_latlon_point(lat0[i], lon0[i], north_m[i], east_m[i]);
        lats.push(lat);
        lons.push(lon);
    }
    Ok((lats, lons))
}

/// Local north/east offset (meters) of `(lat, lon)` as seen from `(lat0, lon0)`.
///
/// Inverse of [`ne_to_latlon_point`].
pub fn latlon_to_ne(lat0: f64, lon0: f64, lat: f64, lon: f64) -> (f64, f64) {
    let phi1 = lat0.to_radians();
    let phi2 = lat.to_radians();
    let dlon = (lon - lon0).to_radians();

    // Haversine keeps short distances accurate.
    let h = ((phi2 - phi1) / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (dlon / 2.0).sin().powi(2);
    let distance_rad = 2.0 * h.sqrt().min(1.0).asin();

    let azimuth = (dlon.sin() * phi2.cos())
        .atan2(phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos());

    let distance_m = distance_rad * EARTH_RADIUS_M;
    (distance_m * azimuth.cos(), distance_m * azimuth.sin())
}
