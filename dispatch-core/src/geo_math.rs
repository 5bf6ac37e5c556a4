//! Great-circle distance helpers.
//!
//! Distances are computed with the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_KM`]. Coordinates follow the `geo` convention used across
//! the workspace: `x = longitude`, `y = latitude`, both in degrees.
//!
//! The functions are total over `f64`: malformed inputs such as `NaN`
//! propagate into the result instead of panicking. Callers that accept
//! untrusted coordinates should validate them with [`checked_coord`] first.

use std::f64::consts::PI;

use geo::Coord;
use thiserror::Error;

/// Mean Earth radius used for every distance in the engine.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Convert degrees to radians.
///
/// # Examples
/// ```
/// use dispatch_core::geo_math::to_radians;
///
/// assert!((to_radians(180.0) - std::f64::consts::PI).abs() < 1e-12);
/// ```
#[must_use]
pub fn to_radians(degrees: f64) -> f64 {
    degrees * (PI / 180.0)
}

/// Haversine distance in kilometres between two latitude/longitude pairs.
///
/// # Examples
/// ```
/// use dispatch_core::geo_math::distance_km;
///
/// // Cairo to Alexandria.
/// let km = distance_km(30.0444, 31.2357, 31.2001, 29.9187);
/// assert!((km - 183.0).abs() < 1.0);
/// ```
#[must_use]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = to_radians(lat2 - lat1);
    let d_lon = to_radians(lon2 - lon1);

    let half_lat = (d_lat / 2.0).sin();
    let half_lon = (d_lon / 2.0).sin();
    let a = half_lat * half_lat
        + to_radians(lat1).cos() * to_radians(lat2).cos() * half_lon * half_lon;

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Haversine distance in kilometres between two `geo` coordinates.
#[must_use]
pub fn distance_between(from: Coord<f64>, to: Coord<f64>) -> f64 {
    distance_km(from.y, from.x, to.y, to.x)
}

/// Reasons a latitude/longitude pair is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    /// Latitude was NaN, infinite or outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    /// Longitude was NaN, infinite or outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Validate a latitude/longitude pair and build a coordinate.
///
/// # Examples
/// ```
/// use dispatch_core::geo_math::{CoordinateError, checked_coord};
///
/// let coord = checked_coord(30.0444, 31.2357)?;
/// assert_eq!(coord.y, 30.0444);
/// assert!(checked_coord(f64::NAN, 0.0).is_err());
/// # Ok::<(), CoordinateError>(())
/// ```
pub fn checked_coord(latitude: f64, longitude: f64) -> Result<Coord<f64>, CoordinateError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(CoordinateError::Latitude(latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(CoordinateError::Longitude(longitude));
    }
    Ok(Coord {
        x: longitude,
        y: latitude,
    })
}
