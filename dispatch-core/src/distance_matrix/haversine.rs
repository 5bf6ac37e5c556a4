//! Local great-circle matrix.

use geo::Coord;

use super::{DistanceMatrix, DistanceMatrixError, DistanceMatrixProvider, Leg};
use crate::geo_math::distance_between;

/// Driving minutes budgeted per kilometre when no road data is available.
pub const MINUTES_PER_KM: f64 = 2.0;

/// Duration estimate for a leg of `distance_km`: `round(distance_km * 2)`.
///
/// # Examples
/// ```
/// use dispatch_core::estimated_leg_minutes;
///
/// assert_eq!(estimated_leg_minutes(1.3), 3);
/// assert_eq!(estimated_leg_minutes(0.2), 0);
/// ```
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "float-to-int `as` saturates and maps NaN to zero"
)]
pub fn estimated_leg_minutes(distance_km: f64) -> u32 {
    (distance_km * MINUTES_PER_KM).round() as u32
}

/// Distance matrix computed from haversine distances.
///
/// Never fails for non-empty input.
#[derive(Debug, Default, Clone, Copy)]
pub struct HaversineMatrix;

impl HaversineMatrix {
    /// Leg between two coordinates.
    #[must_use]
    pub fn leg(from: Coord<f64>, to: Coord<f64>) -> Leg {
        let distance_km = distance_between(from, to);
        Leg {
            distance_km,
            duration_minutes: estimated_leg_minutes(distance_km),
        }
    }
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        if points.is_empty() {
            return Err(DistanceMatrixError::EmptyInput);
        }
        Ok(points
            .iter()
            .map(|&from| points.iter().map(|&to| Self::leg(from, to)).collect())
            .collect())
    }
}
