//! Distance-matrix provider trait and the leg cell type.

use geo::Coord;
use serde::{Deserialize, Serialize};

use super::error::DistanceMatrixError;

/// Cost of travelling one leg between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Travel distance in kilometres.
    pub distance_km: f64,
    /// Travel time in whole minutes.
    pub duration_minutes: u32,
}

impl Leg {
    /// A zero-cost leg, used on the matrix diagonal.
    pub const ZERO: Self = Self {
        distance_km: 0.0,
        duration_minutes: 0,
    };
}

/// Square adjacency matrix of legs.
pub type DistanceMatrix = Vec<Vec<Leg>>;

/// Fetch pairwise leg costs for a set of coordinates.
///
/// Implementers must return a square `n x n` matrix where `n == points.len()`.
/// `matrix[i][j]` is the leg from `points[i]` to `points[j]`. Coordinates use
/// `x = longitude` and `y = latitude`.
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use dispatch_core::{DistanceMatrix, DistanceMatrixError, DistanceMatrixProvider, Leg};
///
/// struct FlatProvider;
///
/// impl DistanceMatrixProvider for FlatProvider {
///     fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
///         if points.is_empty() {
///             return Err(DistanceMatrixError::EmptyInput);
///         }
///         let leg = Leg { distance_km: 1.0, duration_minutes: 2 };
///         Ok(vec![vec![leg; points.len()]; points.len()])
///     }
/// }
///
/// let matrix = FlatProvider.matrix(&[Coord { x: 31.2, y: 30.0 }])?;
/// assert_eq!(matrix.len(), 1);
/// # Ok::<(), DistanceMatrixError>(())
/// ```
pub trait DistanceMatrixProvider {
    /// Return the leg matrix for `points`.
    ///
    /// Implementations must return `Err(DistanceMatrixError::EmptyInput)` when
    /// `points` is empty.
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError>;
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for &P {
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        (**self).matrix(points)
    }
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for Box<P> {
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        (**self).matrix(points)
    }
}
