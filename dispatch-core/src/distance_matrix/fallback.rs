//! Remote-first matrix selection with local fallback.

use geo::Coord;
use log::warn;

use super::{DistanceMatrix, DistanceMatrixError, DistanceMatrixProvider, HaversineMatrix};

/// Try an optional primary provider and fall back to [`HaversineMatrix`].
///
/// Any primary error, including a wrongly sized answer, is logged and the
/// local matrix is returned instead. Without a primary the result is exactly
/// the local computation.
#[derive(Debug, Clone)]
pub struct FallbackMatrix<P> {
    primary: Option<P>,
    local: HaversineMatrix,
}

impl FallbackMatrix<HaversineMatrix> {
    /// Selector that only ever computes locally.
    #[must_use]
    pub const fn local_only() -> Self {
        Self {
            primary: None,
            local: HaversineMatrix,
        }
    }
}

impl<P: DistanceMatrixProvider> FallbackMatrix<P> {
    /// Selector that consults `primary` first.
    #[must_use]
    pub fn with_primary(primary: P) -> Self {
        Self {
            primary: Some(primary),
            local: HaversineMatrix,
        }
    }

    /// Whether a remote provider is configured.
    #[must_use]
    pub const fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Resolve the matrix for `points`, never surfacing a primary failure.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceMatrixError::EmptyInput`] when `points` is empty.
    pub fn resolve(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        if points.is_empty() {
            return Err(DistanceMatrixError::EmptyInput);
        }
        if let Some(primary) = &self.primary {
            match primary.matrix(points).and_then(|m| check_square(m, points.len())) {
                Ok(matrix) => return Ok(matrix),
                Err(err) => warn!("remote distance matrix failed, using haversine: {err}"),
            }
        }
        self.local.matrix(points)
    }
}

impl<P: DistanceMatrixProvider> DistanceMatrixProvider for FallbackMatrix<P> {
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        self.resolve(points)
    }
}

fn check_square(matrix: DistanceMatrix, n: usize) -> Result<DistanceMatrix, DistanceMatrixError> {
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(DistanceMatrixError::DimensionMismatch {
            expected: n,
            rows: matrix.len(),
        });
    }
    Ok(matrix)
}
