//! Test utilities for distance matrix providers.
//!
//! [`StubDistanceMatrixProvider`] returns pre-configured answers without
//! making HTTP requests.

use dispatch_core::{DistanceMatrix, DistanceMatrixError, DistanceMatrixProvider, Leg};
use geo::Coord;

/// Stub `DistanceMatrixProvider` for testing.
///
/// # Example
///
/// ```
/// use dispatch_core::{DistanceMatrixProvider, Leg};
/// use dispatch_data::routing::test_support::StubDistanceMatrixProvider;
/// use geo::Coord;
///
/// let provider = StubDistanceMatrixProvider::with_uniform_legs(2, 1.5, 4);
/// let points = [Coord { x: 31.2, y: 30.0 }, Coord { x: 31.3, y: 30.1 }];
///
/// let matrix = provider.matrix(&points).expect("stub matrix");
/// assert_eq!(matrix[0][0], Leg::ZERO);
/// assert_eq!(matrix[0][1].duration_minutes, 4);
/// ```
#[derive(Debug, Clone)]
pub struct StubDistanceMatrixProvider {
    response: StubResponse,
}

#[derive(Debug, Clone)]
enum StubResponse {
    Matrix(DistanceMatrix),
    Error(DistanceMatrixError),
}

impl StubDistanceMatrixProvider {
    /// Create a provider that returns the given matrix for any non-empty input.
    #[must_use]
    pub fn with_matrix(matrix: DistanceMatrix) -> Self {
        Self {
            response: StubResponse::Matrix(matrix),
        }
    }

    /// Create a provider that returns the given error for any non-empty
    /// input. Empty input still returns `DistanceMatrixError::EmptyInput`.
    #[must_use]
    pub fn with_error(error: DistanceMatrixError) -> Self {
        Self {
            response: StubResponse::Error(error),
        }
    }

    /// Create a provider returning a `size x size` matrix with zero legs on
    /// the diagonal and the same leg everywhere else.
    #[must_use]
    pub fn with_uniform_legs(size: usize, distance_km: f64, duration_minutes: u32) -> Self {
        let leg = Leg {
            distance_km,
            duration_minutes,
        };
        let matrix = (0..size)
            .map(|i| {
                (0..size)
                    .map(|j| if i == j { Leg::ZERO } else { leg })
                    .collect()
            })
            .collect();
        Self::with_matrix(matrix)
    }
}

impl DistanceMatrixProvider for StubDistanceMatrixProvider {
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        if points.is_empty() {
            return Err(DistanceMatrixError::EmptyInput);
        }

        match &self.response {
            StubResponse::Matrix(matrix) => Ok(matrix.clone()),
            StubResponse::Error(error) => Err(error.clone()),
        }
    }
}
