use nalgebra::Matrix3;

/// The periodic simulation box, in meters.
///
/// `matrix` holds the nine cell components in the order the server sends them
/// (row-major); `inverse` is its matrix inverse, in inverse meters. Both arrive
/// with every POSDATA message and are never carried over from an earlier step.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationCell {
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl SimulationCell {
    /// Builds a cell from its matrix, computing the inverse.
    ///
    /// Returns `None` for a singular matrix.
    pub fn new(matrix: Matrix3<f64>) -> Option<Self> {
        matrix.try_inverse().map(|inverse| Self { matrix, inverse })
    }

    /// Builds a cell from a matrix and the inverse supplied alongside it.
    pub fn from_parts(matrix: Matrix3<f64>, inverse: Matrix3<f64>) -> Self {
        Self { matrix, inverse }
    }

    /// A cubic box with edge length `edge`.
    pub fn cubic(edge: f64) -> Self {
        let matrix = Matrix3::from_diagonal_element(edge);
        let inverse = Matrix3::from_diagonal_element(1.0 / edge);
        Self { matrix, inverse }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Rescales lengths by `factor`: the matrix is multiplied, the inverse divided.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            matrix: self.matrix * factor,
            inverse: self.inverse / factor,
        }
    }
}
