use nalgebra::{Matrix3, Point3, Vector3};

/// An evaluator's answer for one configuration, in SI units.
///
/// `energy` in joules, `forces` in newtons (one per atom, same order as the
/// positions), `virial` in joules. `extra` is an opaque string relayed to the
/// server verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceResult {
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
    pub virial: Matrix3<f64>,
    pub extra: String,
}

impl ForceResult {
    /// A result with a zero virial and no extra information.
    pub fn new(energy: f64, forces: Vec<Vector3<f64>>) -> Self {
        Self {
            energy,
            forces,
            virial: Matrix3::zeros(),
            extra: String::new(),
        }
    }

    pub fn with_virial(mut self, virial: Matrix3<f64>) -> Self {
        self.virial = virial;
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }
}

/// Computes the virial tensor `Σ rᵢ ⊗ fᵢ` from positions and forces.
///
/// Extra entries of the longer slice are ignored.
pub fn virial_from_forces(positions: &[Point3<f64>], forces: &[Vector3<f64>]) -> Matrix3<f64> {
    positions
        .iter()
        .zip(forces)
        .fold(Matrix3::zeros(), |acc, (r, f)| acc + r.coords * f.transpose())
}
