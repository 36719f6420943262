use super::{EvaluationError, Evaluator};
use crate::core::models::configuration::AtomicConfiguration;
use crate::core::models::forces::{ForceResult, virial_from_forces};
use crate::core::units::{self, ANGSTROM, Unit};
use nalgebra::Vector3;
use tracing::debug;

/// Tethers every atom to the origin with an isotropic spring.
///
/// `E = Σ k |rᵢ|²`, `Fᵢ = -2k rᵢ`. Useful as a stand-in physics backend when
/// exercising a server setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicEvaluator {
    force_constant: f64,
}

impl HarmonicEvaluator {
    /// `force_constant` in J/m².
    pub fn new(force_constant: f64) -> Self {
        Self { force_constant }
    }

    /// `force_constant` in kJ/mol/Å².
    pub fn from_kj_per_mol_angstrom2(force_constant: f64) -> Self {
        let per_molecule = units::to_si(force_constant, Unit::KilojoulePerMole);
        Self::new(per_molecule / (ANGSTROM * ANGSTROM))
    }

    pub fn force_constant(&self) -> f64 {
        self.force_constant
    }
}

impl Evaluator for HarmonicEvaluator {
    fn evaluate(
        &mut self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceResult, EvaluationError> {
        let k = self.force_constant;
        let positions = configuration.positions();
        let energy: f64 = positions.iter().map(|r| k * r.coords.norm_squared()).sum();
        let forces: Vec<Vector3<f64>> = positions.iter().map(|r| -2.0 * k * r.coords).collect();
        let virial = virial_from_forces(positions, &forces);
        Ok(ForceResult::new(energy, forces).with_virial(virial))
    }

    fn on_init(&mut self, replica: i32, info: &str) {
        debug!(replica, info, "Harmonic evaluator initialized.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::SimulationCell;
    use crate::core::units::{AVOGADRO, KILOJOULE};
    use nalgebra::Point3;

    const TOLERANCE: f64 = 1e-12;

    fn configuration(positions: Vec<Point3<f64>>) -> AtomicConfiguration {
        AtomicConfiguration::new(SimulationCell::cubic(1.0), positions)
    }

    #[test]
    fn atom_at_origin_has_zero_energy_and_force() {
        let mut evaluator = HarmonicEvaluator::new(5.0);
        let result = evaluator
            .evaluate(&configuration(vec![Point3::origin()]))
            .unwrap();
        assert_eq!(result.energy, 0.0);
        assert_eq!(result.forces[0], Vector3::zeros());
    }

    #[test]
    fn force_is_negative_gradient_of_energy() {
        let mut evaluator = HarmonicEvaluator::new(2.0);
        let r = Point3::new(0.3, -0.2, 0.5);
        let result = evaluator.evaluate(&configuration(vec![r])).unwrap();

        let h = 1e-6;
        let e = |x: f64| 2.0 * (x * x + r.y * r.y + r.z * r.z);
        let numeric = -(e(r.x + h) - e(r.x - h)) / (2.0 * h);
        assert!((result.forces[0].x - numeric).abs() < 1e-6);
        assert!((result.energy - e(r.x)).abs() < TOLERANCE);
    }

    #[test]
    fn virial_is_outer_product_sum() {
        let mut evaluator = HarmonicEvaluator::new(1.0);
        let result = evaluator
            .evaluate(&configuration(vec![Point3::new(1.0, 0.0, 0.0)]))
            .unwrap();
        assert!((result.virial[(0, 0)] + 2.0).abs() < TOLERANCE);
        assert_eq!(result.virial[(1, 1)], 0.0);
    }

    #[test]
    fn molar_force_constant_is_converted_to_si() {
        let evaluator = HarmonicEvaluator::from_kj_per_mol_angstrom2(100.0);
        let expected = 100.0 * KILOJOULE / AVOGADRO / (ANGSTROM * ANGSTROM);
        assert!(((evaluator.force_constant() - expected) / expected).abs() < TOLERANCE);
    }
}
