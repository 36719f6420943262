//! The physics capability invoked by the driver.
//!
//! An [`Evaluator`] turns an [`AtomicConfiguration`] in SI units into a
//! [`ForceResult`] in SI units. Implementations that compute in other units
//! (Hartree/Bohr, kcal/mol/Å, ...) convert with [`crate::core::units`] as soon as
//! the raw numbers are available, before returning.

pub mod harmonic;

use crate::core::models::configuration::AtomicConfiguration;
use crate::core::models::forces::ForceResult;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Evaluator failed: {0}")]
    Failed(String),

    #[error("Evaluator returned {actual} force vectors for {expected} atoms")]
    ForceCountMismatch { expected: usize, actual: usize },

    #[error("Evaluator returned a non-finite {0}")]
    NonFinite(&'static str),

    #[error("Evaluator failed: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl EvaluationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wraps an error raised by the evaluator's own backend.
    pub fn other(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(error.into())
    }
}

/// Computes energy, forces and virial for one configuration.
///
/// `evaluate` is called at most once per received configuration. The
/// configuration is only borrowed for the duration of the call.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceResult, EvaluationError>;

    /// Receives the replica index and the string sent with `INIT`.
    fn on_init(&mut self, replica: i32, info: &str) {
        let _ = (replica, info);
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &mut E {
    fn evaluate(
        &mut self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceResult, EvaluationError> {
        (**self).evaluate(configuration)
    }

    fn on_init(&mut self, replica: i32, info: &str) {
        (**self).on_init(replica, info)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(
        &mut self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceResult, EvaluationError> {
        (**self).evaluate(configuration)
    }

    fn on_init(&mut self, replica: i32, info: &str) {
        (**self).on_init(replica, info)
    }
}

/// An [`Evaluator`] backed by a closure. See [`from_fn`].
pub struct FnEvaluator<F> {
    f: F,
}

/// Wraps a closure as an [`Evaluator`].
///
/// ```
/// use ipi_driver::core::evaluator::{self, Evaluator};
/// use ipi_driver::core::models::forces::ForceResult;
/// use nalgebra::Vector3;
///
/// let mut free_particles = evaluator::from_fn(|configuration| {
///     Ok(ForceResult::new(0.0, vec![Vector3::zeros(); configuration.len()]))
/// });
/// # let _ = &mut free_particles as &mut dyn Evaluator;
/// ```
pub fn from_fn<F>(f: F) -> FnEvaluator<F>
where
    F: FnMut(&AtomicConfiguration) -> Result<ForceResult, EvaluationError>,
{
    FnEvaluator { f }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: FnMut(&AtomicConfiguration) -> Result<ForceResult, EvaluationError>,
{
    fn evaluate(
        &mut self,
        configuration: &AtomicConfiguration,
    ) -> Result<ForceResult, EvaluationError> {
        (self.f)(configuration)
    }
}

/// Checks that a result fits the configuration it was computed for.
pub fn check_result(
    result: &ForceResult,
    configuration: &AtomicConfiguration,
) -> Result<(), EvaluationError> {
    if result.forces.len() != configuration.len() {
        return Err(EvaluationError::ForceCountMismatch {
            expected: configuration.len(),
            actual: result.forces.len(),
        });
    }
    if !result.energy.is_finite() {
        return Err(EvaluationError::NonFinite("energy"));
    }
    if result.forces.iter().any(|f| !f.iter().all(|c| c.is_finite())) {
        return Err(EvaluationError::NonFinite("force"));
    }
    if !result.virial.iter().all(|c| c.is_finite()) {
        return Err(EvaluationError::NonFinite("virial"));
    }
    Ok(())
}
