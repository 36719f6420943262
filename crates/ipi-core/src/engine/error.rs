use super::config::ConfigError;
use super::transport::ConnectionError;
use crate::core::evaluator::EvaluationError;
use crate::core::io::wire::FramingError;
use crate::core::units::UnitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Protocol framing error: {0}")]
    Framing(FramingError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl From<FramingError> for DriverError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::Io(e) => DriverError::Connection(ConnectionError::Io(e)),
            other => DriverError::Framing(other),
        }
    }
}

impl From<UnitError> for DriverError {
    fn from(err: UnitError) -> Self {
        DriverError::Configuration(ConfigError::Unit(err))
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Connection(ConnectionError::Io(err))
    }
}
