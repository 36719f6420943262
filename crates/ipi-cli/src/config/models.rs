use ipi_driver::engine::config::DriverConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RunControl {
    pub replicas: usize,
    pub reconnect: bool,
    /// `None` reconnects until a session fails.
    pub max_sessions: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub driver: DriverConfig,
    /// Harmonic tether constant in kJ/mol/Å².
    pub force_constant: f64,
    pub run: RunControl,
}
