use crate::core::units::{UnitError, WireUnits};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the atom count accepted from a POSDATA header.
pub const DEFAULT_MAX_ATOMS: usize = 10_000_000;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 1;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Directory prefix i-PI uses for named Unix domain sockets.
pub const UNIX_SOCKET_PREFIX: &str = "/tmp/ipi_";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Tcp { host: String, port: u16 },
    Unix { path: PathBuf },
}

impl Address {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Address::Tcp {
            host: host.into(),
            port,
        }
    }

    /// A Unix socket address. A bare name without any `/` is expanded to
    /// `/tmp/ipi_<name>`, the path i-PI creates for `<address>name</address>`.
    pub fn unix(name: impl Into<PathBuf>) -> Self {
        let path: PathBuf = name.into();
        let is_bare = !path.to_string_lossy().contains('/');
        if is_bare {
            Address::Unix {
                path: PathBuf::from(format!("{}{}", UNIX_SOCKET_PREFIX, path.display())),
            }
        } else {
            Address::Unix { path }
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Address::Unix { path } => write!(f, "unix:{}", path.display()),
        }
    }
}

/// When the evaluator runs relative to the protocol exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationMode {
    /// Evaluate when `GETFORCE` arrives.
    #[default]
    Lazy,
    /// Evaluate as soon as `POSDATA` has been decoded.
    Eager,
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationMode::Lazy => f.write_str("lazy"),
            EvaluationMode::Eager => f.write_str("eager"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectConfig {
    pub address: Address,
    pub timeout: Duration,
    pub attempts: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    pub wire_units: WireUnits,
    pub evaluation: EvaluationMode,
    pub max_atoms: usize,
    /// Read timeout while waiting for the next command token. `None` waits forever.
    pub command_timeout: Option<Duration>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            wire_units: WireUnits::atomic(),
            evaluation: EvaluationMode::Lazy,
            max_atoms: DEFAULT_MAX_ATOMS,
            command_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub connection: ConnectConfig,
    pub protocol: ProtocolConfig,
}

#[derive(Default)]
pub struct DriverConfigBuilder {
    address: Option<Address>,
    connect_timeout: Option<Duration>,
    connect_attempts: Option<u32>,
    retry_delay: Option<Duration>,
    wire_units: Option<WireUnits>,
    evaluation: Option<EvaluationMode>,
    max_atoms: Option<usize>,
    command_timeout: Option<Duration>,
}

impl DriverConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = Some(attempts);
        self
    }
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
    pub fn wire_units(mut self, units: WireUnits) -> Self {
        self.wire_units = Some(units);
        self
    }
    /// Resolves wire units by name, e.g. `("bohr", "hartree")`.
    pub fn wire_unit_names(mut self, length: &str, energy: &str) -> Result<Self, ConfigError> {
        self.wire_units = Some(WireUnits::from_names(length, energy)?);
        Ok(self)
    }
    pub fn evaluation(mut self, mode: EvaluationMode) -> Self {
        self.evaluation = Some(mode);
        self
    }
    pub fn max_atoms(mut self, max_atoms: usize) -> Self {
        self.max_atoms = Some(max_atoms);
        self
    }
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<DriverConfig, ConfigError> {
        let address = self
            .address
            .ok_or(ConfigError::MissingParameter("address"))?;
        let attempts = self.connect_attempts.unwrap_or(DEFAULT_CONNECT_ATTEMPTS);
        if attempts == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "connect_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        let timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidParameter {
                name: "connect_timeout",
                reason: "must be positive".to_string(),
            });
        }
        if self.command_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidParameter {
                name: "command_timeout",
                reason: "must be positive".to_string(),
            });
        }
        if let Address::Tcp { host, .. } = &address {
            if host.trim().is_empty() {
                return Err(ConfigError::InvalidParameter {
                    name: "address",
                    reason: "host cannot be empty".to_string(),
                });
            }
        }

        Ok(DriverConfig {
            connection: ConnectConfig {
                address,
                timeout,
                attempts,
                retry_delay: self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
            },
            protocol: ProtocolConfig {
                wire_units: self.wire_units.unwrap_or_default(),
                evaluation: self.evaluation.unwrap_or_default(),
                max_atoms: self.max_atoms.unwrap_or(DEFAULT_MAX_ATOMS),
                command_timeout: self.command_timeout,
            },
        })
    }
}
