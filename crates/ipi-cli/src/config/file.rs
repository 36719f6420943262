use crate::error::{CliError, Result};
use ipi_driver::engine::config::EvaluationMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub unix: Option<PathBuf>,
    pub connect_timeout: Option<f64>,
    pub connect_attempts: Option<u32>,
    pub retry_delay: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileProtocolConfig {
    pub wire_length_unit: Option<String>,
    pub wire_energy_unit: Option<String>,
    pub evaluation: Option<EvaluationMode>,
    pub max_atoms: Option<usize>,
    pub command_timeout: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEvaluatorConfig {
    pub force_constant: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRunConfig {
    pub replicas: Option<usize>,
    pub reconnect: Option<bool>,
    pub max_sessions: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub connection: Option<FileConnectionConfig>,
    pub protocol: Option<FileProtocolConfig>,
    pub evaluator: Option<FileEvaluatorConfig>,
    pub run: Option<FileRunConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
