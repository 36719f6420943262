use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, RunControl};
use crate::cli::{EvaluationArg, RunArgs};
use crate::error::{CliError, Result};
use ipi_driver::engine::config::{self as core_config, Address, EvaluationMode};
use std::str::FromStr;
use std::time::Duration;

pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let connection = file_config.connection.take().unwrap_or_default();
    let protocol = file_config.protocol.take().unwrap_or_default();
    let evaluator = file_config.evaluator.take().unwrap_or_default();
    let run = file_config.run.take().unwrap_or_default();

    let address = if let Some(unix) = &args.unix {
        Address::unix(unix.clone())
    } else if args.host.is_some() || args.port.is_some() {
        Address::tcp(
            args.host
                .clone()
                .or(connection.host)
                .unwrap_or(defaults.host),
            args.port.or(connection.port).unwrap_or(defaults.port),
        )
    } else if let Some(unix) = connection.unix {
        if connection.host.is_some() || connection.port.is_some() {
            return Err(CliError::Config(
                "`connection.unix` cannot be combined with `connection.host` or `connection.port`"
                    .to_string(),
            ));
        }
        Address::unix(unix)
    } else {
        Address::tcp(
            connection.host.unwrap_or(defaults.host),
            connection.port.unwrap_or(defaults.port),
        )
    };

    let connect_timeout = seconds(
        "connection.connect-timeout",
        args.connect_timeout
            .or(connection.connect_timeout)
            .unwrap_or(defaults.connect_timeout_secs),
    )?;
    let retry_delay = seconds(
        "connection.retry-delay",
        connection.retry_delay.unwrap_or(defaults.retry_delay_secs),
    )?;
    let command_timeout = args
        .command_timeout
        .or(protocol.command_timeout)
        .map(|s| seconds("protocol.command-timeout", s))
        .transpose()?;

    let wire_length_unit = args
        .wire_length_unit
        .clone()
        .or(protocol.wire_length_unit)
        .unwrap_or(defaults.wire_length_unit);
    let wire_energy_unit = args
        .wire_energy_unit
        .clone()
        .or(protocol.wire_energy_unit)
        .unwrap_or(defaults.wire_energy_unit);

    let evaluation = match args.evaluation {
        Some(EvaluationArg::Lazy) => EvaluationMode::Lazy,
        Some(EvaluationArg::Eager) => EvaluationMode::Eager,
        None => protocol.evaluation.unwrap_or_default(),
    };

    let driver = core_config::DriverConfigBuilder::new()
        .address(address)
        .connect_timeout(connect_timeout)
        .connect_attempts(
            args.connect_attempts
                .or(connection.connect_attempts)
                .unwrap_or(defaults.connect_attempts),
        )
        .retry_delay(retry_delay)
        .wire_unit_names(&wire_length_unit, &wire_energy_unit)
        .map_err(|e| CliError::Config(e.to_string()))?
        .evaluation(evaluation)
        .max_atoms(protocol.max_atoms.unwrap_or(defaults.max_atoms))
        .command_timeout(command_timeout)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let force_constant = args
        .force_constant
        .or(evaluator.force_constant)
        .unwrap_or(defaults.force_constant);
    if !force_constant.is_finite() || force_constant < 0.0 {
        return Err(CliError::Config(format!(
            "`evaluator.force-constant` must be a finite, non-negative number, got {}",
            force_constant
        )));
    }

    let replicas = args
        .replicas
        .or(run.replicas)
        .unwrap_or(defaults.replicas);
    if replicas == 0 {
        return Err(CliError::Config(
            "`run.replicas` must be at least 1".to_string(),
        ));
    }
    let max_sessions = args.max_sessions.or(run.max_sessions);
    if max_sessions == Some(0) {
        return Err(CliError::Config(
            "`run.max-sessions` must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        driver,
        force_constant,
        run: RunControl {
            replicas,
            reconnect: args.reconnect || run.reconnect.unwrap_or(false),
            max_sessions,
        },
    })
}

fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        CliError::Config(format!(
            "Invalid duration for {}: {} (expected non-negative seconds)",
            key, value
        ))
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "connection.host" => {
                config.connection.get_or_insert_with(Default::default).host =
                    Some(value_str.to_string());
            }
            "connection.port" => {
                config.connection.get_or_insert_with(Default::default).port =
                    Some(parse_value(key, value_str, "port")?);
            }
            "connection.unix" => {
                config.connection.get_or_insert_with(Default::default).unix = Some(value_str.into());
            }
            "connection.connect-timeout" => {
                config.connection.get_or_insert_with(Default::default).connect_timeout =
                    Some(parse_value(key, value_str, "float")?);
            }
            "connection.connect-attempts" => {
                config.connection.get_or_insert_with(Default::default).connect_attempts =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "connection.retry-delay" => {
                config.connection.get_or_insert_with(Default::default).retry_delay =
                    Some(parse_value(key, value_str, "float")?);
            }
            "protocol.wire-length-unit" => {
                config
                    .protocol
                    .get_or_insert_with(Default::default)
                    .wire_length_unit = Some(value_str.to_string());
            }
            "protocol.wire-energy-unit" => {
                config
                    .protocol
                    .get_or_insert_with(Default::default)
                    .wire_energy_unit = Some(value_str.to_string());
            }
            "protocol.evaluation" => {
                let mode = match value_str.trim() {
                    "lazy" => EvaluationMode::Lazy,
                    "eager" => EvaluationMode::Eager,
                    _ => {
                        return Err(CliError::Config(format!(
                            "Invalid value for {}: '{}'. Expected 'lazy' or 'eager'.",
                            key, value_str
                        )));
                    }
                };
                config.protocol.get_or_insert_with(Default::default).evaluation = Some(mode);
            }
            "protocol.max-atoms" => {
                config.protocol.get_or_insert_with(Default::default).max_atoms =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "protocol.command-timeout" => {
                config
                    .protocol
                    .get_or_insert_with(Default::default)
                    .command_timeout = Some(parse_value(key, value_str, "float")?);
            }
            "evaluator.force-constant" => {
                config
                    .evaluator
                    .get_or_insert_with(Default::default)
                    .force_constant = Some(parse_value(key, value_str, "float")?);
            }
            "run.replicas" => {
                config.run.get_or_insert_with(Default::default).replicas =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "run.reconnect" => {
                config.run.get_or_insert_with(Default::default).reconnect =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "run.max-sessions" => {
                config.run.get_or_insert_with(Default::default).max_sessions =
                    Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
