use crate::core::evaluator::Evaluator;
use crate::engine::config::{ConfigError, DriverConfig};
use crate::engine::driver::{Driver, RunSummary};
use crate::engine::error::DriverError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::transport;
use rayon::prelude::*;
use tracing::{info, instrument, warn};

/// Connects to the configured server and serves it until `EXIT` or disconnection.
#[instrument(skip_all, name = "run_workflow", fields(address = %config.connection.address))]
pub fn run<E: Evaluator>(
    config: &DriverConfig,
    evaluator: E,
    reporter: &ProgressReporter,
) -> Result<RunSummary, DriverError> {
    let connection = transport::connect(&config.connection, reporter)?;
    Driver::new(connection, evaluator, config.protocol.clone())
        .with_reporter(reporter)
        .run()
}

/// Runs `replicas` independent clients against the same server, one connection
/// and one evaluator each.
///
/// Every replica gets its own thread for the whole session, since each spends
/// most of its time blocked on the socket. `make_evaluator` receives the
/// zero-based replica slot. A failing replica does not stop the others; the
/// per-replica results are returned in slot order.
#[instrument(skip_all, name = "replicas_workflow", fields(replicas = replicas))]
pub fn run_replicas<E, F>(
    config: &DriverConfig,
    replicas: usize,
    make_evaluator: F,
    reporter: &ProgressReporter,
) -> Result<Vec<Result<RunSummary, DriverError>>, DriverError>
where
    E: Evaluator,
    F: Fn(usize) -> E + Sync,
{
    if replicas == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "replicas",
            reason: "must be at least 1".to_string(),
        }
        .into());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(replicas)
        .thread_name(|i| format!("ipi-replica-{}", i))
        .build()
        .map_err(|e| ConfigError::InvalidParameter {
            name: "replicas",
            reason: e.to_string(),
        })?;

    reporter.report(Progress::Message(format!(
        "Starting {} replica client(s)",
        replicas
    )));
    info!("Starting {} replica client(s).", replicas);

    let results: Vec<_> = pool.install(|| {
        (0..replicas)
            .into_par_iter()
            .map(|slot| {
                let result = run(config, make_evaluator(slot), reporter);
                if let Err(e) = &result {
                    warn!("Replica slot {} failed: {}", slot, e);
                }
                result
            })
            .collect()
    });

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(
        "{} of {} replica client(s) finished cleanly.",
        replicas - failed,
        replicas
    );
    Ok(results)
}
