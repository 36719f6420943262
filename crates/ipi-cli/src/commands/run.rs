use crate::cli::RunArgs;
use crate::config::{AppConfig, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ipi_driver::core::evaluator::harmonic::HarmonicEvaluator;
use ipi_driver::engine::driver::{RunOutcome, RunSummary};
use ipi_driver::engine::error::DriverError;
use ipi_driver::engine::progress::ProgressReporter;
use ipi_driver::engine::transport::ConnectionError;
use ipi_driver::workflows;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    pub sessions: usize,
    pub steps: u64,
}

pub fn run(args: RunArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_config(&args)?;
    debug!("Final configuration: {:?}", &app);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Connecting to {} (wire units: {}, {} replica(s))...",
        app.driver.connection.address, app.driver.protocol.wire_units, app.run.replicas
    );
    let result = serve(&app, &reporter);

    match &result {
        Ok(report) => progress_handler.finish(format!(
            "Served {} step(s) over {} session(s)",
            report.steps, report.sessions
        )),
        Err(_) => progress_handler.finish("Stopped on error"),
    }
    let report = result?;
    println!(
        "Served {} force evaluation(s) over {} session(s).",
        report.steps, report.sessions
    );
    Ok(())
}

/// Runs sessions until the server goes away, a session fails, or the session
/// limit is reached. A new session is only started after every replica of the
/// previous one ended on `EXIT`; if that reconnect is refused the run ends
/// normally.
pub fn serve(app: &AppConfig, reporter: &ProgressReporter) -> Result<RunReport> {
    let mut report = RunReport::default();

    loop {
        report.sessions += 1;
        info!("Starting session {}.", report.sessions);
        let summaries = match run_session(app, reporter) {
            Ok(summaries) => summaries,
            Err(CliError::Driver(DriverError::Connection(ConnectionError::Connect {
                address,
                ..
            }))) if report.sessions > 1 => {
                info!("Server at {} is gone after its last EXIT; stopping.", address);
                report.sessions -= 1;
                break;
            }
            Err(e) => return Err(e),
        };
        report.steps += summaries.iter().map(|s| s.steps).sum::<u64>();

        let all_exited = summaries.iter().all(|s| s.outcome == RunOutcome::Exit);
        if !app.run.reconnect {
            break;
        }
        if !all_exited {
            info!("Server disconnected; not reconnecting.");
            break;
        }
        if app.run.max_sessions.is_some_and(|max| report.sessions >= max) {
            info!("Reached the session limit of {}.", report.sessions);
            break;
        }
        info!("Server sent EXIT; reconnecting for a new session.");
    }

    Ok(report)
}

fn run_session(app: &AppConfig, reporter: &ProgressReporter) -> Result<Vec<RunSummary>> {
    let force_constant = app.force_constant;
    let make_evaluator = |_: usize| HarmonicEvaluator::from_kj_per_mol_angstrom2(force_constant);

    if app.run.replicas == 1 {
        let summary = workflows::run::run(&app.driver, make_evaluator(0), reporter)?;
        return Ok(vec![summary]);
    }

    let results =
        workflows::run::run_replicas(&app.driver, app.run.replicas, make_evaluator, reporter)?;
    let mut summaries = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (slot, result) in results.into_iter().enumerate() {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                warn!("Replica slot {} ended with an error: {}", slot, e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(summaries),
    }
}
