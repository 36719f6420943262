use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ipi_driver::engine::driver::RunOutcome;
use ipi_driver::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Renders driver progress as a single spinner with a running step count.
///
/// The callback is shared by every replica, so the position is the total number
/// of force replies sent across all connections.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new_spinner()
            .with_style(Self::spinner_style())
            .with_message("Starting...");
        pb.set_draw_target(target);

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::Connecting { address, attempt } => {
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb_guard.set_message(format!("Connecting to {} (attempt {})", address, attempt));
                }
                Progress::Connected { address } => {
                    pb_guard.set_message(format!("Connected to {}", address));
                }
                Progress::Initialized { replica } => {
                    pb_guard.set_message(format!("Serving replica {}", replica));
                }
                Progress::PositionsReceived { natoms } => {
                    pb_guard.set_message(format!("Evaluating {} atom(s)", natoms));
                }
                Progress::ForcesSent { step, energy } => {
                    pb_guard.inc(1);
                    pb_guard.set_message(format!("Step {}: E = {:.6e} J", step, energy));
                }
                Progress::Finished { outcome, steps } => {
                    let reason = match outcome {
                        RunOutcome::Exit => "server sent EXIT",
                        RunOutcome::Disconnected => "server disconnected",
                    };
                    pb_guard.println(format!("  Session ended ({}) after {} step(s)", reason, steps));
                }
                Progress::Message(msg) => {
                    pb_guard.println(format!("  {}", msg));
                }
            }
        })
    }

    /// Stops the spinner and leaves a final summary line.
    pub fn finish(&self, message: impl Into<String>) {
        let Ok(pb_guard) = self.pb.lock() else {
            warn!("Progress bar mutex was poisoned. Cannot finish progress.");
            return;
        };
        pb_guard.disable_steady_tick();
        pb_guard.finish_with_message(message.into());
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} step(s) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
