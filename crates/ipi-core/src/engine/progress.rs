use super::driver::RunOutcome;

#[derive(Debug, Clone)]
pub enum Progress {
    Connecting { address: String, attempt: u32 },
    Connected { address: String },

    Initialized { replica: i32 },
    PositionsReceived { natoms: usize },
    /// `energy` is in joules.
    ForcesSent { step: u64, energy: f64 },

    Finished { outcome: RunOutcome, steps: u64 },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

static SILENT: ProgressReporter<'static> = ProgressReporter::new();

impl<'a> ProgressReporter<'a> {
    pub const fn new() -> Self {
        Self { callback: None }
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// A shared reporter that drops every event.
    pub fn silent() -> &'static ProgressReporter<'static> {
        &SILENT
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
