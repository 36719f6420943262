use std::fmt;

/// The driver's place in the protocol state machine.
///
/// ```text
/// DISCONNECTED ──connect──▶ NEEDINIT ──INIT──▶ HAVE_DATA_WAIT ◀──────────┐
///                                                 │  POSDATA (store)     │
///                                                 │  GETFORCE (evaluate) │
///                                                 ▼                      │
///                                            FORCE_READY ──FORCEREADY────┘
///
/// any ──EXIT──▶ EXIT            any ──EOF / reset──▶ DISCONNECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Connected; no `INIT` received yet.
    NeedInit,
    /// Initialized; waiting for positions, or holding positions whose forces have
    /// not been requested yet.
    HaveDataWait,
    /// A result has been computed and not yet sent.
    ForceReady,
    /// The server sent `EXIT`.
    Exit,
}

impl ConnectionState {
    pub const fn name(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::NeedInit => "NEEDINIT",
            ConnectionState::HaveDataWait => "HAVE_DATA_WAIT",
            ConnectionState::ForceReady => "FORCE_READY",
            ConnectionState::Exit => "EXIT",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Exit)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
