//! The per-connection protocol loop.
//!
//! The server drives the conversation: every iteration reads exactly one command
//! token, reads that command's full payload, and answers at most once. The driver
//! never writes unprompted. Replies are assembled in memory and written in a
//! single call, so a failure part way through a step never leaves a partial
//! message on the socket.

use super::config::{EvaluationMode, ProtocolConfig};
use super::error::DriverError;
use super::progress::{Progress, ProgressReporter};
use super::state::ConnectionState;
use super::transport::{ConnectionError, Transport};
use crate::core::evaluator::{self, Evaluator};
use crate::core::io::messages::{ForceMessage, InitMessage, PositionMessage};
use crate::core::io::wire::{self, Command, FramingError, HEADER_LEN, Reply, WireBuffer};
use crate::core::models::configuration::AtomicConfiguration;
use crate::core::models::forces::ForceResult;
use std::io::ErrorKind;
use tracing::{debug, error, info, instrument, warn};

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The server sent `EXIT`.
    Exit,
    /// The server closed or reset the connection between commands.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Number of force replies sent.
    pub steps: u64,
    /// Replica index from `INIT`, if one arrived.
    pub replica: Option<i32>,
}

/// Result of handling a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished(RunOutcome),
}

pub struct Driver<'r, S, E> {
    stream: S,
    evaluator: E,
    config: ProtocolConfig,
    reporter: &'r ProgressReporter<'r>,
    state: ConnectionState,
    replica: Option<i32>,
    pending: Option<AtomicConfiguration>,
    result: Option<ForceResult>,
    steps: u64,
}

impl<'r, S: Transport, E: Evaluator> Driver<'r, S, E> {
    /// Wraps an already connected stream. The driver starts in `NEEDINIT`.
    pub fn new(stream: S, evaluator: E, config: ProtocolConfig) -> Self {
        Self {
            stream,
            evaluator,
            config,
            reporter: ProgressReporter::silent(),
            state: ConnectionState::NeedInit,
            replica: None,
            pending: None,
            result: None,
            steps: 0,
        }
    }

    pub fn with_reporter(mut self, reporter: &'r ProgressReporter<'r>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn replica(&self) -> Option<i32> {
        self.replica
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Serves commands until the server sends `EXIT` or goes away.
    ///
    /// The stream is shut down on every exit path. On error the state is reset to
    /// `DISCONNECTED` before the error is returned.
    #[instrument(skip_all, name = "driver_run")]
    pub fn run(mut self) -> Result<RunSummary, DriverError> {
        let result = loop {
            match self.step() {
                Ok(Step::Continue) => continue,
                Ok(Step::Finished(outcome)) => break Ok(outcome),
                Err(e) => break Err(e),
            }
        };

        if let Err(e) = self.stream.close() {
            debug!("Ignoring error while closing the connection: {}", e);
        }

        match result {
            Ok(outcome) => {
                info!(
                    "Run finished ({:?}) after {} step(s).",
                    outcome, self.steps
                );
                self.reporter.report(Progress::Finished {
                    outcome,
                    steps: self.steps,
                });
                Ok(RunSummary {
                    outcome,
                    steps: self.steps,
                    replica: self.replica,
                })
            }
            Err(e) => {
                self.reset();
                error!("Run aborted after {} step(s): {}", self.steps, e);
                Err(e)
            }
        }
    }

    /// Reads and handles one command.
    pub fn step(&mut self) -> Result<Step, DriverError> {
        if self.state.is_terminal() {
            let outcome = match self.state {
                ConnectionState::Exit => RunOutcome::Exit,
                _ => RunOutcome::Disconnected,
            };
            return Ok(Step::Finished(outcome));
        }

        let Some(command) = self.read_command()? else {
            info!("Server closed the connection while the driver awaited a command.");
            self.reset();
            return Ok(Step::Finished(RunOutcome::Disconnected));
        };
        debug!(%command, state = %self.state, "Received command.");

        match command {
            Command::Status => self.handle_status()?,
            Command::Init => self.handle_init()?,
            Command::PosData => self.handle_posdata()?,
            Command::GetForce => self.handle_getforce()?,
            Command::Exit => {
                info!("Server requested exit.");
                self.state = ConnectionState::Exit;
                self.pending = None;
                self.result = None;
                return Ok(Step::Finished(RunOutcome::Exit));
            }
        }
        Ok(Step::Continue)
    }

    fn read_command(&mut self) -> Result<Option<Command>, DriverError> {
        let Some(timeout) = self.config.command_timeout else {
            return Ok(wire::read_command(&mut self.stream)?);
        };

        self.stream
            .set_command_timeout(Some(timeout))
            .map_err(ConnectionError::Io)?;
        let command = wire::read_command(&mut self.stream);
        self.stream
            .set_command_timeout(None)
            .map_err(ConnectionError::Io)?;

        match command {
            Err(FramingError::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Err(ConnectionError::CommandTimeout(timeout).into())
            }
            other => Ok(other?),
        }
    }

    fn unexpected(&self, command: Command) -> DriverError {
        FramingError::UnexpectedCommand {
            command,
            state: self.state.name(),
        }
        .into()
    }

    fn handle_status(&mut self) -> Result<(), DriverError> {
        let reply = match self.state {
            ConnectionState::NeedInit => Reply::NeedInit,
            ConnectionState::HaveDataWait if self.pending.is_some() => Reply::HaveData,
            ConnectionState::HaveDataWait => Reply::Ready,
            ConnectionState::ForceReady => Reply::HaveData,
            ConnectionState::Disconnected | ConnectionState::Exit => {
                return Err(self.unexpected(Command::Status));
            }
        };
        debug!(%reply, "Answering status.");
        let mut buf = WireBuffer::with_capacity(HEADER_LEN);
        buf.put_header(reply.header());
        self.send(buf)
    }

    fn handle_init(&mut self) -> Result<(), DriverError> {
        if self.state != ConnectionState::NeedInit {
            return Err(self.unexpected(Command::Init));
        }
        let message = InitMessage::decode(&mut self.stream)?;
        let info = message.info_lossy();
        info!(
            "Initialized as replica {} ({} byte init string).",
            message.replica,
            message.info.len()
        );
        self.evaluator.on_init(message.replica, &info);
        self.replica = Some(message.replica);
        self.state = ConnectionState::HaveDataWait;
        self.reporter.report(Progress::Initialized {
            replica: message.replica,
        });
        Ok(())
    }

    fn handle_posdata(&mut self) -> Result<(), DriverError> {
        if !matches!(
            self.state,
            ConnectionState::HaveDataWait | ConnectionState::ForceReady
        ) {
            return Err(self.unexpected(Command::PosData));
        }
        let message = PositionMessage::decode(&mut self.stream, self.config.max_atoms)?;
        let configuration = message.into_configuration(&self.config.wire_units);

        if self.pending.is_some() {
            warn!("New positions replace a configuration whose forces were never requested.");
        }
        self.result = None;
        self.state = ConnectionState::HaveDataWait;
        debug!(
            natoms = configuration.len(),
            volume = configuration.cell().volume(),
            "Received positions."
        );
        self.reporter.report(Progress::PositionsReceived {
            natoms: configuration.len(),
        });
        self.pending = Some(configuration);

        if self.config.evaluation == EvaluationMode::Eager {
            self.evaluate_pending()?;
        }
        Ok(())
    }

    fn handle_getforce(&mut self) -> Result<(), DriverError> {
        match self.state {
            ConnectionState::HaveDataWait if self.pending.is_some() => self.evaluate_pending()?,
            ConnectionState::ForceReady => {}
            _ => return Err(self.unexpected(Command::GetForce)),
        }
        self.send_forces()
    }

    fn evaluate_pending(&mut self) -> Result<(), DriverError> {
        let Some(configuration) = self.pending.as_ref() else {
            return Err(self.unexpected(Command::GetForce));
        };
        debug!(natoms = configuration.len(), "Invoking evaluator.");
        let result = self.evaluator.evaluate(configuration)?;
        evaluator::check_result(&result, configuration)?;
        self.result = Some(result);
        self.state = ConnectionState::ForceReady;
        Ok(())
    }

    fn send_forces(&mut self) -> Result<(), DriverError> {
        let Some(result) = self.result.take() else {
            return Err(self.unexpected(Command::GetForce));
        };
        let message = ForceMessage::from_result(&result, &self.config.wire_units);
        let mut buf = WireBuffer::with_capacity(
            HEADER_LEN + 2 * wire::INT_SIZE + (1 + 9 + 3 * message.forces.len()) * wire::FLOAT_SIZE
                + message.extra.len(),
        );
        buf.put_header(Reply::ForceReady.header());
        message.encode(&mut buf)?;
        self.send(buf)?;

        self.pending = None;
        self.steps += 1;
        self.state = ConnectionState::HaveDataWait;
        debug!(step = self.steps, energy = result.energy, "Sent forces.");
        self.reporter.report(Progress::ForcesSent {
            step: self.steps,
            energy: result.energy,
        });
        Ok(())
    }

    fn send(&mut self, buf: WireBuffer) -> Result<(), DriverError> {
        self.stream
            .write_all(buf.as_bytes())
            .and_then(|_| self.stream.flush())
            .map_err(|e| DriverError::Connection(ConnectionError::Io(e)))
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.pending = None;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evaluator::{EvaluationError, from_fn};
    use crate::core::io::wire::read_full;
    use crate::core::units::{BOHR, HARTREE, WireUnits};
    use nalgebra::{Matrix3, Vector3};
    use std::io::{self, Cursor, Read, Write};

    #[derive(Default)]
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        closed: bool,
    }

    impl ScriptedStream {
        fn new(script: WireBuffer) -> Self {
            Self {
                input: Cursor::new(script.into_bytes()),
                ..Default::default()
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for ScriptedStream {
        fn close(&mut self) -> io::Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn status(buf: &mut WireBuffer) {
        buf.put_header(Command::Status.header());
    }

    fn init(buf: &mut WireBuffer, replica: i32, info: &str) {
        buf.put_header(Command::Init.header());
        InitMessage {
            replica,
            info: info.as_bytes().to_vec(),
        }
        .encode(buf)
        .unwrap();
    }

    fn posdata(buf: &mut WireBuffer, positions: Vec<Vector3<f64>>) {
        buf.put_header(Command::PosData.header());
        PositionMessage {
            cell: Matrix3::from_diagonal_element(10.0),
            inverse: Matrix3::from_diagonal_element(0.1),
            positions,
        }
        .encode(buf)
        .unwrap();
    }

    fn getforce(buf: &mut WireBuffer) {
        buf.put_header(Command::GetForce.header());
    }

    fn exit(buf: &mut WireBuffer) {
        buf.put_header(Command::Exit.header());
    }

    fn si_config() -> ProtocolConfig {
        ProtocolConfig {
            wire_units: WireUnits::si(),
            ..ProtocolConfig::default()
        }
    }

    fn constant_energy(energy: f64) -> impl Evaluator {
        from_fn(move |c: &AtomicConfiguration| {
            Ok(ForceResult::new(energy, vec![Vector3::zeros(); c.len()]))
        })
    }

    fn read_reply(reader: &mut impl Read) -> Reply {
        let mut header = [0u8; HEADER_LEN];
        read_full(reader, &mut header, "reply").unwrap();
        Reply::parse(&header).unwrap()
    }

    #[test]
    fn status_before_init_answers_needinit() {
        let mut script = WireBuffer::new();
        status(&mut script);
        let mut stream = ScriptedStream::new(script);

        let summary = Driver::new(&mut stream, constant_energy(0.0), si_config())
            .run()
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Disconnected);
        assert_eq!(stream.output, b"NEEDINIT    ");
        assert!(stream.closed);
    }

    #[test]
    fn full_step_sends_energy_forces_and_virial() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "test");
        posdata(&mut script, vec![Vector3::zeros()]);
        getforce(&mut script);
        exit(&mut script);
        let mut stream = ScriptedStream::new(script);

        let summary = Driver::new(&mut stream, constant_energy(1.0), si_config())
            .run()
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                outcome: RunOutcome::Exit,
                steps: 1,
                replica: Some(0),
            }
        );

        let mut output = Cursor::new(stream.output);
        assert_eq!(read_reply(&mut output), Reply::ForceReady);
        let message = ForceMessage::decode(&mut output, 10).unwrap();
        assert_eq!(message.energy, 1.0);
        assert_eq!(message.forces, vec![Vector3::zeros()]);
        assert_eq!(message.virial, Matrix3::zeros());
        assert!(message.extra.is_empty());
        assert_eq!(output.position() as usize, output.get_ref().len());
    }

    #[test]
    fn status_tracks_initialization_and_pending_positions() {
        let mut script = WireBuffer::new();
        status(&mut script);
        init(&mut script, 2, "");
        status(&mut script);
        posdata(&mut script, vec![Vector3::new(1.0, 0.0, 0.0)]);
        status(&mut script);
        getforce(&mut script);
        status(&mut script);
        exit(&mut script);
        let mut stream = ScriptedStream::new(script);

        Driver::new(&mut stream, constant_energy(0.5), si_config())
            .run()
            .unwrap();

        let mut output = Cursor::new(stream.output);
        assert_eq!(read_reply(&mut output), Reply::NeedInit);
        assert_eq!(read_reply(&mut output), Reply::Ready);
        assert_eq!(read_reply(&mut output), Reply::HaveData);
        assert_eq!(read_reply(&mut output), Reply::ForceReady);
        ForceMessage::decode(&mut output, 10).unwrap();
        assert_eq!(read_reply(&mut output), Reply::Ready);
    }

    #[test]
    fn getforce_without_positions_is_rejected_without_output() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        getforce(&mut script);
        let mut stream = ScriptedStream::new(script);

        let err = Driver::new(&mut stream, constant_energy(0.0), si_config())
            .run()
            .unwrap_err();

        assert!(matches!(
            err,
            DriverError::Framing(FramingError::UnexpectedCommand {
                command: Command::GetForce,
                state: "HAVE_DATA_WAIT",
            })
        ));
        assert!(stream.output.is_empty());
        assert!(stream.closed);
    }

    #[test]
    fn repeated_getforce_after_reply_is_rejected() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        posdata(&mut script, vec![Vector3::zeros()]);
        getforce(&mut script);
        getforce(&mut script);
        let mut stream = ScriptedStream::new(script);

        let err = Driver::new(&mut stream, constant_energy(0.0), si_config())
            .run()
            .unwrap_err();
        assert!(matches!(err, DriverError::Framing(_)));

        let mut output = Cursor::new(stream.output);
        assert_eq!(read_reply(&mut output), Reply::ForceReady);
        ForceMessage::decode(&mut output, 10).unwrap();
        assert_eq!(output.position() as usize, output.get_ref().len());
    }

    #[test]
    fn posdata_before_init_is_rejected() {
        let mut script = WireBuffer::new();
        posdata(&mut script, vec![Vector3::zeros()]);
        let mut stream = ScriptedStream::new(script);

        let err = Driver::new(&mut stream, constant_energy(0.0), si_config())
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Framing(FramingError::UnexpectedCommand {
                command: Command::PosData,
                state: "NEEDINIT",
            })
        ));
    }

    #[test]
    fn truncated_positions_raise_framing_error_and_produce_no_output() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        script
            .put_header(Command::PosData.header())
            .put_matrix3(&Matrix3::identity())
            .put_matrix3(&Matrix3::identity())
            .put_i32(4)
            .put_vectors(&[Vector3::zeros(), Vector3::zeros()]);
        let mut stream = ScriptedStream::new(script);

        let mut calls = 0;
        let evaluator = from_fn(|c: &AtomicConfiguration| {
            calls += 1;
            Ok(ForceResult::new(0.0, vec![Vector3::zeros(); c.len()]))
        });
        let err = Driver::new(&mut stream, evaluator, si_config())
            .run()
            .unwrap_err();

        assert!(matches!(
            err,
            DriverError::Framing(FramingError::ShortRead {
                context: "positions",
                ..
            })
        ));
        assert!(stream.output.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn unknown_command_is_a_framing_error() {
        let mut script = WireBuffer::new();
        script.put_header(*b"RESET       ");
        let mut stream = ScriptedStream::new(script);

        let err = Driver::new(&mut stream, constant_energy(0.0), si_config())
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Framing(FramingError::UnknownCommand(_))
        ));
    }

    #[test]
    fn disconnect_while_awaiting_command_ends_run_gracefully() {
        let mut script = WireBuffer::new();
        init(&mut script, 1, "bead");
        posdata(&mut script, vec![Vector3::zeros()]);
        let mut stream = ScriptedStream::new(script);

        let summary = Driver::new(&mut stream, constant_energy(0.0), si_config())
            .run()
            .unwrap();
        assert_eq!(summary.outcome, RunOutcome::Disconnected);
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.replica, Some(1));
    }

    #[test]
    fn evaluator_failure_propagates_and_nothing_is_sent() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        posdata(&mut script, vec![Vector3::zeros()]);
        getforce(&mut script);
        let mut stream = ScriptedStream::new(script);

        let evaluator = from_fn(|_: &AtomicConfiguration| Err(EvaluationError::failed("SCF did not converge")));
        let err = Driver::new(&mut stream, evaluator, si_config())
            .run()
            .unwrap_err();

        assert!(matches!(err, DriverError::Evaluation(EvaluationError::Failed(_))));
        assert!(stream.output.is_empty());
    }

    #[test]
    fn force_count_mismatch_is_an_evaluation_error() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        posdata(&mut script, vec![Vector3::zeros(), Vector3::zeros()]);
        getforce(&mut script);
        let mut stream = ScriptedStream::new(script);

        let evaluator = from_fn(|_: &AtomicConfiguration| Ok(ForceResult::new(0.0, vec![Vector3::zeros()])));
        let err = Driver::new(&mut stream, evaluator, si_config())
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Evaluation(EvaluationError::ForceCountMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(stream.output.is_empty());
    }

    #[test]
    fn lazy_mode_evaluates_once_per_getforce() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        for _ in 0..3 {
            posdata(&mut script, vec![Vector3::zeros()]);
            status(&mut script);
            getforce(&mut script);
        }
        exit(&mut script);
        let mut stream = ScriptedStream::new(script);

        let mut calls = 0;
        let evaluator = from_fn(|c: &AtomicConfiguration| {
            calls += 1;
            Ok(ForceResult::new(0.0, vec![Vector3::zeros(); c.len()]))
        });
        let summary = Driver::new(&mut stream, evaluator, si_config())
            .run()
            .unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn eager_mode_evaluates_on_posdata() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        posdata(&mut script, vec![Vector3::zeros()]);
        let mut stream = ScriptedStream::new(script);

        let mut calls = 0;
        let evaluator = from_fn(|c: &AtomicConfiguration| {
            calls += 1;
            Ok(ForceResult::new(0.0, vec![Vector3::zeros(); c.len()]))
        });
        let config = ProtocolConfig {
            evaluation: EvaluationMode::Eager,
            ..si_config()
        };
        let mut driver = Driver::new(&mut stream, evaluator, config);
        assert_eq!(driver.step().unwrap(), Step::Continue);
        assert_eq!(driver.step().unwrap(), Step::Continue);
        assert_eq!(driver.state(), ConnectionState::ForceReady);
        drop(driver);
        assert_eq!(calls, 1);
    }

    #[test]
    fn atomic_wire_units_are_converted_on_both_boundaries() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        posdata(&mut script, vec![Vector3::new(2.0, 0.0, 0.0)]);
        getforce(&mut script);
        exit(&mut script);
        let mut stream = ScriptedStream::new(script);

        let mut seen = None;
        let evaluator = from_fn(|c: &AtomicConfiguration| {
            seen = Some((c.positions()[0].x, c.cell().matrix()[(0, 0)]));
            Ok(ForceResult::new(
                3.0 * HARTREE,
                vec![Vector3::new(0.0, HARTREE / BOHR, 0.0)],
            )
            .with_virial(Matrix3::from_diagonal_element(HARTREE)))
        });
        let config = ProtocolConfig {
            wire_units: WireUnits::atomic(),
            ..ProtocolConfig::default()
        };
        Driver::new(&mut stream, evaluator, config).run().unwrap();

        let (x, h) = seen.unwrap();
        assert!((x / (2.0 * BOHR) - 1.0).abs() < 1e-12);
        assert!((h / (10.0 * BOHR) - 1.0).abs() < 1e-12);

        let mut output = Cursor::new(stream.output);
        assert_eq!(read_reply(&mut output), Reply::ForceReady);
        let message = ForceMessage::decode(&mut output, 10).unwrap();
        assert!((message.energy - 3.0).abs() < 1e-12);
        assert!((message.forces[0].y - 1.0).abs() < 1e-12);
        assert!((message.virial[(1, 1)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn init_string_and_replica_reach_the_evaluator() {
        struct Recording {
            init: Option<(i32, String)>,
        }
        impl Evaluator for Recording {
            fn evaluate(
                &mut self,
                c: &AtomicConfiguration,
            ) -> Result<ForceResult, EvaluationError> {
                Ok(ForceResult::new(0.0, vec![Vector3::zeros(); c.len()]))
            }
            fn on_init(&mut self, replica: i32, info: &str) {
                self.init = Some((replica, info.to_string()));
            }
        }

        let mut script = WireBuffer::new();
        init(&mut script, 7, "<init>bead 7</init>");
        exit(&mut script);
        let mut stream = ScriptedStream::new(script);

        let mut evaluator = Recording { init: None };
        Driver::new(&mut stream, &mut evaluator, si_config())
            .run()
            .unwrap();
        assert_eq!(
            evaluator.init,
            Some((7, "<init>bead 7</init>".to_string()))
        );
    }

    #[test]
    fn extra_string_is_relayed_with_its_length() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        posdata(&mut script, vec![]);
        getforce(&mut script);
        exit(&mut script);
        let mut stream = ScriptedStream::new(script);

        let evaluator = from_fn(|_: &AtomicConfiguration| {
            Ok(ForceResult::new(0.0, vec![]).with_extra("{\"charge\": 0}"))
        });
        Driver::new(&mut stream, evaluator, si_config()).run().unwrap();

        let mut output = Cursor::new(stream.output);
        read_reply(&mut output);
        let message = ForceMessage::decode(&mut output, 0).unwrap();
        assert_eq!(message.extra, b"{\"charge\": 0}");
    }

    #[test]
    fn oversized_atom_count_is_rejected() {
        let mut script = WireBuffer::new();
        init(&mut script, 0, "");
        posdata(&mut script, vec![Vector3::zeros(); 3]);
        let mut stream = ScriptedStream::new(script);

        let config = ProtocolConfig {
            max_atoms: 2,
            ..si_config()
        };
        let err = Driver::new(&mut stream, constant_energy(0.0), config)
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Framing(FramingError::TooManyAtoms { count: 3, limit: 2 })
        ));
    }
}
