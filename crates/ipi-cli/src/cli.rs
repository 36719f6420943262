use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "i-PI client - Connects to an i-PI path-integral molecular dynamics server and supplies energies, forces and virials.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to an i-PI server and serve force requests until it exits.
    Run(RunArgs),
    /// Inspect the unit conversion table.
    Units(UnitsArgs),
}

/// Evaluation timing as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationArg {
    /// Evaluate when the server asks for forces.
    Lazy,
    /// Evaluate as soon as positions arrive.
    Eager,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Connection ---
    /// Server host name or address for a TCP connection.
    #[arg(long, value_name = "HOST", conflicts_with = "unix")]
    pub host: Option<String>,

    /// Server port for a TCP connection.
    #[arg(short, long, value_name = "PORT", conflicts_with = "unix")]
    pub port: Option<u16>,

    /// Unix domain socket path, or a bare name expanded to /tmp/ipi_<NAME>.
    #[arg(short, long, value_name = "NAME_OR_PATH")]
    pub unix: Option<PathBuf>,

    /// Seconds to wait for each connection attempt.
    #[arg(long, value_name = "SECONDS")]
    pub connect_timeout: Option<f64>,

    /// Number of connection attempts before giving up.
    #[arg(long, value_name = "INT")]
    pub connect_attempts: Option<u32>,

    // --- Protocol ---
    /// Length unit of positions and cell on the wire (e.g., 'bohr', 'angstrom', 'm').
    #[arg(long, value_name = "UNIT")]
    pub wire_length_unit: Option<String>,

    /// Energy unit of energy and virial on the wire (e.g., 'hartree', 'ev', 'j').
    #[arg(long, value_name = "UNIT")]
    pub wire_energy_unit: Option<String>,

    /// When to run the evaluator.
    #[arg(long, value_enum, value_name = "MODE")]
    pub evaluation: Option<EvaluationArg>,

    /// Seconds to wait for the next command before giving up. Waits forever if unset.
    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<f64>,

    // --- Evaluator ---
    /// Force constant of the harmonic tether, in kJ/mol/Å².
    #[arg(short = 'k', long, value_name = "FLOAT")]
    pub force_constant: Option<f64>,

    // --- Run control ---
    /// Number of independent replica clients to run side by side.
    #[arg(short = 'n', long, value_name = "INT")]
    pub replicas: Option<usize>,

    /// Start a new session after the server sends EXIT.
    #[arg(long)]
    pub reconnect: bool,

    /// Stop reconnecting after this many sessions.
    #[arg(long, value_name = "INT", requires = "reconnect")]
    pub max_sessions: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S protocol.max-atoms=5000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `units` subcommand.
#[derive(Args, Debug)]
pub struct UnitsArgs {
    #[command(subcommand)]
    pub command: UnitsCommands,
}

#[derive(Subcommand, Debug)]
pub enum UnitsCommands {
    /// Print every known unit with its dimension and SI factor.
    List,
    /// Convert a value between two units of the same dimension.
    Convert {
        /// The value to convert.
        #[arg(allow_negative_numbers = true)]
        value: f64,
        /// Unit of the value (e.g., 'hartree').
        from: String,
        /// Target unit. Defaults to the SI unit of the same dimension.
        #[arg(long, value_name = "UNIT")]
        to: Option<String>,
    },
}
