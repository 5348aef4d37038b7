//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use mock_hal::MockFault;
use std::path::PathBuf;

/// sensors-vts - conformance suite for sensors HAL implementations
#[derive(Parser, Debug)]
#[command(
    name = "sensors-vts",
    author,
    version,
    about = "Sensors HAL conformance suite",
    long_about = "Runs the sensors HAL conformance scenarios against the in-process \n\
                  reference HAL, optionally with injected contract violations, and \n\
                  reports passed, skipped and failed scenarios."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSORS_VTS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SENSORS_VTS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the conformance suite
    Run(RunArgs),

    /// List the reference HAL's sensors or the scenario matrix
    List(ListArgs),

    /// Validate a suite configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Suite configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "SENSORS_VTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only run scenarios matching these globs (comma separated, `*` wildcard)
    #[arg(short, long, value_delimiter = ',', env = "SENSORS_VTS_FILTER")]
    pub filter: Vec<String>,

    /// Skip scenarios matching these globs
    #[arg(long, value_delimiter = ',', env = "SENSORS_VTS_EXCLUDE")]
    pub exclude: Vec<String>,

    /// Contract violations to inject into the reference HAL
    #[arg(long = "fault", value_delimiter = ',', env = "SENSORS_VTS_FAULTS")]
    pub faults: Vec<MockFault>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to this file
    #[arg(long, env = "SENSORS_VTS_REPORT")]
    pub report: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SENSORS_VTS_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `list` command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// List scenario names instead of sensors
    #[arg(long)]
    pub scenarios: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "sensors-vts.toml", env = "SENSORS_VTS_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
