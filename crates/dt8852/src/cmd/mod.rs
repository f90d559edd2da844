use std::time::Duration;

use clap::{Args, Subcommand};
use dt8852::device::{FrequencyWeighting, Range, RecordingState, TimeWeighting};
use dt8852::transport::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_PORT};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod monitor;
pub mod recordings;
pub mod run;
pub mod session;
pub mod set_mode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply mode settings and wait for the meter to acknowledge them.
    SetMode(SetModeArgs),
    /// Print live sound level readings.
    Monitor(MonitorArgs),
    /// Download every stored recording session.
    Recordings(RecordingsArgs),
    /// Configure, record, monitor, stop and download in one session.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::SetMode(args) => set_mode::run(args, link, format),
        Command::Monitor(args) => monitor::run(args, link, format),
        Command::Recordings(args) => recordings::run(args, link, format),
        Command::Run(args) => run::run(args, link, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial link flags shared by every device command.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial port the meter is attached to.
    #[arg(long, env = "DT8852_PORT", default_value = DEFAULT_PORT, global = true)]
    pub port: String,
    /// Baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, global = true)]
    pub baud: u32,
    /// Serial read timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s", global = true)]
    pub timeout: String,
}

impl LinkArgs {
    pub fn serial_config(&self) -> CliResult<SerialConfig> {
        Ok(SerialConfig {
            baud_rate: self.baud,
            timeout: parse_duration(&self.timeout)?,
        })
    }
}

#[derive(Args, Debug)]
pub struct SetModeArgs {
    /// Measurement range in dB (30-130, 30-80, 50-100, 60-110, 80-130).
    #[arg(long)]
    pub range: Option<Range>,
    /// Time weighting (fast, slow).
    #[arg(long)]
    pub time: Option<TimeWeighting>,
    /// Frequency weighting (a, c).
    #[arg(long)]
    pub weighting: Option<FrequencyWeighting>,
    /// Start or stop on-device recording (on, off).
    #[arg(long)]
    pub record: Option<RecordingState>,
    /// How long to wait for all acknowledgments (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// How long to monitor (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub duration: String,
    /// Print every sample, not only changed values.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct RecordingsArgs {
    /// Give up once the meter sends nothing for this long mid-dump (e.g. 10s).
    #[arg(long, default_value = "10s")]
    pub idle: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// How long to monitor while recording (e.g. 10s).
    #[arg(long, default_value = "10s")]
    pub duration: String,
    /// How long to wait for each batch of acknowledgments.
    #[arg(long, default_value = "5s")]
    pub wait: String,
    /// Give up once the meter sends nothing for this long mid-dump.
    #[arg(long, default_value = "10s")]
    pub idle: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
