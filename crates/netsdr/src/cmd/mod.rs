use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use netsdr_frame::{ControlItem, SampleWidth};
use netsdr_session::{NetworkConfig, SessionConfig};
use netsdr_transport::{DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT};

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod inspect;
pub mod query;
pub mod record;
pub mod tune;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture the IQ stream to a file.
    Record(RecordArgs),
    /// Change the receiver frequency.
    Tune(TuneArgs),
    /// Read the current value of a control item.
    Query(QueryArgs),
    /// Summarize a recorded sample file.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Record(args) => record::run(args, format),
        Command::Tune(args) => tune::run(args, format),
        Command::Query(args) => query::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Which receiver to talk to and how patiently.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Receiver host name or address.
    #[arg(env = "NETSDR_HOST")]
    pub host: String,
    /// Receiver control port.
    #[arg(long, env = "NETSDR_PORT", default_value_t = DEFAULT_CONTROL_PORT)]
    pub port: u16,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
    /// How long each command waits for its reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub reply_timeout: String,
}

impl TargetArgs {
    pub fn network(&self) -> CliResult<NetworkConfig> {
        Ok(NetworkConfig {
            control_port: self.port,
            connect_timeout: parse_duration(&self.connect_timeout)?,
            ..NetworkConfig::new(self.host.clone())
        })
    }

    pub fn session(&self) -> CliResult<SessionConfig> {
        Ok(SessionConfig {
            reply_timeout: parse_duration(&self.reply_timeout)?,
            ..SessionConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// File the samples are appended to.
    #[arg(long, short = 'o', default_value = "samples.bin")]
    pub output: PathBuf,
    /// Stop after this long (e.g. 30s, 500ms). Default: until Ctrl-C.
    #[arg(long)]
    pub duration: Option<String>,
    /// Tune to this frequency in Hz before capturing.
    #[arg(long, short = 'f')]
    pub frequency: Option<u64>,
    /// Receiver channel to tune.
    #[arg(long, default_value_t = 0)]
    pub channel: u8,
    /// IQ output sample rate in Hz.
    #[arg(long, default_value_t = 100_000)]
    pub sample_rate: u64,
    /// Sample width in bits (16 or 24).
    #[arg(long, default_value_t = 16)]
    pub width: u8,
    /// Local address for the UDP sample stream.
    #[arg(long, env = "NETSDR_DATA_BIND", default_value_t = format!("0.0.0.0:{DEFAULT_DATA_PORT}"))]
    pub data_bind: String,
}

#[derive(Args, Debug)]
pub struct TuneArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Frequency in Hz.
    #[arg(long, short = 'f')]
    pub frequency: u64,
    /// Receiver channel.
    #[arg(long, default_value_t = 0)]
    pub channel: u8,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Item name (e.g. receiver-frequency) or code (e.g. 0x0020).
    pub item: String,
    /// Request parameters as hex bytes (e.g. "00" for channel 0).
    #[arg(long, default_value = "")]
    pub params: String,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Sample file to read.
    pub path: PathBuf,
    /// Sample width in bits (16 or 24).
    #[arg(long, default_value_t = 16)]
    pub width: u8,
    /// Number of leading samples to show.
    #[arg(long, default_value_t = 8)]
    pub head: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub fn parse_width(bits: u8) -> CliResult<SampleWidth> {
    SampleWidth::try_from(bits).map_err(|err| CliError::usage(format!("--width: {err}")))
}

pub fn parse_item(input: &str) -> CliResult<ControlItem> {
    let input = input.trim();
    let by_code = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .and_then(|hex| u16::from_str_radix(hex, 16).ok())
        .and_then(ControlItem::from_code);

    by_code
        .or_else(|| ControlItem::from_name(input))
        .ok_or_else(|| {
            let known = ControlItem::ALL
                .iter()
                .map(|item| item.name())
                .collect::<Vec<_>>()
                .join(", ");
            CliError::usage(format!("unknown control item '{input}' (known: {known})"))
        })
}

/// Parse hex bytes, with or without separating spaces.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return Err(CliError::usage(format!(
            "hex parameters need an even number of hex digits: {input}"
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| CliError::usage(format!("invalid hex parameters: {input}")))
        })
        .collect()
}
