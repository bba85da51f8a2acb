use std::path::PathBuf;
use std::time::Duration;

use netsdr_frame::SampleWidth;
use netsdr_transport::{DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT};

use crate::correlator::DEFAULT_REPLY_TIMEOUT;

/// RF filter mode selecting the automatic filter.
pub const RF_FILTER_AUTO: u16 = 0;

/// A/D mode pattern sent during setup.
pub const DEFAULT_AD_MODE: [u8; 2] = [0x00, 0x03];

/// Receiver setup and capture configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a command waits for its reply.
    pub reply_timeout: Duration,
    /// IQ output sample rate in Hz, sent during connect.
    pub sample_rate: u64,
    /// RF filter mode, sent during connect.
    pub rf_filter: u16,
    /// A/D mode pattern, sent during connect.
    pub ad_mode: [u8; 2],
    /// Width of each IQ sample on the wire and in the sink.
    pub sample_width: SampleWidth,
    /// Channel count in the receiver-state start command.
    pub channel_count: u8,
    /// File the sample stream is appended to.
    pub sink_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            sample_rate: 100_000,
            rf_filter: RF_FILTER_AUTO,
            ad_mode: DEFAULT_AD_MODE,
            sample_width: SampleWidth::Bits16,
            channel_count: 1,
            sink_path: PathBuf::from("samples.bin"),
        }
    }
}

/// Where the receiver lives and where samples are received.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub host: String,
    pub control_port: u16,
    /// Local address the data socket binds.
    pub data_bind: String,
    pub connect_timeout: Duration,
}

impl NetworkConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            control_port: DEFAULT_CONTROL_PORT,
            data_bind: format!("0.0.0.0:{DEFAULT_DATA_PORT}"),
            connect_timeout: Duration::from_secs(5),
        }
    }
}
