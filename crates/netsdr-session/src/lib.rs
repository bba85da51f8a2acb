//! NetSDR client session engine.
//!
//! Drives a receiver over its two channels: commands and replies on the
//! control connection, the IQ sample stream on the data socket. A
//! [`Session`] pushes the receiver setup on connect, tunes, and records
//! the sample stream to a file while acquisition runs.
//!
//! # Quick start
//!
//! ```no_run
//! use netsdr_session::{connect, NetworkConfig, SessionConfig};
//!
//! # async fn run() -> netsdr_session::Result<()> {
//! let network = NetworkConfig::new("192.168.1.50");
//! let mut session = connect(&network, SessionConfig::default()).await?;
//! session.change_frequency(14_250_000, 0).await?;
//! session.start_acquisition().await?;
//! // ...
//! session.stop_acquisition().await?;
//! session.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connector;
pub mod correlator;
pub mod error;
pub mod session;
pub mod sink;

#[cfg(test)]
mod mock;

pub use config::{NetworkConfig, SessionConfig, DEFAULT_AD_MODE, RF_FILTER_AUTO};
pub use connector::{connect, new_session, NetSdrSession};
pub use correlator::{Correlator, DEFAULT_REPLY_TIMEOUT};
pub use error::{Result, SessionError};
pub use session::{Session, SessionState};
pub use sink::SampleSink;
