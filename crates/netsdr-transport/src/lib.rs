//! Transport collaborators for a NetSDR session.
//!
//! Provides the two channels a receiver exposes:
//! - a TCP control connection carrying command/reply messages
//! - a UDP socket carrying the continuous IQ sample feed
//!
//! This is the lowest layer. Inbound messages are pushed to a registered
//! [`MessageHandler`] from the transport's own receive task.

pub mod error;
pub mod tcp;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use tcp::{TcpConfig, TcpControlTransport, DEFAULT_CONTROL_PORT};
pub use traits::{ControlTransport, DataTransport, MessageHandler};
pub use udp::{UdpDataTransport, DEFAULT_DATA_PORT};
