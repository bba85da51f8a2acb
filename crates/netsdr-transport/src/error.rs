use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the data socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect the control channel.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Connecting took longer than the configured limit.
    #[error("connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    /// An I/O error occurred on an established channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The control channel is not connected.
    #[error("transport not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
