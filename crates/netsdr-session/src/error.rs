use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The control channel is not connected.
    #[error("no active connection")]
    NotConnected,

    /// No reply arrived within the configured window.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// A command was issued while another one was still awaiting its reply.
    #[error("another command is already awaiting a reply")]
    CommandInFlight,

    /// The pending request was abandoned (e.g. by a disconnect).
    #[error("request cancelled")]
    Cancelled,

    /// An inbound message could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(#[from] netsdr_frame::FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] netsdr_transport::TransportError),

    /// The sample file could not be opened, written or closed.
    #[error("sample sink {path}: {source}")]
    Sink {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SessionError {
    /// The command went out but its reply was unusable (late or garbled).
    pub fn is_reply_failure(&self) -> bool {
        matches!(
            self,
            SessionError::RequestTimeout(_) | SessionError::Malformed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
