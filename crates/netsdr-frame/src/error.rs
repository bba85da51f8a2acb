use crate::codec::MessageType;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer is shorter than the smallest valid message of its kind.
    #[error("truncated message ({actual} bytes, need at least {needed})")]
    Truncated { needed: usize, actual: usize },

    /// The header length field disagrees with the number of bytes received.
    #[error("length mismatch (header declares {declared} bytes, got {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The control message addresses an item this codec does not know.
    #[error("unknown control item code 0x{0:04X}")]
    UnknownItem(u16),

    /// The message type is not valid in this position (e.g. a control
    /// message where a data item was expected).
    #[error("unexpected message type {0:?}")]
    UnexpectedType(MessageType),

    /// The message exceeds what the 13-bit length field can describe.
    #[error("message too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Sample expansion was asked for a width it cannot represent.
    #[error("unsupported sample width: {0} bits")]
    UnsupportedSampleWidth(u8),

    /// An I/O error occurred while reading a message stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
