use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::debug;

use crate::codec::{peek_length, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Splits a control-channel byte stream into whole messages.
///
/// Handles partial reads internally; each yielded item is exactly one
/// message, header included, ready for [`decode_message`](crate::decode_message).
#[derive(Debug, Clone, Default)]
pub struct MessageCodec;

impl MessageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for MessageCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        let Some(length) = peek_length(src) else {
            return Ok(None); // Need more data
        };

        if length < HEADER_SIZE {
            debug!(length, buffered = src.len(), "control stream header declares impossible length");
            return Err(FrameError::Truncated {
                needed: HEADER_SIZE,
                actual: length,
            });
        }

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None); // Need more data
        }

        Ok(Some(src.split_to(length).freeze()))
    }
}
