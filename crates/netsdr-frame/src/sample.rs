//! IQ sample frames from the data channel.

use bytes::Bytes;

use crate::codec::{decode_message, MessageType};
use crate::error::{FrameError, Result};

/// Width of one IQ sample on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleWidth {
    #[default]
    Bits16,
    Bits24,
}

impl SampleWidth {
    pub fn bits(self) -> u8 {
        match self {
            SampleWidth::Bits16 => 16,
            SampleWidth::Bits24 => 24,
        }
    }

    pub fn bytes(self) -> usize {
        usize::from(self.bits() / 8)
    }

    /// Receiver-state capture mode byte selecting FIFO capture at this width.
    pub fn capture_mode(self) -> u8 {
        match self {
            SampleWidth::Bits16 => 0x01,
            SampleWidth::Bits24 => 0x81,
        }
    }
}

impl TryFrom<u8> for SampleWidth {
    type Error = FrameError;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            16 => Ok(SampleWidth::Bits16),
            24 => Ok(SampleWidth::Bits24),
            other => Err(FrameError::UnsupportedSampleWidth(other)),
        }
    }
}

/// A decoded data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub msg_type: MessageType,
    pub sequence: u16,
    pub body: Bytes,
}

impl DataFrame {
    /// Expand the body into samples of the given width.
    pub fn samples(&self, width: SampleWidth) -> Vec<i32> {
        // Widths from `SampleWidth` are always accepted by `expand_samples`.
        expand_samples(&self.body, width.bits()).unwrap_or_default()
    }
}

/// Decode a datagram from the data channel.
pub fn decode_data_frame(src: &[u8]) -> Result<DataFrame> {
    let msg = decode_message(src)?;
    match msg.sequence {
        Some(sequence) if msg.msg_type.is_data_item() => Ok(DataFrame {
            msg_type: msg.msg_type,
            sequence,
            body: msg.body,
        }),
        _ => Err(FrameError::UnexpectedType(msg.msg_type)),
    }
}

/// Interpret `body` as packed little-endian signed integers of `bits` width.
///
/// Widths of 8, 16, 24 and 32 bits are supported. A trailing partial sample
/// (body length not a multiple of the width) is dropped.
pub fn expand_samples(body: &[u8], bits: u8) -> Result<Vec<i32>> {
    if bits == 0 || bits % 8 != 0 || bits > 32 {
        return Err(FrameError::UnsupportedSampleWidth(bits));
    }
    let width = usize::from(bits / 8);
    let shift = 32 - u32::from(bits);

    Ok(body
        .chunks_exact(width)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..width].copy_from_slice(chunk);
            // Move the sample's sign bit to bit 31, then shift back to extend it.
            (i32::from_le_bytes(word) << shift) >> shift
        })
        .collect())
}
