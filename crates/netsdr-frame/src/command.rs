use bytes::{Bytes, BytesMut};

use crate::codec::{encode_control, MessageType};
use crate::error::Result;
use crate::item::ControlItem;
use crate::sample::SampleWidth;

/// Whether a command writes or reads a control item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Set,
    Get,
}

impl Operation {
    /// Message type the host uses for this operation.
    pub fn message_type(self) -> MessageType {
        match self {
            Operation::Set => MessageType::SetControlItem,
            Operation::Get => MessageType::CurrentControlItem,
        }
    }

    /// Operation carried by a control message type, if any.
    pub fn from_message_type(msg_type: MessageType) -> Option<Self> {
        match msg_type {
            MessageType::SetControlItem => Some(Operation::Set),
            MessageType::CurrentControlItem => Some(Operation::Get),
            _ => None,
        }
    }
}

/// A control command ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    operation: Operation,
    item: ControlItem,
    payload: Bytes,
}

impl ControlCommand {
    /// Create a command.
    pub fn new(operation: Operation, item: ControlItem, payload: impl Into<Bytes>) -> Self {
        Self {
            operation,
            item,
            payload: payload.into(),
        }
    }

    /// Create a set command.
    pub fn set(item: ControlItem, payload: impl Into<Bytes>) -> Self {
        Self::new(Operation::Set, item, payload)
    }

    /// Create a request for the current value of an item.
    pub fn get(item: ControlItem, payload: impl Into<Bytes>) -> Self {
        Self::new(Operation::Get, item, payload)
    }

    /// IQ output sample rate, sent as the low 5 bytes of the 64-bit value.
    pub fn sample_rate(hz: u64) -> Self {
        Self::set(
            ControlItem::IqOutputSampleRate,
            Bytes::copy_from_slice(&low_40_bits(hz)),
        )
    }

    /// RF filter mode (0 selects the automatic filter).
    pub fn rf_filter(mode: u16) -> Self {
        Self::set(
            ControlItem::RfFilter,
            Bytes::copy_from_slice(&mode.to_le_bytes()),
        )
    }

    /// A/D converter mode pattern.
    pub fn ad_modes(pattern: [u8; 2]) -> Self {
        Self::set(ControlItem::AdModes, Bytes::copy_from_slice(&pattern))
    }

    /// Receiver run/stop state.
    pub fn receiver_state(state: ReceiverState) -> Self {
        Self::set(
            ControlItem::ReceiverState,
            Bytes::copy_from_slice(&state.to_bytes()),
        )
    }

    /// Receiver frequency: one channel byte followed by the low 5 bytes of
    /// the frequency in Hz.
    pub fn frequency(channel: u8, hz: u64) -> Self {
        let mut payload = BytesMut::with_capacity(6);
        payload.extend_from_slice(&[channel]);
        payload.extend_from_slice(&low_40_bits(hz));
        Self::set(ControlItem::ReceiverFrequency, payload.freeze())
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn item(&self) -> ControlItem {
        self.item
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Append the wire encoding to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        encode_control(self.operation.message_type(), self.item, &self.payload, dst)
    }

    /// Encode into a standalone buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Receiver state parameters: data mode, run/stop, capture mode, count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverState {
    pub data_mode: u8,
    pub run: bool,
    pub capture_mode: u8,
    pub count: u8,
}

impl ReceiverState {
    /// Complex IQ base-band data.
    pub const COMPLEX_IQ: u8 = 0x80;
    const RUN: u8 = 0x02;
    const STOP: u8 = 0x01;

    /// Start continuous complex IQ capture at the given sample width.
    pub fn start(width: SampleWidth, count: u8) -> Self {
        Self {
            data_mode: Self::COMPLEX_IQ,
            run: true,
            capture_mode: width.capture_mode(),
            count,
        }
    }

    /// Stop capture.
    pub fn stop() -> Self {
        Self {
            data_mode: 0,
            run: false,
            capture_mode: 0,
            count: 0,
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let run = if self.run { Self::RUN } else { Self::STOP };
        [self.data_mode, run, self.capture_mode, self.count]
    }
}

fn low_40_bits(value: u64) -> [u8; 5] {
    let bytes = value.to_le_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
}
