use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::item::ControlItem;

/// Message header: length (13 bits) + type (3 bits) = 2 bytes.
pub const HEADER_SIZE: usize = 2;

/// Control item code following the header of a control message.
pub const ITEM_CODE_SIZE: usize = 2;

/// Sequence number following the header of a data item.
pub const SEQUENCE_SIZE: usize = 2;

/// Largest length the 13-bit header field can carry.
pub const MAX_MESSAGE_LENGTH: usize = 0x1FFF;

/// Data items of exactly this length are sent with a zero length field.
pub const MAX_DATA_ITEM_LENGTH: usize = 8194;

const LENGTH_MASK: u16 = 0x1FFF;
const TYPE_SHIFT: u16 = 13;

/// The 3-bit message type carried in the upper bits of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Host: set a control item. Target: response to a set/request.
    SetControlItem,
    /// Host: request the current value. Target: unsolicited current value.
    CurrentControlItem,
    /// Request or report of a control item's valid range.
    ControlItemRange,
    /// Data item acknowledgement.
    Ack,
    DataItem0,
    DataItem1,
    DataItem2,
    DataItem3,
}

impl MessageType {
    /// Raw 3-bit value.
    pub fn bits(self) -> u8 {
        match self {
            MessageType::SetControlItem => 0,
            MessageType::CurrentControlItem => 1,
            MessageType::ControlItemRange => 2,
            MessageType::Ack => 3,
            MessageType::DataItem0 => 4,
            MessageType::DataItem1 => 5,
            MessageType::DataItem2 => 6,
            MessageType::DataItem3 => 7,
        }
    }

    /// Build from the low 3 bits of `bits`; every value is valid.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => MessageType::SetControlItem,
            1 => MessageType::CurrentControlItem,
            2 => MessageType::ControlItemRange,
            3 => MessageType::Ack,
            4 => MessageType::DataItem0,
            5 => MessageType::DataItem1,
            6 => MessageType::DataItem2,
            _ => MessageType::DataItem3,
        }
    }

    /// Data items carry a sequence number instead of an item code.
    pub fn is_data_item(self) -> bool {
        self.bits() >= MessageType::DataItem0.bits()
    }
}

/// A decoded message from either channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: MessageType,
    /// Item code, present on control messages other than a NAK.
    pub item: Option<ControlItem>,
    /// Sequence number, present on data items only.
    pub sequence: Option<u16>,
    /// Parameters (control) or sample bytes (data).
    pub body: Bytes,
}

impl Message {
    /// A header-only control message: the target refused the request.
    pub fn is_nak(&self) -> bool {
        !self.msg_type.is_data_item() && self.item.is_none()
    }

    /// The total wire size of this message.
    pub fn wire_size(&self) -> usize {
        let prefix = if self.item.is_some() || self.sequence.is_some() {
            ITEM_CODE_SIZE
        } else {
            0
        };
        HEADER_SIZE + prefix + self.body.len()
    }
}

/// Pack a message type and total length into a header word.
pub fn encode_header(msg_type: MessageType, length: usize) -> Result<u16> {
    let field = if msg_type.is_data_item() && length == MAX_DATA_ITEM_LENGTH {
        0
    } else if length > MAX_MESSAGE_LENGTH {
        return Err(FrameError::PayloadTooLarge {
            size: length,
            max: MAX_MESSAGE_LENGTH,
        });
    } else {
        length as u16
    };
    Ok(field | (u16::from(msg_type.bits()) << TYPE_SHIFT))
}

/// Split a header word into message type and total length.
pub fn decode_header(raw: u16) -> (MessageType, usize) {
    let msg_type = MessageType::from_bits((raw >> TYPE_SHIFT) as u8);
    let mut length = usize::from(raw & LENGTH_MASK);
    if msg_type.is_data_item() && length == 0 {
        length = MAX_DATA_ITEM_LENGTH;
    }
    (msg_type, length)
}

/// Total message length announced by the header at the start of `src`, if
/// the header is complete.
pub fn peek_length(src: &[u8]) -> Option<usize> {
    if src.len() < HEADER_SIZE {
        return None;
    }
    let (_, length) = decode_header(u16::from_le_bytes([src[0], src[1]]));
    Some(length)
}

/// Encode a control message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬───────────────┬──────────────────┐
/// │ Header (2B LE)       │ Item (2B LE)  │ Parameters       │
/// │ type<<13 | length    │               │                  │
/// └──────────────────────┴───────────────┴──────────────────┘
/// ```
pub fn encode_control(
    msg_type: MessageType,
    item: ControlItem,
    params: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if msg_type.is_data_item() {
        return Err(FrameError::UnexpectedType(msg_type));
    }
    let length = HEADER_SIZE + ITEM_CODE_SIZE + params.len();
    let header = encode_header(msg_type, length)?;
    dst.reserve(length);
    dst.put_u16_le(header);
    dst.put_u16_le(item.code());
    dst.put_slice(params);
    Ok(())
}

/// Encode a data item into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬───────────────┬──────────────────┐
/// │ Header (2B LE)       │ Seq (2B LE)   │ Samples          │
/// └──────────────────────┴───────────────┴──────────────────┘
/// ```
pub fn encode_data_item(
    msg_type: MessageType,
    sequence: u16,
    body: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if !msg_type.is_data_item() {
        return Err(FrameError::UnexpectedType(msg_type));
    }
    let length = HEADER_SIZE + SEQUENCE_SIZE + body.len();
    let header = encode_header(msg_type, length)?;
    dst.reserve(length);
    dst.put_u16_le(header);
    dst.put_u16_le(sequence);
    dst.put_slice(body);
    Ok(())
}

/// Decode one complete message.
///
/// `src` must hold exactly one message; the header length must match.
pub fn decode_message(src: &[u8]) -> Result<Message> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            actual: src.len(),
        });
    }

    let (msg_type, declared) = decode_header(u16::from_le_bytes([src[0], src[1]]));
    if declared != src.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: src.len(),
        });
    }

    let rest = &src[HEADER_SIZE..];

    if msg_type.is_data_item() {
        if rest.len() < SEQUENCE_SIZE {
            return Err(FrameError::Truncated {
                needed: HEADER_SIZE + SEQUENCE_SIZE,
                actual: src.len(),
            });
        }
        let sequence = u16::from_le_bytes([rest[0], rest[1]]);
        return Ok(Message {
            msg_type,
            item: None,
            sequence: Some(sequence),
            body: Bytes::copy_from_slice(&rest[SEQUENCE_SIZE..]),
        });
    }

    if rest.is_empty() {
        return Ok(Message {
            msg_type,
            item: None,
            sequence: None,
            body: Bytes::new(),
        });
    }

    if rest.len() < ITEM_CODE_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE + ITEM_CODE_SIZE,
            actual: src.len(),
        });
    }

    let code = u16::from_le_bytes([rest[0], rest[1]]);
    let item = ControlItem::from_code(code).ok_or(FrameError::UnknownItem(code))?;

    Ok(Message {
        msg_type,
        item: Some(item),
        sequence: None,
        body: Bytes::copy_from_slice(&rest[ITEM_CODE_SIZE..]),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_control_wire_layout() {
        let mut buf = BytesMut::new();
        let params = [0x01, 0x10, 0x70, 0xD9, 0x00, 0x00];
        encode_control(
            MessageType::SetControlItem,
            ControlItem::ReceiverFrequency,
            &params,
            &mut buf,
        )
        .unwrap();

        assert_eq!(
            buf.as_ref(),
            &[0x0A, 0x00, 0x20, 0x00, 0x01, 0x10, 0x70, 0xD9, 0x00, 0x00]
        );
    }

    #[test]
    fn test_control_roundtrip() {
        let mut buf = BytesMut::new();
        encode_control(
            MessageType::CurrentControlItem,
            ControlItem::RfFilter,
            &[0x00, 0x00],
            &mut buf,
        )
        .unwrap();

        let msg = decode_message(&buf).unwrap();
        assert_eq!(msg.msg_type, MessageType::CurrentControlItem);
        assert_eq!(msg.item, Some(ControlItem::RfFilter));
        assert_eq!(msg.sequence, None);
        assert_eq!(msg.body.as_ref(), &[0x00, 0x00]);
        assert_eq!(msg.wire_size(), buf.len());
    }

    #[test]
    fn test_data_item_roundtrip() {
        let mut buf = BytesMut::new();
        encode_data_item(MessageType::DataItem0, 7, &[1, 2, 3, 4], &mut buf).unwrap();

        assert_eq!(&buf[..4], &[0x08, 0x80, 0x07, 0x00]);

        let msg = decode_message(&buf).unwrap();
        assert_eq!(msg.msg_type, MessageType::DataItem0);
        assert_eq!(msg.item, None);
        assert_eq!(msg.sequence, Some(7));
        assert_eq!(msg.body.as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_max_data_item_uses_zero_length_field() {
        let body = vec![0u8; MAX_DATA_ITEM_LENGTH - HEADER_SIZE - SEQUENCE_SIZE];
        let mut buf = BytesMut::new();
        encode_data_item(MessageType::DataItem1, 1, &body, &mut buf).unwrap();

        let header = u16::from_le_bytes([buf[0], buf[1]]);
        assert_eq!(header & LENGTH_MASK, 0);
        assert_eq!(peek_length(&buf), Some(MAX_DATA_ITEM_LENGTH));

        let msg = decode_message(&buf).unwrap();
        assert_eq!(msg.body.len(), body.len());
    }

    #[test]
    fn test_nak_decodes_without_item() {
        let msg = decode_message(&[0x02, 0x00]).unwrap();
        assert!(msg.is_nak());
        assert!(msg.body.is_empty());
    }

    #[test]
    fn test_decode_truncated_header() {
        let err = decode_message(&[0x02]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                needed: HEADER_SIZE,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_decode_length_mismatch() {
        let err = decode_message(&[0x08, 0x00, 0x01, 0x02]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthMismatch {
                declared: 8,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_decode_half_item_code() {
        let err = decode_message(&[0x03, 0x00, 0x18]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { .. }));
    }

    #[test]
    fn test_decode_unknown_item() {
        let err = decode_message(&[0x04, 0x00, 0xEF, 0xBE]).unwrap_err();
        assert!(matches!(err, FrameError::UnknownItem(0xBEEF)));
    }

    #[test]
    fn test_decode_short_data_item() {
        let err = decode_message(&[0x03, 0x80, 0x00]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { .. }));
    }

    #[test]
    fn test_encode_rejects_oversized() {
        let mut buf = BytesMut::new();
        let params = vec![0u8; MAX_MESSAGE_LENGTH];
        let err = encode_control(
            MessageType::SetControlItem,
            ControlItem::ReceiverState,
            &params,
            &mut buf,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_encode_rejects_mismatched_kind() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_control(MessageType::DataItem2, ControlItem::AdModes, &[], &mut buf),
            Err(FrameError::UnexpectedType(MessageType::DataItem2))
        ));
        assert!(matches!(
            encode_data_item(MessageType::Ack, 0, &[], &mut buf),
            Err(FrameError::UnexpectedType(MessageType::Ack))
        ));
    }

    fn control_type() -> impl Strategy<Value = MessageType> {
        (0u8..4).prop_map(MessageType::from_bits)
    }

    fn control_item() -> impl Strategy<Value = ControlItem> {
        (0usize..ControlItem::ALL.len()).prop_map(|i| ControlItem::ALL[i])
    }

    proptest! {
        #[test]
        fn control_messages_roundtrip(
            msg_type in control_type(),
            item in control_item(),
            params in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut buf = BytesMut::new();
            encode_control(msg_type, item, &params, &mut buf).unwrap();
            let msg = decode_message(&buf).unwrap();
            prop_assert_eq!(msg.msg_type, msg_type);
            prop_assert_eq!(msg.item, Some(item));
            prop_assert_eq!(msg.body.as_ref(), params.as_slice());
        }
    }
}
