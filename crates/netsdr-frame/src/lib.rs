//! NetSDR message framing.
//!
//! Every message on either channel starts with a 2-byte little-endian header:
//! - bits 0-12 carry the total message length, header included
//! - bits 13-15 carry the message type
//!
//! Control messages follow the header with a 2-byte item code and the item
//! parameters. Data items follow it with a 2-byte sequence number and a body
//! of packed little-endian IQ samples.

pub mod codec;
pub mod command;
pub mod error;
pub mod item;
pub mod sample;
pub mod stream;

pub use codec::{
    decode_message, encode_control, encode_data_item, Message, MessageType, HEADER_SIZE,
    MAX_DATA_ITEM_LENGTH, MAX_MESSAGE_LENGTH,
};
pub use command::{ControlCommand, Operation, ReceiverState};
pub use error::{FrameError, Result};
pub use item::ControlItem;
pub use sample::{decode_data_frame, expand_samples, DataFrame, SampleWidth};
pub use stream::MessageCodec;
