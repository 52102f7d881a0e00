// Protocol - Messages du réseau pair-à-pair
// Principle: Every message is framed, checksummed and validated at the boundary

mod codec;
mod command;
mod message;
pub mod payload;

pub use codec::{CodecError, MessageCodec};
pub use command::{assert_command, Command, COMMAND_LENGTH};
pub use message::{Message, MessageValue, MESSAGE_HEADER_SIZE, PAYLOAD_MAX_SIZE};
pub use payload::*;
