// Codec - Découpage d'un flux d'octets en messages
use super::message::{Message, MessageHeader, MESSAGE_HEADER_SIZE};
use crate::wire::{BinaryReader, DeserializeWireContext, FormatError, SerializableWire};
use bytes::BytesMut;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Stream framing failure
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Format(#[from] FormatError),
}

impl CodecError {
    /// The remote sent bytes that do not parse
    pub fn is_malformed(&self) -> bool {
        matches!(self, CodecError::Format(_))
    }
}

/// Frames a byte stream into `Message`s for one network magic
#[derive(Debug, Clone, Copy)]
pub struct MessageCodec {
    context: DeserializeWireContext,
}

impl MessageCodec {
    pub fn new(context: DeserializeWireContext) -> Self {
        Self { context }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        if src.len() < MESSAGE_HEADER_SIZE {
            return Ok(None);
        }

        // Validate the envelope as soon as it is complete, before buffering the payload
        let header = MessageHeader::read(&mut BinaryReader::new(&src[..MESSAGE_HEADER_SIZE]), &self.context)?;
        let frame_len = MESSAGE_HEADER_SIZE + header.length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        Ok(Some(Message::deserialize_wire(&frame, &self.context)?))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        dst.extend_from_slice(&item.serialize_wire());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MessageValue, PingPayload};

    const MAGIC: u32 = 7630401;

    fn codec() -> MessageCodec {
        MessageCodec::new(DeserializeWireContext::new(MAGIC))
    }

    fn ping(nonce: u32) -> Message {
        Message::new(
            MAGIC,
            MessageValue::Ping(PingPayload {
                last_block_index: 1,
                timestamp: 2,
                nonce,
            }),
        )
    }

    #[test]
    fn test_waits_for_complete_frame() {
        let bytes = ping(1).serialize_wire();
        let mut codec = codec();
        let mut buffer = BytesMut::new();

        buffer.extend_from_slice(&bytes[..10]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(&bytes[10..bytes.len() - 1]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(&bytes[bytes.len() - 1..]);
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(ping(1)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decodes_back_to_back_frames() {
        let mut codec = codec();
        let mut buffer = BytesMut::new();
        codec.encode(ping(1), &mut buffer).unwrap();
        codec.encode(ping(2), &mut buffer).unwrap();

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(ping(1)));
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(ping(2)));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_bad_header_fails_before_payload_arrives() {
        let mut bytes = ping(1).serialize_wire();
        bytes[0] ^= 0xff;
        let mut buffer = BytesMut::from(&bytes[..MESSAGE_HEADER_SIZE]);
        let err = codec().decode(&mut buffer).unwrap_err();
        assert!(err.is_malformed());
    }
}
