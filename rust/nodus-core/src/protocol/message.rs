// Message - Enveloppe des messages: magic, commande, longueur, checksum, payload
use super::command::{assert_command, Command, COMMAND_LENGTH};
use super::payload::{
    AddrPayload, FilterAddPayload, FilterLoadPayload, GetBlocksPayload, HeadersPayload, InvPayload,
    MerkleBlockPayload, PingPayload, VersionPayload,
};
use crate::types::{checksum, Block, Transaction};
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Largest payload accepted in one message
pub const PAYLOAD_MAX_SIZE: usize = 0x0200_0000;

/// Envelope bytes preceding the payload
pub const MESSAGE_HEADER_SIZE: usize = sizes::SIZE_OF_U32 + COMMAND_LENGTH + sizes::SIZE_OF_U32 + sizes::SIZE_OF_U32;

/// Decoded message body, one variant per command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageValue {
    Addr(AddrPayload),
    Block(Block),
    /// Consensus payloads are relayed opaquely
    Consensus(Vec<u8>),
    FilterAdd(FilterAddPayload),
    FilterClear,
    FilterLoad(FilterLoadPayload),
    GetAddr,
    GetBlocks(GetBlocksPayload),
    GetData(InvPayload),
    GetHeaders(GetBlocksPayload),
    Headers(HeadersPayload),
    Inv(InvPayload),
    Mempool,
    Transaction(Transaction),
    Verack,
    Version(VersionPayload),
    Alert,
    MerkleBlock(MerkleBlockPayload),
    NotFound(InvPayload),
    Ping(PingPayload),
    Pong(PingPayload),
    Reject,
}

impl MessageValue {
    pub fn command(&self) -> Command {
        match self {
            MessageValue::Addr(_) => Command::Addr,
            MessageValue::Block(_) => Command::Block,
            MessageValue::Consensus(_) => Command::Consensus,
            MessageValue::FilterAdd(_) => Command::FilterAdd,
            MessageValue::FilterClear => Command::FilterClear,
            MessageValue::FilterLoad(_) => Command::FilterLoad,
            MessageValue::GetAddr => Command::GetAddr,
            MessageValue::GetBlocks(_) => Command::GetBlocks,
            MessageValue::GetData(_) => Command::GetData,
            MessageValue::GetHeaders(_) => Command::GetHeaders,
            MessageValue::Headers(_) => Command::Headers,
            MessageValue::Inv(_) => Command::Inv,
            MessageValue::Mempool => Command::Mempool,
            MessageValue::Transaction(_) => Command::Transaction,
            MessageValue::Verack => Command::Verack,
            MessageValue::Version(_) => Command::Version,
            MessageValue::Alert => Command::Alert,
            MessageValue::MerkleBlock(_) => Command::MerkleBlock,
            MessageValue::NotFound(_) => Command::NotFound,
            MessageValue::Ping(_) => Command::Ping,
            MessageValue::Pong(_) => Command::Pong,
            MessageValue::Reject => Command::Reject,
        }
    }

    fn write_payload(&self, writer: &mut BinaryWriter) {
        match self {
            MessageValue::Addr(payload) => payload.serialize_wire_base(writer),
            MessageValue::Block(block) => block.serialize_wire_base(writer),
            MessageValue::Consensus(bytes) => {
                writer.write_bytes(bytes);
            }
            MessageValue::FilterAdd(payload) => payload.serialize_wire_base(writer),
            MessageValue::FilterLoad(payload) => payload.serialize_wire_base(writer),
            MessageValue::GetBlocks(payload) | MessageValue::GetHeaders(payload) => {
                payload.serialize_wire_base(writer)
            }
            MessageValue::GetData(payload) | MessageValue::Inv(payload) | MessageValue::NotFound(payload) => {
                payload.serialize_wire_base(writer)
            }
            MessageValue::Headers(payload) => payload.serialize_wire_base(writer),
            MessageValue::Transaction(tx) => tx.serialize_wire_base(writer),
            MessageValue::Version(payload) => payload.serialize_wire_base(writer),
            MessageValue::MerkleBlock(payload) => payload.serialize_wire_base(writer),
            MessageValue::Ping(payload) | MessageValue::Pong(payload) => payload.serialize_wire_base(writer),
            MessageValue::FilterClear
            | MessageValue::GetAddr
            | MessageValue::Mempool
            | MessageValue::Verack
            | MessageValue::Alert
            | MessageValue::Reject => {}
        }
    }

    fn payload_size(&self) -> usize {
        match self {
            MessageValue::Addr(payload) => payload.size(),
            MessageValue::Block(block) => block.size(),
            MessageValue::Consensus(bytes) => bytes.len(),
            MessageValue::FilterAdd(payload) => payload.size(),
            MessageValue::FilterLoad(payload) => payload.size(),
            MessageValue::GetBlocks(payload) | MessageValue::GetHeaders(payload) => payload.size(),
            MessageValue::GetData(payload) | MessageValue::Inv(payload) | MessageValue::NotFound(payload) => {
                payload.size()
            }
            MessageValue::Headers(payload) => payload.size(),
            MessageValue::Transaction(tx) => tx.size(),
            MessageValue::Version(payload) => payload.size(),
            MessageValue::MerkleBlock(payload) => payload.size(),
            MessageValue::Ping(payload) | MessageValue::Pong(payload) => payload.size(),
            MessageValue::FilterClear
            | MessageValue::GetAddr
            | MessageValue::Mempool
            | MessageValue::Verack
            | MessageValue::Alert
            | MessageValue::Reject => 0,
        }
    }

    fn read_payload(command: Command, payload: &[u8], context: &DeserializeWireContext) -> Result<Self, FormatError> {
        let value = match command {
            Command::Addr => MessageValue::Addr(AddrPayload::deserialize_wire(payload, context)?),
            Command::Block => MessageValue::Block(Block::deserialize_wire(payload, context)?),
            Command::Consensus => MessageValue::Consensus(payload.to_vec()),
            Command::FilterAdd => MessageValue::FilterAdd(FilterAddPayload::deserialize_wire(payload, context)?),
            Command::FilterClear => empty(payload, MessageValue::FilterClear)?,
            Command::FilterLoad => MessageValue::FilterLoad(FilterLoadPayload::deserialize_wire(payload, context)?),
            Command::GetAddr => empty(payload, MessageValue::GetAddr)?,
            Command::GetBlocks => MessageValue::GetBlocks(GetBlocksPayload::deserialize_wire(payload, context)?),
            Command::GetData => MessageValue::GetData(InvPayload::deserialize_wire(payload, context)?),
            Command::GetHeaders => MessageValue::GetHeaders(GetBlocksPayload::deserialize_wire(payload, context)?),
            Command::Headers => MessageValue::Headers(HeadersPayload::deserialize_wire(payload, context)?),
            Command::Inv => MessageValue::Inv(InvPayload::deserialize_wire(payload, context)?),
            Command::Mempool => empty(payload, MessageValue::Mempool)?,
            Command::Transaction => MessageValue::Transaction(Transaction::deserialize_wire(payload, context)?),
            Command::Verack => empty(payload, MessageValue::Verack)?,
            Command::Version => MessageValue::Version(VersionPayload::deserialize_wire(payload, context)?),
            // Alert and reject bodies carry nothing we act on
            Command::Alert => MessageValue::Alert,
            Command::MerkleBlock => {
                MessageValue::MerkleBlock(MerkleBlockPayload::deserialize_wire(payload, context)?)
            }
            Command::NotFound => MessageValue::NotFound(InvPayload::deserialize_wire(payload, context)?),
            Command::Ping => MessageValue::Ping(PingPayload::deserialize_wire(payload, context)?),
            Command::Pong => MessageValue::Pong(PingPayload::deserialize_wire(payload, context)?),
            Command::Reject => MessageValue::Reject,
        };
        Ok(value)
    }
}

fn empty(payload: &[u8], value: MessageValue) -> Result<MessageValue, FormatError> {
    if payload.is_empty() {
        Ok(value)
    } else {
        Err(FormatError::TrailingBytes(payload.len()))
    }
}

/// Framed protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub magic: u32,
    pub value: MessageValue,
}

/// Parsed envelope fields
#[derive(Debug, Clone, Copy)]
pub(crate) struct MessageHeader {
    pub command: Command,
    pub length: usize,
    pub checksum: u32,
}

impl MessageHeader {
    /// Read and validate the envelope preceding a payload
    pub(crate) fn read(reader: &mut BinaryReader<'_>, context: &DeserializeWireContext) -> Result<Self, FormatError> {
        let magic = reader.read_u32_le()?;
        if magic != context.message_magic {
            return Err(FormatError::InvalidValue(format!(
                "message magic {:#010x}, expected {:#010x}",
                magic, context.message_magic
            )));
        }
        let command = assert_command(&reader.read_fixed_string(COMMAND_LENGTH)?)?;
        let length = reader.read_u32_le()? as usize;
        if length > PAYLOAD_MAX_SIZE {
            return Err(FormatError::TooLong {
                len: length as u64,
                max: PAYLOAD_MAX_SIZE as u64,
            });
        }
        let checksum = reader.read_u32_le()?;
        Ok(Self {
            command,
            length,
            checksum,
        })
    }
}

impl Message {
    pub fn new(magic: u32, value: MessageValue) -> Self {
        Self { magic, value }
    }

    pub fn command(&self) -> Command {
        self.value.command()
    }

    fn payload_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.value.payload_size());
        self.value.write_payload(&mut writer);
        writer.into_bytes()
    }
}

impl SerializableWire for Message {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        let payload = self.payload_bytes();
        writer
            .write_u32_le(self.magic)
            .write_bytes(&self.command().to_fixed_bytes())
            .write_u32_le(payload.len() as u32)
            .write_u32_le(checksum(&payload))
            .write_bytes(&payload);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let header = MessageHeader::read(reader, context)?;
        let payload = reader.read_bytes(header.length)?;
        let actual = checksum(payload);
        if actual != header.checksum {
            return Err(FormatError::InvalidValue(format!(
                "checksum mismatch: header {:#010x}, payload {:#010x}",
                header.checksum, actual
            )));
        }
        let value = MessageValue::read_payload(header.command, payload, context)?;
        Ok(Self {
            magic: context.message_magic,
            value,
        })
    }

    fn size(&self) -> usize {
        MESSAGE_HEADER_SIZE + self.value.payload_size()
    }
}
