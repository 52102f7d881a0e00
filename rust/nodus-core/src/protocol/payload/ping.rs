// Ping - Sonde de vivacité portant la hauteur de l'émetteur
use crate::types::BlockIndex;
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Payload of `ping` and `pong`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPayload {
    pub last_block_index: BlockIndex,
    /// Seconds since the Unix epoch
    pub timestamp: u32,
    pub nonce: u32,
}

impl SerializableWire for PingPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer
            .write_u32_le(self.last_block_index)
            .write_u32_le(self.timestamp)
            .write_u32_le(self.nonce);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        Ok(Self {
            last_block_index: reader.read_u32_le()?,
            timestamp: reader.read_u32_le()?,
            nonce: reader.read_u32_le()?,
        })
    }

    fn size(&self) -> usize {
        3 * sizes::SIZE_OF_U32
    }
}
