// Version - Payload de poignée de main
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Maximum user agent length in bytes
pub const MAX_USER_AGENT_SIZE: usize = 1024;

/// Handshake payload announcing a node's capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPayload {
    pub protocol_version: u32,
    pub services: u64,
    /// Seconds since the Unix epoch
    pub timestamp: u32,
    /// Listening port, 0 when the node does not accept connections
    pub port: u16,
    pub nonce: u32,
    pub user_agent: String,
    pub start_height: u32,
    pub relay: bool,
}

impl SerializableWire for VersionPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer
            .write_u32_le(self.protocol_version)
            .write_u64_le(self.services)
            .write_u32_le(self.timestamp)
            .write_u16_le(self.port)
            .write_u32_le(self.nonce)
            .write_var_string(&self.user_agent, MAX_USER_AGENT_SIZE)
            .write_u32_le(self.start_height)
            .write_bool(self.relay);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        Ok(Self {
            protocol_version: reader.read_u32_le()?,
            services: reader.read_u64_le()?,
            timestamp: reader.read_u32_le()?,
            port: reader.read_u16_le()?,
            nonce: reader.read_u32_le()?,
            user_agent: reader.read_var_string(MAX_USER_AGENT_SIZE)?,
            start_height: reader.read_u32_le()?,
            relay: reader.read_bool()?,
        })
    }

    fn size(&self) -> usize {
        sizes::SIZE_OF_U32
            + sizes::SIZE_OF_U64
            + sizes::SIZE_OF_U32
            + sizes::SIZE_OF_U16
            + sizes::SIZE_OF_U32
            + sizes::var_string(&self.user_agent, MAX_USER_AGENT_SIZE)
            + sizes::SIZE_OF_U32
            + sizes::SIZE_OF_BOOL
    }
}
