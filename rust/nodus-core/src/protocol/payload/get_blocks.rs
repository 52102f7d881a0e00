// GetBlocks - Requête de blocs ou d'en-têtes par localisateur
use crate::types::UInt256;
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Maximum locator hashes
pub const MAX_LOCATOR_HASHES: usize = 500;

/// Payload of `getblocks` and `getheaders`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBlocksPayload {
    pub hash_start: Vec<UInt256>,
    /// Zero means "as many as allowed"
    pub hash_stop: UInt256,
}

impl SerializableWire for GetBlocksPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer
            .write_array(&self.hash_start, |w, hash| {
                w.write_uint256(hash);
            })
            .write_uint256(&self.hash_stop);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let hash_start = reader.read_array(MAX_LOCATOR_HASHES, |r| r.read_uint256())?;
        let hash_stop = reader.read_uint256()?;
        Ok(Self { hash_start, hash_stop })
    }

    fn size(&self) -> usize {
        sizes::array(self.hash_start.len(), self.hash_start.len() * sizes::SIZE_OF_UINT256)
            + sizes::SIZE_OF_UINT256
    }
}
