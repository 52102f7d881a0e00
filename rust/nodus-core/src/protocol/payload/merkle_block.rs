// MerkleBlock - En-tête plus preuve partielle de Merkle
use crate::types::{Header, UInt256, MAX_TRANSACTIONS_PER_BLOCK};
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// One flag bit per transaction, rounded up to whole bytes
const MAX_FLAG_BYTES: usize = MAX_TRANSACTIONS_PER_BLOCK.div_ceil(8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleBlockPayload {
    pub header: Header,
    pub transaction_count: u32,
    pub hashes: Vec<UInt256>,
    pub flags: Vec<u8>,
}

impl SerializableWire for MerkleBlockPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        self.header.serialize_wire_base(writer);
        writer
            .write_var_uint(u64::from(self.transaction_count))
            .write_array(&self.hashes, |w, hash| {
                w.write_uint256(hash);
            })
            .write_var_bytes(&self.flags);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let header = Header::deserialize_wire_base(reader, context)?;
        let transaction_count = reader.read_var_uint_max(MAX_TRANSACTIONS_PER_BLOCK as u64)? as u32;
        let hashes = reader.read_array(MAX_TRANSACTIONS_PER_BLOCK, |r| r.read_uint256())?;
        let flags = reader.read_var_bytes(MAX_FLAG_BYTES)?.to_vec();
        Ok(Self {
            header,
            transaction_count,
            hashes,
            flags,
        })
    }

    fn size(&self) -> usize {
        self.header.size()
            + sizes::var_uint(u64::from(self.transaction_count))
            + sizes::array(self.hashes.len(), self.hashes.len() * sizes::SIZE_OF_UINT256)
            + sizes::var_bytes(self.flags.len())
    }
}
