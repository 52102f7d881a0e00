// Filter - Filtres de Bloom pour clients légers
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Maximum bloom filter size in bytes
pub const MAX_FILTER_SIZE: usize = 36_000;

/// Maximum number of hash functions
pub const MAX_HASH_FUNCTIONS: u8 = 50;

/// Maximum element pushed by `filteradd`
pub const MAX_FILTER_ELEMENT_SIZE: usize = 520;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLoadPayload {
    pub filter: Vec<u8>,
    pub hash_functions: u8,
    pub tweak: u32,
    pub flags: u8,
}

impl SerializableWire for FilterLoadPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer
            .write_var_bytes(&self.filter)
            .write_u8(self.hash_functions)
            .write_u32_le(self.tweak)
            .write_u8(self.flags);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let filter = reader.read_var_bytes(MAX_FILTER_SIZE)?.to_vec();
        let hash_functions = reader.read_u8()?;
        if hash_functions > MAX_HASH_FUNCTIONS {
            return Err(FormatError::TooLong {
                len: u64::from(hash_functions),
                max: u64::from(MAX_HASH_FUNCTIONS),
            });
        }
        Ok(Self {
            filter,
            hash_functions,
            tweak: reader.read_u32_le()?,
            flags: reader.read_u8()?,
        })
    }

    fn size(&self) -> usize {
        sizes::var_bytes(self.filter.len()) + sizes::SIZE_OF_U8 + sizes::SIZE_OF_U32 + sizes::SIZE_OF_U8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAddPayload {
    pub data: Vec<u8>,
}

impl SerializableWire for FilterAddPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer.write_var_bytes(&self.data);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        Ok(Self {
            data: reader.read_var_bytes(MAX_FILTER_ELEMENT_SIZE)?.to_vec(),
        })
    }

    fn size(&self) -> usize {
        sizes::var_bytes(self.data.len())
    }
}
