// Inv - Inventaire d'objets annoncés ou demandés
use crate::types::UInt256;
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Maximum hashes per inventory message
pub const MAX_INVENTORY_HASHES: usize = 500;

/// Kind of object an inventory refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryType {
    Transaction,
    Block,
    Consensus,
}

impl InventoryType {
    pub fn as_byte(self) -> u8 {
        match self {
            InventoryType::Transaction => 0x2b,
            InventoryType::Block => 0x2c,
            InventoryType::Consensus => 0xe0,
        }
    }
}

impl TryFrom<u8> for InventoryType {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x2b => Ok(InventoryType::Transaction),
            0x2c => Ok(InventoryType::Block),
            0xe0 => Ok(InventoryType::Consensus),
            other => Err(FormatError::InvalidValue(format!("inventory type {:#04x}", other))),
        }
    }
}

/// Payload of `inv`, `getdata` and `notfound`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvPayload {
    pub inventory_type: InventoryType,
    pub hashes: Vec<UInt256>,
}

impl SerializableWire for InvPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer
            .write_u8(self.inventory_type.as_byte())
            .write_array(&self.hashes, |w, hash| {
                w.write_uint256(hash);
            });
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let inventory_type = InventoryType::try_from(reader.read_u8()?)?;
        let hashes = reader.read_array(MAX_INVENTORY_HASHES, |r| r.read_uint256())?;
        Ok(Self {
            inventory_type,
            hashes,
        })
    }

    fn size(&self) -> usize {
        sizes::SIZE_OF_U8 + sizes::array(self.hashes.len(), self.hashes.len() * sizes::SIZE_OF_UINT256)
    }
}
