// Witness - Scripts d'invocation et de vérification
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Maximum length of either witness script
pub const MAX_WITNESS_SCRIPT_SIZE: usize = 1024;

/// Invocation + verification script pair proving authorization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witness {
    pub invocation_script: Vec<u8>,
    pub verification_script: Vec<u8>,
}

impl Witness {
    pub fn new(invocation_script: Vec<u8>, verification_script: Vec<u8>) -> Self {
        Self {
            invocation_script,
            verification_script,
        }
    }
}

impl SerializableWire for Witness {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer
            .write_var_bytes(&self.invocation_script)
            .write_var_bytes(&self.verification_script);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let invocation_script = reader.read_var_bytes(MAX_WITNESS_SCRIPT_SIZE)?.to_vec();
        let verification_script = reader.read_var_bytes(MAX_WITNESS_SCRIPT_SIZE)?.to_vec();
        Ok(Self {
            invocation_script,
            verification_script,
        })
    }

    fn size(&self) -> usize {
        sizes::var_bytes(self.invocation_script.len()) + sizes::var_bytes(self.verification_script.len())
    }
}
