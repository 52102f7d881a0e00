// Headers - Lot d'en-têtes de blocs
use crate::types::Header;
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};

/// Maximum headers per message
pub const MAX_HEADERS_COUNT: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeadersPayload {
    pub headers: Vec<Header>,
}

impl SerializableWire for HeadersPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer.write_array(&self.headers, |w, header| header.serialize_wire_base(w));
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let headers = reader.read_array(MAX_HEADERS_COUNT, |r| Header::deserialize_wire_base(r, context))?;
        Ok(Self { headers })
    }

    fn size(&self) -> usize {
        sizes::array(self.headers.len(), self.headers.iter().map(Header::size).sum())
    }
}
