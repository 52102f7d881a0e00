// Wire - Canonical binary encoding shared by protocol and storage structures
// Principle: One byte layout per value, decoded exactly as it was written

mod error;
mod reader;
mod serializable;
pub mod sizes;
mod writer;

pub use error::FormatError;
pub use reader::BinaryReader;
pub use serializable::{DeserializeWireContext, Memo, SerializableWire};
pub use writer::BinaryWriter;
