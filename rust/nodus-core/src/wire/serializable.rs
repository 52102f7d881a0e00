// SerializableWire - the encoding contract every wire structure implements

use super::{BinaryReader, BinaryWriter, FormatError};
use std::fmt;
use std::sync::OnceLock;

/// Protocol constants needed to tell format variants apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializeWireContext {
    /// Network magic carried in every message envelope
    pub message_magic: u32,
}

impl DeserializeWireContext {
    pub fn new(message_magic: u32) -> Self {
        Self { message_magic }
    }
}

/// Canonical byte encoding with a matching decoder
///
/// `size()` must always equal `serialize_wire().len()`; callers rely on it for
/// pre-allocation and payload accounting without paying for a second encode.
pub trait SerializableWire: Sized {
    /// Append this value's bytes, without any length prefix of its own
    fn serialize_wire_base(&self, writer: &mut BinaryWriter);

    /// Rebuild a value from the reader's current position
    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError>;

    /// Encoded size in bytes
    fn size(&self) -> usize;

    fn serialize_wire(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize_wire_base(&mut writer);
        writer.into_bytes()
    }

    /// Decode a complete buffer; leftover bytes are a format error
    fn deserialize_wire(bytes: &[u8], context: &DeserializeWireContext) -> Result<Self, FormatError> {
        let mut reader = BinaryReader::new(bytes);
        let value = Self::deserialize_wire_base(&mut reader, context)?;
        if reader.remaining() > 0 {
            return Err(FormatError::TrailingBytes(reader.remaining()));
        }
        Ok(value)
    }
}

/// Lazily computed, write-once value that never takes part in equality
///
/// Used for hashes and sizes derived from immutable fields.
pub struct Memo<T>(OnceLock<T>);

impl<T> Memo<T> {
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        self.0.get_or_init(init)
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Memo<T> {
    fn clone(&self) -> Self {
        let memo = Self::new();
        if let Some(value) = self.0.get() {
            let _ = memo.0.set(value.clone());
        }
        memo
    }
}

impl<T> PartialEq for Memo<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for Memo<T> {}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(value) => write!(f, "Memo({:?})", value),
            None => write!(f, "Memo(<unset>)"),
        }
    }
}
