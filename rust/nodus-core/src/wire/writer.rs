// Binary writer - append-only little-endian encoder

use super::FormatError;
use crate::types::{UInt160, UInt256};

/// Growable buffer with typed little-endian writes
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Pre-allocate for a value whose encoded size is already known
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    pub fn write_u16_le(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Ports in network addresses are big-endian on the wire
    pub fn write_u16_be(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u64_le(&mut self, value: u64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i64_le(&mut self, value: i64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Raw bytes, no length prefix
    pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(value);
        self
    }

    /// Variable-length unsigned integer (1, 3, 5 or 9 bytes)
    pub fn write_var_uint(&mut self, value: u64) -> &mut Self {
        if value < 0xfd {
            self.write_u8(value as u8)
        } else if value <= 0xffff {
            self.write_u8(0xfd).write_u16_le(value as u16)
        } else if value <= 0xffff_ffff {
            self.write_u8(0xfe).write_u32_le(value as u32)
        } else {
            self.write_u8(0xff).write_u64_le(value)
        }
    }

    /// Length-prefixed bytes
    pub fn write_var_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.write_var_uint(value.len() as u64);
        self.write_bytes(value)
    }

    /// Length-prefixed UTF-8 string, truncated to `max` bytes on a char boundary
    pub fn write_var_string(&mut self, value: &str, max: usize) -> &mut Self {
        let mut end = value.len().min(max);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        self.write_var_bytes(&value.as_bytes()[..end])
    }

    /// Zero-padded string occupying exactly `length` bytes
    pub fn write_fixed_string(&mut self, value: &str, length: usize) -> Result<&mut Self, FormatError> {
        let bytes = value.as_bytes();
        if bytes.len() > length {
            return Err(FormatError::TooLong {
                len: bytes.len() as u64,
                max: length as u64,
            });
        }
        self.buffer.extend_from_slice(bytes);
        self.buffer.resize(self.buffer.len() + (length - bytes.len()), 0);
        Ok(self)
    }

    pub fn write_uint160(&mut self, value: &UInt160) -> &mut Self {
        self.write_bytes(value.as_bytes())
    }

    pub fn write_uint256(&mut self, value: &UInt256) -> &mut Self {
        self.write_bytes(value.as_bytes())
    }

    /// Count-prefixed array, each element written by `write`
    pub fn write_array<T>(&mut self, values: &[T], mut write: impl FnMut(&mut Self, &T)) -> &mut Self {
        self.write_var_uint(values.len() as u64);
        for value in values {
            write(self, value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_uint_widths() {
        let cases: [(u64, &[u8]); 5] = [
            (0x00, &[0x00]),
            (0xfc, &[0xfc]),
            (0xfd, &[0xfd, 0xfd, 0x00]),
            (0x1_0000, &[0xfe, 0x00, 0x00, 0x01, 0x00]),
            (0x1_0000_0000, &[0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]),
        ];

        for (value, expected) in cases {
            let mut writer = BinaryWriter::new();
            writer.write_var_uint(value);
            assert_eq!(writer.into_bytes(), expected, "value {:#x}", value);
        }
    }

    #[test]
    fn test_fixed_string_padding() {
        let mut writer = BinaryWriter::new();
        writer.write_fixed_string("ping", 12).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], b"ping");
        assert!(bytes[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_fixed_string_too_long() {
        let mut writer = BinaryWriter::new();
        let result = writer.write_fixed_string("thiscommandistoolong", 12);
        assert!(matches!(result, Err(FormatError::TooLong { len: 20, max: 12 })));
    }

    #[test]
    fn test_var_string_truncates_on_char_boundary() {
        let mut writer = BinaryWriter::new();
        // 'é' is two bytes; a cap of 2 must not split it
        writer.write_var_string("aé", 2);
        assert_eq!(writer.into_bytes(), vec![1, b'a']);
    }
}
