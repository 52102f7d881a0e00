// Binary reader - bounds-checked cursor over a byte slice

use super::FormatError;
use crate::types::{UInt160, UInt256};

/// Cursor reading little-endian values; every read fails cleanly on short input
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.buffer[self.position..]
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], FormatError> {
        if self.remaining() < count {
            return Err(FormatError::Truncated {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    /// Strict boolean: only 0 and 1 are accepted
    pub fn read_bool(&mut self) -> Result<bool, FormatError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(FormatError::InvalidValue(format!("boolean byte {:#04x}", other))),
        }
    }

    pub fn read_u16_le(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, FormatError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], FormatError> {
        self.take(count)
    }

    pub fn read_var_uint(&mut self) -> Result<u64, FormatError> {
        match self.read_u8()? {
            0xfd => Ok(u64::from(self.read_u16_le()?)),
            0xfe => Ok(u64::from(self.read_u32_le()?)),
            0xff => self.read_u64_le(),
            value => Ok(u64::from(value)),
        }
    }

    /// Varint bounded by `max`
    pub fn read_var_uint_max(&mut self, max: u64) -> Result<u64, FormatError> {
        let value = self.read_var_uint()?;
        if value > max {
            return Err(FormatError::TooLong { len: value, max });
        }
        Ok(value)
    }

    /// Length-prefixed bytes; the advertised length is checked against `max` before reading
    pub fn read_var_bytes(&mut self, max: usize) -> Result<&'a [u8], FormatError> {
        let len = self.read_var_uint_max(max as u64)? as usize;
        self.take(len)
    }

    pub fn read_var_string(&mut self, max: usize) -> Result<String, FormatError> {
        let bytes = self.read_var_bytes(max)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8)
    }

    /// Fixed-width string with trailing zero padding removed
    pub fn read_fixed_string(&mut self, length: usize) -> Result<String, FormatError> {
        let bytes = self.take(length)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        if bytes[end..].iter().any(|b| *b != 0) {
            return Err(FormatError::InvalidValue("non-zero byte after string padding".to_string()));
        }
        String::from_utf8(bytes[..end].to_vec()).map_err(|_| FormatError::InvalidUtf8)
    }

    pub fn read_uint160(&mut self) -> Result<UInt160, FormatError> {
        Ok(UInt160::from_bytes(self.take_array()?))
    }

    pub fn read_uint256(&mut self) -> Result<UInt256, FormatError> {
        Ok(UInt256::from_bytes(self.take_array()?))
    }

    /// Count-prefixed array of at most `max` elements
    pub fn read_array<T>(
        &mut self,
        max: usize,
        mut read: impl FnMut(&mut Self) -> Result<T, FormatError>,
    ) -> Result<Vec<T>, FormatError> {
        let count = self.read_var_uint_max(max as u64)? as usize;
        // The count is attacker-controlled; cap the pre-allocation by what the buffer could hold
        let mut values = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            values.push(read(self)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::BinaryWriter;

    #[test]
    fn test_truncated_read() {
        let mut reader = BinaryReader::new(&[0x01, 0x02]);
        let err = reader.read_u32_le().unwrap_err();
        assert_eq!(err, FormatError::Truncated { needed: 4, remaining: 2 });
    }

    #[test]
    fn test_var_bytes_cap_checked_before_read() {
        let mut writer = BinaryWriter::new();
        writer.write_var_bytes(&[7u8; 300]);
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(
            reader.read_var_bytes(255).unwrap_err(),
            FormatError::TooLong { len: 300, max: 255 }
        );

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_var_bytes(300).unwrap().len(), 300);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_advertised_length_beyond_buffer() {
        // Claims 0x20 bytes but carries 3
        let bytes = [0x20, 1, 2, 3];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            reader.read_var_bytes(1024),
            Err(FormatError::Truncated { needed: 32, remaining: 3 })
        ));
    }

    #[test]
    fn test_user_agent_cap() {
        let mut writer = BinaryWriter::new();
        writer.write_var_uint(1025).write_bytes(&[b'a'; 1025]);
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(reader.read_var_string(1024), Err(FormatError::TooLong { .. })));
    }

    #[test]
    fn test_fixed_string_roundtrip_strips_padding() {
        let mut writer = BinaryWriter::new();
        writer.write_fixed_string("verack", 12).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_fixed_string(12).unwrap(), "verack");
    }

    #[test]
    fn test_bool_rejects_other_bytes() {
        let mut reader = BinaryReader::new(&[0x02]);
        assert!(matches!(reader.read_bool(), Err(FormatError::InvalidValue(_))));
    }

    #[test]
    fn test_array_limit() {
        let mut writer = BinaryWriter::new();
        writer.write_array(&[1u32, 2, 3], |w, v| {
            w.write_u32_le(*v);
        });
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        let values = reader.read_array(3, |r| r.read_u32_le()).unwrap();
        assert_eq!(values, vec![1, 2, 3]);

        let mut reader = BinaryReader::new(&bytes);
        assert!(reader.read_array(2, |r| r.read_u32_le()).is_err());
    }
}
