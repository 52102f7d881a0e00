// Primitives - Fixed-width hashes and fee units
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::wire::FormatError;

/// Fee and balance amounts, in the smallest GAS unit (10^-8 GAS)
pub type Gas = i64;

/// Sum of several `Gas` amounts; wide enough that adding fees never overflows
pub type FeeTotal = i128;

/// One whole GAS
pub const GAS: Gas = 100_000_000;

/// Block height
pub type BlockIndex = u32;

macro_rules! fixed_hash {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const ZERO: $name = $name([0u8; $len]);
            pub const LEN: usize = $len;

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            /// Little-endian bytes, as carried on the wire
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Big-endian hex without prefix, used as a stable map key
            pub fn to_hex(&self) -> String {
                let mut reversed = self.0;
                reversed.reverse();
                hex::encode(reversed)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "0x{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = FormatError;

            /// Parses big-endian hex, with or without `0x`
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let decoded = hex::decode(digits)
                    .map_err(|e| FormatError::InvalidValue(format!("{}: {}", stringify!($name), e)))?;
                let mut bytes: [u8; $len] = decoded.try_into().map_err(|v: Vec<u8>| {
                    FormatError::InvalidValue(format!(
                        "{} expects {} bytes, got {}",
                        stringify!($name),
                        $len,
                        v.len()
                    ))
                })?;
                bytes.reverse();
                Ok($name(bytes))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }
    };
}

fixed_hash!(
    /// 160-bit script hash identifying an account
    UInt160,
    20
);

fixed_hash!(
    /// 256-bit hash identifying a block or transaction
    UInt256,
    32
);

/// Double SHA-256
pub fn hash256(data: &[u8]) -> UInt256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    UInt256(second.into())
}

/// Message checksum: first four bytes of hash256, read little-endian
pub fn checksum(data: &[u8]) -> u32 {
    let hash = hash256(data);
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_deterministic() {
        let data = b"nodus";
        assert_eq!(hash256(data), hash256(data));
        assert_ne!(hash256(data), hash256(b"other"));
    }

    #[test]
    fn test_hash256_known_vector() {
        // sha256(sha256("")) = 5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456
        let hash = hash256(b"");
        assert_eq!(
            hex::encode(hash.as_bytes()),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_hex_roundtrip_is_big_endian() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xab;
        let value = UInt160::from_bytes(bytes);
        let hex = value.to_hex();
        assert!(hex.ends_with("ab"));
        assert_eq!(hex.parse::<UInt160>().unwrap(), value);
        assert_eq!(format!("{}", value).parse::<UInt160>().unwrap(), value);
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!("0x1234".parse::<UInt256>().is_err());
    }
}
