// Merkle - Racine Merkle des transactions d'un bloc
use super::primitives::{hash256, UInt256};

/// Merkle root over leaf hashes
///
/// Each level hashes adjacent pairs (left || right) with hash256; an odd node
/// at the end of a level is paired with itself. The root of an empty list is zero.
pub fn merkle_root(leaves: &[UInt256]) -> UInt256 {
    if leaves.is_empty() {
        return UInt256::ZERO;
    }

    let mut level: Vec<UInt256> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                let mut buffer = [0u8; 64];
                buffer[..32].copy_from_slice(left.as_bytes());
                buffer[32..].copy_from_slice(right.as_bytes());
                hash256(&buffer)
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(byte: u8) -> UInt256 {
        UInt256::from_bytes([byte; 32])
    }

    #[test]
    fn test_empty_root_is_zero() {
        assert_eq!(merkle_root(&[]), UInt256::ZERO);
    }

    #[test]
    fn test_single_leaf_is_root() {
        assert_eq!(merkle_root(&[leaf(1)]), leaf(1));
    }

    #[test]
    fn test_odd_leaf_paired_with_itself() {
        let three = merkle_root(&[leaf(1), leaf(2), leaf(3)]);
        let four = merkle_root(&[leaf(1), leaf(2), leaf(3), leaf(3)]);
        assert_eq!(three, four);
    }

    #[test]
    fn test_order_matters() {
        assert_ne!(merkle_root(&[leaf(1), leaf(2)]), merkle_root(&[leaf(2), leaf(1)]));
    }
}
