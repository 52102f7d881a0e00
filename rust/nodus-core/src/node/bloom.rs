// Bloom - Filtre de relais chargé par un pair léger
// Principle: A peer with a filter only hears about transactions it may care about

use crate::protocol::{FilterLoadPayload, MerkleBlockPayload};
use crate::types::{Block, Transaction};
use std::io::Cursor;

/// Spacing between the seeds of successive hash functions
const SEED_STEP: u32 = 0xFBA4_C795;

/// Filter installed by `filterload`, extended by `filteradd`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerBloomFilter {
    bits: Vec<u8>,
    hash_functions: u8,
    tweak: u32,
}

impl PeerBloomFilter {
    pub fn new(bits: Vec<u8>, hash_functions: u8, tweak: u32) -> Self {
        Self {
            bits,
            hash_functions,
            tweak,
        }
    }

    fn bit_count(&self) -> u64 {
        self.bits.len() as u64 * 8
    }

    /// Bit positions of `element`, one per hash function
    fn positions<'a>(&'a self, element: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
        let bit_count = self.bit_count();
        (0..u32::from(self.hash_functions)).map(move |i| {
            let seed = i.wrapping_mul(SEED_STEP).wrapping_add(self.tweak);
            // Reading from an in-memory cursor cannot fail
            let hash = murmur3::murmur3_32(&mut Cursor::new(element), seed).unwrap_or(0);
            (u64::from(hash) % bit_count) as usize
        })
    }

    pub fn insert(&mut self, element: &[u8]) {
        if self.bits.is_empty() {
            return;
        }
        let positions: Vec<usize> = self.positions(element).collect();
        for position in positions {
            self.bits[position / 8] |= 1 << (position % 8);
        }
    }

    /// May be a false positive, never a false negative; an empty filter matches nothing
    pub fn contains(&self, element: &[u8]) -> bool {
        !self.bits.is_empty()
            && self
                .positions(element)
                .all(|position| self.bits[position / 8] & (1 << (position % 8)) != 0)
    }

    /// Matches on the transaction hash or any signer account
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.contains(tx.hash().as_bytes())
            || tx
                .signers()
                .iter()
                .any(|signer| self.contains(signer.account.as_bytes()))
    }

    /// Block header plus every transaction hash, with one flag bit per matching transaction
    pub fn merkle_block(&self, block: &Block) -> MerkleBlockPayload {
        let transactions = block.transactions();
        let mut flags = vec![0u8; transactions.len().div_ceil(8)];
        for (i, tx) in transactions.iter().enumerate() {
            if self.matches(tx) {
                flags[i / 8] |= 1 << (i % 8);
            }
        }
        MerkleBlockPayload {
            header: block.header().clone(),
            transaction_count: transactions.len() as u32,
            hashes: transactions.iter().map(Transaction::hash).collect(),
            flags,
        }
    }
}

impl From<FilterLoadPayload> for PeerBloomFilter {
    fn from(payload: FilterLoadPayload) -> Self {
        Self::new(payload.filter, payload.hash_functions, payload.tweak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::block::tests::block_at;
    use crate::types::transaction::tests::transaction_from;
    use crate::types::UInt160;

    fn empty_filter() -> PeerBloomFilter {
        PeerBloomFilter::new(vec![0; 64], 5, 42)
    }

    #[test]
    fn test_inserted_elements_are_contained() {
        let mut filter = empty_filter();
        for element in [&b"alpha"[..], &b"beta"[..], &[0u8; 32][..]] {
            filter.insert(element);
            assert!(filter.contains(element));
        }
    }

    #[test]
    fn test_tweak_changes_positions() {
        let mut a = PeerBloomFilter::new(vec![0; 64], 3, 1);
        let mut b = PeerBloomFilter::new(vec![0; 64], 3, 2);
        a.insert(b"element");
        b.insert(b"element");
        assert_ne!(a.bits, b.bits);
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let mut filter = PeerBloomFilter::new(Vec::new(), 5, 0);
        filter.insert(b"anything");
        assert!(!filter.contains(b"anything"));
    }

    #[test]
    fn test_matches_by_signer_account() {
        let watched = UInt160::from_bytes([9; 20]);
        let mut filter = empty_filter();
        filter.insert(watched.as_bytes());

        assert!(filter.matches(&transaction_from(watched, 1, 1, 1)));
        assert!(!filter.matches(&transaction_from(UInt160::from_bytes([8; 20]), 1, 1, 1)));
    }

    #[test]
    fn test_merkle_block_flags_matching_transactions() {
        let watched = UInt160::from_bytes([9; 20]);
        let other = UInt160::from_bytes([8; 20]);
        let txs = vec![
            transaction_from(other, 1, 1, 0),
            transaction_from(watched, 2, 1, 0),
            transaction_from(other, 3, 1, 0),
        ];
        let block = block_at(4, txs.clone());
        let mut filter = empty_filter();
        filter.insert(txs[1].hash().as_bytes());

        let merkle = filter.merkle_block(&block);
        assert_eq!(merkle.header, *block.header());
        assert_eq!(merkle.transaction_count, 3);
        assert_eq!(merkle.hashes, txs.iter().map(Transaction::hash).collect::<Vec<_>>());
        assert_eq!(merkle.flags[0] & 0b010, 0b010);
    }
}
