// Block - En-tête et corps de bloc sur le fil
use super::merkle::merkle_root;
use super::primitives::{hash256, BlockIndex, UInt160, UInt256};
use super::transaction::Transaction;
use super::witness::Witness;
use crate::wire::{
    sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, Memo, SerializableWire,
};

/// Maximum transactions carried by one block
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 65_535;

/// En-tête de bloc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    version: u32,
    previous_hash: UInt256,
    merkle_root: UInt256,
    timestamp: u64,
    index: BlockIndex,
    next_consensus: UInt160,
    witness: Witness,
    hash: Memo<UInt256>,
}

impl Header {
    pub fn new(
        previous_hash: UInt256,
        merkle_root: UInt256,
        timestamp: u64,
        index: BlockIndex,
        next_consensus: UInt160,
        witness: Witness,
    ) -> Self {
        Self {
            version: 0,
            previous_hash,
            merkle_root,
            timestamp,
            index,
            next_consensus,
            witness,
            hash: Memo::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn previous_hash(&self) -> UInt256 {
        self.previous_hash
    }

    pub fn merkle_root(&self) -> UInt256 {
        self.merkle_root
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn index(&self) -> BlockIndex {
        self.index
    }

    pub fn next_consensus(&self) -> UInt160 {
        self.next_consensus
    }

    pub fn witness(&self) -> &Witness {
        &self.witness
    }

    /// Identifiant du bloc: hash256 of the unsigned header
    pub fn hash(&self) -> UInt256 {
        *self.hash.get_or_init(|| {
            let mut writer = BinaryWriter::with_capacity(Self::UNSIGNED_SIZE);
            self.serialize_unsigned(&mut writer);
            hash256(&writer.into_bytes())
        })
    }

    const UNSIGNED_SIZE: usize = sizes::SIZE_OF_U32
        + sizes::SIZE_OF_UINT256
        + sizes::SIZE_OF_UINT256
        + sizes::SIZE_OF_U64
        + sizes::SIZE_OF_U32
        + sizes::SIZE_OF_UINT160;

    fn serialize_unsigned(&self, writer: &mut BinaryWriter) {
        writer
            .write_u32_le(self.version)
            .write_uint256(&self.previous_hash)
            .write_uint256(&self.merkle_root)
            .write_u64_le(self.timestamp)
            .write_u32_le(self.index)
            .write_uint160(&self.next_consensus);
    }
}

impl SerializableWire for Header {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        self.serialize_unsigned(writer);
        // Exactly one witness, written as a one-element array
        writer.write_var_uint(1);
        self.witness.serialize_wire_base(writer);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let version = reader.read_u32_le()?;
        if version > 0 {
            return Err(FormatError::InvalidValue(format!("header version {}", version)));
        }
        let previous_hash = reader.read_uint256()?;
        let merkle_root = reader.read_uint256()?;
        let timestamp = reader.read_u64_le()?;
        let index = reader.read_u32_le()?;
        let next_consensus = reader.read_uint160()?;
        let witness_count = reader.read_var_uint()?;
        if witness_count != 1 {
            return Err(FormatError::InvalidValue(format!(
                "header expects exactly one witness, got {}",
                witness_count
            )));
        }
        let witness = Witness::deserialize_wire_base(reader, context)?;

        Ok(Self {
            version,
            previous_hash,
            merkle_root,
            timestamp,
            index,
            next_consensus,
            witness,
            hash: Memo::new(),
        })
    }

    fn size(&self) -> usize {
        Self::UNSIGNED_SIZE + sizes::var_uint(1) + self.witness.size()
    }
}

/// Bloc complet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    header: Header,
    transactions: Vec<Transaction>,
    size: Memo<usize>,
}

impl Block {
    /// Build a block, computing the merkle root from `transactions`
    pub fn new(
        previous_hash: UInt256,
        timestamp: u64,
        index: BlockIndex,
        next_consensus: UInt160,
        witness: Witness,
        transactions: Vec<Transaction>,
    ) -> Self {
        let root = Self::compute_merkle_root(&transactions);
        Self {
            header: Header::new(previous_hash, root, timestamp, index, next_consensus, witness),
            transactions,
            size: Memo::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn hash(&self) -> UInt256 {
        self.header.hash()
    }

    pub fn index(&self) -> BlockIndex {
        self.header.index
    }

    fn compute_merkle_root(transactions: &[Transaction]) -> UInt256 {
        let hashes: Vec<UInt256> = transactions.iter().map(Transaction::hash).collect();
        merkle_root(&hashes)
    }

    /// Vérifie que la racine Merkle du header correspond aux transactions
    pub fn verify_merkle_root(&self) -> bool {
        self.header.merkle_root == Self::compute_merkle_root(&self.transactions)
    }
}

impl SerializableWire for Block {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        self.header.serialize_wire_base(writer);
        writer.write_array(&self.transactions, |w, tx| tx.serialize_wire_base(w));
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let header = Header::deserialize_wire_base(reader, context)?;
        let transactions = reader.read_array(MAX_TRANSACTIONS_PER_BLOCK, |r| {
            Transaction::deserialize_wire_base(r, context)
        })?;
        let block = Self {
            header,
            transactions,
            size: Memo::new(),
        };
        if !block.verify_merkle_root() {
            return Err(FormatError::InvalidValue("block merkle root mismatch".to_string()));
        }
        Ok(block)
    }

    fn size(&self) -> usize {
        *self.size.get_or_init(|| {
            self.header.size()
                + sizes::array(
                    self.transactions.len(),
                    self.transactions.iter().map(Transaction::size).sum(),
                )
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::transaction::tests::transaction_from;

    /// Block at `index` carrying `transactions`
    pub(crate) fn block_at(index: BlockIndex, transactions: Vec<Transaction>) -> Block {
        Block::new(
            UInt256::from_bytes([index as u8; 32]),
            1_700_000_000_000 + u64::from(index),
            index,
            UInt160::from_bytes([9; 20]),
            Witness::new(vec![0x0c; 64], vec![0x41; 35]),
            transactions,
        )
    }

    #[test]
    fn test_block_wire_roundtrip() {
        let sender = UInt160::from_bytes([3; 20]);
        let block = block_at(7, vec![transaction_from(sender, 1, 10, 1), transaction_from(sender, 2, 20, 2)]);
        let bytes = block.serialize_wire();
        assert_eq!(bytes.len(), block.size());

        let decoded = Block::deserialize_wire(&bytes, &DeserializeWireContext::new(0)).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
        assert!(decoded.verify_merkle_root());
    }

    #[test]
    fn test_header_requires_single_witness() {
        let header = block_at(1, vec![]).header().clone();
        let mut bytes = header.serialize_wire();
        bytes[Header::UNSIGNED_SIZE] = 2;
        assert!(Header::deserialize_wire(&bytes, &DeserializeWireContext::new(0)).is_err());
    }

    #[test]
    fn test_tampered_merkle_root_rejected() {
        let sender = UInt160::from_bytes([3; 20]);
        let block = block_at(2, vec![transaction_from(sender, 1, 1, 1)]);
        let mut bytes = block.serialize_wire();
        // merkle root follows version (4) + previous hash (32)
        bytes[36] ^= 0xff;
        assert!(Block::deserialize_wire(&bytes, &DeserializeWireContext::new(0)).is_err());
    }
}
