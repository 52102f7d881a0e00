// BlockchainStorage - Tables de la chaîne derrière leurs caches
// Principle: Every table is read through an LRU cache and written through it

use super::cache::{ReadAllStorageCache, ReadGetAllStorageCache, ReadStorageCache};
use super::db::Database;
use super::error::StorageError;
use super::rocks::{RocksStorage, StorageItemKey};
use super::traits::{GasBalance, ReadStorage, WriteStorage};
use crate::types::{Block, BlockIndex, Gas, Transaction, UInt160, UInt256};
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

/// Table prefixes
const PREFIX_META: u8 = 0x00;
const PREFIX_BLOCKS: u8 = 0x01;
const PREFIX_TRANSACTIONS: u8 = 0x02;
const PREFIX_BALANCES: u8 = 0x03;
const PREFIX_STORAGE_ITEMS: u8 = 0x04;
const PREFIX_BLOCK_HASHES: u8 = 0x05;

const TIP_KEY: &[u8] = &[PREFIX_META, b't', b'i', b'p'];

/// Largest contract storage value
pub const MAX_STORAGE_VALUE_SIZE: usize = 65535;

/// GAS held by one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountBalance {
    pub gas: Gas,
}

impl AccountBalance {
    pub fn new(gas: Gas) -> Self {
        Self { gas }
    }
}

impl SerializableWire for AccountBalance {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer.write_i64_le(self.gas);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let gas = reader.read_i64_le()?;
        if gas < 0 {
            return Err(FormatError::InvalidValue(format!("negative balance {}", gas)));
        }
        Ok(Self { gas })
    }

    fn size(&self) -> usize {
        8
    }
}

/// Value of one contract storage slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageItem {
    pub value: Vec<u8>,
}

impl StorageItem {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self { value: value.into() }
    }
}

impl SerializableWire for StorageItem {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer.write_var_bytes(&self.value);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let value = reader.read_var_bytes(MAX_STORAGE_VALUE_SIZE)?.to_vec();
        Ok(Self { value })
    }

    fn size(&self) -> usize {
        sizes::var_bytes(self.value.len())
    }
}

pub type BlockTable = ReadAllStorageCache<UInt256, Block, RocksStorage<UInt256, Block>>;
pub type TransactionTable = ReadStorageCache<UInt256, Transaction, RocksStorage<UInt256, Transaction>>;
pub type BalanceTable = ReadStorageCache<UInt160, AccountBalance, RocksStorage<UInt160, AccountBalance>>;
pub type StorageItemTable =
    ReadGetAllStorageCache<StorageItemKey, StorageItem, RocksStorage<StorageItemKey, StorageItem>>;

/// Chain state persisted by the node
pub struct BlockchainStorage {
    db: Database,
    blocks: BlockTable,
    transactions: TransactionTable,
    balances: BalanceTable,
    storage_items: StorageItemTable,
}

impl BlockchainStorage {
    /// Ouvre la base et ses tables; chaque cache garde au plus `cache_capacity` entrées
    pub fn open<P: AsRef<Path>>(
        path: P,
        context: DeserializeWireContext,
        cache_capacity: usize,
    ) -> Result<Self, StorageError> {
        let db = Database::open(path.as_ref())?;
        info!("💾 Storage opened at {}", path.as_ref().display());
        Ok(Self::with_database(db, context, cache_capacity))
    }

    pub fn with_database(db: Database, context: DeserializeWireContext, cache_capacity: usize) -> Self {
        let hash_key = |hash: &UInt256| hash.to_hex();
        Self {
            blocks: ReadStorageCache::new(
                RocksStorage::new(db.clone(), PREFIX_BLOCKS, "block", context),
                cache_capacity,
                hash_key,
            ),
            transactions: ReadStorageCache::new(
                RocksStorage::new(db.clone(), PREFIX_TRANSACTIONS, "transaction", context),
                cache_capacity,
                hash_key,
            ),
            balances: ReadStorageCache::new(
                RocksStorage::new(db.clone(), PREFIX_BALANCES, "balance", context),
                cache_capacity,
                |account: &UInt160| account.to_hex(),
            ),
            storage_items: ReadStorageCache::new(
                RocksStorage::new(db.clone(), PREFIX_STORAGE_ITEMS, "storage item", context),
                cache_capacity,
                |item: &StorageItemKey| format!("{}:{}", item.contract.to_hex(), hex::encode(&item.key)),
            ),
            db,
        }
    }

    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    pub fn transactions(&self) -> &TransactionTable {
        &self.transactions
    }

    pub fn balances(&self) -> &BalanceTable {
        &self.balances
    }

    pub fn storage_items(&self) -> &StorageItemTable {
        &self.storage_items
    }

    /// Highest persisted block index, if any block was persisted
    pub fn tip(&self) -> Result<Option<BlockIndex>, StorageError> {
        match self.db.get(TIP_KEY)? {
            Some(bytes) => {
                let mut reader = BinaryReader::new(&bytes);
                Ok(Some(reader.read_u32_le()?))
            }
            None => Ok(None),
        }
    }

    /// Hash of the persisted block at `index`
    pub fn block_hash_at(&self, index: BlockIndex) -> Result<Option<UInt256>, StorageError> {
        let Some(bytes) = self.db.get(&block_hash_key(index))? else {
            return Ok(None);
        };
        let hash = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
            FormatError::InvalidValue(format!("block hash of {} bytes at #{}", bytes.len(), index))
        })?;
        Ok(Some(UInt256::from_bytes(hash)))
    }

    /// Hash of the block at the tip
    pub fn tip_hash(&self) -> Result<Option<UInt256>, StorageError> {
        match self.tip()? {
            Some(tip) => self.block_hash_at(tip),
            None => Ok(None),
        }
    }

    /// Stocke un bloc et ses transactions; le tip n'avance que vers le haut
    pub async fn persist_block(&self, block: &Block) -> Result<(), StorageError> {
        for transaction in block.transactions() {
            self.transactions.put(&transaction.hash(), transaction.clone()).await?;
        }
        self.blocks.put(&block.hash(), block.clone()).await?;
        self.db.put(&block_hash_key(block.index()), block.hash().as_bytes())?;

        if self.tip()?.map_or(true, |tip| block.index() > tip) {
            self.db.put(TIP_KEY, &block.index().to_le_bytes())?;
        }

        debug!(
            "Persisted block #{} {} ({} txs)",
            block.index(),
            block.hash(),
            block.transactions().len()
        );
        Ok(())
    }

    pub async fn set_gas_balance(&self, account: &UInt160, gas: Gas) -> Result<(), StorageError> {
        self.balances.put(account, AccountBalance::new(gas)).await
    }
}

/// Big-endian index so the table scans in height order
fn block_hash_key(index: BlockIndex) -> [u8; 5] {
    let mut key = [PREFIX_BLOCK_HASHES; 5];
    key[1..].copy_from_slice(&index.to_be_bytes());
    key
}

#[async_trait]
impl GasBalance for BlockchainStorage {
    async fn gas_balance(&self, account: &UInt160) -> Result<Gas, StorageError> {
        Ok(self.balances.try_get(account).await?.map_or(0, |balance| balance.gas))
    }
}
