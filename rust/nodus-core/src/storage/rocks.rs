// RocksStorage - Table typée sur RocksDB
// Principle: One byte of prefix per table, values stored in their wire encoding

use super::db::Database;
use super::error::StorageError;
use super::traits::{ReadAllStorage, ReadGetAllStorage, ReadStorage, WriteStorage};
use crate::types::{UInt160, UInt256};
use crate::wire::{DeserializeWireContext, SerializableWire};
use async_trait::async_trait;
use std::marker::PhantomData;

/// Key with a fixed on-disk byte layout
pub trait StorageKey: Send + Sync {
    fn to_key_bytes(&self) -> Vec<u8>;
}

impl StorageKey for UInt256 {
    fn to_key_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl StorageKey for UInt160 {
    fn to_key_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Contract storage slot: contract hash followed by the raw key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageItemKey {
    pub contract: UInt160,
    pub key: Vec<u8>,
}

impl StorageItemKey {
    pub fn new(contract: UInt160, key: impl Into<Vec<u8>>) -> Self {
        Self {
            contract,
            key: key.into(),
        }
    }
}

impl StorageKey for StorageItemKey {
    fn to_key_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(UInt160::LEN + self.key.len());
        bytes.extend_from_slice(self.contract.as_bytes());
        bytes.extend_from_slice(&self.key);
        bytes
    }
}

/// Typed table sharing one `Database` with the others
pub struct RocksStorage<K, V> {
    db: Database,
    prefix: u8,
    table: &'static str,
    context: DeserializeWireContext,
    _marker: PhantomData<fn(&K) -> V>,
}

impl<K, V> RocksStorage<K, V> {
    pub fn new(db: Database, prefix: u8, table: &'static str, context: DeserializeWireContext) -> Self {
        Self {
            db,
            prefix,
            table,
            context,
            _marker: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    fn db_key(&self, key: &impl StorageKey) -> Vec<u8> {
        let mut bytes = vec![self.prefix];
        bytes.extend(key.to_key_bytes());
        bytes
    }
}

impl<K, V: SerializableWire> RocksStorage<K, V> {
    fn decode(&self, bytes: &[u8]) -> Result<V, StorageError> {
        Ok(V::deserialize_wire(bytes, &self.context)?)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<V>, StorageError> {
        self.db
            .prefix_iterator(prefix)
            .map(|item| {
                let (_, value) = item?;
                self.decode(&value)
            })
            .collect()
    }
}

#[async_trait]
impl<K, V> ReadStorage<K, V> for RocksStorage<K, V>
where
    K: StorageKey + 'static,
    V: SerializableWire + Send + 'static,
{
    async fn get(&self, key: &K) -> Result<V, StorageError> {
        self.try_get(key).await?.ok_or_else(|| StorageError::NotFound {
            table: self.table,
            key: hex::encode(key.to_key_bytes()),
        })
    }

    async fn try_get(&self, key: &K) -> Result<Option<V>, StorageError> {
        match self.db.get(&self.db_key(key))? {
            Some(bytes) => self.decode(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<K, V> ReadAllStorage<K, V> for RocksStorage<K, V>
where
    K: StorageKey + 'static,
    V: SerializableWire + Send + 'static,
{
    async fn all(&self) -> Result<Vec<V>, StorageError> {
        self.scan(&[self.prefix])
    }
}

#[async_trait]
impl<K, PK, V> ReadGetAllStorage<K, PK, V> for RocksStorage<K, V>
where
    K: StorageKey + 'static,
    PK: StorageKey + 'static,
    V: SerializableWire + Send + 'static,
{
    async fn get_all(&self, key: &PK) -> Result<Vec<V>, StorageError> {
        self.scan(&self.db_key(key))
    }
}

#[async_trait]
impl<K, V> WriteStorage<K, V> for RocksStorage<K, V>
where
    K: StorageKey + 'static,
    V: SerializableWire + Send + Sync + 'static,
{
    async fn put(&self, key: &K, value: V) -> Result<(), StorageError> {
        self.db.put(&self.db_key(key), &value.serialize_wire())?;
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<(), StorageError> {
        self.db.delete(&self.db_key(key))?;
        Ok(())
    }
}
