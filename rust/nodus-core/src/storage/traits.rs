// Storage traits - Formes de lecture et d'écriture des tables
use super::error::StorageError;
use crate::types::{Gas, UInt160};
use async_trait::async_trait;

/// Point lookups
#[async_trait]
pub trait ReadStorage<K: Sync, V>: Send + Sync {
    /// Value for `key`; a missing key is `StorageError::NotFound`
    async fn get(&self, key: &K) -> Result<V, StorageError>;

    /// Value for `key`, if any
    async fn try_get(&self, key: &K) -> Result<Option<V>, StorageError>;
}

/// Point lookups plus a full scan
#[async_trait]
pub trait ReadAllStorage<K: Sync, V>: ReadStorage<K, V> {
    async fn all(&self) -> Result<Vec<V>, StorageError>;
}

/// Point lookups plus a scan of every value under a partial key
#[async_trait]
pub trait ReadGetAllStorage<K: Sync, PK: Sync, V>: ReadStorage<K, V> {
    async fn get_all(&self, key: &PK) -> Result<Vec<V>, StorageError>;
}

#[async_trait]
pub trait WriteStorage<K: Sync, V: Send + 'static>: Send + Sync {
    async fn put(&self, key: &K, value: V) -> Result<(), StorageError>;

    async fn delete(&self, key: &K) -> Result<(), StorageError>;
}

/// On-chain GAS balance lookup used by fee admission
#[async_trait]
pub trait GasBalance: Send + Sync {
    /// Balance of `account`; accounts never seen hold zero
    async fn gas_balance(&self, account: &UInt160) -> Result<Gas, StorageError>;
}
