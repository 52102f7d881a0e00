// Storage - Couche de persistance (RocksDB + caches LRU)
// Principe: Le cache accélère, la base fait foi

pub mod blockchain;
pub mod cache;
pub mod db;
pub mod error;
pub mod rocks;
pub mod traits;

pub use blockchain::{AccountBalance, BlockchainStorage, StorageItem};
pub use cache::{KeySerializer, ReadAllStorageCache, ReadGetAllStorageCache, ReadStorageCache};
pub use db::{Database, DatabaseError};
pub use error::StorageError;
pub use rocks::{RocksStorage, StorageItemKey, StorageKey};
pub use traits::{GasBalance, ReadAllStorage, ReadGetAllStorage, ReadStorage, WriteStorage};
