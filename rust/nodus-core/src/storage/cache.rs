// Storage cache - Cache LRU en lecture devant une table durable
// Principle: Only point lookups are cached; the backing store stays the source of truth

use super::error::StorageError;
use super::traits::{ReadAllStorage, ReadGetAllStorage, ReadStorage, WriteStorage};
use async_trait::async_trait;
use lru::LruCache;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;
use tracing::trace;

/// Stable string form of a key, used only as the cache index
pub type KeySerializer<K> = Box<dyn Fn(&K) -> String + Send + Sync>;

/// Read-through cache over any `ReadStorage`
///
/// The read shapes of the wrapped store carry over: `all` and `get_all` are
/// forwarded uncached when the backing store offers them, and `put`/`delete`
/// write through when it is writable. Misses are never cached, so a key the
/// backing store reports as absent is asked again next time. A backing read
/// that overlaps a `put` or `delete` through this cache returns its result
/// without caching it, so the written value is never overwritten by an older read.
///
/// Writes that reach the backing store without going through this cache
/// leave stale entries behind until they are evicted or rewritten here.
pub struct ReadStorageCache<K, V, S> {
    storage: S,
    serialize_key: KeySerializer<K>,
    cache: Mutex<CacheState<V>>,
    _key: PhantomData<fn(&K)>,
}

/// Entries plus a counter bumped by every write through the cache
struct CacheState<V> {
    entries: LruCache<String, V>,
    generation: u64,
}

/// Cache over a store that also returns every value
pub type ReadAllStorageCache<K, V, S> = ReadStorageCache<K, V, S>;

/// Cache over a store that also returns every value under a partial key
pub type ReadGetAllStorageCache<K, V, S> = ReadStorageCache<K, V, S>;

impl<K, V, S> ReadStorageCache<K, V, S> {
    pub fn new(
        storage: S,
        capacity: usize,
        serialize_key: impl Fn(&K) -> String + Send + Sync + 'static,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            storage,
            serialize_key: Box::new(serialize_key),
            cache: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generation: 0,
            }),
            _key: PhantomData,
        }
    }

    /// Backing store, bypassing the cache
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.cache.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.entries.is_empty()
    }
}

impl<K, V: Clone, S> ReadStorageCache<K, V, S> {
    /// Cached value, or the write generation a backing read starts from
    async fn lookup(&self, cache_key: &str) -> Result<V, u64> {
        let mut state = self.cache.lock().await;
        match state.entries.get(cache_key) {
            Some(value) => Ok(value.clone()),
            None => Err(state.generation),
        }
    }

    /// Fill from a backing read unless a write landed while it was in flight
    async fn remember_read(&self, cache_key: String, value: V, read_generation: u64) {
        let mut state = self.cache.lock().await;
        if state.generation == read_generation {
            state.entries.put(cache_key, value);
        } else {
            trace!("dropping read of {} raced by a write", cache_key);
        }
    }

    async fn remember_write(&self, cache_key: String, value: Option<V>) {
        let mut state = self.cache.lock().await;
        state.generation = state.generation.wrapping_add(1);
        match value {
            Some(value) => {
                state.entries.put(cache_key, value);
            }
            None => {
                state.entries.pop(&cache_key);
            }
        }
    }
}

#[async_trait]
impl<K, V, S> ReadStorage<K, V> for ReadStorageCache<K, V, S>
where
    K: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: ReadStorage<K, V>,
{
    async fn get(&self, key: &K) -> Result<V, StorageError> {
        let cache_key = (self.serialize_key)(key);
        let generation = match self.lookup(&cache_key).await {
            Ok(value) => return Ok(value),
            Err(generation) => generation,
        };

        trace!("cache miss: {}", cache_key);
        let value = self.storage.get(key).await?;
        self.remember_read(cache_key, value.clone(), generation).await;
        Ok(value)
    }

    async fn try_get(&self, key: &K) -> Result<Option<V>, StorageError> {
        let cache_key = (self.serialize_key)(key);
        let generation = match self.lookup(&cache_key).await {
            Ok(value) => return Ok(Some(value)),
            Err(generation) => generation,
        };

        trace!("cache miss: {}", cache_key);
        let value = self.storage.try_get(key).await?;
        if let Some(value) = &value {
            self.remember_read(cache_key, value.clone(), generation).await;
        }
        Ok(value)
    }
}

#[async_trait]
impl<K, V, S> ReadAllStorage<K, V> for ReadStorageCache<K, V, S>
where
    K: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: ReadAllStorage<K, V>,
{
    async fn all(&self) -> Result<Vec<V>, StorageError> {
        self.storage.all().await
    }
}

#[async_trait]
impl<K, PK, V, S> ReadGetAllStorage<K, PK, V> for ReadStorageCache<K, V, S>
where
    K: Send + Sync + 'static,
    PK: Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: ReadGetAllStorage<K, PK, V>,
{
    async fn get_all(&self, key: &PK) -> Result<Vec<V>, StorageError> {
        self.storage.get_all(key).await
    }
}

#[async_trait]
impl<K, V, S> WriteStorage<K, V> for ReadStorageCache<K, V, S>
where
    K: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: WriteStorage<K, V>,
{
    async fn put(&self, key: &K, value: V) -> Result<(), StorageError> {
        let cache_key = (self.serialize_key)(key);
        self.storage.put(key, value.clone()).await?;
        self.remember_write(cache_key, Some(value)).await;
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<(), StorageError> {
        let cache_key = (self.serialize_key)(key);
        self.storage.delete(key).await?;
        self.remember_write(cache_key, None).await;
        Ok(())
    }
}
