// Database - Base RocksDB partagée par toutes les tables
// Principle: One handle per data directory; tables are key prefixes inside it
use rocksdb::{Direction, IteratorMode, Options, ReadOptions, DB};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Cheap-to-clone RocksDB handle
#[derive(Clone)]
pub struct Database {
    db: Arc<DB>,
}

impl Database {
    /// Open the database at `path`, creating it when missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        // Bounded file churn for long-running nodes
        opts.set_keep_log_file_num(5);
        opts.set_max_background_jobs(2);

        let db = DB::open(&opts, path.as_ref()).map_err(|source| DatabaseError::Open {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        self.db.get(key).map_err(DatabaseError::Read)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError> {
        self.db.put(key, value).map_err(DatabaseError::Write)
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), DatabaseError> {
        self.db.delete(key).map_err(DatabaseError::Write)
    }

    /// Entries whose key starts with `prefix`, in key order
    pub fn prefix_iterator<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>), DatabaseError>> + 'a {
        let mut read_opts = ReadOptions::default();
        if let Some(upper) = prefix_upper_bound(prefix) {
            read_opts.set_iterate_upper_bound(upper);
        }
        self.db
            .iterator_opt(IteratorMode::From(prefix, Direction::Forward), read_opts)
            .map(|item| {
                item.map(|(key, value)| (key.into_vec(), value.into_vec()))
                    .map_err(DatabaseError::Read)
            })
    }
}

/// Smallest key greater than every key starting with `prefix`; `None` when unbounded
fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// RocksDB failures
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rocksdb::Error,
    },

    #[error("Database read failed: {0}")]
    Read(#[source] rocksdb::Error),

    #[error("Database write failed: {0}")]
    Write(#[source] rocksdb::Error),
}
