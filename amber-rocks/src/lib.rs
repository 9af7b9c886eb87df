//! RocksDB-backed artifact store for Amber.

use std::path::Path;

use amber_core::ArtifactStore;
use rocksdb::{DB, Options};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("RocksDB error: {0}")]
pub struct RocksError(#[from] rocksdb::Error);

/// Artifacts kept in a RocksDB database, keyed by name.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Opens a RocksDB store at the given path.
    ///
    /// Creates the database if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RocksError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    /// Removes the artifact stored under `name`, if any.
    pub fn remove(&self, name: &str) -> Result<(), RocksError> {
        self.db.delete(name.as_bytes())?;
        Ok(())
    }
}

impl ArtifactStore for RocksStore {
    type Error = RocksError;

    fn read_all(&self, source: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.db.get(source.as_bytes())?)
    }

    fn write_all(&self, destination: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.db.put(destination.as_bytes(), bytes)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, Self::Error> {
        Ok(self.db.get_pinned(name.as_bytes())?.is_some())
    }
}
