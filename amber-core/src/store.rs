use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Byte-level persistence for artifacts, addressed by name.
///
/// Stores know nothing about the artifact format; rendering and parsing are
/// handled by [`crate::Persister`]. Writes replace whatever was stored under
/// the name before, they never merge or append.
///
/// All methods take `&self` to support stores with internal locking (e.g., RocksDB).
pub trait ArtifactStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the artifact stored under `source`, or None if there is none.
    fn read_all(&self, source: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores `bytes` under `destination`, overwriting any previous content.
    fn write_all(&self, destination: &str, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Checks whether an artifact exists under `name`.
    fn exists(&self, name: &str) -> Result<bool, Self::Error>;
}

/// An in-memory store backed by a HashMap.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryStore {
    type Error = Infallible;

    fn read_all(&self, source: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.get(source).cloned())
    }

    fn write_all(&self, destination: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(destination.to_string(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, Self::Error> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.contains_key(name))
    }
}

/// Artifacts as files, with names resolved relative to a root directory.
///
/// A write goes to a temporary file next to the destination which is then
/// renamed over it, so a failed write leaves the previous artifact intact.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store resolving names against `root`. An empty root resolves
    /// names against the working directory; absolute names ignore the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path used for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ArtifactStore for FileStore {
    type Error = io::Error;

    fn read_all(&self, source: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        match fs::read(self.path_for(source)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, destination: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        let path = self.path_for(destination);
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{destination:?} does not name a file"),
            )
        })?;

        let mut temp_name = file_name.to_os_string();
        temp_name.push(".tmp");
        let temp = path.with_file_name(temp_name);

        fs::write(&temp, bytes)?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, Self::Error> {
        self.path_for(name).try_exists()
    }
}
