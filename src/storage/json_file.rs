use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{decode_state, encode_state, write_atomic, StateStore};
use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryState;

/// Flat-file store holding the state as one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by `path`. Nothing is touched until first use.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> StorageResult<Option<MemoryState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        let state = decode_state(&bytes, &self.location())?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Loaded memory state");
        Ok(Some(state))
    }

    async fn save(&self, state: &MemoryState) -> StorageResult<()> {
        let bytes = encode_state(state)?;
        write_atomic(&self.path, &bytes).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Saved memory state");
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
