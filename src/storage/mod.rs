//! Durable storage for the memory engine state.
//!
//! The whole [`MemoryState`] is persisted as a single JSON document, either in
//! a flat file ([`JsonFileStore`]) or in a one-row SQLite table
//! ([`SqliteStateStore`]). Both backends replace the document atomically: a
//! failed write never leaves a half-written blob behind.

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStateStore;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryState;

/// Persistence seam for the memory engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state. `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> StorageResult<Option<MemoryState>>;

    /// Replace the persisted state with `state`.
    async fn save(&self, state: &MemoryState) -> StorageResult<()>;

    /// Discard the persisted state.
    async fn clear(&self) -> StorageResult<()>;

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

/// Open the backend selected by `config`.
pub async fn open_store(config: &StoreConfig) -> StorageResult<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config.backend {
        StoreBackend::Json => Arc::new(JsonFileStore::new(&config.path)),
        StoreBackend::Sqlite => Arc::new(SqliteStateStore::new(config).await?),
    };
    info!(location = %store.location(), backend = ?config.backend, "State store opened");
    Ok(store)
}

/// Decode a stored document, mapping schema mismatches to `CorruptState`.
pub(crate) fn decode_state(bytes: &[u8], location: &str) -> StorageResult<MemoryState> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::CorruptState {
        location: location.to_string(),
        message: e.to_string(),
    })
}

/// Encode a state document.
pub(crate) fn encode_state(state: &MemoryState) -> StorageResult<Vec<u8>> {
    serde_json::to_vec_pretty(state).map_err(|e| StorageError::Serialization {
        message: e.to_string(),
    })
}

/// Write `bytes` to `path` through a synced sibling temp file and a rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StorageError::io(path, e));
    }

    Ok(())
}
