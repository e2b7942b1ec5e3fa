//! Durable key-value persistence for serialized store snapshots.
//!
//! Every store in the crate writes its full snapshot through a
//! [`KeyValueStore`] under its own key. The JSON-file backend keeps one file
//! per key inside a state directory; the in-memory backend serves tests and
//! ephemeral sessions.

use std::{
    collections::HashMap,
    io::{Error as IoError, ErrorKind::NotFound},
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    parking_lot::RwLock,
    serde::{Serialize, de::DeserializeOwned},
    serde_json::{Error as SerdeJsonError, from_str, to_string},
    thiserror::Error,
    tokio::fs::{create_dir_all, read_to_string, remove_file, rename, write},
    tracing::{debug, warn},
};

/// Suffix of the key an undecodable snapshot is moved to.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// Error type for persistence operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read or write the backing storage.
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    /// Failed to serialize or deserialize a snapshot.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// The key cannot be mapped onto the backend.
    #[error("Invalid key: {key}")]
    InvalidKey { key: String },
}

/// Asynchronous get/set of serialized state blobs keyed by store name.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the blob stored under `key`.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Deletes the blob stored under `key`. Missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads and deserializes the snapshot stored under `key`.
///
/// A blob that does not decode as `T` is moved to `<key>.corrupt` and
/// reported as absent, so a damaged snapshot never blocks startup and is
/// not lost to the next write.
///
/// # Errors
///
/// Returns `StoreError` if the backend cannot be read.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(blob) = store.get(key).await? else {
        return Ok(None);
    };

    match from_str(&blob) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let aside = format!("{key}{CORRUPT_SUFFIX}");
            warn!("Discarding unreadable snapshot {key}, kept as {aside}: {e}");
            if let Err(e) = set_aside(store, key, &aside, blob).await {
                warn!("Failed to keep unreadable snapshot {key}: {e}");
            }
            Ok(None)
        }
    }
}

async fn set_aside(
    store: &dyn KeyValueStore,
    key: &str,
    aside: &str,
    blob: String,
) -> Result<(), StoreError> {
    store.set(aside, blob).await?;
    store.remove(key).await
}

/// Serializes `value` and writes it under `key`.
///
/// # Errors
///
/// Returns `StoreError` if serialization or the backend write fails.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    store.set(key, to_string(value)?).await
}

/// File-backed store keeping one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    directory: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `directory`. The directory is created lazily
    /// on first write.
    #[must_use]
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
            && !key.starts_with('.');

        if !valid {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }

        Ok(self.directory.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        create_dir_all(&self.directory).await?;

        // Write-then-rename so a crash never leaves a truncated snapshot.
        let staging = path.with_extension("json.tmp");
        write(&staging, value).await?;
        rename(&staging, &path).await?;

        debug!("Persisted store snapshot: {:?}", path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store that forgets everything on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
