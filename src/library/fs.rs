//! File system capability used by the import service and storage provisioning.

use std::{
    io::{ErrorKind, Result},
    path::{Path, PathBuf},
};

use {async_trait::async_trait, tokio::fs};

/// Asynchronous file system operations. Every method may fail with a
/// platform I/O error that callers treat as a per-operation failure.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Returns whether `path` exists. A failed lookup is an error, not absence.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Returns whether `path` exists and is a directory.
    async fn is_dir(&self, path: &Path) -> Result<bool>;

    /// Creates `path` and any missing parents.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Lists the entries of a directory.
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Copies the bytes of `from` to `to`, returning the number of bytes copied.
    async fn copy(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Deletes a file.
    async fn remove_file(&self, path: &Path) -> Result<()>;
}

/// `tokio::fs`-backed implementation on the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        paths.sort();
        Ok(paths)
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        fs::copy(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await
    }
}
