//! Managed storage provisioning.

use std::{path::PathBuf, sync::Arc};

use tracing::{debug, info};

use crate::{error::domain::LibraryError, library::fs::FileSystem};

/// Ensures the managed-storage directory for imported audio exists.
///
/// Run once at process start, before any import or catalog load touches the
/// directory. Safe to call repeatedly.
pub struct StorageProvisioner {
    fs: Arc<dyn FileSystem>,
    tracks_directory: PathBuf,
}

impl StorageProvisioner {
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, tracks_directory: PathBuf) -> Self {
        Self {
            fs,
            tracks_directory,
        }
    }

    /// Creates the managed directory, with any missing parents, if absent.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidData` if something other than a
    /// directory occupies the path, or `LibraryError::IoError` if the
    /// directory cannot be inspected or created.
    pub async fn ensure_storage_ready(&self) -> Result<(), LibraryError> {
        if self.fs.is_dir(&self.tracks_directory).await? {
            debug!(
                "Managed storage already present: {:?}",
                self.tracks_directory
            );
            return Ok(());
        }

        if self.fs.exists(&self.tracks_directory).await? {
            return Err(LibraryError::InvalidData {
                reason: format!(
                    "managed storage path {} is not a directory",
                    self.tracks_directory.display()
                ),
            });
        }

        self.fs.create_dir_all(&self.tracks_directory).await?;
        info!("Created managed storage: {:?}", self.tracks_directory);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::{
        error::domain::LibraryError,
        library::{fs::LocalFileSystem, storage::StorageProvisioner},
    };

    #[tokio::test]
    async fn test_ensure_storage_ready_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let tracks = temp_dir.path().join("data/tunedeck/tracks");
        let provisioner = StorageProvisioner::new(Arc::new(LocalFileSystem), tracks.clone());

        provisioner.ensure_storage_ready().await.unwrap();
        assert!(tracks.is_dir());

        std::fs::write(tracks.join("kept.mp3"), b"x").unwrap();
        provisioner.ensure_storage_ready().await.unwrap();
        assert!(tracks.join("kept.mp3").exists());
    }

    #[tokio::test]
    async fn test_ensure_storage_ready_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let provisioner =
            StorageProvisioner::new(Arc::new(LocalFileSystem), blocker.join("tracks"));
        assert!(provisioner.ensure_storage_ready().await.is_err());
    }

    #[tokio::test]
    async fn test_file_at_storage_path_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let tracks = temp_dir.path().join("tracks");
        std::fs::write(&tracks, b"stray file").unwrap();

        let provisioner = StorageProvisioner::new(Arc::new(LocalFileSystem), tracks.clone());
        let result = provisioner.ensure_storage_ready().await;

        assert!(matches!(result, Err(LibraryError::InvalidData { .. })));
        assert_eq!(std::fs::read(&tracks).unwrap(), b"stray file");
    }
}
