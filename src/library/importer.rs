//! Track import service.
//!
//! Copies user-selected audio files into managed storage, extracts their
//! metadata and records them in the catalog. Files are processed strictly one
//! at a time so progress reporting is exact and no two files race on the same
//! catalog mutation.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    chrono::Utc,
    tokio::task::spawn_blocking,
    tracing::{debug, info, warn},
    uuid::Uuid,
};

use crate::{
    audio::metadata::{MetadataExtractor, TrackMetadata},
    error::domain::{ImportError, LibraryError},
    library::{
        catalog::TrackCatalog,
        fs::FileSystem,
        models::{ImportResult, PlatformSource, Track},
        picker::{FilePicker, PickedFile, PickerOutcome},
    },
};

/// Extension given to synthesized file names when the source has no name.
pub const DEFAULT_AUDIO_EXTENSION: &str = "mp3";

/// Configuration for the import service.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Managed storage directory imported files are copied into.
    pub tracks_directory: PathBuf,
    /// Extension for synthesized file names, without the dot.
    pub default_extension: String,
}

impl ImportConfig {
    #[must_use]
    pub fn new(tracks_directory: PathBuf) -> Self {
        Self {
            tracks_directory,
            default_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
        }
    }
}

/// A track addressed either directly or by its catalog id.
#[derive(Debug, Clone, Copy)]
pub enum TrackRef<'a> {
    Id(&'a str),
    Track(&'a Track),
}

impl TrackRef<'_> {
    fn id(&self) -> &str {
        match self {
            TrackRef::Id(id) => id,
            TrackRef::Track(track) => &track.id,
        }
    }
}

impl<'a> From<&'a str> for TrackRef<'a> {
    fn from(id: &'a str) -> Self {
        TrackRef::Id(id)
    }
}

impl<'a> From<&'a String> for TrackRef<'a> {
    fn from(id: &'a String) -> Self {
        TrackRef::Id(id)
    }
}

impl<'a> From<&'a Track> for TrackRef<'a> {
    fn from(track: &'a Track) -> Self {
        TrackRef::Track(track)
    }
}

/// Orchestrates file selection, deduplication, copying, metadata extraction
/// and catalog insertion.
pub struct TrackImporter {
    catalog: Arc<TrackCatalog>,
    fs: Arc<dyn FileSystem>,
    extractor: Arc<dyn MetadataExtractor>,
    picker: Arc<dyn FilePicker>,
    config: ImportConfig,
}

impl TrackImporter {
    #[must_use]
    pub fn new(
        catalog: Arc<TrackCatalog>,
        fs: Arc<dyn FileSystem>,
        extractor: Arc<dyn MetadataExtractor>,
        picker: Arc<dyn FilePicker>,
        config: ImportConfig,
    ) -> Self {
        Self {
            catalog,
            fs,
            extractor,
            picker,
            config,
        }
    }

    /// Managed storage directory.
    #[must_use]
    pub fn music_directory(&self) -> &Path {
        &self.config.tracks_directory
    }

    /// Presents the file picker.
    ///
    /// # Returns
    ///
    /// The selected files, or `None` when the user cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::PickerError` if the picker cannot be presented.
    pub async fn open_file_picker(&self) -> Result<Option<Vec<PickedFile>>, ImportError> {
        match self.picker.pick().await? {
            PickerOutcome::Selected(files) => Ok(Some(files)),
            PickerOutcome::Cancelled => {
                debug!("File picker cancelled");
                Ok(None)
            }
        }
    }

    /// Canonical destination name for a picked file.
    ///
    /// Uses the original name when present, otherwise synthesizes
    /// `track_<uuid>.<default extension>`. Only the final path component of
    /// the original name is kept.
    #[must_use]
    pub fn derive_file_name(&self, file: &PickedFile) -> String {
        file.name
            .as_deref()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "track_{}.{}",
                    Uuid::new_v4(),
                    self.config.default_extension
                )
            })
    }

    /// Imports a single file.
    ///
    /// # Returns
    ///
    /// The existing catalog entry when a track with the same derived file name
    /// is already known, the newly imported track otherwise, or `None` if the
    /// import failed.
    pub async fn import_track(&self, file: &PickedFile) -> Option<Track> {
        let file_name = self.derive_file_name(file);

        if let Some(existing) = self.catalog.get_by_file_name(&file_name) {
            info!("Track already exists: {file_name}");
            return Some(existing);
        }

        match self.import_file(file, file_name).await {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("Failed to import track: {e}");
                None
            }
        }
    }

    /// Imports a batch of files in selection order.
    ///
    /// `on_progress(processed, total)` runs after every file, whatever its
    /// outcome. Every input file lands in exactly one of the result lists.
    pub async fn import_tracks(
        &self,
        files: &[PickedFile],
        mut on_progress: impl FnMut(usize, usize),
    ) -> ImportResult {
        let total = files.len();
        let mut result = ImportResult::default();

        for (index, file) in files.iter().enumerate() {
            let file_name = self.derive_file_name(file);

            if self.catalog.get_by_file_name(&file_name).is_some() {
                debug!("Skipping duplicate: {file_name}");
                result.duplicates.push(file_name);
            } else {
                match self.import_file(file, file_name.clone()).await {
                    Ok(track) => result.imported.push(track),
                    Err(e) => {
                        warn!("Failed to import track: {e}");
                        result.failed.push(file_name);
                    }
                }
            }

            on_progress(index + 1, total);
        }

        info!(
            "Import finished: {} imported, {} failed, {} duplicates",
            result.imported.len(),
            result.failed.len(),
            result.duplicates.len()
        );
        result
    }

    /// Deletes a track's backing file and removes it from the catalog.
    ///
    /// # Returns
    ///
    /// `false` if the track is unknown or its file could not be checked or
    /// deleted; the catalog entry is left in place in that case.
    pub async fn delete_track<'a>(&self, target: impl Into<TrackRef<'a>>) -> bool {
        let target = target.into();
        let Some(track) = self.catalog.get_by_id(target.id()) else {
            let error = LibraryError::NotFound {
                id: target.id().to_string(),
            };
            warn!("Cannot delete track: {error}");
            return false;
        };

        let path = Path::new(&track.file_path);
        match self.fs.exists(path).await {
            Ok(true) => {
                if let Err(e) = self.fs.remove_file(path).await {
                    warn!("Failed to delete track file {:?}: {}", path, e);
                    return false;
                }
            }
            Ok(false) => debug!("Track file already gone: {:?}", path),
            Err(e) => {
                warn!("Cannot check track file {:?}: {}", path, e);
                return false;
            }
        }

        if let Err(e) = self.catalog.remove(&track.id).await {
            warn!("Catalog removal of {} not persisted: {}", track.id, e);
        }

        info!("Deleted track: {}", track.file_name);
        true
    }

    /// Catalog entries whose backing file no longer exists.
    ///
    /// Tracks whose file cannot be checked are logged and left out.
    pub async fn dangling_tracks(&self) -> Vec<Track> {
        let mut dangling = Vec::new();
        for track in self.catalog.tracks() {
            match self.fs.exists(Path::new(&track.file_path)).await {
                Ok(true) => {}
                Ok(false) => dangling.push(track),
                Err(e) => warn!("Cannot check track file {}: {}", track.file_path, e),
            }
        }
        dangling
    }

    /// Files in managed storage that no catalog entry references.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::IoError` if the directory cannot be listed.
    pub async fn untracked_files(&self) -> Result<Vec<PathBuf>, LibraryError> {
        let known: HashSet<PathBuf> = self
            .catalog
            .tracks()
            .into_iter()
            .map(|track| PathBuf::from(track.file_path))
            .collect();

        let files = self.fs.read_dir(&self.config.tracks_directory).await?;
        Ok(files
            .into_iter()
            .filter(|path| !known.contains(path))
            .collect())
    }

    /// Copies, tags and records one file under an already derived name.
    async fn import_file(&self, file: &PickedFile, file_name: String) -> Result<Track, ImportError> {
        let destination = self.config.tracks_directory.join(&file_name);

        let file_size = self
            .fs
            .copy(&file.uri, &destination)
            .await
            .map_err(|source| ImportError::CopyFailed {
                file_name: file_name.clone(),
                source,
            })?;

        let metadata = self.extract_metadata(destination.clone()).await;

        let now = Utc::now();
        let mut track = Track {
            id: Uuid::new_v4().to_string(),
            file_name,
            file_path: destination.to_string_lossy().into_owned(),
            file_size: Some(file_size),
            created_at: Some(now),
            updated_at: Some(now),
            is_synced: false,
            platform_source: Some(PlatformSource::Local),
            ..Track::default()
        };
        track.apply_patch(metadata.into());

        if let Err(e) = self.catalog.add(track.clone()).await {
            // The entry is in memory and goes out with the next successful write.
            warn!("Catalog insert of {} not persisted: {}", track.file_name, e);
        }

        info!("File imported: {} to {:?}", track.file_name, destination);
        Ok(track)
    }

    async fn extract_metadata(&self, path: PathBuf) -> TrackMetadata {
        let extractor = Arc::clone(&self.extractor);
        match spawn_blocking(move || extractor.extract(&path)).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Metadata extraction task failed: {e}");
                TrackMetadata::default()
            }
        }
    }
}
