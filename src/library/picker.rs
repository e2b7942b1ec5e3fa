//! File picker capability.
//!
//! A picker presents a chooser restricted to audio content and returns the
//! selected files, or an explicit cancellation. [`PathListPicker`] serves
//! headless sessions by "selecting" a list of paths given up front.

use std::{
    io::{Error as IoError, ErrorKind},
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    thiserror::Error,
    tokio::fs::metadata,
    tracing::{debug, warn},
};

/// File extensions treated as audio content.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aiff", "ape", "flac", "m4a", "mp3", "mp4", "mpc", "oga", "ogg", "opus",
    "spx", "wav", "wv",
];

/// Error type for file picker operations.
#[derive(Error, Debug)]
pub enum PickerError {
    /// Inspecting a selected file failed.
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
}

/// A file chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    /// Original file name, when the platform provides one.
    pub name: Option<String>,
    /// Temporary location of the selected bytes.
    pub uri: PathBuf,
    /// Size in bytes, when known.
    pub size: Option<u64>,
}

impl PickedFile {
    /// Describes a file on disk, using its own file name.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self {
            name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string),
            uri: path.to_path_buf(),
            size: None,
        }
    }
}

/// Result of presenting the chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// One or more files were selected.
    Selected(Vec<PickedFile>),
    /// The user dismissed the chooser.
    Cancelled,
}

/// Native chooser restricted to audio files, with multi-select.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Presents the chooser and waits for the user's choice.
    async fn pick(&self) -> Result<PickerOutcome, PickerError>;
}

/// Returns whether `path` has an audio file extension.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Picker that selects a fixed list of paths.
///
/// Paths that are not audio files, not regular files or missing are left out
/// of the selection. An empty selection is reported as a cancellation.
#[derive(Debug, Clone, Default)]
pub struct PathListPicker {
    paths: Vec<PathBuf>,
}

impl PathListPicker {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl FilePicker for PathListPicker {
    async fn pick(&self) -> Result<PickerOutcome, PickerError> {
        let mut selected = Vec::with_capacity(self.paths.len());

        for path in &self.paths {
            if !is_audio_file(path) {
                debug!("Skipping non-audio selection: {}", path.display());
                continue;
            }

            match metadata(path).await {
                Ok(info) if info.is_file() => selected.push(PickedFile {
                    size: Some(info.len()),
                    ..PickedFile::from_path(path)
                }),
                Ok(_) => debug!("Skipping non-file selection: {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Selected file vanished: {}", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }

        if selected.is_empty() {
            return Ok(PickerOutcome::Cancelled);
        }
        Ok(PickerOutcome::Selected(selected))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs::{create_dir, write},
        path::Path,
    };

    use tempfile::TempDir;

    use crate::library::picker::{
        FilePicker, PathListPicker, PickedFile, PickerError, PickerOutcome, is_audio_file,
    };

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("/a/song.MP3")));
        assert!(is_audio_file(Path::new("track.flac")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("README")));
    }

    #[tokio::test]
    async fn test_path_list_picker_filters_selection() {
        let temp_dir = TempDir::new().unwrap();
        let song = temp_dir.path().join("song.mp3");
        let cover = temp_dir.path().join("cover.jpg");
        let folder = temp_dir.path().join("album.flac");
        write(&song, b"12345").unwrap();
        write(&cover, b"jpeg").unwrap();
        create_dir(&folder).unwrap();

        let picker = PathListPicker::new(vec![
            song.clone(),
            cover,
            folder,
            temp_dir.path().join("missing.ogg"),
        ]);

        let outcome = picker.pick().await.unwrap();
        assert_eq!(
            outcome,
            PickerOutcome::Selected(vec![PickedFile {
                name: Some("song.mp3".to_string()),
                uri: song,
                size: Some(5),
            }])
        );
    }

    #[tokio::test]
    async fn test_uninspectable_selection_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        write(&blocker, b"file, not a directory").unwrap();

        let picker = PathListPicker::new(vec![blocker.join("song.mp3")]);
        assert!(matches!(picker.pick().await, Err(PickerError::IoError(_))));
    }

    #[tokio::test]
    async fn test_empty_selection_is_cancellation() {
        let picker = PathListPicker::new(Vec::new());
        assert_eq!(picker.pick().await.unwrap(), PickerOutcome::Cancelled);
    }
}
