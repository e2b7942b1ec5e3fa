//! Domain-specific error types using `thiserror`.
//!
//! This module defines the aggregate error enums for the library (catalog
//! and managed storage), import, and playback domains.

use std::io::Error as IoError;

use thiserror::Error;

use crate::{
    audio::engine::EngineError, library::picker::PickerError, state::persistence::StoreError,
};

/// Library-related errors (catalog and managed storage).
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Durable persistence failed.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    /// File system operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    /// Track not present in the catalog.
    #[error("Track not found: {id}")]
    NotFound { id: String },
    /// Invalid file path or metadata.
    #[error("Invalid data: {reason}")]
    InvalidData { reason: String },
}

/// Errors raised while importing a single file.
///
/// These never abort a batch; the importer records the affected file name
/// in the `failed` list and moves on.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Copying the source bytes into managed storage failed.
    #[error("Failed to copy '{file_name}' into managed storage: {source}")]
    CopyFailed {
        file_name: String,
        #[source]
        source: IoError,
    },
    /// The file picker could not be presented.
    #[error("File picker error: {0}")]
    PickerError(#[from] PickerError),
}

/// Playback-related errors.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The audio engine rejected a command.
    #[error("Engine error: {0}")]
    EngineError(#[from] EngineError),
    /// The player state could not be persisted.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use std::io::{Error, ErrorKind::PermissionDenied};

    use crate::{
        audio::engine::EngineError,
        error::domain::{ImportError, LibraryError, PlaybackError},
    };

    #[test]
    fn test_library_error_display() {
        let not_found_error = LibraryError::NotFound {
            id: "abc".to_string(),
        };
        assert_eq!(not_found_error.to_string(), "Track not found: abc");

        let invalid_data_error = LibraryError::InvalidData {
            reason: "test reason".to_string(),
        };
        assert_eq!(invalid_data_error.to_string(), "Invalid data: test reason");
    }

    #[test]
    fn test_import_error_display() {
        let copy_error = ImportError::CopyFailed {
            file_name: "song.mp3".to_string(),
            source: Error::new(PermissionDenied, "denied"),
        };
        assert_eq!(
            copy_error.to_string(),
            "Failed to copy 'song.mp3' into managed storage: denied"
        );
    }

    #[test]
    fn test_playback_error_from_engine() {
        let error = PlaybackError::from(EngineError::EmptyQueue);
        assert_eq!(error.to_string(), "Engine error: Queue is empty");
    }
}
