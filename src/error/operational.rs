//! Operational error context propagation with `anyhow`.
//!
//! Failures that are absorbed (a skipped transport command, a file that
//! could not be deleted) still need a consistent log line, and failures that
//! reach the user need a short readable message. Both live here.

use std::{error::Error as StdError, fmt::Display};

use {
    anyhow::{Context, Error, Result as AnyhowResult},
    tracing::{debug, error, warn},
};

use crate::error::domain::{ImportError, LibraryError, PlaybackError};

/// Extension trait for attaching context to fallible operations.
pub trait ResultExt<T, E> {
    /// Adds context to an error with a static string.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Adds context to an error with a formatted string.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

/// Centralized error reporting and logging.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Logs an error that was deliberately swallowed.
    pub fn absorbed(error: &dyn StdError, context: &str) {
        debug!(context = context, error = %error, "Absorbed error");
    }

    /// Logs a recoverable failure.
    pub fn warn(error: &Error, context: &str) {
        warn!(context = context, error = %error, "Recoverable error");
    }

    /// Logs a failure that ended the requested operation.
    pub fn error(error: &Error, context: &str) {
        error!(context = context, error = %error, "Operation failed");
    }

    /// Converts an error to a message suitable for the end user.
    ///
    /// Known domain errors get a short phrase; anything else falls back to
    /// the outermost message of the chain.
    pub fn to_user_message(error: &Error) -> String {
        for cause in error.chain() {
            if let Some(import_error) = cause.downcast_ref::<ImportError>() {
                return match import_error {
                    ImportError::PickerError(_) => "Failed to open file picker".to_string(),
                    ImportError::CopyFailed { file_name, .. } => {
                        format!("Failed to import {file_name}")
                    }
                };
            }

            if let Some(PlaybackError::EngineError(engine_error)) =
                cause.downcast_ref::<PlaybackError>()
            {
                return format!("Playback failed: {engine_error}");
            }

            if let Some(LibraryError::NotFound { .. }) = cause.downcast_ref::<LibraryError>() {
                return "Track not found".to_string();
            }
        }

        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Error as IoError, ErrorKind::NotFound};

    use anyhow::{Error, anyhow};

    use crate::error::{
        domain::{ImportError, LibraryError},
        operational::{ErrorReporter, ResultExt},
    };

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<i32, IoError> = Err(IoError::new(NotFound, "missing"));
        let error = result.add_context("Additional context").unwrap_err();

        assert!(error.to_string().contains("Additional context"));
    }

    #[test]
    fn test_result_ext_with_contextf() {
        let result: Result<i32, IoError> = Err(IoError::new(NotFound, "missing"));
        let error = result
            .add_contextf(format_args!("Loading {}", "tracks"))
            .unwrap_err();

        assert_eq!(error.to_string(), "Loading tracks");
    }

    #[test]
    fn test_user_message_for_domain_errors() {
        let copy_error = Error::new(ImportError::CopyFailed {
            file_name: "a.mp3".to_string(),
            source: IoError::new(NotFound, "gone"),
        })
        .context("Importing batch");
        assert_eq!(
            ErrorReporter::to_user_message(&copy_error),
            "Failed to import a.mp3"
        );

        let not_found = Error::new(LibraryError::NotFound {
            id: "x".to_string(),
        });
        assert_eq!(ErrorReporter::to_user_message(&not_found), "Track not found");
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let error = anyhow!("Test error message");
        assert_eq!(ErrorReporter::to_user_message(&error), "Test error message");
    }
}
