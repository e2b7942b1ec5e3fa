//! Error handling built on `thiserror` and `anyhow`.
//!
//! Domain-specific enums give callers something precise to match on, while
//! the operational helpers attach context to failures that are only logged
//! or reported to the user.

pub mod domain;
pub mod operational;

pub use {
    domain::{ImportError, LibraryError, PlaybackError},
    operational::{ErrorReporter, ResultExt},
};
