//! Tunedeck - Local Track Library and Playback Coordination
//!
//! Imports user-selected audio files into app-managed storage, extracts their
//! tags and embedded artwork, keeps a persisted searchable catalog, and
//! coordinates an audio engine whose last known state survives a relaunch.

pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod state;

// Re-export key types for convenience
pub use {
    audio::{AudioEngine, EngineTrack, PlaybackCoordinator, PlaybackState},
    config::{SettingsManager, UserSettings},
    error::{ImportError, LibraryError, PlaybackError},
    library::{ImportResult, Track, TrackCatalog, TrackImporter},
    state::{AppServices, AppState, PlayerStore, RepeatMode},
};
