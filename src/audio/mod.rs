//! Audio metadata and playback coordination.
//!
//! Provides tag reading with lofty, artwork encoding, the audio engine
//! contract, and the coordinator that drives the engine and mirrors its
//! state into the persisted player cache.

pub mod artwork;
pub mod coordinator;
pub mod engine;
pub mod metadata;

pub use {
    coordinator::PlaybackCoordinator,
    engine::{AudioEngine, EngineEvent, EngineTrack, HeadlessEngine, PlaybackState, Progress},
    metadata::{MetadataExtractor, TagReader, TrackMetadata},
};
