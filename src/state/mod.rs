//! Persisted application state.
//!
//! This module provides the key-value persistence layer, the player state
//! store, and the composition root that wires every service together.

pub mod app_state;
pub mod persistence;
pub mod player_state;

pub use {
    app_state::{AppServices, AppState},
    persistence::{JsonFileStore, KeyValueStore, MemoryStore, StoreError},
    player_state::{PlayerState, PlayerStore, RepeatMode},
};
