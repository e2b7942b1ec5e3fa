//! Player state store.
//!
//! The store keeps the full [`PlayerState`] in memory but persists only the
//! subset needed to render the mini-player right after a relaunch, before
//! the engine reports live state. The persisted and transient halves are
//! separate types joined and split by explicit projections.

use std::sync::Arc;

use {
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    tokio::sync::{
        Mutex,
        broadcast::{Receiver, Sender, channel},
    },
    tracing::{debug, warn},
};

use crate::{
    audio::engine::{EngineTrack, Progress},
    state::persistence::{KeyValueStore, StoreError, load_json, save_json},
};

/// Key of the player snapshot in the key-value store.
pub const PLAYER_STORE_KEY: &str = "music_player_store";

/// What the next/previous commands do at the ends of a track or queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    Track,
    Queue,
}

/// Fields written to durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PersistedPlayerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_track: Option<EngineTrack>,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffle_mode: bool,
}

/// Fields that only live for the current session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransientPlayerState {
    pub is_playing: bool,
    pub queue: Vec<EngineTrack>,
}

/// Complete player state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerState {
    pub is_playing: bool,
    pub current_track: Option<EngineTrack>,
    pub progress: Progress,
    pub queue: Vec<EngineTrack>,
    pub repeat_mode: RepeatMode,
    pub shuffle_mode: bool,
}

impl PlayerState {
    /// Joins the two halves into a full state.
    #[must_use]
    pub fn from_parts(persisted: PersistedPlayerState, transient: TransientPlayerState) -> Self {
        Self {
            is_playing: transient.is_playing,
            current_track: persisted.current_track,
            progress: persisted.progress,
            queue: transient.queue,
            repeat_mode: persisted.repeat_mode,
            shuffle_mode: persisted.shuffle_mode,
        }
    }

    /// Projection onto the persisted subset.
    #[must_use]
    pub fn persisted(&self) -> PersistedPlayerState {
        PersistedPlayerState {
            current_track: self.current_track.clone(),
            progress: self.progress,
            repeat_mode: self.repeat_mode,
            shuffle_mode: self.shuffle_mode,
        }
    }

    /// Projection onto the session-only subset.
    #[must_use]
    pub fn transient(&self) -> TransientPlayerState {
        TransientPlayerState {
            is_playing: self.is_playing,
            queue: self.queue.clone(),
        }
    }
}

/// Player state change notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    IsPlayingChanged(bool),
    CurrentTrackChanged(Option<EngineTrack>),
    ProgressChanged(Progress),
    QueueChanged(usize),
    RepeatModeChanged(RepeatMode),
    ShuffleModeChanged(bool),
    Reset,
}

/// Player state store with write-through persistence of the persisted subset.
pub struct PlayerStore {
    state: Arc<RwLock<PlayerState>>,
    store: Arc<dyn KeyValueStore>,
    /// Serializes mutate-then-persist sequences so snapshots land in order.
    write_gate: Mutex<()>,
    events_tx: Sender<PlayerEvent>,
}

impl PlayerStore {
    /// Creates a store hydrated from the persisted snapshot, if any.
    ///
    /// An unreadable snapshot is set aside and replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let persisted: PersistedPlayerState = load_json(&*store, PLAYER_STORE_KEY)
            .await?
            .unwrap_or_default();

        debug!(
            "Loaded player state (current track: {:?})",
            persisted.current_track.as_ref().map(|track| &track.id)
        );

        let (events_tx, _) = channel(32);
        Ok(Self {
            state: Arc::new(RwLock::new(PlayerState::from_parts(
                persisted,
                TransientPlayerState::default(),
            ))),
            store,
            write_gate: Mutex::new(()),
            events_tx,
        })
    }

    /// Subscribes to player state changes.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.events_tx.subscribe()
    }

    /// Snapshot of the full state.
    #[must_use]
    pub fn snapshot(&self) -> PlayerState {
        self.state.read().clone()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.read().is_playing
    }

    #[must_use]
    pub fn repeat_mode(&self) -> RepeatMode {
        self.state.read().repeat_mode
    }

    #[must_use]
    pub fn current_track(&self) -> Option<EngineTrack> {
        self.state.read().current_track.clone()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.state.read().progress
    }

    /// Session-only; not persisted.
    pub fn set_is_playing(&self, is_playing: bool) {
        self.state.write().is_playing = is_playing;
        self.notify(PlayerEvent::IsPlayingChanged(is_playing));
    }

    /// Session-only; not persisted.
    pub fn set_queue(&self, queue: Vec<EngineTrack>) {
        let len = queue.len();
        self.state.write().queue = queue;
        self.notify(PlayerEvent::QueueChanged(len));
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written. The change
    /// still applies in memory.
    pub async fn set_current_track(&self, track: Option<EngineTrack>) -> Result<(), StoreError> {
        let event = PlayerEvent::CurrentTrackChanged(track.clone());
        self.commit(|state| state.current_track = track, event)
            .await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written. The change
    /// still applies in memory.
    pub async fn set_progress(&self, progress: Progress) -> Result<(), StoreError> {
        self.commit(
            |state| state.progress = progress,
            PlayerEvent::ProgressChanged(progress),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written. The change
    /// still applies in memory.
    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), StoreError> {
        self.commit(
            |state| state.repeat_mode = mode,
            PlayerEvent::RepeatModeChanged(mode),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written. The change
    /// still applies in memory.
    pub async fn set_shuffle_mode(&self, enabled: bool) -> Result<(), StoreError> {
        self.commit(
            |state| state.shuffle_mode = enabled,
            PlayerEvent::ShuffleModeChanged(enabled),
        )
        .await
    }

    /// Clears playback, current track, progress and queue. Repeat and shuffle
    /// preferences survive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written. The reset
    /// still applies in memory.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.commit(
            |state| {
                state.is_playing = false;
                state.current_track = None;
                state.progress = Progress::default();
                state.queue.clear();
            },
            PlayerEvent::Reset,
        )
        .await
    }

    /// Applies `mutate`, notifies subscribers, then writes the persisted
    /// subset. Subscribers hear about the change even when the write fails.
    async fn commit(
        &self,
        mutate: impl FnOnce(&mut PlayerState),
        event: PlayerEvent,
    ) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        let persisted = {
            let mut state = self.state.write();
            mutate(&mut *state);
            state.persisted()
        };
        self.notify(event);

        let saved = save_json(&*self.store, PLAYER_STORE_KEY, &persisted).await;
        if let Err(e) = &saved {
            warn!("Failed to persist player state: {e}");
        }
        saved
    }

    fn notify(&self, event: PlayerEvent) {
        let _ = self.events_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use {async_trait::async_trait, serde_json::from_str};

    use crate::{
        audio::engine::{EngineTrack, Progress},
        state::{
            persistence::{KeyValueStore, MemoryStore, StoreError},
            player_state::{
                PLAYER_STORE_KEY, PersistedPlayerState, PlayerEvent, PlayerState, PlayerStore,
                RepeatMode, TransientPlayerState,
            },
        },
    };

    /// Backend that accepts reads but rejects every write.
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::InvalidKey {
                key: key.to_string(),
            })
        }

        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn engine_track(id: &str) -> EngineTrack {
        EngineTrack {
            id: id.to_string(),
            url: format!("/tracks/{id}.mp3"),
            title: id.to_string(),
            artist: "Unknown Artist".to_string(),
            album: "Unknown Album".to_string(),
            artwork: None,
            duration: Some(200.0),
            genre: None,
            date: Some("1999".to_string()),
        }
    }

    #[test]
    fn test_projections_are_disjoint_and_lossless() {
        let state = PlayerState {
            is_playing: true,
            current_track: Some(engine_track("a")),
            progress: Progress {
                position: 12.0,
                duration: 200.0,
                buffered: 200.0,
            },
            queue: vec![engine_track("a"), engine_track("b")],
            repeat_mode: RepeatMode::Queue,
            shuffle_mode: true,
        };

        let rebuilt = PlayerState::from_parts(state.persisted(), state.transient());
        assert_eq!(rebuilt, state);

        let cold = PlayerState::from_parts(state.persisted(), TransientPlayerState::default());
        assert!(!cold.is_playing);
        assert!(cold.queue.is_empty());
        assert_eq!(cold.current_track, state.current_track);
    }

    #[tokio::test]
    async fn test_only_persisted_subset_is_written() {
        let backend = Arc::new(MemoryStore::new());
        let store = PlayerStore::load(backend.clone()).await.unwrap();

        store.set_is_playing(true);
        store.set_queue(vec![engine_track("a")]);
        assert_eq!(backend.get(PLAYER_STORE_KEY).await.unwrap(), None);

        store
            .set_current_track(Some(engine_track("a")))
            .await
            .unwrap();
        store.set_repeat_mode(RepeatMode::Track).await.unwrap();

        let raw = backend.get(PLAYER_STORE_KEY).await.unwrap().unwrap();
        let persisted: PersistedPlayerState = from_str(&raw).unwrap();
        assert_eq!(persisted.current_track, Some(engine_track("a")));
        assert_eq!(persisted.repeat_mode, RepeatMode::Track);

        assert!(!raw.contains("is_playing"));
        assert!(!raw.contains("queue"));
    }

    #[tokio::test]
    async fn test_reload_restores_persisted_subset() {
        let backend = Arc::new(MemoryStore::new());
        {
            let store = PlayerStore::load(backend.clone()).await.unwrap();
            store
                .set_current_track(Some(engine_track("a")))
                .await
                .unwrap();
            store
                .set_progress(Progress {
                    position: 30.0,
                    duration: 200.0,
                    buffered: 60.0,
                })
                .await
                .unwrap();
            store.set_shuffle_mode(true).await.unwrap();
            store.set_is_playing(true);
        }

        let reloaded = PlayerStore::load(backend).await.unwrap();
        let state = reloaded.snapshot();
        assert_eq!(state.current_track, Some(engine_track("a")));
        assert_eq!(state.progress.position, 30.0);
        assert!(state.shuffle_mode);
        assert!(!state.is_playing);
    }

    #[tokio::test]
    async fn test_reset_keeps_preferences() {
        let store = PlayerStore::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        let mut events = store.subscribe();

        store.set_repeat_mode(RepeatMode::Queue).await.unwrap();
        store
            .set_current_track(Some(engine_track("a")))
            .await
            .unwrap();
        store.set_is_playing(true);
        store.reset().await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.repeat_mode, RepeatMode::Queue);
        assert_eq!(state.current_track, None);
        assert!(!state.is_playing);

        assert_eq!(
            events.recv().await.unwrap(),
            PlayerEvent::RepeatModeChanged(RepeatMode::Queue)
        );
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_defaults() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .set(PLAYER_STORE_KEY, "{broken".to_string())
            .await
            .unwrap();

        let store = PlayerStore::load(backend.clone()).await.unwrap();
        assert_eq!(store.snapshot(), PlayerState::default());
        assert_eq!(backend.get(PLAYER_STORE_KEY).await.unwrap(), None);
        assert_eq!(
            backend
                .get("music_player_store.corrupt")
                .await
                .unwrap()
                .as_deref(),
            Some("{broken")
        );
    }

    #[tokio::test]
    async fn test_failed_write_still_applies_and_notifies() {
        let store = PlayerStore::load(Arc::new(ReadOnlyStore)).await.unwrap();
        let mut events = store.subscribe();

        let result = store.set_current_track(Some(engine_track("a"))).await;

        assert!(matches!(result, Err(StoreError::InvalidKey { .. })));
        assert_eq!(store.current_track(), Some(engine_track("a")));
        assert_eq!(
            events.try_recv().unwrap(),
            PlayerEvent::CurrentTrackChanged(Some(engine_track("a")))
        );

        assert!(store.reset().await.is_err());
        assert_eq!(store.current_track(), None);
        assert_eq!(events.try_recv().unwrap(), PlayerEvent::Reset);
    }
}
