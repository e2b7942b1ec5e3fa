//! Track catalog store.
//!
//! The catalog is the in-memory collection of every known track, addressed by
//! `id`. Each mutation persists the whole catalog through the key-value store
//! before returning, and then notifies subscribers.

use std::sync::Arc;

use {
    chrono::Utc,
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    tokio::sync::{
        Mutex,
        broadcast::{Receiver, Sender, channel},
    },
    tracing::{debug, warn},
};

use crate::{
    library::models::{Track, TrackPatch},
    state::persistence::{KeyValueStore, StoreError, load_json, save_json},
};

/// Key of the catalog snapshot in the key-value store.
pub const CATALOG_STORE_KEY: &str = "tracks_store";

/// Persisted shape of the catalog.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogSnapshot {
    tracks: Vec<Track>,
}

/// Catalog change notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// Tracks were inserted or merged.
    TracksAdded(Vec<String>),
    /// A track was patched.
    TrackUpdated(String),
    /// A track was removed.
    TrackRemoved(String),
    /// The catalog was emptied.
    Cleared,
}

/// Persisted collection of all known tracks.
pub struct TrackCatalog {
    tracks: Arc<RwLock<Vec<Track>>>,
    store: Arc<dyn KeyValueStore>,
    /// Serializes mutate-then-persist sequences so snapshots land in order.
    write_gate: Mutex<()>,
    events_tx: Sender<CatalogEvent>,
}

impl TrackCatalog {
    /// Loads the catalog from the key-value store.
    ///
    /// An unreadable snapshot is set aside and the catalog starts empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let snapshot: CatalogSnapshot = load_json(&*store, CATALOG_STORE_KEY)
            .await?
            .unwrap_or_default();
        debug!("Loaded catalog with {} tracks", snapshot.tracks.len());

        let (events_tx, _) = channel(32);
        Ok(Self {
            tracks: Arc::new(RwLock::new(snapshot.tracks)),
            store,
            write_gate: Mutex::new(()),
            events_tx,
        })
    }

    /// Subscribes to catalog changes.
    pub fn subscribe(&self) -> Receiver<CatalogEvent> {
        self.events_tx.subscribe()
    }

    /// Inserts a track, or merges it into the entry with the same `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be persisted. The change
    /// still applies in memory.
    pub async fn add(&self, track: Track) -> Result<(), StoreError> {
        let event = CatalogEvent::TracksAdded(vec![track.id.clone()]);
        self.commit(
            |tracks| {
                upsert(tracks, track);
                true
            },
            event,
        )
        .await
    }

    /// Inserts several tracks, merging any whose `id` is already known.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be persisted. The change
    /// still applies in memory.
    pub async fn add_many(&self, tracks: Vec<Track>) -> Result<(), StoreError> {
        let ids = tracks.iter().map(|track| track.id.clone()).collect();
        self.commit(
            |stored| {
                let changed = !tracks.is_empty();
                for track in tracks {
                    upsert(stored, track);
                }
                changed
            },
            CatalogEvent::TracksAdded(ids),
        )
        .await
    }

    /// Patches the track with `id` and refreshes its `updated_at`. Unknown ids
    /// are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be persisted. The change
    /// still applies in memory.
    pub async fn update(&self, id: &str, patch: TrackPatch) -> Result<(), StoreError> {
        self.commit(
            |tracks| match tracks.iter_mut().find(|track| track.id == id) {
                Some(track) => {
                    track.apply_patch(patch);
                    track.updated_at = Some(Utc::now());
                    true
                }
                None => false,
            },
            CatalogEvent::TrackUpdated(id.to_string()),
        )
        .await
    }

    /// Removes the track with `id`. Unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be persisted. The removal
    /// still applies in memory.
    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.commit(
            |tracks| {
                let before = tracks.len();
                tracks.retain(|track| track.id != id);
                tracks.len() != before
            },
            CatalogEvent::TrackRemoved(id.to_string()),
        )
        .await
    }

    /// Removes every track.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be persisted. The catalog
    /// is still emptied in memory.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.commit(
            |tracks| {
                tracks.clear();
                true
            },
            CatalogEvent::Cleared,
        )
        .await
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Track> {
        self.tracks.read().iter().find(|track| track.id == id).cloned()
    }

    /// Linear scan for a track with the given derived file name.
    #[must_use]
    pub fn get_by_file_name(&self, file_name: &str) -> Option<Track> {
        self.tracks
            .read()
            .iter()
            .find(|track| track.file_name == file_name)
            .cloned()
    }

    /// Tracks whose title, artist, album or genre contains `query`,
    /// ignoring case.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Track> {
        let query = query.to_lowercase();
        self.tracks
            .read()
            .iter()
            .filter(|track| track.matches(&query))
            .cloned()
            .collect()
    }

    /// Snapshot of every track.
    #[must_use]
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.read().is_empty()
    }

    /// Runs `mutate` under the write gate. When it reports a change,
    /// subscribers are notified and the snapshot is written; subscribers hear
    /// about the change even when the write fails.
    async fn commit(
        &self,
        mutate: impl FnOnce(&mut Vec<Track>) -> bool,
        event: CatalogEvent,
    ) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        let snapshot = {
            let mut tracks = self.tracks.write();
            if !mutate(&mut *tracks) {
                return Ok(());
            }
            CatalogSnapshot {
                tracks: tracks.clone(),
            }
        };
        self.notify(event);

        let saved = save_json(&*self.store, CATALOG_STORE_KEY, &snapshot).await;
        if let Err(e) = &saved {
            warn!("Failed to persist catalog: {e}");
        }
        saved
    }

    fn notify(&self, event: CatalogEvent) {
        let _ = self.events_tx.send(event);
    }
}

fn upsert(tracks: &mut Vec<Track>, track: Track) {
    match tracks.iter_mut().find(|stored| stored.id == track.id) {
        Some(stored) => stored.merge(track),
        None => tracks.push(track),
    }
}
