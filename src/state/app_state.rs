//! Application composition root.
//!
//! `AppState` builds every service exactly once per process and hands out
//! shared handles to them. Nothing in the crate reaches for global state;
//! collaborators are injected through [`AppServices`].

use std::sync::Arc;

use {
    tokio::sync::broadcast::Receiver,
    tracing::{debug, info},
};

use crate::{
    audio::{
        coordinator::PlaybackCoordinator,
        engine::AudioEngine,
        metadata::{MetadataExtractor, TagReader},
    },
    config::UserSettings,
    error::domain::LibraryError,
    library::{
        catalog::{CatalogEvent, TrackCatalog},
        fs::{FileSystem, LocalFileSystem},
        importer::{ImportConfig, TrackImporter},
        picker::FilePicker,
        storage::StorageProvisioner,
    },
    state::{
        persistence::{JsonFileStore, KeyValueStore},
        player_state::{PlayerEvent, PlayerStore},
    },
};

/// External capabilities the application is assembled from.
pub struct AppServices {
    pub fs: Arc<dyn FileSystem>,
    pub extractor: Arc<dyn MetadataExtractor>,
    pub picker: Arc<dyn FilePicker>,
    pub engine: Arc<dyn AudioEngine>,
    /// Durable store; `None` selects JSON files in the state directory.
    pub store: Option<Arc<dyn KeyValueStore>>,
}

impl AppServices {
    /// Local disk, lofty tag reading and JSON file persistence.
    #[must_use]
    pub fn local(picker: Arc<dyn FilePicker>, engine: Arc<dyn AudioEngine>) -> Self {
        Self {
            fs: Arc::new(LocalFileSystem),
            extractor: Arc::new(TagReader),
            picker,
            engine,
            store: None,
        }
    }
}

/// Shared handles to every long-lived service.
#[derive(Clone)]
pub struct AppState {
    /// Persisted track catalog.
    pub catalog: Arc<TrackCatalog>,
    /// Persisted player cache.
    pub player: Arc<PlayerStore>,
    /// Import and deletion service.
    pub importer: Arc<TrackImporter>,
    /// Transport facade over the audio engine.
    pub coordinator: Arc<PlaybackCoordinator>,
}

impl AppState {
    /// Provisions storage, hydrates the stores and wires the services.
    ///
    /// Also restores the last known track into an idle engine.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if managed storage cannot be created or a store
    /// cannot be read.
    pub async fn initialize(
        settings: &UserSettings,
        services: AppServices,
    ) -> Result<Self, LibraryError> {
        let tracks_directory = settings.tracks_directory();
        StorageProvisioner::new(Arc::clone(&services.fs), tracks_directory.clone())
            .ensure_storage_ready()
            .await?;

        let store = match services.store {
            Some(store) => store,
            None => {
                let state_directory = settings.state_directory();
                debug!("Using JSON state directory: {:?}", state_directory);
                Arc::new(JsonFileStore::new(state_directory))
            }
        };

        let catalog = Arc::new(TrackCatalog::load(Arc::clone(&store)).await?);
        let player = Arc::new(PlayerStore::load(store).await?);

        let importer = Arc::new(TrackImporter::new(
            Arc::clone(&catalog),
            services.fs,
            services.extractor,
            services.picker,
            ImportConfig {
                tracks_directory,
                default_extension: settings.default_extension.clone(),
            },
        ));

        let coordinator = Arc::new(PlaybackCoordinator::new(
            services.engine,
            Arc::clone(&player),
            settings.fallback_cover_url.clone(),
        ));
        coordinator.restore_player_state().await;

        info!("Application state ready with {} tracks", catalog.len());
        Ok(Self {
            catalog,
            player,
            importer,
            coordinator,
        })
    }

    /// Subscribes to catalog changes.
    pub fn subscribe_catalog(&self) -> Receiver<CatalogEvent> {
        self.catalog.subscribe()
    }

    /// Subscribes to player state changes.
    pub fn subscribe_player(&self) -> Receiver<PlayerEvent> {
        self.player.subscribe()
    }
}
