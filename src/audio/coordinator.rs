//! Playback coordination between the catalog, the audio engine and the
//! persisted player cache.
//!
//! The coordinator turns catalog tracks into engine queue entries, issues
//! transport commands, and mirrors engine-pushed events into the
//! [`PlayerStore`] so a relaunch can render the last known track and position
//! before the engine re-attaches.

use std::sync::Arc;

use {
    async_channel::Receiver,
    tracing::{debug, info, warn},
};

use crate::{
    audio::engine::{AudioEngine, EngineEvent, EngineTrack, PlaybackState, Progress},
    error::{ErrorReporter, domain::PlaybackError},
    library::models::Track,
    state::player_state::{PlayerStore, RepeatMode},
};

/// Artist shown for tracks without one.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Album shown for tracks without one.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Converts a catalog track into the engine's queue entry.
///
/// Artwork prefers the embedded cover, then the custom cover URL, then
/// `fallback_cover_url`.
#[must_use]
pub fn to_engine_track(track: &Track, fallback_cover_url: Option<&str>) -> EngineTrack {
    let id = if track.id.is_empty() {
        track.file_path.clone()
    } else {
        track.id.clone()
    };

    EngineTrack {
        id,
        url: track.file_path.clone(),
        title: track.display_title(),
        artist: non_empty_or(track.artist.as_deref(), UNKNOWN_ARTIST),
        album: non_empty_or(track.album.as_deref(), UNKNOWN_ALBUM),
        artwork: track
            .cover_image
            .clone()
            .or_else(|| track.custom_cover_url.clone())
            .or_else(|| fallback_cover_url.map(str::to_string)),
        duration: track.duration.map(|secs| secs as f64),
        genre: track.genre.clone(),
        date: track.year.map(|year| year.to_string()),
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Transport facade over an [`AudioEngine`].
pub struct PlaybackCoordinator {
    engine: Arc<dyn AudioEngine>,
    player: Arc<PlayerStore>,
    fallback_cover_url: Option<String>,
}

impl PlaybackCoordinator {
    #[must_use]
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        player: Arc<PlayerStore>,
        fallback_cover_url: Option<String>,
    ) -> Self {
        Self {
            engine,
            player,
            fallback_cover_url,
        }
    }

    /// Player cache mirrored by this coordinator.
    #[must_use]
    pub fn player(&self) -> &Arc<PlayerStore> {
        &self.player
    }

    /// Replaces the engine queue and starts playing `track`.
    ///
    /// When `context` is given and contains `track`, every track after it in
    /// `context` is queued behind it, in order.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EngineError` if the engine rejects any step.
    pub async fn play_track(
        &self,
        track: &Track,
        context: Option<&[Track]>,
    ) -> Result<(), PlaybackError> {
        let fallback = self.fallback_cover_url.as_deref();
        let mut queue = vec![to_engine_track(track, fallback)];

        if let Some(context) = context
            && let Some(start) = context.iter().position(|t| t.id == track.id)
        {
            queue.extend(
                context[start + 1..]
                    .iter()
                    .map(|t| to_engine_track(t, fallback)),
            );
        }

        let result = self.start_queue(queue).await;
        if let Err(e) = &result {
            warn!("Error playing track {}: {}", track.id, e);
        }
        result
    }

    async fn start_queue(&self, queue: Vec<EngineTrack>) -> Result<(), PlaybackError> {
        self.engine.reset().await?;
        self.engine.add(queue.clone()).await?;
        debug!("PlaybackCoordinator: queued {} tracks", queue.len());
        self.player.set_queue(queue);
        self.engine.play().await?;
        Ok(())
    }

    /// Pauses when the cache says playing, plays otherwise.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EngineError` if the engine rejects the command.
    pub async fn toggle_play_pause(&self) -> Result<(), PlaybackError> {
        if self.player.is_playing() {
            self.engine.pause().await?;
        } else {
            self.engine.play().await?;
        }
        Ok(())
    }

    /// Moves to the next track, or restarts the current one in track-repeat
    /// mode. Engine failures are logged and swallowed.
    pub async fn skip_to_next(&self) {
        if let Err(e) = self.skip(true).await {
            ErrorReporter::absorbed(&e, "No next track available");
        }
    }

    /// Moves to the previous track, or restarts the current one in
    /// track-repeat mode. Engine failures are logged and swallowed.
    pub async fn skip_to_previous(&self) {
        if let Err(e) = self.skip(false).await {
            ErrorReporter::absorbed(&e, "No previous track available");
        }
    }

    async fn skip(&self, forward: bool) -> Result<(), PlaybackError> {
        if self.player.repeat_mode() == RepeatMode::Track {
            self.engine.seek_to(0.0).await?;
            self.engine.play().await?;
            return Ok(());
        }

        if forward {
            self.engine.skip_to_next().await?;
        } else {
            self.engine.skip_to_previous().await?;
        }
        Ok(())
    }

    /// Re-enqueues the stored track on an empty engine without playing it.
    ///
    /// Does nothing when there is no stored track or the engine already has
    /// an active track or a queue. Failures are logged.
    pub async fn restore_player_state(&self) {
        let Some(stored) = self.player.current_track() else {
            return;
        };
        if self.engine.active_track().await.is_some() || !self.engine.queue().await.is_empty() {
            debug!("PlaybackCoordinator: engine already has a queue, skipping restore");
            return;
        }

        let position = self.player.progress().position;
        let restored = async {
            self.engine.add(vec![stored.clone()]).await?;
            if position > 0.0 {
                self.engine.seek_to(position).await?;
            }
            Ok::<(), PlaybackError>(())
        };

        match restored.await {
            Ok(()) => info!("Restored player state: {} at {:.1}s", stored.title, position),
            Err(e) => warn!("Error restoring player state: {e}"),
        }
    }

    /// Track to display: the engine's active track, else the stored one.
    pub async fn current_track(&self) -> Option<EngineTrack> {
        match self.engine.active_track().await {
            Some(track) => Some(track),
            None => self.player.current_track(),
        }
    }

    /// Progress to display: live engine progress once it knows a duration,
    /// else the stored progress.
    pub async fn progress(&self) -> Progress {
        let live = self.engine.progress().await;
        if live.duration > 0.0 {
            live
        } else {
            self.player.progress()
        }
    }

    /// Copies live engine progress into the cache when it has a duration.
    pub async fn sync_progress(&self) {
        let live = self.engine.progress().await;
        if live.duration > 0.0
            && let Err(e) = self.player.set_progress(live).await
        {
            warn!("Failed to persist progress: {e}");
        }
    }

    /// Sets the repeat mode used by the skip commands.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::StoreError` if the preference cannot be saved.
    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), PlaybackError> {
        self.player.set_repeat_mode(mode).await?;
        Ok(())
    }

    /// Stores the shuffle preference.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::StoreError` if the preference cannot be saved.
    pub async fn set_shuffle_mode(&self, enabled: bool) -> Result<(), PlaybackError> {
        self.player.set_shuffle_mode(enabled).await?;
        Ok(())
    }

    /// Mirrors one engine event into the player cache.
    pub async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::PlaybackStateChanged(state) => {
                self.player.set_is_playing(state == PlaybackState::Playing);
            }
            EngineEvent::ActiveTrackChanged(Some(track)) => {
                debug!("PlaybackCoordinator: active track {}", track.id);
                if let Err(e) = self.player.set_current_track(Some(track)).await {
                    warn!("Failed to persist current track: {e}");
                }
            }
            // An engine reset clears its queue; the cached track stays for display.
            EngineEvent::ActiveTrackChanged(None) => {}
            EngineEvent::ProgressUpdated(progress) => {
                if progress.duration > 0.0
                    && let Err(e) = self.player.set_progress(progress).await
                {
                    warn!("Failed to persist progress: {e}");
                }
            }
        }
    }

    /// Consumes engine events in order until the engine drops its sender.
    pub async fn run(&self, events: Receiver<EngineEvent>) {
        while let Ok(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("PlaybackCoordinator: engine event stream closed");
    }
}
