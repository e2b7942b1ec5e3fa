//! Audio engine capability.
//!
//! Playback itself is owned by an external engine (a platform audio session
//! or a native player). This module defines the contract the rest of the
//! crate talks to, the minimal track representation the engine consumes,
//! and the events it pushes back. [`HeadlessEngine`] is an in-process
//! implementation that keeps queue bookkeeping without producing sound.

use std::sync::Arc;

use {
    async_channel::{Receiver, Sender, unbounded},
    async_trait::async_trait,
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    thiserror::Error,
    tracing::debug,
};

/// Current playback state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackState {
    /// No track is loaded or playing.
    #[default]
    Stopped,
    /// Track is loaded and ready to play.
    Ready,
    /// Track is currently playing.
    Playing,
    /// Track is paused.
    Paused,
}

/// Minimal track representation handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTrack {
    /// Catalog identifier, used to correlate engine events with the catalog.
    pub id: String,
    /// Location of the audio file.
    pub url: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Release year as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Playback position of the active track, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Progress {
    pub position: f64,
    pub duration: f64,
    pub buffered: f64,
}

/// State changes pushed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Transport state changed.
    PlaybackStateChanged(PlaybackState),
    /// A different queue entry became active, or the queue was emptied.
    ActiveTrackChanged(Option<EngineTrack>),
    /// Periodic position report.
    ProgressUpdated(Progress),
}

/// Error type for engine commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// There is no track after the active one.
    #[error("No next track available")]
    NoNextTrack,
    /// There is no track before the active one.
    #[error("No previous track available")]
    NoPreviousTrack,
    /// The command needs an active track but the queue is empty.
    #[error("Queue is empty")]
    EmptyQueue,
    /// The engine refused the command.
    #[error("Engine rejected command: {reason}")]
    Rejected { reason: String },
}

/// Queue and transport control of an external audio engine.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Clears the queue and stops playback.
    async fn reset(&self) -> Result<(), EngineError>;

    /// Appends tracks to the queue.
    async fn add(&self, tracks: Vec<EngineTrack>) -> Result<(), EngineError>;

    /// Starts or resumes playback of the active track.
    async fn play(&self) -> Result<(), EngineError>;

    /// Pauses playback.
    async fn pause(&self) -> Result<(), EngineError>;

    /// Moves the play head of the active track, in seconds.
    async fn seek_to(&self, position: f64) -> Result<(), EngineError>;

    /// Activates the next queue entry.
    async fn skip_to_next(&self) -> Result<(), EngineError>;

    /// Activates the previous queue entry.
    async fn skip_to_previous(&self) -> Result<(), EngineError>;

    /// Current queue contents.
    async fn queue(&self) -> Vec<EngineTrack>;

    /// Currently active queue entry.
    async fn active_track(&self) -> Option<EngineTrack>;

    /// Live progress of the active track.
    async fn progress(&self) -> Progress;

    /// Current transport state.
    async fn playback_state(&self) -> PlaybackState;
}

#[derive(Debug, Default)]
struct HeadlessQueue {
    tracks: Vec<EngineTrack>,
    current_index: Option<usize>,
    state: PlaybackState,
    position: f64,
}

impl HeadlessQueue {
    fn active(&self) -> Option<&EngineTrack> {
        self.current_index.and_then(|index| self.tracks.get(index))
    }
}

/// Engine without audio output.
///
/// Tracks the queue, the active entry, transport state and position, and
/// emits the same events a real engine would.
#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    queue: Arc<RwLock<HeadlessQueue>>,
    events_tx: Sender<EngineEvent>,
}

impl HeadlessEngine {
    /// Creates a new engine and the receiving end of its event stream.
    #[must_use]
    pub fn new() -> (Self, Receiver<EngineEvent>) {
        let (events_tx, events_rx) = unbounded();
        let engine = Self {
            queue: Arc::new(RwLock::new(HeadlessQueue::default())),
            events_tx,
        };
        (engine, events_rx)
    }

    fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!("HeadlessEngine: Dropping event, no listener: {e}");
        }
    }

    fn set_state(&self, state: PlaybackState) {
        self.queue.write().state = state;
        self.emit(EngineEvent::PlaybackStateChanged(state));
    }

    fn activate(&self, index: usize) -> Option<EngineTrack> {
        let mut queue = self.queue.write();
        queue.current_index = Some(index);
        queue.position = 0.0;
        queue.tracks.get(index).cloned()
    }
}

#[async_trait]
impl AudioEngine for HeadlessEngine {
    async fn reset(&self) -> Result<(), EngineError> {
        let had_active = {
            let mut queue = self.queue.write();
            let had_active = queue.current_index.is_some();
            *queue = HeadlessQueue::default();
            had_active
        };

        if had_active {
            self.emit(EngineEvent::ActiveTrackChanged(None));
        }
        self.set_state(PlaybackState::Stopped);
        Ok(())
    }

    async fn add(&self, tracks: Vec<EngineTrack>) -> Result<(), EngineError> {
        let first_active = {
            let mut queue = self.queue.write();
            queue.tracks.extend(tracks);
            if queue.current_index.is_none() && !queue.tracks.is_empty() {
                queue.current_index = Some(0);
                queue.position = 0.0;
                queue.tracks.first().cloned()
            } else {
                None
            }
        };

        if let Some(track) = first_active {
            self.emit(EngineEvent::ActiveTrackChanged(Some(track)));
            self.set_state(PlaybackState::Ready);
        }
        Ok(())
    }

    async fn play(&self) -> Result<(), EngineError> {
        if self.queue.read().active().is_none() {
            return Err(EngineError::EmptyQueue);
        }
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    async fn pause(&self) -> Result<(), EngineError> {
        if self.queue.read().active().is_none() {
            return Err(EngineError::EmptyQueue);
        }
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    async fn seek_to(&self, position: f64) -> Result<(), EngineError> {
        let progress = {
            let mut queue = self.queue.write();
            let Some(active) = queue.active() else {
                return Err(EngineError::EmptyQueue);
            };
            if position < 0.0 {
                return Err(EngineError::Rejected {
                    reason: format!("negative seek position {position}"),
                });
            }
            let duration = active.duration.unwrap_or(0.0);
            queue.position = position;
            Progress {
                position,
                duration,
                buffered: duration,
            }
        };

        self.emit(EngineEvent::ProgressUpdated(progress));
        Ok(())
    }

    async fn skip_to_next(&self) -> Result<(), EngineError> {
        let next_index = {
            let queue = self.queue.read();
            match queue.current_index {
                Some(index) if index + 1 < queue.tracks.len() => index + 1,
                _ => return Err(EngineError::NoNextTrack),
            }
        };

        let track = self.activate(next_index);
        self.emit(EngineEvent::ActiveTrackChanged(track));
        Ok(())
    }

    async fn skip_to_previous(&self) -> Result<(), EngineError> {
        let previous_index = {
            let queue = self.queue.read();
            match queue.current_index {
                Some(index) if index > 0 => index - 1,
                _ => return Err(EngineError::NoPreviousTrack),
            }
        };

        let track = self.activate(previous_index);
        self.emit(EngineEvent::ActiveTrackChanged(track));
        Ok(())
    }

    async fn queue(&self) -> Vec<EngineTrack> {
        self.queue.read().tracks.clone()
    }

    async fn active_track(&self) -> Option<EngineTrack> {
        self.queue.read().active().cloned()
    }

    async fn progress(&self) -> Progress {
        let queue = self.queue.read();
        let duration = queue
            .active()
            .and_then(|track| track.duration)
            .unwrap_or(0.0);
        Progress {
            position: queue.position,
            duration,
            buffered: duration,
        }
    }

    async fn playback_state(&self) -> PlaybackState {
        self.queue.read().state
    }
}
