//! Data models for the track catalog.
//!
//! `Track` is also the persisted schema of the catalog snapshot, so every
//! optional field is skipped when absent and defaulted when missing.

use std::sync::LazyLock;

use {
    chrono::{DateTime, Utc},
    regex::Regex,
    serde::{Deserialize, Serialize},
};

/// A trailing ".ext" that contains neither a dot nor a slash.
static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^/.]+$").expect("extension pattern is valid"));

/// Where a track came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlatformSource {
    /// Imported from device storage.
    #[default]
    Local,
    Deezer,
    Spotify,
    #[serde(rename = "soundcloud")]
    SoundCloud,
    AppleMusic,
    /// Any other remote provider.
    #[serde(untagged)]
    Other(String),
}

/// Kind of media behind a custom cover URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverType {
    Image,
    Video,
}

/// A single audio item in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Track {
    /// Opaque unique identifier, assigned at import.
    pub id: String,
    /// Owning account, reserved for remote sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Derived file name, also the deduplication key.
    pub file_name: String,
    /// Location of the audio file in managed storage.
    pub file_path: String,
    /// Size in bytes at import time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Audio bitrate in kbps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    /// Sample rate in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    /// Embedded artwork as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_cover_type: Option<CoverType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_source: Option<PlatformSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_track_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_at: Option<DateTime<Utc>>,

    /// Reserved for remote sync; always false for local imports.
    #[serde(default)]
    pub is_synced: bool,
}

/// Partial update applied by [`Track::apply_patch`]. `None` leaves a field as is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub composer: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub genre: Option<String>,
    pub duration: Option<u64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub cover_image: Option<String>,
    pub custom_cover_url: Option<String>,
    pub custom_cover_type: Option<CoverType>,
    pub platform_source: Option<PlatformSource>,
    pub platform_track_id: Option<String>,
    pub last_played_at: Option<DateTime<Utc>>,
    pub is_synced: Option<bool>,
}

/// Copies every `Some` field of `$from` over `$into`.
macro_rules! overlay {
    ($into:expr, $from:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $from.$field {
                $into.$field = Some(value);
            }
        )+
    };
}

impl Track {
    /// Shallow merge of another record with the same identity.
    ///
    /// Fields present on `other` win, absent ones keep the stored value.
    /// `file_name` and `file_path` always take the incoming value.
    pub fn merge(&mut self, other: Track) {
        self.file_name = other.file_name;
        self.file_path = other.file_path;
        self.is_synced = other.is_synced;
        overlay!(self, other;
            user_id, file_size, title, artist, album_artist, album, composer, year,
            track_number, disc_number, genre, duration, bitrate, sample_rate,
            cover_image, custom_cover_url, custom_cover_type, platform_source,
            platform_track_id, created_at, updated_at, last_played_at,
        );
    }

    /// Applies a partial update. Does not touch `updated_at`.
    pub fn apply_patch(&mut self, patch: TrackPatch) {
        if let Some(is_synced) = patch.is_synced {
            self.is_synced = is_synced;
        }
        overlay!(self, patch;
            title, artist, album_artist, album, composer, year, track_number,
            disc_number, genre, duration, bitrate, sample_rate, cover_image,
            custom_cover_url, custom_cover_type, platform_source, platform_track_id,
            last_played_at,
        );
    }

    /// Title for display, falling back to the file name without extension.
    #[must_use]
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => EXTENSION.replace(&self.file_name, "").into_owned(),
        }
    }

    /// Case-insensitive substring match on title, artist, album and genre.
    ///
    /// `lowercase_query` must already be lowercased.
    #[must_use]
    pub fn matches(&self, lowercase_query: &str) -> bool {
        [&self.title, &self.artist, &self.album, &self.genre]
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(lowercase_query))
    }
}

/// Outcome of one import batch. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportResult {
    /// Tracks added to the catalog.
    pub imported: Vec<Track>,
    /// Derived file names that could not be imported.
    pub failed: Vec<String>,
    /// Derived file names already present in the catalog.
    pub duplicates: Vec<String>,
}

impl ImportResult {
    /// Number of files the batch covered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.imported.len() + self.failed.len() + self.duplicates.len()
    }
}

#[cfg(test)]
mod tests {
    use {
        chrono::Utc,
        serde_json::{from_str, json, to_value},
    };

    use crate::library::models::{CoverType, PlatformSource, Track, TrackPatch};

    fn track() -> Track {
        Track {
            id: "t1".to_string(),
            file_name: "Night Drive.flac".to_string(),
            file_path: "/music/tracks/Night Drive.flac".to_string(),
            title: Some("Night Drive".to_string()),
            artist: Some("X".to_string()),
            year: Some(2020),
            platform_source: Some(PlatformSource::Local),
            ..Track::default()
        }
    }

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let value = to_value(track()).unwrap();
        assert_eq!(value["platform_source"], json!("local"));
        assert!(value.get("album").is_none());
        assert!(value.get("cover_image").is_none());
        assert_eq!(value["is_synced"], json!(false));
    }

    #[test]
    fn test_platform_source_accepts_unknown_providers() {
        let parsed: Track = from_str(
            r#"{"id":"a","file_name":"a.mp3","file_path":"/a.mp3","platform_source":"bandcamp"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.platform_source,
            Some(PlatformSource::Other("bandcamp".to_string()))
        );

        let parsed: Track = from_str(
            r#"{"id":"a","file_name":"a.mp3","file_path":"/a.mp3","platform_source":"soundcloud","custom_cover_type":"video"}"#,
        )
        .unwrap();
        assert_eq!(parsed.platform_source, Some(PlatformSource::SoundCloud));
        assert_eq!(parsed.custom_cover_type, Some(CoverType::Video));
        assert!(!parsed.is_synced);
    }

    #[test]
    fn test_merge_keeps_fields_absent_from_incoming() {
        let mut stored = track();
        let incoming = Track {
            id: "t1".to_string(),
            file_name: "Night Drive.flac".to_string(),
            file_path: "/elsewhere/Night Drive.flac".to_string(),
            album: Some("Roads".to_string()),
            year: Some(2021),
            ..Track::default()
        };

        stored.merge(incoming);

        assert_eq!(stored.title.as_deref(), Some("Night Drive"));
        assert_eq!(stored.album.as_deref(), Some("Roads"));
        assert_eq!(stored.year, Some(2021));
        assert_eq!(stored.file_path, "/elsewhere/Night Drive.flac");
    }

    #[test]
    fn test_apply_patch() {
        let mut stored = track();
        let now = Utc::now();
        stored.apply_patch(TrackPatch {
            genre: Some("Synthwave".to_string()),
            last_played_at: Some(now),
            is_synced: Some(true),
            ..TrackPatch::default()
        });

        assert_eq!(stored.genre.as_deref(), Some("Synthwave"));
        assert_eq!(stored.artist.as_deref(), Some("X"));
        assert_eq!(stored.last_played_at, Some(now));
        assert!(stored.is_synced);
    }

    #[test]
    fn test_display_title_strips_last_extension() {
        let mut untitled = Track {
            file_name: "live.at.home.mp3".to_string(),
            ..Track::default()
        };
        assert_eq!(untitled.display_title(), "live.at.home");

        untitled.title = Some(String::new());
        untitled.file_name = "noext".to_string();
        assert_eq!(untitled.display_title(), "noext");

        assert_eq!(track().display_title(), "Night Drive");
    }

    #[test]
    fn test_matches_any_descriptive_field() {
        let mut t = track();
        t.genre = Some("Darkwave".to_string());

        assert!(t.matches("night"));
        assert!(t.matches("x"));
        assert!(t.matches("dark"));
        assert!(!t.matches("roads"));
    }
}
