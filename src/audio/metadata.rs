//! Audio file metadata extraction using the `lofty` crate.
//!
//! Extraction is best-effort: any failure to open or parse the container
//! degrades to an empty [`TrackMetadata`] so the caller can still treat the
//! file as a valid, untagged track.

use std::path::Path;

use {
    lofty::{
        error::LoftyError,
        prelude::{
            AudioFile,
            ItemKey::{AlbumArtist, Composer},
            TaggedFileExt,
        },
        picture::Picture,
        probe::Probe,
        tag::{Accessor, Tag},
    },
    serde::{Deserialize, Serialize},
    thiserror::Error,
    tracing::{debug, warn},
};

use crate::{audio::artwork::picture_to_data_uri, library::models::TrackPatch};

/// Error type for metadata extraction operations.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Failed to read or parse the audio file.
    #[error("Failed to read audio file: {0}")]
    ReadError(#[from] LoftyError),
}

/// Partial track metadata read from an audio container.
///
/// Every field is independently absent when the file lacks it. Numeric values
/// are passed through exactly as the tag reader reports them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub genre: Option<String>,
    /// Duration in seconds.
    pub duration: Option<u64>,
    /// Audio bitrate in kbps.
    pub bitrate: Option<u32>,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// First embedded picture, as a `data:` URI.
    pub cover_image: Option<String>,
}

impl TrackMetadata {
    /// Returns `true` when no field was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<TrackMetadata> for TrackPatch {
    fn from(metadata: TrackMetadata) -> Self {
        TrackPatch {
            title: metadata.title,
            artist: metadata.artist,
            album_artist: metadata.album_artist,
            album: metadata.album,
            composer: metadata.composer,
            year: metadata.year,
            track_number: metadata.track_number,
            disc_number: metadata.disc_number,
            genre: metadata.genre,
            duration: metadata.duration,
            bitrate: metadata.bitrate,
            sample_rate: metadata.sample_rate,
            cover_image: metadata.cover_image,
            ..TrackPatch::default()
        }
    }
}

/// Source of per-file metadata for the importer.
pub trait MetadataExtractor: Send + Sync {
    /// Extracts whatever metadata `path` carries. Never fails.
    fn extract(&self, path: &Path) -> TrackMetadata;
}

/// `lofty`-backed tag reader.
///
/// # Examples
///
/// ```no_run
/// use tunedeck::audio::metadata::{MetadataExtractor, TagReader};
///
/// let metadata = TagReader.extract("/path/to/song.flac".as_ref());
/// println!("Title: {:?}", metadata.title);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TagReader;

impl TagReader {
    /// Reads tags and audio properties from an audio file.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError` if the file cannot be opened or its container
    /// is not recognised as valid.
    pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<TrackMetadata, MetadataError> {
        let path = path.as_ref();
        let tagged_file = Probe::open(path)?.read()?;
        let properties = tagged_file.properties();

        let mut metadata = TrackMetadata {
            duration: Some(properties.duration().as_secs()),
            bitrate: properties.audio_bitrate(),
            sample_rate: properties.sample_rate(),
            ..TrackMetadata::default()
        };

        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            debug!("No tags found in {}", path.display());
            return Ok(metadata);
        };

        metadata.title = tag.title().map(|s| s.to_string());
        metadata.artist = tag.artist().map(|s| s.to_string());
        metadata.album = tag.album().map(|s| s.to_string());
        metadata.album_artist = tag.get_string(&AlbumArtist).map(str::to_string);
        metadata.composer = tag.get_string(&Composer).map(str::to_string);
        metadata.year = tag.year();
        metadata.track_number = tag.track();
        metadata.disc_number = tag.disk();
        metadata.genre = tag.genre().map(|s| s.to_string());

        metadata.cover_image = first_picture(tag, tagged_file.tags()).map(picture_to_data_uri);

        Ok(metadata)
    }
}

/// First embedded picture, preferring `tag` over the file's other tags.
fn first_picture<'a>(tag: &'a Tag, tags: &'a [Tag]) -> Option<&'a Picture> {
    tag.pictures()
        .first()
        .or_else(|| tags.iter().flat_map(|other| other.pictures()).next())
}

impl MetadataExtractor for TagReader {
    fn extract(&self, path: &Path) -> TrackMetadata {
        match Self::read_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to read metadata from {}: {}", path.display(), e);
                TrackMetadata::default()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs::write;

    use {
        lofty::{
            picture::Picture,
            tag::{Tag, TagType},
        },
        tempfile::TempDir,
    };

    use crate::audio::metadata::{MetadataExtractor, TagReader, TrackMetadata, first_picture};

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    /// Builds a minimal PCM WAV file with `frames` silent mono 16-bit samples.
    pub(crate) fn silent_wav(sample_rate: u32, frames: u32) -> Vec<u8> {
        let data_len = frames * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);
        bytes
    }

    #[test]
    fn test_unreadable_file_yields_empty_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("garbage.flac");
        write(&path, b"definitely not audio").unwrap();

        assert!(TagReader::read_metadata(&path).is_err());
        assert!(TagReader.extract(&path).is_empty());
    }

    #[test]
    fn test_cover_falls_back_to_other_tags() {
        let primary = Tag::new(TagType::Id3v2);
        let mut secondary = Tag::new(TagType::Ape);
        secondary.push_picture(Picture::from_reader(&mut &PNG_HEADER[..]).unwrap());
        let tags = vec![primary.clone(), secondary];

        let picture = first_picture(&primary, &tags).unwrap();
        assert_eq!(picture.data(), PNG_HEADER);

        assert!(first_picture(&primary, std::slice::from_ref(&primary)).is_none());
    }

    #[test]
    fn test_cover_prefers_the_chosen_tag() {
        let mut primary = Tag::new(TagType::Id3v2);
        primary.push_picture(Picture::from_reader(&mut &PNG_HEADER[..]).unwrap());
        let mut secondary = Tag::new(TagType::Ape);
        secondary.push_picture(Picture::from_reader(&mut &b"GIF89a-other"[..]).unwrap());
        let tags = vec![secondary, primary.clone()];

        assert_eq!(first_picture(&primary, &tags).unwrap().data(), PNG_HEADER);
    }

    #[test]
    fn test_missing_file_yields_empty_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let metadata = TagReader.extract(&temp_dir.path().join("absent.flac"));
        assert_eq!(metadata, TrackMetadata::default());
    }

    #[test]
    fn test_untagged_wav_has_properties_but_no_tags() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tone.wav");
        write(&path, silent_wav(8000, 16000)).unwrap();

        let metadata = TagReader.extract(&path);

        assert_eq!(metadata.title, None);
        assert_eq!(metadata.artist, None);
        assert_eq!(metadata.album, None);
        assert_eq!(metadata.genre, None);
        assert_eq!(metadata.cover_image, None);
        assert_eq!(metadata.sample_rate, Some(8000));
        assert_eq!(metadata.duration, Some(2));
    }
}
