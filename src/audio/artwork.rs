//! Embedded artwork encoding.
//!
//! The catalog stores cover art inline as a `data:` URI so rendering a track
//! never needs a second file handle.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    lofty::picture::{
        MimeType::{self, Bmp, Gif, Jpeg, Png},
        Picture,
    },
};

/// MIME type used when neither the tag nor the bytes identify the image.
const FALLBACK_MIME: &str = "application/octet-stream";

/// Detects MIME type from binary data.
///
/// # Arguments
///
/// * `data` - Binary artwork data.
///
/// # Returns
///
/// An `Option<MimeType>` representing the detected MIME type.
#[must_use]
pub fn detect_mime_type(data: &[u8]) -> Option<MimeType> {
    match data {
        [0xFF, 0xD8, 0xFF, _, ..] => Some(Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Some(Png),
        [b'G', b'I', b'F', _, ..] => Some(Gif),
        [b'B', b'M', _, _, ..] => Some(Bmp),
        _ => None,
    }
}

/// Encodes image bytes as a `data:<mime>;base64,<payload>` URI.
#[must_use]
pub fn encode_data_uri(data: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

/// Converts an embedded picture into an inline data URI.
///
/// The MIME type declared by the tag wins; otherwise it is sniffed from the
/// image bytes.
#[must_use]
pub fn picture_to_data_uri(picture: &Picture) -> String {
    let declared = picture
        .mime_type()
        .filter(|mime| matches!(mime, Jpeg | Png | Gif | Bmp | MimeType::Tiff))
        .map(|mime| mime.as_str().to_string());

    let mime = declared
        .or_else(|| detect_mime_type(picture.data()).map(|mime| mime.as_str().to_string()))
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    encode_data_uri(picture.data(), &mime)
}

#[cfg(test)]
mod tests {
    use lofty::picture::MimeType::{Gif, Jpeg, Png};

    use crate::audio::artwork::{detect_mime_type, encode_data_uri};

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(Jpeg));
        assert_eq!(detect_mime_type(&[0x89, b'P', b'N', b'G', 0x0D]), Some(Png));
        assert_eq!(detect_mime_type(b"GIF89a"), Some(Gif));
        assert_eq!(detect_mime_type(&[0x00, 0x01, 0x02, 0x03]), None);
        assert_eq!(detect_mime_type(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn test_encode_data_uri() {
        assert_eq!(
            encode_data_uri(b"abc", "image/png"),
            "data:image/png;base64,YWJj"
        );
    }
}
