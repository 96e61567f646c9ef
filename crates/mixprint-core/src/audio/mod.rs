//! Audio decoding and resampling
//!
//! The decoder boundary: file in, mono samples at a caller-chosen rate
//! out. Container transcoding and anything video-shaped is out of scope;
//! only pure audio formats are handled here.

mod decoder;
mod resample;

pub use decoder::{decode_audio, decode_audio_with_timeout, AudioData};
pub use resample::resample_to_target;

use std::path::Path;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != AudioFormat::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(AudioFormat::from_path(Path::new("a.WAV")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("b.Mp3")), AudioFormat::Mp3);
        assert_eq!(
            AudioFormat::from_path(Path::new("c.flac")),
            AudioFormat::Flac
        );
        assert_eq!(AudioFormat::from_path(Path::new("d.ogg")), AudioFormat::Ogg);
        assert_eq!(
            AudioFormat::from_path(Path::new("e.mp4")),
            AudioFormat::Unknown
        );
    }
}
