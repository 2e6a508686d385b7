//! # Format Detection
//!
//! Probe hints and codec naming for Symphonia.

use bridge_traits::AudioData;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Builds Symphonia probe hints from what we know about a buffer.
pub struct FormatDetector;

impl FormatDetector {
    /// Hint from the buffer's extension, if any. Without one the probe
    /// falls back to content sniffing.
    pub fn hint_for(data: &AudioData) -> Hint {
        match data.extension_hint.as_deref() {
            Some(extension) => Self::hint_from_extension(extension),
            None => {
                debug!("No extension hint, probe will auto-detect");
                Hint::new()
            }
        }
    }

    pub fn hint_from_extension(extension: &str) -> Hint {
        let mut hint = Hint::new();
        hint.with_extension(extension);
        hint
    }

    /// Hint from a `Content-Type` value such as `audio/mpeg; charset=binary`.
    pub fn hint_from_mime_type(mime_type: &str) -> Hint {
        let mut hint = Hint::new();
        let essence = mime_type.split(';').next().unwrap_or(mime_type).trim();
        hint.mime_type(essence);
        hint
    }

    /// Short codec name as registered with Symphonia, e.g. `mp3`.
    pub fn codec_name(codec: CodecType) -> Option<String> {
        symphonia::default::get_codecs()
            .get_codec(codec)
            .map(|descriptor| descriptor.short_name.to_string())
    }

    /// Canonical extension for a `Content-Type`, used when a URL carries none.
    pub fn extension_for_mime_type(mime_type: &str) -> Option<&'static str> {
        let essence = mime_type.split(';').next().unwrap_or(mime_type).trim();
        match essence.to_ascii_lowercase().as_str() {
            "audio/mpeg" | "audio/mp3" => Some("mp3"),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => Some("m4a"),
            "audio/flac" | "audio/x-flac" => Some("flac"),
            "audio/ogg" | "audio/vorbis" | "audio/opus" => Some("ogg"),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
            _ => None,
        }
    }
}
