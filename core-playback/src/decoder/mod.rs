//! # Audio Decoder Module
//!
//! Symphonia-backed decode-readiness checks.
//!
//! The playback channel decodes for itself; this module only answers "would
//! this buffer play?" for buffers that are not attached yet, which is what
//! [`PreloadCache`](crate::preload::PreloadCache) needs before it marks an
//! entry ready.
//!
//! ## Supported Formats
//!
//! Everything enabled by Symphonia's `all` feature: MP3, AAC/M4A, FLAC,
//! Vorbis, WAV, ALAC.

mod format_detector;
mod symphonia;

pub use self::symphonia::SymphoniaProbe;
pub use format_detector::FormatDetector;
