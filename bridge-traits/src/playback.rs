//! Playback bridge traits and supporting audio types.
//!
//! The host owns exactly one hardware playback channel. [`AudioOutput`] is the
//! contract for that channel: it accepts one fully materialized buffer at a
//! time, plays it, and reports progress through a single [`OutputListener`].
//! [`AudioProbe`] checks that a buffer is decodable without touching the
//! channel, which is what preloading needs.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Encoded audio bytes plus an optional container hint (file extension).
#[derive(Debug, Clone)]
pub struct AudioData {
    pub bytes: Bytes,
    pub extension_hint: Option<String>,
}

impl AudioData {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            extension_hint: None,
        }
    }

    /// Derive the extension hint from the last path segment of `url`,
    /// ignoring any query string or fragment.
    pub fn with_hint_from_url(mut self, url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let segment = path.rsplit('/').next().unwrap_or(path);
        self.extension_hint = segment
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 5);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the decoder learned about a stream before playback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    /// Total duration, when the container reports it.
    pub duration: Option<Duration>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// Short codec name, e.g. `mp3`.
    pub codec: Option<String>,
}

impl StreamInfo {
    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }
}

/// Notifications emitted by an [`AudioOutput`] about the attached buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// Duration became known (or changed) for the attached buffer.
    MetadataLoaded { duration: Option<Duration> },
    /// Periodic position report while playing.
    TimeUpdate { position: Duration },
    /// The attached buffer played to its end.
    Ended,
    /// The channel failed while playing the attached buffer.
    Error { message: String },
}

/// Receiver for [`OutputEvent`]s. Implementations must not block.
pub trait OutputListener: Send + Sync {
    fn on_event(&self, event: OutputEvent);
}

/// The single hardware playback channel.
///
/// Event contract: events describe the currently attached buffer only and are
/// delivered after the state change they report. Once [`detach`](Self::detach)
/// returns, no event about the detached buffer may be delivered.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Install the listener. A second call replaces the first.
    fn set_listener(&self, listener: Arc<dyn OutputListener>);

    /// Attach `data`, replacing whatever was attached, and leave the channel
    /// paused at position zero. Resolves once the data is decodable.
    async fn attach(&self, data: AudioData) -> Result<StreamInfo>;

    /// Start or continue audible playback of the attached buffer.
    ///
    /// Returns [`BridgeError::PlaybackBlocked`](crate::BridgeError::PlaybackBlocked)
    /// when host policy requires a user gesture.
    async fn play(&self) -> Result<()>;

    /// Pause without losing position. No-op when already paused.
    fn pause(&self);

    /// Stop playback and drop the attached buffer.
    fn detach(&self);

    /// Move the playhead of the attached buffer.
    fn seek(&self, position: Duration) -> Result<()>;

    fn position(&self) -> Duration;

    fn duration(&self) -> Option<Duration>;

    /// Volume in `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    fn is_paused(&self) -> bool;

    fn has_source(&self) -> bool;
}

/// Decode-readiness check for a buffer that is not attached to any channel.
#[async_trait]
pub trait AudioProbe: Send + Sync {
    /// Succeeds once the buffer is known to be playable to its end.
    async fn probe(&self, data: AudioData) -> Result<StreamInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_hint_ignores_query_and_fragment() {
        let data = AudioData::new(Bytes::from_static(b"ID3"))
            .with_hint_from_url("https://cdn.example.com/audio/ja/a1.MP3?X-Amz-Signature=abc#t");
        assert_eq!(data.extension_hint.as_deref(), Some("mp3"));
    }

    #[test]
    fn extension_hint_absent_without_extension() {
        let data = AudioData::new(Bytes::new()).with_hint_from_url("https://cdn.example.com/stream");
        assert_eq!(data.extension_hint, None);
        assert!(data.is_empty());
    }

    #[test]
    fn stream_info_builder() {
        let info = StreamInfo::default().with_duration(Some(Duration::from_secs(90)));
        assert_eq!(info.duration, Some(Duration::from_secs(90)));
        assert_eq!(info.codec, None);
    }
}
