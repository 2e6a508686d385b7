//! # Core Configuration Module
//!
//! Builder-based configuration holding the host bridges the player needs.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - fetches episode JSON and audio bytes
//! - `AudioOutput` - the narration playback channel
//!
//! ## Optional Dependencies
//!
//! - `AudioProbe` - decode-readiness check used by preloading (the service
//!   falls back to the Symphonia probe)
//! - `AudioOutput` for background music - a second channel that never carries
//!   narration
//! - `LoggerSink` - forwards logs to the host
//!
//! When the `desktop-shims` feature is enabled, the HTTP client and the
//! narration output default to the `bridge-desktop` implementations.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com/api")
//!     .media_origin("https://news.example.com")
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioOutput, AudioProbe, HttpClient, LoggerSink};
use std::sync::Arc;

/// Default episode API location, matching the development backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3003/api";

/// Background music path, resolved against `media_origin`.
pub const DEFAULT_BACKGROUND_TRACK: &str = "/audio/bgm/background.mp3";

/// Core configuration for the episode player.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the episode JSON API (no trailing slash)
    pub api_base_url: String,

    /// Origin used to resolve relative audio paths such as `/audio/a1.mp3`
    pub media_origin: Option<String>,

    /// HTTP client for episode JSON and audio bytes
    pub http_client: Arc<dyn HttpClient>,

    /// Narration playback channel
    pub audio_output: Arc<dyn AudioOutput>,

    /// Decode-readiness probe for preloading
    pub audio_probe: Option<Arc<dyn AudioProbe>>,

    /// Separate channel for background music
    pub background_output: Option<Arc<dyn AudioOutput>>,

    /// Background music URL or path
    pub background_track: String,

    /// Host log forwarding
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Event bus capacity; `0` disables the bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("media_origin", &self.media_origin)
            .field("http_client", &"HttpClient { ... }")
            .field("audio_output", &"AudioOutput { ... }")
            .field(
                "audio_probe",
                &self.audio_probe.as_ref().map(|_| "AudioProbe { ... }"),
            )
            .field(
                "background_output",
                &self
                    .background_output
                    .as_ref()
                    .map(|_| "AudioOutput { ... }"),
            )
            .field("background_track", &self.background_track)
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        validate_http_url("api_base_url", &self.api_base_url)?;

        if let Some(origin) = &self.media_origin {
            validate_http_url("media_origin", origin)?;
        }

        if self.event_buffer_size > 10_000 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 10,000 events".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns `true` when an event bus should be created.
    pub fn events_enabled(&self) -> bool {
        self.event_buffer_size > 0
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Config(format!("{} cannot be empty", field)));
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{} must be an absolute http(s) URL, got '{}'",
            field, value
        )));
    }
    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Other hosts: inject a platform-native adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn audio_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: "No audio output implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use RodioAudioOutput. \
                 Other hosts: inject the platform media element adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::try_new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: format!("Failed to create default ReqwestHttpClient: {}", e),
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutput>> {
    use bridge_desktop::RodioAudioOutput;

    let output = RodioAudioOutput::open_default().map_err(|e| Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: format!("Failed to open default audio device: {}", e),
    })?;
    Ok(Arc::new(output))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutput>> {
    Err(audio_output_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    media_origin: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    audio_probe: Option<Arc<dyn AudioProbe>>,
    background_output: Option<Arc<dyn AudioOutput>>,
    background_track: Option<String>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the episode API base URL. A trailing slash is removed.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Sets the origin used to resolve relative audio paths.
    pub fn media_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        self.media_origin = Some(origin.trim_end_matches('/').to_string());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    pub fn audio_probe(mut self, probe: Arc<dyn AudioProbe>) -> Self {
        self.audio_probe = Some(probe);
        self
    }

    pub fn background_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.background_output = Some(output);
        self
    }

    /// Overrides [`DEFAULT_BACKGROUND_TRACK`].
    pub fn background_track(mut self, url: impl Into<String>) -> Self {
        self.background_track = Some(url.into());
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the event bus capacity. `0` disables the bus.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when a required bridge is absent and
    /// no platform default is available, or [`Error::Config`] when validation
    /// fails.
    pub fn build(self) -> Result<CoreConfig> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let audio_output = match self.audio_output {
            Some(output) => output,
            None => provide_default_audio_output()?,
        };

        let config = CoreConfig {
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            media_origin: self.media_origin,
            http_client,
            audio_output,
            audio_probe: self.audio_probe,
            background_output: self.background_output,
            background_track: self
                .background_track
                .unwrap_or_else(|| DEFAULT_BACKGROUND_TRACK.to_string()),
            logger_sink: self.logger_sink,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{AudioData, HttpRequest, HttpResponse, OutputListener, StreamInfo};
    use std::time::Duration;

    struct NullHttp;

    #[async_trait]
    impl HttpClient for NullHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable("offline".to_string()))
        }
    }

    struct NullOutput;

    #[async_trait]
    impl AudioOutput for NullOutput {
        fn set_listener(&self, _listener: Arc<dyn OutputListener>) {}
        async fn attach(&self, _data: AudioData) -> BridgeResult<StreamInfo> {
            Ok(StreamInfo::default())
        }
        async fn play(&self) -> BridgeResult<()> {
            Ok(())
        }
        fn pause(&self) {}
        fn detach(&self) {}
        fn seek(&self, _position: Duration) -> BridgeResult<()> {
            Ok(())
        }
        fn position(&self) -> Duration {
            Duration::ZERO
        }
        fn duration(&self) -> Option<Duration> {
            None
        }
        fn set_volume(&self, _volume: f32) {}
        fn volume(&self) -> f32 {
            1.0
        }
        fn is_paused(&self) -> bool {
            true
        }
        fn has_source(&self) -> bool {
            false
        }
    }

    fn builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(NullHttp))
            .audio_output(Arc::new(NullOutput))
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder().build().expect("config should build");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.events_enabled());
        assert!(config.audio_probe.is_none());
        assert!(config.media_origin.is_none());
        assert_eq!(config.background_track, DEFAULT_BACKGROUND_TRACK);
    }

    #[test]
    fn test_trailing_slashes_trimmed() {
        let config = builder()
            .api_base_url("https://api.example.com/api/")
            .media_origin("https://news.example.com/")
            .build()
            .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/api");
        assert_eq!(config.media_origin.as_deref(), Some("https://news.example.com"));
    }

    #[test]
    fn test_relative_api_url_rejected() {
        let err = builder().api_base_url("/api").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_event_bus_can_be_disabled() {
        let config = builder().event_buffer_size(0).build().unwrap();
        assert!(!config.events_enabled());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_fails_fast() {
        let err = CoreConfig::builder()
            .audio_output(Arc::new(NullOutput))
            .build()
            .unwrap_err();
        match err {
            Error::CapabilityMissing { capability, .. } => assert_eq!(capability, "HttpClient"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("HttpClient { ... }"));
        assert!(rendered.contains("api_base_url"));
    }
}
