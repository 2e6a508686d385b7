//! Scriptable fakes for the bridge traits.
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for downstream crates.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioData, AudioOutput, AudioProbe, BridgeError, HttpClient, HttpRequest, HttpResponse,
    OutputEvent, OutputListener, StreamInfo,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Duration reported for attached audio unless overridden.
pub const FAKE_TRACK_DURATION: Duration = Duration::from_secs(120);

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: String,
    body: Bytes,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    transport_error: bool,
}

impl Route {
    fn new(status: u16, content_type: &str, body: Bytes) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body,
            delay: None,
            gate: None,
            transport_error: false,
        }
    }
}

/// In-memory HTTP server keyed by full URL (query included).
///
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeHttpClient {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with a small `audio/mpeg` body.
    pub fn serve_audio(&self, url: &str) {
        let body = Bytes::from(format!("ID3fake-audio:{}", url));
        self.routes
            .lock()
            .insert(url.to_string(), Route::new(200, "audio/mpeg", body));
    }

    pub fn serve(&self, url: &str, status: u16, content_type: &str, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .insert(url.to_string(), Route::new(status, content_type, body.into()));
    }

    pub fn serve_status(&self, url: &str, status: u16) {
        self.serve(url, status, "text/plain", Bytes::from_static(b"error"));
    }

    /// Fail `url` with a transport error instead of a response.
    pub fn fail_transport(&self, url: &str) {
        let mut routes = self.routes.lock();
        let route = routes
            .entry(url.to_string())
            .or_insert_with(|| Route::new(200, "audio/mpeg", Bytes::new()));
        route.transport_error = true;
    }

    /// Delay the answer for `url`. Uses Tokio time, so paused clocks apply.
    pub fn delay(&self, url: &str, delay: Duration) {
        if let Some(route) = self.routes.lock().get_mut(url) {
            route.delay = Some(delay);
        }
    }

    /// Hold requests for `url` until [`open`](Self::open) is called.
    pub fn gate(&self, url: &str) {
        if let Some(route) = self.routes.lock().get_mut(url) {
            route.gate = Some(Arc::new(Semaphore::new(0)));
        }
    }

    /// Release every request held for `url`, now and later.
    pub fn open(&self, url: &str) {
        if let Some(route) = self.routes.lock().get_mut(url) {
            if let Some(gate) = route.gate.take() {
                gate.close();
            }
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = request.full_url();
        self.requests.lock().push(url.clone());
        let route = self.routes.lock().get(&url).cloned();

        let Some(route) = route else {
            return Ok(HttpResponse {
                status: 404,
                headers: HashMap::new(),
                body: Bytes::new(),
            });
        };

        if let Some(gate) = &route.gate {
            // Closed means open.
            let _ = gate.acquire().await;
        }
        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }
        if route.transport_error {
            return Err(BridgeError::OperationFailed(format!(
                "connection reset: {}",
                url
            )));
        }

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), route.content_type);
        Ok(HttpResponse {
            status: route.status,
            headers,
            body: route.body,
        })
    }
}

struct OutputState {
    attached: Option<AudioData>,
    paused: bool,
    position: Duration,
    duration: Option<Duration>,
    volume: f32,
    attach_count: usize,
    play_count: usize,
    track_duration: Option<Duration>,
    fail_attach: Option<String>,
    block_play: bool,
    attach_delay: Option<Duration>,
}

impl Default for OutputState {
    fn default() -> Self {
        Self {
            attached: None,
            paused: true,
            position: Duration::ZERO,
            duration: None,
            volume: 1.0,
            attach_count: 0,
            play_count: 0,
            track_duration: Some(FAKE_TRACK_DURATION),
            fail_attach: None,
            block_play: false,
            attach_delay: None,
        }
    }
}

/// A single-channel output that plays nothing and reports what it was told.
///
/// Honors the [`AudioOutput`] event contract: events describe the attached
/// buffer and none are sent after `detach`.
#[derive(Default)]
pub struct FakeAudioOutput {
    state: Mutex<OutputState>,
    listener: Mutex<Option<Arc<dyn OutputListener>>>,
}

impl FakeAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&self, event: OutputEvent) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_event(event);
        }
    }

    /// Play the attached buffer to its end and report `Ended`.
    pub fn finish_track(&self) {
        let attached = {
            let mut state = self.state.lock();
            if state.attached.is_some() {
                state.paused = true;
                state.position = state.duration.unwrap_or(state.position);
                true
            } else {
                false
            }
        };
        if attached {
            self.emit(OutputEvent::Ended);
        }
    }

    /// Report a failure on the attached buffer.
    pub fn fail_playback(&self, message: &str) {
        if self.state.lock().attached.is_some() {
            self.emit(OutputEvent::Error {
                message: message.to_string(),
            });
        }
    }

    pub fn set_position(&self, position: Duration) {
        let mut state = self.state.lock();
        if state.attached.is_some() {
            state.position = position;
        }
        drop(state);
        self.emit(OutputEvent::TimeUpdate { position });
    }

    /// Duration reported for subsequent attaches. `None` means unknown.
    pub fn set_track_duration(&self, duration: Option<Duration>) {
        self.state.lock().track_duration = duration;
    }

    pub fn fail_next_attach(&self, message: &str) {
        self.state.lock().fail_attach = Some(message.to_string());
    }

    /// Refuse the next `play` as if no user gesture were present.
    pub fn block_next_play(&self) {
        self.state.lock().block_play = true;
    }

    pub fn set_attach_delay(&self, delay: Duration) {
        self.state.lock().attach_delay = Some(delay);
    }

    pub fn attach_count(&self) -> usize {
        self.state.lock().attach_count
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().play_count
    }

    /// Bytes of the attached buffer, as text.
    pub fn attached_body(&self) -> Option<String> {
        self.state
            .lock()
            .attached
            .as_ref()
            .map(|data| String::from_utf8_lossy(&data.bytes).into_owned())
    }
}

#[async_trait]
impl AudioOutput for FakeAudioOutput {
    fn set_listener(&self, listener: Arc<dyn OutputListener>) {
        *self.listener.lock() = Some(listener);
    }

    async fn attach(&self, data: AudioData) -> BridgeResult<StreamInfo> {
        let delay = {
            let mut state = self.state.lock();
            state.attach_count += 1;
            state.attach_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let duration = {
            let mut state = self.state.lock();
            if let Some(message) = state.fail_attach.take() {
                state.attached = None;
                return Err(BridgeError::Undecodable(message));
            }
            state.attached = Some(data);
            state.paused = true;
            state.position = Duration::ZERO;
            state.duration = state.track_duration;
            state.duration
        };

        self.emit(OutputEvent::MetadataLoaded { duration });
        Ok(StreamInfo::default().with_duration(duration))
    }

    async fn play(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if state.attached.is_none() {
            return Err(BridgeError::OperationFailed("nothing attached".to_string()));
        }
        if state.block_play {
            state.block_play = false;
            return Err(BridgeError::PlaybackBlocked(
                "user gesture required".to_string(),
            ));
        }
        state.paused = false;
        state.play_count += 1;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().paused = true;
    }

    fn detach(&self) {
        let mut state = self.state.lock();
        state.attached = None;
        state.paused = true;
        state.position = Duration::ZERO;
        state.duration = None;
    }

    fn seek(&self, position: Duration) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if state.attached.is_none() {
            return Err(BridgeError::OperationFailed("nothing attached".to_string()));
        }
        state.position = position;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.state.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        self.state.lock().duration
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn has_source(&self) -> bool {
        self.state.lock().attached.is_some()
    }
}

/// Probe that accepts everything unless told otherwise.
#[derive(Default)]
pub struct FakeProbe {
    reject: Mutex<bool>,
    probes: Mutex<usize>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_all(&self) {
        *self.reject.lock() = true;
    }

    pub fn probe_count(&self) -> usize {
        *self.probes.lock()
    }
}

#[async_trait]
impl AudioProbe for FakeProbe {
    async fn probe(&self, data: AudioData) -> BridgeResult<StreamInfo> {
        *self.probes.lock() += 1;
        if *self.reject.lock() {
            return Err(BridgeError::Undecodable(format!(
                "rejected {} bytes",
                data.len()
            )));
        }
        Ok(StreamInfo::default().with_duration(Some(FAKE_TRACK_DURATION)))
    }
}
