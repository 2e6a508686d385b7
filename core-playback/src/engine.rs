//! # Audio Engine
//!
//! Sole owner of the hardware [`AudioOutput`]. Turns a URL into sound and
//! exposes a small control and event surface.
//!
//! ## Loading
//!
//! `play(url)` is split in two so callers can fix the order of competing
//! requests synchronously:
//!
//! 1. [`AudioEngine::request`] bumps the load generation, releases the buffer
//!    of a different URL and detaches the channel. It never suspends.
//! 2. [`AudioEngine::start`] obtains bytes (held buffer, preload cache, or
//!    network), attaches them and starts playback. Each suspension point
//!    re-checks the generation; a request that has been overtaken resolves to
//!    [`PlaybackError::Superseded`] without touching the channel.
//!
//! ## Events
//!
//! Handlers are single-slot: registering a second `on_ended` handler replaces
//! the first. Handlers run on whatever thread the output reports from and must
//! not block.

use crate::buffer::{BufferTracker, MaterializedBuffer};
use crate::config::EngineConfig;
use crate::error::{PlaybackError, Result};
use crate::fetch::{fetch_buffer, resolve_url};
use crate::preload::PreloadCache;
use bridge_traits::{AudioOutput, HttpClient, OutputEvent, OutputListener};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub type EndedHandler = Arc<dyn Fn() + Send + Sync>;
/// Receives the current position in seconds.
pub type TimeUpdateHandler = Arc<dyn Fn(f64) + Send + Sync>;
/// Receives the duration in seconds (`0.0` when unknown).
pub type MetadataHandler = Arc<dyn Fn(f64) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&PlaybackError) + Send + Sync>;

#[derive(Clone, Default)]
struct Handlers {
    ended: Option<EndedHandler>,
    time_update: Option<TimeUpdateHandler>,
    metadata: Option<MetadataHandler>,
    error: Option<ErrorHandler>,
}

#[derive(Default)]
struct EngineState {
    current_url: Option<String>,
    buffer: Option<MaterializedBuffer>,
    generation: u64,
}

/// A load issued by [`AudioEngine::request`], consumed by [`AudioEngine::start`].
#[derive(Debug)]
pub struct PlayTicket {
    url: String,
    generation: u64,
    held: Option<MaterializedBuffer>,
}

impl PlayTicket {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Forwards output notifications to the registered handlers.
struct EngineListener {
    handlers: Arc<Mutex<Handlers>>,
}

impl OutputListener for EngineListener {
    fn on_event(&self, event: OutputEvent) {
        let handlers = self.handlers.lock().clone();
        match event {
            OutputEvent::Ended => {
                if let Some(handler) = handlers.ended {
                    handler();
                }
            }
            OutputEvent::TimeUpdate { position } => {
                if let Some(handler) = handlers.time_update {
                    handler(finite_or_zero(position.as_secs_f64()));
                }
            }
            OutputEvent::MetadataLoaded { duration } => {
                if let Some(handler) = handlers.metadata {
                    handler(duration.map_or(0.0, |d| finite_or_zero(d.as_secs_f64())));
                }
            }
            OutputEvent::Error { message } => {
                warn!(error = %message, "Audio output reported an error");
                if let Some(handler) = handlers.error {
                    handler(&PlaybackError::Output(message));
                }
            }
        }
    }
}

pub struct AudioEngine {
    output: Arc<dyn AudioOutput>,
    http: Arc<dyn HttpClient>,
    preload: Option<Arc<PreloadCache>>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    tracker: BufferTracker,
    handlers: Arc<Mutex<Handlers>>,
    /// Serializes attach and start on the channel.
    channel: tokio::sync::Mutex<()>,
}

impl AudioEngine {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        http: Arc<dyn HttpClient>,
        config: EngineConfig,
    ) -> Self {
        let handlers = Arc::new(Mutex::new(Handlers::default()));
        output.set_listener(Arc::new(EngineListener {
            handlers: Arc::clone(&handlers),
        }));
        output.set_volume(config.initial_volume.clamp(0.0, 1.0));

        Self {
            output,
            http,
            preload: None,
            config,
            state: Mutex::new(EngineState::default()),
            tracker: BufferTracker::new(),
            handlers,
            channel: tokio::sync::Mutex::new(()),
        }
    }

    /// Use ready buffers from `cache` instead of fetching.
    pub fn with_preload(mut self, cache: Arc<PreloadCache>) -> Self {
        self.preload = Some(cache);
        self
    }

    /// Fetch if needed, attach and start `url` from position zero.
    pub async fn play(&self, url: &str) -> Result<()> {
        let ticket = self.request(url);
        self.start(ticket).await
    }

    /// Supersede whatever is loading or playing and reserve the channel for
    /// `url`.
    ///
    /// The buffer is kept only when `url` is already the loaded URL.
    pub fn request(&self, url: &str) -> PlayTicket {
        let url = resolve_url(self.config.origin.as_deref(), url);
        let (ticket, released) = {
            let mut state = self.state.lock();
            state.generation += 1;

            let same = state.current_url.as_deref() == Some(url.as_str());
            let released = if same { None } else { state.buffer.take() };
            state.current_url = Some(url.clone());

            let ticket = PlayTicket {
                url,
                generation: state.generation,
                held: state.buffer.clone(),
            };
            (ticket, released)
        };

        if ticket.held.is_none() {
            self.output.detach();
        }
        drop(released);
        ticket
    }

    /// Run a ticket to audible playback.
    ///
    /// Fetch plus attach are bounded by `ready_timeout`. A refused start maps
    /// to [`PlaybackError::AutoplayRejected`].
    #[instrument(skip(self, ticket), fields(url = %redact_url(&ticket.url)))]
    pub async fn start(&self, ticket: PlayTicket) -> Result<()> {
        let generation = ticket.generation;
        let result = self.load_and_start(ticket).await;

        if let Err(err) = &result {
            // A refused start leaves the buffer attached so a later resume
            // can pick it up.
            let keep = err.is_superseded() || matches!(err, PlaybackError::AutoplayRejected(_));
            if !keep {
                let mut state = self.state.lock();
                if state.generation == generation {
                    state.current_url = None;
                    state.buffer = None;
                    self.output.detach();
                }
            }
            self.report(err);
        }
        result
    }

    async fn load_and_start(&self, ticket: PlayTicket) -> Result<()> {
        let PlayTicket {
            url,
            generation,
            held,
        } = ticket;

        // Same URL, still attached: rewind.
        if held.is_some() {
            let _channel = self.channel.lock().await;
            self.ensure_current(generation)?;
            if self.output.has_source() {
                self.output.seek(Duration::ZERO)?;
                self.output.play().await?;
                self.ensure_current(generation)?;
                debug!("Restarted loaded audio");
                return Ok(());
            }
        }

        let ready_timeout = self.config.ready_timeout;
        let buffer = match held {
            Some(buffer) => buffer,
            None => match self.preload.as_ref().and_then(|cache| cache.get(&url)) {
                Some(buffer) => {
                    debug!("Using preloaded buffer");
                    buffer
                }
                None => tokio::time::timeout(
                    ready_timeout,
                    fetch_buffer(self.http.as_ref(), &url, &self.tracker),
                )
                .await
                .map_err(|_| PlaybackError::Timeout(ready_timeout))??,
            },
        };

        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return Err(PlaybackError::Superseded);
            }
            state.buffer = Some(buffer.clone());
        }

        let _channel = self.channel.lock().await;
        self.ensure_current(generation)?;

        let attached =
            tokio::time::timeout(ready_timeout, self.output.attach(buffer.audio_data())).await;

        // A request issued while attaching owns the channel now, whatever the
        // attach outcome.
        if let Err(err) = self.ensure_current(generation) {
            self.output.detach();
            return Err(err);
        }

        let info = attached
            .map_err(|_| PlaybackError::Timeout(ready_timeout))?
            .map_err(|e| match PlaybackError::from(e) {
                PlaybackError::Output(msg) => PlaybackError::Decode(msg),
                other => other,
            })?;

        self.output.play().await?;
        self.ensure_current(generation)?;

        info!(duration = ?info.duration, "Playback started");
        Ok(())
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.state.lock().generation == generation {
            Ok(())
        } else {
            Err(PlaybackError::Superseded)
        }
    }

    fn report(&self, err: &PlaybackError) {
        match err {
            PlaybackError::Superseded => debug!("Load superseded"),
            PlaybackError::AutoplayRejected(reason) => {
                debug!(reason = %reason, "Playback start refused by host")
            }
            other => {
                warn!(error = %other, "Playback failed");
                let handler = self.handlers.lock().error.clone();
                if let Some(handler) = handler {
                    handler(other);
                }
            }
        }
    }

    /// Pause without losing position. No-op when already paused.
    pub fn pause(&self) {
        if self.output.has_source() && !self.output.is_paused() {
            self.output.pause();
            debug!("Paused");
        }
    }

    /// Continue the loaded audio from its current position.
    pub async fn resume(&self) -> Result<()> {
        let generation = self.state.lock().generation;
        if !self.output.has_source() {
            return Err(PlaybackError::NoSourceLoaded);
        }

        let result = self.resume_current(generation).await;
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    async fn resume_current(&self, generation: u64) -> Result<()> {
        let _channel = self.channel.lock().await;
        self.ensure_current(generation)?;
        self.output.play().await?;
        self.ensure_current(generation)
    }

    /// Silence the channel, rewind, detach and release the held buffer.
    /// Any load in flight resolves to `Superseded`.
    pub fn stop(&self) {
        let released = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.current_url = None;
            state.buffer.take()
        };
        self.output.pause();
        self.output.detach();
        if released.is_some() {
            debug!("Released decode buffer");
        }
    }

    /// Move the playhead. Out of range or unknown duration is a no-op.
    ///
    /// Returns `true` when the seek was applied.
    pub fn seek(&self, seconds: f64) -> bool {
        let duration = self.duration();
        if !seconds.is_finite() || seconds < 0.0 || duration <= 0.0 || seconds > duration {
            debug!(seconds, duration, "Ignoring seek");
            return false;
        }
        match self.output.seek(Duration::from_secs_f64(seconds)) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Seek failed");
                false
            }
        }
    }

    /// Clamped into `[0, 1]`. Non-finite input is ignored.
    pub fn set_volume(&self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        self.output.set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn volume(&self) -> f32 {
        self.output.volume()
    }

    /// Seconds, never NaN or infinite.
    pub fn current_time(&self) -> f64 {
        if !self.output.has_source() {
            return 0.0;
        }
        finite_or_zero(self.output.position().as_secs_f64())
    }

    /// Seconds; `0.0` until metadata is known.
    pub fn duration(&self) -> f64 {
        if !self.output.has_source() {
            return 0.0;
        }
        self.output
            .duration()
            .map_or(0.0, |d| finite_or_zero(d.as_secs_f64()))
    }

    /// Hardware truth: a source is attached and not paused.
    pub fn is_playing(&self) -> bool {
        self.output.has_source() && !self.output.is_paused()
    }

    pub fn has_source(&self) -> bool {
        self.output.has_source()
    }

    pub fn current_url(&self) -> Option<String> {
        self.state.lock().current_url.clone()
    }

    /// Buffers fetched by the engine that are still alive.
    pub fn outstanding_buffers(&self) -> usize {
        self.tracker.outstanding()
    }

    pub fn on_ended(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.handlers.lock().ended = Some(Arc::new(handler));
    }

    pub fn on_time_update(&self, handler: impl Fn(f64) + Send + Sync + 'static) {
        self.handlers.lock().time_update = Some(Arc::new(handler));
    }

    pub fn on_metadata_loaded(&self, handler: impl Fn(f64) + Send + Sync + 'static) {
        self.handlers.lock().metadata = Some(Arc::new(handler));
    }

    pub fn on_error(&self, handler: impl Fn(&PlaybackError) + Send + Sync + 'static) {
        self.handlers.lock().error = Some(Arc::new(handler));
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AudioEngine")
            .field("current_url", &state.current_url.as_deref().map(redact_url))
            .field("generation", &state.generation)
            .field("holds_buffer", &state.buffer.is_some())
            .finish()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        0.0
    }
}
