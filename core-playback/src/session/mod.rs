//! # Playback Session
//!
//! The single writer over [`AudioEngine`]. Presentation code expresses
//! intents (`play`, `pause`, `next`, `switch_language`, ...) and observes the
//! resulting [`PlaybackSessionState`] through [`PlaybackSession::subscribe`].
//!
//! ## Ordering
//!
//! Every transition that issues a new engine load bumps the session token
//! while holding the state lock, and calls the engine's synchronous
//! `request`/`stop` under the same lock. Engine order therefore matches token
//! order. Continuations (start results, end-of-track, output errors) carry the
//! token they were issued under and are dropped when it is no longer current.
//!
//! Engine notifications are funneled through a channel into one driver task,
//! so they are handled in arrival order and never re-enter a transition.
//! Handlers read the token without taking the state lock; outputs may call
//! them while holding locks of their own.
//!
//! ## Failures
//!
//! Intents never return errors. A failed start leaves the session in place
//! with `phase != Playing` and, for user-facing failures, `last_error` set.

mod state;

pub use state::{PlaybackPhase, PlaybackProgress, PlaybackSessionState, SessionKind, SessionSources};

use crate::config::SessionConfig;
use crate::engine::{AudioEngine, PlayTicket};
use crate::error::{PlaybackError, PlaybackFailure, Result};
use crate::types::{Language, PlaybackTarget, TracksByLanguage, UrlsByLanguage};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// Called with the new snapshot after every state change.
pub type StateListener = Arc<dyn Fn(&PlaybackSessionState) + Send + Sync>;
pub type ProgressHandler = Arc<dyn Fn(PlaybackProgress) + Send + Sync>;

/// Handle returned by [`PlaybackSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

enum EngineSignal {
    Progress(f64),
    Ended,
    Failed(PlaybackError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartMode {
    /// New track from zero. Failure leaves the session idle.
    Fresh,
    /// Continuation of a paused session. Failure leaves it paused.
    Resume,
}

/// A load issued under the lock, to be awaited outside it.
struct PendingStart {
    token: u64,
    ticket: PlayTicket,
    mode: StartMode,
}

enum Begin {
    Skip,
    Resume,
    Start(PendingStart, Snapshot),
}

/// A state copy taken under the lock, numbered in transition order.
struct Snapshot {
    revision: u64,
    state: PlaybackSessionState,
}

struct SessionCore {
    state: PlaybackSessionState,
    /// Seconds to seek to once the next start succeeds.
    pending_offset: Option<f64>,
}

pub struct PlaybackSession {
    engine: Arc<AudioEngine>,
    config: SessionConfig,
    core: Mutex<SessionCore>,
    /// Written only while `core` is held.
    token: AtomicU64,
    /// Written only while `core` is held.
    revision: AtomicU64,
    /// Held while listeners run. Reentrant so a listener may issue intents.
    delivery: ReentrantMutex<()>,
    listeners: Mutex<Vec<(ListenerId, StateListener)>>,
    next_listener: AtomicU64,
    progress: Mutex<Option<ProgressHandler>>,
    events: Option<EventBus>,
    signals: mpsc::UnboundedSender<(u64, EngineSignal)>,
}

impl PlaybackSession {
    /// Create the session and take over the engine's event handlers.
    ///
    /// Must be called inside a Tokio runtime; the engine notification driver
    /// runs as a task on it.
    pub fn new(engine: Arc<AudioEngine>, config: SessionConfig) -> Result<Arc<Self>> {
        Self::build(engine, config, None)
    }

    /// Like [`new`](Self::new), also publishing [`PlaybackEvent`]s on `events`.
    pub fn with_event_bus(
        engine: Arc<AudioEngine>,
        config: SessionConfig,
        events: EventBus,
    ) -> Result<Arc<Self>> {
        Self::build(engine, config, Some(events))
    }

    fn build(
        engine: Arc<AudioEngine>,
        config: SessionConfig,
        events: Option<EventBus>,
    ) -> Result<Arc<Self>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            PlaybackError::Internal("PlaybackSession requires a Tokio runtime".to_string())
        })?;

        let (signals, receiver) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            engine,
            core: Mutex::new(SessionCore {
                state: PlaybackSessionState::idle(config.default_language),
                pending_offset: None,
            }),
            token: AtomicU64::new(0),
            revision: AtomicU64::new(0),
            delivery: ReentrantMutex::new(()),
            config,
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            progress: Mutex::new(None),
            events,
            signals,
        });

        session.register_engine_handlers();
        runtime.spawn(Self::drive(Arc::downgrade(&session), receiver));
        debug!("Playback session created");
        Ok(session)
    }

    fn register_engine_handlers(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.engine.on_ended(move || {
            if let Some(session) = weak.upgrade() {
                session.signal(EngineSignal::Ended);
            }
        });

        let weak = Arc::downgrade(self);
        self.engine.on_error(move |err| {
            if let Some(session) = weak.upgrade() {
                session.signal(EngineSignal::Failed(err.clone()));
            }
        });

        let weak = Arc::downgrade(self);
        self.engine.on_time_update(move |position| {
            if let Some(session) = weak.upgrade() {
                session.signal(EngineSignal::Progress(position));
            }
        });

        let weak = Arc::downgrade(self);
        self.engine.on_metadata_loaded(move |_duration| {
            if let Some(session) = weak.upgrade() {
                let position = session.engine.current_time();
                session.signal(EngineSignal::Progress(position));
            }
        });
    }

    fn signal(&self, signal: EngineSignal) {
        let token = self.token.load(Ordering::SeqCst);
        // Closed only once the session is being dropped.
        let _ = self.signals.send((token, signal));
    }

    async fn drive(
        session: Weak<Self>,
        mut signals: mpsc::UnboundedReceiver<(u64, EngineSignal)>,
    ) {
        while let Some((token, signal)) = signals.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };
            match signal {
                EngineSignal::Progress(position) => session.report_progress(position),
                EngineSignal::Ended => session.track_ended(token).await,
                EngineSignal::Failed(err) => session.output_failed(token, &err),
            }
        }
        debug!("Session driver stopped");
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn state(&self) -> PlaybackSessionState {
        self.core.lock().state.clone()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&PlaybackSessionState) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Position reports while audio is attached. Replaces any previous handler.
    pub fn on_progress(&self, handler: impl Fn(PlaybackProgress) + Send + Sync + 'static) {
        *self.progress.lock() = Some(Arc::new(handler));
    }

    pub fn progress(&self) -> PlaybackProgress {
        PlaybackProgress {
            current_time: self.engine.current_time(),
            duration: self.engine.duration(),
        }
    }

    fn report_progress(&self, current_time: f64) {
        let handler = self.progress.lock().clone();
        if let Some(handler) = handler {
            handler(PlaybackProgress {
                current_time,
                duration: self.engine.duration(),
            });
        }
    }

    /// Copy the state for delivery. Call with `core` held.
    fn snapshot(&self, core: &SessionCore) -> Snapshot {
        Snapshot {
            revision: self.revision.fetch_add(1, Ordering::SeqCst) + 1,
            state: core.state.clone(),
        }
    }

    /// Deliver `snapshot` unless a later transition has superseded it.
    ///
    /// Delivery is serialized, and the revision is re-checked before each
    /// listener, so the last state a listener sees is the current one even
    /// when a listener changes the session from inside its callback.
    fn notify(&self, snapshot: &Snapshot) {
        let _delivery = self.delivery.lock();
        let listeners: Vec<StateListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            if self.revision.load(Ordering::SeqCst) != snapshot.revision {
                debug!(revision = snapshot.revision, "Dropping superseded snapshot");
                return;
            }
            listener(&snapshot.state);
        }
    }

    fn publish(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine.
            let _ = events.emit(CoreEvent::Playback(event));
        }
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Start a single clip in `language`.
    ///
    /// No-op when the clip has no URL for `language`. Resumes instead when the
    /// same clip is loaded and paused.
    #[instrument(skip(self, title, urls), fields(language = %language))]
    pub async fn play(&self, id: &str, title: &str, urls: UrlsByLanguage, language: Language) {
        let Some(url) = urls.get(language).map(str::to_owned) else {
            debug!("No audio for requested language, ignoring");
            return;
        };

        let begin = {
            let mut core = self.core.lock();
            let state = &core.state;
            let same = state.kind == SessionKind::Single
                && state.id.as_deref() == Some(id)
                && state.current_url() == Some(url.as_str());

            match (same, state.phase) {
                (true, PlaybackPhase::Paused) => Begin::Resume,
                (true, PlaybackPhase::Loading | PlaybackPhase::Playing) => {
                    debug!("Clip already playing");
                    Begin::Skip
                }
                (same, _) => {
                    // Replaying the idle clip reuses its buffer.
                    if !same {
                        self.engine.stop();
                    }
                    let state = PlaybackSessionState {
                        kind: SessionKind::Single,
                        id: Some(id.to_string()),
                        title: title.to_string(),
                        language,
                        phase: PlaybackPhase::Loading,
                        current_track_index: 0,
                        sources: SessionSources::Single(urls),
                        visible: true,
                        last_error: None,
                    };
                    self.begin(&mut core, &url, state)
                }
            }
        };

        self.run(begin).await;
    }

    /// Start a playlist in `language` at its first track.
    ///
    /// No-op when `language` has no tracks. Resumes instead when the same
    /// playlist is loaded and paused.
    #[instrument(skip(self, title, tracks), fields(language = %language))]
    pub async fn play_playlist(
        &self,
        id: &str,
        title: &str,
        tracks: TracksByLanguage,
        language: Language,
    ) {
        let Some(first) = tracks.get(language).first().cloned() else {
            debug!("No tracks for requested language, ignoring");
            return;
        };

        let begin = {
            let mut core = self.core.lock();
            let state = &core.state;
            let same = state.kind == SessionKind::Playlist
                && state.id.as_deref() == Some(id)
                && state.language == language;

            match (same, state.phase) {
                (true, PlaybackPhase::Paused) => Begin::Resume,
                (true, PlaybackPhase::Loading | PlaybackPhase::Playing) => {
                    debug!("Playlist already playing");
                    Begin::Skip
                }
                _ => {
                    self.engine.stop();
                    let state = PlaybackSessionState {
                        kind: SessionKind::Playlist,
                        id: Some(id.to_string()),
                        title: title.to_string(),
                        language,
                        phase: PlaybackPhase::Loading,
                        current_track_index: 0,
                        sources: SessionSources::Playlist(tracks),
                        visible: true,
                        last_error: None,
                    };
                    self.begin(&mut core, &first, state)
                }
            }
        };

        self.run(begin).await;
    }

    /// Dispatch to [`play`](Self::play) or [`play_playlist`](Self::play_playlist).
    pub async fn play_target(&self, target: PlaybackTarget, language: Language) {
        match target {
            PlaybackTarget::SingleClip { id, title, urls } => {
                self.play(&id, &title, urls, language).await
            }
            PlaybackTarget::Playlist { id, title, tracks } => {
                self.play_playlist(&id, &title, tracks, language).await
            }
        }
    }

    fn begin(&self, core: &mut SessionCore, url: &str, state: PlaybackSessionState) -> Begin {
        let token = self.next_token();
        core.pending_offset = None;
        let ticket = self.engine.request(url);
        core.state = state;
        Begin::Start(
            PendingStart {
                token,
                ticket,
                mode: StartMode::Fresh,
            },
            self.snapshot(&core),
        )
    }

    /// Invalidate outstanding continuations. Call with `core` held.
    fn next_token(&self) -> u64 {
        self.token.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, token: u64) -> bool {
        self.token.load(Ordering::SeqCst) == token
    }

    async fn run(&self, begin: Begin) {
        match begin {
            Begin::Skip => {}
            Begin::Resume => self.resume().await,
            Begin::Start(pending, snapshot) => {
                self.notify(&snapshot);
                self.start(pending).await;
            }
        }
    }

    async fn start(&self, pending: PendingStart) {
        let PendingStart {
            token,
            ticket,
            mode,
        } = pending;
        let result = self.engine.start(ticket).await;
        self.settle(token, result, mode);
    }

    fn settle(&self, token: u64, result: Result<()>, mode: StartMode) {
        let (snapshot, event) = {
            let mut core = self.core.lock();
            if !self.is_current(token) {
                debug!(token, "Ignoring stale start result");
                return;
            }

            let event = match result {
                Ok(()) => {
                    if let Some(offset) = core.pending_offset.take() {
                        if !self.engine.seek(offset) {
                            debug!(offset, "Offset outside new track, playing from start");
                        }
                    }
                    core.state.last_error = None;
                    if core.state.phase == PlaybackPhase::Paused {
                        // Paused while loading.
                        self.engine.pause();
                        None
                    } else {
                        core.state.phase = PlaybackPhase::Playing;
                        Some(self.started_event(&core.state, mode))
                    }
                }
                Err(err) => {
                    core.state.phase = match mode {
                        StartMode::Fresh => PlaybackPhase::Idle,
                        StartMode::Resume => PlaybackPhase::Paused,
                    };
                    if err.is_superseded() {
                        None
                    } else {
                        if err.is_user_facing() {
                            core.state.last_error = Some(PlaybackFailure::from(&err));
                        } else {
                            debug!(error = %err, "Start refused, waiting for user");
                        }
                        Some(PlaybackEvent::Error {
                            session_id: core.state.id.clone(),
                            kind: err.kind().as_str().to_string(),
                            message: err.to_string(),
                        })
                    }
                }
            };
            (self.snapshot(&core), event)
        };

        self.notify(&snapshot);
        if let Some(event) = event {
            self.publish(event);
        }
    }

    fn started_event(&self, state: &PlaybackSessionState, mode: StartMode) -> PlaybackEvent {
        let session_id = state.id.clone().unwrap_or_default();
        match mode {
            StartMode::Fresh => PlaybackEvent::Started {
                session_id,
                title: state.title.clone(),
                language: state.language.as_str().to_string(),
                track_index: state.current_track_index,
            },
            StartMode::Resume => PlaybackEvent::Resumed {
                session_id,
                position_ms: millis(self.engine.current_time()),
            },
        }
    }

    /// Pause a playing or loading session. Idempotent.
    pub fn pause(&self) {
        let (snapshot, event) = {
            let mut core = self.core.lock();
            if !core.state.is_playing() {
                return;
            }
            core.state.phase = PlaybackPhase::Paused;
            self.engine.pause();
            let event = PlaybackEvent::Paused {
                session_id: core.state.id.clone().unwrap_or_default(),
                position_ms: millis(self.engine.current_time()),
            };
            (self.snapshot(&core), event)
        };
        self.notify(&snapshot);
        self.publish(event);
    }

    /// Continue a paused session, or replay the current track of an idle one.
    ///
    /// Paused audio that is still attached continues from its position.
    /// Otherwise the current track is loaded again, starting at any offset
    /// remembered from a language switch.
    pub async fn resume(&self) {
        enum Plan {
            Engine(u64),
            Reload(PendingStart),
        }

        let (plan, snapshot) = {
            let mut core = self.core.lock();
            let plan = match core.state.phase {
                PlaybackPhase::Paused
                    if core.pending_offset.is_none() && self.engine.has_source() =>
                {
                    Plan::Engine(self.next_token())
                }
                PlaybackPhase::Paused | PlaybackPhase::Idle => {
                    let Some(url) = core.state.current_url().map(str::to_owned) else {
                        debug!("Nothing to resume");
                        return;
                    };
                    let mode = if core.state.phase == PlaybackPhase::Paused {
                        StartMode::Resume
                    } else {
                        StartMode::Fresh
                    };
                    Plan::Reload(PendingStart {
                        token: self.next_token(),
                        ticket: self.engine.request(&url),
                        mode,
                    })
                }
                PlaybackPhase::Loading | PlaybackPhase::Playing => return,
            };
            core.state.phase = PlaybackPhase::Loading;
            core.state.visible = true;
            (plan, self.snapshot(&core))
        };

        self.notify(&snapshot);
        match plan {
            Plan::Engine(token) => {
                let result = self.engine.resume().await;
                self.settle(token, result, StartMode::Resume);
            }
            Plan::Reload(pending) => self.start(pending).await,
        }
    }

    /// Silence everything, clear the session and hide the control surface.
    /// The language preference survives.
    pub fn stop(&self) {
        let (snapshot, previous) = {
            let mut core = self.core.lock();
            self.next_token();
            core.pending_offset = None;
            self.engine.stop();
            let previous = core.state.id.take();
            let language = core.state.language;
            core.state = PlaybackSessionState::idle(language);
            (self.snapshot(&core), previous)
        };
        if let Some(id) = &previous {
            info!(id = %id, "Playback stopped");
        }
        self.notify(&snapshot);
        self.publish(PlaybackEvent::Stopped {
            session_id: previous,
        });
    }

    /// Next playlist track. No-op on the last track or outside a playlist.
    pub async fn next(&self) {
        self.step(true).await;
    }

    /// Previous playlist track. No-op on the first track or outside a playlist.
    pub async fn previous(&self) {
        self.step(false).await;
    }

    async fn step(&self, forward: bool) {
        let loaded = {
            let mut core = self.core.lock();
            if core.state.kind != SessionKind::Playlist {
                return;
            }
            let index = core.state.current_track_index;
            let target = if forward {
                Some(index + 1).filter(|next| *next < core.state.track_count())
            } else {
                index.checked_sub(1)
            };
            let Some(target) = target else {
                debug!(index, forward, "At playlist boundary");
                return;
            };
            self.load_track(&mut core, target)
        };

        if let Some(loaded) = loaded {
            self.run_track(loaded).await;
        }
    }

    /// Move to `index` of the current playlist and issue its load.
    fn load_track(
        &self,
        core: &mut SessionCore,
        index: usize,
    ) -> Option<(PendingStart, Snapshot, PlaybackEvent)> {
        let url = {
            let tracks = match &core.state.sources {
                SessionSources::Playlist(tracks) => tracks.get(core.state.language),
                _ => return None,
            };
            tracks.get(index)?.clone()
        };

        let token = self.next_token();
        core.pending_offset = None;
        let ticket = self.engine.request(&url);
        core.state.current_track_index = index;
        core.state.phase = PlaybackPhase::Loading;
        core.state.last_error = None;

        let event = PlaybackEvent::TrackChanged {
            session_id: core.state.id.clone().unwrap_or_default(),
            track_index: index,
            track_count: core.state.track_count(),
        };
        let pending = PendingStart {
            token,
            ticket,
            mode: StartMode::Fresh,
        };
        Some((pending, self.snapshot(&core), event))
    }

    async fn run_track(&self, loaded: (PendingStart, Snapshot, PlaybackEvent)) {
        let (pending, snapshot, event) = loaded;
        self.notify(&snapshot);
        self.publish(event);
        self.start(pending).await;
    }

    /// Switch the session language, keeping the current position in the
    /// target when the new language has audio for it.
    ///
    /// Without audio for the new language playback stops, but the language
    /// still changes. Active playback restarts in the new language at the
    /// elapsed offset. Paused playback stays paused and picks up the offset on
    /// resume.
    #[instrument(skip(self), fields(language = %language))]
    pub async fn switch_language(&self, language: Language) {
        let (pending, snapshot, session_id) = {
            let mut core = self.core.lock();
            if core.state.language == language {
                return;
            }
            core.state.language = language;
            let session_id = core.state.id.clone();

            let mut pending = None;
            if core.state.is_active() {
                let url = core.state.current_url().map(str::to_owned);
                match (url, core.state.phase) {
                    (None, _) => {
                        self.next_token();
                        core.pending_offset = None;
                        self.engine.stop();
                        core.state.phase = PlaybackPhase::Idle;
                        let count = core.state.track_count();
                        if count > 0 && core.state.current_track_index >= count {
                            core.state.current_track_index = count - 1;
                        }
                        info!("No audio for language at this position, stopped");
                    }
                    (Some(url), PlaybackPhase::Loading | PlaybackPhase::Playing) => {
                        let offset = self.elapsed_offset();
                        let token = self.next_token();
                        core.pending_offset = offset;
                        let ticket = self.engine.request(&url);
                        core.state.phase = PlaybackPhase::Loading;
                        pending = Some(PendingStart {
                            token,
                            ticket,
                            mode: StartMode::Fresh,
                        });
                    }
                    (Some(_), PlaybackPhase::Paused) => {
                        let offset = if self.engine.has_source() {
                            self.elapsed_offset()
                        } else {
                            core.pending_offset
                        };
                        self.next_token();
                        core.pending_offset = offset;
                        self.engine.stop();
                    }
                    (Some(_), PlaybackPhase::Idle) => {
                        self.next_token();
                        core.pending_offset = None;
                        self.engine.stop();
                    }
                }
            }
            (pending, self.snapshot(&core), session_id)
        };

        self.notify(&snapshot);
        self.publish(PlaybackEvent::LanguageChanged {
            session_id,
            language: language.as_str().to_string(),
        });
        if let Some(pending) = pending {
            self.start(pending).await;
        }
    }

    fn elapsed_offset(&self) -> Option<f64> {
        if !self.config.resume_offset_on_language_switch {
            return None;
        }
        let elapsed = self.engine.current_time();
        (elapsed > 0.0).then_some(elapsed)
    }

    pub fn show(&self) {
        self.set_visible(true);
    }

    pub fn hide(&self) {
        self.set_visible(false);
    }

    fn set_visible(&self, visible: bool) {
        let snapshot = {
            let mut core = self.core.lock();
            if core.state.visible == visible {
                return;
            }
            core.state.visible = visible;
            self.snapshot(&core)
        };
        self.notify(&snapshot);
    }

    /// Seek within the current track. Returns `true` when applied.
    ///
    /// While paused after a language switch nothing is attached yet; the
    /// position is remembered for the next resume instead.
    pub fn seek(&self, seconds: f64) -> bool {
        let mut core = self.core.lock();
        if !core.state.is_active() {
            return false;
        }
        if core.state.phase == PlaybackPhase::Paused && !self.engine.has_source() {
            if seconds.is_finite() && seconds >= 0.0 {
                core.pending_offset = Some(seconds);
                return true;
            }
            return false;
        }
        drop(core);
        self.engine.seek(seconds)
    }

    pub fn set_volume(&self, volume: f32) {
        self.engine.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    /// Decode buffers the engine still holds.
    pub fn outstanding_buffers(&self) -> usize {
        self.engine.outstanding_buffers()
    }

    // ========================================================================
    // Engine notifications
    // ========================================================================

    async fn track_ended(&self, token: u64) {
        enum Outcome {
            Advance((PendingStart, Snapshot, PlaybackEvent)),
            Complete(Snapshot, PlaybackEvent),
        }

        let outcome = {
            let mut core = self.core.lock();
            if !self.is_current(token) || core.state.phase != PlaybackPhase::Playing {
                debug!(token, "Ignoring stale end of track");
                return;
            }

            let next = core.state.current_track_index + 1;
            let advance = if core.state.has_next() {
                self.load_track(&mut core, next)
            } else {
                None
            };

            match advance {
                Some(loaded) => Outcome::Advance(loaded),
                None => {
                    if core.state.kind == SessionKind::Playlist {
                        self.next_token();
                        self.engine.stop();
                        core.state.current_track_index = 0;
                    }
                    core.state.phase = PlaybackPhase::Idle;
                    let event = PlaybackEvent::Completed {
                        session_id: core.state.id.clone().unwrap_or_default(),
                    };
                    Outcome::Complete(self.snapshot(&core), event)
                }
            }
        };

        match outcome {
            Outcome::Advance(loaded) => {
                debug!("Advancing to next track");
                self.run_track(loaded).await;
            }
            Outcome::Complete(snapshot, event) => {
                info!("Playback completed");
                self.notify(&snapshot);
                self.publish(event);
            }
        }
    }

    fn output_failed(&self, token: u64, err: &PlaybackError) {
        let snapshot = {
            let mut core = self.core.lock();
            if !self.is_current(token) || core.state.phase != PlaybackPhase::Playing {
                return;
            }
            core.state.phase = PlaybackPhase::Idle;
            if err.is_user_facing() {
                core.state.last_error = Some(PlaybackFailure::from(err));
            }
            self.snapshot(&core)
        };
        self.notify(&snapshot);
        self.publish(PlaybackEvent::Error {
            session_id: snapshot.state.id.clone(),
            kind: err.kind().as_str().to_string(),
            message: err.to_string(),
        });
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.lock();
        f.debug_struct("PlaybackSession")
            .field("state", &core.state)
            .field("token", &self.token.load(Ordering::SeqCst))
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

fn millis(seconds: f64) -> u64 {
    (seconds * 1000.0) as u64
}
