//! Looping ambient track under the narration.

use crate::error::{CoreError, Result};
use bridge_traits::{AudioOutput, HttpClient};
use core_playback::{AudioEngine, EngineConfig, ListenerId, PlaybackError, PlaybackSession};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Fixed background level.
pub const BACKGROUND_VOLUME: f32 = 0.15;

/// A second engine on its own output, looping one track at low volume.
///
/// Start failures from autoplay policy are expected before the first user
/// gesture and are only logged at debug level.
pub struct BackgroundMusic {
    engine: AudioEngine,
    track: String,
    runtime: Handle,
    active: AtomicBool,
    following: Mutex<Option<(Weak<PlaybackSession>, ListenerId)>>,
}

impl BackgroundMusic {
    /// Must be called inside a Tokio runtime.
    pub fn new(
        output: Arc<dyn AudioOutput>,
        http: Arc<dyn HttpClient>,
        track: &str,
        origin: Option<String>,
    ) -> Result<Arc<Self>> {
        let runtime = Handle::try_current().map_err(|_| {
            CoreError::InitializationFailed("BackgroundMusic requires a Tokio runtime".to_string())
        })?;

        let config = EngineConfig {
            initial_volume: BACKGROUND_VOLUME,
            origin,
            ..EngineConfig::default()
        };
        let music = Arc::new(Self {
            engine: AudioEngine::new(output, http, config),
            track: track.to_string(),
            runtime,
            active: AtomicBool::new(false),
            following: Mutex::new(None),
        });

        // Ended arrives on the output's delivery path; restart from a task.
        let weak = Arc::downgrade(&music);
        music.engine.on_ended(move || {
            if let Some(music) = weak.upgrade() {
                if music.active.load(Ordering::SeqCst) {
                    debug!("Background track ended, looping");
                    music.spawn_play();
                }
            }
        });
        music.engine.on_error(|err| {
            warn!(error = %err, "Background track failed");
        });

        Ok(music)
    }

    pub fn track(&self) -> &str {
        &self.track
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Hardware truth from the background output.
    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    /// Play from the start. No-op while already active.
    pub fn start(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        self.spawn_play();
    }

    /// Pause and rewind so the next start is from zero.
    pub fn pause(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.engine.pause();
        self.engine.seek(0.0);
    }

    /// Stop following the session and release the track.
    pub fn stop(&self) {
        if let Some((session, id)) = self.following.lock().take() {
            if let Some(session) = session.upgrade() {
                session.unsubscribe(id);
            }
        }
        self.active.store(false, Ordering::SeqCst);
        self.engine.stop();
    }

    /// Play while `session` is playing or loading, pause otherwise. Track
    /// changes pass through loading, so the loop keeps running across them.
    pub fn follow(self: &Arc<Self>, session: &Arc<PlaybackSession>) {
        let weak = Arc::downgrade(self);
        let id = session.subscribe(move |state| {
            let Some(music) = weak.upgrade() else {
                return;
            };
            if state.is_playing() {
                music.start();
            } else {
                music.pause();
            }
        });

        let previous = self
            .following
            .lock()
            .replace((Arc::downgrade(session), id));
        if let Some((session, id)) = previous {
            if let Some(session) = session.upgrade() {
                session.unsubscribe(id);
            }
        }
    }

    fn spawn_play(self: &Arc<Self>) {
        let music = Arc::clone(self);
        self.runtime.spawn(async move {
            match music.engine.play(&music.track).await {
                Ok(()) => {
                    if !music.active.load(Ordering::SeqCst) {
                        // Paused while loading.
                        music.engine.pause();
                    }
                }
                Err(PlaybackError::Superseded) => {}
                Err(PlaybackError::AutoplayRejected(reason)) => {
                    debug!(%reason, "Background track needs a user gesture");
                    music.active.store(false, Ordering::SeqCst);
                }
                Err(err) => {
                    warn!(error = %err, "Background track could not start");
                    music.active.store(false, Ordering::SeqCst);
                }
            }
        });
    }
}

impl std::fmt::Debug for BackgroundMusic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundMusic")
            .field("track", &self.track)
            .field("active", &self.is_active())
            .finish()
    }
}
