//! Persistent footer player.

use core_library::format_time;
use core_playback::{
    Language, ListenerId, PlaybackPhase, PlaybackProgress, PlaybackSession, PlaybackSessionState,
    SessionKind,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Everything the footer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterView {
    pub visible: bool,
    pub title: String,
    /// `Track n / total`, playlists only.
    pub track_label: Option<String>,
    pub is_playing: bool,
    /// False when the current language has no audio for the loaded target.
    pub can_toggle: bool,
    pub can_previous: bool,
    pub can_next: bool,
    /// `0.0..=100.0`
    pub progress_percent: f64,
    pub current_time: String,
    pub duration: String,
    pub language: Language,
    /// Message of the last user-facing failure.
    pub error: Option<String>,
}

impl FooterView {
    pub fn from_parts(state: &PlaybackSessionState, progress: PlaybackProgress) -> Self {
        let track_label = (state.kind == SessionKind::Playlist && state.track_count() > 0).then(
            || {
                format!(
                    "Track {} / {}",
                    state.current_track_index + 1,
                    state.track_count()
                )
            },
        );

        Self {
            visible: state.visible && state.is_active(),
            title: state.title.clone(),
            track_label,
            is_playing: state.is_playing(),
            can_toggle: state.current_url().is_some(),
            can_previous: state.has_previous(),
            can_next: state.has_next(),
            progress_percent: progress.fraction() * 100.0,
            current_time: format_time(progress.current_time),
            duration: format_time(progress.duration),
            language: state.language,
            error: state
                .last_error
                .as_ref()
                .map(|failure| failure.message.clone()),
        }
    }
}

/// Gesture handlers for the footer.
#[derive(Clone)]
pub struct FooterPlayer {
    session: Arc<PlaybackSession>,
}

impl FooterPlayer {
    pub fn new(session: Arc<PlaybackSession>) -> Self {
        Self { session }
    }

    pub fn view(&self) -> FooterView {
        FooterView::from_parts(&self.session.state(), self.session.progress())
    }

    /// Re-render on every session change. The callback gets a fresh view.
    pub fn watch(&self, render: impl Fn(FooterView) + Send + Sync + 'static) -> ListenerId {
        let session = Arc::downgrade(&self.session);
        self.session.subscribe(move |state| {
            let progress = session
                .upgrade()
                .map(|session| session.progress())
                .unwrap_or_default();
            render(FooterView::from_parts(state, progress));
        })
    }

    pub fn unwatch(&self, id: ListenerId) -> bool {
        self.session.unsubscribe(id)
    }

    /// Pause while playing, otherwise resume. An idle session with a loaded
    /// target replays its current track.
    pub async fn toggle_play_pause(&self) {
        let state = self.session.state();
        if state.current_url().is_none() {
            debug!("Nothing to toggle in the current language");
            return;
        }
        match state.phase {
            PlaybackPhase::Loading | PlaybackPhase::Playing => self.session.pause(),
            PlaybackPhase::Paused | PlaybackPhase::Idle => self.session.resume().await,
        }
    }

    /// Seek to `ratio` of the track, as from a click on the progress bar.
    pub fn seek_to_ratio(&self, ratio: f64) -> bool {
        if !ratio.is_finite() {
            return false;
        }
        let duration = self.session.progress().duration;
        if duration <= 0.0 {
            return false;
        }
        self.session.seek(ratio.clamp(0.0, 1.0) * duration)
    }

    pub async fn change_language(&self, language: Language) {
        self.session.switch_language(language).await;
    }

    pub async fn next(&self) {
        self.session.next().await;
    }

    pub async fn previous(&self) {
        self.session.previous().await;
    }

    /// Stop playback and hide the footer.
    pub fn close(&self) {
        self.session.stop();
    }
}
