//! Session snapshot types.

use crate::error::PlaybackFailure;
use crate::types::{Language, TracksByLanguage, UrlsByLanguage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    None,
    Single,
    Playlist,
}

/// Where the session is in its load/play cycle.
///
/// `Loading` covers the window between a play request and the engine
/// confirming start. Callers treat it as playing for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

/// The URLs of the loaded target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "urls", rename_all = "lowercase")]
pub enum SessionSources {
    #[default]
    None,
    Single(UrlsByLanguage),
    Playlist(TracksByLanguage),
}

/// Read-only snapshot of the process-wide playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSessionState {
    pub kind: SessionKind,
    /// Article or episode id of the loaded target.
    pub id: Option<String>,
    pub title: String,
    pub language: Language,
    pub phase: PlaybackPhase,
    /// Always 0 for single clips.
    pub current_track_index: usize,
    pub sources: SessionSources,
    /// Whether the control surface should render.
    pub visible: bool,
    /// Last user-facing failure, cleared by the next successful start.
    pub last_error: Option<PlaybackFailure>,
}

impl PlaybackSessionState {
    /// Empty session that remembers `language`.
    pub fn idle(language: Language) -> Self {
        Self {
            kind: SessionKind::None,
            id: None,
            title: String::new(),
            language,
            phase: PlaybackPhase::Idle,
            current_track_index: 0,
            sources: SessionSources::None,
            visible: false,
            last_error: None,
        }
    }

    /// Optimistic: true while loading as well as while audible.
    pub fn is_playing(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Loading | PlaybackPhase::Playing)
    }

    pub fn is_active(&self) -> bool {
        self.kind != SessionKind::None
    }

    /// URL for the current language at the current position.
    pub fn current_url(&self) -> Option<&str> {
        self.url_for(self.language)
    }

    pub fn url_for(&self, language: Language) -> Option<&str> {
        match &self.sources {
            SessionSources::None => None,
            SessionSources::Single(urls) => urls.get(language),
            SessionSources::Playlist(tracks) => tracks
                .get(language)
                .get(self.current_track_index)
                .map(String::as_str),
        }
    }

    /// Tracks available in the current language. 1 or 0 for single clips.
    pub fn track_count(&self) -> usize {
        match &self.sources {
            SessionSources::None => 0,
            SessionSources::Single(urls) => usize::from(urls.get(self.language).is_some()),
            SessionSources::Playlist(tracks) => tracks.get(self.language).len(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.kind == SessionKind::Playlist && self.current_track_index + 1 < self.track_count()
    }

    pub fn has_previous(&self) -> bool {
        self.kind == SessionKind::Playlist && self.current_track_index > 0
    }
}

impl Default for PlaybackSessionState {
    fn default() -> Self {
        Self::idle(Language::default())
    }
}

/// Position report for progress displays.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackProgress {
    /// Seconds.
    pub current_time: f64,
    /// Seconds; 0 until known.
    pub duration: f64,
}

impl PlaybackProgress {
    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(ja: &[&str], en: &[&str]) -> PlaybackSessionState {
        PlaybackSessionState {
            kind: SessionKind::Playlist,
            id: Some("ep1".to_string()),
            title: "Title".to_string(),
            sources: SessionSources::Playlist(TracksByLanguage::new(
                ja.iter().map(|s| s.to_string()).collect(),
                en.iter().map(|s| s.to_string()).collect(),
            )),
            visible: true,
            ..PlaybackSessionState::idle(Language::Ja)
        }
    }

    #[test]
    fn test_idle_defaults() {
        let state = PlaybackSessionState::idle(Language::En);
        assert_eq!(state.language, Language::En);
        assert!(!state.is_active());
        assert!(!state.is_playing());
        assert_eq!(state.current_url(), None);
        assert_eq!(state.track_count(), 0);
    }

    #[test]
    fn test_playlist_navigation_bounds() {
        let mut state = playlist(&["u1", "u2"], &[]);
        assert!(state.has_next());
        assert!(!state.has_previous());
        assert_eq!(state.current_url(), Some("u1"));

        state.current_track_index = 1;
        assert!(!state.has_next());
        assert!(state.has_previous());
        assert_eq!(state.url_for(Language::En), None);
    }

    #[test]
    fn test_loading_counts_as_playing() {
        let mut state = playlist(&["u1"], &[]);
        state.phase = PlaybackPhase::Loading;
        assert!(state.is_playing());
        state.phase = PlaybackPhase::Paused;
        assert!(!state.is_playing());
    }

    #[test]
    fn test_single_clip_track_count() {
        let state = PlaybackSessionState {
            kind: SessionKind::Single,
            sources: SessionSources::Single(UrlsByLanguage::new(Some("url-ja".into()), None)),
            ..PlaybackSessionState::idle(Language::Ja)
        };
        assert_eq!(state.track_count(), 1);
        assert!(!state.has_next());
    }

    #[test]
    fn test_progress_fraction() {
        let progress = PlaybackProgress {
            current_time: 30.0,
            duration: 120.0,
        };
        assert_eq!(progress.fraction(), 0.25);
        assert_eq!(PlaybackProgress::default().fraction(), 0.0);
    }
}
