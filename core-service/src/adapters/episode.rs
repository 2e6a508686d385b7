//! Episode detail page controls.

use core_library::{format_episode_title, Episode};
use core_playback::{Language, PlaybackSession, PreloadCache, SessionKind};
use std::sync::Arc;
use tracing::debug;

pub struct EpisodeControls {
    session: Arc<PlaybackSession>,
    preload: Arc<PreloadCache>,
    episode: Episode,
}

impl EpisodeControls {
    pub fn new(
        session: Arc<PlaybackSession>,
        preload: Arc<PreloadCache>,
        episode: Episode,
    ) -> Self {
        Self {
            session,
            preload,
            episode,
        }
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    /// `YYYY-MM-DD DOW` heading.
    pub fn title(&self) -> String {
        let created_at = Some(self.episode.created_at.as_str()).filter(|s| !s.is_empty());
        format_episode_title(&self.episode.episode_id, created_at)
    }

    /// Drop buffers warmed for the previous page and warm this episode's.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn on_navigate(&self) {
        self.preload.clear();
        let urls = self.episode.audio_urls();
        debug!(episode = %self.episode.episode_id, count = urls.len(), "Warming episode audio");
        self.preload.spawn_preload_all(urls);
    }

    pub fn has_audio(&self, language: Language) -> bool {
        !self.episode.tracks().get(language).is_empty()
    }

    /// This episode is the loaded playlist and is playing or loading.
    pub fn is_playing_episode(&self) -> bool {
        let state = self.session.state();
        state.kind == SessionKind::Playlist
            && state.id.as_deref() == Some(self.episode.episode_id.as_str())
            && state.is_playing()
    }

    /// Pause when this episode is playing, else start it from the first
    /// track in `language`. A paused run of the same episode resumes.
    pub async fn play_all(&self, language: Language) {
        if self.is_playing_episode() {
            self.session.pause();
            return;
        }
        self.session
            .play_target(self.episode.playlist_target(), language)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::Article;
    use core_playback::testing::{FakeAudioOutput, FakeHttpClient, FakeProbe};
    use core_playback::{AudioEngine, EngineConfig, PlaybackPhase, PreloadConfig, SessionConfig};
    use std::time::Duration;

    fn episode() -> Episode {
        let article = |id: &str| Article {
            id: id.to_string(),
            title: format!("Article {}", id),
            japanese_audio_url: format!("https://cdn.example.com/{}_ja.mp3", id),
            ..Article::default()
        };
        Episode {
            episode_id: "2025-04-09".to_string(),
            title: "Daily".to_string(),
            created_at: String::new(),
            articles: vec![article("a1"), article("a2")],
            source: String::new(),
        }
    }

    fn controls() -> (EpisodeControls, Arc<FakeHttpClient>) {
        let http = Arc::new(FakeHttpClient::new());
        http.serve_audio("https://cdn.example.com/a1_ja.mp3");
        http.serve_audio("https://cdn.example.com/a2_ja.mp3");

        let preload = Arc::new(
            PreloadCache::new(http.clone(), PreloadConfig::default())
                .with_probe(Arc::new(FakeProbe::new())),
        );
        let engine = Arc::new(
            AudioEngine::new(
                Arc::new(FakeAudioOutput::new()),
                http.clone(),
                EngineConfig::default(),
            )
            .with_preload(Arc::clone(&preload)),
        );
        let session = PlaybackSession::new(engine, SessionConfig::default()).unwrap();
        (EpisodeControls::new(session, preload, episode()), http)
    }

    #[tokio::test]
    async fn test_title_uses_episode_date() {
        let (controls, _http) = controls();
        assert_eq!(controls.title(), "2025-04-09 WED");
    }

    #[tokio::test]
    async fn test_play_all_toggles() {
        let (controls, _http) = controls();
        assert!(controls.has_audio(Language::Ja));
        assert!(!controls.has_audio(Language::En));

        controls.play_all(Language::Ja).await;
        assert!(controls.is_playing_episode());

        controls.play_all(Language::Ja).await;
        assert!(!controls.is_playing_episode());
        assert_eq!(controls.session.state().phase, PlaybackPhase::Paused);
    }

    #[tokio::test]
    async fn test_navigate_warms_every_track() {
        let (controls, http) = controls();
        controls.on_navigate();

        for _ in 0..50 {
            if controls.preload.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(controls.preload.is_ready("https://cdn.example.com/a1_ja.mp3"));
        assert!(controls.preload.is_ready("https://cdn.example.com/a2_ja.mp3"));
        assert_eq!(http.request_count("https://cdn.example.com/a1_ja.mp3"), 1);
    }
}
