//! Per-article play button.

use core_library::Article;
use core_playback::{Language, PlaybackSession, SessionKind};
use std::sync::Arc;
use tracing::debug;

pub struct ArticlePlayButton {
    session: Arc<PlaybackSession>,
    article: Article,
}

impl ArticlePlayButton {
    pub fn new(session: Arc<PlaybackSession>, article: Article) -> Self {
        Self { session, article }
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    /// This article is the loaded single clip and is playing or loading.
    pub fn is_playing(&self) -> bool {
        let state = self.session.state();
        state.kind == SessionKind::Single
            && state.id.as_deref() == Some(self.article.id.as_str())
            && state.is_playing()
    }

    pub fn is_available(&self, language: Language) -> bool {
        self.article.audio_url(language).is_some()
    }

    /// Pause when this article is playing, else play it in `language`.
    ///
    /// A paused clip of the same article resumes where it stopped.
    pub async fn click(&self, language: Language) {
        if self.is_playing() {
            self.session.pause();
            return;
        }
        if !self.is_available(language) {
            debug!(article = %self.article.id, %language, "No narration in language");
            return;
        }
        self.session
            .play_target(self.article.clip_target(), language)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_playback::testing::{FakeAudioOutput, FakeHttpClient};
    use core_playback::{AudioEngine, EngineConfig, PlaybackPhase, SessionConfig};

    fn article() -> Article {
        Article {
            id: "a1".to_string(),
            title: "AI news".to_string(),
            japanese_audio_url: "https://cdn.example.com/a1_ja.mp3".to_string(),
            ..Article::default()
        }
    }

    fn session() -> (Arc<PlaybackSession>, Arc<FakeHttpClient>) {
        let http = Arc::new(FakeHttpClient::new());
        http.serve_audio("https://cdn.example.com/a1_ja.mp3");
        let engine = Arc::new(AudioEngine::new(
            Arc::new(FakeAudioOutput::new()),
            http.clone(),
            EngineConfig::default(),
        ));
        let session = PlaybackSession::new(engine, SessionConfig::default()).unwrap();
        (session, http)
    }

    #[tokio::test]
    async fn test_click_plays_then_pauses_then_resumes() {
        let (session, _http) = session();
        let button = ArticlePlayButton::new(session.clone(), article());

        button.click(Language::Ja).await;
        assert!(button.is_playing());
        assert_eq!(session.state().phase, PlaybackPhase::Playing);

        button.click(Language::Ja).await;
        assert!(!button.is_playing());
        assert_eq!(session.state().phase, PlaybackPhase::Paused);

        button.click(Language::Ja).await;
        assert_eq!(session.state().phase, PlaybackPhase::Playing);
    }

    #[tokio::test]
    async fn test_click_without_language_audio_is_noop() {
        let (session, http) = session();
        let button = ArticlePlayButton::new(session.clone(), article());

        assert!(!button.is_available(Language::En));
        button.click(Language::En).await;
        assert_eq!(session.state().phase, PlaybackPhase::Idle);
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_other_article_is_not_playing() {
        let (session, _http) = session();
        let button = ArticlePlayButton::new(session.clone(), article());
        let other = ArticlePlayButton::new(
            session,
            Article {
                id: "a2".to_string(),
                ..article()
            },
        );

        button.click(Language::Ja).await;
        assert!(button.is_playing());
        assert!(!other.is_playing());
    }
}
