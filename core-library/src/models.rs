//! Domain models for the episode catalog
//!
//! Field names follow the episode API's JSON. Audio URLs arrive as strings
//! that may be empty; the accessors here treat empty as absent.

use core_playback::{Language, PlaybackTarget, TracksByLanguage, UrlsByLanguage};
use serde::{Deserialize, Serialize};

// =============================================================================
// Article
// =============================================================================

/// One news article with bilingual summaries and narration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub author: String,
    pub published: String,
    pub source: String,
    pub source_id: String,
    pub english_summary: String,
    pub japanese_summary: String,
    pub english_audio_url: String,
    pub japanese_audio_url: String,
}

impl Article {
    /// Narration URL for `language`, if there is one.
    pub fn audio_url(&self, language: Language) -> Option<&str> {
        let url = match language {
            Language::Ja => &self.japanese_audio_url,
            Language::En => &self.english_audio_url,
        };
        non_empty(url)
    }

    /// Summary text for `language`, if there is one.
    pub fn summary_in(&self, language: Language) -> Option<&str> {
        let summary = match language {
            Language::Ja => &self.japanese_summary,
            Language::En => &self.english_summary,
        };
        non_empty(summary)
    }

    pub fn urls(&self) -> UrlsByLanguage {
        UrlsByLanguage::new(
            self.audio_url(Language::Ja).map(str::to_owned),
            self.audio_url(Language::En).map(str::to_owned),
        )
    }

    pub fn has_audio(&self) -> bool {
        self.audio_url(Language::Ja).is_some() || self.audio_url(Language::En).is_some()
    }

    /// This article as a single clip.
    pub fn clip_target(&self) -> PlaybackTarget {
        PlaybackTarget::SingleClip {
            id: self.id.clone(),
            title: self.title.clone(),
            urls: self.urls(),
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// =============================================================================
// Episode
// =============================================================================

/// A dated collection of articles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub source: String,
}

impl Episode {
    pub fn article(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    /// Per-language track lists in article order. Articles without audio
    /// in a language are skipped for that language only.
    pub fn tracks(&self) -> TracksByLanguage {
        let collect = |language| {
            self.articles
                .iter()
                .filter_map(|article| article.audio_url(language).map(str::to_owned))
                .collect()
        };
        TracksByLanguage::new(collect(Language::Ja), collect(Language::En))
    }

    /// The whole episode as a playlist.
    pub fn playlist_target(&self) -> PlaybackTarget {
        PlaybackTarget::Playlist {
            id: self.episode_id.clone(),
            title: self.title.clone(),
            tracks: self.tracks(),
        }
    }

    /// Every narration URL in the episode, in article order, without
    /// duplicates.
    pub fn audio_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for article in &self.articles {
            for language in [Language::Ja, Language::En] {
                if let Some(url) = article.audio_url(language) {
                    if !urls.iter().any(|seen| seen == url) {
                        urls.push(url.to_string());
                    }
                }
            }
        }
        urls
    }

    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            episode_id: self.episode_id.clone(),
            title: self.title.clone(),
            created_at: self.created_at.clone(),
            article_count: self.articles.len() as u32,
            source: self.source.clone(),
        }
    }
}

/// Listing entry for an episode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub article_count: u32,
    #[serde(default)]
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, ja: &str, en: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Title {}", id),
            japanese_audio_url: ja.to_string(),
            english_audio_url: en.to_string(),
            ..Article::default()
        }
    }

    #[test]
    fn test_article_deserializes_api_json() {
        let json = r#"{
            "id": "a1",
            "title": "AI news",
            "link": "https://example.com/a1",
            "summary": "s",
            "author": "x",
            "published": "2025-04-09",
            "source": "feed",
            "source_id": "f1",
            "english_summary": "en",
            "japanese_summary": "ja",
            "english_audio_url": "https://cdn/a1_en.mp3",
            "japanese_audio_url": ""
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.audio_url(Language::En), Some("https://cdn/a1_en.mp3"));
        assert_eq!(article.audio_url(Language::Ja), None);
        assert_eq!(article.summary_in(Language::Ja), Some("ja"));
    }

    #[test]
    fn test_article_tolerates_missing_fields() {
        let article: Article = serde_json::from_str(r#"{"id": "a1"}"#).unwrap();
        assert_eq!(article.id, "a1");
        assert!(!article.has_audio());
    }

    #[test]
    fn test_clip_target_drops_empty_urls() {
        let target = article("a1", "ja.mp3", "  ").clip_target();
        assert_eq!(
            target,
            PlaybackTarget::SingleClip {
                id: "a1".into(),
                title: "Title a1".into(),
                urls: UrlsByLanguage::new(Some("ja.mp3".into()), None),
            }
        );
    }

    #[test]
    fn test_playlist_target_skips_missing_per_language() {
        let episode = Episode {
            episode_id: "2025-04-09".into(),
            title: "Daily".into(),
            articles: vec![
                article("a1", "ja1", "en1"),
                article("a2", "", "en2"),
                article("a3", "ja3", ""),
            ],
            ..Episode::default()
        };

        match episode.playlist_target() {
            PlaybackTarget::Playlist { id, tracks, .. } => {
                assert_eq!(id, "2025-04-09");
                assert_eq!(tracks.ja, vec!["ja1", "ja3"]);
                assert_eq!(tracks.en, vec!["en1", "en2"]);
            }
            other => panic!("expected playlist, got {:?}", other),
        }
    }

    #[test]
    fn test_audio_urls_in_order_without_duplicates() {
        let episode = Episode {
            episode_id: "e".into(),
            articles: vec![article("a1", "ja1", "en1"), article("a2", "ja1", "en2")],
            ..Episode::default()
        };
        assert_eq!(episode.audio_urls(), vec!["ja1", "en1", "en2"]);
    }

    #[test]
    fn test_episode_summary() {
        let episode = Episode {
            episode_id: "e".into(),
            title: "T".into(),
            articles: vec![article("a1", "", ""), article("a2", "", "")],
            ..Episode::default()
        };
        let summary = episode.summary();
        assert_eq!(summary.article_count, 2);
        assert_eq!(summary.title, "T");
        assert!(episode.article("a2").is_some());
        assert!(episode.article("zz").is_none());
    }
}
