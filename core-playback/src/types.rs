//! Playback targets and the per-language URL sets they carry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Narration language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }

    pub fn other(&self) -> Language {
        match self {
            Language::Ja => Language::En,
            Language::En => Language::Ja,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One optional URL per language, for a single clip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlsByLanguage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ja: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
}

impl UrlsByLanguage {
    pub fn new(ja: Option<String>, en: Option<String>) -> Self {
        Self { ja, en }
    }

    pub fn get(&self, language: Language) -> Option<&str> {
        match language {
            Language::Ja => self.ja.as_deref(),
            Language::En => self.en.as_deref(),
        }
    }
}

/// Ordered track lists per language, for a playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracksByLanguage {
    #[serde(default)]
    pub ja: Vec<String>,
    #[serde(default)]
    pub en: Vec<String>,
}

impl TracksByLanguage {
    pub fn new(ja: Vec<String>, en: Vec<String>) -> Self {
        Self { ja, en }
    }

    pub fn get(&self, language: Language) -> &[String] {
        match language {
            Language::Ja => &self.ja,
            Language::En => &self.en,
        }
    }
}

/// Something the session can play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackTarget {
    SingleClip {
        id: String,
        title: String,
        urls: UrlsByLanguage,
    },
    Playlist {
        id: String,
        title: String,
        tracks: TracksByLanguage,
    },
}

impl PlaybackTarget {
    pub fn id(&self) -> &str {
        match self {
            PlaybackTarget::SingleClip { id, .. } | PlaybackTarget::Playlist { id, .. } => id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            PlaybackTarget::SingleClip { title, .. } | PlaybackTarget::Playlist { title, .. } => {
                title
            }
        }
    }
}
