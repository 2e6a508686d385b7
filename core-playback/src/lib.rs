//! # Playback Coordination Module
//!
//! Turns episode and article audio URLs into sound on the host's single
//! playback channel.
//!
//! ## Overview
//!
//! - [`AudioEngine`] owns the channel: fetch, attach, play, pause, seek.
//! - [`PreloadCache`] warms buffers for URLs that are likely to play next.
//! - [`PlaybackSession`] is the state machine presentation code talks to:
//!   single clips, playlists with auto-advance and language switching.
//! - [`SymphoniaProbe`] checks decodability of preloaded buffers
//!   (`core-decoder` feature, on by default).
//!
//! The session is the only caller of the engine's mutating operations.

pub mod buffer;
pub mod config;
#[cfg(feature = "core-decoder")]
pub mod decoder;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod preload;
pub mod session;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use buffer::{BufferTracker, MaterializedBuffer};
pub use config::{EngineConfig, PlayerConfig, PreloadConfig, SessionConfig};
#[cfg(feature = "core-decoder")]
pub use decoder::{FormatDetector, SymphoniaProbe};
pub use engine::{AudioEngine, PlayTicket};
pub use error::{FailureKind, PlaybackError, PlaybackFailure, Result};
pub use preload::PreloadCache;
pub use session::{
    ListenerId, PlaybackPhase, PlaybackProgress, PlaybackSession, PlaybackSessionState,
    SessionKind, SessionSources,
};
pub use types::{Language, PlaybackTarget, TracksByLanguage, UrlsByLanguage};
