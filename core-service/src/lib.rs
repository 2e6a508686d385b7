//! Core service façade and presentation adapters.
//!
//! [`PlayerService`] wires the host-provided bridges from a
//! [`CoreConfig`](core_runtime::config::CoreConfig) into the narration
//! engine, its preload cache, the playback session and the episode source.
//! Desktop hosts enable the `desktop-shims` feature so missing HTTP and audio
//! bridges fall back to `bridge-desktop`.
//!
//! The adapters in [`adapters`] are what the UI binds to: view models built
//! from session snapshots plus gesture handlers that only ever call session
//! intents.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::config::CoreConfig;
//! use core_service::PlayerService;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com")
//!     .media_origin("https://cdn.example.com")
//!     .build()?;
//! let service = PlayerService::new(config)?;
//!
//! if let Some(episode) = service.episodes().get_episode("2025-04-09").await {
//!     let controls = service.episode_controls(episode);
//!     controls.on_navigate();
//!     controls.play_all(core_playback::Language::Ja).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod error;
pub mod service;

pub use adapters::{
    ArticlePlayButton, BackgroundMusic, EpisodeControls, FooterPlayer, FooterView,
};
pub use error::{CoreError, Result};
pub use service::PlayerService;
