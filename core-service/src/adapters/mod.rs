//! Presentation adapters.
//!
//! Each adapter holds the shared [`PlaybackSession`](core_playback::PlaybackSession)
//! and turns gestures into its intents. None of them touch the engine.

mod article;
mod background;
mod episode;
mod footer;

pub use article::ArticlePlayButton;
pub use background::BackgroundMusic;
pub use episode::EpisodeControls;
pub use footer::{FooterPlayer, FooterView};
