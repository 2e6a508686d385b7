//! # Episode Catalog
//!
//! Episode and article models as served by the episode API, the
//! [`EpisodeSource`] contract used by the presentation layer to read them,
//! and the display helpers the player surfaces share.
//!
//! ## Overview
//!
//! - [`models`]: `Article`, `Episode`, `EpisodeSummary`, and conversion to
//!   playback targets
//! - [`pagination`]: page requests and the listing envelope
//! - [`source`]: `EpisodeSource` and its HTTP JSON implementation
//! - [`format`]: `m:ss` times and `YYYY-MM-DD DOW` episode titles

pub mod error;
pub mod format;
pub mod models;
pub mod pagination;
pub mod source;

pub use error::{LibraryError, Result};
pub use format::{format_episode_title, format_time};
pub use models::{Article, Episode, EpisodeSummary};
pub use pagination::{PageRequest, PaginatedEpisodes};
pub use source::{EpisodeSource, HttpEpisodeSource};
