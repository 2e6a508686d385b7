use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Catalog request failures. Never surfaced past [`EpisodeSource`](crate::EpisodeSource),
/// which degrades them to empty results.
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
