//! # Playback Error Types
//!
//! Failure taxonomy shared by the engine, the preload cache and the session.

use bridge_traits::BridgeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// The requested language or track has no URL.
    #[error("No audio for {0}")]
    Resolution(String),

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Audio bytes could not be retrieved.
    #[error("Failed to fetch {url}{}", status_suffix(.status))]
    Fetch { url: String, status: Option<u16> },

    /// Bytes were retrieved but cannot be played.
    #[error("Cannot decode audio: {0}")]
    Decode(String),

    /// Readiness was not reached in time.
    #[error("Audio not ready after {0:?}")]
    Timeout(Duration),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// The host refused to start playback without a user gesture.
    #[error("Playback start blocked: {0}")]
    AutoplayRejected(String),

    /// Resume was requested with nothing loaded.
    #[error("No audio source loaded")]
    NoSourceLoaded,

    /// A newer request replaced this one before it settled.
    #[error("Playback request superseded")]
    Superseded,

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// The output channel failed.
    #[error("Audio output error: {0}")]
    Output(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

/// Coarse failure classes, suitable for display and event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Resolution,
    Fetch,
    Decode,
    AutoplayRejected,
    Timeout,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Resolution => "resolution",
            FailureKind::Fetch => "fetch",
            FailureKind::Decode => "decode",
            FailureKind::AutoplayRejected => "autoplay_rejected",
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "other",
        }
    }
}

impl PlaybackError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PlaybackError::Resolution(_) => FailureKind::Resolution,
            PlaybackError::Fetch { .. } => FailureKind::Fetch,
            PlaybackError::Decode(_) => FailureKind::Decode,
            PlaybackError::AutoplayRejected(_) => FailureKind::AutoplayRejected,
            PlaybackError::Timeout(_) => FailureKind::Timeout,
            PlaybackError::NoSourceLoaded
            | PlaybackError::Superseded
            | PlaybackError::Output(_)
            | PlaybackError::Internal(_) => FailureKind::Other,
        }
    }

    /// Returns `true` if the failure should be shown to the listener.
    ///
    /// Autoplay refusals and superseded requests are expected outcomes.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            PlaybackError::AutoplayRejected(_) | PlaybackError::Superseded
        )
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, PlaybackError::Superseded)
    }

    /// Map a bridge failure that happened while fetching `url`.
    pub fn from_fetch(url: &str, err: BridgeError) -> Self {
        match err {
            BridgeError::HttpStatus { status, .. } => PlaybackError::Fetch {
                url: url.to_string(),
                status: Some(status),
            },
            _ => PlaybackError::Fetch {
                url: url.to_string(),
                status: None,
            },
        }
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::PlaybackBlocked(msg) => PlaybackError::AutoplayRejected(msg),
            BridgeError::Undecodable(msg) => PlaybackError::Decode(msg),
            BridgeError::HttpStatus { status, url } => PlaybackError::Fetch {
                url,
                status: Some(status),
            },
            other => PlaybackError::Output(other.to_string()),
        }
    }
}

/// Snapshot of the last user-facing failure, kept in session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&PlaybackError> for PlaybackFailure {
    fn from(err: &PlaybackError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_error_mapping() {
        let blocked: PlaybackError = BridgeError::PlaybackBlocked("gesture".into()).into();
        assert_eq!(blocked.kind(), FailureKind::AutoplayRejected);
        assert!(!blocked.is_user_facing());

        let undecodable: PlaybackError = BridgeError::Undecodable("bad header".into()).into();
        assert_eq!(undecodable.kind(), FailureKind::Decode);
        assert!(undecodable.is_user_facing());
    }

    #[test]
    fn test_fetch_status_in_message() {
        let err = PlaybackError::from_fetch(
            "https://cdn/a.mp3",
            BridgeError::HttpStatus {
                status: 404,
                url: "https://cdn/a.mp3".into(),
            },
        );
        assert_eq!(err.to_string(), "Failed to fetch https://cdn/a.mp3 (HTTP 404)");

        let transport = PlaybackError::from_fetch("u1", BridgeError::OperationFailed("reset".into()));
        assert_eq!(transport.to_string(), "Failed to fetch u1");
    }

    #[test]
    fn test_superseded_is_silent() {
        assert!(PlaybackError::Superseded.is_superseded());
        assert!(!PlaybackError::Superseded.is_user_facing());
        assert_eq!(PlaybackError::Superseded.kind(), FailureKind::Other);
    }

    #[test]
    fn test_failure_snapshot() {
        let failure = PlaybackFailure::from(&PlaybackError::Timeout(Duration::from_secs(5)));
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert!(failure.message.contains("5s"));
    }
}
