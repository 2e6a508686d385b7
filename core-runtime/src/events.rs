//! # Event Bus System
//!
//! Typed events broadcast over `tokio::sync::broadcast` so that presentation
//! code, analytics and tests can observe the player without holding a
//! reference to it.
//!
//! ```text
//! ┌─────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ PlaybackSession ├──────────>│           ├──────────────>│ Footer UI  │
//! └─────────────────┘           │ EventBus  │               └────────────┘
//! ┌─────────────────┐   emit    │           │   subscribe   ┌────────────┐
//! │ EpisodeSource   ├──────────>│           ├──────────────>│ Subscriber │
//! └─────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
//!     session_id: "ep-1".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Playback(PlaybackEvent::Completed { .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `RecvError::Lagged(n)` means the subscriber fell `n` events behind and can
//! keep reading. `RecvError::Closed` means every sender is gone. Emitting with
//! no subscribers returns `Err`, which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, SendError},
    Receiver,
};

/// Default buffer size for the event bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Narration playback
    Playback(PlaybackEvent),
    /// Episode catalog fetches
    Catalog(CatalogEvent),
}

// ============================================================================
// Playback Events
// ============================================================================

/// Session-level playback transitions.
///
/// `session_id` is the article or episode id of the active session. Languages
/// are the lowercase codes `ja` and `en`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A track became audible.
    Started {
        session_id: String,
        title: String,
        language: String,
        track_index: usize,
    },
    Paused {
        session_id: String,
        position_ms: u64,
    },
    Resumed {
        session_id: String,
        position_ms: u64,
    },
    /// The session was stopped by the user.
    Stopped { session_id: Option<String> },
    /// A playlist moved to another track.
    TrackChanged {
        session_id: String,
        track_index: usize,
        track_count: usize,
    },
    /// The session played to its natural end.
    Completed { session_id: String },
    LanguageChanged {
        session_id: Option<String>,
        language: String,
    },
    Error {
        session_id: Option<String>,
        /// Short failure classification, e.g. `fetch` or `decode`.
        kind: String,
        message: String,
    },
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Episode API activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    PageLoaded {
        page: u32,
        count: usize,
        total_pages: u32,
    },
    EpisodeLoaded { episode_id: String },
    /// A request failed and the caller received an empty result.
    FetchFailed { resource: String, message: String },
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by publishers and subscribers. Clones share the
/// same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event. Returns the number of receivers, or `Err` when no
    /// one is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Past events are not replayed to new subscribers.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Waits for the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` when no matching event is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
