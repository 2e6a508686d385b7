//! # Host Bridge Traits
//!
//! Capability contracts the playback core needs from its host.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - fetch episode JSON and raw audio bytes
//! - [`AudioOutput`](playback::AudioOutput) - the single hardware playback channel
//! - [`AudioProbe`](playback::AudioProbe) - decode-readiness check for detached buffers
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Tests    | `core-playback` (`test-support` feature) |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep the distinction between a refused
//! start ([`BridgeError::PlaybackBlocked`]) and a hard failure, because the
//! core treats the two differently.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so one implementation can be shared
//! across async tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod playback;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{AudioData, AudioOutput, AudioProbe, OutputEvent, OutputListener, StreamInfo};
pub use time::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
