//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop hosts
//! (macOS, Windows, Linux):
//! - `HttpClient` using `reqwest`
//! - `AudioOutput` using `rodio` on the default output device
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, RodioAudioOutput};
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestHttpClient::try_new()?);
//! let output = Arc::new(RodioAudioOutput::open_default()?);
//! // Hand both to CoreConfig
//! ```

mod audio;
mod http;

pub use audio::RodioAudioOutput;
pub use http::ReqwestHttpClient;
