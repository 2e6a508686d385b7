//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the episode player crates:
//! - Logging and tracing setup, with URL redaction
//! - Host bridge configuration
//! - The core event bus
//!
//! Every other `core-*` crate depends on this one for its logging conventions
//! and for the [`events::CoreEvent`] vocabulary.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
