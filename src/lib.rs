//! Workspace placeholder crate.
//!
//! This crate exposes feature flags that map onto the individual workspace
//! crates (`core-service`, `core-playback`, `core-library`). Host applications
//! can depend on `episode-player-workspace` and enable the documented features
//! without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "playback-only")]
pub use core_playback as playback;

#[cfg(feature = "catalog")]
pub use core_library as library;
