//! Locally materialized decode buffers.
//!
//! A [`MaterializedBuffer`] holds the full encoded bytes of one audio URL. Each
//! buffer is counted against the [`BufferTracker`] that created it until the
//! last clone is dropped, so callers can check that nothing outlives the
//! owner that should have released it.

use bridge_traits::AudioData;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts buffers that are still alive.
#[derive(Debug, Clone, Default)]
pub struct BufferTracker {
    live: Arc<AtomicUsize>,
}

impl BufferTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `data` fetched from `source_url` into a tracked buffer.
    pub fn materialize(&self, source_url: impl Into<String>, data: AudioData) -> MaterializedBuffer {
        self.live.fetch_add(1, Ordering::SeqCst);
        MaterializedBuffer {
            inner: Arc::new(BufferInner {
                source_url: source_url.into(),
                data,
                live: Arc::clone(&self.live),
            }),
        }
    }

    /// Number of buffers created by this tracker and not yet released.
    pub fn outstanding(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct BufferInner {
    source_url: String,
    data: AudioData,
    live: Arc<AtomicUsize>,
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared handle to one materialized buffer. Clones share the allocation and
/// count once.
#[derive(Clone)]
pub struct MaterializedBuffer {
    inner: Arc<BufferInner>,
}

impl MaterializedBuffer {
    pub fn source_url(&self) -> &str {
        &self.inner.source_url
    }

    /// Cheap copy of the audio bytes for attaching or probing.
    pub fn audio_data(&self) -> AudioData {
        self.inner.data.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }
}

impl fmt::Debug for MaterializedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedBuffer")
            .field("source_url", &self.inner.source_url)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn data() -> AudioData {
        AudioData::new(Bytes::from_static(b"ID3\x03\x00"))
    }

    #[test]
    fn test_drop_releases_buffer() {
        let tracker = BufferTracker::new();
        let buffer = tracker.materialize("u1", data());
        assert_eq!(tracker.outstanding(), 1);
        assert_eq!(buffer.source_url(), "u1");
        assert_eq!(buffer.len(), 5);

        drop(buffer);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_clones_count_once() {
        let tracker = BufferTracker::new();
        let buffer = tracker.materialize("u1", data());
        let clone = buffer.clone();
        assert_eq!(tracker.outstanding(), 1);

        drop(buffer);
        assert_eq!(tracker.outstanding(), 1);
        drop(clone);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_trackers_are_independent() {
        let a = BufferTracker::new();
        let b = BufferTracker::new();
        let _kept = a.materialize("u1", data());
        assert_eq!(a.outstanding(), 1);
        assert_eq!(b.outstanding(), 0);
    }
}
