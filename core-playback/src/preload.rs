//! # Preload Cache
//!
//! Best-effort prefetch of audio bytes for URLs that are likely to be played
//! next. Entries are fetched, probed for decodability within a bounded time
//! and kept in an LRU map capped at `max_entries`. Failures are logged and
//! leave no entry behind; nothing here ever fails the caller.
//!
//! [`PreloadCache::clear`] releases every entry. Loads still in flight when
//! the cache is cleared are discarded on completion.

use crate::buffer::{BufferTracker, MaterializedBuffer};
use crate::config::PreloadConfig;
use crate::error::{PlaybackError, Result};
use crate::fetch::{fetch_buffer, resolve_url};
use bridge_traits::{AudioProbe, HttpClient};
use core_runtime::logging::redact_url;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct PreloadCache {
    http: Arc<dyn HttpClient>,
    probe: Option<Arc<dyn AudioProbe>>,
    config: PreloadConfig,
    origin: Option<String>,
    entries: Mutex<LruCache<String, MaterializedBuffer>>,
    in_flight: Mutex<HashSet<String>>,
    /// Bumped by `clear` so late completions can tell they are stale.
    epoch: AtomicU64,
    tracker: BufferTracker,
}

impl PreloadCache {
    pub fn new(http: Arc<dyn HttpClient>, config: PreloadConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            http,
            probe: None,
            config,
            origin: None,
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashSet::new()),
            epoch: AtomicU64::new(0),
            tracker: BufferTracker::new(),
        }
    }

    /// Check decodability with `probe` before an entry counts as ready.
    /// Without a probe, a successful fetch is enough.
    pub fn with_probe(mut self, probe: Arc<dyn AudioProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Origin for relative URLs; must match the engine's.
    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    /// Fetch and probe `url`, then keep it as ready.
    ///
    /// No-op when disabled, already ready, or already loading.
    #[instrument(skip(self), fields(url = %redact_url(url)))]
    pub async fn preload(&self, url: &str) {
        if !self.config.enabled {
            return;
        }

        let url = self.resolve(url);
        if self.entries.lock().contains(&url) {
            debug!("Already preloaded");
            return;
        }
        if !self.in_flight.lock().insert(url.clone()) {
            debug!("Preload already in flight");
            return;
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let timeout = self.config.probe_timeout;
        let result = tokio::time::timeout(timeout, self.load(&url))
            .await
            .unwrap_or(Err(PlaybackError::Timeout(timeout)));

        self.in_flight.lock().remove(&url);

        match result {
            Ok(buffer) => {
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("Cache cleared while loading, discarding");
                    return;
                }
                let bytes = buffer.len();
                if let Some((evicted, _)) = self.entries.lock().push(url.clone(), buffer) {
                    if evicted != url {
                        debug!(evicted = %redact_url(&evicted), "Evicted least recently used entry");
                    }
                }
                info!(bytes, "Preload ready");
            }
            Err(err) => {
                warn!(error = %err, "Preload failed");
            }
        }
    }

    async fn load(&self, url: &str) -> Result<MaterializedBuffer> {
        let buffer = fetch_buffer(self.http.as_ref(), url, &self.tracker).await?;
        if let Some(probe) = &self.probe {
            let info = probe
                .probe(buffer.audio_data())
                .await
                .map_err(|e| PlaybackError::Decode(e.to_string()))?;
            debug!(duration = ?info.duration, codec = ?info.codec, "Probe succeeded");
        }
        Ok(buffer)
    }

    /// Start `preload` on the current Tokio runtime without waiting for it.
    pub fn spawn_preload(self: &Arc<Self>, url: impl Into<String>) {
        let cache = Arc::clone(self);
        let url = url.into();
        tokio::spawn(async move {
            cache.preload(&url).await;
        });
    }

    /// Fire-and-forget preload of every URL.
    pub fn spawn_preload_all<I, S>(self: &Arc<Self>, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            self.spawn_preload(url);
        }
    }

    pub fn is_ready(&self, url: &str) -> bool {
        let url = self.resolve(url);
        self.entries.lock().contains(&url)
    }

    /// Ready buffer for `url`, marked as recently used.
    pub fn get(&self, url: &str) -> Option<MaterializedBuffer> {
        let url = self.resolve(url);
        self.entries.lock().get(&url).cloned()
    }

    /// Release every entry and discard loads still in flight.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let released = {
            let mut entries = self.entries.lock();
            let count = entries.len();
            entries.clear();
            count
        };
        if released > 0 {
            debug!(released, "Preload cache cleared");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Buffers created by this cache that are still alive, including any the
    /// engine is currently borrowing.
    pub fn outstanding_buffers(&self) -> usize {
        self.tracker.outstanding()
    }

    fn resolve(&self, url: &str) -> String {
        resolve_url(self.origin.as_deref(), url)
    }
}

impl std::fmt::Debug for PreloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadCache")
            .field("entries", &self.len())
            .field("in_flight", &self.in_flight.lock().len())
            .field("config", &self.config)
            .finish()
    }
}
