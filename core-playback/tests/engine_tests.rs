//! Engine and preload cache working together.

use core_playback::testing::{FakeAudioOutput, FakeHttpClient, FakeProbe};
use core_playback::{AudioEngine, EngineConfig, PreloadCache, PreloadConfig};
use std::sync::Arc;

fn setup() -> (
    AudioEngine,
    Arc<PreloadCache>,
    Arc<FakeAudioOutput>,
    Arc<FakeHttpClient>,
) {
    let output = Arc::new(FakeAudioOutput::new());
    let http = Arc::new(FakeHttpClient::new());
    for url in ["u1", "u2", "u3"] {
        http.serve_audio(url);
    }
    let cache = Arc::new(
        PreloadCache::new(http.clone(), PreloadConfig::default())
            .with_probe(Arc::new(FakeProbe::new())),
    );
    let engine = AudioEngine::new(output.clone(), http.clone(), EngineConfig::default())
        .with_preload(cache.clone());
    (engine, cache, output, http)
}

#[tokio::test]
async fn preloaded_buffer_skips_network() {
    let (engine, cache, output, http) = setup();
    cache.preload("u1").await;
    assert!(cache.is_ready("u1"));

    engine.play("u1").await.unwrap();

    assert_eq!(http.request_count("u1"), 1);
    assert_eq!(output.attach_count(), 1);
    assert_eq!(engine.outstanding_buffers(), 0, "buffer is borrowed from the cache");
    assert_eq!(cache.outstanding_buffers(), 1);
}

#[tokio::test]
async fn clearing_cache_while_playing_keeps_borrowed_buffer_alive() {
    let (engine, cache, _output, _http) = setup();
    cache.preload("u1").await;
    engine.play("u1").await.unwrap();

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.outstanding_buffers(), 1);

    engine.stop();
    assert_eq!(cache.outstanding_buffers(), 0);
}

#[tokio::test]
async fn spawned_preloads_complete_in_background() {
    let (_engine, cache, _output, http) = setup();
    cache.spawn_preload_all(["u1", "u2", "u3"]);

    for _ in 0..1_000 {
        if cache.len() == 3 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(cache.len(), 3);
    assert_eq!(http.requests().len(), 3);
}

#[tokio::test]
async fn unready_url_falls_back_to_network() {
    let (engine, cache, _output, http) = setup();
    cache.preload("u1").await;

    engine.play("u2").await.unwrap();

    assert_eq!(http.request_count("u2"), 1);
    assert_eq!(engine.outstanding_buffers(), 1);
}
