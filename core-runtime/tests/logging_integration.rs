//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, redact_url, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// Only one global subscriber per process, so everything that depends on
// `init_logging` lives in this single test.
#[test]
fn test_global_init_forwards_to_sink_once() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first init succeeds");

    tracing::debug!(
        target: "core_playback::preload",
        url = "https://cdn.example.com/en/a1.mp3?token=abc",
        "Preload ready"
    );
    tracing::debug!(target: "hyper::client", "connection pooled");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1, "hyper debug output is filtered");
        assert_eq!(entries[0].message, "Preload ready");
        assert_eq!(
            entries[0].fields.get("url"),
            Some(&"https://cdn.example.com/en/a1.mp3".to_string())
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(second.is_err());
}

#[test]
fn test_redaction_helpers() {
    assert_eq!(
        redact_url("https://cdn.example.com/ja/a1.mp3?X-Amz-Signature=deadbeef"),
        "https://cdn.example.com/ja/a1.mp3"
    );
    assert_eq!(redact_if_sensitive("session_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("title", "2024-05-01 Wed"), "2024-05-01 Wed");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LogFormat::default(), LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LogFormat::default(), LogFormat::Json);
}
