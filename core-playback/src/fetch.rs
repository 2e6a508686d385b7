//! Fetching audio bytes into tracked buffers.

use crate::buffer::{BufferTracker, MaterializedBuffer};
use crate::error::{PlaybackError, Result};
use bridge_traits::{AudioData, HttpClient, HttpRequest, RetryPolicy};
use core_runtime::logging::redact_url;
use tracing::debug;

/// Resolve `url` against `origin` when it is a root-relative path.
///
/// Absolute `http(s)` URLs and relative paths without an origin pass through.
pub fn resolve_url(origin: Option<&str>, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    match origin {
        Some(origin) => {
            let origin = origin.trim_end_matches('/');
            if url.starts_with('/') {
                format!("{}{}", origin, url)
            } else {
                format!("{}/{}", origin, url)
            }
        }
        None => url.to_string(),
    }
}

/// Download `url` in one request and wrap the body in a buffer counted by
/// `tracker`. No retries.
pub(crate) async fn fetch_buffer(
    http: &dyn HttpClient,
    url: &str,
    tracker: &BufferTracker,
) -> Result<MaterializedBuffer> {
    let request = HttpRequest::get(url).header("Accept", "audio/*");
    let response = http
        .execute_with_retry(request, RetryPolicy::no_retry())
        .await
        .map_err(|e| PlaybackError::from_fetch(url, e))?
        .error_for_status(url)
        .map_err(|e| PlaybackError::from_fetch(url, e))?;

    if let Some(content_type) = response.content_type() {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.starts_with("text/") || content_type.starts_with("application/json") {
            return Err(PlaybackError::Decode(format!(
                "unexpected content type {}",
                content_type
            )));
        }
    }

    if response.body.is_empty() {
        return Err(PlaybackError::Decode("empty response body".to_string()));
    }

    debug!(url = %redact_url(url), bytes = response.body.len(), "Fetched audio");
    let data = AudioData::new(response.body).with_hint_from_url(url);
    Ok(tracker.materialize(url, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn execute_with_retry(
                &self,
                request: HttpRequest,
                policy: RetryPolicy,
            ) -> BridgeResult<HttpResponse>;
            async fn is_connected(&self) -> bool;
        }
    }

    fn response(status: u16, content_type: &str, body: &'static [u8]) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        HttpResponse {
            status,
            headers,
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url(Some("https://news.example.com/"), "/audio/a1.mp3"),
            "https://news.example.com/audio/a1.mp3"
        );
        assert_eq!(
            resolve_url(Some("https://news.example.com"), "audio/a1.mp3"),
            "https://news.example.com/audio/a1.mp3"
        );
        assert_eq!(
            resolve_url(Some("https://news.example.com"), "https://cdn/a.mp3"),
            "https://cdn/a.mp3"
        );
        assert_eq!(resolve_url(None, "/audio/a1.mp3"), "/audio/a1.mp3");
    }

    #[tokio::test]
    async fn test_fetch_uses_single_attempt() {
        let mut http = MockHttp::new();
        http.expect_execute_with_retry()
            .withf(|request, policy| {
                request.url == "https://cdn/a.mp3" && policy.max_attempts == 1
            })
            .times(1)
            .returning(|_, _| Ok(response(200, "audio/mpeg", b"ID3abc")));

        let tracker = BufferTracker::new();
        let buffer = fetch_buffer(&http, "https://cdn/a.mp3", &tracker).await.unwrap();
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.audio_data().extension_hint.as_deref(), Some("mp3"));
        assert_eq!(tracker.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_fetch_maps_http_status() {
        let mut http = MockHttp::new();
        http.expect_execute_with_retry()
            .returning(|_, _| Ok(response(403, "application/xml", b"<Error/>")));

        let tracker = BufferTracker::new();
        let err = fetch_buffer(&http, "https://cdn/a.mp3", &tracker).await.unwrap_err();
        assert_eq!(
            err,
            PlaybackError::Fetch {
                url: "https://cdn/a.mp3".to_string(),
                status: Some(403)
            }
        );
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_fetch_rejects_html() {
        let mut http = MockHttp::new();
        http.expect_execute_with_retry()
            .returning(|_, _| Ok(response(200, "text/html; charset=utf-8", b"<html>")));

        let err = fetch_buffer(&http, "https://cdn/a.mp3", &BufferTracker::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Decode);
    }

    #[tokio::test]
    async fn test_transport_error_is_fetch_failure() {
        let mut http = MockHttp::new();
        http.expect_execute_with_retry()
            .returning(|_, _| Err(BridgeError::OperationFailed("connection reset".into())));

        let err = fetch_buffer(&http, "u1", &BufferTracker::new()).await.unwrap_err();
        assert_eq!(
            err,
            PlaybackError::Fetch {
                url: "u1".to_string(),
                status: None
            }
        );
    }
}
