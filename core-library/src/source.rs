//! # Episode Source
//!
//! Read access to the episode API for the presentation layer. The playback
//! core never talks to the catalog; it only receives the targets built from
//! these models.
//!
//! Lookups never fail outward: a broken listing is an empty page and a
//! missing episode or summary is `None`. Failures are logged and, when an
//! event bus is attached, published as [`CatalogEvent::FetchFailed`].

use crate::error::{LibraryError, Result};
use crate::models::Episode;
use crate::pagination::{PageRequest, PaginatedEpisodes};
use async_trait::async_trait;
use bridge_traits::http::{encode_component, HttpClient, HttpRequest};
use core_playback::Language;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Episode catalog interface
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// One page of the episode listing. Empty on failure.
    async fn list_episodes(&self, request: PageRequest) -> PaginatedEpisodes;

    /// A full episode with its articles.
    ///
    /// # Returns
    /// - `Some(episode)` if found
    /// - `None` if missing or the request failed
    async fn get_episode(&self, episode_id: &str) -> Option<Episode>;

    /// Summary text of an article in `language`.
    async fn get_article_summary(&self, article_id: &str, language: Language) -> Option<String>;

    /// Narration URL of an article in `language`.
    async fn get_article_audio(&self, article_id: &str, language: Language) -> Option<String>;
}

#[derive(Deserialize)]
struct SummaryBody {
    summary: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioBody {
    audio_url: Option<String>,
}

/// [`EpisodeSource`] over the JSON API at `base_url`.
pub struct HttpEpisodeSource {
    http: Arc<dyn HttpClient>,
    base_url: String,
    events: Option<EventBus>,
}

impl HttpEpisodeSource {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET `request` and decode its JSON body. `Ok(None)` on 404.
    async fn fetch_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<Option<T>> {
        let url = request.full_url();
        let response = self
            .http
            .execute(request.header("Accept", "application/json").timeout(REQUEST_TIMEOUT))
            .await?;

        if response.status == 404 {
            return Ok(None);
        }
        let response = response.error_for_status(&url)?;
        serde_json::from_slice(&response.body)
            .map(Some)
            .map_err(|e| LibraryError::Malformed {
                url,
                message: e.to_string(),
            })
    }

    fn publish(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine.
            let _ = events.emit(CoreEvent::Catalog(event));
        }
    }

    fn failed(&self, resource: String, err: &LibraryError) {
        warn!(resource = %resource, error = %err, "Catalog request failed");
        self.publish(CatalogEvent::FetchFailed {
            resource,
            message: err.to_string(),
        });
    }

    async fn article_field<T: DeserializeOwned>(
        &self,
        article_id: &str,
        field: &str,
        language: Language,
    ) -> Option<T> {
        let resource = format!("articles/{}/{}", encode_component(article_id), field);
        let request = HttpRequest::get(self.endpoint(&resource)).query("language", language);
        match self.fetch_json(request).await {
            Ok(body) => body,
            Err(err) => {
                self.failed(resource, &err);
                None
            }
        }
    }
}

#[async_trait]
impl EpisodeSource for HttpEpisodeSource {
    #[instrument(skip(self), fields(page = request.page, limit = request.limit))]
    async fn list_episodes(&self, request: PageRequest) -> PaginatedEpisodes {
        let http_request = HttpRequest::get(self.endpoint("episodes"))
            .query("page", request.page)
            .query("limit", request.limit);

        match self.fetch_json::<PaginatedEpisodes>(http_request).await {
            Ok(Some(page)) => {
                debug!(count = page.episodes.len(), total_pages = page.total_pages, "Loaded episodes");
                self.publish(CatalogEvent::PageLoaded {
                    page: page.current_page,
                    count: page.episodes.len(),
                    total_pages: page.total_pages,
                });
                page
            }
            Ok(None) => {
                debug!("Episode listing not found");
                PaginatedEpisodes::empty(request.page)
            }
            Err(err) => {
                self.failed("episodes".to_string(), &err);
                PaginatedEpisodes::empty(request.page)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_episode(&self, episode_id: &str) -> Option<Episode> {
        let resource = format!("episodes/{}", encode_component(episode_id));
        match self.fetch_json::<Episode>(HttpRequest::get(self.endpoint(&resource))).await {
            Ok(Some(episode)) => {
                debug!(articles = episode.articles.len(), "Loaded episode");
                self.publish(CatalogEvent::EpisodeLoaded {
                    episode_id: episode.episode_id.clone(),
                });
                Some(episode)
            }
            Ok(None) => {
                debug!("Episode not found");
                None
            }
            Err(err) => {
                self.failed(resource, &err);
                None
            }
        }
    }

    async fn get_article_summary(&self, article_id: &str, language: Language) -> Option<String> {
        self.article_field::<SummaryBody>(article_id, "summary", language)
            .await
            .and_then(|body| body.summary)
    }

    async fn get_article_audio(&self, article_id: &str, language: Language) -> Option<String> {
        self.article_field::<AudioBody>(article_id, "audio", language)
            .await
            .and_then(|body| body.audio_url)
            .filter(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, HttpResponse, RetryPolicy};
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

    fn json(status: u16, body: &'static str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        HttpResponse {
            status,
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_list_episodes_sends_page_and_limit() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| {
                request.full_url() == "https://api.example.com/episodes?page=2&limit=5"
                    && request.headers.get("Accept").map(String::as_str) == Some("application/json")
            })
            .times(1)
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{"episodes":[{"episode_id":"2025-04-09"}],"totalPages":4,"currentPage":2,"totalEpisodes":16}"#,
                ))
            });

        let source = HttpEpisodeSource::new(Arc::new(http), "https://api.example.com/");
        let page = source.list_episodes(PageRequest::new(2, 5)).await;
        assert_eq!(page.episodes.len(), 1);
        assert_eq!(page.total_episodes, 16);
    }

    #[tokio::test]
    async fn test_list_failure_degrades_to_empty_page() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("Connection failed".into())));

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let source =
            HttpEpisodeSource::new(Arc::new(http), "https://api.example.com").with_event_bus(bus);

        let page = source.list_episodes(PageRequest::new(3, 10)).await;
        assert_eq!(page, PaginatedEpisodes::empty(3));
        assert!(matches!(
            events.try_recv(),
            Ok(CoreEvent::Catalog(CatalogEvent::FetchFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_get_episode_missing_is_none() {
        let mut http = MockHttp::new();
        http.expect_execute().returning(|_| Ok(json(404, "")));

        let source = HttpEpisodeSource::new(Arc::new(http), "https://api.example.com");
        assert!(source.get_episode("2025-01-01").await.is_none());
    }

    #[tokio::test]
    async fn test_get_episode_malformed_is_none() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json(200, "<html>maintenance</html>")));

        let source = HttpEpisodeSource::new(Arc::new(http), "https://api.example.com");
        assert!(source.get_episode("2025-01-01").await.is_none());
    }

    #[tokio::test]
    async fn test_article_summary_encodes_id_and_language() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| {
                request.full_url()
                    == "https://api.example.com/articles/a%20b/summary?language=en"
            })
            .times(1)
            .returning(|_| Ok(json(200, r#"{"summary":"Short text"}"#)));

        let source = HttpEpisodeSource::new(Arc::new(http), "https://api.example.com");
        assert_eq!(
            source.get_article_summary("a b", Language::En).await.as_deref(),
            Some("Short text")
        );
    }

    #[tokio::test]
    async fn test_article_audio_empty_url_is_none() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json(200, r#"{"audioUrl":""}"#)));

        let source = HttpEpisodeSource::new(Arc::new(http), "https://api.example.com");
        assert!(source.get_article_audio("a1", Language::Ja).await.is_none());
    }
}
