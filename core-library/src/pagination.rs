//! Pagination helper types for episode listings

use crate::models::EpisodeSummary;
use serde::{Deserialize, Serialize};

/// Pagination request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Current page number (1-indexed, as the API counts)
    pub page: u32,
    /// Number of episodes per page
    pub limit: u32,
}

impl PageRequest {
    /// Create a new page request. Page 0 is treated as page 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::PageRequest;
    ///
    /// let request = PageRequest::new(2, 20);
    /// assert_eq!(request.page, 2);
    /// assert_eq!(request.offset(), 20);
    /// ```
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit,
        }
    }

    /// Number of episodes before this page
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn next(&self) -> Self {
        Self::new(self.page.saturating_add(1), self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// One page of the episode listing, as returned by `GET /episodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedEpisodes {
    #[serde(default)]
    pub episodes: Vec<EpisodeSummary>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_episodes: u32,
}

impl PaginatedEpisodes {
    /// What a failed listing degrades to.
    pub fn empty(page: u32) -> Self {
        Self {
            episodes: Vec::new(),
            total_pages: 0,
            current_page: page,
            total_episodes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Check if there are more pages after the current one
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Check if there are pages before the current one
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Page numbers for a pager, `1..=total_pages`.
    pub fn page_numbers(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_default() {
        let request = PageRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_page_request_clamps_zero_page() {
        let request = PageRequest::new(0, 10);
        assert_eq!(request.page, 1);
        assert_eq!(request.next().page, 2);
    }

    #[test]
    fn test_envelope_is_camel_case() {
        let json = r#"{
            "episodes": [{"episode_id": "2025-04-09", "title": "T", "created_at": "2025-04-09 06:00:00", "article_count": 5, "source": "s"}],
            "totalPages": 3,
            "currentPage": 2,
            "totalEpisodes": 25
        }"#;
        let page: PaginatedEpisodes = serde_json::from_str(json).unwrap();
        assert_eq!(page.episodes.len(), 1);
        assert_eq!(page.episodes[0].article_count, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
        assert!(page.has_previous());
        assert_eq!(page.page_numbers().count(), 3);
    }

    #[test]
    fn test_empty_page() {
        let page = PaginatedEpisodes::empty(4);
        assert!(page.is_empty());
        assert_eq!(page.current_page, 4);
        assert!(!page.has_next());
    }
}
