//! Feed paginator over `BlogService`: page-by-page reading per filter.
//!
//! SYSTEM CONTEXT
//! ==============
//! A reader view owns one `Feed`. The feed decides which page to ask for
//! next and with which author/draft filters; the service does the fetching
//! and caching.
//!
//! DESIGN
//! ======
//! Fetching methods take `&mut self`, so at most one fetch per feed is in
//! flight. `page` is the next page to request; it only advances when a page
//! actually returned posts, so an empty or failed page is retried next time.
//! A failed first fetch disables automated loading until the filter changes;
//! a superseded one does not.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use tracing::{debug, info};

use super::blog::{BlogService, FetchOutcome};
use crate::net::types::Post;

/// Which posts the feed shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FeedFilter {
    /// Every published post.
    #[default]
    All,
    /// Published posts by one author email.
    Author(String),
    /// The session user's posts, drafts included.
    Own,
}

/// Paginated view over the shared posts cache.
pub struct Feed {
    service: BlogService,
    filter: FeedFilter,
    page: u32,
    page_size: u32,
    automated_fetch_disabled: bool,
}

impl Feed {
    /// Resume from whatever the cache already holds: the first page requested
    /// is `cached_len / page_size`. A partially cached page is requested again
    /// and deduplicated by the cache.
    #[must_use]
    pub fn new(service: BlogService, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let cached = u32::try_from(service.cached_post_count()).unwrap_or(u32::MAX);
        Self {
            service,
            filter: FeedFilter::All,
            page: cached / page_size,
            page_size,
            automated_fetch_disabled: false,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    /// Zero-based index of the page the next fetch requests.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn automated_fetch_enabled(&self) -> bool {
        !self.automated_fetch_disabled
    }

    /// Posts to render, in display order.
    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        self.service.get_posts()
    }

    /// Switch filters. A change empties the cache and restarts at page 0.
    /// Returns whether the filter changed.
    pub fn set_filter(&mut self, filter: FeedFilter) -> bool {
        if filter == self.filter {
            return false;
        }
        info!(from = ?self.filter, to = ?filter, "feed filter changed");
        self.service.clear_posts_cache();
        self.filter = filter;
        self.page = 0;
        self.automated_fetch_disabled = false;
        true
    }

    /// Fetch the current page if nothing is cached yet.
    ///
    /// Returns `None` when the cache already has posts or a previous first
    /// fetch failed. A response dropped because the cache was cleared
    /// mid-flight does not count as a failure.
    pub async fn load_initial(&mut self) -> Option<FetchOutcome> {
        if self.automated_fetch_disabled || self.service.cached_post_count() > 0 {
            return None;
        }
        let outcome = self.fetch_next().await;
        if !outcome.is_success() && outcome != FetchOutcome::Superseded {
            debug!(outcome = ?outcome, "first fetch failed; automated fetching disabled");
            self.automated_fetch_disabled = true;
        }
        Some(outcome)
    }

    /// Fetch the next page.
    pub async fn load_more(&mut self) -> FetchOutcome {
        self.fetch_next().await
    }

    async fn fetch_next(&mut self) -> FetchOutcome {
        let outcome = self.fetch_page(self.page).await;
        if outcome.is_success() {
            self.page = self.page.saturating_add(1);
        }
        outcome
    }

    async fn fetch_page(&self, page: u32) -> FetchOutcome {
        match &self.filter {
            FeedFilter::All => {
                self.service
                    .fetch_posts(page, self.page_size, None, None)
                    .await
            }
            FeedFilter::Author(email) => {
                self.service
                    .fetch_posts(page, self.page_size, Some(email.as_str()), None)
                    .await
            }
            FeedFilter::Own => {
                let subject = self.service.get_authentication().subject_id;
                self.service
                    .fetch_posts(page, self.page_size, subject.as_deref(), Some(true))
                    .await
            }
        }
    }
}
