use super::*;
use crate::net::api::{ApiError, BlogApi, PostQuery};
use crate::net::types::{AuthRequest, AuthToken, NewPost, PostPage, UserProfile, UserRegistration};
use crate::util::jwt::test_helpers::valid_token;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

// =========================================================================
// PagedApi
// =========================================================================

/// Serves queued pages for `get_posts`; every other call succeeds trivially.
#[derive(Default)]
struct PagedApi {
    pages: Mutex<Vec<Result<PostPage, ApiError>>>,
    queries: Mutex<Vec<PostQuery>>,
    page_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl PagedApi {
    fn new(pages: Vec<Result<PostPage, ApiError>>) -> Self {
        Self { pages: Mutex::new(pages), ..Self::default() }
    }

    fn queries(&self) -> Vec<PostQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BlogApi for PagedApi {
    async fn register(&self, _registration: &UserRegistration) -> Result<(), ApiError> {
        Ok(())
    }

    async fn authenticate(&self, _request: &AuthRequest) -> Result<AuthToken, ApiError> {
        Ok(AuthToken::default())
    }

    async fn get_posts(&self, query: &PostQuery, _token: &AuthToken) -> Result<PostPage, ApiError> {
        self.queries.lock().unwrap().push(query.clone());
        let gate = self.page_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() { Ok(empty_page(0)) } else { pages.remove(0) }
    }

    async fn new_post(&self, draft: &NewPost, _token: &AuthToken) -> Result<Post, ApiError> {
        Ok(Post { id: "new".into(), author_email: draft.author_email.clone(), ..Post::default() })
    }

    async fn update_post(&self, post: &Post, _token: &AuthToken) -> Result<Post, ApiError> {
        Ok(post.clone())
    }

    async fn delete_post(&self, _post_id: &str, _token: &AuthToken) -> Result<(), ApiError> {
        Ok(())
    }

    async fn get_profile(&self, _email: &str, _token: &AuthToken) -> Result<UserProfile, ApiError> {
        Ok(UserProfile::default())
    }
}

// =========================================================================
// Fixtures
// =========================================================================

fn full_page(ids: &[&str]) -> PostPage {
    PostPage {
        total_elements: 100,
        content: ids
            .iter()
            .map(|id| Post { id: (*id).to_owned(), ..Post::default() })
            .collect(),
        ..PostPage::default()
    }
}

fn empty_page(total_elements: u64) -> PostPage {
    PostPage { total_elements, empty: true, ..PostPage::default() }
}

fn feed_with(pages: Vec<Result<PostPage, ApiError>>) -> (Feed, BlogService, Arc<PagedApi>) {
    let api = Arc::new(PagedApi::new(pages));
    let service = BlogService::new(api.clone());
    service
        .restore_session(valid_token("alice@example.com"))
        .unwrap();
    (Feed::new(service.clone(), 4), service, api)
}

// =========================================================================
// construction
// =========================================================================

#[test]
fn new_feed_starts_at_page_zero_when_cache_empty() {
    let (feed, _service, _api) = feed_with(vec![]);
    assert_eq!(feed.page(), 0);
    assert_eq!(feed.page_size(), 4);
    assert_eq!(feed.filter(), &FeedFilter::All);
    assert!(feed.automated_fetch_enabled());
}

#[tokio::test]
async fn new_feed_resumes_after_cached_pages() {
    let (_feed, service, _api) = feed_with(vec![Ok(full_page(&["1", "2", "3", "4", "5", "6"]))]);
    service.fetch_posts(0, 6, None, None).await;

    let feed = Feed::new(service, 4);
    assert_eq!(feed.page(), 1);
}

#[test]
fn zero_page_size_is_clamped() {
    let (_feed, service, _api) = feed_with(vec![]);
    assert_eq!(Feed::new(service, 0).page_size(), 1);
}

// =========================================================================
// load_initial
// =========================================================================

#[tokio::test]
async fn load_initial_fetches_first_page() {
    let (mut feed, _service, api) = feed_with(vec![Ok(full_page(&["1", "2", "3", "4"]))]);

    let outcome = feed.load_initial().await;

    assert_eq!(outcome, Some(FetchOutcome::Fetched { count: 4 }));
    assert_eq!(feed.posts().len(), 4);
    assert_eq!(feed.page(), 1);
    assert_eq!(api.queries()[0].page_number, 0);
    assert_eq!(api.queries()[0].page_size, 4);
}

#[tokio::test]
async fn load_initial_skips_when_cache_has_posts() {
    let (mut feed, _service, api) = feed_with(vec![Ok(full_page(&["1"]))]);
    feed.load_initial().await;

    assert_eq!(feed.load_initial().await, None);
    assert_eq!(api.queries().len(), 1);
}

#[tokio::test]
async fn failed_first_fetch_disables_automation() {
    let (mut feed, _service, api) = feed_with(vec![Ok(empty_page(0))]);

    assert_eq!(feed.load_initial().await, Some(FetchOutcome::NoPostsYet));
    assert!(!feed.automated_fetch_enabled());
    assert_eq!(feed.load_initial().await, None);
    assert_eq!(api.queries().len(), 1);
}

#[tokio::test]
async fn cache_cleared_mid_fetch_keeps_automation() {
    let (release, gate) = oneshot::channel();
    let (mut feed, service, api) = feed_with(vec![Ok(full_page(&["stale"])), Ok(full_page(&["fresh"]))]);
    *api.page_gate.lock().unwrap() = Some(gate);

    let clearing = tokio::spawn({
        let service = service.clone();
        let api = api.clone();
        async move {
            while api.queries().is_empty() {
                tokio::task::yield_now().await;
            }
            service.clear_posts_cache();
            release.send(()).unwrap();
        }
    });

    assert_eq!(feed.load_initial().await, Some(FetchOutcome::Superseded));
    clearing.await.unwrap();

    assert!(feed.automated_fetch_enabled());
    assert_eq!(feed.page(), 0);
    assert_eq!(feed.load_initial().await, Some(FetchOutcome::Fetched { count: 1 }));
    assert_eq!(feed.posts()[0].id, "fresh");
}

// =========================================================================
// load_more
// =========================================================================

#[tokio::test]
async fn load_more_requests_following_pages() {
    let pages = vec![Ok(full_page(&["1", "2", "3", "4"])), Ok(full_page(&["5", "6"])), Ok(empty_page(6))];
    let (mut feed, _service, api) = feed_with(pages);

    feed.load_initial().await;
    assert_eq!(feed.load_more().await, FetchOutcome::Fetched { count: 2 });
    assert_eq!(feed.load_more().await, FetchOutcome::EndOfPosts);

    let requested: Vec<u32> = api.queries().iter().map(|q| q.page_number).collect();
    assert_eq!(requested, vec![0, 1, 2]);
    assert_eq!(feed.page(), 2);
    assert_eq!(feed.posts().len(), 6);
}

#[tokio::test]
async fn load_more_retries_page_after_transport_error() {
    let pages = vec![Err(ApiError::Network("down".into())), Ok(full_page(&["1"]))];
    let (mut feed, _service, api) = feed_with(pages);

    assert!(matches!(feed.load_more().await, FetchOutcome::Transport(_)));
    assert!(feed.load_more().await.is_success());

    let requested: Vec<u32> = api.queries().iter().map(|q| q.page_number).collect();
    assert_eq!(requested, vec![0, 0]);
}

// =========================================================================
// filters
// =========================================================================

#[tokio::test]
async fn set_filter_clears_cache_and_resets_page() {
    let (mut feed, service, _api) = feed_with(vec![Ok(full_page(&["1", "2", "3", "4"]))]);
    feed.load_initial().await;

    assert!(feed.set_filter(FeedFilter::Author("bob@example.com".into())));

    assert_eq!(feed.page(), 0);
    assert_eq!(service.cached_post_count(), 0);
    assert!(feed.automated_fetch_enabled());
}

#[test]
fn same_filter_is_not_a_change() {
    let (mut feed, _service, _api) = feed_with(vec![]);
    assert!(!feed.set_filter(FeedFilter::All));
}

#[tokio::test]
async fn filter_change_reenables_automation() {
    let (mut feed, _service, _api) = feed_with(vec![Ok(empty_page(0))]);
    feed.load_initial().await;
    assert!(!feed.automated_fetch_enabled());

    feed.set_filter(FeedFilter::Own);
    assert!(feed.automated_fetch_enabled());
}

#[tokio::test]
async fn author_filter_sends_author_email() {
    let (mut feed, _service, api) = feed_with(vec![]);
    feed.set_filter(FeedFilter::Author("bob@example.com".into()));

    feed.load_initial().await;

    let query = &api.queries()[0];
    assert_eq!(query.author_email.as_deref(), Some("bob@example.com"));
    assert!(!query.include_non_published);
}

#[tokio::test]
async fn own_filter_uses_subject_and_drafts() {
    let (mut feed, _service, api) = feed_with(vec![]);
    feed.set_filter(FeedFilter::Own);

    feed.load_initial().await;

    let query = &api.queries()[0];
    assert_eq!(query.author_email.as_deref(), Some("alice@example.com"));
    assert!(query.include_non_published);
}
