//! Blog service facade: page-level operations over API, cache, and session.
//!
//! DESIGN
//! ======
//! `BlogService` is a cheaply cloneable handle. It owns the `BlogApi`, the
//! posts cache, the session holder, the set of in-flight profile lookups,
//! and a filter epoch. Views call into it and render the returned status;
//! they never touch the API directly.
//!
//! Fetch results are reported as a tagged `FetchOutcome`. "Nothing to show"
//! and "end of pagination" are distinct variants rather than failures, yet
//! still convert into the legacy `CompletionStatus` text shape.
//!
//! Clearing the posts cache bumps the filter epoch. A page response whose
//! request was issued under an older epoch is dropped instead of written
//! into a cache that now belongs to a different filter.
//!
//! ERROR HANDLING
//! ==============
//! A 401/403 from any authorized call clears the session so the user is
//! prompted to log in again. Nothing is retried automatically.

#[cfg(test)]
#[path = "blog_test.rs"]
mod blog_test;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::net::api::{ApiError, BlogApi, PostQuery, RestClient, authentication_error_message};
use crate::net::types::{AuthRequest, AuthToken, NewPost, Post, PostPage, UserProfile, UserRegistration};
use crate::state::auth::{AuthState, AuthenticatedUser};
use crate::state::posts::PostsCache;
use crate::util::jwt::{self, JwtError};

pub const POSTS_FETCHED_MESSAGE: &str = "Posts fetched.";
pub const NO_POSTS_MESSAGE: &str = "There are no posts yet.";
pub const END_OF_POSTS_MESSAGE: &str = "You have reached the end of the posts.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired or is corrupted. Please log in again.";
pub const SUPERSEDED_MESSAGE: &str = "Discarded posts fetched for a previous filter.";
pub const PASSWORD_MISMATCH_MESSAGE: &str =
    "The re-entered password does not match. \nPlease ensure you enter the same password in the two fields.";
pub const REGISTRATION_SUCCESS_MESSAGE: &str = "Registration successful. You can now log in.";
pub const LOGIN_SUCCESS_MESSAGE: &str = "Logged in successfully.";
pub const INVALID_TOKEN_MESSAGE: &str = "An error occurred: the server returned an invalid token.";
pub const POST_SUBMITTED_MESSAGE: &str = "Your post was submitted.";
pub const POST_UPDATED_MESSAGE: &str = "Your post was updated.";
pub const POST_DELETED_MESSAGE: &str = "Your post was deleted.";

// =============================================================================
// STATUS TYPES
// =============================================================================

/// Success flag plus user-facing message, as rendered by views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionStatus {
    pub executed_successfully: bool,
    pub message: String,
}

impl CompletionStatus {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self { executed_successfully: true, message: message.into() }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self { executed_successfully: false, message: message.into() }
    }
}

/// Result of one `fetch_posts` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page had posts; `count` of them arrived (duplicates included).
    Fetched { count: usize },
    /// The backend has no posts matching the filter at all.
    NoPostsYet,
    /// Paged past the last post.
    EndOfPosts,
    /// The session was rejected and has been cleared.
    AuthExpired,
    /// The filter changed while the request was in flight; nothing was cached.
    Superseded,
    /// Any other failure, with its user-facing text.
    Transport(String),
}

impl FetchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }

    /// User-facing message for this outcome.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Fetched { .. } => POSTS_FETCHED_MESSAGE,
            Self::NoPostsYet => NO_POSTS_MESSAGE,
            Self::EndOfPosts => END_OF_POSTS_MESSAGE,
            Self::AuthExpired => SESSION_EXPIRED_MESSAGE,
            Self::Superseded => SUPERSEDED_MESSAGE,
            Self::Transport(message) => message,
        }
    }
}

impl From<&FetchOutcome> for CompletionStatus {
    fn from(outcome: &FetchOutcome) -> Self {
        Self { executed_successfully: outcome.is_success(), message: outcome.message().to_owned() }
    }
}

impl From<FetchOutcome> for CompletionStatus {
    fn from(outcome: FetchOutcome) -> Self {
        Self::from(&outcome)
    }
}

/// Outcome for a page that was accepted into the cache.
fn classify_page(page: &PostPage) -> FetchOutcome {
    match (page.empty, page.total_elements) {
        (true, 0) => FetchOutcome::NoPostsYet,
        (true, _) => FetchOutcome::EndOfPosts,
        (false, _) => FetchOutcome::Fetched { count: page.content.len() },
    }
}

/// Registration form as entered, before the password confirmation check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    pub last_name: String,
    pub about: Option<String>,
}

impl RegistrationForm {
    /// Convert into the wire DTO, or `None` when the passwords differ.
    #[must_use]
    pub fn into_registration(self) -> Option<UserRegistration> {
        if self.password != self.password_confirmation {
            return None;
        }
        Some(UserRegistration {
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            about: self.about.unwrap_or_default(),
        })
    }
}

// =============================================================================
// SERVICE
// =============================================================================

struct Inner {
    api: Arc<dyn BlogApi>,
    cache: Mutex<PostsCache>,
    auth: AuthState,
    profiles_in_flight: Mutex<HashSet<String>>,
    filter_epoch: AtomicU64,
}

/// Facade over the REST client, posts cache, and session state.
#[derive(Clone)]
pub struct BlogService {
    inner: Arc<Inner>,
}

impl BlogService {
    #[must_use]
    pub fn new(api: Arc<dyn BlogApi>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                cache: Mutex::new(PostsCache::new()),
                auth: AuthState::new(),
                profiles_in_flight: Mutex::new(HashSet::new()),
                filter_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Build a service talking HTTP to `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = RestClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    fn cache(&self) -> MutexGuard<'_, PostsCache> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<String>> {
        self.inner
            .profiles_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Log in and publish the new session.
    pub async fn authenticate_user(&self, request: AuthRequest) -> CompletionStatus {
        let token = match self.inner.api.authenticate(&request).await {
            Ok(token) => token,
            Err(e) => {
                warn!(email = %request.email, error = %e, "authentication failed");
                return CompletionStatus::failure(authentication_error_message(&e));
            }
        };

        match jwt::decode_claims(&token) {
            Ok(claims) => {
                info!(email = %request.email, "authenticated");
                self.inner
                    .auth
                    .set_authentication(AuthenticatedUser::new(claims.sub, Some(token)));
                CompletionStatus::success(LOGIN_SUCCESS_MESSAGE)
            }
            Err(e) => {
                warn!(error = %e, "backend returned an undecodable token");
                CompletionStatus::failure(INVALID_TOKEN_MESSAGE)
            }
        }
    }

    /// Adopt a previously issued token as the current session.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded or has expired.
    pub fn restore_session(&self, token: AuthToken) -> Result<AuthenticatedUser, JwtError> {
        let claims = jwt::decode_claims(&token)?;
        if jwt::is_token_expired(&token) {
            return Err(JwtError::Expired);
        }
        let user = AuthenticatedUser::new(claims.sub, Some(token));
        self.inner.auth.set_authentication(user.clone());
        Ok(user)
    }

    /// Log out.
    pub fn clear_authentication(&self) {
        self.inner.auth.clear_authentication();
    }

    #[must_use]
    pub fn get_authentication(&self) -> AuthenticatedUser {
        self.inner.auth.get_authentication()
    }

    /// Session changes from now on; see [`AuthState::subscribe`].
    #[must_use]
    pub fn subscribe_authentication(&self) -> broadcast::Receiver<AuthenticatedUser> {
        self.inner.auth.subscribe()
    }

    #[must_use]
    pub fn auth_state(&self) -> &AuthState {
        &self.inner.auth
    }

    /// Token for the next request, or `None` when the session has expired
    /// locally (in which case it has already been cleared).
    fn bearer_token(&self) -> Option<AuthToken> {
        let user = self.inner.auth.get_authentication();
        if !user.has_token() {
            return Some(AuthToken::default());
        }
        let token = user.bearer();
        if jwt::is_token_expired(&token) {
            warn!(subject = user.subject_id.as_deref().unwrap_or("-"), "session token expired");
            self.inner.auth.clear_authentication();
            return None;
        }
        Some(token)
    }

    fn expire_session(&self, error: &ApiError) {
        warn!(status = ?error.status(), "backend rejected session; clearing");
        self.inner.auth.clear_authentication();
    }

    /// Map a failed authorized call to a status, clearing the session on 401/403.
    fn failure_status(&self, error: &ApiError) -> CompletionStatus {
        if error.is_auth_failure() {
            self.expire_session(error);
            return CompletionStatus::failure(SESSION_EXPIRED_MESSAGE);
        }
        CompletionStatus::failure(error.to_string())
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Create an account.
    pub async fn register_user(&self, registration: UserRegistration) -> CompletionStatus {
        match self.inner.api.register(&registration).await {
            Ok(()) => {
                info!(email = %registration.email, "registered");
                CompletionStatus::success(REGISTRATION_SUCCESS_MESSAGE)
            }
            Err(e) => {
                warn!(email = %registration.email, error = %e, "registration failed");
                CompletionStatus::failure(e.to_string())
            }
        }
    }

    /// Check the password confirmation locally, then register.
    pub async fn register_with_confirmation(&self, form: RegistrationForm) -> CompletionStatus {
        match form.into_registration() {
            Some(registration) => self.register_user(registration).await,
            None => CompletionStatus::failure(PASSWORD_MISMATCH_MESSAGE),
        }
    }

    // =========================================================================
    // POSTS
    // =========================================================================

    /// Fetch one page of posts into the cache.
    ///
    /// `author_email` restricts to one author; `include_non_published`
    /// additionally returns that author's drafts.
    pub async fn fetch_posts(
        &self,
        page_number: u32,
        page_size: u32,
        author_email: Option<&str>,
        include_non_published: Option<bool>,
    ) -> FetchOutcome {
        let Some(token) = self.bearer_token() else {
            return FetchOutcome::AuthExpired;
        };

        let query = PostQuery {
            page_number,
            page_size,
            author_email: author_email.map(str::to_owned),
            include_non_published: include_non_published.unwrap_or(false),
        };
        let epoch = self.inner.filter_epoch.load(Ordering::SeqCst);

        let page = match self.inner.api.get_posts(&query, &token).await {
            Ok(page) => page,
            Err(e) if e.is_auth_failure() => {
                self.expire_session(&e);
                return FetchOutcome::AuthExpired;
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "fetching posts failed");
                return FetchOutcome::Transport(e.to_string());
            }
        };

        let mut cache = self.cache();
        if self.inner.filter_epoch.load(Ordering::SeqCst) != epoch {
            debug!(page = page_number, "dropping page fetched under a previous filter");
            return FetchOutcome::Superseded;
        }
        for post in &page.content {
            cache.add_to_posts_cache(post.clone());
        }
        drop(cache);

        let outcome = classify_page(&page);
        debug!(page = page_number, outcome = ?outcome, "posts page processed");
        outcome
    }

    /// Submit a draft; the created post is shown first without a refetch.
    pub async fn new_post(&self, draft: NewPost) -> CompletionStatus {
        let Some(token) = self.bearer_token() else {
            return CompletionStatus::failure(SESSION_EXPIRED_MESSAGE);
        };
        match self.inner.api.new_post(&draft, &token).await {
            Ok(post) => {
                info!(post_id = %post.id, "post created");
                self.cache().add_first_to_posts_cache(post);
                CompletionStatus::success(POST_SUBMITTED_MESSAGE)
            }
            Err(e) => self.failure_status(&e),
        }
    }

    /// Save edits to an existing post and refresh it in place.
    pub async fn update_post(&self, post: Post) -> CompletionStatus {
        let Some(token) = self.bearer_token() else {
            return CompletionStatus::failure(SESSION_EXPIRED_MESSAGE);
        };
        match self.inner.api.update_post(&post, &token).await {
            Ok(updated) => {
                info!(post_id = %updated.id, "post updated");
                self.cache().update_post_in_cache(updated);
                CompletionStatus::success(POST_UPDATED_MESSAGE)
            }
            Err(e) => self.failure_status(&e),
        }
    }

    /// Delete a post and drop it from the cache.
    pub async fn delete_post(&self, post_id: &str) -> CompletionStatus {
        let Some(token) = self.bearer_token() else {
            return CompletionStatus::failure(SESSION_EXPIRED_MESSAGE);
        };
        match self.inner.api.delete_post(post_id, &token).await {
            Ok(()) => {
                info!(%post_id, "post deleted");
                self.cache().delete_post_from_cache(post_id);
                CompletionStatus::success(POST_DELETED_MESSAGE)
            }
            Err(e) => self.failure_status(&e),
        }
    }

    /// Cached posts in display order.
    #[must_use]
    pub fn get_posts(&self) -> Vec<Post> {
        self.cache().posts().to_vec()
    }

    #[must_use]
    pub fn cached_post_count(&self) -> usize {
        self.cache().len()
    }

    /// Empty the posts cache and invalidate in-flight page requests.
    pub fn clear_posts_cache(&self) {
        let mut cache = self.cache();
        self.inner.filter_epoch.fetch_add(1, Ordering::SeqCst);
        cache.clear_posts_cache();
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    /// Cached profile for `email`, or an empty placeholder while a background
    /// fetch fills the cache. Re-query after the view refreshes.
    #[must_use]
    pub fn get_profile_by_email(&self, email: &str) -> UserProfile {
        let cached = self.cache().get_author(email).cloned();
        if let Some(profile) = cached {
            return profile;
        }
        self.spawn_profile_fetch(email);
        UserProfile::default()
    }

    #[must_use]
    pub fn has_author(&self, email: &str) -> bool {
        self.cache().has_author(email)
    }

    fn spawn_profile_fetch(&self, email: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(%email, "no async runtime; profile fetch skipped");
            return;
        };
        if !self.in_flight().insert(email.to_owned()) {
            debug!(%email, "profile fetch already in flight");
            return;
        }

        let service = self.clone();
        let email = email.to_owned();
        runtime.spawn(async move {
            if let Err(e) = service.resolve_profile(&email).await {
                warn!(%email, error = %e, "background profile fetch failed");
            }
            service.in_flight().remove(&email);
        });
    }

    /// Cache `profile` under its own email and, when that differs, under the
    /// requested one too so later lookups for `requested` hit the cache.
    fn store_profile(&self, requested: &str, profile: &UserProfile) {
        let mut cache = self.cache();
        if profile.cache_key() != requested {
            debug!(%requested, returned = profile.cache_key(), "profile email differs from request");
            cache.add_to_authors_cache_as(requested, profile.clone());
        }
        cache.add_to_authors_cache(profile.clone());
        debug!(email = %requested, "profile cached");
    }

    /// Fetch the profile for `email` (cache first) and wait for it.
    ///
    /// # Errors
    ///
    /// Returns the backend error; a 401/403 also clears the session.
    pub async fn resolve_profile(&self, email: &str) -> Result<UserProfile, ApiError> {
        let cached = self.cache().get_author(email).cloned();
        if let Some(profile) = cached {
            return Ok(profile);
        }
        let Some(token) = self.bearer_token() else {
            return Err(ApiError::Status { status: 401, body: SESSION_EXPIRED_MESSAGE.to_owned() });
        };

        match self.inner.api.get_profile(email, &token).await {
            Ok(profile) => {
                self.store_profile(email, &profile);
                Ok(profile)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    self.expire_session(&e);
                }
                Err(e)
            }
        }
    }
}
