//! REST client for the blog backend.
//!
//! DESIGN
//! ======
//! `BlogApi` is the seam between the service facade and HTTP. `RestClient`
//! implements it over `reqwest`; tests substitute in-memory mocks.
//! Every authorized call carries the raw JWT in `Authorization` (no
//! `Bearer` prefix), or an empty string when there is no session.
//!
//! ERROR HANDLING
//! ==============
//! Failures surface as `ApiError`. Its `Display` output is the user-facing
//! message; `status()` exposes the HTTP status (0 for transport failures) so
//! callers can react to 401/403 without parsing text.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{AuthRequest, AuthToken, NewPost, Post, PostPage, UserProfile, UserRegistration};
use crate::config::ClientConfig;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const ERROR_PREFIX: &str = "An error occurred: ";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("An error occurred: client-side or network error.")]
    Network(String),

    /// The backend returned a non-success HTTP status.
    #[error("An error occurred: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("An error occurred: unexpected response from the server.")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// HTTP status of the failure; `Some(0)` when no response arrived.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(_) => Some(0),
            Self::Status { status, .. } => Some(*status),
            Self::Parse(_) | Self::HttpClientBuild(_) => None,
        }
    }

    /// True for 401/403, which invalidate the current session.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// User-facing text for a failed `POST /authenticate`.
#[must_use]
pub fn authentication_error_message(error: &ApiError) -> String {
    match error.status() {
        Some(401) => format!("{ERROR_PREFIX}wrong password."),
        Some(400) => format!("{ERROR_PREFIX}user not found."),
        _ => error.to_string(),
    }
}

// =============================================================================
// QUERY
// =============================================================================

/// Parameters for one `GET /post/get` request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub page_number: u32,
    pub page_size: u32,
    /// Restrict to one author; ignored when empty.
    pub author_email: Option<String>,
    /// Include drafts; only sent when true.
    pub include_non_published: bool,
}

impl PostQuery {
    /// Query-string pairs in the order the backend documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("pageNumber", self.page_number.to_string()), ("pageSize", self.page_size.to_string())];
        if let Some(author) = self.author_email.as_deref().filter(|a| !a.is_empty()) {
            pairs.push(("authorEmail", author.to_owned()));
        }
        if self.include_non_published {
            pairs.push(("includeNonPublished", "true".to_owned()));
        }
        pairs
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Backend operations used by the service facade.
#[async_trait]
pub trait BlogApi: Send + Sync {
    /// `POST /user/new`.
    async fn register(&self, registration: &UserRegistration) -> Result<(), ApiError>;

    /// `POST /authenticate`.
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthToken, ApiError>;

    /// `GET /post/get`.
    async fn get_posts(&self, query: &PostQuery, token: &AuthToken) -> Result<PostPage, ApiError>;

    /// `POST /post/new`.
    async fn new_post(&self, draft: &NewPost, token: &AuthToken) -> Result<Post, ApiError>;

    /// `PUT /post/update`.
    async fn update_post(&self, post: &Post, token: &AuthToken) -> Result<Post, ApiError>;

    /// `DELETE /post/delete/{id}`.
    async fn delete_post(&self, post_id: &str, token: &AuthToken) -> Result<(), ApiError>;

    /// `GET /user/profile/{email}`.
    async fn get_profile(&self, email: &str, token: &AuthToken) -> Result<UserProfile, ApiError>;
}

// =============================================================================
// ENDPOINTS
// =============================================================================

fn register_endpoint(base_url: &str) -> String {
    format!("{base_url}/user/new")
}

fn authenticate_endpoint(base_url: &str) -> String {
    format!("{base_url}/authenticate")
}

fn get_posts_endpoint(base_url: &str) -> String {
    format!("{base_url}/post/get")
}

fn new_post_endpoint(base_url: &str) -> String {
    format!("{base_url}/post/new")
}

fn update_post_endpoint(base_url: &str) -> String {
    format!("{base_url}/post/update")
}

fn delete_post_endpoint(base_url: &str, post_id: &str) -> String {
    format!("{base_url}/post/delete/{post_id}")
}

fn profile_endpoint(base_url: &str, email: &str) -> String {
    format!("{base_url}/user/profile/{email}")
}

// =============================================================================
// REQWEST CLIENT
// =============================================================================

/// `BlogApi` over HTTP.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Build a client for `config.base_url`, applying any configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: reqwest::RequestBuilder, token: &AuthToken) -> reqwest::RequestBuilder {
        request
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(AUTHORIZATION, token.authorization_value())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            debug!(status, "backend returned error status");
            return Err(status_error(status, response.text().await));
        }
        response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }
}

/// Error for a non-2xx response. The status wins over a body that failed to
/// arrive, so a 401/403 still expires the session.
fn status_error<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> ApiError {
    let body = body.unwrap_or_else(|e| {
        debug!(status, error = %e, "error body unreadable");
        String::new()
    });
    ApiError::Status { status, body }
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

#[async_trait]
impl BlogApi for RestClient {
    async fn register(&self, registration: &UserRegistration) -> Result<(), ApiError> {
        let url = register_endpoint(&self.base_url);
        debug!(%url, email = %registration.email, "registering user");
        self.send(self.http.post(url).json(registration)).await?;
        Ok(())
    }

    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthToken, ApiError> {
        let url = authenticate_endpoint(&self.base_url);
        debug!(%url, email = %request.email, "authenticating");
        let text = self.send(self.http.post(url).json(request)).await?;
        parse_json(&text)
    }

    async fn get_posts(&self, query: &PostQuery, token: &AuthToken) -> Result<PostPage, ApiError> {
        let url = get_posts_endpoint(&self.base_url);
        debug!(%url, page = query.page_number, size = query.page_size, "fetching posts page");
        let request = self.authorized(self.http.get(url), token).query(&query.query_pairs());
        let text = self.send(request).await?;
        parse_json(&text)
    }

    async fn new_post(&self, draft: &NewPost, token: &AuthToken) -> Result<Post, ApiError> {
        let url = new_post_endpoint(&self.base_url);
        debug!(%url, "submitting new post");
        let request = self.authorized(self.http.post(url), token).json(draft);
        let text = self.send(request).await?;
        parse_json(&text)
    }

    async fn update_post(&self, post: &Post, token: &AuthToken) -> Result<Post, ApiError> {
        let url = update_post_endpoint(&self.base_url);
        debug!(%url, post_id = %post.id, "updating post");
        let request = self.authorized(self.http.put(url), token).json(post);
        let text = self.send(request).await?;
        parse_json(&text)
    }

    async fn delete_post(&self, post_id: &str, token: &AuthToken) -> Result<(), ApiError> {
        let url = delete_post_endpoint(&self.base_url, post_id);
        debug!(%url, "deleting post");
        self.send(self.authorized(self.http.delete(url), token))
            .await?;
        Ok(())
    }

    async fn get_profile(&self, email: &str, token: &AuthToken) -> Result<UserProfile, ApiError> {
        let url = profile_endpoint(&self.base_url, email);
        debug!(%url, "fetching profile");
        let text = self
            .send(self.authorized(self.http.get(url), token))
            .await?;
        parse_json(&text)
    }
}
