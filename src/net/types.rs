//! Wire DTOs for the blog backend REST boundary.
//!
//! DESIGN
//! ======
//! Field names follow the backend's camelCase JSON. Response types default
//! every field so partially populated envelopes still deserialize; request
//! types serialize exactly what the backend expects.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// Key under which profiles without an email are stored in the author cache.
pub const NO_EMAIL_KEY: &str = "nokey";

/// A single blog entry. Identity is `id`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Post {
    /// Backend-assigned identifier.
    pub id: String,
    /// Email of the author.
    pub author_email: String,
    /// Backend creation timestamp as sent on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Post body.
    pub content: String,
    /// Whether the post is visible to other users.
    pub published: bool,
}

/// Pagination envelope returned by `GET /post/get`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostPage {
    pub total_pages: u32,
    pub total_elements: u64,
    /// Requested page size.
    pub size: u32,
    /// Zero-based page index.
    pub number: u32,
    /// Number of posts on this page.
    pub number_of_elements: u32,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
    pub content: Vec<Post>,
}

/// Public profile of a user, keyed by email.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub email: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Free-form bio.
    pub about: Option<String>,
}

impl UserProfile {
    /// Author-cache key: the email, or [`NO_EMAIL_KEY`] when absent or empty.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => email,
            _ => NO_EMAIL_KEY,
        }
    }
}

/// Credentials for `POST /authenticate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

/// Bearer token returned by `POST /authenticate`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthToken {
    pub jwt: Option<String>,
}

impl AuthToken {
    #[must_use]
    pub fn new(jwt: impl Into<String>) -> Self {
        Self { jwt: Some(jwt.into()) }
    }

    /// Value for the `Authorization` header: the raw JWT or an empty string.
    #[must_use]
    pub fn authorization_value(&self) -> &str {
        self.jwt.as_deref().unwrap_or("")
    }
}

/// Draft submitted to `POST /post/new`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub author_email: String,
    pub content: String,
    pub published: bool,
}

/// Account details submitted to `POST /user/new`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Empty string when the user left it blank.
    pub about: String,
}
