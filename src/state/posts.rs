//! Session cache of fetched posts and author profiles.
//!
//! DESIGN
//! ======
//! Posts keep the order the view renders them in: pages are appended as they
//! arrive, posts written in this session are prepended. A `HashSet` of ids
//! sits beside the sequence so duplicate detection stays O(1) no matter how
//! far the reader has paged. Author profiles live in a separate map that
//! survives `clear_posts_cache`.
//!
//! There is no eviction; the cache lives as long as the session.

#[cfg(test)]
#[path = "posts_test.rs"]
mod posts_test;

use std::collections::{HashMap, HashSet};

use crate::net::types::{Post, UserProfile};

/// Deduplicated, ordered post store plus author lookup.
#[derive(Debug, Default)]
pub struct PostsCache {
    posts: Vec<Post>,
    ids: HashSet<String>,
    authors: HashMap<String, UserProfile>,
}

impl PostsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // POSTS
    // =========================================================================

    /// Append `post` unless its id is already cached. Returns whether it was added.
    pub fn add_to_posts_cache(&mut self, post: Post) -> bool {
        if !self.ids.insert(post.id.clone()) {
            return false;
        }
        self.posts.push(post);
        true
    }

    /// Prepend `post` unless its id is already cached. Returns whether it was added.
    pub fn add_first_to_posts_cache(&mut self, post: Post) -> bool {
        if !self.ids.insert(post.id.clone()) {
            return false;
        }
        self.posts.insert(0, post);
        true
    }

    /// Remove the post with `id`, if cached.
    pub fn delete_post_from_cache(&mut self, id: &str) -> Option<Post> {
        if !self.ids.remove(id) {
            return None;
        }
        let index = self.posts.iter().position(|p| p.id == id)?;
        Some(self.posts.remove(index))
    }

    /// Replace the cached post sharing `post.id`, keeping its position.
    /// Returns false when the id is not cached.
    pub fn update_post_in_cache(&mut self, post: Post) -> bool {
        if !self.ids.contains(&post.id) {
            return false;
        }
        match self.posts.iter_mut().find(|p| p.id == post.id) {
            Some(slot) => {
                *slot = post;
                true
            }
            None => false,
        }
    }

    /// Drop every cached post. Author profiles are kept.
    pub fn clear_posts_cache(&mut self) {
        self.posts.clear();
        self.ids.clear();
    }

    /// Cached posts in display order.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn contains_post(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    /// Store `profile` under its email, or under the no-email sentinel.
    pub fn add_to_authors_cache(&mut self, profile: UserProfile) {
        let key = profile.cache_key().to_owned();
        self.authors.insert(key, profile);
    }

    /// Store `profile` under `key` regardless of the email it carries.
    pub fn add_to_authors_cache_as(&mut self, key: &str, profile: UserProfile) {
        self.authors.insert(key.to_owned(), profile);
    }

    #[must_use]
    pub fn get_author(&self, email: &str) -> Option<&UserProfile> {
        self.authors.get(email)
    }

    #[must_use]
    pub fn has_author(&self, email: &str) -> bool {
        self.authors.contains_key(email)
    }
}
