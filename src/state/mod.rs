//! Client-side state containers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` tracks the current session and `posts` caches what the reader has
//! fetched so far. Both are owned by the service facade.

pub mod auth;
pub mod posts;
