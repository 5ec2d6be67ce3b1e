//! Client core for the blog backend.
//!
//! Owns everything a blog front end needs below the view layer: the REST
//! client, the session and posts caches, and the facade that ties them
//! together. The `blog-cli` binary in this workspace is one such front end.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Environment-driven [`config::ClientConfig`] |
//! | [`net`] | Wire DTOs and the [`net::api::BlogApi`] REST client |
//! | [`state`] | Session holder and posts/authors cache |
//! | [`services`] | [`services::blog::BlogService`] facade and feed paginator |
//! | [`util`] | JWT inspection |

pub mod config;
pub mod net;
pub mod services;
pub mod state;
pub mod util;
