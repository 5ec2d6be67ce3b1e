//! Application services.
//!
//! SYSTEM CONTEXT
//! ==============
//! `blog` is the facade views call for every backend operation. `feed`
//! layers page-by-page reading with author and own-post filters on top.

pub mod blog;
pub mod feed;
