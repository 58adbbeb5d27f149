//! URL handling module for Site-Mirror
//!
//! This module provides URL normalization (the crawl's dedup key), host
//! extraction, and the page classifier that decides what is in scope.

mod classify;
mod domain;
mod normalize;

// Re-export main functions
pub use classify::{has_page_id, is_in_scope};
pub use domain::extract_host;
pub use normalize::{normalize_url, parse_web_url};
