//! State module for tracking crawl progress
//!
//! This module provides the per-run crawl state.
//!
//! # Components
//!
//! - `PageState`: Tracks a single URL through queued, fetching, rendering, rewriting, and its terminal state
//! - `VisitedPages`: Maps each persisted page's normalized URL to its title and final filename

mod page_state;
mod visited;

// Re-export main types
pub use page_state::PageState;
pub use visited::{VisitedEntry, VisitedPages};
