//! Crawler module for rendering, rewriting, and persisting pages
//!
//! This module contains the core mirroring logic, including:
//! - The renderer interface and the built-in HTTP renderer
//! - Page snapshot extraction and link/image rewriting
//! - Content-addressed asset downloads
//! - The frontier and overall crawl coordination

mod coordinator;
mod fetcher;
pub(crate) mod markup;
mod parser;
mod renderer;
mod rewriter;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{asset_filename, build_http_client, AssetFetcher};
pub use parser::{resolve_image_source, resolve_link, PageSnapshot};
pub use renderer::{
    expand_static_disclosures, marker_present, HttpRenderer, Navigation, Renderer,
};
pub(crate) use rewriter::mark_external;
pub use rewriter::{LinkRewriter, RewriteStats, RewrittenPage, PENDING_HREF_ATTR};
pub use scheduler::Frontier;

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::MirrorError;

/// Runs a complete mirror operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and prepare the output directory
/// 2. Build the renderer and the asset HTTP client
/// 3. Visit pages breadth-first from the seed until the frontier drains
///    or the page cap is reached
/// 4. Run the link fixup pass over every persisted page
/// 5. Write the manifest and return the run summary
///
/// # Arguments
///
/// * `config` - The mirror configuration
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed (individual pages may have been skipped)
/// * `Err(MirrorError)` - Fatal setup failure
pub async fn crawl(config: Config) -> Result<CrawlSummary, MirrorError> {
    run_crawl(config).await
}
