//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the mirroring process, including:
//! - Validating configuration and preparing the output directory
//! - Managing the frontier queue and the page cap
//! - Driving the renderer, asset fetcher, and link rewriter per page
//! - Persisting pages and recording them as visited
//! - Running the fixup pass and producing the run summary

use crate::config::{validate, Config};
use crate::crawler::fetcher::{build_http_client, AssetFetcher};
use crate::crawler::parser::PageSnapshot;
use crate::crawler::renderer::{HttpRenderer, Renderer};
use crate::crawler::rewriter::LinkRewriter;
use crate::crawler::scheduler::Frontier;
use crate::output::{
    run_fixup, write_manifest, CrawlSummary, SiteWriter, SlugAllocator, MANIFEST_FILE,
};
use crate::state::{PageState, VisitedEntry, VisitedPages};
use crate::url::{extract_host, normalize_url};
use crate::{MirrorError, RenderError, UrlError};
use chrono::{DateTime, Utc};
use url::Url;

/// Main crawler coordinator structure
///
/// Owns every piece of per-run state; nothing outlives [`Coordinator::run`].
pub struct Coordinator<R: Renderer = HttpRenderer> {
    config: Config,
    renderer: R,
    assets: AssetFetcher,
    site: SiteWriter,
    frontier: Frontier,
    visited: VisitedPages,
    slugs: SlugAllocator,
    seed: Url,
    target_host: String,
    skipped: Vec<String>,
    attempted: usize,
    started_at: DateTime<Utc>,
}

impl Coordinator<HttpRenderer> {
    /// Creates a coordinator using the built-in HTTP renderer
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError)` - Fatal setup failure
    pub async fn new(config: Config) -> Result<Self, MirrorError> {
        let renderer = HttpRenderer::new(&config)?;
        Self::with_renderer(config, renderer).await
    }
}

impl<R: Renderer> Coordinator<R> {
    /// Creates a coordinator driving the given renderer
    ///
    /// Validates the configuration, creates the output directories, and
    /// seeds the frontier. Every failure here is fatal for the run.
    pub async fn with_renderer(config: Config, renderer: R) -> Result<Self, MirrorError> {
        validate(&config)?;

        let seed = Url::parse(&normalize_url(&config.seed_url, None))?;
        let target_host = extract_host(&seed).ok_or(UrlError::MissingHost)?;

        let site = SiteWriter::new(config.site_dir(), &config.output.assets_dir);
        site.prepare().await.map_err(|e| {
            MirrorError::Setup(format!(
                "cannot create output directory {}: {}",
                site.root().display(),
                e
            ))
        })?;

        let client = build_http_client(&config.user_agent, config.crawler.asset_timeout())?;
        let assets = AssetFetcher::new(
            client,
            site.assets_dir(),
            config.crawler.asset_timeout(),
        );

        // The seed is always visited, whatever its path looks like
        let mut frontier = Frontier::new(config.crawler.max_pages);
        frontier.enqueue(seed.to_string());

        Ok(Self {
            config,
            renderer,
            assets,
            site,
            frontier,
            visited: VisitedPages::new(),
            slugs: SlugAllocator::new(),
            seed,
            target_host,
            skipped: Vec::new(),
            attempted: 0,
            started_at: Utc::now(),
        })
    }

    /// Runs the main crawl loop
    ///
    /// This is the core crawling logic that:
    /// 1. Takes URLs off the frontier in FIFO order
    /// 2. Renders, rewrites, and persists each page
    /// 3. Stops when the frontier drains or the page cap is reached
    /// 4. Runs the link fixup pass over every persisted page
    ///
    /// Individual page failures never fail the run.
    pub async fn run(mut self) -> Result<CrawlSummary, MirrorError> {
        tracing::info!(
            "Mirroring {} (target host: {}) into {}",
            self.seed,
            self.target_host,
            self.site.root().display()
        );

        let max_pages = self.config.crawler.max_pages;
        let start_time = std::time::Instant::now();

        loop {
            if self.attempted >= max_pages {
                tracing::info!(
                    "Page cap of {} reached, {} URLs left unvisited",
                    max_pages,
                    self.frontier.len()
                );
                break;
            }

            let Some(url) = self.frontier.next_url() else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };
            self.attempted += 1;

            let mut state = PageState::Queued;
            match self.process_url(&url, &mut state).await {
                Ok(filename) => {
                    tracing::info!("Persisted {} -> {}", url, filename);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", url, e);
                    if !state.is_terminal() {
                        if let Err(e) = state.transition(PageState::Skipped) {
                            tracing::debug!("{}", e);
                        }
                    }
                    self.skipped.push(url);
                }
            }

            if self.attempted % 10 == 0 {
                let rate = self.attempted as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages attempted, {} in frontier, {:.2} pages/sec",
                    self.attempted,
                    self.frontier.len(),
                    rate
                );
            }
        }

        let fixup = run_fixup(&self.site, &self.visited).await;
        tracing::info!(
            "Fixup pass: {} provisional links resolved, {} left external, {} URL references replaced",
            fixup.resolved,
            fixup.unresolved,
            fixup.urls_replaced
        );

        let summary = CrawlSummary {
            seed: self.seed.to_string(),
            target_host: self.target_host.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            pages: CrawlSummary::page_records(&self.visited),
            skipped: std::mem::take(&mut self.skipped),
            assets_downloaded: self.assets.downloads(),
            assets_failed: self.assets.failures(),
            rejected_by_cap: self.frontier.rejected_by_cap() + self.frontier.len(),
            fixup,
        };

        if self.config.output.write_manifest {
            let path = self.site.root().join(MANIFEST_FILE);
            if let Err(e) = write_manifest(&summary, &path) {
                tracing::warn!("Failed to write manifest {}: {}", path.display(), e);
            }
        }

        tracing::info!(
            "Crawl completed: {} pages persisted, {} skipped in {:?}",
            summary.pages_persisted(),
            summary.pages_skipped(),
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Processes a single URL through fetching, rendering, and rewriting
    ///
    /// `state` tracks how far the page got, so the caller can move it to
    /// `Skipped` on error.
    ///
    /// # Returns
    ///
    /// The filename the page was persisted under.
    async fn process_url(&mut self, url: &str, state: &mut PageState) -> Result<String, MirrorError> {
        let crawler = &self.config.crawler;

        state.transition(PageState::Fetching)?;
        tracing::debug!("Navigating to {}", url);
        let navigation = self.renderer.navigate(url, crawler.page_timeout()).await?;
        if !navigation.ok {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: navigation.status,
            }
            .into());
        }

        state.transition(PageState::Rendering)?;
        if !self
            .renderer
            .wait_for_marker(&crawler.content_marker, crawler.marker_timeout())
            .await
        {
            tracing::debug!(
                "Content marker {:?} not found on {}, continuing",
                crawler.content_marker,
                url
            );
        }
        if crawler.expand_disclosures {
            let opened = self.renderer.expand_disclosures().await;
            if opened > 0 {
                tracing::debug!("Expanded {} disclosure widgets on {}", opened, url);
            }
        }
        let html = self.renderer.content().await?;

        state.transition(PageState::Rewriting)?;
        // Relative references resolve against where the renderer ended up
        let page_url = Url::parse(&navigation.final_url).or_else(|_| Url::parse(url))?;
        let snapshot = PageSnapshot::capture(html, &page_url);
        tracing::debug!(
            "{}: title {:?}, {} images, {} links",
            url,
            snapshot.title,
            snapshot.images.len(),
            snapshot.links.len()
        );

        let assets = self
            .assets
            .fetch_all(&snapshot.images, crawler.max_concurrent_assets)
            .await;

        let rewritten = LinkRewriter::new(
            &page_url,
            &self.target_host,
            &self.visited,
            &self.slugs,
            &self.config.output.assets_dir,
        )
        .rewrite(&snapshot.html, &assets, &mut self.frontier);
        tracing::trace!("Rewrote {}: {:?}", url, rewritten.stats);

        let filename = self.slugs.allocate(&snapshot.title);
        self.site.write_page(&filename, &rewritten.html).await?;

        state.transition(PageState::Persisted)?;
        let recorded = self.visited.record(
            url,
            VisitedEntry {
                title: snapshot.title,
                filename: filename.clone(),
            },
        );
        if !recorded {
            tracing::warn!("{} was already recorded as visited", url);
        }

        Ok(filename)
    }
}

/// Runs a complete mirror operation with the built-in HTTP renderer
///
/// # Arguments
///
/// * `config` - The mirror configuration
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The frontier drained or the page cap was reached
/// * `Err(MirrorError)` - Fatal setup failure
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::Config;
/// use site_mirror::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::with_seed("https://docs.example.com/Home-0123456789abcdef0123456789abcdef");
/// let summary = run_crawl(config).await?;
/// println!("{} pages mirrored", summary.pages_persisted());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlSummary, MirrorError> {
    Coordinator::new(config).await?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::renderer::Navigation;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const SEED: &str = "https://wiki.example.com/Home-00000000000000000000000000000001";
    const SECOND: &str = "https://wiki.example.com/Second-00000000000000000000000000000002";

    /// Serves canned pages from memory
    struct CannedRenderer {
        pages: HashMap<String, (u16, String)>,
        current: Mutex<Option<String>>,
        navigations: Arc<Mutex<Vec<String>>>,
    }

    impl CannedRenderer {
        fn new(pages: &[(&str, u16, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, status, html)| (url.to_string(), (*status, html.clone())))
                    .collect(),
                current: Mutex::new(None),
                navigations: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Renderer for CannedRenderer {
        async fn navigate(&self, url: &str, _timeout: Duration) -> Result<Navigation, RenderError> {
            self.navigations.lock().unwrap().push(url.to_string());
            let (status, html) = self.pages.get(url).cloned().ok_or_else(|| RenderError::Navigation {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })?;
            let ok = (200..300).contains(&status);
            *self.current.lock().unwrap() = ok.then_some(html);
            Ok(Navigation {
                ok,
                status,
                final_url: url.to_string(),
            })
        }

        async fn wait_for_marker(&self, _marker: &str, _timeout: Duration) -> bool {
            true
        }

        async fn expand_disclosures(&self) -> usize {
            0
        }

        async fn content(&self) -> Result<String, RenderError> {
            self.current.lock().unwrap().clone().ok_or(RenderError::NoPage)
        }
    }

    fn test_config(site_dir: &Path, max_pages: usize) -> Config {
        let mut config = Config::with_seed(SEED);
        config.crawler.max_pages = max_pages;
        config.output.site_dir = site_dir.to_path_buf();
        config
    }

    fn page(title: &str, body: &str) -> String {
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        )
    }

    #[tokio::test]
    async fn test_two_pages_with_forward_link() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = CannedRenderer::new(&[
            (
                SEED,
                200,
                page(
                    "Home",
                    &format!(r#"<a href="{}">Next page</a><a href="https://other.org/">Out</a>"#, SECOND),
                ),
            ),
            (SECOND, 200, page("Second", &format!(r#"<a href="{}">Back</a>"#, SEED))),
        ]);

        let coordinator = Coordinator::with_renderer(test_config(dir.path(), 10), renderer)
            .await
            .unwrap();
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.pages_persisted(), 2);
        assert_eq!(summary.pages[0].filename, "home.html");
        assert_eq!(summary.pages[1].filename, "second.html");

        let home = std::fs::read_to_string(dir.path().join("home.html")).unwrap();
        assert!(home.contains(r#"<a href="second.html">Next page</a>"#));
        assert!(home.contains(r#"target="_blank""#));
        assert!(!home.contains("data-mirror-href"));

        let second = std::fs::read_to_string(dir.path().join("second.html")).unwrap();
        assert!(second.contains(r#"<a href="home.html">Back</a>"#));

        assert!(dir.path().join(MANIFEST_FILE).is_file());
    }

    #[tokio::test]
    async fn test_failed_seed_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = CannedRenderer::new(&[(SEED, 404, String::new())]);

        let summary = Coordinator::with_renderer(test_config(dir.path(), 10), renderer)
            .await
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.pages_persisted(), 0);
        assert_eq!(summary.skipped, vec![SEED.to_string()]);
    }

    #[tokio::test]
    async fn test_page_cap_bounds_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let links: String = (2..=9)
            .map(|n| format!(r#"<a href="/P{0}-{0:032x}">Page {0}</a>"#, n))
            .collect();
        let renderer = CannedRenderer::new(&[(SEED, 200, page("Home", &links))]);

        let summary = Coordinator::with_renderer(test_config(dir.path(), 3), renderer)
            .await
            .unwrap()
            .run()
            .await
            .unwrap();

        // Seed persisted, two more attempted (unknown to the renderer, so skipped)
        assert_eq!(summary.pages_persisted(), 1);
        assert_eq!(summary.pages_skipped(), 2);
        assert!(summary.rejected_by_cap > 0);
    }

    #[tokio::test]
    async fn test_invalid_seed_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), 10);
        config.seed_url = "not a url".to_string();

        let result = Coordinator::with_renderer(config, CannedRenderer::new(&[])).await;
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }

    #[tokio::test]
    async fn test_each_url_navigated_once() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            r#"<a href="{s}">Self</a><a href="{t}">T</a><a href="{t}#x">T again</a>"#,
            s = SEED,
            t = SECOND
        );
        let renderer = CannedRenderer::new(&[
            (SEED, 200, page("Home", &body)),
            (SECOND, 200, page("T", &body)),
        ]);

        let navigations = Arc::clone(&renderer.navigations);

        let summary = Coordinator::with_renderer(test_config(dir.path(), 10), renderer)
            .await
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.pages_persisted(), 2);
        assert_eq!(
            *navigations.lock().unwrap(),
            vec![SEED.to_string(), SECOND.to_string()]
        );
    }
}
