use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Site-Mirror
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// The page the crawl starts from; its host becomes the target host
    #[serde(default, rename = "seed-url")]
    pub seed_url: String,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Creates a configuration with default settings for the given seed
    pub fn with_seed(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            ..Self::default()
        }
    }

    /// Directory holding one HTML file per persisted page
    pub fn site_dir(&self) -> &Path {
        &self.output.site_dir
    }

    /// Directory holding downloaded assets
    pub fn assets_dir(&self) -> PathBuf {
        self.output.site_dir.join(&self.output.assets_dir)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Safety cap on attempted pages (persisted + skipped)
    #[serde(default = "default_max_pages", rename = "max-pages")]
    pub max_pages: usize,

    /// Bound on a single page navigation (milliseconds)
    #[serde(default = "default_page_timeout", rename = "page-timeout-ms")]
    pub page_timeout_ms: u64,

    /// Bound on the content-marker wait (milliseconds)
    #[serde(default = "default_marker_timeout", rename = "marker-timeout-ms")]
    pub marker_timeout_ms: u64,

    /// Bound on a single asset download (milliseconds)
    #[serde(default = "default_asset_timeout", rename = "asset-timeout-ms")]
    pub asset_timeout_ms: u64,

    /// Maximum simultaneous asset downloads for one page
    #[serde(default = "default_asset_concurrency", rename = "max-concurrent-assets")]
    pub max_concurrent_assets: usize,

    /// Selector (or literal text) whose presence marks a page as ready
    #[serde(default = "default_content_marker", rename = "content-marker")]
    pub content_marker: String,

    /// Open collapsed disclosure widgets before capturing markup
    #[serde(default = "default_true", rename = "expand-disclosures")]
    pub expand_disclosures: bool,
}

impl CrawlerConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_millis(self.marker_timeout_ms)
    }

    pub fn asset_timeout(&self) -> Duration {
        Duration::from_millis(self.asset_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            page_timeout_ms: default_page_timeout(),
            marker_timeout_ms: default_marker_timeout(),
            asset_timeout_ms: default_asset_timeout(),
            max_concurrent_assets: default_asset_concurrency(),
            content_marker: default_content_marker(),
            expand_disclosures: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(default = "default_crawler_name", rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(default = "default_crawler_version", rename = "crawler-version")]
    pub crawler_version: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root of the static mirror
    #[serde(default = "default_site_dir", rename = "site-dir")]
    pub site_dir: PathBuf,

    /// Asset directory name, relative to the site directory
    #[serde(default = "default_assets_dir", rename = "assets-dir")]
    pub assets_dir: String,

    /// Write `manifest.json` next to the pages
    #[serde(default = "default_true", rename = "write-manifest")]
    pub write_manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            site_dir: default_site_dir(),
            assets_dir: default_assets_dir(),
            write_manifest: true,
        }
    }
}

fn default_max_pages() -> usize {
    500
}

fn default_page_timeout() -> u64 {
    30_000
}

fn default_marker_timeout() -> u64 {
    10_000
}

fn default_asset_timeout() -> u64 {
    30_000
}

fn default_asset_concurrency() -> usize {
    6
}

fn default_content_marker() -> String {
    "main, article".to_string()
}

fn default_crawler_name() -> String {
    "SiteMirror".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_site_dir() -> PathBuf {
    PathBuf::from("site")
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_true() -> bool {
    true
}
