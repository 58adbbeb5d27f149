//! HTTP fetcher implementation
//!
//! This module handles all binary downloads for the mirror, including:
//! - Building HTTP clients with a proper user agent string
//! - Deriving content-addressed asset filenames
//! - Idempotent, bounded-concurrency asset downloads
//! - Error classification for failed downloads

use crate::config::UserAgentConfig;
use crate::AssetError;
use futures::stream::{self, StreamExt};
use reqwest::{redirect::Policy, Client};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Number of hex characters of the URL hash kept in an asset filename
pub const ASSET_HASH_LEN: usize = 32;

/// Extension used when the URL does not name a known image type
pub const GENERIC_EXTENSION: &str = "bin";

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "avif", "bmp", "ico", "tif", "tiff",
];

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Overall per-request timeout
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::UserAgentConfig;
/// use site_mirror::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Derives the local filename for an asset URL
///
/// The name is the first [`ASSET_HASH_LEN`] hex characters of the SHA-256 of
/// the URL string, plus the URL's own extension when it is a known image
/// type (otherwise [`GENERIC_EXTENSION`]). The same URL always maps to the
/// same name.
///
/// # Examples
///
/// ```
/// use site_mirror::crawler::asset_filename;
///
/// let name = asset_filename("https://example.com/img/Logo.PNG?v=2");
/// assert!(name.ends_with(".png"));
/// assert_eq!(name, asset_filename("https://example.com/img/Logo.PNG?v=2"));
/// ```
pub fn asset_filename(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}.{}", &digest[..ASSET_HASH_LEN], asset_extension(url))
}

/// Picks the file extension for an asset URL
fn asset_extension(url: &str) -> &'static str {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    let Some((_, ext)) = last_segment.rsplit_once('.') else {
        return GENERIC_EXTENSION;
    };

    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|known| **known == ext)
        .copied()
        .unwrap_or(GENERIC_EXTENSION)
}

/// Downloads assets into a shared directory, at most once per URL
///
/// An asset counts as materialized once its file exists; existing files are
/// never fetched again or overwritten.
pub struct AssetFetcher {
    client: Client,
    dir: PathBuf,
    timeout: Duration,
    materialized: Mutex<HashSet<String>>,
    downloads: AtomicUsize,
    failures: AtomicUsize,
}

impl AssetFetcher {
    /// Creates a fetcher writing into `dir`
    pub fn new(client: Client, dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            client,
            dir: dir.into(),
            timeout,
            materialized: Mutex::new(HashSet::new()),
            downloads: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Number of network downloads performed
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::Relaxed)
    }

    /// Number of downloads that failed
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the local filename for `url`, downloading it if needed
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Asset filename (relative to the asset directory)
    /// * `Err(AssetError)` - Download or write failed; nothing was stored
    pub async fn fetch(&self, url: &str) -> Result<String, AssetError> {
        let filename = asset_filename(url);

        if self.is_materialized(&filename).await {
            tracing::trace!("Asset already present: {} -> {}", url, filename);
            return Ok(filename);
        }

        let result = self.download(url, &filename).await;
        match &result {
            Ok(_) => {
                self.downloads.fetch_add(1, Ordering::Relaxed);
                self.mark_materialized(&filename);
                tracing::debug!("Downloaded asset {} -> {}", url, filename);
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        result.map(|_| filename)
    }

    /// Fetches a page's distinct assets with bounded concurrency
    ///
    /// Failures are logged and omitted from the returned map, so callers
    /// leave those references unrewritten.
    ///
    /// # Returns
    ///
    /// Map of absolute asset URL to local filename for every success
    pub async fn fetch_all(&self, urls: &[String], concurrency: usize) -> HashMap<String, String> {
        let results: Vec<(String, Result<String, AssetError>)> = stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let result = self.fetch(&url).await;
                (url, result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut resolved = HashMap::with_capacity(results.len());
        for (url, result) in results {
            match result {
                Ok(filename) => {
                    resolved.insert(url, filename);
                }
                Err(e) => tracing::warn!("Skipping asset: {}", e),
            }
        }
        resolved
    }

    async fn is_materialized(&self, filename: &str) -> bool {
        if self
            .materialized
            .lock()
            .map(|set| set.contains(filename))
            .unwrap_or(false)
        {
            return true;
        }

        if tokio::fs::metadata(self.dir.join(filename)).await.is_ok() {
            self.mark_materialized(filename);
            return true;
        }

        false
    }

    fn mark_materialized(&self, filename: &str) {
        if let Ok(mut set) = self.materialized.lock() {
            set.insert(filename.to_string());
        }
    }

    async fn download(&self, url: &str, filename: &str) -> Result<(), AssetError> {
        let bytes = tokio::time::timeout(self.timeout, self.get_bytes(url))
            .await
            .map_err(|_| AssetError::Timeout {
                url: url.to_string(),
            })??;

        // Write under a temporary name so a partial file never looks materialized
        let target = self.dir.join(filename);
        let partial = self.dir.join(format!("{}.part", filename));
        store(&partial, &target, &bytes).await?;

        Ok(())
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// Writes `bytes` to `partial`, then moves it into place at `target`
///
/// On failure the partial file is removed.
async fn store(partial: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let result = match tokio::fs::write(partial, bytes).await {
        Ok(()) => tokio::fs::rename(partial, target).await,
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(partial).await {
            tracing::trace!("No partial file to remove at {}: {}", partial.display(), e);
        }
    }
    result
}

/// Maps a reqwest error onto the asset error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> AssetError {
    if error.is_timeout() {
        AssetError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        AssetError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        AssetError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
