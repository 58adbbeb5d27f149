//! Run summary and manifest
//!
//! The summary is printed at the end of every run. When enabled, a
//! `manifest.json` describing the mirror is written next to the pages.

use crate::output::FixupStats;
use crate::state::VisitedPages;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Name of the manifest file inside the site directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// One persisted page, as listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub filename: String,
}

/// Outcome of one crawl run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    /// Seed URL the crawl started from
    pub seed: String,

    /// Host that in-scope pages live on
    pub target_host: String,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Persisted pages in visit order
    pub pages: Vec<PageRecord>,

    /// URLs that were attempted but skipped
    pub skipped: Vec<String>,

    /// Assets fetched over the network this run
    #[serde(skip)]
    pub assets_downloaded: usize,

    /// Asset downloads that failed
    #[serde(skip)]
    pub assets_failed: usize,

    /// In-scope URLs never visited because the page cap was reached
    #[serde(skip)]
    pub rejected_by_cap: usize,

    #[serde(skip)]
    pub fixup: FixupStats,
}

impl CrawlSummary {
    /// Lists persisted pages from the visited registry, in visit order
    pub fn page_records(visited: &VisitedPages) -> Vec<PageRecord> {
        visited
            .iter()
            .map(|(url, entry)| PageRecord {
                url: url.to_string(),
                title: entry.title.clone(),
                filename: entry.filename.clone(),
            })
            .collect()
    }

    pub fn pages_persisted(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_skipped(&self) -> usize {
        self.skipped.len()
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Writes the manifest as pretty-printed JSON
///
/// # Arguments
///
/// * `summary` - The finished run
/// * `path` - Where to write the manifest
pub fn write_manifest(summary: &CrawlSummary, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    tracing::debug!("Wrote manifest to {}", path.display());
    Ok(())
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Mirror Summary ===\n");

    println!("Run:");
    println!("  Seed: {}", summary.seed);
    println!("  Target host: {}", summary.target_host);
    println!(
        "  Duration: {:.1}s",
        summary.duration().num_milliseconds() as f64 / 1000.0
    );
    println!();

    println!("Pages:");
    println!("  Persisted: {}", summary.pages_persisted());
    println!("  Skipped: {}", summary.pages_skipped());
    if summary.rejected_by_cap > 0 {
        println!("  Not visited (page cap): {}", summary.rejected_by_cap);
    }
    println!();

    println!("Assets:");
    println!("  Downloaded: {}", summary.assets_downloaded);
    println!("  Failed: {}", summary.assets_failed);
    println!();

    println!("Link fixup:");
    println!("  Provisional links resolved: {}", summary.fixup.resolved);
    println!(
        "  Provisional links left external: {}",
        summary.fixup.unresolved
    );
    println!("  URL references replaced: {}", summary.fixup.urls_replaced);

    if !summary.skipped.is_empty() {
        println!();
        println!("Skipped URLs ({}):", summary.skipped.len());
        for url in &summary.skipped {
            println!("  - {}", url);
        }
    }
}
