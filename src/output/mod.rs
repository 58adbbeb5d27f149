//! Output module for writing the static mirror
//!
//! This module handles:
//! - Allocating unique page filenames from titles
//! - Persisting pages into the site directory with the mirror chrome
//! - The post-crawl link fixup pass
//! - The run summary and `manifest.json`

mod fixup;
mod site;
mod slug;
mod summary;

pub use fixup::{fixup_markup, run_fixup, FixupStats, LinkFixup};
pub use site::{inject_chrome, SiteWriter, SCRIPT_ID, STYLE_ID};
pub use slug::{slugify, SlugAllocator, FALLBACK_SLUG, MAX_SLUG_LEN};
pub use summary::{print_summary, write_manifest, CrawlSummary, PageRecord, MANIFEST_FILE};
