//! Output directory layout and page persistence
//!
//! ```text
//! <site-dir>/
//!   <slug>.html        one per persisted page
//!   manifest.json      optional run manifest
//!   <assets-dir>/      one file per downloaded asset
//! ```

use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Marker id of the injected stylesheet
pub const STYLE_ID: &str = "mirror-style";

/// Marker id of the injected behavior script
pub const SCRIPT_ID: &str = "mirror-script";

const MIRROR_STYLE: &str = r#"<style id="mirror-style">
body { max-width: 900px; margin: 0 auto; padding: 2rem 1rem; line-height: 1.5; }
img { max-width: 100%; height: auto; }
[aria-expanded] { cursor: pointer; }
[hidden] { display: none !important; }
</style>"#;

const MIRROR_SCRIPT: &str = r#"<script id="mirror-script">
document.addEventListener('click', function (event) {
  var control = event.target.closest('[aria-expanded][aria-controls]');
  if (!control) return;
  var expanded = control.getAttribute('aria-expanded') === 'true';
  control.setAttribute('aria-expanded', expanded ? 'false' : 'true');
  control.getAttribute('aria-controls').split(/\s+/).forEach(function (id) {
    var target = document.getElementById(id);
    if (target) target.hidden = expanded;
  });
});
</script>"#;

fn head_close_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)</head\s*>").expect("valid head regex"))
}

fn body_close_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)</body\s*>").expect("valid body regex"))
}

/// Writes pages into the site directory
#[derive(Debug, Clone)]
pub struct SiteWriter {
    root: PathBuf,
    assets: PathBuf,
}

impl SiteWriter {
    /// Creates a writer for `root`, with assets in the `assets_dir` subdirectory
    pub fn new(root: impl Into<PathBuf>, assets_dir: &str) -> Self {
        let root = root.into();
        let assets = root.join(assets_dir);
        Self { root, assets }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets
    }

    /// Creates the site and asset directories
    ///
    /// Existing directories and their files are left in place, so assets
    /// from an earlier run are reused rather than fetched again.
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.assets).await?;
        tracing::debug!("Output directory ready: {}", self.root.display());
        Ok(())
    }

    pub fn page_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Persists a page, injecting the mirror chrome
    pub async fn write_page(&self, filename: &str, html: &str) -> io::Result<PathBuf> {
        let path = self.page_path(filename);
        tokio::fs::write(&path, inject_chrome(html)).await?;
        Ok(path)
    }

    pub async fn read_page(&self, filename: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.page_path(filename)).await
    }

    /// Overwrites a page's markup as-is
    pub async fn replace_page(&self, filename: &str, html: &str) -> io::Result<()> {
        tokio::fs::write(self.page_path(filename), html).await
    }
}

/// Inserts the mirror stylesheet and script into a page
///
/// The stylesheet goes before `</head>` and the script before the last
/// `</body>`; either is appended when its closing tag is missing. Blocks
/// already present are not inserted again.
pub fn inject_chrome(html: &str) -> String {
    let mut page = html.to_string();

    if !page.contains(&format!(r#"id="{}""#, STYLE_ID)) {
        let at = head_close_pattern().find(&page).map(|found| found.start());
        insert_block(&mut page, at, MIRROR_STYLE);
    }

    if !page.contains(&format!(r#"id="{}""#, SCRIPT_ID)) {
        let at = body_close_pattern().find_iter(&page).last().map(|found| found.start());
        insert_block(&mut page, at, MIRROR_SCRIPT);
    }

    page
}

fn insert_block(page: &mut String, at: Option<usize>, block: &str) {
    match at {
        Some(index) => page.insert_str(index, &format!("{}\n", block)),
        None => {
            page.push('\n');
            page.push_str(block);
        }
    }
}
