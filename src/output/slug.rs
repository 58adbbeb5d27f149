//! Slug and filename allocation
//!
//! Turns page titles into unique, filesystem-safe `<slug>.html` filenames.

use std::collections::{HashMap, HashSet};

/// Maximum slug length in characters, before the collision suffix
pub const MAX_SLUG_LEN: usize = 60;

/// Slug used when a title has no usable characters
pub const FALLBACK_SLUG: &str = "page";

/// Converts a title into a filesystem-safe slug
///
/// Lowercases, transliterates to ASCII, collapses every run of
/// non-alphanumeric characters into a single `-`, trims separators from both
/// ends, and truncates to [`MAX_SLUG_LEN`]. An empty result becomes
/// [`FALLBACK_SLUG`].
///
/// # Examples
///
/// ```
/// use site_mirror::output::slugify;
///
/// assert_eq!(slugify("Getting Started: A Guide!"), "getting-started-a-guide");
/// assert_eq!(slugify("Crème brûlée"), "creme-brulee");
/// assert_eq!(slugify("???"), "page");
/// ```
pub fn slugify(title: &str) -> String {
    let ascii = deunicode::deunicode(title).to_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    // Slug is pure ASCII here, so byte truncation is char-safe
    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Hands out unique page filenames for one crawl run
///
/// The first title producing a given base slug gets `base.html`; later ones
/// get `base-2.html`, `base-3.html`, … in first-seen order.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    used: HashSet<String>,
    next_suffix: HashMap<String, u32>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns a unique filename for `title`
    pub fn allocate(&mut self, title: &str) -> String {
        let base = slugify(title);
        let (slug, suffix) = self.find_free(&base);

        self.next_suffix.insert(base, suffix + 1);
        self.used.insert(slug.clone());

        format!("{}.html", slug)
    }

    /// Returns the filename `allocate` would hand out right now, without reserving it
    pub fn peek(&self, title: &str) -> String {
        let (slug, _) = self.find_free(&slugify(title));
        format!("{}.html", slug)
    }

    /// Number of filenames reserved so far
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    fn find_free(&self, base: &str) -> (String, u32) {
        let mut suffix = self.next_suffix.get(base).copied().unwrap_or(1);
        loop {
            let candidate = if suffix <= 1 {
                base.to_string()
            } else {
                format!("{}-{}", base, suffix)
            };
            if !self.used.contains(&candidate) {
                return (candidate, suffix);
            }
            suffix += 1;
        }
    }
}
