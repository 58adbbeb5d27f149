//! Post-crawl link fixup
//!
//! Pages are written as soon as they are rendered, so links to pages that
//! were visited later still carry a provisional filename guess. Once the
//! crawl is over, every persisted page is re-read and:
//!
//! 1. Each provisional anchor is resolved: to the target's real filename if
//!    the target was persisted, otherwise back to its absolute URL as an
//!    external link.
//! 2. Every literal occurrence of a persisted page's absolute URL is replaced
//!    with that page's filename, in a single pass per page.

use crate::crawler::markup::Markup;
use crate::crawler::{mark_external, PENDING_HREF_ATTR};
use crate::output::SiteWriter;
use crate::state::VisitedPages;
use regex::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashMap;

/// Substitution counters for one fixup run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixupStats {
    /// Provisional anchors pointed at a persisted page
    pub resolved: usize,

    /// Provisional anchors whose target was never persisted
    pub unresolved: usize,

    /// Literal URL occurrences replaced with a filename
    pub urls_replaced: usize,

    /// Pages whose markup changed
    pub pages_changed: usize,
}

impl FixupStats {
    fn add(&mut self, other: FixupStats) {
        self.resolved += other.resolved;
        self.unresolved += other.unresolved;
        self.urls_replaced += other.urls_replaced;
        self.pages_changed += other.pages_changed;
    }
}

/// Rewrites page markup against the final URL-to-filename map
pub struct LinkFixup<'a> {
    visited: &'a VisitedPages,
    replacements: HashMap<String, String>,
    urls: Option<Regex>,
}

impl<'a> LinkFixup<'a> {
    /// Builds the substitution table for every persisted page
    pub fn new(visited: &'a VisitedPages) -> Self {
        let mut replacements = HashMap::new();
        for (url, entry) in visited.iter() {
            replacements.insert(url.to_string(), entry.filename.clone());
            if url.contains('&') {
                replacements.insert(url.replace('&', "&amp;"), entry.filename.clone());
            }
        }

        // Longest first, so a URL never shadows another it is a prefix of
        let mut keys: Vec<&String> = replacements.keys().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let urls = if keys.is_empty() {
            None
        } else {
            let alternation = keys
                .iter()
                .map(|key| regex::escape(key))
                .collect::<Vec<_>>()
                .join("|");
            match RegexBuilder::new(&alternation).size_limit(64 << 20).build() {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("URL substitution disabled: {}", e);
                    None
                }
            }
        };

        Self {
            visited,
            replacements,
            urls,
        }
    }

    /// Applies both fixup steps to one page's markup
    pub fn apply(&self, html: &str) -> (String, FixupStats) {
        let mut stats = FixupStats::default();

        let resolved = self.resolve_pending(html, &mut stats);

        let output = match &self.urls {
            Some(urls) => urls
                .replace_all(&resolved, |caps: &Captures| {
                    let found = &caps[0];
                    let end = caps.get(0).map_or(resolved.len(), |m| m.end());
                    if continues_url(&resolved[end..]) {
                        return found.to_string();
                    }
                    match self.replacements.get(found) {
                        Some(filename) => {
                            stats.urls_replaced += 1;
                            filename.clone()
                        }
                        None => found.to_string(),
                    }
                })
                .into_owned(),
            None => resolved.into_owned(),
        };

        if output != html {
            stats.pages_changed = 1;
        }
        (output, stats)
    }

    /// Resolves every provisional anchor on the parsed page
    ///
    /// Pages without one are returned untouched, without a parse round trip.
    fn resolve_pending<'h>(&self, html: &'h str, stats: &mut FixupStats) -> Cow<'h, str> {
        if !html.contains(PENDING_HREF_ATTR) {
            return Cow::Borrowed(html);
        }

        let mut markup = Markup::parse(html);
        let pending = markup.select_ids(&format!("a[{}]", PENDING_HREF_ATTR));
        if pending.is_empty() {
            return Cow::Borrowed(html);
        }

        for anchor in pending {
            let Some(target) = markup.remove_attr(anchor, PENDING_HREF_ATTR) else {
                continue;
            };
            match self.visited.get(&target) {
                Some(entry) => {
                    tracing::trace!("Resolved provisional link {} -> {}", target, entry.filename);
                    markup.set_attr(anchor, "href", &entry.filename);
                    stats.resolved += 1;
                }
                None => {
                    tracing::trace!("Provisional link {} was never persisted", target);
                    mark_external(&mut markup, anchor, &target);
                    stats.unresolved += 1;
                }
            }
        }
        Cow::Owned(markup.serialize())
    }
}

/// True if `rest` starts with a character that would extend a URL
fn continues_url(rest: &str) -> bool {
    rest.chars()
        .next()
        .map_or(false, |c| c.is_alphanumeric() || "-._~/%?=+".contains(c))
}

/// Fixes up a single page's markup
///
/// # Example
///
/// ```
/// use site_mirror::output::fixup_markup;
/// use site_mirror::{VisitedEntry, VisitedPages};
///
/// let mut visited = VisitedPages::new();
/// visited.record(
///     "https://example.com/Guide-0123456789abcdef0123456789abcdef",
///     VisitedEntry { title: "Guide".into(), filename: "guide.html".into() },
/// );
///
/// let html = r#"<a href="https://example.com/Guide-0123456789abcdef0123456789abcdef">Guide</a>"#;
/// let (fixed, stats) = fixup_markup(html, &visited);
/// assert_eq!(fixed, r#"<a href="guide.html">Guide</a>"#);
/// assert_eq!(stats.urls_replaced, 1);
/// ```
pub fn fixup_markup(html: &str, visited: &VisitedPages) -> (String, FixupStats) {
    LinkFixup::new(visited).apply(html)
}

/// Runs the fixup over every persisted page
///
/// A page that cannot be read or written back is logged and left as it was.
pub async fn run_fixup(site: &SiteWriter, visited: &VisitedPages) -> FixupStats {
    let fixup = LinkFixup::new(visited);
    let mut totals = FixupStats::default();

    for (url, entry) in visited.iter() {
        let html = match site.read_page(&entry.filename).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Fixup could not read {} ({}): {}", entry.filename, url, e);
                continue;
            }
        };

        let (fixed, stats) = fixup.apply(&html);
        if stats.pages_changed == 0 {
            continue;
        }

        if let Err(e) = site.replace_page(&entry.filename, &fixed).await {
            tracing::warn!("Fixup could not write {}: {}", entry.filename, e);
            continue;
        }
        tracing::debug!(
            "Fixed up {}: {} resolved, {} unresolved, {} URLs replaced",
            entry.filename,
            stats.resolved,
            stats.unresolved,
            stats.urls_replaced
        );
        totals.add(stats);
    }

    totals
}
