//! HTML parser for extracting a page snapshot
//!
//! This module parses rendered markup to extract:
//! - The page title
//! - Image sources to download (absolute, deduplicated)
//! - Anchor targets (absolute, deduplicated)

use crate::crawler::markup::{collapse_whitespace, Markup};
use crate::url::{normalize_url, parse_web_url};
use ego_tree::NodeId;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Everything the crawl needs from one rendered page
///
/// Owned by the crawl iteration that produced it and dropped once the page
/// is persisted.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// Raw rendered markup
    pub html: String,

    /// Page title (from `<title>`, falling back to the first `<h1>`)
    pub title: String,

    /// Absolute image URLs in first-seen order
    pub images: Vec<String>,

    /// Absolute http(s) anchor targets in first-seen order
    pub links: Vec<String>,
}

impl PageSnapshot {
    /// Parses rendered markup into a snapshot
    ///
    /// # Link Extraction Rules
    ///
    /// **Skipped:**
    /// - `javascript:`, `mailto:`, `tel:`, `data:` hrefs
    /// - Fragment-only hrefs (same page anchors)
    /// - Anything that does not resolve to http(s)
    ///
    /// `data:` image sources are already self-contained and are not collected.
    ///
    /// # Example
    ///
    /// ```
    /// use site_mirror::crawler::PageSnapshot;
    /// use url::Url;
    ///
    /// let html = r#"<html><head><title>Docs</title></head>
    ///     <body><img src="/logo.png"><a href="/next#top">Next</a></body></html>"#;
    /// let page_url = Url::parse("https://example.com/docs").unwrap();
    /// let snapshot = PageSnapshot::capture(html.to_string(), &page_url);
    ///
    /// assert_eq!(snapshot.title, "Docs");
    /// assert_eq!(snapshot.images, vec!["https://example.com/logo.png"]);
    /// assert_eq!(snapshot.links, vec!["https://example.com/next"]);
    /// ```
    pub fn capture(html: String, page_url: &Url) -> Self {
        let markup = Markup::parse(&html);

        let title = extract_title(markup.tree()).unwrap_or_default();
        let images = distinct(image_elements(&markup, page_url));
        let links = distinct(followable_anchors(&markup, page_url));

        Self {
            html,
            title,
            images,
            links,
        }
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|s| !s.is_empty())
    })
}

/// Image elements with a downloadable source, in document order
///
/// The link rewriter walks the same list, so every image collected here is
/// also the one whose `src` gets rewritten.
pub(crate) fn image_elements(markup: &Markup, page_url: &Url) -> Vec<(NodeId, String)> {
    markup
        .select_ids("img[src]")
        .into_iter()
        .filter_map(|id| {
            let src = markup.attr(id, "src")?;
            resolve_image_source(&src, page_url).map(|url| (id, url))
        })
        .collect()
}

/// Anchors with a followable target, in document order
pub(crate) fn followable_anchors(markup: &Markup, page_url: &Url) -> Vec<(NodeId, String)> {
    markup
        .select_ids("a[href]")
        .into_iter()
        .filter_map(|id| {
            let href = markup.attr(id, "href")?;
            resolve_link(&href, page_url).map(|url| (id, url))
        })
        .collect()
}

fn distinct(found: Vec<(NodeId, String)>) -> Vec<String> {
    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|(_, url)| url)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be left alone:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let normalized = normalize_url(href, Some(page_url));
    parse_web_url(&normalized).map(|_| normalized)
}

/// Resolves an image `src` to the absolute URL used as its asset key
pub fn resolve_image_source(src: &str, page_url: &Url) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.to_ascii_lowercase().starts_with("data:") {
        return None;
    }

    let normalized = normalize_url(src, Some(page_url));
    parse_web_url(&normalized).map(|_| normalized)
}
