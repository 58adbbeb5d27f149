//! Link rewriter
//!
//! Rewrites a rendered page so it browses from the local mirror:
//! - `<img src>` points into the asset directory when the asset was fetched
//! - in-scope `<a href>` points at the target page's local filename
//! - out-of-scope `<a href>` stays absolute and opens in a new browsing context
//!
//! In-scope targets that have not been visited yet get a provisional
//! filename guessed from the link text, plus a [`PENDING_HREF_ATTR`] marker
//! holding the absolute target so the fixup pass can correct the guess.

use crate::crawler::markup::Markup;
use crate::crawler::parser::{followable_anchors, image_elements};
use crate::crawler::scheduler::Frontier;
use crate::output::SlugAllocator;
use crate::state::VisitedPages;
use crate::url::is_in_scope;
use ego_tree::NodeId;
use std::collections::HashMap;
use url::Url;

/// Attribute marking an anchor whose href is a provisional filename guess
pub const PENDING_HREF_ATTR: &str = "data-mirror-href";

/// Counters describing one page rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Anchors pointing at an already-persisted page
    pub internal_links: usize,

    /// Anchors given a provisional filename guess
    pub provisional_links: usize,

    /// Anchors left absolute and opened in a new context
    pub external_links: usize,

    /// Images pointed at a local asset
    pub images_rewritten: usize,

    /// Images whose asset could not be fetched
    pub images_unresolved: usize,

    /// New URLs added to the frontier
    pub enqueued: usize,
}

/// A rewritten page
#[derive(Debug, Clone)]
pub struct RewrittenPage {
    pub html: String,
    pub stats: RewriteStats,
}

/// Rewrites the links and images of one page
pub struct LinkRewriter<'a> {
    page_url: &'a Url,
    target_host: &'a str,
    visited: &'a VisitedPages,
    slugs: &'a SlugAllocator,
    assets_prefix: String,
}

impl<'a> LinkRewriter<'a> {
    /// Creates a rewriter for the page at `page_url`
    ///
    /// # Arguments
    ///
    /// * `page_url` - The page's own URL, for resolving relative references
    /// * `target_host` - Host that in-scope pages live on
    /// * `visited` - Pages persisted so far, for real filenames
    /// * `slugs` - Allocator used to guess filenames without reserving them
    /// * `assets_dir` - Asset directory name relative to the page
    pub fn new(
        page_url: &'a Url,
        target_host: &'a str,
        visited: &'a VisitedPages,
        slugs: &'a SlugAllocator,
        assets_dir: &str,
    ) -> Self {
        Self {
            page_url,
            target_host,
            visited,
            slugs,
            assets_prefix: format!("{}/", assets_dir.trim_end_matches('/')),
        }
    }

    /// Rewrites `html`, enqueueing newly discovered in-scope pages
    ///
    /// Images and anchors are found the same way [`PageSnapshot`] finds
    /// them, on the parsed tree, so only elements the rendered page really
    /// contains are rewritten or followed.
    ///
    /// # Arguments
    ///
    /// * `html` - The rendered markup
    /// * `assets` - Absolute image URL to local asset filename, for fetched assets
    /// * `frontier` - Receives in-scope link targets
    ///
    /// [`PageSnapshot`]: crate::crawler::PageSnapshot
    pub fn rewrite(
        &self,
        html: &str,
        assets: &HashMap<String, String>,
        frontier: &mut Frontier,
    ) -> RewrittenPage {
        let mut stats = RewriteStats::default();
        let mut markup = Markup::parse(html);

        for (image, source) in image_elements(&markup, self.page_url) {
            match assets.get(&source) {
                Some(filename) => {
                    markup.set_attr(image, "src", &format!("{}{}", self.assets_prefix, filename));
                    markup.remove_attr(image, "srcset");
                    stats.images_rewritten += 1;
                }
                None => stats.images_unresolved += 1,
            }
        }

        for (anchor, target) in followable_anchors(&markup, self.page_url) {
            self.rewrite_anchor(&mut markup, anchor, target, frontier, &mut stats);
        }

        RewrittenPage {
            html: markup.serialize(),
            stats,
        }
    }

    fn rewrite_anchor(
        &self,
        markup: &mut Markup,
        anchor: NodeId,
        target: String,
        frontier: &mut Frontier,
        stats: &mut RewriteStats,
    ) {
        if !is_in_scope(&target, self.target_host) {
            mark_external(markup, anchor, &target);
            stats.external_links += 1;
            return;
        }

        match self.visited.get(&target) {
            Some(entry) => {
                markup.set_attr(anchor, "href", &entry.filename);
                markup.remove_attr(anchor, PENDING_HREF_ATTR);
                stats.internal_links += 1;
            }
            None => {
                let guess = self.slugs.peek(&link_text(markup, anchor));
                markup.set_attr(anchor, "href", &guess);
                markup.set_attr(anchor, PENDING_HREF_ATTR, &target);
                stats.provisional_links += 1;
            }
        }

        if !self.visited.contains(&target) && frontier.enqueue(target) {
            stats.enqueued += 1;
        }
    }
}

/// Points an anchor at an absolute URL opening in a new browsing context
pub(crate) fn mark_external(markup: &mut Markup, anchor: NodeId, url: &str) {
    markup.set_attr(anchor, "href", url);
    markup.set_attr(anchor, "target", "_blank");
    markup.set_attr(anchor, "rel", "noopener noreferrer");
}

/// Text used to guess a filename: visible text, else title or aria-label
fn link_text(markup: &Markup, anchor: NodeId) -> String {
    let text = markup.text(anchor);
    if !text.is_empty() {
        return text;
    }
    markup
        .attr(anchor, "title")
        .or_else(|| markup.attr(anchor, "aria-label"))
        .unwrap_or_default()
}
