//! Frontier for managing the crawl's work queue
//!
//! This module handles:
//! - FIFO (breadth-first) ordering of URLs pending a visit
//! - Exactly-once enqueueing, keyed by normalized URL
//! - The page-count safety cap

use std::collections::{HashSet, VecDeque};

/// Work queue of normalized URLs awaiting a visit
///
/// Every URL ever accepted stays in the `seen` set, so a URL that has been
/// visited (or is waiting) can never be enqueued again. Acceptance stops once
/// `max_pages` URLs have been accepted in total, which bounds the crawl even
/// when the link graph is unbounded.
#[derive(Debug)]
pub struct Frontier {
    /// URLs waiting to be visited, oldest first
    queue: VecDeque<String>,

    /// Every URL ever accepted (queued or already dequeued)
    seen: HashSet<String>,

    /// Maximum number of URLs ever accepted
    max_pages: usize,

    /// URLs turned away because the cap was reached
    rejected_by_cap: usize,
}

impl Frontier {
    /// Creates an empty frontier that accepts at most `max_pages` URLs
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            max_pages,
            rejected_by_cap: 0,
        }
    }

    /// Adds a URL to the back of the queue
    ///
    /// # Returns
    ///
    /// * `true` - The URL was new and has been queued
    /// * `false` - The URL was already seen, or the page cap has been reached
    pub fn enqueue(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();

        if self.seen.contains(&url) {
            return false;
        }

        if self.seen.len() >= self.max_pages {
            self.rejected_by_cap += 1;
            tracing::trace!("Page cap reached, not queueing {}", url);
            return false;
        }

        tracing::trace!("Queued {}", url);
        self.seen.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Removes and returns the oldest queued URL
    pub fn next_url(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Returns true if the URL has ever been accepted
    pub fn has_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Returns true if the URL is waiting in the queue
    pub fn is_queued(&self, url: &str) -> bool {
        self.queue.iter().any(|queued| queued == url)
    }

    /// Number of URLs waiting to be visited
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs turned away by the page cap
    pub fn rejected_by_cap(&self) -> usize {
        self.rejected_by_cap
    }

    /// URLs still waiting, in visit order
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }
}
