//! Visited-page registry
//!
//! One entry per persisted page, keyed by normalized source URL. Entries are
//! never mutated once recorded, and iteration follows visit order.

use std::collections::{HashMap, HashSet};

/// A page that has been persisted to the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedEntry {
    /// Page title as extracted from the rendered markup
    pub title: String,

    /// Final, unique output filename (`<slug>.html`)
    pub filename: String,
}

/// All pages persisted during one run
#[derive(Debug, Default)]
pub struct VisitedPages {
    entries: HashMap<String, VisitedEntry>,
    order: Vec<String>,
    filenames: HashSet<String>,
}

impl VisitedPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a persisted page
    ///
    /// Returns false (and records nothing) if the URL is already present or
    /// the filename is already taken by another page.
    pub fn record(&mut self, url: impl Into<String>, entry: VisitedEntry) -> bool {
        let url = url.into();
        if self.entries.contains_key(&url) || self.filenames.contains(&entry.filename) {
            return false;
        }

        self.filenames.insert(entry.filename.clone());
        self.order.push(url.clone());
        self.entries.insert(url, entry);
        true
    }

    pub fn get(&self, url: &str) -> Option<&VisitedEntry> {
        self.entries.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Returns true if a persisted page already owns `filename`
    pub fn has_filename(&self, filename: &str) -> bool {
        self.filenames.contains(filename)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates entries in visit order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VisitedEntry)> {
        self.order
            .iter()
            .filter_map(|url| self.entries.get(url).map(|entry| (url.as_str(), entry)))
    }
}
