//! Frontier state for the navigation crawl.
//!
//! The frontier is an explicit value passed into and returned from each
//! expansion step. Persistence is a side effect performed by the session
//! after each step, never an implicit global.
//!
//! Invariants:
//! - every URL in `discovered` is in `visited`, in `pending`, or is the
//!   currently expanding URL;
//! - no URL appears in `pending` more than once;
//! - `visited` only grows.

pub mod checkpoint;
pub mod session;

use crate::nav::NavEntry;
use std::collections::{HashSet, VecDeque};

/// Working state of the crawl: expanded URLs, discovered entries in
/// insertion order, and the FIFO queue of URLs awaiting expansion.
#[derive(Debug, Clone)]
pub struct Frontier {
    visited: HashSet<String>,
    discovered: Vec<NavEntry>,
    /// Index over `discovered` URLs for O(1) membership checks.
    discovered_urls: HashSet<String>,
    pending: VecDeque<String>,
    pages_processed: u64,
}

impl Frontier {
    /// Fresh frontier holding only the seed URL (already normalized).
    #[must_use]
    pub fn seeded(seed_url: String) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(seed_url);
        Self {
            visited: HashSet::new(),
            discovered: Vec::new(),
            discovered_urls: HashSet::new(),
            pending,
            pages_processed: 0,
        }
    }

    /// Rebuild a frontier from checkpoint parts. The discovered-URL index is
    /// derived, not persisted.
    #[must_use]
    pub fn from_parts(
        visited: HashSet<String>,
        discovered: Vec<NavEntry>,
        pending: VecDeque<String>,
        pages_processed: u64,
    ) -> Self {
        let discovered_urls = discovered.iter().map(|e| e.url.clone()).collect();
        Self {
            visited,
            discovered,
            discovered_urls,
            pending,
            pages_processed,
        }
    }

    /// Pop the next URL to expand (FIFO, breadth-first). Pages closer to the
    /// seed are discovered first, which also bounds depth-search pathologies
    /// on deep trees.
    pub fn next_pending(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Record the outcome of expanding `url`: append each entry not yet seen
    /// to `discovered` and queue its URL, then mark `url` visited.
    ///
    /// A failed page passes an empty `entries` slice; it still counts as an
    /// expansion so the page-count ceiling covers dead pages too.
    pub fn record_expansion(&mut self, url: &str, entries: Vec<NavEntry>) {
        for entry in entries {
            if self.visited.contains(&entry.url) || self.discovered_urls.contains(&entry.url) {
                continue;
            }
            self.discovered_urls.insert(entry.url.clone());
            self.pending.push_back(entry.url.clone());
            self.discovered.push(entry);
        }
        self.visited.insert(url.to_string());
        self.pages_processed += 1;
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn pages_processed(&self) -> u64 {
        self.pages_processed
    }

    #[must_use]
    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    #[must_use]
    pub fn discovered(&self) -> &[NavEntry] {
        &self.discovered
    }

    #[must_use]
    pub fn pending(&self) -> &VecDeque<String> {
        &self.pending
    }

    /// Consume the frontier and return the ordered link set.
    #[must_use]
    pub fn into_discovered(self) -> Vec<NavEntry> {
        self.discovered
    }
}
