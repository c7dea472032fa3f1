//! Navigation extraction across documentation-framework layouts.
//!
//! Documentation sites render their sidebar with client-side script and the
//! markup differs per framework. Extraction runs an ordered list of layout
//! strategies, each a pure function over the parsed document, and returns
//! the first non-empty result. Results from different strategies are never
//! merged: two strategies applied to the same page can yield inconsistent
//! URL sets.

pub mod url_utils;

use log::{debug, warn};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;
use url_utils::{resolve_and_normalize, same_host};

/// One sidebar navigation entry. Two entries are equal iff their normalized
/// URLs are equal; labels may collide and are not deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavEntry {
    pub label: String,
    /// Normalized absolute URL.
    pub url: String,
}

impl PartialEq for NavEntry {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for NavEntry {}

/// Options controlling extraction and URL normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Retain URL fragments. Only for sites that route distinct pages
    /// through fragment-only navigation.
    pub fragment_routing: bool,
}

/// A layout-specific extraction strategy: a name for logging plus the CSS
/// selectors that locate navigation anchors in that layout.
struct LayoutStrategy {
    name: &'static str,
    selectors: &'static [&'static str],
}

/// Ordered strategy list. More specific layouts first so a page that matches
/// both a sidebar tree and a bare `nav` is attributed to the richer layout.
const STRATEGIES: &[LayoutStrategy] = &[
    // (a) always-expanded sidebar trees (VitePress, generic doc portals)
    LayoutStrategy {
        name: "sidebar-tree",
        selectors: &[
            "aside.sidebar a",
            "aside#left-nav a",
            "aside.VPSidebar a",
            ".nav-tree a",
            ".sidebar-nav a",
            ".doc-tree a",
        ],
    },
    // (b) menus with collapsible groups (Docusaurus, <details> trees);
    // the renderer expands the groups before the snapshot is taken
    LayoutStrategy {
        name: "collapsible-menu",
        selectors: &[
            ".theme-doc-sidebar-menu a",
            ".menu a",
            "details a",
        ],
    },
    // (c) flat lists with no grouping
    LayoutStrategy {
        name: "flat-list",
        selectors: &["nav a", ".navigation a", ".toc a"],
    },
];

/// Extract the sidebar navigation entries visible in a rendered page.
///
/// `page_url` is the URL the page was rendered from; relative hrefs resolve
/// against it and entries outside its host are discarded silently. The
/// returned sequence preserves document order and contains no duplicate
/// normalized URLs.
#[must_use]
pub fn extract_nav_entries(
    html: &str,
    page_url: &Url,
    opts: ExtractOptions,
) -> Vec<NavEntry> {
    let document = Html::parse_document(html);

    for strategy in STRATEGIES {
        let entries = apply_strategy(&document, strategy, page_url, opts);
        if !entries.is_empty() {
            debug!(
                "layout {:?} matched {} entries on {}",
                strategy.name,
                entries.len(),
                page_url
            );
            return entries;
        }
    }

    debug!("no navigation layout recognized on {page_url}");
    Vec::new()
}

fn apply_strategy(
    document: &Html,
    strategy: &LayoutStrategy,
    page_url: &Url,
    opts: ExtractOptions,
) -> Vec<NavEntry> {
    let mut entries = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for selector_str in strategy.selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(e) => {
                warn!("invalid selector {selector_str:?}: {e}");
                continue;
            }
        };

        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = resolve_and_normalize(page_url, href, opts.fragment_routing) else {
                continue;
            };
            if !same_host(&url, page_url) {
                // Cross-domain sidebar links are footer/external links
                continue;
            }

            let label = anchor.text().collect::<String>().trim().to_string();
            if label.is_empty() {
                continue;
            }

            let url = url.to_string();
            if seen.insert(url.clone()) {
                entries.push(NavEntry { label, url });
            }
        }

        // A selector hit means this layout is present; later selectors in
        // the same strategy would re-match the same anchors
        if !entries.is_empty() {
            break;
        }
    }

    entries
}
