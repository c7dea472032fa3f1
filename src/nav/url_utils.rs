//! URL normalization for navigation entries.
//!
//! Every place a URL is stored or compared uses the same normal form:
//! relative hrefs resolved against the page URL, fragments dropped (unless
//! the site routes distinct pages by fragment), trailing slash stripped
//! except on the root path, query strings preserved verbatim.

use url::Url;

/// Resolve `href` against `base` and normalize it.
///
/// Returns `None` for hrefs that cannot name a content page: unparseable
/// values and non-http(s) schemes (`javascript:`, `mailto:`, `data:`, ...).
#[must_use]
pub fn resolve_and_normalize(base: &Url, href: &str, fragment_routing: bool) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }

    normalize(&mut resolved, fragment_routing);
    Some(resolved)
}

/// Normalize a URL in place. Idempotent: applying it twice yields the same
/// value as applying it once.
pub fn normalize(url: &mut Url, fragment_routing: bool) {
    if !fragment_routing {
        url.set_fragment(None);
    } else if let Some(fragment) = url.fragment()
        && fragment.is_empty()
    {
        // "page#" and "page" are the same entity even under fragment routing
        url.set_fragment(None);
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        // All-slash paths collapse to root, everything else loses the tail
        if trimmed.is_empty() {
            url.set_path("/");
        } else {
            url.set_path(&trimmed);
        }
    }
}

/// Whether `url` belongs to the seed host. Cross-domain sidebar links are
/// typically footer/external links, not content pages, and are discarded.
#[must_use]
pub fn same_host(url: &Url, seed: &Url) -> bool {
    url.host_str() == seed.host_str()
}
