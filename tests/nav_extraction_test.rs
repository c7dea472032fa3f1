use docharvest::nav::{ExtractOptions, extract_nav_entries};
use url::Url;

fn page() -> Url {
    Url::parse("https://docs.test/guide/intro").expect("url")
}

fn extract(html: &str) -> Vec<(String, String)> {
    extract_nav_entries(html, &page(), ExtractOptions::default())
        .into_iter()
        .map(|e| (e.label, e.url))
        .collect()
}

#[test]
fn test_sidebar_tree_layout() {
    let html = r#"
        <html><body>
        <aside class="sidebar">
            <ul>
                <li><a href="/guide/intro">Introduction</a></li>
                <li><a href="/guide/install">Installation</a></li>
                <li><a href="../api/index.html">API Reference</a></li>
            </ul>
        </aside>
        </body></html>"#;

    let entries = extract(html);
    assert_eq!(
        entries,
        [
            (
                "Introduction".to_string(),
                "https://docs.test/guide/intro".to_string()
            ),
            (
                "Installation".to_string(),
                "https://docs.test/guide/install".to_string()
            ),
            (
                "API Reference".to_string(),
                "https://docs.test/api/index.html".to_string()
            ),
        ]
    );
}

#[test]
fn test_collapsible_menu_layout() {
    // Docusaurus-style menu, groups already expanded by the renderer
    let html = r#"
        <html><body>
        <div class="theme-doc-sidebar-menu">
            <a class="menu__link" href="/docs/start">Getting Started</a>
            <a class="menu__link" href="/docs/config">Configuration</a>
        </div>
        </body></html>"#;

    let entries = extract(html);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].1, "https://docs.test/docs/start");
}

#[test]
fn test_details_groups_count_as_collapsible_menu() {
    let html = r#"
        <html><body>
        <details open><summary>Basics</summary>
            <a href="/one">One</a>
            <a href="/two">Two</a>
        </details>
        </body></html>"#;

    let entries = extract(html);
    let labels: Vec<_> = entries.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels, ["One", "Two"]);
}

#[test]
fn test_flat_list_is_the_fallback() {
    let html = r#"
        <html><body>
        <nav>
            <a href="/alpha">Alpha</a>
            <a href="/beta">Beta</a>
        </nav>
        </body></html>"#;

    let entries = extract(html);
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_first_matching_layout_wins_and_results_never_merge() {
    // Page has both a sidebar tree and a plain nav; only the sidebar's
    // links may appear in the result
    let html = r#"
        <html><body>
        <aside class="sidebar"><a href="/sidebar-only">Sidebar</a></aside>
        <nav><a href="/nav-only">Nav</a></nav>
        </body></html>"#;

    let entries = extract(html);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, "https://docs.test/sidebar-only");
}

#[test]
fn test_duplicate_urls_keep_first_label_and_order() {
    let html = r#"
        <html><body>
        <aside class="sidebar">
            <a href="/page">First</a>
            <a href="/other">Other</a>
            <a href="/page/">Second</a>
        </aside>
        </body></html>"#;

    let entries = extract(html);
    // /page and /page/ normalize to the same URL
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "First");
    assert_eq!(entries[1].1, "https://docs.test/other");
}

#[test]
fn test_cross_host_and_non_http_links_are_discarded() {
    let html = r#"
        <html><body>
        <aside class="sidebar">
            <a href="https://github.test/repo">GitHub</a>
            <a href="mailto:team@docs.test">Mail</a>
            <a href="javascript:void(0)">Toggle</a>
            <a href="/kept">Kept</a>
        </aside>
        </body></html>"#;

    let entries = extract(html);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, "https://docs.test/kept");
}

#[test]
fn test_anchors_without_labels_are_skipped() {
    let html = r#"
        <html><body>
        <aside class="sidebar">
            <a href="/icon-only"><img src="icon.svg"></a>
            <a href="/named">Named</a>
        </aside>
        </body></html>"#;

    let entries = extract(html);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "Named");
}

#[test]
fn test_fragments_drop_by_default_and_survive_fragment_routing() {
    let html = r#"
        <html><body>
        <aside class="sidebar">
            <a href="/page#alpha">Alpha</a>
            <a href="/page#beta">Beta</a>
        </aside>
        </body></html>"#;

    // Default: both collapse onto the same fragmentless URL
    let plain = extract(html);
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].1, "https://docs.test/page");

    // Fragment routing: each fragment is a distinct page
    let routed = extract_nav_entries(
        html,
        &page(),
        ExtractOptions {
            fragment_routing: true,
        },
    );
    let urls: Vec<_> = routed.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        ["https://docs.test/page#alpha", "https://docs.test/page#beta"]
    );
}

#[test]
fn test_unrecognized_layout_yields_nothing() {
    let html = "<html><body><p>No navigation here.</p></body></html>";
    assert!(extract(html).is_empty());
}
