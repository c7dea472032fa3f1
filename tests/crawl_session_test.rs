use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use docharvest::config::CrawlConfig;
use docharvest::error::RenderError;
use docharvest::frontier::session::CrawlSession;
use docharvest::renderer::PageRenderer;
use url::Url;

/// In-memory site: URL string -> rendered HTML. Missing URLs fail to
/// render, like an unreachable page would.
#[derive(Clone)]
struct FakeRenderer {
    pages: Arc<HashMap<String, String>>,
}

impl FakeRenderer {
    fn new(pages: &[(&str, String)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.clone()))
                    .collect(),
            ),
        }
    }
}

impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &Url) -> Result<String, RenderError> {
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| RenderError::Failed(format!("no such page: {url}")))
    }
}

fn sidebar(hrefs: &[(&str, &str)]) -> String {
    let mut links = String::new();
    for (href, label) in hrefs {
        links.push_str(&format!("<a href=\"{href}\">{label}</a>"));
    }
    format!("<html><body><aside class=\"sidebar\">{links}</aside></body></html>")
}

fn config_in(dir: &assert_fs::TempDir, seed: &str) -> CrawlConfig {
    CrawlConfig::builder(seed)
        .output_path(dir.path().join("links.json"))
        .delay(Duration::ZERO)
        .build()
}

#[tokio::test]
async fn test_cyclic_navigation_terminates() {
    let renderer = FakeRenderer::new(&[
        (
            "https://docs.test/",
            sidebar(&[("/guide", "Guide"), ("/api", "API")]),
        ),
        (
            "https://docs.test/guide",
            sidebar(&[("/", "Home"), ("/api", "API")]),
        ),
        (
            "https://docs.test/api",
            sidebar(&[("/", "Home"), ("/guide", "Guide")]),
        ),
    ]);

    let dir = assert_fs::TempDir::new().expect("temp dir");
    let session = CrawlSession::new(renderer, config_in(&dir, "https://docs.test/"));
    let outcome = session.run().await.expect("crawl");

    assert_eq!(outcome.pages_processed, 3);
    assert!(!outcome.reached_page_ceiling);
    assert!(outcome.failed_pages.is_empty());
    let urls: Vec<_> = outcome.discovered.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, ["https://docs.test/guide", "https://docs.test/api"]);
}

#[tokio::test]
async fn test_seed_render_failure_is_fatal() {
    let renderer = FakeRenderer::new(&[]);
    let dir = assert_fs::TempDir::new().expect("temp dir");
    let session = CrawlSession::new(renderer, config_in(&dir, "https://docs.test/"));
    let err = session.run().await.expect_err("seed failure");
    assert!(err.to_string().contains("seed URL"));
}

#[tokio::test]
async fn test_failed_page_contributes_zero_entries() {
    let renderer = FakeRenderer::new(&[
        (
            "https://docs.test/",
            sidebar(&[("/good", "Good"), ("/gone", "Gone")]),
        ),
        ("https://docs.test/good", sidebar(&[("/extra", "Extra")])),
        ("https://docs.test/extra", sidebar(&[])),
        // /gone is never registered, so it fails to render
    ]);

    let dir = assert_fs::TempDir::new().expect("temp dir");
    let session = CrawlSession::new(renderer, config_in(&dir, "https://docs.test/"));
    let outcome = session.run().await.expect("crawl");

    assert_eq!(outcome.failed_pages.len(), 1);
    assert_eq!(outcome.failed_pages[0].url, "https://docs.test/gone");
    // The failed page stays in the discovered list; it only stops expanding
    let urls: Vec<_> = outcome.discovered.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        [
            "https://docs.test/good",
            "https://docs.test/gone",
            "https://docs.test/extra"
        ]
    );
}

#[tokio::test]
async fn test_page_ceiling_stops_expansion() {
    let renderer = FakeRenderer::new(&[
        ("https://docs.test/", sidebar(&[("/a", "A"), ("/b", "B")])),
        ("https://docs.test/a", sidebar(&[("/c", "C")])),
        ("https://docs.test/b", sidebar(&[])),
        ("https://docs.test/c", sidebar(&[])),
    ]);

    let dir = assert_fs::TempDir::new().expect("temp dir");
    let config = CrawlConfig::builder("https://docs.test/")
        .output_path(dir.path().join("links.json"))
        .delay(Duration::ZERO)
        .max_pages(2)
        .build();
    let session = CrawlSession::new(renderer, config);
    let outcome = session.run().await.expect("crawl");

    assert!(outcome.reached_page_ceiling);
    assert_eq!(outcome.pages_processed, 2);
}

#[tokio::test]
async fn test_cross_host_links_are_dropped() {
    // Seed sidebar holds three links, one of them cross-domain
    let renderer = FakeRenderer::new(&[
        (
            "https://docs.test/",
            sidebar(&[
                ("/guide", "Guide"),
                ("https://elsewhere.test/page", "External"),
                ("/api", "API"),
            ]),
        ),
        ("https://docs.test/guide", sidebar(&[])),
        ("https://docs.test/api", sidebar(&[])),
    ]);

    let dir = assert_fs::TempDir::new().expect("temp dir");
    let session = CrawlSession::new(renderer, config_in(&dir, "https://docs.test/"));
    let outcome = session.run().await.expect("crawl");

    let urls: Vec<_> = outcome.discovered.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, ["https://docs.test/guide", "https://docs.test/api"]);
    assert!(outcome.pages_processed <= 3);
    assert!(outcome.failed_pages.is_empty());
}

#[tokio::test]
async fn test_resume_matches_an_uninterrupted_run() {
    let pages = [
        (
            "https://docs.test/",
            sidebar(&[("/a", "A"), ("/b", "B"), ("/c", "C")]),
        ),
        ("https://docs.test/a", sidebar(&[("/d", "D")])),
        ("https://docs.test/b", sidebar(&[("/a", "A")])),
        ("https://docs.test/c", sidebar(&[])),
        ("https://docs.test/d", sidebar(&[])),
    ];
    let renderer = FakeRenderer::new(&pages);

    // Baseline: one uninterrupted crawl
    let dir = assert_fs::TempDir::new().expect("temp dir");
    let session = CrawlSession::new(renderer.clone(), config_in(&dir, "https://docs.test/"));
    let baseline = session.run().await.expect("baseline crawl");

    // Interrupted run: stop after 2 pages, then resume
    let dir2 = assert_fs::TempDir::new().expect("temp dir");
    let partial_config = CrawlConfig::builder("https://docs.test/")
        .output_path(dir2.path().join("links.json"))
        .delay(Duration::ZERO)
        .max_pages(2)
        .build();
    let partial = CrawlSession::new(renderer.clone(), partial_config)
        .run()
        .await
        .expect("partial crawl");
    assert!(partial.reached_page_ceiling);

    let resume_config = CrawlConfig::builder("https://docs.test/")
        .output_path(dir2.path().join("links.json"))
        .delay(Duration::ZERO)
        .resume(true)
        .build();
    let resumed = CrawlSession::new(renderer, resume_config)
        .run()
        .await
        .expect("resumed crawl");

    let baseline_urls: Vec<_> = baseline.discovered.iter().map(|e| &e.url).collect();
    let resumed_urls: Vec<_> = resumed.discovered.iter().map(|e| &e.url).collect();
    assert_eq!(baseline_urls, resumed_urls);
    assert_eq!(baseline.pages_processed, resumed.pages_processed);
}

#[tokio::test]
async fn test_resume_flag_ignores_foreign_checkpoints() {
    let renderer = FakeRenderer::new(&[
        ("https://docs.test/", sidebar(&[("/a", "A")])),
        ("https://docs.test/a", sidebar(&[])),
        ("https://other.test/", sidebar(&[("/x", "X")])),
        ("https://other.test/x", sidebar(&[])),
    ]);

    let dir = assert_fs::TempDir::new().expect("temp dir");
    let first = CrawlConfig::builder("https://other.test/")
        .output_path(dir.path().join("links.json"))
        .delay(Duration::ZERO)
        .build();
    CrawlSession::new(renderer.clone(), first)
        .run()
        .await
        .expect("first crawl");

    // Same checkpoint path, different seed: must start fresh, not resume
    let second = CrawlConfig::builder("https://docs.test/")
        .output_path(dir.path().join("links.json"))
        .delay(Duration::ZERO)
        .resume(true)
        .build();
    let outcome = CrawlSession::new(renderer, second)
        .run()
        .await
        .expect("second crawl");

    let urls: Vec<_> = outcome.discovered.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, ["https://docs.test/a"]);
}

#[tokio::test]
async fn test_link_outputs_are_written_in_both_forms() {
    let renderer = FakeRenderer::new(&[
        ("https://docs.test/", sidebar(&[("/a", "A"), ("/b", "B")])),
        ("https://docs.test/a", sidebar(&[])),
        ("https://docs.test/b", sidebar(&[])),
    ]);

    let dir = assert_fs::TempDir::new().expect("temp dir");
    let session = CrawlSession::new(renderer, config_in(&dir, "https://docs.test/"));
    session.run().await.expect("crawl");

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("links.json")).expect("read json"),
    )
    .expect("parse json");
    assert_eq!(json["seed_url"], "https://docs.test/");
    assert_eq!(json["total_links"], 2);
    assert_eq!(json["links"][0]["url"], "https://docs.test/a");

    let text = std::fs::read_to_string(dir.path().join("links.txt")).expect("read text");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines, ["https://docs.test/a", "https://docs.test/b"]);

    // The checkpoint survives completion for post-mortem inspection
    assert!(dir.path().join("links_checkpoint.json").exists());
}
