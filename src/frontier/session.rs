//! The crawl loop: INIT → EXPANDING → (DONE | FAILED).
//!
//! One session owns the renderer for the crawl's duration and drives the
//! frontier strictly sequentially, one page at a time, with an
//! unconditional politeness delay between expansions. After every
//! expansion the checkpoint is persisted, so external interruption always
//! resumes from the last completed page.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::Write;
use url::Url;

use super::Frontier;
use super::checkpoint::CheckpointStore;
use crate::config::CrawlConfig;
use crate::nav::url_utils::normalize;
use crate::nav::{ExtractOptions, NavEntry, extract_nav_entries};
use crate::renderer::PageRenderer;

/// A page that failed to render or extract. Recorded, never fatal.
#[derive(Debug, Clone, Serialize)]
pub struct FailedPage {
    pub url: String,
    pub error: String,
}

/// Result of a completed crawl.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// All discovered entries, insertion order preserved.
    pub discovered: Vec<NavEntry>,
    pub pages_processed: u64,
    /// True when the crawl stopped at the page-count ceiling instead of
    /// exhausting the frontier.
    pub reached_page_ceiling: bool,
    pub failed_pages: Vec<FailedPage>,
}

/// Drives a crawl over any [`PageRenderer`].
pub struct CrawlSession<R: PageRenderer> {
    renderer: R,
    config: CrawlConfig,
    store: CheckpointStore,
}

impl<R: PageRenderer> CrawlSession<R> {
    #[must_use]
    pub fn new(renderer: R, config: CrawlConfig) -> Self {
        let store = CheckpointStore::new(config.checkpoint_path().clone());
        Self {
            renderer,
            config,
            store,
        }
    }

    /// Give the renderer back, for shutdown once the crawl is over.
    #[must_use]
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Run the crawl to DONE and persist the link outputs.
    ///
    /// Fails only when the seed URL itself cannot be rendered on a fresh
    /// crawl; every other page failure contributes zero entries.
    pub async fn run(&self) -> Result<CrawlOutcome> {
        let seed = self.normalized_seed()?;
        let seed_str = seed.to_string();

        let mut frontier = self.init_frontier(&seed_str)?;
        let opts = ExtractOptions {
            fragment_routing: self.config.fragment_routing(),
        };
        let mut failed_pages = Vec::new();
        let mut reached_page_ceiling = false;

        loop {
            if frontier.pages_processed() >= self.config.max_pages() {
                warn!(
                    "page-count ceiling of {} reached with {} URLs still pending",
                    self.config.max_pages(),
                    frontier.pending().len()
                );
                reached_page_ceiling = true;
                break;
            }

            let Some(url_str) = frontier.next_pending() else {
                break;
            };

            let entries = match Url::parse(&url_str) {
                Ok(url) => match self.renderer.render(&url).await {
                    Ok(html) => {
                        let entries = extract_nav_entries(&html, &url, opts);
                        if entries.is_empty() {
                            debug!("no navigation entries on {url_str}");
                        }
                        entries
                    }
                    Err(e) => {
                        if frontier.pages_processed() == 0 && url_str == seed_str {
                            bail!("seed URL {seed_str} cannot be rendered: {e}");
                        }
                        warn!("render failed for {url_str}: {e}");
                        failed_pages.push(FailedPage {
                            url: url_str.clone(),
                            error: e.to_string(),
                        });
                        Vec::new()
                    }
                },
                Err(e) => {
                    warn!("unparseable URL in frontier, skipping {url_str}: {e}");
                    failed_pages.push(FailedPage {
                        url: url_str.clone(),
                        error: e.to_string(),
                    });
                    Vec::new()
                }
            };

            let new_count = entries.len();
            frontier.record_expansion(&url_str, entries);
            info!(
                "expanded {} ({} entries, {} discovered, {} pending)",
                url_str,
                new_count,
                frontier.discovered().len(),
                frontier.pending().len()
            );

            self.store.save(&seed_str, &frontier)?;

            // Politeness contract toward the target site, not an
            // optimization knob: always waited between two expansions
            if !frontier.is_exhausted()
                && frontier.pages_processed() < self.config.max_pages()
            {
                tokio::time::sleep(self.config.delay()).await;
            }
        }

        let pages_processed = frontier.pages_processed();
        let outcome = CrawlOutcome {
            discovered: frontier.into_discovered(),
            pages_processed,
            reached_page_ceiling,
            failed_pages,
        };

        write_link_outputs(&self.config, &seed_str, &outcome)?;
        Ok(outcome)
    }

    fn normalized_seed(&self) -> Result<Url> {
        let mut seed = Url::parse(self.config.seed_url())
            .with_context(|| format!("invalid seed URL {:?}", self.config.seed_url()))?;
        normalize(&mut seed, self.config.fragment_routing());
        Ok(seed)
    }

    /// INIT: resume from a prior checkpoint only when asked to and the
    /// checkpoint belongs to the same seed; otherwise start fresh.
    fn init_frontier(&self, seed_str: &str) -> Result<Frontier> {
        if self.config.resume()
            && let Some(record) = self.store.load()?
        {
            if record.seed_url == seed_str {
                info!(
                    "resuming crawl: {} pages processed, {} pending",
                    record.pages_processed,
                    record.pending.len()
                );
                return Ok(record.into_frontier());
            }
            warn!(
                "checkpoint at {} belongs to seed {}, not {}; starting fresh",
                self.store.path().display(),
                record.seed_url,
                seed_str
            );
        }
        Ok(Frontier::seeded(seed_str.to_string()))
    }
}

/// Structured link output, chained into the download stage.
#[derive(Debug, Serialize)]
struct LinkOutput<'a> {
    seed_url: &'a str,
    total_links: usize,
    pages_processed: u64,
    failed_count: usize,
    extracted_at: chrono::DateTime<chrono::Utc>,
    links: &'a [NavEntry],
    failed_pages: &'a [FailedPage],
}

/// Persist the ordered link list in both forms: structured JSON for machine
/// chaining and one URL per line for manual inspection.
fn write_link_outputs(config: &CrawlConfig, seed_str: &str, outcome: &CrawlOutcome) -> Result<()> {
    if let Some(dir) = config.output_path().parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
    }

    let output = LinkOutput {
        seed_url: seed_str,
        total_links: outcome.discovered.len(),
        pages_processed: outcome.pages_processed,
        failed_count: outcome.failed_pages.len(),
        extracted_at: chrono::Utc::now(),
        links: &outcome.discovered,
        failed_pages: &outcome.failed_pages,
    };
    let json = serde_json::to_vec_pretty(&output).context("serialize link output")?;
    std::fs::write(config.output_path(), json)
        .with_context(|| format!("write {}", config.output_path().display()))?;

    let text_path = config.text_output_path();
    let mut text = std::fs::File::create(&text_path)
        .with_context(|| format!("create {}", text_path.display()))?;
    for entry in &outcome.discovered {
        writeln!(text, "{}", entry.url).context("write link line")?;
    }

    info!(
        "wrote {} links to {} and {}",
        outcome.discovered.len(),
        config.output_path().display(),
        text_path.display()
    );
    Ok(())
}
