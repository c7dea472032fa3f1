//! Download stage: fetch each discovered page, convert to Markdown, write
//! files with deterministic names, and keep a resumable progress record
//! keyed by URL so a rerun skips pages already materialized.

pub mod pacer;

use anyhow::{Context, Result};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, info, warn};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::nav::NavEntry;
use pacer::Pacer;

/// Bounded retry budget for transient fetch failures.
const MAX_FETCH_ATTEMPTS: u32 = 3;
/// Initial backoff, doubled per attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Progress is flushed every this many completed pages, and once at the end.
const PROGRESS_FLUSH_EVERY: usize = 10;

/// Content-region selectors tried in order; the first match is converted.
/// Falls back to the whole document when none matches.
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".doc-content",
    ".markdown-body",
    "#content",
    ".content",
];

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Link list produced by the crawl (JSON) or a plain text URL list.
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Per-request delay; every fetch start is spaced by this interval.
    pub delay: Duration,
    /// Bounded fetch concurrency. Default 1 (effectively serial).
    pub concurrent: usize,
    pub cookie: Option<String>,
    /// Optional cap on how many links to process.
    pub max_files: Option<usize>,
}

/// Resumable progress, keyed by URL.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DownloadProgress {
    completed: Vec<String>,
    failed: Vec<FailedDownload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDownload {
    pub url: String,
    pub label: String,
    pub error: String,
}

#[derive(Debug)]
pub struct DownloadReport {
    pub completed: usize,
    pub skipped: usize,
    pub failed: Vec<FailedDownload>,
    pub failure_list_path: Option<PathBuf>,
}

/// Run the download stage.
pub async fn run(config: &DownloadConfig) -> Result<DownloadReport> {
    let links = load_links(&config.input)?;
    let links = match config.max_files {
        Some(max) => links.into_iter().take(max).collect(),
        None => links,
    };
    info!("{} links loaded from {}", links.len(), config.input.display());

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("create output directory {}", config.output_dir.display()))?;

    let progress_path = config.output_dir.join(".download_progress.json");
    let mut progress = load_progress(&progress_path)?;
    let completed: HashSet<String> = progress.completed.iter().cloned().collect();
    // Previously failed URLs are retried on rerun
    progress.failed.clear();

    let names = assign_file_names(&links);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build http client")?;
    let pacer = Arc::new(Pacer::new(config.delay));
    let concurrency = config.concurrent.max(1);

    let mut skipped = 0usize;
    let mut jobs = Vec::new();
    for (position, entry) in links.iter().enumerate() {
        if completed.contains(&entry.url) {
            debug!("already downloaded, skipping {}", entry.url);
            skipped += 1;
            continue;
        }
        jobs.push((entry.clone(), config.output_dir.join(&names[position])));
    }
    let total_jobs = jobs.len();

    let mut in_flight = FuturesUnordered::new();
    let mut jobs = jobs.into_iter();
    let mut done = 0usize;

    loop {
        while in_flight.len() < concurrency {
            let Some((entry, dest)) = jobs.next() else {
                break;
            };
            let client = client.clone();
            let pacer = Arc::clone(&pacer);
            let cookie = config.cookie.clone();
            in_flight.push(async move {
                pacer.wait().await;
                let result = download_one(&client, &entry, &dest, cookie.as_deref()).await;
                (entry, result)
            });
        }

        let Some((entry, result)) = in_flight.next().await else {
            break;
        };

        done += 1;
        match result {
            Ok(()) => {
                info!("[{done}/{total_jobs}] {}", entry.label);
                progress.completed.push(entry.url);
            }
            Err(e) => {
                warn!("[{done}/{total_jobs}] failed {}: {e}", entry.url);
                progress.failed.push(FailedDownload {
                    url: entry.url,
                    label: entry.label,
                    error: e.to_string(),
                });
            }
        }

        if done % PROGRESS_FLUSH_EVERY == 0 {
            save_progress(&progress_path, &progress)?;
        }
    }

    save_progress(&progress_path, &progress)?;

    let failure_list_path = if progress.failed.is_empty() {
        None
    } else {
        let path = config.output_dir.join("_failed_downloads.txt");
        let mut body = String::new();
        for failure in &progress.failed {
            body.push_str(&format!("{}\t{}\n", failure.url, failure.error));
        }
        std::fs::write(&path, body)
            .with_context(|| format!("write failure list {}", path.display()))?;
        Some(path)
    };

    Ok(DownloadReport {
        completed: progress.completed.len(),
        skipped,
        failed: progress.failed,
        failure_list_path,
    })
}

/// Fetch one page, convert its main content to Markdown, write it out.
async fn download_one(
    client: &reqwest::Client,
    entry: &NavEntry,
    dest: &Path,
    cookie: Option<&str>,
) -> Result<()> {
    let html = fetch_with_retry(client, &entry.url, cookie).await?;
    let markdown = convert_to_markdown(&html, &entry.label)?;
    tokio::fs::write(dest, markdown)
        .await
        .with_context(|| format!("write {}", dest.display()))?;
    Ok(())
}

/// Fetch with bounded retry and doubling backoff. Transient errors and
/// retryable statuses (429, 5xx) are retried; anything else fails fast.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    cookie: Option<&str>,
) -> Result<String, FetchError> {
    let mut backoff = INITIAL_BACKOFF;
    let mut last_error = None;

    for attempt in 1..=MAX_FETCH_ATTEMPTS {
        match fetch_once(client, url, cookie).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                if !e.is_retryable() || attempt == MAX_FETCH_ATTEMPTS {
                    return Err(e);
                }
                debug!("attempt {attempt} for {url} failed ({e}), retrying in {backoff:?}");
                last_error = Some(e);
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }

    Err(last_error.unwrap_or(FetchError::Transient {
        url: url.to_string(),
        reason: "retries exhausted".to_string(),
    }))
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    cookie: Option<&str>,
) -> Result<String, FetchError> {
    let mut request = client.get(url);
    if let Some(cookie) = cookie {
        request = request.header(reqwest::header::COOKIE, cookie);
    }

    let response = request.send().await.map_err(|e| FetchError::Transient {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Rejected {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| FetchError::Transient {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Convert a page to Markdown, narrowing to the main content region when
/// one of the known selectors matches.
pub fn convert_to_markdown(html: &str, label: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let mut content_html = None;
    for selector_str in MAIN_CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(region) = document.select(&selector).next() {
            content_html = Some(region.html());
            break;
        }
    }
    let content_html = content_html.unwrap_or_else(|| html.to_string());

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "header", "footer"])
        .build();
    let body = converter
        .convert(&content_html)
        .map_err(|e| anyhow::anyhow!("markdown conversion failed: {e}"))?;

    Ok(format!("# {label}\n\n{}\n", body.trim()))
}

/// Deterministic file names: position prefix plus sanitized label, with a
/// stable numeric suffix when two labels sanitize to the same name.
#[must_use]
pub fn assign_file_names(links: &[NavEntry]) -> Vec<String> {
    let mut used: HashMap<String, usize> = HashMap::new();
    links
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let mut stem = sanitize_filename::sanitize(entry.label.trim());
            if stem.is_empty() {
                stem = "untitled".to_string();
            }
            if stem.len() > 120 {
                // Back off to a char boundary; labels are often CJK text
                let mut cut = 120;
                while !stem.is_char_boundary(cut) {
                    cut -= 1;
                }
                stem.truncate(cut);
            }
            let base = format!("{:03}-{stem}", position + 1);
            let count = used.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                format!("{base}.md")
            } else {
                format!("{base}-{count}.md")
            }
        })
        .collect()
}

/// Load links from the crawl's JSON output or a plain text URL list.
pub fn load_links(path: &Path) -> Result<Vec<NavEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read link list {}", path.display()))?;

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) {
        if let Some(links) = value.get("links") {
            return serde_json::from_value(links.clone()).context("parse links array");
        }
        if value.is_array() {
            return serde_json::from_value(value).context("parse links array");
        }
        anyhow::bail!("unrecognized JSON link list in {}", path.display());
    }

    // Plain text: one URL per line, label derived from the path tail
    let links = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| NavEntry {
            label: line
                .rsplit('/')
                .find(|seg| !seg.is_empty())
                .unwrap_or(line)
                .to_string(),
            url: line.to_string(),
        })
        .collect();
    Ok(links)
}

fn load_progress(path: &Path) -> Result<DownloadProgress> {
    if !path.exists() {
        return Ok(DownloadProgress::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read progress {}", path.display()))?;
    let progress = serde_json::from_str(&content).context("parse progress record")?;
    Ok(progress)
}

fn save_progress(path: &Path, progress: &DownloadProgress) -> Result<()> {
    let json = serde_json::to_vec_pretty(progress).context("serialize progress")?;
    std::fs::write(path, json).with_context(|| format!("write progress {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, url: &str) -> NavEntry {
        NavEntry {
            label: label.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn file_names_are_positional_and_collision_free() {
        let links = vec![
            entry("Setup", "https://a.test/1"),
            entry("Setup", "https://a.test/2"),
            entry("FAQ: what?", "https://a.test/3"),
        ];
        let names = assign_file_names(&links);
        assert_eq!(names[0], "001-Setup.md");
        assert_eq!(names[1], "002-Setup.md");
        // invalid filename characters are sanitized away
        assert!(!names[2].contains(':'));
        assert!(names[2].starts_with("003-"));
    }

    #[test]
    fn file_names_are_deterministic() {
        let links = vec![entry("A", "https://a.test/1"), entry("B", "https://a.test/2")];
        assert_eq!(assign_file_names(&links), assign_file_names(&links));
    }

    #[test]
    fn empty_labels_fall_back_to_untitled() {
        let names = assign_file_names(&[entry("  ", "https://a.test/1")]);
        assert_eq!(names[0], "001-untitled.md");
    }

    #[test]
    fn long_multibyte_labels_truncate_on_char_boundaries() {
        // 1 + 41*3 = 124 bytes; byte 120 falls inside a code point
        let label = format!("a{}", "指".repeat(41));
        let names = assign_file_names(&[entry(&label, "https://a.test/1")]);
        assert!(names[0].ends_with(".md"));
        let stem = names[0]
            .strip_prefix("001-")
            .and_then(|n| n.strip_suffix(".md"))
            .expect("positional name");
        assert!(stem.len() <= 120);
        assert!(label.starts_with(stem));
    }

    #[test]
    fn text_link_lists_parse_one_url_per_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("links.txt");
        std::fs::write(
            &path,
            "# header comment\nhttps://a.test/guide/setup\n\nhttps://a.test/api\n",
        )
        .expect("write");

        let links = load_links(&path).expect("load");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].label, "setup");
        assert_eq!(links[1].url, "https://a.test/api");
    }

    #[test]
    fn json_link_lists_parse_from_crawl_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("links.json");
        std::fs::write(
            &path,
            r#"{"seed_url":"https://a.test/","links":[{"label":"Intro","url":"https://a.test/intro"}]}"#,
        )
        .expect("write");

        let links = load_links(&path).expect("load");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "Intro");
    }

    #[test]
    fn markdown_conversion_narrows_to_main_content() {
        let html = r#"
            <html><body>
              <nav><a href="/x">chrome nav</a></nav>
              <main><h2>Install</h2><p>Run the installer.</p></main>
            </body></html>
        "#;
        let markdown = convert_to_markdown(html, "Install").expect("convert");
        assert!(markdown.starts_with("# Install"));
        assert!(markdown.contains("Run the installer."));
        assert!(!markdown.contains("chrome nav"));
    }
}
