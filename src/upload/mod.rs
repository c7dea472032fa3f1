//! Upload stage: push harvested Markdown files into remote collections.
//!
//! Files are discovered deterministically (sorted path order), partitioned
//! into quota-sized batches, and sent through a [`CollectionSink`]. Item
//! failures are isolated; an authentication failure aborts the whole run
//! because every later call would fail the same way.

pub mod notebooklm;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::{BatchPlan, plan};
use crate::error::UploadError;

pub use notebooklm::NotebookLmCli;

/// Hard per-collection cap enforced by the remote service.
pub const SERVICE_MAX_QUOTA: usize = 50;

const DEFAULT_PATTERN: &str = "*.md";
const SUMMARY_FILE: &str = ".upload_summary.json";
const FAILED_SIDECAR: &str = "_failed_uploads.txt";

/// Destination for batched uploads. One collection per batch, one item
/// per file.
#[allow(async_fn_in_trait)]
pub trait CollectionSink {
    async fn create_collection(&self, name: &str) -> Result<String, UploadError>;
    async fn upload_item(
        &self,
        collection_id: &str,
        title: &str,
        content: &str,
    ) -> Result<(), UploadError>;
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory holding the harvested files.
    pub input_dir: PathBuf,
    /// Base collection name; later batches get " (k)" suffixes.
    pub collection_name: String,
    /// Items per collection, capped at [`SERVICE_MAX_QUOTA`].
    pub quota: usize,
    /// Glob filter over file names inside `input_dir`.
    pub pattern: String,
    /// Pause between consecutive item uploads.
    pub delay: Duration,
}

impl UploadConfig {
    #[must_use]
    pub fn new(input_dir: PathBuf, collection_name: String) -> Self {
        Self {
            input_dir,
            collection_name,
            quota: SERVICE_MAX_QUOTA,
            pattern: DEFAULT_PATTERN.to_string(),
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedUpload {
    pub path: PathBuf,
    pub batch: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub collection_base: String,
    pub batches: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
    pub failures: Vec<FailedUpload>,
}

impl UploadSummary {
    #[must_use]
    pub fn fully_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Translate a shell-style glob (`*`, `?`) into an anchored regex. Any
/// other character is matched literally.
fn compile_glob_pattern(pattern: &str) -> Result<Regex> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            _ => regex.push_str(&regex::escape(&ch.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).with_context(|| format!("invalid file pattern {pattern:?}"))
}

/// List the files under `dir` whose names match `pattern`, in sorted path
/// order so batch boundaries are reproducible across runs.
pub fn discover_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = compile_glob_pattern(pattern)?;
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read input directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.context("read directory entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if matcher.is_match(name) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn item_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

/// Build the batch plan for the configured input without sending anything.
/// The CLI uses this to show what a run would do before confirmation.
pub fn plan_upload(config: &UploadConfig) -> Result<(Vec<PathBuf>, BatchPlan)> {
    if config.quota == 0 || config.quota > SERVICE_MAX_QUOTA {
        bail!(
            "quota must be between 1 and {SERVICE_MAX_QUOTA}, got {}",
            config.quota
        );
    }
    let files = discover_files(&config.input_dir, &config.pattern)?;
    let batch_plan = plan(&files, config.quota, &config.collection_name)?;
    batch_plan.assert_within_quota(config.quota)?;
    Ok((files, batch_plan))
}

/// Execute a batch plan against `sink`.
///
/// Collections are created in plan order. A failed collection create skips
/// that batch's items but continues with the next batch; a failed item is
/// recorded and the batch continues. [`UploadError::Auth`] aborts
/// immediately. The summary file is written in every non-auth outcome.
pub async fn run<S: CollectionSink>(
    sink: &S,
    config: &UploadConfig,
    batch_plan: &BatchPlan,
) -> Result<UploadSummary> {
    let mut uploaded = 0usize;
    let mut failures: Vec<FailedUpload> = Vec::new();

    for batch in &batch_plan.batches {
        info!(
            "batch {}/{}: creating collection {:?} ({} items)",
            batch.index,
            batch_plan.batches.len(),
            batch.name,
            batch.items.len()
        );

        let collection_id = match sink.create_collection(&batch.name).await {
            Ok(id) => id,
            Err(UploadError::Auth(reason)) => {
                error!("authentication rejected, aborting: {reason}");
                return Err(UploadError::Auth(reason).into());
            }
            Err(e) => {
                error!("collection {:?} could not be created: {e}", batch.name);
                for item in &batch.items {
                    failures.push(FailedUpload {
                        path: item.clone(),
                        batch: batch.name.clone(),
                        error: format!("collection not created: {e}"),
                    });
                }
                continue;
            }
        };

        for (i, item) in batch.items.iter().enumerate() {
            if i > 0 && !config.delay.is_zero() {
                tokio::time::sleep(config.delay).await;
            }

            let title = item_title(item);
            let content = match std::fs::read_to_string(item) {
                Ok(c) => c,
                Err(e) => {
                    warn!("cannot read {}: {e}", item.display());
                    failures.push(FailedUpload {
                        path: item.clone(),
                        batch: batch.name.clone(),
                        error: format!("read failed: {e}"),
                    });
                    continue;
                }
            };

            match sink.upload_item(&collection_id, &title, &content).await {
                Ok(()) => {
                    uploaded += 1;
                    info!("uploaded {} to {:?}", item.display(), batch.name);
                }
                Err(UploadError::Auth(reason)) => {
                    error!("authentication rejected mid-run, aborting: {reason}");
                    return Err(UploadError::Auth(reason).into());
                }
                Err(e) => {
                    warn!("upload failed for {}: {e}", item.display());
                    failures.push(FailedUpload {
                        path: item.clone(),
                        batch: batch.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    let summary = UploadSummary {
        collection_base: config.collection_name.clone(),
        batches: batch_plan.batches.len(),
        uploaded,
        failed: failures.len(),
        finished_at: Utc::now(),
        failures,
    };
    write_summary(&config.input_dir, &summary)?;

    info!(
        "upload finished: {} uploaded, {} failed across {} batches",
        summary.uploaded, summary.failed, summary.batches
    );
    Ok(summary)
}

fn write_summary(dir: &Path, summary: &UploadSummary) -> Result<()> {
    let summary_path = dir.join(SUMMARY_FILE);
    let json = serde_json::to_vec_pretty(summary).context("serialize upload summary")?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("write {}", summary_path.display()))?;

    let sidecar = dir.join(FAILED_SIDECAR);
    if summary.failures.is_empty() {
        if sidecar.exists() {
            // Stale sidecar from an earlier partial run
            std::fs::remove_file(&sidecar)
                .with_context(|| format!("remove {}", sidecar.display()))?;
        }
        return Ok(());
    }

    let mut lines = String::new();
    for failure in &summary.failures {
        lines.push_str(&format!(
            "{}\t{}\t{}\n",
            failure.path.display(),
            failure.batch,
            failure.error
        ));
    }
    std::fs::write(&sidecar, lines).with_context(|| format!("write {}", sidecar.display()))?;
    Ok(())
}
