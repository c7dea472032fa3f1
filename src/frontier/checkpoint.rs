//! Durable crawl checkpoints.
//!
//! A checkpoint snapshots the full frontier after every expansion so an
//! interrupted run can resume from the last completed page. Writes are a
//! full-file replace through a temp file in the same directory followed by
//! a rename, so a crash mid-write can never leave a torn record behind.
//! The file is left on disk after completion; a prior checkpoint is only a
//! resume *candidate*, consulted when the caller passes an explicit resume
//! flag.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::Frontier;
use crate::nav::NavEntry;

/// Serialized snapshot of the frontier plus the monotonic expansion counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub seed_url: String,
    pub visited: Vec<String>,
    pub discovered: Vec<NavEntry>,
    pub pending: Vec<String>,
    pub pages_processed: u64,
    pub saved_at: DateTime<Utc>,
}

impl CheckpointRecord {
    #[must_use]
    pub fn from_frontier(seed_url: &str, frontier: &Frontier) -> Self {
        let mut visited: Vec<String> = frontier.visited().iter().cloned().collect();
        visited.sort_unstable();
        Self {
            seed_url: seed_url.to_string(),
            visited,
            discovered: frontier.discovered().to_vec(),
            pending: frontier.pending().iter().cloned().collect(),
            pages_processed: frontier.pages_processed(),
            saved_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn into_frontier(self) -> Frontier {
        Frontier::from_parts(
            self.visited.into_iter().collect::<HashSet<_>>(),
            self.discovered,
            self.pending.into_iter().collect::<VecDeque<_>>(),
            self.pages_processed,
        )
    }
}

/// Filesystem store for checkpoint records.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Atomically replace the checkpoint with the current frontier state.
    pub fn save(&self, seed_url: &str, frontier: &Frontier) -> Result<()> {
        let record = CheckpointRecord::from_frontier(seed_url, frontier);
        let json = serde_json::to_vec_pretty(&record).context("serialize checkpoint")?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create checkpoint directory {}", dir.display()))?;

        // Temp file must live on the same filesystem for the rename to be atomic
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("create temp file for checkpoint")?;
        tmp.write_all(&json).context("write checkpoint")?;
        tmp.flush().context("flush checkpoint")?;
        tmp.persist(&self.path)
            .with_context(|| format!("replace checkpoint {}", self.path.display()))?;

        log::debug!(
            "checkpoint saved: {} pages processed, {} pending",
            record.pages_processed,
            record.pending.len()
        );
        Ok(())
    }

    /// Load the checkpoint if one exists. Returns `Ok(None)` when absent.
    pub fn load(&self) -> Result<Option<CheckpointRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read checkpoint {}", self.path.display()))?;
        let record: CheckpointRecord =
            serde_json::from_slice(&bytes).context("parse checkpoint")?;
        Ok(Some(record))
    }
}
