//! Quota-aware batch allocation.
//!
//! The remote service caps items per collection, so an upload of N files is
//! partitioned into `ceil(N / quota)` contiguous groups. Slicing never
//! reorders, pads, or rebalances: a 96-item input with quota 50 yields
//! groups of 50 and 46, not 48/48, so every batch maps onto the original
//! order for traceability. Planning is a pure function of
//! `(file order, quota, base name)`; re-running after a partial upload
//! produces identical batch boundaries.

use crate::error::QuotaViolation;
use anyhow::{Result, bail};
use std::path::PathBuf;

/// One quota-sized slice of the input file sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position in the plan.
    pub index: usize,
    /// Remote collection name for this slice.
    pub name: String,
    pub items: Vec<PathBuf>,
}

/// An ordered set of batches covering the input exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub batches: Vec<Batch>,
}

impl BatchPlan {
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.batches.iter().map(|b| b.items.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Defensive invariant check, run before anything is sent remotely.
    /// `plan` can never produce a violating plan; this guards against
    /// future callers assembling plans by hand.
    pub fn assert_within_quota(&self, quota: usize) -> Result<(), QuotaViolation> {
        for batch in &self.batches {
            if batch.items.len() > quota {
                return Err(QuotaViolation {
                    index: batch.index,
                    name: batch.name.clone(),
                    len: batch.items.len(),
                    quota,
                });
            }
        }
        Ok(())
    }
}

/// Name for batch `index` (1-based): the base name alone for the first
/// batch, `"{base} (k)"` for the rest. This mirrors the remote service's
/// own multi-collection naming convention.
#[must_use]
pub fn batch_name(base_name: &str, index: usize) -> String {
    if index <= 1 {
        base_name.to_string()
    } else {
        format!("{base_name} ({index})")
    }
}

/// Partition `files` into quota-sized contiguous batches with deterministic
/// names. Pure: same input triple, same plan.
pub fn plan(files: &[PathBuf], quota: usize, base_name: &str) -> Result<BatchPlan> {
    if quota == 0 {
        bail!("quota must be a positive integer");
    }

    let batches = files
        .chunks(quota)
        .enumerate()
        .map(|(i, chunk)| {
            let index = i + 1;
            Batch {
                index,
                name: batch_name(base_name, index),
                items: chunk.to_vec(),
            }
        })
        .collect();

    Ok(BatchPlan { batches })
}
