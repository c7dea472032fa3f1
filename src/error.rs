//! Error taxonomy for the harvest pipeline.
//!
//! Single-item failures (one page, one fetch, one upload) are represented by
//! these types and recorded by the surrounding loop; they never abort a
//! stage. Only condition-class failures (seed unreachable, authentication
//! rejected, a batch plan violating the quota) are fatal.

use std::time::Duration;
use thiserror::Error;

/// A page render failed. Both variants are recoverable at the crawl level:
/// the page contributes zero navigation entries and the crawl continues.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render timed out after {0:?}")]
    Timeout(Duration),
    #[error("render failed: {0}")]
    Failed(String),
}

/// A page fetch failed during the download stage.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure. Retried with backoff up to a bounded attempt
    /// count, then demoted to a recorded failure.
    #[error("transient fetch error for {url}: {reason}")]
    Transient { url: String, reason: String },
    /// The server answered with a status that will not improve on retry.
    #[error("fetch of {url} rejected with status {status}")]
    Rejected { url: String, status: u16 },
}

impl FetchError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transient { .. } => true,
            // 429 and 5xx may recover; 4xx otherwise will not
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// A batch plan would exceed the remote per-collection limit.
///
/// This is a programming-invariant failure: `batch::plan` can never produce
/// such a plan, so the check exists purely as a defensive assertion before
/// anything is sent to the remote service.
#[derive(Debug, Error)]
#[error("batch {index} ({name:?}) holds {len} items, exceeding quota {quota}")]
pub struct QuotaViolation {
    pub index: usize,
    pub name: String,
    pub len: usize,
    pub quota: usize,
}

/// Upload-stage failures.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The remote service rejected the session. Fatal for the stage; there
    /// is no useful retry.
    #[error("authentication rejected by remote service: {0}")]
    Auth(String),
    #[error("failed to create collection {name:?}: {reason}")]
    CollectionCreate { name: String, reason: String },
    #[error("upload of {title:?} failed: {reason}")]
    Item { title: String, reason: String },
}
