pub mod batch;
pub mod config;
pub mod download;
pub mod error;
pub mod frontier;
pub mod nav;
pub mod renderer;
pub mod upload;

pub use batch::{Batch, BatchPlan};
pub use config::CrawlConfig;
pub use error::{FetchError, QuotaViolation, RenderError, UploadError};
pub use frontier::Frontier;
pub use frontier::checkpoint::{CheckpointRecord, CheckpointStore};
pub use frontier::session::{CrawlOutcome, CrawlSession};
pub use nav::{NavEntry, extract_nav_entries};
pub use renderer::{ChromiumRenderer, PageRenderer};
pub use upload::{CollectionSink, NotebookLmCli, UploadConfig, UploadSummary};
