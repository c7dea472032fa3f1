//! Crawl configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a navigation crawl.
///
/// Built through [`CrawlConfigBuilder`]; the seed URL is the only required
/// field. Paths for the link output and the checkpoint default to names
/// derived from each other so a resumed run finds its own state.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub(crate) seed_url: String,
    pub(crate) output_path: PathBuf,
    pub(crate) checkpoint_path: PathBuf,
    pub(crate) resume: bool,
    pub(crate) delay: Duration,
    pub(crate) max_pages: u64,
    pub(crate) headless: bool,
    pub(crate) cookie: Option<String>,
    pub(crate) fragment_routing: bool,
    pub(crate) page_load_timeout: Duration,
    pub(crate) navigation_timeout: Duration,
}

impl CrawlConfig {
    #[must_use]
    pub fn builder(seed_url: impl Into<String>) -> CrawlConfigBuilder {
        CrawlConfigBuilder::new(seed_url)
    }

    #[must_use]
    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    #[must_use]
    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Path of the human-readable link list, next to the structured output.
    #[must_use]
    pub fn text_output_path(&self) -> PathBuf {
        self.output_path.with_extension("txt")
    }

    #[must_use]
    pub fn checkpoint_path(&self) -> &PathBuf {
        &self.checkpoint_path
    }

    #[must_use]
    pub fn resume(&self) -> bool {
        self.resume
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn max_pages(&self) -> u64 {
        self.max_pages
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    #[must_use]
    pub fn fragment_routing(&self) -> bool {
        self.fragment_routing
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        self.page_load_timeout
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }
}

/// Fluent builder for [`CrawlConfig`].
#[derive(Debug, Clone)]
pub struct CrawlConfigBuilder {
    seed_url: String,
    output_path: Option<PathBuf>,
    checkpoint_path: Option<PathBuf>,
    resume: bool,
    delay: Duration,
    max_pages: u64,
    headless: bool,
    cookie: Option<String>,
    fragment_routing: bool,
    page_load_timeout: Duration,
    navigation_timeout: Duration,
}

impl CrawlConfigBuilder {
    #[must_use]
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            output_path: None,
            checkpoint_path: None,
            resume: false,
            delay: Duration::from_secs(1),
            max_pages: 1000,
            headless: true,
            cookie: None,
            fragment_routing: false,
            page_load_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    #[must_use]
    pub fn fragment_routing(mut self, fragment_routing: bool) -> Self {
        self.fragment_routing = fragment_routing;
        self
    }

    #[must_use]
    pub fn page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    #[must_use]
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn build(self) -> CrawlConfig {
        let output_path = self
            .output_path
            .unwrap_or_else(|| PathBuf::from("sidebar_links.json"));
        let checkpoint_path = self.checkpoint_path.unwrap_or_else(|| {
            let stem = output_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "crawl".to_string());
            output_path.with_file_name(format!("{stem}_checkpoint.json"))
        });
        CrawlConfig {
            seed_url: self.seed_url,
            output_path,
            checkpoint_path,
            resume: self.resume,
            delay: self.delay,
            max_pages: self.max_pages,
            headless: self.headless,
            cookie: self.cookie,
            fragment_routing: self.fragment_routing,
            page_load_timeout: self.page_load_timeout,
            navigation_timeout: self.navigation_timeout,
        }
    }
}
