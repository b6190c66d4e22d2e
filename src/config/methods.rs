//! Setter methods on the builder

use super::builder::ScannerConfigBuilder;

impl ScannerConfigBuilder {
    /// Set browser headless mode
    ///
    /// Headed mode is what lets a person drive the interactive session
    /// (logging in, solving a challenge).
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.inner.headless = headless;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.inner.page_load_timeout_secs = Some(secs);
        self
    }

    /// Set how long a scan waits for an interactive hold before reporting
    /// the source as skipped
    #[must_use]
    pub fn session_wait_timeout_secs(mut self, secs: u64) -> Self {
        self.inner.session_wait_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn max_pages_per_source(mut self, pages: usize) -> Self {
        self.inner.max_pages_per_source = Some(pages);
        self
    }

    #[must_use]
    pub fn navigation_retry_backoff_ms(mut self, ms: u64) -> Self {
        self.inner.navigation_retry_backoff_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn min_interval_secs(mut self, secs: u64) -> Self {
        self.inner.min_interval_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn max_interval_secs(mut self, secs: u64) -> Self {
        self.inner.max_interval_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn page_settle_ms(mut self, ms: u64) -> Self {
        self.inner.page_settle_ms = Some(ms);
        self
    }

    /// Minimum spacing between two navigations to the same host.
    /// Zero disables pacing.
    #[must_use]
    pub fn min_page_interval_ms(mut self, ms: u64) -> Self {
        self.inner.min_page_interval_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.inner.event_capacity = Some(capacity);
        self
    }
}
