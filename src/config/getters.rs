//! Getter methods for `ScannerConfig`
//!
//! Every getter resolves the stored `Option` against the shared defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::utils::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_INTERVAL_SECS, DEFAULT_MAX_PAGES_PER_SOURCE,
    DEFAULT_MIN_INTERVAL_SECS, DEFAULT_MIN_PAGE_INTERVAL_MS, DEFAULT_NAVIGATION_RETRY_BACKOFF_MS,
    DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_PAGE_SETTLE_MS, DEFAULT_SESSION_WAIT_TIMEOUT_SECS,
};

use super::types::ScannerConfig;

impl ScannerConfig {
    /// Directory for the catalog and settings files
    ///
    /// Falls back to `<platform data dir>/jobprobe`, then to `./jobprobe-data`
    /// on platforms without a data dir.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("jobprobe"))
                .unwrap_or_else(|| PathBuf::from("jobprobe-data"))
        })
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    /// Get the page load timeout in seconds
    ///
    /// If None, defaults to 30 seconds.
    #[must_use]
    pub fn page_load_timeout_secs(&self) -> u64 {
        self.page_load_timeout_secs
            .unwrap_or(DEFAULT_PAGE_LOAD_TIMEOUT_SECS)
    }

    #[must_use]
    pub fn session_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.session_wait_timeout_secs())
    }

    #[must_use]
    pub fn session_wait_timeout_secs(&self) -> u64 {
        self.session_wait_timeout_secs
            .unwrap_or(DEFAULT_SESSION_WAIT_TIMEOUT_SECS)
    }

    #[must_use]
    pub fn max_pages_per_source(&self) -> usize {
        self.max_pages_per_source
            .unwrap_or(DEFAULT_MAX_PAGES_PER_SOURCE)
    }

    #[must_use]
    pub fn navigation_retry_backoff(&self) -> Duration {
        Duration::from_millis(
            self.navigation_retry_backoff_ms
                .unwrap_or(DEFAULT_NAVIGATION_RETRY_BACKOFF_MS),
        )
    }

    #[must_use]
    pub fn min_interval_secs(&self) -> u64 {
        self.min_interval_secs.unwrap_or(DEFAULT_MIN_INTERVAL_SECS)
    }

    #[must_use]
    pub fn max_interval_secs(&self) -> u64 {
        self.max_interval_secs.unwrap_or(DEFAULT_MAX_INTERVAL_SECS)
    }

    #[must_use]
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms.unwrap_or(DEFAULT_PAGE_SETTLE_MS))
    }

    #[must_use]
    pub fn min_page_interval(&self) -> Duration {
        Duration::from_millis(
            self.min_page_interval_ms
                .unwrap_or(DEFAULT_MIN_PAGE_INTERVAL_MS),
        )
    }

    #[must_use]
    pub fn event_capacity(&self) -> usize {
        self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY)
    }
}
