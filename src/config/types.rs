//! Core configuration types for the job scanner
//!
//! This module contains the main `ScannerConfig` struct. Every field is
//! optional on disk; getters in `getters.rs` fill in the defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct for scanning operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Directory holding the catalog and settings files.
    ///
    /// Default: `dirs::data_dir()/jobprobe`
    pub(crate) data_dir: Option<PathBuf>,

    /// Run Chrome without a visible window. The interactive session is only
    /// useful to a person with `headless = false`.
    pub(crate) headless: bool,

    /// Chrome profile directory. A temporary one is created when unset.
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Timeout in seconds for `page.goto()` plus the load wait
    ///
    /// Default: 30 seconds
    pub(crate) page_load_timeout_secs: Option<u64>,

    /// How long a scan waits for an interactive hold to be released
    ///
    /// Default: 60 seconds
    pub(crate) session_wait_timeout_secs: Option<u64>,

    /// Upper bound on results pages followed per source
    ///
    /// Default: 20
    pub(crate) max_pages_per_source: Option<usize>,

    /// Base backoff before the single navigation retry (jitter is added)
    ///
    /// Default: 2000 ms
    pub(crate) navigation_retry_backoff_ms: Option<u64>,

    /// Lower bound accepted by `update_settings`
    pub(crate) min_interval_secs: Option<u64>,

    /// Upper bound accepted by `update_settings`
    pub(crate) max_interval_secs: Option<u64>,

    /// Time left for client-side rendering after the load event
    pub(crate) page_settle_ms: Option<u64>,

    /// Minimum spacing between navigations to the same host
    pub(crate) min_page_interval_ms: Option<u64>,

    /// Capacity of the scan event broadcast channel
    pub(crate) event_capacity: Option<usize>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            headless: true,
            chrome_data_dir: None,
            page_load_timeout_secs: None,
            session_wait_timeout_secs: None,
            max_pages_per_source: None,
            navigation_retry_backoff_ms: None,
            min_interval_secs: None,
            max_interval_secs: None,
            page_settle_ms: None,
            min_page_interval_ms: None,
            event_capacity: None,
        }
    }
}
