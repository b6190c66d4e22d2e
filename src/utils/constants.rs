//! Shared default values for jobprobe
//!
//! Defaults for the scanner configuration live here so the builder, the
//! getters and the tests agree on them.

/// Seconds a scan waits for an interactive browser hold to end
pub const DEFAULT_SESSION_WAIT_TIMEOUT_SECS: u64 = 60;

/// Results pages followed per source before pagination stops
pub const DEFAULT_MAX_PAGES_PER_SOURCE: usize = 20;

/// Base backoff before the single navigation retry
pub const DEFAULT_NAVIGATION_RETRY_BACKOFF_MS: u64 = 2_000;

/// Timeout for `page.goto()` and the following load wait
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Time given to client-side rendering after the load event fires
pub const DEFAULT_PAGE_SETTLE_MS: u64 = 1_500;

/// Minimum spacing between two navigations to the same host
pub const DEFAULT_MIN_PAGE_INTERVAL_MS: u64 = 1_000;

/// Lower bound for the recurring scan interval
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 60;

/// Upper bound for the recurring scan interval (one week)
pub const DEFAULT_MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Interval used when no settings were ever saved
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60 * 60;

/// Broadcast channel capacity for scan events
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Chrome user agent string used for every page
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
