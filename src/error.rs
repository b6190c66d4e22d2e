//! Error types for scanning operations
//!
//! Every failure the core can produce is one of these enums. Callers at the
//! presentation edge turn them into structured responses; nothing here is
//! allowed to escape as a panic.

use thiserror::Error;

use crate::browser_session::Holder;
use crate::catalog::{JobKey, SourceId};

/// Failure of a single navigation in the browser session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The page did not finish loading within the configured timeout
    #[error("navigation to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// DNS, connection or TLS level failure
    #[error("network error loading {url}: {reason}")]
    Network { url: String, reason: String },

    /// The server answered with an error status
    #[error("{url} responded with HTTP {status}")]
    Http { url: String, status: u16 },

    /// The browser itself failed (crashed target, CDP error, launch failure)
    #[error("browser error: {0}")]
    Browser(String),
}

impl NavigationError {
    /// Whether a second attempt has a realistic chance of succeeding
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Browser(_) => false,
        }
    }
}

/// Errors reported by the controllable browser session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Another party currently holds the session
    #[error("browser session is held for {0} use")]
    Busy(Holder),

    /// The call requires an open session
    #[error("browser session is not open")]
    NotOpen,

    /// The session was closed while the caller was using it
    #[error("browser session was closed")]
    Closed,

    /// The session only loads absolute http(s) URLs
    #[error("not an http(s) URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// Errors reported by the catalog and settings collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or written
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A job with the same (site, external id) key already exists
    #[error("job {0} already exists")]
    Conflict(JobKey),

    #[error("not found: {0}")]
    NotFound(String),

    /// Persisted data could not be decoded
    #[error("corrupt store data: {0}")]
    Corrupt(String),
}

impl StoreError {
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// The scan error taxonomy surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Transient navigation failure that survived the retry
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// The adapter met page structure it did not expect
    #[error("extraction anomaly on {url}: {detail}")]
    ExtractionAnomaly { url: String, detail: String },

    /// An anti-bot interstitial replaced the results page
    #[error("source {0} is blocked by an anti-bot interstitial")]
    SourceBlocked(SourceId),

    /// The browser session stayed held for interactive use
    #[error("browser session is busy with interactive use")]
    SessionBusy,

    /// A catalog or settings write failed
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Settings update rejected before any mutation
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A newer on-demand request replaced this one in the scan queue
    #[error("scan request superseded by a newer request")]
    Superseded,

    #[error("source {0} not found")]
    SourceNotFound(SourceId),

    /// Stopped by `stop_scan` or by closing the browser session
    #[error("scan aborted")]
    Aborted,
}

impl From<StoreError> for ScanError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<ConfigError> for ScanError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigInvalid(err.to_string())
    }
}

impl From<SessionError> for ScanError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Busy(_) => Self::SessionBusy,
            SessionError::NotOpen | SessionError::Closed => Self::Aborted,
            SessionError::Navigation(nav) => Self::Navigation(nav),
            SessionError::InvalidUrl(url) => Self::ConfigInvalid(format!("not an http(s) URL: {url}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let timeout = NavigationError::Timeout {
            url: "https://example.com".into(),
            secs: 30,
        };
        assert!(timeout.is_transient());

        let not_found = NavigationError::Http {
            url: "https://example.com/gone".into(),
            status: 404,
        };
        assert!(!not_found.is_transient());

        let throttled = NavigationError::Http {
            url: "https://example.com".into(),
            status: 429,
        };
        assert!(throttled.is_transient());
        assert!(!NavigationError::Browser("target crashed".into()).is_transient());
    }

    #[test]
    fn test_session_busy_maps_to_scan_busy() {
        let err: ScanError = SessionError::Busy(Holder::Interactive).into();
        assert_eq!(err, ScanError::SessionBusy);
    }
}
