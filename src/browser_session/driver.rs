//! The seam between the session state machine and a real browser

use async_trait::async_trait;

use crate::error::NavigationError;
use crate::extraction::PageContent;

/// Something that can load URLs and report the rendered page
///
/// Implementations do not need to serialize calls; the session never issues
/// two at once.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load `url` and return the rendered page once it has settled.
    /// HTTP error statuses are returned as content, not as errors.
    async fn navigate(&self, url: &str) -> Result<PageContent, NavigationError>;

    /// The page currently shown, without navigating
    async fn content(&self) -> Result<PageContent, NavigationError>;

    /// Release the browser process. Further calls may relaunch it.
    async fn shutdown(&self);
}
