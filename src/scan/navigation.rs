//! Loading one results page for a scan, with a single retry

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::browser_session::ScanLease;
use crate::error::ScanError;
use crate::extraction::{ExtractionAdapter, PageContent};

pub(crate) enum Fetched {
    Page(PageContent),
    Blocked(PageContent),
}

/// Backoff plus up to a quarter of it as jitter
fn retry_delay(backoff: Duration) -> Duration {
    let max_jitter = u64::try_from(backoff.as_millis() / 4).unwrap_or(u64::MAX);
    if max_jitter == 0 {
        return backoff;
    }
    backoff + Duration::from_millis(rand::rng().random_range(0..=max_jitter))
}

async fn attempt(
    lease: &ScanLease,
    adapter: &dyn ExtractionAdapter,
    url: &str,
) -> Result<Fetched, ScanError> {
    let page = lease.load(url).await?;
    // a challenge page often comes with 403/429; it is a block, not a failure
    if adapter.is_blocked(&page) {
        return Ok(Fetched::Blocked(page));
    }
    if let Some(err) = page.http_error() {
        return Err(err.into());
    }
    Ok(Fetched::Page(page))
}

/// Load `url`, retrying once after `backoff` when the failure is transient
pub(crate) async fn fetch_page(
    lease: &ScanLease,
    adapter: &dyn ExtractionAdapter,
    url: &str,
    backoff: Duration,
) -> Result<Fetched, ScanError> {
    match attempt(lease, adapter, url).await {
        Err(ScanError::Navigation(err)) if err.is_transient() => {
            let delay = retry_delay(backoff);
            warn!("Navigation to {url} failed ({err}), retrying in {delay:?}");
            tokio::time::sleep(delay).await;
            if lease.is_revoked() {
                return Err(ScanError::Aborted);
            }
            let retried = attempt(lease, adapter, url).await;
            if let Err(e) = &retried {
                debug!("Retry of {url} failed: {e}");
            }
            retried
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_bounds() {
        let backoff = Duration::from_millis(2000);
        for _ in 0..50 {
            let d = retry_delay(backoff);
            assert!(d >= backoff && d <= Duration::from_millis(2500));
        }
        assert_eq!(retry_delay(Duration::ZERO), Duration::ZERO);
    }
}
