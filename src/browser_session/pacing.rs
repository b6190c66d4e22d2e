//! Per-host navigation pacing
//!
//! Consecutive navigations to the same host are spaced by a minimum
//! interval. The session serializes navigations, so the pacer only has to
//! remember when each host was last visited.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::utils::host_key;

#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last_visit: DashMap<String, Instant>,
}

impl Pacer {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_visit: DashMap::new(),
        }
    }

    /// How long a navigation to `url` has to wait right now
    #[must_use]
    pub fn delay_for(&self, url: &str) -> Duration {
        if self.min_interval.is_zero() {
            return Duration::ZERO;
        }
        let Some(host) = host_key(url) else {
            return Duration::ZERO;
        };
        self.last_visit
            .get(&host)
            .map(|last| (*last + self.min_interval).saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Sleep until `url`'s host may be visited again, then record the visit
    pub async fn wait(&self, url: &str) {
        let delay = self.delay_for(url);
        if !delay.is_zero() {
            log::debug!("Pacing navigation to {url} by {delay:?}");
            tokio::time::sleep(delay).await;
        }
        if let Some(host) = host_key(url) {
            self.last_visit.insert(host, Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_same_host_is_spaced() {
        let pacer = Pacer::new(Duration::from_secs(2));
        let start = Instant::now();
        pacer.wait("https://jobs.example.com/a").await;
        pacer.wait("https://jobs.example.com/b").await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_hosts_are_independent() {
        let pacer = Pacer::new(Duration::from_secs(2));
        pacer.wait("https://jobs.example.com/a").await;
        assert_eq!(pacer.delay_for("https://other.example.org/"), Duration::ZERO);
        assert!(pacer.delay_for("https://jobs.example.com/c") > Duration::ZERO);
    }
}
