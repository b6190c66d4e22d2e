//! Single-scan gate
//!
//! At most one scan runs at a time. One more request may wait; a newer
//! request replaces the waiting one, which resolves as superseded. A
//! finishing scan hands its permit straight to the waiter, so the gate never
//! looks idle between the two.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::error::ScanError;

#[derive(Debug, Default)]
struct GateState {
    active: bool,
    queued: Option<oneshot::Sender<ScanPermit>>,
}

#[derive(Debug)]
pub struct ScanGate {
    state: Mutex<GateState>,
    active_tx: watch::Sender<bool>,
}

impl Default for ScanGate {
    fn default() -> Self {
        let (active_tx, _) = watch::channel(false);
        Self {
            state: Mutex::new(GateState::default()),
            active_tx,
        }
    }
}

impl ScanGate {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait for the right to scan
    ///
    /// # Errors
    ///
    /// `ScanError::Superseded` when a newer request took this one's place in
    /// the queue.
    pub async fn acquire(self: &Arc<Self>) -> Result<ScanPermit, ScanError> {
        let waiting = {
            let mut state = self.state.lock();
            if !state.active {
                state.active = true;
                self.active_tx.send_replace(true);
                return Ok(ScanPermit {
                    gate: Arc::clone(self),
                });
            }
            let (tx, rx) = oneshot::channel();
            if state.queued.replace(tx).is_some() {
                debug!("Queued scan request replaced by a newer one");
            }
            rx
        };
        waiting.await.map_err(|_| ScanError::Superseded)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Resolve once no scan is running or queued
    pub async fn wait_idle(&self) {
        let mut rx = self.active_tx.subscribe();
        // the sender lives as long as `self`
        let _ = rx.wait_for(|active| !*active).await;
    }

    fn release(self: &Arc<Self>) {
        let next = {
            let mut state = self.state.lock();
            match state.queued.take() {
                Some(tx) => Some(tx),
                None => {
                    state.active = false;
                    None
                }
            }
        };
        match next {
            Some(tx) => {
                // a waiter that gave up returns the permit, whose drop
                // releases again
                let _ = tx.send(ScanPermit {
                    gate: Arc::clone(self),
                });
            }
            None => {
                self.active_tx.send_replace(false);
            }
        }
    }
}

/// The right to run one scan; dropping it admits the queued request
#[derive(Debug)]
pub struct ScanPermit {
    gate: Arc<ScanGate>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_second_request_waits_for_first() {
        let gate = ScanGate::new();
        let first = gate.acquire().await.unwrap();
        assert!(gate.is_active());

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        drop(first);
        assert!(waiter.await.unwrap().is_ok());
        assert!(!gate.is_active());
    }

    #[tokio::test]
    async fn test_newest_request_supersedes_queued_one() {
        let gate = ScanGate::new();
        let running = gate.acquire().await.unwrap();

        let older = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let newer = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };

        assert_eq!(older.await.unwrap(), Err(ScanError::Superseded));
        drop(running);
        assert!(newer.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_wedge_gate() {
        let gate = ScanGate::new();
        let running = gate.acquire().await.unwrap();
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        waiter.abort();
        let _ = waiter.await;

        drop(running);
        assert!(!gate.is_active());
        gate.wait_idle().await;
        let _again = gate.acquire().await.unwrap();
        assert!(gate.is_active());
    }
}
