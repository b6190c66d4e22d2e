//! Controllable browser session
//!
//! One browser surface shared by two kinds of users: a person driving it
//! interactively (logging in to a board, clearing a challenge) and the
//! scanner. The holder contract keeps them apart: `open` takes an
//! interactive hold, `acquire_for_scan` waits for the session to be free and
//! returns a [`ScanLease`] that releases on drop.
//!
//! Navigations are serialized behind one lock and never cancelled. `close`
//! only changes state; a navigation still in flight when the session closes
//! completes in the driver but its result is discarded.

pub mod chromium;
pub mod driver;
pub mod history;
pub mod pacing;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::extraction::PageContent;
use crate::utils::is_valid_url;

pub use chromium::ChromiumDriver;
pub use driver::PageDriver;
pub use history::History;
pub use pacing::Pacer;

/// Who currently holds the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    Free,
    Interactive,
    Scan,
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::Interactive => "interactive",
            Self::Scan => "scan",
        })
    }
}

/// Lifecycle state of the session surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Closed,
    Loading { url: String },
    /// `url` is `None` when the first navigation of this opening failed
    Ready { url: Option<String> },
}

impl SessionState {
    #[must_use]
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

#[derive(Debug)]
struct SessionCore {
    state: SessionState,
    history: History,
    /// Bumped by every `close`; a navigation started under an older epoch
    /// must not publish its result
    epoch: u64,
}

enum Move {
    Push(String),
    Back,
    Forward,
}

struct SessionInner {
    driver: Arc<dyn PageDriver>,
    nav_lock: tokio::sync::Mutex<()>,
    core: Mutex<SessionCore>,
    holder: watch::Sender<Holder>,
    finished: watch::Sender<u64>,
    pacer: Pacer,
}

/// Cheap-to-clone handle to the shared session
#[derive(Clone)]
pub struct BrowserSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession")
            .field("holder", &self.holder())
            .field("state", &self.state())
            .finish()
    }
}

impl BrowserSession {
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, min_page_interval: Duration) -> Self {
        let (holder, _) = watch::channel(Holder::Free);
        let (finished, _) = watch::channel(0);
        Self {
            inner: Arc::new(SessionInner {
                driver,
                nav_lock: tokio::sync::Mutex::new(()),
                core: Mutex::new(SessionCore {
                    state: SessionState::Closed,
                    history: History::new(),
                    epoch: 0,
                }),
                holder,
                finished,
                pacer: Pacer::new(min_page_interval),
            }),
        }
    }

    #[must_use]
    pub fn holder(&self) -> Holder {
        *self.inner.holder.borrow()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state.clone()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.core.lock().state.is_open()
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.inner.core.lock().history.can_go_back()
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.inner.core.lock().history.can_go_forward()
    }

    /// Receiver that ticks every time an interactive step is finished
    #[must_use]
    pub fn finished_signal(&self) -> watch::Receiver<u64> {
        self.inner.finished.subscribe()
    }

    /// Open the session for interactive use and load `url`
    ///
    /// Re-opening while already held interactively just navigates.
    ///
    /// # Errors
    ///
    /// `SessionError::InvalidUrl` for anything but an absolute http(s) URL,
    /// `SessionError::Busy(Holder::Scan)` while a scan holds the session;
    /// navigation failures otherwise (the session stays open).
    pub async fn open(&self, url: &str) -> Result<PageContent, SessionError> {
        if !is_valid_url(url) {
            return Err(SessionError::InvalidUrl(url.to_string()));
        }
        let mut busy = None;
        self.inner.holder.send_if_modified(|h| match *h {
            Holder::Free => {
                *h = Holder::Interactive;
                true
            }
            Holder::Interactive => false,
            Holder::Scan => {
                busy = Some(Holder::Scan);
                false
            }
        });
        if let Some(holder) = busy {
            return Err(SessionError::Busy(holder));
        }
        info!("Opening interactive browser session at {url}");
        self.load(Move::Push(url.to_string()), None)
            .await
            .map(|page| page.unwrap_or_else(|| PageContent::new(url, String::new())))
    }

    /// Navigate the interactively held session
    ///
    /// # Errors
    ///
    /// `InvalidUrl` for anything but an absolute http(s) URL, `NotOpen` when
    /// nobody opened the session, `Busy(Scan)` while a scan holds it, or the
    /// navigation failure.
    pub async fn navigate(&self, url: &str) -> Result<PageContent, SessionError> {
        if !is_valid_url(url) {
            return Err(SessionError::InvalidUrl(url.to_string()));
        }
        self.require_interactive()?;
        self.load(Move::Push(url.to_string()), None)
            .await?
            .ok_or(SessionError::NotOpen)
    }

    /// Go one entry back. `Ok(false)` at the start of history.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::navigate`].
    pub async fn go_back(&self) -> Result<bool, SessionError> {
        self.require_interactive()?;
        Ok(self.load(Move::Back, None).await?.is_some())
    }

    /// Go one entry forward. `Ok(false)` at the end of history.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::navigate`].
    pub async fn go_forward(&self) -> Result<bool, SessionError> {
        self.require_interactive()?;
        Ok(self.load(Move::Forward, None).await?.is_some())
    }

    /// The page currently displayed
    ///
    /// # Errors
    ///
    /// `NotOpen` when the session is closed, or the driver's failure.
    pub async fn content(&self) -> Result<PageContent, SessionError> {
        let _nav = self.inner.nav_lock.lock().await;
        if !self.is_open() {
            return Err(SessionError::NotOpen);
        }
        Ok(self.inner.driver.content().await?)
    }

    /// Close the session. Idempotent.
    ///
    /// Releases an interactive hold. A scan lease stays held but is revoked:
    /// its next navigation fails and its current one is discarded.
    pub fn close(&self) {
        let was_open = {
            let mut core = self.inner.core.lock();
            core.epoch += 1;
            core.history.clear();
            std::mem::replace(&mut core.state, SessionState::Closed).is_open()
        };
        self.inner.holder.send_if_modified(|h| {
            if *h == Holder::Interactive {
                *h = Holder::Free;
                true
            } else {
                false
            }
        });
        if was_open {
            info!("Browser session closed");
        }
    }

    /// Finish the pending interactive step: close the interactive session
    /// and signal waiters. Returns `false` when no interactive hold existed.
    pub fn finish(&self) -> bool {
        if self.holder() != Holder::Interactive {
            return false;
        }
        self.close();
        self.inner.finished.send_modify(|n| *n += 1);
        debug!("Interactive step finished");
        true
    }

    /// Wait up to `wait` for the session to be free and take it for a scan
    ///
    /// Does not touch navigation state while waiting.
    ///
    /// # Errors
    ///
    /// `SessionError::Busy` with the holder at the deadline.
    pub async fn acquire_for_scan(&self, wait: Duration) -> Result<ScanLease, SessionError> {
        let mut rx = self.inner.holder.subscribe();
        let claim = async {
            loop {
                let mut claimed = false;
                self.inner.holder.send_if_modified(|h| {
                    if *h == Holder::Free {
                        *h = Holder::Scan;
                        claimed = true;
                        true
                    } else {
                        false
                    }
                });
                if claimed {
                    return;
                }
                if rx.changed().await.is_err() {
                    // sender lives in `inner`, which we hold
                    std::future::pending::<()>().await;
                }
            }
        };

        if tokio::time::timeout(wait, claim).await.is_err() {
            let holder = self.holder();
            debug!("Browser session still held by {holder} after {wait:?}");
            return Err(SessionError::Busy(holder));
        }

        let epoch = self.inner.core.lock().epoch;
        Ok(ScanLease {
            session: self.clone(),
            epoch,
        })
    }

    /// Close the session and release the browser process
    pub async fn shutdown(&self) {
        self.close();
        let _nav = self.inner.nav_lock.lock().await;
        self.inner.driver.shutdown().await;
    }

    fn require_interactive(&self) -> Result<(), SessionError> {
        match self.holder() {
            Holder::Interactive => Ok(()),
            Holder::Free => Err(SessionError::NotOpen),
            Holder::Scan => Err(SessionError::Busy(Holder::Scan)),
        }
    }

    /// Run one navigation. `Ok(None)` for history moves at a boundary.
    async fn load(
        &self,
        step: Move,
        lease_epoch: Option<u64>,
    ) -> Result<Option<PageContent>, SessionError> {
        let _nav = self.inner.nav_lock.lock().await;

        let (target, epoch) = {
            let mut core = self.inner.core.lock();
            if lease_epoch.is_some_and(|e| e != core.epoch) {
                return Err(SessionError::Closed);
            }
            let target = match &step {
                Move::Push(url) => url.clone(),
                Move::Back => match core.history.back_target() {
                    Some(url) => url.to_string(),
                    None => return Ok(None),
                },
                Move::Forward => match core.history.forward_target() {
                    Some(url) => url.to_string(),
                    None => return Ok(None),
                },
            };
            core.state = SessionState::Loading {
                url: target.clone(),
            };
            (target, core.epoch)
        };

        self.inner.pacer.wait(&target).await;
        debug!("Navigating to {target}");
        let result = self.inner.driver.navigate(&target).await;

        let mut core = self.inner.core.lock();
        if core.epoch != epoch {
            debug!("Discarding navigation to {target}: session closed meanwhile");
            return Err(SessionError::Closed);
        }
        match result {
            Ok(page) => {
                match step {
                    Move::Push(_) => core.history.push(page.url.clone()),
                    Move::Back => core.history.step_back(),
                    Move::Forward => core.history.step_forward(),
                }
                core.state = SessionState::Ready {
                    url: Some(page.url.clone()),
                };
                Ok(Some(page))
            }
            Err(e) => {
                let url = core.history.current().map(str::to_string);
                core.state = SessionState::Ready { url };
                Err(e.into())
            }
        }
    }
}

/// Exclusive scan use of the session; releases on drop
pub struct ScanLease {
    session: BrowserSession,
    epoch: u64,
}

impl ScanLease {
    /// Load a page for the scan
    ///
    /// # Errors
    ///
    /// `SessionError::Closed` once the session was closed under the lease,
    /// navigation failures otherwise.
    pub async fn load(&self, url: &str) -> Result<PageContent, SessionError> {
        self.session
            .load(Move::Push(url.to_string()), Some(self.epoch))
            .await?
            .ok_or(SessionError::Closed)
    }

    /// Whether the session was closed since the lease was taken
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.session.inner.core.lock().epoch != self.epoch
    }
}

impl Drop for ScanLease {
    fn drop(&mut self) {
        {
            let mut core = self.session.inner.core.lock();
            core.history.clear();
            core.state = SessionState::Closed;
        }
        self.session.inner.holder.send_if_modified(|h| {
            if *h == Holder::Scan {
                *h = Holder::Free;
                true
            } else {
                false
            }
        });
    }
}
