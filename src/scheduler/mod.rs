//! Recurring scan scheduler
//!
//! One timer task per scheduler. It fires a scan immediately when scanning
//! becomes enabled and then `interval` after each scan ends. Settings
//! updates reach the task through a watch channel, so a reschedule replaces
//! the pending deadline instead of adding a second timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::catalog::{ScanSettings, SettingsStore};
use crate::config::ScannerConfig;
use crate::error::ScanError;
use crate::scan::JobScanOrchestrator;

pub struct ScanScheduler {
    orchestrator: Arc<JobScanOrchestrator>,
    settings_store: Arc<dyn SettingsStore>,
    settings: watch::Sender<ScanSettings>,
    shutdown: watch::Sender<bool>,
    update_lock: tokio::sync::Mutex<()>,
    timer: Mutex<Option<JoinHandle<()>>>,
    min_interval_secs: u64,
    max_interval_secs: u64,
}

impl ScanScheduler {
    /// Load the stored settings and start the timer task
    ///
    /// Unreadable or missing settings fall back to the defaults; a stored
    /// interval outside the configured bounds is clamped.
    pub async fn start(
        orchestrator: Arc<JobScanOrchestrator>,
        settings_store: Arc<dyn SettingsStore>,
        config: &ScannerConfig,
    ) -> Arc<Self> {
        let min = config.min_interval_secs();
        let max = config.max_interval_secs();

        let mut initial = match settings_store.load_scan_settings().await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!("No stored scan settings, using defaults");
                ScanSettings::default()
            }
            Err(e) => {
                warn!("Failed to load scan settings, using defaults: {e}");
                ScanSettings::default()
            }
        };
        let clamped = initial.interval_secs.clamp(min, max);
        if clamped != initial.interval_secs {
            warn!(
                "Stored scan interval {}s outside [{min}, {max}], using {clamped}s",
                initial.interval_secs
            );
            initial.interval_secs = clamped;
        }

        let (settings, settings_rx) = watch::channel(initial);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let scheduler = Arc::new(Self {
            orchestrator: Arc::clone(&orchestrator),
            settings_store,
            settings,
            shutdown,
            update_lock: tokio::sync::Mutex::new(()),
            timer: Mutex::new(None),
            min_interval_secs: min,
            max_interval_secs: max,
        });

        let handle = tokio::spawn(run_timer(orchestrator, settings_rx, shutdown_rx));
        *scheduler.timer.lock() = Some(handle);
        info!(
            enabled = initial.enabled,
            interval_secs = initial.interval_secs,
            "Scan scheduler started"
        );
        scheduler
    }

    #[must_use]
    pub fn get_settings(&self) -> ScanSettings {
        *self.settings.borrow()
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.orchestrator.is_scanning()
    }

    /// Validate, persist, then reschedule
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` for an interval that is zero or out of bounds;
    /// `StoreUnavailable` when persisting fails. Either way the active
    /// settings and the timer are untouched.
    pub async fn update_settings(&self, next: ScanSettings) -> Result<ScanSettings, ScanError> {
        self.validate(&next)?;

        let _guard = self.update_lock.lock().await;
        self.settings_store.save_scan_settings(&next).await?;
        self.settings.send_replace(next);
        info!(
            enabled = next.enabled,
            interval_secs = next.interval_secs,
            "Scan settings updated"
        );
        Ok(next)
    }

    fn validate(&self, next: &ScanSettings) -> Result<(), ScanError> {
        if next.interval_secs == 0 {
            return Err(ScanError::ConfigInvalid(
                "scan interval must be positive".into(),
            ));
        }
        if next.interval_secs < self.min_interval_secs || next.interval_secs > self.max_interval_secs {
            return Err(ScanError::ConfigInvalid(format!(
                "scan interval {}s outside [{}s, {}s]",
                next.interval_secs, self.min_interval_secs, self.max_interval_secs
            )));
        }
        Ok(())
    }

    /// Stop the timer; a running scan is asked to stop and awaited
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.orchestrator.stop_scan();
        let handle = self.timer.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(Duration::from_secs(30), handle).await {
                Ok(Ok(())) => debug!("Scan timer stopped"),
                Ok(Err(e)) => error!("Scan timer task failed: {e}"),
                Err(_) => warn!("Scan timer did not stop within 30s"),
            }
        }
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

async fn run_timer(
    orchestrator: Arc<JobScanOrchestrator>,
    mut settings_rx: watch::Receiver<ScanSettings>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // end of the last scheduled scan while enabled; `None` means the next
    // tick is immediate
    let mut last_end: Option<Instant> = None;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let settings = *settings_rx.borrow_and_update();

        if !settings.enabled {
            last_end = None;
            tokio::select! {
                changed = settings_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
            continue;
        }

        let due = last_end.map_or_else(Instant::now, |end| end + settings.interval());
        tokio::select! {
            () = tokio::time::sleep_until(due) => {
                match orchestrator.scheduled_scan().await {
                    Ok(outcomes) => {
                        let ok = outcomes.values().filter(|o| o.is_success()).count();
                        info!("Scheduled scan finished: {ok}/{} sources succeeded", outcomes.len());
                    }
                    Err(ScanError::Superseded) => {
                        debug!("Scheduled scan superseded by an on-demand request");
                    }
                    Err(e) => error!("Scheduled scan failed: {e}"),
                }
                last_end = Some(Instant::now());
            }
            changed = settings_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Scan settings changed, rescheduling");
            }
            _ = shutdown_rx.changed() => break,
        }
    }
    debug!("Scan timer exiting");
}
