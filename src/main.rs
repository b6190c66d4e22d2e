// jobprobe daemon
//
// Loads the config and the JSON catalog, starts the scan scheduler and runs
// until Ctrl-C. Set JOBPROBE_CONFIG to a JSON config file to override the
// defaults.

use std::sync::Arc;

use anyhow::{Context, Result};
use jobprobe::config::CONFIG_ENV_VAR;
use jobprobe::events::EventBusError;
use jobprobe::{
    BrowserSession, ChromiumDriver, JobScanOrchestrator, JsonFileStore, ScanEvent, ScanScheduler,
    ScannerConfig,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<ScannerConfig> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let config = ScannerConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.to_string_lossy()))?;
            info!("Loaded config from {}", path.to_string_lossy());
            Ok(config)
        }
        None => ScannerConfig::builder()
            .build()
            .context("Default config is invalid"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobprobe=info")),
        )
        .init();

    let config = load_config()?;
    let data_dir = config.data_dir();
    let store = Arc::new(
        JsonFileStore::open(&data_dir)
            .await
            .with_context(|| format!("Failed to open catalog in {}", data_dir.display()))?,
    );
    info!("Catalog at {}", data_dir.display());

    let driver = Arc::new(ChromiumDriver::new(&config));
    let session = BrowserSession::new(driver, config.min_page_interval());
    let orchestrator = Arc::new(JobScanOrchestrator::new(
        config.clone(),
        store.clone(),
        session,
    ));

    let mut events = orchestrator
        .events()
        .subscribe_filtered(|e| matches!(e, ScanEvent::PageProcessed { .. }));
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ScanEvent::PageProcessed {
                    source_id,
                    page,
                    created,
                    ..
                }) => debug!(source_id, page, created, "Page processed"),
                Ok(_) => {}
                Err(EventBusError::ReceiverLagged(missed)) => {
                    warn!("Event log fell behind, {missed} events missed");
                }
                Err(EventBusError::Shutdown) => break,
            }
        }
    });

    let scheduler = ScanScheduler::start(Arc::clone(&orchestrator), store, &config).await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    scheduler.shutdown().await;
    orchestrator.shutdown().await;
    event_log.abort();
    Ok(())
}
