use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runwatch_core::{
    create_notifier, load_config, validate_config, BatchDriver, Notifier, StoreError,
    WatermarkStore,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("RUNWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("runwatch {} loading configuration from {:?}", VERSION, config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Watermark store: {:?}", config.store.path);

    let notifier = create_notifier(&config).context("Failed to create notifier")?;
    info!("Using delivery transport: {}", notifier.name());

    let store = WatermarkStore::new(&config.store.path);
    let driver = BatchDriver::new(notifier.clone())
        .with_lock_timeout(Duration::from_millis(config.store.lock_timeout_ms));

    // One batch per invocation; the scheduler provides the cadence.
    let result = driver.run(&store).await;
    notifier.shutdown().await;

    match result {
        Ok(summary) => {
            info!("Run detection finished: {}", summary);
            Ok(())
        }
        Err(StoreError::LockTimeout(path)) => Err(anyhow::anyhow!(
            "Could not acquire lock on {}; another invocation may be running",
            path.display()
        )),
        Err(e) => Err(e).context("Batch run failed"),
    }
}
