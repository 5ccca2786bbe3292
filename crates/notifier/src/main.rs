//! RentPulse notifier binary entrypoint.
//!
//! Starts the notification worker pool and drains it on ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use pulse_common::config::AppConfig;
use pulse_common::pools::create_redis_pool;

use pulse_notifier::sender::Sender;
use pulse_notifier::worker::WorkerPool;

/// Upper bound on the graceful drain after the shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_notifier=info".into()),
        )
        .json()
        .init();

    tracing::info!("RentPulse notifier starting...");

    // Missing configuration is fatal, but as a logged error, not a panic.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };
    let smtp = match config.smtp() {
        Ok(smtp) => smtp,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };

    let redis = create_redis_pool(&config).await?;

    let sender = Sender::new(&smtp)?;
    let pool = WorkerPool::new(redis, Arc::new(sender));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = pool.start(config.notifier_workers, shutdown_rx);

    tracing::info!(
        workers = config.notifier_workers,
        "Notifier running, waiting for jobs"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, draining workers...");
    shutdown_tx.send(true).ok();

    let drain = async {
        while workers.join_next().await.is_some() {}
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        tracing::warn!(
            timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "Drain timed out, aborting remaining workers"
        );
    }

    tracing::info!("RentPulse notifier stopped.");
    Ok(())
}
