//! Consumer setup and run loop

use crate::state::AppState;
use anyhow::{Context, Result};
use clamflow_core::Config;
use clamflow_worker::{create_consumer, MessageConsumer};
use std::sync::Arc;

pub async fn setup_consumer(config: &Config) -> Result<Arc<dyn MessageConsumer>> {
    tracing::info!(broker = %config.broker_type(), "Connecting message consumer...");
    let consumer = create_consumer(config)
        .await
        .context("Failed to create message consumer")?;
    Ok(consumer)
}

/// Run the consumer until SIGINT/SIGTERM closes it or the broker fails.
pub async fn run_consumer(consumer: Arc<dyn MessageConsumer>, state: Arc<AppState>) -> Result<()> {
    let signal_consumer = consumer.clone();
    let signal_task = tokio::spawn(async move {
        match clamflow_infra::shutdown_signal().await {
            Ok(()) => tracing::info!("Shutting down gracefully..."),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals, closing"),
        }
        if let Err(e) = signal_consumer.close() {
            tracing::error!(error = %e, "Failed to close consumer");
        }
    });

    let result = consumer.start_consumer(state).await;
    signal_task.abort();

    match result {
        Ok(()) => {
            tracing::info!("Consumer stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Consumer terminated with an unrecoverable error");
            Err(e).context("Message consumer failed")
        }
    }
}
