use sismo_backend::config;
use sismo_backend::module::monitor::Monitor;
use sismo_backend::module::push::{ExpoClient, NotificationDispatcher};
use sismo_backend::module::region::RegionMatcher;
use sismo_backend::module::scheduled::{ScheduledTaskConfig, ScheduledTaskManager};
use sismo_backend::module::sismo::HttpEventSource;
use sismo_backend::module::store::JsonStore;
use sismo_backend::server::{self, AppState};

use anyhow::{Context, Result};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::read_config(&config_path)?;

    // Initialize logging
    let _logging_guard = sismo_backend::logging::init_logging(
        &config.log_dir,
        "sismo-backend",
        &config.log_level,
    )?;

    tracing::info!("Sismo Backend starting...");
    tracing::info!("Server will listen on {}", config.server_address());

    // The service cannot answer anything without its store
    let store = Arc::new(
        JsonStore::open(&config.store.data_dir)
            .await
            .with_context(|| format!("Failed to open store at '{}'", config.store.data_dir))?,
    );

    let source = Arc::new(HttpEventSource::new(&config.source).context("Failed to build event source client")?);
    tracing::info!("Monitoring {}", source.url());

    let push = Arc::new(ExpoClient::new(&config.push)?);
    let monitor = Arc::new(Monitor::new(
        source,
        RegionMatcher::new(store.clone()),
        NotificationDispatcher::new(push.clone(), &config.push),
    ));

    // Configure and start scheduled tasks
    let mut task_manager = ScheduledTaskManager::new(ScheduledTaskConfig::from(&config.scheduler), monitor.clone());
    task_manager.start_all();
    tracing::info!("All scheduled tasks started successfully");

    let state = AppState {
        monitor,
        tokens: store.clone(),
        feedback: store,
        push,
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received.");
    };

    let served = server::serve(&config.server_address(), state, shutdown).await;

    task_manager.shutdown().await;
    served
}
