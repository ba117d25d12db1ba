//! Taskpad - Main Entry Point
//! Wires the store, simulated network and controllers, then runs the console

mod config;
mod console;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{AppConfig, LogFormat, StoreKind};
use console::Console;
use taskpad_core::application::{ListConfig, TaskListController, TaskService};
use taskpad_core::port::id_provider::UuidProvider;
use taskpad_core::port::time_provider::SystemTimeProvider;
use taskpad_core::port::{InMemoryTaskStore, NetworkConditions, RandomNetwork, TaskStore};
use taskpad_infra_sqlite::{create_pool, database_url, run_migrations, SqliteTaskStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // 2. Initialize logging (stderr, so the console owns stdout)
    init_logging(config.log_format)?;
    info!("Taskpad v{} starting...", VERSION);

    // 3. Open the store
    let store = open_store(&config).await?;

    // 4. Setup dependencies (DI wiring)
    let network: Arc<dyn NetworkConditions> = match config.seed {
        Some(seed) => Arc::new(RandomNetwork::seeded(config.network.clone(), seed)?),
        None => Arc::new(RandomNetwork::new(config.network.clone())?),
    };
    info!(
        min_latency_ms = config.network.min_latency.as_millis() as u64,
        max_latency_ms = config.network.max_latency.as_millis() as u64,
        success_rate = config.network.success_rate,
        seeded = config.seed.is_some(),
        "Simulated network configured"
    );

    let service = Arc::new(TaskService::new(
        store,
        network,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    ));
    let list = Arc::new(TaskListController::new(
        Arc::clone(&service),
        ListConfig {
            grace_period: config.grace_period,
        },
    ));
    let console = Console::new(service, Arc::clone(&list));

    // 5. Run until quit, end of input or Ctrl+C
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = console.run(stdin) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received. Exiting gracefully...");
        }
    }

    // 6. Graceful shutdown
    list.shutdown();
    info!("Shutdown complete.");

    Ok(())
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("taskpad=info"))
        .context("Failed to create env filter")?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn TaskStore>> {
    match config.store {
        StoreKind::Memory => {
            warn!("Using the in-memory store; tasks are lost on exit");
            Ok(Arc::new(InMemoryTaskStore::new()))
        }
        StoreKind::Sqlite => {
            if let Some(dir) = config.db_path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }

            info!(db_path = %config.db_path.display(), "Initializing database...");
            let pool = create_pool(&database_url(&config.db_path))
                .await
                .context("DB pool creation failed")?;
            run_migrations(&pool).await.context("Migration failed")?;

            Ok(Arc::new(SqliteTaskStore::new(pool)))
        }
    }
}
