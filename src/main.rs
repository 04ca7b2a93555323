//! Gatehouse daemon.
//!
//! Wires the credential store, cache and auth service together from
//! configuration and runs the maintenance sweeps until shutdown.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use gatehouse_auth::LastUsedDispatcher;
use gatehouse_cache::CacheManager;
use gatehouse_core::config::{AppConfig, DatabaseBackend};
use gatehouse_core::error::AppError;
use gatehouse_database::migration::run_migrations;
use gatehouse_database::{CredentialStore, DatabasePool};
use gatehouse_service::AuthService;
use gatehouse_worker::{MaintenanceScheduler, MaintenanceTasks};

#[tokio::main]
async fn main() {
    let env = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Gatehouse terminated");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Gatehouse v{}", env!("CARGO_PKG_VERSION"));

    // ── Credential store ─────────────────────────────────────────
    let (store, pool) = match config.database.backend {
        DatabaseBackend::Postgres => {
            let pool = DatabasePool::connect(&config.database).await?;
            if config.database.run_migrations {
                run_migrations(pool.pool()).await?;
            }
            (CredentialStore::postgres(pool.pool().clone()), Some(pool))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory credential store; data is lost on restart");
            (CredentialStore::in_memory(), None)
        }
    };

    // ── Cache ────────────────────────────────────────────────────
    let cache = CacheManager::new(&config.cache).await?;

    // ── Auth service ─────────────────────────────────────────────
    let (dispatcher, last_used_worker) = LastUsedDispatcher::spawn(
        Arc::clone(&store.key_pairs),
        config.credentials.last_used_queue_capacity,
    );
    let service = AuthService::from_config(&config, store.clone(), cache, dispatcher)?;
    tracing::info!(
        algorithm = %config.auth.token.algorithm,
        issuer = %config.auth.token.issuer,
        "Auth service ready"
    );

    // ── Maintenance ──────────────────────────────────────────────
    let scheduler = if config.worker.enabled {
        let tasks = MaintenanceTasks::new(&store, &config.session)?;
        let mut scheduler = MaintenanceScheduler::new(tasks).await?;
        scheduler.register_default_tasks(&config.worker).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Maintenance scheduler disabled");
        None
    };

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }

    // The last-used worker drains once every dispatcher handle is gone.
    drop(service);
    last_used_worker.shutdown().await;

    if let Some(pool) = pool {
        pool.close().await;
    }

    tracing::info!("Gatehouse shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
