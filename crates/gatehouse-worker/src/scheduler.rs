//! Interval scheduler for the maintenance sweeps.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use gatehouse_core::config::WorkerConfig;
use gatehouse_core::error::AppError;

use crate::tasks::MaintenanceTasks;

/// One of the periodic sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// Expired sessions.
    Sessions,
    /// Expired blacklist entries and stale user cutoffs.
    Revocations,
    /// Expired password-reset tokens.
    ResetTokens,
}

impl Sweep {
    /// Name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sessions => "session_sweep",
            Self::Revocations => "revocation_sweep",
            Self::ResetTokens => "reset_token_sweep",
        }
    }

    async fn run(self, tasks: &MaintenanceTasks) {
        let result = match self {
            Self::Sessions => tasks.sweep_sessions().await,
            Self::Revocations => tasks.sweep_revocations().await,
            Self::ResetTokens => tasks.sweep_reset_tokens().await,
        };
        match result {
            Ok(removed) => info!(sweep = self.name(), removed, "Sweep finished"),
            Err(e) => error!(sweep = self.name(), error = %e, "Sweep failed"),
        }
    }
}

impl fmt::Display for Sweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs the maintenance sweeps on fixed intervals.
pub struct MaintenanceScheduler {
    scheduler: JobScheduler,
    tasks: Arc<MaintenanceTasks>,
    registered: Vec<Sweep>,
}

impl fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl MaintenanceScheduler {
    /// Create a scheduler with no sweeps registered.
    pub async fn new(tasks: MaintenanceTasks) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            tasks: Arc::new(tasks),
            registered: Vec::new(),
        })
    }

    /// Register every sweep at the interval `config` gives it.
    pub async fn register_default_tasks(&mut self, config: &WorkerConfig) -> Result<(), AppError> {
        self.register(Sweep::Sessions, config.session_sweep_interval_seconds)
            .await?;
        self.register(Sweep::Revocations, config.revocation_sweep_interval_seconds)
            .await?;
        self.register(Sweep::ResetTokens, config.reset_token_sweep_interval_seconds)
            .await?;
        Ok(())
    }

    /// Register one sweep to run every `interval_seconds`.
    pub async fn register(&mut self, sweep: Sweep, interval_seconds: u64) -> Result<(), AppError> {
        if interval_seconds == 0 {
            return Err(AppError::configuration(format!(
                "worker interval for {sweep} must be at least one second"
            )));
        }

        let tasks = Arc::clone(&self.tasks);
        let job = Job::new_repeated_async(Duration::from_secs(interval_seconds), move |_id, _lock| {
            let tasks = Arc::clone(&tasks);
            Box::pin(async move {
                sweep.run(&tasks).await;
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create {sweep} job: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {sweep} job: {e}")))?;

        self.registered.push(sweep);
        info!(sweep = %sweep, interval_seconds, "Registered maintenance sweep");
        Ok(())
    }

    /// Sweeps registered so far, in registration order.
    pub fn registered(&self) -> &[Sweep] {
        &self.registered
    }

    /// Start running the registered sweeps.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;
        info!(sweeps = self.registered.len(), "Maintenance scheduler started");
        Ok(())
    }

    /// Stop the scheduler. Sweeps already running finish on their own.
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;
        info!("Maintenance scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::config::SessionConfig;
    use gatehouse_core::error::ErrorKind;
    use gatehouse_database::CredentialStore;

    fn tasks() -> MaintenanceTasks {
        MaintenanceTasks::new(&CredentialStore::in_memory(), &SessionConfig::default()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_registers_every_sweep() {
        let mut scheduler = MaintenanceScheduler::new(tasks()).await.unwrap();
        scheduler
            .register_default_tasks(&WorkerConfig::default())
            .await
            .unwrap();

        assert_eq!(
            scheduler.registered(),
            &[Sweep::Sessions, Sweep::Revocations, Sweep::ResetTokens]
        );

        scheduler.start().await.unwrap();
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_zero_interval_is_rejected() {
        let mut scheduler = MaintenanceScheduler::new(tasks()).await.unwrap();
        let err = scheduler.register(Sweep::Sessions, 0).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(scheduler.registered().is_empty());
    }
}
