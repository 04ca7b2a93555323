//! Audit interceptor turning completed operations into audit events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use gatehouse_core::events::{AuditEvent, AuditOutcome};
use gatehouse_core::result::AppResult;

use super::{Interceptor, OperationContext};

/// Destination for audit events. Storage lives outside the auth core.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist or forward one event.
    async fn record(&self, event: AuditEvent) -> AppResult<()>;
}

/// Writes audit events to the `gatehouse::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> AppResult<()> {
        match &event.outcome {
            AuditOutcome::Success => info!(
                target: "gatehouse::audit",
                event_id = %event.id,
                operation = %event.operation,
                actor_id = ?event.actor_id,
                duration_ms = event.duration_ms,
                "Operation succeeded"
            ),
            AuditOutcome::Failure { kind, message } => warn!(
                target: "gatehouse::audit",
                event_id = %event.id,
                operation = %event.operation,
                actor_id = ?event.actor_id,
                duration_ms = event.duration_ms,
                error_kind = %kind,
                error = %message,
                "Operation failed"
            ),
        }
        Ok(())
    }
}

/// Emits one [`AuditEvent`] per completed operation.
#[derive(Clone)]
pub struct AuditInterceptor {
    sink: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for AuditInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditInterceptor").finish_non_exhaustive()
    }
}

impl AuditInterceptor {
    /// Interceptor writing to `sink`.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Interceptor for AuditInterceptor {
    fn name(&self) -> &str {
        "audit"
    }

    async fn after(
        &self,
        ctx: &OperationContext,
        outcome: &AuditOutcome,
        elapsed: Duration,
    ) -> AppResult<()> {
        let mut event = AuditEvent::new(ctx.operation, ctx.actor_id, outcome.clone())
            .with_duration_ms(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        for (key, value) in &ctx.metadata {
            event = event.with_metadata(key.as_str(), value.as_str());
        }
        self.sink.record(event).await
    }
}
