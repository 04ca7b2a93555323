//! Cross-cutting hooks around orchestrator operations.
//!
//! An [`InterceptorChain`] holds global interceptors and interceptors keyed
//! by operation name (`auth.login`, `auth.refresh`, ...). Interceptors
//! observe operations; they cannot change or abort them, and their own
//! failures are logged and swallowed.

pub mod audit;
pub mod chain;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use gatehouse_core::events::AuditOutcome;
use gatehouse_core::result::AppResult;

pub use audit::{AuditInterceptor, AuditSink, TracingAuditSink};
pub use chain::InterceptorChain;

/// What an interceptor sees of a running operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Operation name.
    pub operation: &'static str,
    /// Acting user, when known before or after the call.
    pub actor_id: Option<Uuid>,
    /// Request metadata (ip address, user agent, target ids).
    pub metadata: BTreeMap<String, String>,
}

impl OperationContext {
    /// Context for `operation` with no actor yet.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            actor_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the acting user.
    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Attach a metadata entry when a value is present.
    pub fn with_optional(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_metadata(key, value),
            None => self,
        }
    }
}

/// A hook run before and after an operation.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Called before the operation starts.
    async fn before(&self, _ctx: &OperationContext) -> AppResult<()> {
        Ok(())
    }

    /// Called once the operation returned.
    async fn after(
        &self,
        ctx: &OperationContext,
        outcome: &AuditOutcome,
        elapsed: Duration,
    ) -> AppResult<()>;
}
