//! Ordered interceptor dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;
use uuid::Uuid;

use gatehouse_core::events::AuditOutcome;
use gatehouse_core::result::AppResult;

use super::{Interceptor, OperationContext};

/// Global interceptors followed by the ones registered for an operation.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    global: Vec<Arc<dyn Interceptor>>,
    by_operation: HashMap<&'static str, Vec<Arc<dyn Interceptor>>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("global", &self.global.len())
            .field("operations", &self.by_operation.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InterceptorChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `interceptor` around every operation.
    pub fn register_global(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.global.push(interceptor);
        self
    }

    /// Run `interceptor` around `operation` only.
    pub fn register(mut self, operation: &'static str, interceptor: Arc<dyn Interceptor>) -> Self {
        self.by_operation
            .entry(operation)
            .or_default()
            .push(interceptor);
        self
    }

    /// Number of interceptors that apply to `operation`.
    pub fn len_for(&self, operation: &str) -> usize {
        self.global.len() + self.by_operation.get(operation).map_or(0, Vec::len)
    }

    fn for_operation<'a>(&'a self, operation: &str) -> Vec<&'a Arc<dyn Interceptor>> {
        self.global
            .iter()
            .chain(self.by_operation.get(operation).into_iter().flatten())
            .collect()
    }

    /// Run `fut` as `ctx.operation`.
    pub async fn run<T, F>(&self, ctx: OperationContext, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        self.run_identified(ctx, fut, |_| None).await
    }

    /// Run `fut`, taking the actor from the result when the context did not
    /// know it up front (login, registration).
    pub async fn run_identified<T, F, A>(
        &self,
        mut ctx: OperationContext,
        fut: F,
        actor_of: A,
    ) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
        A: FnOnce(&T) -> Option<Uuid>,
    {
        let interceptors = self.for_operation(ctx.operation);
        if interceptors.is_empty() {
            return fut.await;
        }

        for interceptor in &interceptors {
            if let Err(e) = interceptor.before(&ctx).await {
                warn!(
                    interceptor = interceptor.name(),
                    operation = ctx.operation,
                    error = %e,
                    "Interceptor failed before operation"
                );
            }
        }

        let started = Instant::now();
        let result = fut.await;
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(value) => {
                if ctx.actor_id.is_none() {
                    ctx.actor_id = actor_of(value);
                }
                AuditOutcome::Success
            }
            Err(e) => AuditOutcome::from_error(e),
        };

        for interceptor in &interceptors {
            if let Err(e) = interceptor.after(&ctx, &outcome, elapsed).await {
                warn!(
                    interceptor = interceptor.name(),
                    operation = ctx.operation,
                    error = %e,
                    "Interceptor failed after operation"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use gatehouse_core::error::{AppError, ErrorKind};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, Option<Uuid>, bool)>>,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn after(
            &self,
            ctx: &OperationContext,
            outcome: &AuditOutcome,
            _elapsed: Duration,
        ) -> AppResult<()> {
            self.seen.lock().unwrap().push((
                ctx.operation.to_string(),
                ctx.actor_id,
                outcome.is_success(),
            ));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Interceptor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn before(&self, _ctx: &OperationContext) -> AppResult<()> {
            Err(AppError::internal("sink down"))
        }

        async fn after(
            &self,
            _ctx: &OperationContext,
            _outcome: &AuditOutcome,
            _elapsed: Duration,
        ) -> AppResult<()> {
            Err(AppError::internal("sink down"))
        }
    }

    #[tokio::test]
    async fn test_keyed_interceptor_only_sees_its_operation() {
        let recorder = Arc::new(Recorder::default());
        let chain = InterceptorChain::new().register("auth.login", recorder.clone());

        chain
            .run(OperationContext::new("auth.refresh"), async { Ok(()) })
            .await
            .unwrap();
        chain
            .run(OperationContext::new("auth.login"), async { Ok(()) })
            .await
            .unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "auth.login");
    }

    #[tokio::test]
    async fn test_actor_taken_from_result() {
        let recorder = Arc::new(Recorder::default());
        let chain = InterceptorChain::new().register_global(recorder.clone());
        let user = Uuid::now_v7();

        let value = chain
            .run_identified(OperationContext::new("auth.login"), async { Ok(user) }, |id| {
                Some(*id)
            })
            .await
            .unwrap();
        assert_eq!(value, user);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].1, Some(user));
        assert!(seen[0].2);
    }

    #[tokio::test]
    async fn test_interceptor_failure_does_not_change_result() {
        let recorder = Arc::new(Recorder::default());
        let chain = InterceptorChain::new()
            .register_global(Arc::new(Failing))
            .register_global(recorder.clone());

        let err = chain
            .run::<(), _>(OperationContext::new("auth.logout"), async {
                Err(AppError::unauthorized("nope"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let ok = chain
            .run(OperationContext::new("auth.logout"), async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(ok, 5);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].2);
        assert_eq!(chain.len_for("auth.logout"), 2);
    }
}
