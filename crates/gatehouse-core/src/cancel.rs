//! Deadline and cancellation helpers for credential store calls.
//!
//! Request paths wrap their store lookups in [`guarded`] so a caller can
//! abandon a verification early. Only read paths and single-row atomic
//! writes are wrapped; an aborted call never leaves partial state.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::result::AppResult;

/// Per-call limits applied to a store operation.
#[derive(Debug, Clone, Default)]
pub struct CallGuard {
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl CallGuard {
    /// A guard that never aborts.
    pub fn none() -> Self {
        Self::default()
    }

    /// Abort when `token` is cancelled.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Abort when `timeout` elapses. A zero duration disables the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Whether the guard has already fired its cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Run `fut` under the limits of `guard`.
pub async fn guarded<T, F>(guard: &CallGuard, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    if guard.is_cancelled() {
        return Err(AppError::cancelled(format!("{operation} cancelled")));
    }

    let bounded = async {
        match guard.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                AppError::cancelled(format!("{operation} exceeded {}ms", limit.as_millis()))
            })?,
            None => fut.await,
        }
    };

    match &guard.cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(AppError::cancelled(format!("{operation} cancelled"))),
            result = bounded => result,
        },
        None => bounded.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_passes_through_result() {
        let value = guarded(&CallGuard::none(), "lookup", async { Ok(7) })
            .await
            .expect("should succeed");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_precancelled_token_skips_future() {
        let token = CancellationToken::new();
        token.cancel();
        let guard = CallGuard::none().with_cancel(token);

        let ran = std::sync::atomic::AtomicBool::new(false);

        let result: AppResult<()> = guarded(&guard, "lookup", async {
            ran.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_slow_call() {
        let guard = CallGuard::none().with_timeout(Duration::from_millis(50));
        let result: AppResult<()> = guarded(&guard, "lookup", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_during_call() {
        let token = CancellationToken::new();
        let guard = CallGuard::none().with_cancel(token.clone());
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result: AppResult<()> = guarded(&guard, "lookup", async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        trigger.await.expect("trigger task");
        assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
    }
}
