//! Background last-used stamping for key pairs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use gatehouse_database::KeyPairRepository;

#[derive(Debug)]
struct Touch {
    key_pair_id: Uuid,
    at: DateTime<Utc>,
}

/// Queues `last_used_at` updates and applies them on one background task.
///
/// Validation never waits on the update: when the queue is full the touch
/// is dropped.
#[derive(Debug, Clone)]
pub struct LastUsedDispatcher {
    tx: mpsc::Sender<Touch>,
}

/// Handle for the background task; completes once every dispatcher clone
/// has been dropped and the queue is drained.
#[derive(Debug)]
pub struct LastUsedWorker {
    task: JoinHandle<()>,
}

impl LastUsedWorker {
    /// Wait for queued updates to finish.
    pub async fn shutdown(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "Last-used worker terminated abnormally");
        }
    }
}

impl LastUsedDispatcher {
    /// Spawn the background task with a queue of `capacity` updates.
    pub fn spawn(repo: Arc<dyn KeyPairRepository>, capacity: usize) -> (Self, LastUsedWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = LastUsedWorker {
            task: tokio::spawn(Self::run(repo, rx)),
        };
        (Self { tx }, worker)
    }

    /// Queue a touch. Returns `false` if it was dropped.
    pub fn touch(&self, key_pair_id: Uuid) -> bool {
        let touch = Touch {
            key_pair_id,
            at: Utc::now(),
        };
        match self.tx.try_send(touch) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(key_pair_id = %key_pair_id, "Last-used queue full, dropping update");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(key_pair_id = %key_pair_id, "Last-used worker has stopped");
                false
            }
        }
    }

    async fn run(repo: Arc<dyn KeyPairRepository>, mut rx: mpsc::Receiver<Touch>) {
        while let Some(touch) = rx.recv().await {
            if let Err(e) = repo.touch_last_used(touch.key_pair_id, touch.at).await {
                warn!(
                    key_pair_id = %touch.key_pair_id,
                    error = %e,
                    "Failed to record key pair use"
                );
            }
        }
        debug!("Last-used worker stopped");
    }
}
