//! Audit records for completed auth operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, ErrorKind};

/// How an audited operation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The operation returned successfully.
    Success,
    /// The operation returned an error.
    Failure {
        /// Error category.
        kind: ErrorKind,
        /// Error message as returned to the caller.
        message: String,
    },
}

impl AuditOutcome {
    /// Build the failure outcome for an error.
    pub fn from_error(err: &AppError) -> Self {
        Self::Failure {
            kind: err.kind,
            message: err.message.clone(),
        }
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A single audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID (time ordered).
    pub id: Uuid,
    /// When the operation completed.
    pub timestamp: DateTime<Utc>,
    /// Operation name, e.g. `auth.login`.
    pub operation: String,
    /// The user on whose behalf the operation ran, when known.
    pub actor_id: Option<Uuid>,
    /// Outcome of the operation.
    pub outcome: AuditOutcome,
    /// Wall time spent in the operation.
    pub duration_ms: u64,
    /// Free-form request metadata (ip address, user agent, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl AuditEvent {
    /// Create a new audit event stamped with the current time.
    pub fn new(operation: impl Into<String>, actor_id: Option<Uuid>, outcome: AuditOutcome) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            operation: operation.into(),
            actor_id,
            outcome,
            duration_ms: 0,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach the measured duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
