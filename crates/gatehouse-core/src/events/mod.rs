//! Events emitted by Gatehouse operations.
//!
//! Audit events are produced by the service-layer interceptor chain and
//! handed to an external sink; the core never stores them.

pub mod audit;

pub use audit::{AuditEvent, AuditOutcome};
