//! Scheduled maintenance for Gatehouse.
//!
//! This crate provides:
//! - The sweeps that prune expired sessions, blacklist entries, stale user
//!   cutoffs and spent password-reset tokens
//! - A scheduler that runs each sweep on its configured interval

pub mod scheduler;
pub mod tasks;

pub use scheduler::{MaintenanceScheduler, Sweep};
pub use tasks::MaintenanceTasks;
