//! # gatehouse-core
//!
//! Core crate for Gatehouse. Contains configuration schemas, the cache
//! provider trait, audit event types, cancellation
//! helpers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Gatehouse crates.

pub mod cancel;
pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
