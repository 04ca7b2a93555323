//! # gatehouse-entity
//!
//! Credential store entity models for Gatehouse. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! derive `sqlx::FromRow`; enums stored in PostgreSQL derive `sqlx::Type`.

pub mod credential;
pub mod password;
pub mod permission;
pub mod revocation;
pub mod session;
pub mod user;
