//! # gatehouse-service
//!
//! The auth orchestrator: the single entry point callers such as an HTTP
//! layer invoke for login, registration, refresh, logout, token
//! validation, password changes and resets, the OAuth session exchange and
//! key-pair management.
//!
//! Services follow constructor injection; every collaborator is provided at
//! construction time. Each public operation runs through an
//! [`InterceptorChain`] keyed by operation name.

pub mod auth;
pub mod context;
pub mod dto;
pub mod interceptor;
pub mod notifier;

pub use auth::{AuthService, ops};
pub use context::AuthContext;
pub use dto::{ApiKeyToken, KeyPairCreated, LoginResult, OAuthProfile};
pub use interceptor::{
    AuditInterceptor, AuditSink, Interceptor, InterceptorChain, OperationContext, TracingAuditSink,
};
pub use notifier::{LoggingResetNotifier, ResetNotifier};
