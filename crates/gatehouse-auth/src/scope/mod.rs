//! Effective permission resolution.

pub mod resolution;
pub mod resolver;

pub use resolution::ScopeResolution;
pub use resolver::ScopeResolver;
