//! Core traits defined in `gatehouse-core` and implemented by other crates.

pub mod cache;

pub use cache::CacheProvider;
