//! Role and permission entities backing scope resolution.

pub mod model;

pub use model::{OrganizationMember, Permission, Role, ScopeLevel};
