//! Session domain entities.

pub mod model;
pub mod token;

pub use model::{CreateSession, DeviceInfo, RefreshRotation, Session, SessionRotation};
pub use token::TokenPair;
