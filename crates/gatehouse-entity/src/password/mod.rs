//! Password reset entities.

pub mod reset;

pub use reset::PasswordResetToken;
