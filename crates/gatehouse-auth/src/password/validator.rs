//! Password policy enforcement for new passwords.

use gatehouse_core::config::PasswordConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use zxcvbn::Score;

/// Validates password length and strength against configured policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    min_length: usize,
    max_length: usize,
    min_score: Score,
}

impl PasswordValidator {
    /// Create a validator from password configuration.
    pub fn new(config: &PasswordConfig) -> Self {
        let min_score = match config.min_strength_score {
            0 => Score::Zero,
            1 => Score::One,
            2 => Score::Two,
            3 => Score::Three,
            _ => Score::Four,
        };
        Self {
            min_length: config.min_length,
            max_length: config.max_length,
            min_score,
        }
    }

    /// Check a candidate password. `user_inputs` (email, names) count
    /// against its strength.
    pub fn validate(&self, password: &str, user_inputs: &[&str]) -> AppResult<()> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }
        if length > self.max_length {
            return Err(AppError::validation(format!(
                "Password must be at most {} characters long",
                self.max_length
            )));
        }

        let estimate = zxcvbn::zxcvbn(password, user_inputs);
        if estimate.score() < self.min_score {
            return Err(AppError::validation(
                "Password is too weak. Please use a stronger password with more entropy.",
            ));
        }

        Ok(())
    }

    /// Validates that a new password differs from the old one.
    pub fn validate_not_same(&self, old_password: &str, new_password: &str) -> AppResult<()> {
        if old_password == new_password {
            return Err(AppError::validation(
                "New password must be different from the current password",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::error::ErrorKind;

    fn validator() -> PasswordValidator {
        PasswordValidator::new(&PasswordConfig::default())
    }

    #[test]
    fn test_length_bounds() {
        let v = validator();
        assert_eq!(v.validate("Ab1!", &[]).unwrap_err().kind, ErrorKind::Validation);
        let long = "x".repeat(200);
        assert!(v.validate(&long, &[]).unwrap_err().message.contains("at most"));
    }

    #[test]
    fn test_strength() {
        let v = validator();
        assert!(v.validate("password", &[]).is_err());
        assert!(v.validate("tangerine-Orbit-42-quietly", &[]).is_ok());
    }

    #[test]
    fn test_user_inputs_weaken_password() {
        let v = PasswordValidator::new(&PasswordConfig {
            min_strength_score: 3,
            ..PasswordConfig::default()
        });
        assert!(v.validate("alice.smith2024", &["alice.smith2024"]).is_err());
    }

    #[test]
    fn test_not_same() {
        let v = validator();
        assert!(v.validate_not_same("a", "a").is_err());
        assert!(v.validate_not_same("a", "b").is_ok());
    }
}
