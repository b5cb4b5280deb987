//! Profile and password validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AgronomyError;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub fn validate_email(email: &str) -> Result<(), AgronomyError> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(AgronomyError::InvalidEmail)
    }
}

/// Checks an edited profile. The name must be non-blank and the email well formed.
pub fn validate_profile(full_name: &str, email: &str) -> Result<(), AgronomyError> {
    if full_name.trim().is_empty() {
        return Err(AgronomyError::MissingField("Name".to_string()));
    }
    validate_email(email)
}

/// Checks a password change request in the order the form reports problems.
/// Verifying `current` against the stored hash is the caller's job.
pub fn validate_password_change(
    current: &str,
    new: &str,
    confirm: &str,
) -> Result<(), AgronomyError> {
    if current.is_empty() {
        return Err(AgronomyError::MissingCurrentPassword);
    }
    if new.is_empty() {
        return Err(AgronomyError::MissingNewPassword);
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(AgronomyError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    if new != confirm {
        return Err(AgronomyError::PasswordMismatch);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthLabel {
    Weak,
    Fair,
    Good,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub label: StrengthLabel,
}

pub fn password_strength(password: &str) -> PasswordStrength {
    let len = password.chars().count();
    let mut score: u8 = 0;
    if len >= 6 {
        score += 25;
    }
    if len >= 8 {
        score += 25;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 25;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 15;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 10;
    }
    let score = score.min(100);
    let label = match score {
        0..=39 => StrengthLabel::Weak,
        40..=69 => StrengthLabel::Fair,
        70..=89 => StrengthLabel::Good,
        _ => StrengthLabel::Strong,
    };
    PasswordStrength { score, label }
}
