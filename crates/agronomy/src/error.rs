use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgronomyError {
    #[error("Minimum value must be less than maximum")]
    InvalidRange,
    #[error("{0} is required")]
    MissingField(String),
    #[error("ID and name are required")]
    MissingIdOrName,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Please enter your current password")]
    MissingCurrentPassword,
    #[error("Please enter a new password")]
    MissingNewPassword,
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Unknown {kind}: '{value}'")]
    UnknownValue { kind: String, value: String },
    #[error("Row has {found} columns but the header has {expected}")]
    ColumnMismatch { expected: usize, found: usize },
}

impl AgronomyError {
    pub(crate) fn unknown(kind: &str, value: &str) -> Self {
        AgronomyError::UnknownValue {
            kind: kind.to_string(),
            value: value.to_string(),
        }
    }
}
