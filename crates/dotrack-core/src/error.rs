//! # Validation Errors
//!
//! Input errors raised before any state is touched. Every variant names the
//! offending field so the caller can point the user at it.

use thiserror::Error;

/// Malformed input: a missing field, blank text, or an unparseable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent or blank.
    #[error("field '{field}' is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field exceeds its maximum length.
    #[error("field '{field}' must not exceed {max} characters")]
    TooLong {
        /// Name of the field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
    },

    /// The validity window ends before it starts.
    #[error("validity window is inverted: valid_from {valid_from} is after valid_to {valid_to}")]
    InvertedWindow {
        /// Start of the window (ISO 8601).
        valid_from: String,
        /// End of the window (ISO 8601).
        valid_to: String,
    },

    /// A timestamp could not be parsed.
    #[error("field '{field}' is not a valid RFC 3339 timestamp: {value:?}")]
    InvalidTimestamp {
        /// Name of the field.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A status name is not part of the taxonomy.
    #[error("unknown status {0:?}")]
    UnknownStatus(String),

    /// A role name is not part of the role set.
    #[error("unknown role {0:?}")]
    UnknownRole(String),
}

impl ValidationError {
    /// The field this error refers to, when it refers to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field }
            | Self::TooLong { field, .. }
            | Self::InvalidTimestamp { field, .. } => Some(field),
            Self::InvertedWindow { .. } => Some("valid_to"),
            Self::UnknownStatus(_) => Some("status"),
            Self::UnknownRole(_) => Some("role"),
        }
    }
}

/// Trim `value` and reject it if blank or longer than `max` characters.
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}
