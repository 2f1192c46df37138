//! Error types for request parsing and canonicalisation.

use thiserror::Error;

/// Errors raised while parsing or canonicalising requests and keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request text is not well formed.
    #[error("syntax error in '{text}': {reason}")]
    Syntax { text: String, reason: String },

    /// A value does not fit the type of its keyword.
    #[error("invalid value '{value}' for keyword '{keyword}': {reason}")]
    InvalidValue {
        keyword: String,
        value: String,
        reason: String,
    },

    /// A `from/to/to[/by/step]` range cannot be expanded.
    #[error("invalid range for keyword '{keyword}': {reason}")]
    InvalidRange { keyword: String, reason: String },

    /// The same keyword was given twice.
    #[error("keyword '{0}' given more than once")]
    DuplicateKeyword(String),
}

impl RequestError {
    /// Create a Syntax error.
    pub fn syntax(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Syntax {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidValue error.
    pub fn invalid_value(
        keyword: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            keyword: keyword.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidRange error.
    pub fn invalid_range(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for request operations.
pub type Result<T> = std::result::Result<T, RequestError>;
