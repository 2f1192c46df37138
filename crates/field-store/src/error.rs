//! Error types for field stores.

use mars_request::RequestError;
use thiserror::Error;

/// Errors raised by field stores and their data handles.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record matches the request.
    #[error("no record matches request: {0}")]
    NotFound(String),

    /// Filesystem error.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The store index cannot be read or written.
    #[error("index error: {0}")]
    Index(String),

    /// A record's bytes are not what the index says they are.
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Store configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A key or request could not be canonicalised.
    #[error(transparent)]
    Request(#[from] RequestError),
}

impl StoreError {
    /// Create a NotFound error.
    pub fn not_found(request: impl Into<String>) -> Self {
        Self::NotFound(request.into())
    }

    /// Create an Io error for `path`.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an Index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    /// Create a Corrupt error.
    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Index(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
