//! Error types for the chunked data view.

use field_store::StoreError;
use grib2_parser::Grib2Error;
use mars_request::RequestError;
use thiserror::Error;

/// Errors that can occur while building or reading a view.
#[derive(Error, Debug)]
pub enum ViewError {
    /// Invalid view or part configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An index exceeds its bound.
    #[error("{context}: index {index} is out of bounds (must be < {bound})")]
    IndexOutOfBounds {
        context: String,
        index: usize,
        bound: usize,
    },

    /// A chunk index has the wrong number of entries.
    #[error("chunk index has {got} entries, expected {expected}")]
    ChunkIndexLength { got: usize, expected: usize },

    /// The caller's buffer cannot hold one chunk.
    #[error("output buffer holds {got} values, a chunk needs {needed}")]
    BufferTooSmall { needed: usize, got: usize },

    /// The layout probe at construction found no usable record.
    #[error("cannot create view, no data found for request {request} to establish field size: {reason}")]
    Probe { request: String, reason: String },

    /// A listed record lacks a keyword of an axis.
    #[error("record {key} has no value for axis keyword '{keyword}'")]
    MissingKeyword { keyword: String, key: String },

    /// A listed record carries a value outside its axis.
    #[error("record value {keyword}={value} is not part of the axis")]
    ValueOutsideAxis { keyword: String, value: String },

    /// A record could not be decoded into values.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// A query matched no record at all.
    #[error("no data for request {request}, is the request correctly specified?")]
    NoData { request: String },

    /// Fewer records than expected were deposited and the policy forbids it.
    #[error("retrieved only {filled} of {expected} fields for chunk {chunk}")]
    IncompleteChunk {
        chunk: String,
        filled: usize,
        expected: usize,
    },

    /// View definition file could not be loaded.
    #[error("view definition error: {0}")]
    Definition(String),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request parsing or canonicalisation error.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// GRIB2 decoding error.
    #[error(transparent)]
    Grib(#[from] Grib2Error),
}

impl ViewError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an IndexOutOfBounds error.
    pub fn out_of_bounds(context: impl Into<String>, index: usize, bound: usize) -> Self {
        Self::IndexOutOfBounds {
            context: context.into(),
            index,
            bound,
        }
    }

    /// Create an Extraction error.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a Definition error.
    pub fn definition(msg: impl Into<String>) -> Self {
        Self::Definition(msg.into())
    }
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
