//! Error types for mcs-core
//!
//! Provides a unified error type that every backend adapter normalizes
//! its vendor-specific failures into.

use thiserror::Error;

/// Result type alias for mcs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storage operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bucket does not exist
    #[error("bucket {0} does not exist")]
    BucketNotFound(String),

    /// Bucket already exists
    #[error("bucket {0} already exists")]
    BucketAlreadyExists(String),

    /// Object does not exist
    #[error("object {key} does not exist in bucket {bucket}")]
    ObjectNotFound {
        /// Bucket that was searched
        bucket: String,
        /// Missing object key
        key: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend rejected the request
    #[error("Backend error: {0}")]
    Backend(String),

    /// Feature not supported by backend
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Construct an `ObjectNotFound` for the given location
    pub fn object_not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Error::ObjectNotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether this error means the addressed bucket or object is absent
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::BucketNotFound(_) | Error::ObjectNotFound { .. }
        )
    }

    /// Whether retrying the operation could succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}
