//! Normalized object metadata
//!
//! Every backend reports listings and stat results through `ObjectMeta`,
//! so callers never see vendor-specific object types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Metadata for an object, prefix, or bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object key or bucket name
    pub key: String,

    /// Size in bytes (None for buckets and prefixes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Whether this entry is a prefix or bucket rather than an object
    pub is_prefix: bool,
}

impl ObjectMeta {
    /// Create a new ObjectMeta for an object
    pub fn object(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(size.max(0) as u64, humansize::BINARY)),
            last_modified: None,
            etag: None,
            content_type: None,
            is_prefix: false,
        }
    }

    /// Create a new ObjectMeta for a prefix
    pub fn prefix(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            size_human: None,
            last_modified: None,
            etag: None,
            content_type: None,
            is_prefix: true,
        }
    }

    /// Create a new ObjectMeta for a bucket
    pub fn bucket(name: impl Into<String>) -> Self {
        Self::prefix(name)
    }
}
