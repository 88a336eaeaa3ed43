//! StorageClient trait definition
//!
//! This trait defines the interface every vendor adapter implements.
//! The facade in `multicloud-storage` is written purely against it, which
//! keeps callers decoupled from the vendor SDKs and lets the facade be
//! tested against mocks.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::http::HttpMethod;
use crate::meta::ObjectMeta;

/// Expiry applied when a presign caller does not set one
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Options for generating a presigned URL
#[derive(Debug, Clone)]
pub struct PresignOptions {
    /// HTTP method the URL grants
    pub method: HttpMethod,

    /// How long the URL stays valid
    pub expires: Duration,

    /// Content type the upload must carry (PUT only)
    pub content_type: Option<String>,

    /// Override for the hostname embedded in the URL
    pub use_hostname: Option<String>,

    /// Override for the URL scheme: Some(true) forces https, Some(false) http
    pub secure: Option<bool>,
}

impl Default for PresignOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            expires: DEFAULT_PRESIGN_EXPIRY,
            content_type: None,
            use_hostname: None,
            secure: None,
        }
    }
}

impl PresignOptions {
    /// Options for a download URL with the default expiry
    pub fn get() -> Self {
        Self::default()
    }

    /// Options for an upload URL with the default expiry
    pub fn put() -> Self {
        Self {
            method: HttpMethod::Put,
            ..Self::default()
        }
    }

    /// Set the expiry
    pub fn expires(mut self, expires: Duration) -> Self {
        self.expires = expires;
        self
    }

    /// Set the content type (PUT only)
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Embed a different hostname in the generated URL
    pub fn use_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.use_hostname = Some(hostname.into());
        self
    }

    /// Force the URL scheme
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }
}

/// Backend capability information
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// Supports server-side object composition
    pub compose: bool,

    /// Supports bucket policy documents
    pub bucket_policy: bool,

    /// Presigned URLs are cryptographically signed (emulator-backed
    /// backends may hand out plain public URLs instead)
    pub signed_urls: bool,
}

/// Trait for vendor object-storage operations
///
/// Implementations normalize vendor errors into [`crate::Error`] and
/// vendor object types into [`ObjectMeta`]. Existence preconditions are
/// uniform: operations addressing an object inside a bucket fail with
/// `BucketNotFound` when the bucket is absent.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Check if a bucket exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Create a bucket; fails if it already exists
    async fn make_bucket(&self, bucket: &str) -> Result<()>;

    /// Delete a bucket and everything in it; fails if it does not exist
    async fn remove_bucket(&self, bucket: &str) -> Result<()>;

    /// Upload an object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<ObjectMeta>;

    /// Download an object's content
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Check if an object exists
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Get object metadata
    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta>;

    /// Delete an object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// List all objects under a prefix, following pagination to the end
    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectMeta>>;

    /// Server-side copy of a single object
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()>;

    /// Rename an object within a bucket
    async fn rename_object(&self, bucket: &str, key: &str, new_key: &str) -> Result<()> {
        self.copy_object(bucket, key, bucket, new_key).await?;
        self.delete_object(bucket, key).await
    }

    /// Concatenate existing objects into the destination object
    async fn compose_objects(&self, bucket: &str, dst_key: &str, sources: &[String])
        -> Result<()>;

    /// Generate a presigned URL for the object
    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        options: PresignOptions,
    ) -> Result<String>;

    /// MD5 checksum of an object's content as lowercase hex
    async fn md5_checksum(&self, bucket: &str, key: &str) -> Result<String>;

    /// What this backend supports
    fn capabilities(&self) -> Capabilities;
}
