//! The Storage facade
//!
//! `Storage` is the handle application code works with. It maintains a
//! reference to a backend adapter and delegates every operation to it,
//! adding the few conveniences that are backend-independent (content
//! type guessing, presign shorthands).

use std::sync::Arc;

use bytes::Bytes;

use mcs_core::{Capabilities, ObjectMeta, PresignOptions, Result, StorageClient};

/// Handle over a configured storage backend
#[derive(Clone)]
pub struct Storage {
    client: Arc<dyn StorageClient>,
}

impl Storage {
    /// Wrap a backend adapter
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self { client }
    }

    /// Check if a bucket exists
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.client.bucket_exists(bucket).await
    }

    /// Create a bucket; fails if it already exists
    pub async fn make_bucket(&self, bucket: &str) -> Result<()> {
        self.client.make_bucket(bucket).await
    }

    /// Delete a bucket and everything in it
    pub async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        self.client.remove_bucket(bucket).await
    }

    /// Upload an object, guessing the content type from the key
    /// extension (`application/octet-stream` when nothing matches)
    pub async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectMeta> {
        let content_type = mime_guess::from_path(key).first_or_octet_stream();
        self.client
            .put_object(bucket, key, data, content_type.essence_str())
            .await
    }

    /// Upload an object with an explicit content type
    pub async fn put_object_with_content_type(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<ObjectMeta> {
        self.client.put_object(bucket, key, data, content_type).await
    }

    /// Download an object's content
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.client.get_object(bucket, key).await
    }

    /// Check if an object exists
    pub async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.client.object_exists(bucket, key).await
    }

    /// Get object metadata
    pub async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        self.client.stat_object(bucket, key).await
    }

    /// Delete an object
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client.delete_object(bucket, key).await
    }

    /// List all objects under a prefix
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectMeta>> {
        self.client.list_objects(bucket, prefix).await
    }

    /// Server-side copy of a single object
    pub async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        self.client
            .copy_object(src_bucket, src_key, dst_bucket, dst_key)
            .await
    }

    /// Rename an object within a bucket
    pub async fn rename_object(&self, bucket: &str, key: &str, new_key: &str) -> Result<()> {
        self.client.rename_object(bucket, key, new_key).await
    }

    /// Concatenate existing objects into the destination object
    pub async fn compose_objects(
        &self,
        bucket: &str,
        dst_key: &str,
        sources: &[String],
    ) -> Result<()> {
        self.client.compose_objects(bucket, dst_key, sources).await
    }

    /// Generate a presigned URL with full control over the options
    pub async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        options: PresignOptions,
    ) -> Result<String> {
        self.client.presigned_url(bucket, key, options).await
    }

    /// Presigned URL for downloading an object, default expiry
    pub async fn get_object_presigned_url(&self, bucket: &str, key: &str) -> Result<String> {
        self.client
            .presigned_url(bucket, key, PresignOptions::get())
            .await
    }

    /// Presigned URL for uploading an object, default expiry
    pub async fn put_object_presigned_url(&self, bucket: &str, key: &str) -> Result<String> {
        self.client
            .presigned_url(bucket, key, PresignOptions::put())
            .await
    }

    /// MD5 checksum of an object's content as lowercase hex
    pub async fn md5_checksum(&self, bucket: &str, key: &str) -> Result<String> {
        self.client.md5_checksum(bucket, key).await
    }

    /// What the selected backend supports
    pub fn capabilities(&self) -> Capabilities {
        self.client.capabilities()
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("capabilities", &self.client.capabilities())
            .finish()
    }
}
