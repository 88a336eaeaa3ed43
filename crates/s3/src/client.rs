//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the StorageClient trait from
//! mcs-core. Works against AWS S3 and S3-compatible servers such as
//! MinIO (path-style addressing is forced for that reason).

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use bytes::Bytes;
use url::Url;

use mcs_core::{
    Capabilities, Error, HttpMethod, ObjectMeta, PresignOptions, Result, S3Config, StorageClient,
};

use crate::policy::public_bucket_policy;

/// DeleteObjects accepts at most this many keys per request
const DELETE_BATCH: usize = 1000;

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    sdk_config: aws_config::SdkConfig,
    config: S3Config,
}

impl S3Client {
    /// Create a new S3 client from validated connection settings
    pub async fn new(config: S3Config) -> Result<Self> {
        let credentials = aws_credential_types::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            config.session_token.clone(),
            None, // expiry
            "mcs-static-credentials",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint_url)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        let inner = aws_sdk_s3::Client::from_conf(s3_config);

        Ok(Self {
            inner,
            sdk_config,
            config,
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    /// Fail with `BucketNotFound` unless the bucket exists
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        if self.bucket_exists(bucket).await? {
            Ok(())
        } else {
            Err(Error::BucketNotFound(bucket.to_string()))
        }
    }

    /// Client used for presigning. Signatures cover the Host header, so
    /// URLs handed to external callers must be signed against the
    /// hostname those callers will use, not the endpoint this process
    /// connects through.
    fn presign_client(&self, options: &PresignOptions) -> Result<aws_sdk_s3::Client> {
        let endpoint = presign_endpoint(&self.config, options);
        if endpoint == self.config.endpoint_url {
            return Ok(self.inner.clone());
        }
        Url::parse(&endpoint)?;
        tracing::debug!("presigning against {endpoint}");

        let s3_config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();
        Ok(aws_sdk_s3::Client::from_conf(s3_config))
    }

    /// Delete up to [`DELETE_BATCH`] keys in one request
    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<()> {
        let objects = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|e| Error::InvalidArgument(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| map_sdk_error("delete_objects", e))?;

        if !response.errors().is_empty() {
            let failed: Vec<&str> = response
                .errors()
                .iter()
                .filter_map(|e| e.key())
                .collect();
            tracing::warn!("failed to delete some objects: {failed:?}");
        }

        Ok(())
    }
}

/// Endpoint URL a presigned request must be signed against
fn presign_endpoint(config: &S3Config, options: &PresignOptions) -> String {
    let secure = options.secure.unwrap_or(config.secure);
    let authority = options
        .use_hostname
        .as_deref()
        .unwrap_or(&config.external_hostname);
    let scheme = if secure { "https" } else { "http" };
    format!("{scheme}://{authority}")
}

/// Map an SDK failure into the unified error type
fn map_sdk_error<E, R>(op: &str, err: SdkError<E, R>) -> Error
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let retryable = matches!(
        &err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    );
    let detail = format!("{op}: {}", DisplayErrorContext(err));
    if retryable {
        Error::Network(detail)
    } else {
        Error::Backend(detail)
    }
}

/// Convert an SDK timestamp
fn timestamp(dt: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(dt.secs()).ok()
}

#[async_trait]
impl StorageClient for S3Client {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if matches!(&err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
                    return Err(map_sdk_error("head_bucket", err));
                }
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(Error::Backend(format!(
                        "head_bucket: {}",
                        DisplayErrorContext(service_err)
                    )))
                }
            }
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<()> {
        if self.bucket_exists(bucket).await? {
            return Err(Error::BucketAlreadyExists(bucket.to_string()));
        }

        self.inner
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error("create_bucket", e))?;

        self.inner
            .put_bucket_policy()
            .bucket(bucket)
            .policy(public_bucket_policy(bucket))
            .send()
            .await
            .map_err(|e| map_sdk_error("put_bucket_policy", e))?;

        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        self.ensure_bucket(bucket).await?;

        // The bucket must be empty before DeleteBucket succeeds
        let keys: Vec<String> = self
            .list_objects(bucket, None)
            .await?
            .into_iter()
            .filter(|meta| !meta.is_prefix)
            .map(|meta| meta.key)
            .collect();

        let batches = keys
            .chunks(DELETE_BATCH)
            .map(|chunk| self.delete_batch(bucket, chunk));
        futures::future::try_join_all(batches).await?;

        self.inner
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error("delete_bucket", e))?;

        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<ObjectMeta> {
        self.ensure_bucket(bucket).await?;

        let size = data.len() as i64;
        let response = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error("put_object", e))?;

        let mut meta = ObjectMeta::object(key, size);
        meta.content_type = Some(content_type.to_string());
        if let Some(etag) = response.e_tag() {
            meta.etag = Some(etag.trim_matches('"').to_string());
        }
        meta.last_modified = Some(jiff::Timestamp::now());

        Ok(meta)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.ensure_bucket(bucket).await?;

        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if matches!(&err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
                    return map_sdk_error("get_object", err);
                }
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Error::object_not_found(bucket, key)
                } else {
                    Error::Backend(format!("get_object: {}", DisplayErrorContext(service_err)))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(format!("get_object: {e}")))?
            .into_bytes();

        Ok(data)
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.ensure_bucket(bucket).await?;

        match self.stat_object(bucket, key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if matches!(&err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
                    return map_sdk_error("head_object", err);
                }
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Error::object_not_found(bucket, key)
                } else {
                    Error::Backend(format!("head_object: {}", DisplayErrorContext(service_err)))
                }
            })?;

        let size = response.content_length().unwrap_or(0);
        let mut meta = ObjectMeta::object(key, size);

        if let Some(modified) = response.last_modified() {
            meta.last_modified = timestamp(modified);
        }
        if let Some(etag) = response.e_tag() {
            meta.etag = Some(etag.trim_matches('"').to_string());
        }
        if let Some(content_type) = response.content_type() {
            meta.content_type = Some(content_type.to_string());
        }

        Ok(meta)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.ensure_bucket(bucket).await?;

        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error("delete_object", e))?;

        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        self.ensure_bucket(bucket).await?;

        let mut items = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self.inner.list_objects_v2().bucket(bucket);
            if let Some(prefix) = prefix {
                request = request.prefix(prefix);
            }
            if let Some(token) = &token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| map_sdk_error("list_objects_v2", e))?;

            for object in response.contents() {
                let key = object.key().unwrap_or_default().to_string();
                let size = object.size().unwrap_or(0);
                let mut meta = ObjectMeta::object(key, size);

                if let Some(modified) = object.last_modified() {
                    meta.last_modified = timestamp(modified);
                }
                if let Some(etag) = object.e_tag() {
                    meta.etag = Some(etag.trim_matches('"').to_string());
                }

                items.push(meta);
            }

            token = if response.is_truncated().unwrap_or(false) {
                response.next_continuation_token().map(String::from)
            } else {
                None
            };
            if token.is_none() {
                break;
            }
        }

        Ok(items)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        if !self.object_exists(src_bucket, src_key).await? {
            return Err(Error::object_not_found(src_bucket, src_key));
        }

        self.inner
            .copy_object()
            .copy_source(format!("{src_bucket}/{src_key}"))
            .bucket(dst_bucket)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| map_sdk_error("copy_object", e))?;

        Ok(())
    }

    async fn compose_objects(
        &self,
        _bucket: &str,
        _dst_key: &str,
        _sources: &[String],
    ) -> Result<()> {
        Err(Error::UnsupportedFeature(
            "compose is not supported by the S3 backend".into(),
        ))
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        options: PresignOptions,
    ) -> Result<String> {
        self.ensure_bucket(bucket).await?;
        if options.method == HttpMethod::Get && !self.object_exists(bucket, key).await? {
            return Err(Error::object_not_found(bucket, key));
        }

        let presigning = PresigningConfig::expires_in(options.expires)
            .map_err(|e| Error::InvalidArgument(format!("presign expiry: {e}")))?;
        let client = self.presign_client(&options)?;

        let presigned = match options.method {
            HttpMethod::Get => client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|e| map_sdk_error("presign get_object", e))?,
            HttpMethod::Put => {
                let mut request = client.put_object().bucket(bucket).key(key);
                if let Some(content_type) = &options.content_type {
                    request = request.content_type(content_type);
                }
                request
                    .presigned(presigning)
                    .await
                    .map_err(|e| map_sdk_error("presign put_object", e))?
            }
        };

        Ok(presigned.uri().to_string())
    }

    async fn md5_checksum(&self, bucket: &str, key: &str) -> Result<String> {
        let meta = self.stat_object(bucket, key).await?;
        meta.etag
            .ok_or_else(|| Error::Backend(format!("no etag reported for {bucket}/{key}")))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            compose: false,
            bucket_policy: true,
            signed_urls: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            endpoint_url: "http://localhost:9000".into(),
            secure: false,
            region: "us-east-1".into(),
            access_key: "minioadmin".into(),
            secret_key: "minioadmin".into(),
            session_token: None,
            external_hostname: "localhost:9000".into(),
        }
    }

    #[test]
    fn test_presign_endpoint_defaults_to_external_hostname() {
        let endpoint = presign_endpoint(&config(), &PresignOptions::get());
        assert_eq!(endpoint, "http://localhost:9000");
    }

    #[test]
    fn test_presign_endpoint_hostname_override() {
        let options = PresignOptions::get().use_hostname("files.example.com");
        let endpoint = presign_endpoint(&config(), &options);
        assert_eq!(endpoint, "http://files.example.com");
    }

    #[test]
    fn test_presign_endpoint_secure_override() {
        let options = PresignOptions::put()
            .use_hostname("files.example.com")
            .secure(true);
        let endpoint = presign_endpoint(&config(), &options);
        assert_eq!(endpoint, "https://files.example.com");
    }

    #[tokio::test]
    async fn test_client_construction() {
        let client = S3Client::new(config()).await.unwrap();

        // Default options resolve to the connection endpoint, so no
        // second client is constructed
        assert!(client.presign_client(&PresignOptions::get()).is_ok());

        let caps = client.capabilities();
        assert!(!caps.compose);
        assert!(caps.bucket_policy);
        assert!(caps.signed_urls);
    }
}
