//! GCS client implementation
//!
//! Wraps google-cloud-storage and implements the StorageClient trait
//! from mcs-core. Behavior differs from the S3 adapter in two places:
//! compose is supported natively, and when an emulator is configured the
//! adapter hands out unsigned public URLs because emulators cannot
//! verify signatures.

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::Error as GcsHttpError;
use google_cloud_storage::http::buckets::delete::DeleteBucketRequest;
use google_cloud_storage::http::buckets::get::GetBucketRequest;
use google_cloud_storage::http::buckets::insert::{
    BucketCreationConfig, InsertBucketParam, InsertBucketRequest,
};
use google_cloud_storage::http::objects::compose::{ComposeObjectRequest, ComposingTargets};
use google_cloud_storage::http::objects::{Object, SourceObjects};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::rewrite::RewriteObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::sign::{SignedURLMethod, SignedURLOptions};

use mcs_core::{
    Capabilities, Error, GcsConfig, HttpMethod, ObjectMeta, PresignOptions, Result, StorageClient,
};

/// GCS client wrapper
pub struct GcsClient {
    inner: Client,
    config: GcsConfig,
}

impl GcsClient {
    /// Create a new GCS client from validated connection settings
    ///
    /// With an emulator configured, requests are anonymous and sent to
    /// the emulator endpoint. Otherwise application default credentials
    /// are resolved (`GOOGLE_APPLICATION_CREDENTIALS` et al.).
    pub async fn new(config: GcsConfig) -> Result<Self> {
        let mut client_config = match &config.emulator {
            Some(emulator) => {
                tracing::debug!(
                    "will not sign urls due to presence of emulator at {}",
                    emulator.endpoint_url
                );
                let mut anonymous = ClientConfig::default().anonymous();
                anonymous.storage_endpoint = emulator.endpoint_url.clone();
                anonymous
            }
            None => ClientConfig::default()
                .with_auth()
                .await
                .map_err(|e| Error::Auth(e.to_string()))?,
        };
        if config.project.is_some() {
            client_config.project_id = config.project.clone();
        }

        Ok(Self {
            inner: Client::new(client_config),
            config,
        })
    }

    /// Get the underlying google-cloud-storage client
    pub fn inner(&self) -> &Client {
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

    /// Project owning created buckets
    fn project(&self) -> Result<&str> {
        self.config.project.as_deref().ok_or_else(|| {
            Error::Config(
                "gcs bucket creation requires GOOGLE_CLOUD_PROJECT to be set".into(),
            )
        })
    }

    /// Fetch the raw object resource, normalizing a missing object
    async fn object_resource(&self, bucket: &str, key: &str) -> Result<Object> {
        self.inner
            .get_object(&GetObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|err| {
                if is_not_found(&err) {
                    Error::object_not_found(bucket, key)
                } else {
                    map_gcs_error("get_object", err)
                }
            })
    }
}

/// HTTP status carried by a GCS failure, when one is available
fn status_of(err: &GcsHttpError) -> Option<u16> {
    match err {
        GcsHttpError::Response(response) => u16::try_from(response.code).ok(),
        GcsHttpError::HttpClient(e) => e.status().map(|s| s.as_u16()),
        _ => None,
    }
}

fn is_not_found(err: &GcsHttpError) -> bool {
    status_of(err) == Some(404)
}

/// Map a GCS failure into the unified error type
fn map_gcs_error(op: &str, err: GcsHttpError) -> Error {
    if let GcsHttpError::HttpClient(e) = &err {
        if e.is_connect() || e.is_timeout() {
            return Error::Network(format!("{op}: {err}"));
        }
    }
    match status_of(&err) {
        Some(401) | Some(403) => Error::Auth(format!("{op}: {err}")),
        Some(code) if code >= 500 => Error::Network(format!("{op}: {err}")),
        _ => Error::Backend(format!("{op}: {err}")),
    }
}

/// Normalize an object resource into ObjectMeta
fn object_meta(object: &Object) -> ObjectMeta {
    let mut meta = ObjectMeta::object(object.name.clone(), object.size);
    meta.last_modified = object
        .updated
        .and_then(|t| jiff::Timestamp::from_second(t.unix_timestamp()).ok());
    if !object.etag.is_empty() {
        meta.etag = Some(object.etag.clone());
    }
    meta.content_type = object.content_type.clone();
    meta
}

/// Public (unsigned) URL for an object behind an emulator
fn public_object_url(secure: bool, authority: &str, bucket: &str, key: &str) -> String {
    let scheme = if secure { "https" } else { "http" };
    format!("{scheme}://{authority}/{bucket}/{key}")
}

/// Decode the base64 `md5Hash` resource field into lowercase hex
fn md5_hex(md5_base64: &str) -> Result<String> {
    let digest = base64::engine::general_purpose::STANDARD
        .decode(md5_base64)
        .map_err(|e| Error::Backend(format!("invalid md5Hash: {e}")))?;
    Ok(hex::encode(digest))
}

#[async_trait]
impl StorageClient for GcsClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self
            .inner
            .get_bucket(&GetBucketRequest {
                bucket: bucket.to_string(),
                ..Default::default()
            })
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(map_gcs_error("get_bucket", err)),
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<()> {
        if self.bucket_exists(bucket).await? {
            return Err(Error::BucketAlreadyExists(bucket.to_string()));
        }

        self.inner
            .insert_bucket(&InsertBucketRequest {
                name: bucket.to_string(),
                param: InsertBucketParam {
                    project: self.project()?.to_string(),
                    ..Default::default()
                },
                bucket: BucketCreationConfig::default(),
            })
            .await
            .map_err(|e| map_gcs_error("insert_bucket", e))?;

        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        self.ensure_bucket(bucket).await?;

        // The bucket must be empty before delete succeeds
        for meta in self.list_objects(bucket, None).await? {
            self.inner
                .delete_object(&DeleteObjectRequest {
                    bucket: bucket.to_string(),
                    object: meta.key.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| map_gcs_error("delete_object", e))?;
        }

        self.inner
            .delete_bucket(&DeleteBucketRequest {
                bucket: bucket.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| map_gcs_error("delete_bucket", e))?;

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

        let media = Media {
            name: key.to_string().into(),
            content_type: content_type.to_string().into(),
            content_length: Some(data.len() as u64),
        };
        let object = self
            .inner
            .upload_object(
                &UploadObjectRequest {
                    bucket: bucket.to_string(),
                    ..Default::default()
                },
                data,
                &UploadType::Simple(media),
            )
            .await
            .map_err(|e| map_gcs_error("upload_object", e))?;

        Ok(object_meta(&object))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.ensure_bucket(bucket).await?;

        let data = self
            .inner
            .download_object(
                &GetObjectRequest {
                    bucket: bucket.to_string(),
                    object: key.to_string(),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map_err(|err| {
                if is_not_found(&err) {
                    Error::object_not_found(bucket, key)
                } else {
                    map_gcs_error("download_object", err)
                }
            })?;

        Ok(Bytes::from(data))
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.ensure_bucket(bucket).await?;

        match self.object_resource(bucket, key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        let object = self.object_resource(bucket, key).await?;
        Ok(object_meta(&object))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.ensure_bucket(bucket).await?;

        self.inner
            .delete_object(&DeleteObjectRequest {
                bucket: bucket.to_string(),
                object: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|err| {
                if is_not_found(&err) {
                    Error::object_not_found(bucket, key)
                } else {
                    map_gcs_error("delete_object", err)
                }
            })?;

        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        self.ensure_bucket(bucket).await?;

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .inner
                .list_objects(&ListObjectsRequest {
                    bucket: bucket.to_string(),
                    prefix: prefix.map(str::to_string),
                    page_token: page_token.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| map_gcs_error("list_objects", e))?;

            for object in response.items.unwrap_or_default() {
                items.push(object_meta(&object));
            }

            page_token = response.next_page_token;
            if page_token.is_none() {
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

        tracing::debug!("copying {src_bucket}/{src_key} to {dst_bucket}/{dst_key}");

        // Rewrite may need several calls for large objects; the token
        // carries the progress between them
        let mut rewrite_token: Option<String> = None;
        loop {
            let response = self
                .inner
                .rewrite_object(&RewriteObjectRequest {
                    source_bucket: src_bucket.to_string(),
                    source_object: src_key.to_string(),
                    destination_bucket: dst_bucket.to_string(),
                    destination_object: dst_key.to_string(),
                    rewrite_token: rewrite_token.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| map_gcs_error("rewrite_object", e))?;

            tracing::debug!(
                "rewrite progress: {}/{} bytes",
                response.total_bytes_rewritten,
                response.object_size
            );

            if response.done {
                break;
            }
            rewrite_token = response.rewrite_token;
        }

        Ok(())
    }

    async fn compose_objects(
        &self,
        bucket: &str,
        dst_key: &str,
        sources: &[String],
    ) -> Result<()> {
        if !self.object_exists(bucket, dst_key).await? {
            return Err(Error::object_not_found(bucket, dst_key));
        }
        for source in sources {
            if !self.object_exists(bucket, source).await? {
                return Err(Error::object_not_found(bucket, source));
            }
        }

        self.inner
            .compose_object(&ComposeObjectRequest {
                bucket: bucket.to_string(),
                destination_object: dst_key.to_string(),
                composing_targets: ComposingTargets {
                    source_objects: sources
                        .iter()
                        .map(|name| SourceObjects {
                            name: name.clone(),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .map_err(|e| map_gcs_error("compose_object", e))?;

        Ok(())
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

        if let Some(emulator) = &self.config.emulator {
            let secure = options.secure.unwrap_or(emulator.secure);
            let authority = options
                .use_hostname
                .as_deref()
                .or(self.config.external_hostname.as_deref())
                .unwrap_or(&emulator.authority);
            return Ok(public_object_url(secure, authority, bucket, key));
        }

        let signed = self
            .inner
            .signed_url(
                bucket,
                key,
                None,
                None,
                SignedURLOptions {
                    method: match options.method {
                        HttpMethod::Get => SignedURLMethod::GET,
                        HttpMethod::Put => SignedURLMethod::PUT,
                    },
                    expires: options.expires,
                    content_type: options.content_type.clone(),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| Error::Backend(format!("signed_url: {e}")))?;

        Ok(signed)
    }

    async fn md5_checksum(&self, bucket: &str, key: &str) -> Result<String> {
        let object = self.object_resource(bucket, key).await?;
        let md5 = object
            .md5_hash
            .as_deref()
            .ok_or_else(|| Error::Backend(format!("no md5Hash reported for {bucket}/{key}")))?;
        md5_hex(md5)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            compose: true,
            bucket_policy: false,
            signed_urls: self.config.emulator.is_none(),
        }
    }
}
