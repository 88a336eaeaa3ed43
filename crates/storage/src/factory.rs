//! Backend selection
//!
//! The factory hides which adapter crate backs a `Storage` handle;
//! callers name a provider and get the abstraction back.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use mcs_core::{Error, Result, StorageClient, StorageConfig};
use mcs_gcs::GcsClient;
use mcs_s3::S3Client;

use crate::storage::Storage;

/// Supported storage providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// AWS S3 and S3-compatible servers (MinIO)
    S3,
    /// Google Cloud Storage
    Gcs,
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s3" | "aws" | "minio" => Ok(Provider::S3),
            "gcs" | "gcp" | "google" => Ok(Provider::Gcs),
            other => Err(Error::Config(format!("unknown storage provider: {other}"))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::S3 => f.write_str("s3"),
            Provider::Gcs => f.write_str("gcs"),
        }
    }
}

/// Factory for creating storage handles
pub struct StorageFactory;

impl StorageFactory {
    /// Create a storage handle for the given provider and configuration
    pub async fn from_config(provider: Provider, config: &StorageConfig) -> Result<Storage> {
        let client: Arc<dyn StorageClient> = match provider {
            Provider::S3 => Arc::new(S3Client::new(config.s3()?).await?),
            Provider::Gcs => Arc::new(GcsClient::new(config.gcs()?).await?),
        };
        Ok(Storage::new(client))
    }

    /// Create a storage handle configured from the environment
    pub async fn from_env(provider: Provider) -> Result<Storage> {
        Self::from_config(provider, &StorageConfig::from_env()).await
    }
}
