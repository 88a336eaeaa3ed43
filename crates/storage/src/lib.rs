//! multicloud-storage: one abstract interface over multiple cloud
//! object-storage backends, selected via a factory
//!
//! ```no_run
//! use multicloud_storage::{Provider, StorageFactory};
//!
//! # async fn example() -> multicloud_storage::Result<()> {
//! let storage = StorageFactory::from_env(Provider::S3).await?;
//! storage.make_bucket("reports").await?;
//! storage
//!     .put_object("reports", "2024/q1.json", b"{}".as_ref().into())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod factory;
pub mod storage;

pub use factory::{Provider, StorageFactory};
pub use storage::Storage;

pub use mcs_core::{
    Capabilities, DEFAULT_PRESIGN_EXPIRY, Error, GcsConfig, HttpMethod, ObjectMeta,
    PresignOptions, Result, S3Config, StorageClient, StorageConfig,
};
pub use mcs_gcs::GcsClient;
pub use mcs_s3::S3Client;
