//! mcs-s3: AWS S3 / MinIO adapter for multicloud-storage
//!
//! This crate implements the StorageClient trait using the aws-sdk-s3
//! crate. It is the only crate that directly depends on the AWS SDK.

pub mod client;
pub mod policy;

pub use client::S3Client;
