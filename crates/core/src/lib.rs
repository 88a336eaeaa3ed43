//! mcs-core: Backend-agnostic core for multicloud-storage
//!
//! This crate provides everything the vendor adapters share:
//! - The `StorageClient` trait describing one bucket/object surface
//! - Normalized object metadata (`ObjectMeta`)
//! - Environment-driven configuration
//! - A unified error type
//!
//! This crate is independent of any specific vendor SDK, allowing the
//! adapters to be swapped and the facade to be tested against mocks.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod meta;

pub use client::{Capabilities, DEFAULT_PRESIGN_EXPIRY, PresignOptions, StorageClient};
pub use config::{GcsConfig, S3Config, StorageConfig};
pub use error::{Error, Result};
pub use http::HttpMethod;
pub use meta::ObjectMeta;
