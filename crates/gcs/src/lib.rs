//! mcs-gcs: Google Cloud Storage adapter for multicloud-storage
//!
//! This crate implements the StorageClient trait using the
//! google-cloud-storage crate. Pointing `STORAGE_EMULATOR_HOST` at a
//! fake-gcs-server instance switches the adapter to anonymous requests
//! and unsigned public URLs, which is how the test suite runs.

pub mod client;

pub use client::GcsClient;
