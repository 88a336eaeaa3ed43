//! Integration tests for the GCS backend
//!
//! These tests require a running fake-gcs-server instance.
//!
//! Run with:
//! ```bash
//! docker compose up -d fake-gcs
//! STORAGE_EMULATOR_HOST=http://localhost:4443 \
//! GOOGLE_CLOUD_PROJECT=test-project \
//!     cargo test -p multicloud-storage --features integration --test gcs
//! ```

#![cfg(feature = "integration")]

mod common;

use bytes::Bytes;
use multicloud_storage::{Error, PresignOptions, Provider, Storage, StorageFactory};

async fn gcs_storage() -> Option<Storage> {
    common::init_tracing();
    if std::env::var("STORAGE_EMULATOR_HOST").is_err() {
        eprintln!("skipping: STORAGE_EMULATOR_HOST is not set");
        return None;
    }

    let storage = StorageFactory::from_env(Provider::Gcs)
        .await
        .expect("GCS configuration should be valid");
    assert!(
        common::wait_for_ready(&storage).await,
        "GCS emulator did not become ready in time"
    );
    Some(storage)
}

#[tokio::test]
async fn test_bucket_lifecycle() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-lifecycle");

    assert!(!storage.bucket_exists(&bucket).await.unwrap());
    storage.make_bucket(&bucket).await.unwrap();
    assert!(storage.bucket_exists(&bucket).await.unwrap());
    storage.remove_bucket(&bucket).await.unwrap();
    assert!(!storage.bucket_exists(&bucket).await.unwrap());
}

#[tokio::test]
async fn test_make_bucket_rejects_duplicate() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-dup");

    storage.make_bucket(&bucket).await.unwrap();
    let err = storage.make_bucket(&bucket).await.unwrap_err();
    assert!(matches!(err, Error::BucketAlreadyExists(_)));

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_put_and_get_object() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-roundtrip");

    storage.make_bucket(&bucket).await.unwrap();
    let payload = common::json_payload();
    storage
        .put_object(&bucket, "data.json", payload.clone())
        .await
        .unwrap();

    let fetched = storage.get_object(&bucket, "data.json").await.unwrap();
    assert_eq!(fetched, payload);

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_object_existence() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-exists");

    storage.make_bucket(&bucket).await.unwrap();
    assert!(!storage.object_exists(&bucket, "data.json").await.unwrap());

    storage
        .put_object(&bucket, "data.json", common::json_payload())
        .await
        .unwrap();
    assert!(storage.object_exists(&bucket, "data.json").await.unwrap());

    storage.delete_object(&bucket, "data.json").await.unwrap();
    assert!(!storage.object_exists(&bucket, "data.json").await.unwrap());

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_list_objects_with_prefix() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-list");

    storage.make_bucket(&bucket).await.unwrap();
    for key in ["2024/q1.json", "2024/q2.json", "2023/q4.json"] {
        storage
            .put_object(&bucket, key, common::json_payload())
            .await
            .unwrap();
    }

    let all = storage.list_objects(&bucket, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let recent = storage.list_objects(&bucket, Some("2024/")).await.unwrap();
    assert_eq!(recent.len(), 2);

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_copy_and_rename() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-copy");

    storage.make_bucket(&bucket).await.unwrap();
    let payload = Bytes::from_static(b"copy me");
    storage
        .put_object(&bucket, "original.txt", payload.clone())
        .await
        .unwrap();

    storage
        .copy_object(&bucket, "original.txt", &bucket, "copied.txt")
        .await
        .unwrap();
    assert_eq!(
        storage.get_object(&bucket, "copied.txt").await.unwrap(),
        payload
    );

    storage
        .rename_object(&bucket, "copied.txt", "renamed.txt")
        .await
        .unwrap();
    assert!(!storage.object_exists(&bucket, "copied.txt").await.unwrap());

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_compose_objects() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-compose");

    assert!(storage.capabilities().compose);
    storage.make_bucket(&bucket).await.unwrap();

    storage
        .put_object(&bucket, "parts/one.txt", Bytes::from_static(b"hello "))
        .await
        .unwrap();
    storage
        .put_object(&bucket, "parts/two.txt", Bytes::from_static(b"world"))
        .await
        .unwrap();
    // The destination must already exist before composing into it
    storage
        .put_object(&bucket, "merged.txt", Bytes::new())
        .await
        .unwrap();

    storage
        .compose_objects(
            &bucket,
            "merged.txt",
            &["parts/one.txt".into(), "parts/two.txt".into()],
        )
        .await
        .unwrap();

    let merged = storage.get_object(&bucket, "merged.txt").await.unwrap();
    assert_eq!(merged, Bytes::from_static(b"hello world"));

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_compose_requires_existing_destination() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-compose-miss");

    storage.make_bucket(&bucket).await.unwrap();
    storage
        .put_object(&bucket, "part.txt", Bytes::from_static(b"x"))
        .await
        .unwrap();

    let err = storage
        .compose_objects(&bucket, "missing.txt", &["part.txt".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ObjectNotFound { .. }));

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_public_url_points_at_emulator() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-url");

    storage.make_bucket(&bucket).await.unwrap();
    storage
        .put_object(&bucket, "data.json", common::json_payload())
        .await
        .unwrap();

    // Emulator-backed URLs are unsigned public URLs
    assert!(!storage.capabilities().signed_urls);

    let url = storage
        .get_object_presigned_url(&bucket, "data.json")
        .await
        .unwrap();
    assert!(url.contains(&bucket));
    assert!(url.contains("data.json"));

    let url = storage
        .presigned_url(
            &bucket,
            "data.json",
            PresignOptions::get().use_hostname("files.example.com"),
        )
        .await
        .unwrap();
    assert!(url.starts_with("http://files.example.com/"));

    common::cleanup_bucket(&storage, &bucket).await;
}

#[tokio::test]
async fn test_md5_checksum_matches_across_objects() {
    let Some(storage) = gcs_storage().await else {
        return;
    };
    let bucket = common::unique_bucket("g-md5");

    storage.make_bucket(&bucket).await.unwrap();
    let payload = Bytes::from_static(b"checksum me");
    storage
        .put_object(&bucket, "one.txt", payload.clone())
        .await
        .unwrap();
    storage
        .put_object(&bucket, "two.txt", payload)
        .await
        .unwrap();

    let one = storage.md5_checksum(&bucket, "one.txt").await.unwrap();
    let two = storage.md5_checksum(&bucket, "two.txt").await.unwrap();
    assert_eq!(one.len(), 32);
    assert_eq!(one, two);

    common::cleanup_bucket(&storage, &bucket).await;
}
