//! Shared helpers for the emulator-backed tests

use std::sync::Once;
use std::time::Duration;

use bytes::Bytes;
use multicloud_storage::Storage;

/// Liveness polling budget: attempts x delay
const READY_ATTEMPTS: u32 = 30;
const READY_DELAY: Duration = Duration::from_secs(1);

static INIT: Once = Once::new();

/// Initialize tracing once for the whole test binary
pub fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::from_default_env())
            .init();
    });
}

/// Wait for the backend to answer requests, with a bounded retry budget
pub async fn wait_for_ready(storage: &Storage) -> bool {
    for _ in 0..READY_ATTEMPTS {
        if storage.bucket_exists("liveness-probe").await.is_ok() {
            return true;
        }
        tokio::time::sleep(READY_DELAY).await;
    }
    false
}

/// Generate a unique suffix for test resources
pub fn unique_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:x}", duration.as_nanos() % 0xFFFF_FFFF)
}

/// A unique bucket name valid on every backend
pub fn unique_bucket(label: &str) -> String {
    format!("mcs-test-{label}-{}", unique_suffix())
}

/// A small JSON payload
pub fn json_payload() -> Bytes {
    Bytes::from(serde_json::json!({"test": "test"}).to_string())
}

/// Drop a bucket if the test left it behind
pub async fn cleanup_bucket(storage: &Storage, bucket: &str) {
    let _ = storage.remove_bucket(bucket).await;
}
