//! Environment-driven configuration
//!
//! Connection settings come from the process environment, optionally
//! seeded from a `.env` file in the working directory. Variable names
//! match what the cloud SDKs and emulators already use, so a test
//! environment configured for one tool configures this library too.

use url::Url;

use crate::error::{Error, Result};

/// Default AWS region when `AWS_REGION` is unset
const DEFAULT_REGION: &str = "us-east-1";

/// Captured environment configuration for all backends
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// `S3_ENDPOINT`: S3 endpoint, `host:port` or a full URL
    pub s3_endpoint: Option<String>,

    /// `AWS_ACCESS_KEY_ID`
    pub aws_access_key_id: Option<String>,

    /// `AWS_SECRET_ACCESS_KEY`
    pub aws_secret_access_key: Option<String>,

    /// `AWS_SESSION_TOKEN`
    pub aws_session_token: Option<String>,

    /// `AWS_REGION`
    pub aws_region: Option<String>,

    /// `STORAGE_EMULATOR_HOST`: GCS emulator endpoint
    pub storage_emulator_host: Option<String>,

    /// `GOOGLE_CLOUD_PROJECT`
    pub google_cloud_project: Option<String>,

    /// `STORAGE_EXTERNAL_HOSTNAME`: hostname embedded in presigned URLs
    /// when clients reach the backend through a different address than
    /// the library does (port mappings, reverse proxies)
    pub storage_external_hostname: Option<String>,
}

impl StorageConfig {
    /// Load configuration from a `.env` file (if present) and the
    /// process environment. Process variables win over the file.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            s3_endpoint: get("S3_ENDPOINT"),
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            aws_session_token: get("AWS_SESSION_TOKEN"),
            aws_region: get("AWS_REGION"),
            storage_emulator_host: get("STORAGE_EMULATOR_HOST"),
            google_cloud_project: get("GOOGLE_CLOUD_PROJECT"),
            storage_external_hostname: get("STORAGE_EXTERNAL_HOSTNAME"),
        }
    }

    /// Project the S3 view, validating required settings
    pub fn s3(&self) -> Result<S3Config> {
        let endpoint = self
            .s3_endpoint
            .clone()
            .ok_or_else(|| Error::Config("S3_ENDPOINT must be set".into()))?;
        let access_key = self
            .aws_access_key_id
            .clone()
            .ok_or_else(|| Error::Config("AWS_ACCESS_KEY_ID must be set".into()))?;
        let secret_key = self
            .aws_secret_access_key
            .clone()
            .ok_or_else(|| Error::Config("AWS_SECRET_ACCESS_KEY must be set".into()))?;

        let (endpoint_url, secure) = normalize_endpoint(&endpoint);
        let authority = authority_of(&endpoint_url)?;
        let external_hostname = self
            .storage_external_hostname
            .clone()
            .unwrap_or_else(|| authority.clone());

        Ok(S3Config {
            endpoint_url,
            secure,
            region: self
                .aws_region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key,
            secret_key,
            session_token: self.aws_session_token.clone(),
            external_hostname,
        })
    }

    /// Project the GCS view
    pub fn gcs(&self) -> Result<GcsConfig> {
        let emulator = match &self.storage_emulator_host {
            Some(raw) => {
                let (endpoint_url, secure) = normalize_endpoint(raw);
                let authority = authority_of(&endpoint_url)?;
                Some(GcsEmulator {
                    endpoint_url,
                    authority,
                    secure,
                })
            }
            None => None,
        };

        let external_hostname = self
            .storage_external_hostname
            .clone()
            .or_else(|| emulator.as_ref().map(|e| e.authority.clone()));

        Ok(GcsConfig {
            project: self.google_cloud_project.clone(),
            emulator,
            external_hostname,
        })
    }
}

/// Validated S3 connection settings
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL, scheme included
    pub endpoint_url: String,

    /// Whether the endpoint is reached over TLS
    pub secure: bool,

    /// AWS region
    pub region: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Optional session token for temporary credentials
    pub session_token: Option<String>,

    /// `host[:port]` embedded in presigned URLs
    pub external_hostname: String,
}

/// GCS emulator endpoint details
#[derive(Debug, Clone)]
pub struct GcsEmulator {
    /// Emulator endpoint URL, scheme included
    pub endpoint_url: String,

    /// `host[:port]` of the emulator
    pub authority: String,

    /// Whether the emulator speaks TLS
    pub secure: bool,
}

/// Validated GCS connection settings
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// Project owning created buckets
    pub project: Option<String>,

    /// Emulator endpoint, when `STORAGE_EMULATOR_HOST` is set
    pub emulator: Option<GcsEmulator>,

    /// `host[:port]` embedded in public object URLs
    pub external_hostname: Option<String>,
}

/// Turn `host:port` or a full URL into a schemed endpoint URL plus a
/// secure flag. A bare authority defaults to plaintext, matching how
/// emulators are addressed.
fn normalize_endpoint(endpoint: &str) -> (String, bool) {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        (trimmed.to_string(), trimmed.starts_with("https://"))
    } else {
        (format!("http://{trimmed}"), false)
    }
}

/// Extract `host[:port]` from an endpoint URL
fn authority_of(endpoint_url: &str) -> Result<String> {
    let url = Url::parse(endpoint_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Config(format!("endpoint {endpoint_url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key: &str| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_s3_config_from_bare_authority() {
        let config = StorageConfig::from_lookup(lookup(&[
            ("S3_ENDPOINT", "localhost:9000"),
            ("AWS_ACCESS_KEY_ID", "minioadmin"),
            ("AWS_SECRET_ACCESS_KEY", "minioadmin"),
        ]));

        let s3 = config.s3().unwrap();
        assert_eq!(s3.endpoint_url, "http://localhost:9000");
        assert!(!s3.secure);
        assert_eq!(s3.region, "us-east-1");
        assert_eq!(s3.external_hostname, "localhost:9000");
        assert!(s3.session_token.is_none());
    }

    #[test]
    fn test_s3_config_honors_scheme_and_overrides() {
        let config = StorageConfig::from_lookup(lookup(&[
            ("S3_ENDPOINT", "https://s3.us-west-2.amazonaws.com"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_REGION", "us-west-2"),
            ("STORAGE_EXTERNAL_HOSTNAME", "files.example.com"),
        ]));

        let s3 = config.s3().unwrap();
        assert!(s3.secure);
        assert_eq!(s3.region, "us-west-2");
        assert_eq!(s3.external_hostname, "files.example.com");
    }

    #[test]
    fn test_s3_config_missing_credentials() {
        let config =
            StorageConfig::from_lookup(lookup(&[("S3_ENDPOINT", "localhost:9000")]));
        let err = config.s3().unwrap_err();
        assert!(err.to_string().contains("AWS_ACCESS_KEY_ID"));
    }

    #[test]
    fn test_gcs_config_emulator() {
        let config = StorageConfig::from_lookup(lookup(&[
            ("STORAGE_EMULATOR_HOST", "http://localhost:4443"),
            ("GOOGLE_CLOUD_PROJECT", "test-project"),
        ]));

        let gcs = config.gcs().unwrap();
        let emulator = gcs.emulator.unwrap();
        assert_eq!(emulator.endpoint_url, "http://localhost:4443");
        assert_eq!(emulator.authority, "localhost:4443");
        assert!(!emulator.secure);
        assert_eq!(gcs.external_hostname.as_deref(), Some("localhost:4443"));
        assert_eq!(gcs.project.as_deref(), Some("test-project"));
    }

    #[test]
    fn test_gcs_config_without_emulator() {
        let config = StorageConfig::from_lookup(lookup(&[(
            "GOOGLE_CLOUD_PROJECT",
            "prod-project",
        )]));
        let gcs = config.gcs().unwrap();
        assert!(gcs.emulator.is_none());
        assert!(gcs.external_hostname.is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = StorageConfig::from_lookup(lookup(&[("S3_ENDPOINT", "")]));
        assert!(config.s3_endpoint.is_none());
    }

    #[test]
    fn test_dotenv_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(
            &env_path,
            "S3_ENDPOINT=localhost:9000\nAWS_ACCESS_KEY_ID=ak\nAWS_SECRET_ACCESS_KEY=sk\n",
        )
        .unwrap();

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&env_path)
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        let config = StorageConfig::from_lookup(|key| vars.get(key).cloned());

        assert_eq!(config.s3_endpoint.as_deref(), Some("localhost:9000"));
        assert!(config.s3().is_ok());
    }
}
