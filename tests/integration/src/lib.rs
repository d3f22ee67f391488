//! Integration tests for the tfs3 resources.
//!
//! These tests require an S3-compatible endpoint (LocalStack, MinIO or
//! AWS itself) at `S3_ENDPOINT_URL`, `localhost:4566` by default.
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p tfs3-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use tfs3_core::ProviderConfig;
use tfs3_provider::{AwsClient, ResourceRegistry, SdkS3};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL of the S3 service under test.
fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// A raw S3 client for out-of-band checks.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// A provider client talking to the endpoint under test.
#[must_use]
pub fn provider_client() -> AwsClient {
    let config = ProviderConfig {
        endpoint_url: Some(endpoint_url()),
        s3_use_path_style: true,
        propagation_timeout_secs: 30,
        ..ProviderConfig::default()
    };
    AwsClient::new(&config, Arc::new(SdkS3::new(s3_client())))
}

/// The registry of every S3 resource.
#[must_use]
pub fn registry() -> ResourceRegistry {
    ResourceRegistry::s3()
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("tfs3-{prefix}-{id}")
}

mod test_bucket;
mod test_bucket_config;
mod test_object;
