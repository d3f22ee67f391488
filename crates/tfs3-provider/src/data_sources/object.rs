//! The `aws_s3_object` data source.
//!
//! The body is only returned for human-readable content types; binary
//! objects yield metadata alone.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::SecondsFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tfs3_core::endpoints::arn;
use tfs3_model::S3ErrorCode;
use tfs3_model::object::ObjectChecksums;
use tfs3_model::types::{
    BucketTarget, ChecksumMode, ObjectLockLegalHoldStatus, ObjectLockRetentionMode, ServerSideEncryption,
    StorageClass,
};
use tracing::debug;

use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::sdk_v1_compatible_clean_key;
use crate::resource::DataSource;
use crate::tags::{KeyValueTags, tags_for_state};

static READABLE_CONTENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:text/.+|application/(?:atom\+xml|json|ld\+json|x-csh|x-httpd-php|x-sh|xhtml\+xml|xml))",
    )
    .expect("READABLE_CONTENT_TYPE")
});

/// The `aws_s3_object` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectDataSource;

/// Arguments and results of the `aws_s3_object` data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ObjectDataSourceModel {
    pub bucket: String,
    pub key: String,
    /// A specific version to read; the current version when unset.
    pub version_id: Option<String>,
    /// `ENABLED` returns the object's additional checksums.
    pub checksum_mode: Option<ChecksumMode>,

    /// `bucket/key`.
    pub id: String,
    pub arn: String,
    /// Set for human-readable content types only.
    pub body: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_length: i64,
    pub content_type: Option<String>,
    pub etag: String,
    /// RFC 1123 timestamp, e.g. `Tue, 01 Oct 2024 12:00:00 GMT`.
    pub last_modified: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub storage_class: Option<StorageClass>,
    pub server_side_encryption: Option<ServerSideEncryption>,
    pub sse_kms_key_id: Option<String>,
    pub bucket_key_enabled: Option<bool>,
    pub object_lock_legal_hold_status: Option<ObjectLockLegalHoldStatus>,
    pub object_lock_mode: Option<ObjectLockRetentionMode>,
    pub object_lock_retain_until_date: Option<String>,
    pub website_redirect_location: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub checksum_crc32: Option<String>,
    pub checksum_crc32c: Option<String>,
    pub checksum_sha1: Option<String>,
    pub checksum_sha256: Option<String>,
}

fn is_readable(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|t| READABLE_CONTENT_TYPE.is_match(t))
}

#[async_trait]
impl DataSource for ObjectDataSource {
    const TYPE_NAME: &'static str = "aws_s3_object";
    type Model = ObjectDataSourceModel;

    async fn read(
        &self,
        client: &AwsClient,
        mut config: ObjectDataSourceModel,
    ) -> ProviderResult<ObjectDataSourceModel> {
        if config.bucket.is_empty() || config.key.is_empty() {
            return Err(ProviderError::validation("bucket and key are required"));
        }
        let cleaned = sdk_v1_compatible_clean_key(&config.key);
        if cleaned.is_empty() {
            return Err(ProviderError::validation(format!(
                "key: {:?} is empty after removing slashes",
                config.key
            )));
        }
        config.key = cleaned;

        let conn = client.conn();
        let target = &BucketTarget::new(&config.bucket);
        let key = config.key.as_str();
        let version_id = config.version_id.as_deref().filter(|v| !v.is_empty());
        let id = format!("{}/{}", config.bucket, config.key);

        let metadata = conn.head_object(target, key, version_id).await.not_found_on(
            &[S3ErrorCode::NotFound, S3ErrorCode::NoSuchKey, S3ErrorCode::NoSuchBucket],
            "S3 Object",
            "reading S3 Object",
            &id,
        )?;

        let body = if is_readable(metadata.headers.content_type.as_deref()) {
            let content = conn
                .get_object(target, key, version_id)
                .await
                .context("downloading S3 Object", &id)?;
            Some(String::from_utf8_lossy(&content.body).into_owned())
        } else {
            debug!(object = %id, content_type = ?metadata.headers.content_type, "skipping body of non-text object");
            None
        };

        let tags = conn
            .get_object_tagging(target, key, version_id)
            .await
            .context("listing tags for S3 Object", &id)?;
        let tags = tags_for_state(&KeyValueTags::from_s3(&tags), client.ignore_tags());

        let headers = metadata.headers;
        config.arn = arn(client.partition().id(), "s3", "", "", &id);
        config.id = id;
        config.body = body;
        config.cache_control = headers.cache_control;
        config.content_disposition = headers.content_disposition;
        config.content_encoding = headers.content_encoding;
        config.content_language = headers.content_language;
        config.content_type = headers.content_type;
        config.website_redirect_location = headers.website_redirect_location;
        config.metadata = headers.metadata;
        config.content_length = metadata.content_length;
        config.etag = metadata.etag.unwrap_or_default().trim_matches('"').to_owned();
        config.last_modified = metadata
            .last_modified
            .map(|t| t.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
        config.version_id = metadata.version_id.filter(|v| v != "null");
        config.storage_class = Some(metadata.storage_class.unwrap_or(StorageClass::Standard));
        config.server_side_encryption = metadata.server_side_encryption;
        config.sse_kms_key_id = metadata.kms_key_id;
        config.bucket_key_enabled = metadata.bucket_key_enabled;
        config.object_lock_legal_hold_status = metadata.object_lock.legal_hold_status;
        config.object_lock_mode = metadata.object_lock.mode;
        config.object_lock_retain_until_date = metadata
            .object_lock
            .retain_until_date
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));
        config.tags = tags.map();
        let checksums = match config.checksum_mode {
            Some(ChecksumMode::Enabled) => metadata.checksums,
            None => ObjectChecksums::default(),
        };
        config.checksum_crc32 = checksums.crc32;
        config.checksum_crc32c = checksums.crc32c;
        config.checksum_sha1 = checksums.sha1;
        config.checksum_sha256 = checksums.sha256;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tfs3_model::object::{CreateBucketInput, ObjectHeaders, PutObjectInput};
    use tfs3_model::types::ChecksumAlgorithm;

    use super::*;
    use crate::conn::{InMemoryS3, S3Api};
    use crate::resources::test_support::client;

    async fn object(mem: &InMemoryS3, key: &str, content_type: &str, body: &'static [u8]) {
        mem.put_object(&PutObjectInput {
            bucket: "data".to_owned(),
            key: key.to_owned(),
            body: Bytes::from_static(body),
            headers: ObjectHeaders {
                content_type: Some(content_type.to_owned()),
                ..ObjectHeaders::default()
            },
            tagging: Some("team=storage".to_owned()),
            ..PutObjectInput::default()
        })
        .await
        .unwrap();
    }

    async fn data_bucket(mem: &InMemoryS3) {
        mem.create_bucket(&CreateBucketInput {
            bucket: "data".to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
    }

    fn lookup(key: &str) -> ObjectDataSourceModel {
        ObjectDataSourceModel {
            bucket: "data".to_owned(),
            key: key.to_owned(),
            ..ObjectDataSourceModel::default()
        }
    }

    #[tokio::test]
    async fn test_should_return_body_only_for_readable_objects() {
        let (client, mem) = client();
        data_bucket(&mem).await;
        object(&mem, "config.json", "application/json", b"{\"a\":1}").await;
        object(&mem, "image.png", "image/png", b"\x89PNG").await;

        let json = ObjectDataSource.read(&client, lookup("config.json")).await.unwrap();
        assert_eq!(json.id, "data/config.json");
        assert_eq!(json.arn, "arn:aws:s3:::data/config.json");
        assert_eq!(json.body.as_deref(), Some("{\"a\":1}"));
        assert_eq!(json.content_length, 7);
        assert_eq!(json.tags["team"], "storage");
        let rfc1123 =
            Regex::new(r"^[A-Z][a-z]{2}, \d{2} [A-Z][a-z]{2} \d{4} \d{2}:\d{2}:\d{2} GMT$").unwrap();
        let last_modified = json.last_modified.as_deref().unwrap();
        assert!(rfc1123.is_match(last_modified), "{last_modified}");
        assert!(chrono::DateTime::parse_from_rfc2822(last_modified).is_ok());

        let png = ObjectDataSource.read(&client, lookup("image.png")).await.unwrap();
        assert!(png.body.is_none());
        assert_eq!(png.content_type.as_deref(), Some("image/png"));

        let err = ObjectDataSource.read(&client, lookup("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_should_look_up_keys_with_extra_slashes() {
        let (client, mem) = client();
        data_bucket(&mem).await;
        object(&mem, "slashed", "text/plain", b"one").await;
        object(&mem, "first/second/third/", "text/plain", b"three").await;

        for key in ["/slashed", "//slashed"] {
            let found = ObjectDataSource.read(&client, lookup(key)).await.unwrap();
            assert_eq!(found.key, "slashed");
            assert_eq!(found.id, "data/slashed");
            assert_eq!(found.arn, "arn:aws:s3:::data/slashed");
            assert_eq!(found.body.as_deref(), Some("one"));
        }

        let nested = ObjectDataSource
            .read(&client, lookup("first//second///third//"))
            .await
            .unwrap();
        assert_eq!(nested.id, "data/first/second/third/");
        assert_eq!(nested.body.as_deref(), Some("three"));

        let err = ObjectDataSource.read(&client, lookup("/")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_should_return_checksums_only_when_enabled() {
        let (client, mem) = client();
        data_bucket(&mem).await;
        mem.put_object(&PutObjectInput {
            bucket: "data".to_owned(),
            key: "summed.txt".to_owned(),
            body: Bytes::from_static(b"checksummed"),
            checksum_algorithm: Some(ChecksumAlgorithm::Sha256),
            ..PutObjectInput::default()
        })
        .await
        .unwrap();

        let plain = ObjectDataSource.read(&client, lookup("summed.txt")).await.unwrap();
        assert!(plain.checksum_sha256.is_none());

        let mut enabled = lookup("summed.txt");
        enabled.checksum_mode = Some(ChecksumMode::Enabled);
        let enabled = ObjectDataSource.read(&client, enabled).await.unwrap();
        assert_eq!(
            enabled.checksum_sha256.as_deref(),
            Some("nP4pdPMq+NnB55XB1hjJE61F6nXccf5WRx705pLw9e0=")
        );
        assert!(enabled.checksum_crc32.is_none());
        assert!(enabled.checksum_sha1.is_none());
    }

    #[test]
    fn test_should_classify_content_types() {
        assert!(is_readable(Some("text/plain; charset=utf-8")));
        assert!(is_readable(Some("application/ld+json")));
        assert!(!is_readable(Some("application/octet-stream")));
        assert!(!is_readable(None));
    }
}
