//! The `aws_s3_object` resource.
//!
//! The body comes from exactly one of `content`, `content_base64` or a local
//! `source` file. Any change to the body or its stored metadata uploads a
//! new object; ACL, legal hold, retention and tag changes are applied in
//! place.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tfs3_core::endpoints::arn;
use tfs3_model::S3ErrorCode;
use tfs3_model::object::{
    ObjectHeaders, ObjectLockSettings, ObjectMetadata, ObjectRetention, PutObjectInput,
};
use tfs3_model::types::{
    BucketTarget, ChecksumAlgorithm, ObjectCannedAcl, ObjectLockLegalHoldStatus, ObjectLockRetentionMode,
    ServerSideEncryption, StorageClass,
};
use tracing::{debug, info};

use super::versions::delete_all_object_versions;
use super::validate_bucket_args;
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::{parse_object_import_id, sdk_v1_compatible_clean_key};
use crate::resource::{Resource, found_after_write, has_change, removed_from_state};
use crate::retry::retry_when_not_found;
use crate::tags::{KeyValueTags, object_list_tags, object_update_tags, tags_for_state};
use crate::validation::validate_len;

const KIND: &str = "S3 Object";

/// Version ID S3 reports for objects written while versioning was off.
const NULL_VERSION_ID: &str = "null";

/// The `aws_s3_object` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct Object;

/// State of an `aws_s3_object`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ObjectModel {
    /// The object key.
    pub id: String,
    pub bucket: String,
    pub key: String,

    /// UTF-8 body.
    pub content: Option<String>,
    /// Base64-encoded binary body.
    pub content_base64: Option<String>,
    /// Path of a local file to upload.
    pub source: Option<String>,
    /// Caller-supplied hash of `source`; a change forces an upload.
    pub source_hash: Option<String>,

    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
    /// User metadata. Keys must be lowercase.
    pub metadata: BTreeMap<String, String>,
    /// Redirect target when the bucket is a website.
    pub website_redirect: Option<String>,

    pub acl: Option<ObjectCannedAcl>,
    pub storage_class: Option<StorageClass>,
    pub server_side_encryption: Option<ServerSideEncryption>,
    pub kms_key_id: Option<String>,
    pub bucket_key_enabled: Option<bool>,
    /// Additional checksum S3 computes on upload.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,

    pub object_lock_legal_hold_status: Option<ObjectLockLegalHoldStatus>,
    pub object_lock_mode: Option<ObjectLockRetentionMode>,
    /// RFC 3339 timestamp.
    pub object_lock_retain_until_date: Option<String>,

    pub tags: BTreeMap<String, String>,
    pub tags_all: BTreeMap<String, String>,

    /// Delete every version, bypassing governance retention.
    pub force_destroy: bool,

    // Computed.
    pub etag: String,
    pub version_id: Option<String>,
    pub arn: String,
    pub checksum_crc32: Option<String>,
    pub checksum_crc32c: Option<String>,
    pub checksum_sha1: Option<String>,
    pub checksum_sha256: Option<String>,
}

impl ObjectModel {
    /// Whether the body or its stored metadata differ, requiring an upload.
    fn content_changed(&self, other: &Self) -> bool {
        has_change(&self.content, &other.content)
            || has_change(&self.content_base64, &other.content_base64)
            || has_change(&self.source, &other.source)
            || has_change(&self.source_hash, &other.source_hash)
            || has_change(&self.cache_control, &other.cache_control)
            || has_change(&self.content_disposition, &other.content_disposition)
            || has_change(&self.content_encoding, &other.content_encoding)
            || has_change(&self.content_language, &other.content_language)
            || configured_change(other.content_type.as_ref(), self.content_type.as_ref())
            || has_change(&self.metadata, &other.metadata)
            || has_change(&self.website_redirect, &other.website_redirect)
            || has_change(&self.checksum_algorithm, &other.checksum_algorithm)
            || configured_change(other.storage_class.as_ref(), self.storage_class.as_ref())
            || configured_change(other.server_side_encryption.as_ref(), self.server_side_encryption.as_ref())
            || configured_change(other.kms_key_id.as_ref(), self.kms_key_id.as_ref())
            || configured_change(other.bucket_key_enabled.as_ref(), self.bucket_key_enabled.as_ref())
    }

    fn target(&self) -> BucketTarget {
        BucketTarget::new(&self.bucket)
    }
}

/// A change to an attribute S3 computes when the plan leaves it unset.
fn configured_change<T: PartialEq>(prior: Option<&T>, plan: Option<&T>) -> bool {
    plan.is_some() && prior != plan
}

fn parse_retain_until(value: &str) -> ProviderResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            ProviderError::validation(format!(
                "object_lock_retain_until_date: {value:?} is not a valid RFC 3339 timestamp: {e}"
            ))
        })
}

fn validate(plan: &ObjectModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, None)?;
    validate_len("key", &plan.key, 1, 1024)?;
    if sdk_v1_compatible_clean_key(&plan.key).is_empty() {
        return Err(ProviderError::validation(format!(
            "key: {:?} is empty after removing slashes",
            plan.key
        )));
    }

    let bodies = [
        plan.content.is_some(),
        plan.content_base64.is_some(),
        plan.source.is_some(),
    ];
    if bodies.into_iter().filter(|set| *set).count() > 1 {
        return Err(ProviderError::validation(
            "only one of content, content_base64 or source can be set",
        ));
    }

    if let Some(key) = plan.metadata.keys().find(|k| k.chars().any(char::is_uppercase)) {
        return Err(ProviderError::validation(format!(
            "metadata: key {key:?} must be lowercase"
        )));
    }

    if plan.kms_key_id.is_some()
        && !matches!(
            plan.server_side_encryption,
            Some(ServerSideEncryption::AwsKms | ServerSideEncryption::AwsKmsDsse)
        )
    {
        return Err(ProviderError::validation(
            "kms_key_id: requires server_side_encryption aws:kms or aws:kms:dsse",
        ));
    }

    match (&plan.object_lock_mode, &plan.object_lock_retain_until_date) {
        (Some(_), None) | (None, Some(_)) => {
            return Err(ProviderError::validation(
                "object_lock_mode and object_lock_retain_until_date must be set together",
            ));
        }
        (Some(_), Some(date)) => {
            parse_retain_until(date)?;
        }
        (None, None) => {}
    }
    Ok(())
}

/// Read the configured body.
async fn body(plan: &ObjectModel) -> ProviderResult<Bytes> {
    if let Some(content) = &plan.content {
        return Ok(Bytes::from(content.clone()));
    }
    if let Some(encoded) = &plan.content_base64 {
        return BASE64
            .decode(encoded)
            .map(Bytes::from)
            .map_err(|e| ProviderError::validation(format!("content_base64: {e}")));
    }
    if let Some(path) = &plan.source {
        return tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| ProviderError::validation(format!("source: reading {path}: {e}")));
    }
    Ok(Bytes::new())
}

impl Object {
    /// Upload the object with every configured attribute.
    async fn put(client: &AwsClient, plan: &ObjectModel, tags_all: &KeyValueTags) -> ProviderResult<()> {
        let input = PutObjectInput {
            bucket: plan.bucket.clone(),
            expected_bucket_owner: None,
            key: plan.key.clone(),
            body: body(plan).await?,
            headers: ObjectHeaders {
                cache_control: plan.cache_control.clone(),
                content_disposition: plan.content_disposition.clone(),
                content_encoding: plan.content_encoding.clone(),
                content_language: plan.content_language.clone(),
                content_type: plan.content_type.clone(),
                website_redirect_location: plan.website_redirect.clone(),
                metadata: plan.metadata.clone(),
            },
            acl: plan.acl,
            storage_class: plan.storage_class,
            server_side_encryption: plan.server_side_encryption,
            kms_key_id: plan.kms_key_id.clone(),
            bucket_key_enabled: plan.bucket_key_enabled,
            tagging: (!tags_all.is_empty()).then(|| tags_all.url_encode()),
            object_lock: ObjectLockSettings {
                legal_hold_status: plan.object_lock_legal_hold_status,
                mode: plan.object_lock_mode,
                retain_until_date: plan
                    .object_lock_retain_until_date
                    .as_deref()
                    .map(parse_retain_until)
                    .transpose()?,
            },
            checksum_algorithm: plan.checksum_algorithm,
        };
        let output = client
            .conn()
            .put_object(&input)
            .await
            .context("uploading S3 Object", &plan.key)?;
        debug!(bucket = %plan.bucket, key = %plan.key, version_id = ?output.version_id, "uploaded S3 Object");
        Ok(())
    }

    async fn head(client: &AwsClient, target: &BucketTarget, key: &str) -> ProviderResult<ObjectMetadata> {
        client.conn().head_object(target, key, None).await.not_found_on(
            &[S3ErrorCode::NotFound, S3ErrorCode::NoSuchKey, S3ErrorCode::NoSuchBucket],
            KIND,
            "reading S3 Object",
            key,
        )
    }

    async fn refresh(
        client: &AwsClient,
        mut state: ObjectModel,
        is_new: bool,
    ) -> ProviderResult<Option<ObjectModel>> {
        let target = &state.target();
        let key = state.key.as_str();

        let head = if is_new {
            retry_when_not_found(client.propagation_timeout(), move || Self::head(client, target, key)).await
        } else {
            Self::head(client, target, key).await
        };
        let metadata = match head {
            Ok(metadata) => metadata,
            Err(e) if !is_new && e.is_not_found() => return Ok(removed_from_state(KIND, key)),
            Err(e) => return Err(e),
        };

        let remote_tags = object_list_tags(client.conn(), target, key).await?;
        let tags_all = tags_for_state(&remote_tags, client.ignore_tags());

        let headers = metadata.headers;
        state.cache_control = headers.cache_control;
        state.content_disposition = headers.content_disposition;
        state.content_encoding = headers.content_encoding;
        state.content_language = headers.content_language;
        state.content_type = headers.content_type;
        state.website_redirect = headers.website_redirect_location;
        state.metadata = headers.metadata;
        state.etag = metadata.etag.unwrap_or_default().trim_matches('"').to_owned();
        state.version_id = metadata.version_id.filter(|v| v != NULL_VERSION_ID);
        state.storage_class = Some(metadata.storage_class.unwrap_or(StorageClass::Standard));
        state.server_side_encryption = metadata.server_side_encryption;
        state.kms_key_id = metadata.kms_key_id;
        state.bucket_key_enabled = metadata.bucket_key_enabled;
        state.checksum_crc32 = metadata.checksums.crc32;
        state.checksum_crc32c = metadata.checksums.crc32c;
        state.checksum_sha1 = metadata.checksums.sha1;
        state.checksum_sha256 = metadata.checksums.sha256;
        state.object_lock_legal_hold_status = metadata.object_lock.legal_hold_status;
        state.object_lock_mode = metadata.object_lock.mode;
        state.object_lock_retain_until_date = metadata
            .object_lock
            .retain_until_date
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));
        state.tags = client.default_tags().remove_from(&tags_all).map();
        state.tags_all = tags_all.map();
        state.arn = arn(
            client.partition().id(),
            "s3",
            "",
            "",
            &format!("{}/{}", state.bucket, state.key),
        );
        state.id = state.key.clone();
        Ok(Some(state))
    }

    /// Apply ACL, legal hold, retention and tag changes without an upload.
    async fn update_in_place(
        client: &AwsClient,
        prior: &ObjectModel,
        plan: &ObjectModel,
        tags_all: &KeyValueTags,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let target = &plan.target();
        let key = plan.key.as_str();

        if has_change(&prior.acl, &plan.acl) {
            conn.put_object_acl(target, key, plan.acl.unwrap_or(ObjectCannedAcl::Private))
                .await
                .context("putting S3 Object ACL", key)?;
        }

        if has_change(&prior.object_lock_legal_hold_status, &plan.object_lock_legal_hold_status) {
            let status = plan
                .object_lock_legal_hold_status
                .unwrap_or(ObjectLockLegalHoldStatus::Off);
            conn.put_object_legal_hold(target, key, None, status)
                .await
                .context("putting S3 Object legal hold", key)?;
        }

        if has_change(&prior.object_lock_mode, &plan.object_lock_mode)
            || has_change(&prior.object_lock_retain_until_date, &plan.object_lock_retain_until_date)
        {
            let prior_until = prior
                .object_lock_retain_until_date
                .as_deref()
                .map(parse_retain_until)
                .transpose()?;
            let until = plan
                .object_lock_retain_until_date
                .as_deref()
                .map(parse_retain_until)
                .transpose()?;
            // Shortening or removing governance retention needs the bypass.
            let bypass = match (prior_until, until) {
                (Some(before), Some(after)) => after < before,
                (Some(_), None) => true,
                _ => false,
            };
            let retention = ObjectRetention {
                mode: plan.object_lock_mode,
                retain_until_date: until,
            };
            conn.put_object_retention(target, key, None, &retention, bypass)
                .await
                .context("putting S3 Object retention", key)?;
        }

        let old_tags = KeyValueTags::from(&prior.tags_all);
        if !old_tags.equal(tags_all) {
            object_update_tags(conn, target, key, &old_tags, tags_all).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for Object {
    const TYPE_NAME: &'static str = "aws_s3_object";
    type Model = ObjectModel;

    async fn create(&self, client: &AwsClient, mut plan: ObjectModel) -> ProviderResult<ObjectModel> {
        validate(&plan)?;
        plan.key = sdk_v1_compatible_clean_key(&plan.key);
        let tags_all = client.default_tags().merge_tags(&KeyValueTags::from(&plan.tags));
        info!(bucket = %plan.bucket, key = %plan.key, "creating S3 Object");
        Self::put(client, &plan, &tags_all).await?;
        plan.id = plan.key.clone();
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(&self, client: &AwsClient, state: ObjectModel) -> ProviderResult<Option<ObjectModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: ObjectModel,
        mut plan: ObjectModel,
    ) -> ProviderResult<ObjectModel> {
        validate(&plan)?;
        plan.key = sdk_v1_compatible_clean_key(&plan.key);
        if plan.bucket != prior.bucket || plan.key != prior.key {
            return Err(ProviderError::validation(format!(
                "bucket and key of S3 Object ({}) cannot change in place, replace the resource",
                prior.id
            )));
        }
        plan.id = prior.id.clone();

        let tags_all = client.default_tags().merge_tags(&KeyValueTags::from(&plan.tags));
        if plan.content_changed(&prior) {
            info!(bucket = %plan.bucket, key = %plan.key, "uploading new S3 Object content");
            Self::put(client, &plan, &tags_all).await?;
        } else {
            Self::update_in_place(client, &prior, &plan, &tags_all).await?;
        }

        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(&self, client: &AwsClient, state: ObjectModel) -> ProviderResult<()> {
        let target = state.target();
        let key = sdk_v1_compatible_clean_key(&state.key);
        info!(bucket = %state.bucket, key = %key, force_destroy = state.force_destroy, "deleting S3 Object");
        let deleted =
            delete_all_object_versions(client.conn(), &target, &key, state.force_destroy).await?;
        debug!(bucket = %state.bucket, key = %key, deleted, "deleted S3 Object versions");
        Ok(())
    }

    fn import(&self, id: &str) -> ProviderResult<ObjectModel> {
        let (bucket, key) = parse_object_import_id(id)?;
        Ok(ObjectModel {
            id: key.clone(),
            bucket,
            key,
            ..ObjectModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use chrono::Duration as ChronoDuration;
    use tfs3_model::object::CreateBucketInput;
    use tfs3_model::types::{BucketVersioningStatus, VersioningConfiguration};

    use super::*;
    use crate::conn::{InMemoryS3, S3Api};
    use crate::resources::test_support::client;

    async fn bucket(mem: &InMemoryS3, name: &str, versioned: bool, lock: bool) {
        mem.create_bucket(&CreateBucketInput {
            bucket: name.to_owned(),
            object_lock_enabled: lock,
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
        if versioned {
            mem.put_bucket_versioning(
                &BucketTarget::new(name),
                &VersioningConfiguration {
                    status: Some(BucketVersioningStatus::Enabled),
                    mfa_delete: None,
                },
                None,
            )
            .await
            .unwrap();
        }
    }

    fn plan(bucket: &str, key: &str, content: &str) -> ObjectModel {
        ObjectModel {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            content: Some(content.to_owned()),
            ..ObjectModel::default()
        }
    }

    #[tokio::test]
    async fn test_should_upload_and_read_back_object() {
        let (client, mem) = client();
        bucket(&mem, "objects", false, false).await;

        let mut object = plan("objects", "/docs//readme.txt", "hello");
        object.content_type = Some("text/plain".to_owned());
        object.metadata = BTreeMap::from([("owner".to_owned(), "storage".to_owned())]);
        object.tags = BTreeMap::from([("env".to_owned(), "test".to_owned())]);

        let state = Object.create(&client, object).await.unwrap();
        assert_eq!(state.id, "docs/readme.txt");
        assert_eq!(state.key, "docs/readme.txt");
        assert_eq!(state.etag, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(state.arn, "arn:aws:s3:::objects/docs/readme.txt");
        assert_eq!(state.content_type.as_deref(), Some("text/plain"));
        assert_eq!(state.metadata["owner"], "storage");
        assert_eq!(state.storage_class, Some(StorageClass::Standard));
        assert_eq!(state.tags_all["env"], "test");
        assert!(state.version_id.is_none());

        let imported = Object.import("s3://objects/docs/readme.txt").unwrap();
        let read = Object.read(&client, imported).await.unwrap().unwrap();
        assert_eq!(read.etag, state.etag);
        assert_eq!(read.tags, state.tags);
    }

    #[tokio::test]
    async fn test_should_store_requested_checksum_and_reupload_on_algorithm_change() {
        let (client, mem) = client();
        bucket(&mem, "sums", false, false).await;

        let mut object = plan("sums", "data.txt", "checksummed");
        object.checksum_algorithm = Some(ChecksumAlgorithm::Crc32);
        let state = Object.create(&client, object).await.unwrap();
        assert_eq!(state.checksum_algorithm, Some(ChecksumAlgorithm::Crc32));
        assert_eq!(state.checksum_crc32.as_deref(), Some("xjIjIw=="));
        assert!(state.checksum_crc32c.is_none());
        assert!(state.checksum_sha256.is_none());

        let mut next = state.clone();
        next.checksum_algorithm = Some(ChecksumAlgorithm::Sha256);
        let updated = Object.update(&client, state, next).await.unwrap();
        assert!(updated.checksum_crc32.is_none());
        assert_eq!(
            updated.checksum_sha256.as_deref(),
            Some("nP4pdPMq+NnB55XB1hjJE61F6nXccf5WRx705pLw9e0=")
        );
        let uploads = mem.calls().iter().filter(|c| **c == "put_object").count();
        assert_eq!(uploads, 2);
    }

    #[tokio::test]
    async fn test_should_update_tags_in_place_and_reupload_on_content_change() {
        let (client, mem) = client();
        bucket(&mem, "objects", true, false).await;

        let state = Object.create(&client, plan("objects", "key", "one")).await.unwrap();
        let first_version = state.version_id.clone();
        assert!(first_version.is_some());

        let mut tagged = state.clone();
        tagged.tags = BTreeMap::from([("stage".to_owned(), "1".to_owned())]);
        let uploads_before = mem.calls().iter().filter(|c| **c == "put_object").count();
        let state = Object.update(&client, state, tagged).await.unwrap();
        let uploads_after = mem.calls().iter().filter(|c| **c == "put_object").count();
        assert_eq!(uploads_before, uploads_after);
        assert_eq!(state.version_id, first_version);
        assert_eq!(state.tags["stage"], "1");

        let mut changed = state.clone();
        changed.content = Some("two".to_owned());
        let state = Object.update(&client, state, changed).await.unwrap();
        assert_ne!(state.version_id, first_version);
        assert_eq!(mem.version_count("objects"), 2);
        assert_eq!(state.tags["stage"], "1");

        Object.delete(&client, state.clone()).await.unwrap();
        assert_eq!(mem.version_count("objects"), 0);
        assert!(Object.read(&client, state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_upload_from_source_and_base64() {
        let (client, mem) = client();
        bucket(&mem, "objects", false, false).await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"from disk").unwrap();
        let state = Object
            .create(
                &client,
                ObjectModel {
                    bucket: "objects".to_owned(),
                    key: "file".to_owned(),
                    source: Some(file.path().display().to_string()),
                    ..ObjectModel::default()
                },
            )
            .await
            .unwrap();
        let stored = mem
            .get_object(&BucketTarget::new("objects"), "file", None)
            .await
            .unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"from disk"));
        assert_eq!(state.source, Some(file.path().display().to_string()));

        Object
            .create(
                &client,
                ObjectModel {
                    bucket: "objects".to_owned(),
                    key: "binary".to_owned(),
                    content_base64: Some(BASE64.encode([0_u8, 159, 146, 150])),
                    ..ObjectModel::default()
                },
            )
            .await
            .unwrap();
        let stored = mem
            .get_object(&BucketTarget::new("objects"), "binary", None)
            .await
            .unwrap();
        assert_eq!(stored.body.as_ref(), &[0_u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_should_force_destroy_governed_object() {
        let (client, mem) = client();
        bucket(&mem, "locked", true, true).await;

        let until = (Utc::now() + ChronoDuration::days(1)).to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut object = plan("locked", "governed", "data");
        object.object_lock_mode = Some(ObjectLockRetentionMode::Governance);
        object.object_lock_retain_until_date = Some(until.clone());
        let state = Object.create(&client, object).await.unwrap();
        assert_eq!(state.object_lock_mode, Some(ObjectLockRetentionMode::Governance));
        assert_eq!(state.object_lock_retain_until_date, Some(until));

        let err = Object.delete(&client, state.clone()).await.unwrap_err();
        assert!(err.code_is(&[S3ErrorCode::AccessDenied]));

        let mut forced = state;
        forced.force_destroy = true;
        Object.delete(&client, forced).await.unwrap();
        assert_eq!(mem.version_count("locked"), 0);
    }

    #[test]
    fn test_should_validate_object_arguments() {
        let mut both = plan("objects", "key", "text");
        both.content_base64 = Some("dGV4dA==".to_owned());
        assert!(validate(&both).is_err());

        let mut upper = plan("objects", "key", "text");
        upper.metadata = BTreeMap::from([("Owner".to_owned(), "x".to_owned())]);
        assert!(validate(&upper).is_err());

        let mut kms = plan("objects", "key", "text");
        kms.kms_key_id = Some("alias/key".to_owned());
        assert!(validate(&kms).is_err());
        kms.server_side_encryption = Some(ServerSideEncryption::AwsKms);
        assert!(validate(&kms).is_ok());

        let mut lock = plan("objects", "key", "text");
        lock.object_lock_mode = Some(ObjectLockRetentionMode::Compliance);
        assert!(validate(&lock).is_err());

        assert!(validate(&plan("objects", "///", "text")).is_err());
        assert!(Object.import("objects").is_err());
    }
}
