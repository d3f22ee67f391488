//! Deleting every version of a bucket's objects.
//!
//! Used by `force_destroy` on buckets and by object deletion. With `force`,
//! governance-mode retention is bypassed and legal holds are lifted before a
//! locked version is deleted again.

use tfs3_model::object::{DeleteObjectInput, ObjectIdentifier, ObjectVersion};
use tfs3_model::types::{BucketTarget, ObjectLockLegalHoldStatus};
use tfs3_model::{S3Error, S3ErrorCode};
use tracing::{debug, warn};

use crate::conn::S3Api;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};

/// Largest batch `DeleteObjects` accepts.
const DELETE_BATCH_SIZE: usize = 1000;

/// All versions and delete markers under `prefix`.
async fn list_all_versions(
    conn: &dyn S3Api,
    target: &BucketTarget,
    prefix: Option<&str>,
) -> ProviderResult<Vec<ObjectVersion>> {
    let mut versions = Vec::new();
    let mut key_marker: Option<String> = None;
    let mut version_id_marker: Option<String> = None;
    loop {
        let page = conn
            .list_object_versions(
                target,
                prefix,
                key_marker.as_deref(),
                version_id_marker.as_deref(),
            )
            .await
            .context("listing S3 Bucket object versions", &target.bucket)?;
        versions.extend(page.versions);
        if !page.is_truncated {
            return Ok(versions);
        }
        key_marker = page.next_key_marker;
        version_id_marker = page.next_version_id_marker;
    }
}

/// Delete one version, lifting a legal hold and retrying once when `force`
/// is set and the version is locked.
async fn delete_version(
    conn: &dyn S3Api,
    target: &BucketTarget,
    key: &str,
    version_id: &str,
    force: bool,
) -> ProviderResult<()> {
    let input = DeleteObjectInput {
        key: key.to_owned(),
        version_id: Some(version_id.to_owned()),
        bypass_governance_retention: force,
    };
    match conn.delete_object(target, &input).await {
        Ok(_) => Ok(()),
        Err(e) if force && e.code == S3ErrorCode::AccessDenied => {
            debug!(bucket = %target.bucket, key, version_id, "removing legal hold");
            conn.put_object_legal_hold(
                target,
                key,
                Some(version_id),
                ObjectLockLegalHoldStatus::Off,
            )
            .await
            .context("removing S3 Object legal hold", key)?;
            conn.delete_object(target, &input)
                .await
                .map(|_| ())
                .context("deleting S3 Object version", key)
        }
        Err(e) => Err(ProviderError::api("deleting S3 Object version", key, e)),
    }
}

/// Delete `versions` in batches, falling back to single deletes for
/// versions the batch could not remove.
async fn delete_batched(
    conn: &dyn S3Api,
    target: &BucketTarget,
    versions: &[ObjectVersion],
    force: bool,
) -> ProviderResult<usize> {
    let mut deleted = 0;
    let mut first_error: Option<ProviderError> = None;

    for batch in versions.chunks(DELETE_BATCH_SIZE) {
        let identifiers: Vec<ObjectIdentifier> = batch
            .iter()
            .map(|v| ObjectIdentifier {
                key: v.key.clone(),
                version_id: Some(v.version_id.clone()),
            })
            .collect();
        let failures = conn
            .delete_objects(target, &identifiers, force)
            .await
            .context("deleting S3 Bucket object versions", &target.bucket)?;
        deleted += batch.len() - failures.len();

        for failure in failures {
            let version_id = failure.version_id.unwrap_or_default();
            let code = S3ErrorCode::from_code(&failure.code);
            let result = if force && code == S3ErrorCode::AccessDenied {
                delete_version(conn, target, &failure.key, &version_id, force).await
            } else {
                Err(ProviderError::api(
                    "deleting S3 Object version",
                    failure.key.clone(),
                    S3Error::with_message(code, failure.message),
                ))
            };
            match result {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(bucket = %target.bucket, key = %failure.key, %version_id, error = %e, "object version not deleted");
                    first_error.get_or_insert(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(deleted),
    }
}

/// Delete every object version and delete marker in a bucket. Returns the
/// number of entries deleted.
///
/// # Errors
///
/// Fails on listing errors, and with the first per-version failure after
/// every version has been attempted.
pub(crate) async fn empty_bucket(
    conn: &dyn S3Api,
    target: &BucketTarget,
    force: bool,
) -> ProviderResult<usize> {
    let versions: Vec<ObjectVersion> = list_all_versions(conn, target, None)
        .await?
        .into_iter()
        .filter(|v| !v.is_delete_marker)
        .collect();
    let mut deleted = delete_batched(conn, target, &versions, force).await?;

    let markers: Vec<ObjectVersion> = list_all_versions(conn, target, None)
        .await?
        .into_iter()
        .filter(|v| v.is_delete_marker)
        .collect();
    deleted += delete_batched(conn, target, &markers, force).await?;

    debug!(bucket = %target.bucket, deleted, "emptied bucket");
    Ok(deleted)
}

/// Delete every version and delete marker of one object. Returns the number
/// of entries deleted.
///
/// When no version is listed (for example without `s3:ListBucketVersions`)
/// the key is deleted without a version ID.
pub(crate) async fn delete_all_object_versions(
    conn: &dyn S3Api,
    target: &BucketTarget,
    key: &str,
    force: bool,
) -> ProviderResult<usize> {
    let versions: Vec<ObjectVersion> = match list_all_versions(conn, target, Some(key)).await {
        Ok(versions) => versions.into_iter().filter(|v| v.key == key).collect(),
        Err(e) if e.code_is(&[S3ErrorCode::NoSuchBucket]) => return Ok(0),
        Err(e) => return Err(e),
    };

    if versions.is_empty() {
        let input = DeleteObjectInput {
            key: key.to_owned(),
            version_id: None,
            bypass_governance_retention: force,
        };
        return match conn.delete_object(target, &input).await {
            Ok(_) => Ok(1),
            Err(e) if e.code_is(&[S3ErrorCode::NoSuchKey, S3ErrorCode::NoSuchBucket]) => Ok(0),
            Err(e) => Err(ProviderError::api("deleting S3 Object", key, e)),
        };
    }

    let mut deleted = 0;
    for version in &versions {
        match delete_version(conn, target, key, &version.version_id, force).await {
            Ok(()) => deleted += 1,
            Err(e) if e.code_is(&[S3ErrorCode::NoSuchKey, S3ErrorCode::NoSuchVersion]) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::{Duration as ChronoDuration, Utc};
    use tfs3_model::object::{CreateBucketInput, ObjectLockSettings, PutObjectInput};
    use tfs3_model::types::{
        BucketVersioningStatus, ObjectLockRetentionMode, VersioningConfiguration,
    };

    use super::*;
    use crate::conn::InMemoryS3;

    async fn versioned_bucket(mem: &InMemoryS3, name: &str, lock: bool) -> BucketTarget {
        mem.create_bucket(&CreateBucketInput {
            bucket: name.to_owned(),
            object_lock_enabled: lock,
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
        let target = BucketTarget::new(name);
        mem.put_bucket_versioning(
            &target,
            &VersioningConfiguration {
                status: Some(BucketVersioningStatus::Enabled),
                mfa_delete: None,
            },
            None,
        )
        .await
        .unwrap();
        target
    }

    async fn put(mem: &InMemoryS3, bucket: &str, key: &str, lock: ObjectLockSettings) {
        mem.put_object(&PutObjectInput {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            body: Bytes::from_static(b"data"),
            object_lock: lock,
            ..PutObjectInput::default()
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_should_empty_bucket_across_pages() {
        let mem = InMemoryS3::new("us-east-1").with_page_size(2);
        let target = versioned_bucket(&mem, "b", false).await;
        for key in ["a", "a", "b", "c"] {
            put(&mem, "b", key, ObjectLockSettings::default()).await;
        }
        mem.delete_object(
            &target,
            &DeleteObjectInput {
                key: "c".to_owned(),
                ..DeleteObjectInput::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(mem.version_count("b"), 5);

        let deleted = empty_bucket(&mem, &target, false).await.unwrap();
        assert_eq!(deleted, 5);
        assert_eq!(mem.version_count("b"), 0);
        mem.delete_bucket(&target).await.unwrap();
    }

    #[tokio::test]
    async fn test_should_bypass_locks_only_when_forced() {
        let mem = InMemoryS3::new("us-east-1");
        let target = versioned_bucket(&mem, "locked", true).await;
        put(
            &mem,
            "locked",
            "held",
            ObjectLockSettings {
                legal_hold_status: Some(ObjectLockLegalHoldStatus::On),
                ..ObjectLockSettings::default()
            },
        )
        .await;
        put(
            &mem,
            "locked",
            "governed",
            ObjectLockSettings {
                mode: Some(ObjectLockRetentionMode::Governance),
                retain_until_date: Some(Utc::now() + ChronoDuration::days(1)),
                ..ObjectLockSettings::default()
            },
        )
        .await;

        let err = empty_bucket(&mem, &target, false).await.unwrap_err();
        assert!(err.code_is(&[S3ErrorCode::AccessDenied]));
        assert_eq!(mem.version_count("locked"), 2);

        assert_eq!(empty_bucket(&mem, &target, true).await.unwrap(), 2);
        assert_eq!(mem.version_count("locked"), 0);
    }

    #[tokio::test]
    async fn test_should_delete_only_the_exact_key() {
        let mem = InMemoryS3::new("us-east-1");
        let target = versioned_bucket(&mem, "b", false).await;
        put(&mem, "b", "key", ObjectLockSettings::default()).await;
        put(&mem, "b", "key", ObjectLockSettings::default()).await;
        put(&mem, "b", "key2", ObjectLockSettings::default()).await;

        let deleted = delete_all_object_versions(&mem, &target, "key", false)
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(mem.version_count("b"), 1);

        assert_eq!(
            delete_all_object_versions(&mem, &BucketTarget::new("gone"), "key", false)
                .await
                .unwrap(),
            0
        );
    }
}
