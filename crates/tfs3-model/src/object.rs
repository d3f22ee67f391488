//! Request and response shapes for bucket creation and object operations.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::types::{
    AccessControlPolicy, BucketCannedAcl, BucketTarget, ChecksumAlgorithm, ObjectCannedAcl,
    ObjectLockLegalHoldStatus, ObjectLockRetentionMode, ServerSideEncryption, StorageClass,
};

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// Input of `CreateBucket`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateBucketInput {
    /// Bucket name.
    pub bucket: String,
    /// Canned ACL applied at creation.
    pub acl: Option<BucketCannedAcl>,
    /// Location constraint; `None` in `us-east-1`.
    pub location_constraint: Option<String>,
    /// Enable object lock on the new bucket.
    pub object_lock_enabled: bool,
}

/// ACL written by `PutBucketAcl`: either a canned ACL or an explicit policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketAclInput {
    /// A canned ACL.
    Canned(BucketCannedAcl),
    /// An explicit access control policy.
    Policy(AccessControlPolicy),
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// Content and system metadata shared by object uploads and reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeaders {
    /// `Cache-Control` header.
    pub cache_control: Option<String>,
    /// `Content-Disposition` header.
    pub content_disposition: Option<String>,
    /// `Content-Encoding` header.
    pub content_encoding: Option<String>,
    /// `Content-Language` header.
    pub content_language: Option<String>,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// Website redirect location.
    pub website_redirect_location: Option<String>,
    /// User metadata (`x-amz-meta-*`), keys lowercased.
    pub metadata: BTreeMap<String, String>,
}

/// Object lock settings of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectLockSettings {
    /// Legal hold status.
    pub legal_hold_status: Option<ObjectLockLegalHoldStatus>,
    /// Retention mode.
    pub mode: Option<ObjectLockRetentionMode>,
    /// Retain until this instant.
    pub retain_until_date: Option<DateTime<Utc>>,
}

/// Additional checksums of an object, base64 encoded. Only the one matching
/// the upload's checksum algorithm is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectChecksums {
    /// CRC32, big-endian.
    pub crc32: Option<String>,
    /// CRC32C, big-endian.
    pub crc32c: Option<String>,
    /// SHA-1 digest.
    pub sha1: Option<String>,
    /// SHA-256 digest.
    pub sha256: Option<String>,
}

/// Input of `PutObject`.
#[derive(Debug, Clone, Default)]
pub struct PutObjectInput {
    /// Target bucket.
    pub bucket: String,
    /// Account expected to own the bucket.
    pub expected_bucket_owner: Option<String>,
    /// Object key.
    pub key: String,
    /// Object body.
    pub body: Bytes,
    /// Content and system metadata.
    pub headers: ObjectHeaders,
    /// Canned ACL.
    pub acl: Option<ObjectCannedAcl>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// Server-side encryption algorithm.
    pub server_side_encryption: Option<ServerSideEncryption>,
    /// KMS key for `aws:kms` encryption.
    pub kms_key_id: Option<String>,
    /// Use an S3 Bucket Key for SSE-KMS.
    pub bucket_key_enabled: Option<bool>,
    /// URL-encoded tag set (`k1=v1&k2=v2`).
    pub tagging: Option<String>,
    /// Object lock settings.
    pub object_lock: ObjectLockSettings,
    /// Additional checksum S3 computes and stores with the object.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
}

impl PutObjectInput {
    /// The bucket addressed by this upload.
    #[must_use]
    pub fn target(&self) -> BucketTarget {
        BucketTarget::with_owner(&self.bucket, self.expected_bucket_owner.as_deref())
    }
}

/// Output of `PutObject`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Entity tag of the stored object.
    pub etag: Option<String>,
    /// Version ID when versioning is enabled.
    pub version_id: Option<String>,
}

/// Metadata returned by `HeadObject`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Content and system metadata.
    pub headers: ObjectHeaders,
    /// Entity tag.
    pub etag: Option<String>,
    /// Version ID.
    pub version_id: Option<String>,
    /// Size in bytes.
    pub content_length: i64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Storage class; `None` means `STANDARD`.
    pub storage_class: Option<StorageClass>,
    /// Server-side encryption algorithm.
    pub server_side_encryption: Option<ServerSideEncryption>,
    /// KMS key ID.
    pub kms_key_id: Option<String>,
    /// Whether an S3 Bucket Key is used.
    pub bucket_key_enabled: Option<bool>,
    /// Object lock settings.
    pub object_lock: ObjectLockSettings,
    /// Additional checksums.
    pub checksums: ObjectChecksums,
}

/// An object body together with its metadata.
#[derive(Debug, Clone, Default)]
pub struct ObjectContent {
    /// Object metadata.
    pub metadata: ObjectMetadata,
    /// Object body.
    pub body: Bytes,
}

/// A version (or delete marker) returned by `ListObjectVersions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    /// Object key.
    pub key: String,
    /// Version ID (`"null"` for unversioned objects).
    pub version_id: String,
    /// Whether this entry is a delete marker.
    pub is_delete_marker: bool,
    /// Whether this is the current version.
    pub is_latest: bool,
}

/// One page of `ListObjectVersions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersionPage {
    /// Versions and delete markers on this page.
    pub versions: Vec<ObjectVersion>,
    /// Key marker for the next page.
    pub next_key_marker: Option<String>,
    /// Version ID marker for the next page.
    pub next_version_id_marker: Option<String>,
    /// Whether more pages follow.
    pub is_truncated: bool,
}

/// An object (optionally a specific version) to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier {
    /// Object key.
    pub key: String,
    /// Version ID.
    pub version_id: Option<String>,
}

/// Input of `DeleteObject`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectInput {
    /// Object key.
    pub key: String,
    /// Version to delete; `None` creates a delete marker on versioned buckets.
    pub version_id: Option<String>,
    /// Bypass governance-mode retention.
    pub bypass_governance_retention: bool,
}

/// Output of `DeleteObject`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectOutput {
    /// Whether a delete marker was created or removed.
    pub delete_marker: bool,
    /// Version ID of the deleted version or created marker.
    pub version_id: Option<String>,
}

/// A per-key failure reported by `DeleteObjects`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteObjectsError {
    /// Object key.
    pub key: String,
    /// Version ID.
    pub version_id: Option<String>,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// An object retention setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRetention {
    /// Retention mode; `None` clears retention.
    pub mode: Option<ObjectLockRetentionMode>,
    /// Retain until this instant.
    pub retain_until_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_derive_target_from_put_input() {
        let input = PutObjectInput {
            bucket: "b".to_owned(),
            expected_bucket_owner: Some(String::new()),
            key: "k".to_owned(),
            ..PutObjectInput::default()
        };
        assert_eq!(input.target(), BucketTarget::new("b"));
    }
}
