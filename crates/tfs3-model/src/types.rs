//! S3 bucket configuration shapes and enumerations.
//!
//! Structures serialize with the S3 API's PascalCase member names. Optional
//! members are omitted when unset so that normalized JSON (for example the
//! routing rules of a website configuration) carries no nulls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

s3_enum! {
    /// Canned ACL applied to a bucket.
    BucketCannedAcl {
        Private => "private",
        PublicRead => "public-read",
        PublicReadWrite => "public-read-write",
        AuthenticatedRead => "authenticated-read",
        LogDeliveryWrite => "log-delivery-write",
    }
}

s3_enum! {
    /// Canned ACL applied to an object.
    ObjectCannedAcl {
        Private => "private",
        PublicRead => "public-read",
        PublicReadWrite => "public-read-write",
        AuthenticatedRead => "authenticated-read",
        AwsExecRead => "aws-exec-read",
        BucketOwnerRead => "bucket-owner-read",
        BucketOwnerFullControl => "bucket-owner-full-control",
    }
}

s3_enum! {
    /// Permission granted by an ACL grant.
    Permission {
        FullControl => "FULL_CONTROL",
        Read => "READ",
        ReadAcp => "READ_ACP",
        Write => "WRITE",
        WriteAcp => "WRITE_ACP",
    }
}

s3_enum! {
    /// Kind of ACL grantee.
    GranteeType {
        CanonicalUser => "CanonicalUser",
        AmazonCustomerByEmail => "AmazonCustomerByEmail",
        Group => "Group",
    }
}

s3_enum! {
    /// Bucket versioning state.
    BucketVersioningStatus {
        Enabled => "Enabled",
        Suspended => "Suspended",
    }
}

s3_enum! {
    /// MFA delete state of a versioned bucket.
    MfaDeleteStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Lifecycle rule status.
    ExpirationStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Server-side encryption algorithm.
    ServerSideEncryption {
        Aes256 => "AES256",
        AwsKms => "aws:kms",
        AwsKmsDsse => "aws:kms:dsse",
    }
}

s3_enum! {
    /// Object lock enablement flag of a bucket.
    ObjectLockEnabled {
        Enabled => "Enabled",
    }
}

s3_enum! {
    /// Object lock retention mode.
    ObjectLockRetentionMode {
        Governance => "GOVERNANCE",
        Compliance => "COMPLIANCE",
    }
}

s3_enum! {
    /// Object lock legal hold status.
    ObjectLockLegalHoldStatus {
        On => "ON",
        Off => "OFF",
    }
}

s3_enum! {
    /// Additional checksum computed for an object upload.
    ChecksumAlgorithm {
        Crc32 => "CRC32",
        Crc32c => "CRC32C",
        Sha1 => "SHA1",
        Sha256 => "SHA256",
    }
}

s3_enum! {
    /// Whether a read returns the object's additional checksums.
    ChecksumMode {
        Enabled => "ENABLED",
    }
}

s3_enum! {
    /// Who pays for requests and data transfer.
    Payer {
        Requester => "Requester",
        BucketOwner => "BucketOwner",
    }
}

s3_enum! {
    /// Transfer acceleration state.
    BucketAccelerateStatus {
        Enabled => "Enabled",
        Suspended => "Suspended",
    }
}

s3_enum! {
    /// Redirect protocol.
    Protocol {
        Http => "http",
        Https => "https",
    }
}

s3_enum! {
    /// Replication rule status.
    ReplicationRuleStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Delete marker replication status.
    DeleteMarkerReplicationStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Replication status for SSE-KMS encrypted objects.
    SseKmsEncryptedObjectsStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Replica modification sync status.
    ReplicaModificationsStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Existing object replication status.
    ExistingObjectReplicationStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Replication metrics status.
    MetricsStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Replication Time Control status.
    ReplicationTimeStatus {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

s3_enum! {
    /// Replica ownership override.
    OwnerOverride {
        Destination => "Destination",
    }
}

s3_enum! {
    /// Object storage class.
    StorageClass {
        Standard => "STANDARD",
        ReducedRedundancy => "REDUCED_REDUNDANCY",
        StandardIa => "STANDARD_IA",
        OnezoneIa => "ONEZONE_IA",
        IntelligentTiering => "INTELLIGENT_TIERING",
        Glacier => "GLACIER",
        DeepArchive => "DEEP_ARCHIVE",
        Outposts => "OUTPOSTS",
        GlacierIr => "GLACIER_IR",
        Snow => "SNOW",
        ExpressOnezone => "EXPRESS_ONEZONE",
    }
}

s3_enum! {
    /// Storage class targeted by a lifecycle transition.
    TransitionStorageClass {
        Glacier => "GLACIER",
        StandardIa => "STANDARD_IA",
        OnezoneIa => "ONEZONE_IA",
        IntelligentTiering => "INTELLIGENT_TIERING",
        DeepArchive => "DEEP_ARCHIVE",
        GlacierIr => "GLACIER_IR",
    }
}

s3_enum! {
    /// Default minimum object size for lifecycle transitions.
    TransitionDefaultMinimumObjectSize {
        VariesByStorageClass => "varies_by_storage_class",
        AllStorageClasses128K => "all_storage_classes_128K",
    }
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// A bucket, optionally qualified by the account expected to own it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketTarget {
    /// Bucket name.
    pub bucket: String,
    /// Account ID that must own the bucket for the request to succeed.
    pub expected_bucket_owner: Option<String>,
}

impl BucketTarget {
    /// Address a bucket without an ownership condition.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            expected_bucket_owner: None,
        }
    }

    /// Address a bucket with an optional ownership condition. Empty owners are ignored.
    #[must_use]
    pub fn with_owner(bucket: impl Into<String>, owner: Option<&str>) -> Self {
        Self {
            bucket: bucket.into(),
            expected_bucket_owner: owner.filter(|o| !o.is_empty()).map(ToOwned::to_owned),
        }
    }
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

/// The owner of a bucket or object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    /// Display name (not returned in every region).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Canonical user ID.
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// The grantee of an ACL grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Grantee {
    /// Display name of a canonical user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Email address (legacy grantee form).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    /// Canonical user ID.
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Grantee kind.
    #[serde(rename = "Type")]
    pub r#type: GranteeType,
    /// URI of a predefined group.
    #[serde(rename = "URI", skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// A single ACL grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Grant {
    /// Who receives the permission.
    pub grantee: Grantee,
    /// The permission granted.
    pub permission: Permission,
}

/// A full access control policy (owner plus grants).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessControlPolicy {
    /// Grants of the policy.
    #[serde(default)]
    pub grants: Vec<Grant>,
    /// Owner of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
}

/// Public access block flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(clippy::struct_field_names)]
pub struct PublicAccessBlockConfiguration {
    /// Reject PUTs of public ACLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_public_acls: Option<bool>,
    /// Reject public bucket policies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_public_policy: Option<bool>,
    /// Ignore existing public ACLs.
    #[serde(rename = "IgnorePublicAcls", skip_serializing_if = "Option::is_none")]
    pub ignore_public_acls: Option<bool>,
    /// Restrict access to buckets with public policies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict_public_buckets: Option<bool>,
}

// ---------------------------------------------------------------------------
// Tags, CORS, logging
// ---------------------------------------------------------------------------

/// A key/value tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A CORS rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsRule {
    /// Optional rule identifier.
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Headers allowed in preflight requests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_headers: Vec<String>,
    /// Allowed HTTP methods.
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// Allowed origins.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Response headers exposed to the client.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expose_headers: Vec<String>,
    /// Preflight cache duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<i32>,
}

/// Server access logging target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingEnabled {
    /// Bucket receiving the logs.
    pub target_bucket: String,
    /// Key prefix for log objects.
    #[serde(default)]
    pub target_prefix: String,
}

// ---------------------------------------------------------------------------
// Website
// ---------------------------------------------------------------------------

/// Index document of a website configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDocument {
    /// Suffix appended to directory requests.
    pub suffix: String,
}

/// Error document of a website configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDocument {
    /// Object key returned for 4XX errors.
    pub key: String,
}

/// Redirect applied to every request of a website.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedirectAllRequestsTo {
    /// Target host name.
    pub host_name: String,
    /// Target protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

/// Condition of a routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Condition {
    /// HTTP error code that triggers the redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_error_code_returned_equals: Option<String>,
    /// Key prefix that triggers the redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix_equals: Option<String>,
}

/// Redirect of a routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Redirect {
    /// Target host name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// HTTP redirect code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_redirect_code: Option<String>,
    /// Target protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Replacement for the matched key prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_key_prefix_with: Option<String>,
    /// Replacement for the whole key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_key_with: Option<String>,
}

/// A website routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRule {
    /// When the rule applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Where requests are redirected.
    pub redirect: Redirect,
}

/// Static website hosting configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebsiteConfiguration {
    /// Error document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_document: Option<ErrorDocument>,
    /// Index document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_document: Option<IndexDocument>,
    /// Redirect for every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_all_requests_to: Option<RedirectAllRequestsTo>,
    /// Conditional redirects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing_rules: Vec<RoutingRule>,
}

// ---------------------------------------------------------------------------
// Versioning, acceleration, request payment
// ---------------------------------------------------------------------------

/// Bucket versioning configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersioningConfiguration {
    /// Versioning state; `None` for buckets that were never versioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BucketVersioningStatus>,
    /// MFA delete state.
    #[serde(rename = "MFADelete", skip_serializing_if = "Option::is_none")]
    pub mfa_delete: Option<MfaDeleteStatus>,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Expiration action of a lifecycle rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleExpiration {
    /// Date at which objects expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Days after creation at which objects expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i32>,
    /// Remove expired object delete markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_object_delete_marker: Option<bool>,
}

/// Transition action of a lifecycle rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transition {
    /// Date of the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Days after creation of the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i32>,
    /// Target storage class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<TransitionStorageClass>,
}

/// Transition action for noncurrent object versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionTransition {
    /// Days after becoming noncurrent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noncurrent_days: Option<i32>,
    /// Number of newer noncurrent versions to retain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newer_noncurrent_versions: Option<i32>,
    /// Target storage class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<TransitionStorageClass>,
}

/// Expiration action for noncurrent object versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionExpiration {
    /// Days after becoming noncurrent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noncurrent_days: Option<i32>,
    /// Number of newer noncurrent versions to retain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newer_noncurrent_versions: Option<i32>,
}

/// Abort action for incomplete multipart uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AbortIncompleteMultipartUpload {
    /// Days after initiation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_after_initiation: Option<i32>,
}

/// Conjunction of lifecycle filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRuleAndOperator {
    /// Key prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Tags that must all match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// Minimum object size in bytes (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_size_greater_than: Option<i64>,
    /// Maximum object size in bytes (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_size_less_than: Option<i64>,
}

/// Filter selecting the objects a lifecycle rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRuleFilter {
    /// Conjunction of predicates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub and: Option<LifecycleRuleAndOperator>,
    /// Key prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Single tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    /// Minimum object size in bytes (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_size_greater_than: Option<i64>,
    /// Maximum object size in bytes (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_size_less_than: Option<i64>,
}

/// A lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRule {
    /// Rule identifier.
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Legacy top-level prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Object filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<LifecycleRuleFilter>,
    /// Whether the rule is active.
    pub status: ExpirationStatus,
    /// Expiration action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<LifecycleExpiration>,
    /// Transition actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<Transition>,
    /// Noncurrent version transition actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub noncurrent_version_transitions: Vec<NoncurrentVersionTransition>,
    /// Noncurrent version expiration action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    /// Incomplete multipart upload cleanup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_incomplete_multipart_upload: Option<AbortIncompleteMultipartUpload>,
}

/// A bucket lifecycle configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleConfiguration {
    /// Rules of the configuration.
    #[serde(default)]
    pub rules: Vec<LifecycleRule>,
    /// Default minimum object size for transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_default_minimum_object_size: Option<TransitionDefaultMinimumObjectSize>,
}

// ---------------------------------------------------------------------------
// Replication
// ---------------------------------------------------------------------------

/// Conjunction of replication filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationRuleAndOperator {
    /// Key prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Tags that must all match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Filter selecting the objects a replication rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationRuleFilter {
    /// Conjunction of predicates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub and: Option<ReplicationRuleAndOperator>,
    /// Key prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Single tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
}

/// Replication of SSE-KMS encrypted objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SseKmsEncryptedObjects {
    /// Whether encrypted objects are replicated.
    pub status: SseKmsEncryptedObjectsStatus,
}

/// Replication of replica metadata changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicaModifications {
    /// Whether replica modifications are synced.
    pub status: ReplicaModificationsStatus,
}

/// Additional source object selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceSelectionCriteria {
    /// SSE-KMS object selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sse_kms_encrypted_objects: Option<SseKmsEncryptedObjects>,
    /// Replica modification selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_modifications: Option<ReplicaModifications>,
}

/// Replication of objects that existed before the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExistingObjectReplication {
    /// Whether existing objects are replicated.
    pub status: ExistingObjectReplicationStatus,
}

/// Delete marker replication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteMarkerReplication {
    /// Whether delete markers are replicated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeleteMarkerReplicationStatus>,
}

/// Replica ownership translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessControlTranslation {
    /// New replica owner.
    pub owner: OwnerOverride,
}

/// Replica encryption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionConfiguration {
    /// KMS key used for replicas.
    #[serde(rename = "ReplicaKmsKeyID", skip_serializing_if = "Option::is_none")]
    pub replica_kms_key_id: Option<String>,
}

/// A time value in minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationTimeValue {
    /// Minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i32>,
}

/// Replication Time Control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationTime {
    /// Whether RTC is enabled.
    pub status: ReplicationTimeStatus,
    /// Replication time threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<ReplicationTimeValue>,
}

/// Replication metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metrics {
    /// Whether metrics are enabled.
    pub status: MetricsStatus,
    /// Event threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_threshold: Option<ReplicationTimeValue>,
}

/// Destination of a replication rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Destination {
    /// Destination bucket ARN.
    pub bucket: String,
    /// Destination account ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Replica storage class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<StorageClass>,
    /// Replica ownership translation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_control_translation: Option<AccessControlTranslation>,
    /// Replica encryption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_configuration: Option<EncryptionConfiguration>,
    /// Replication Time Control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_time: Option<ReplicationTime>,
    /// Replication metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

/// A replication rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationRule {
    /// Rule identifier.
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Rule priority (filter-based rules only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Legacy prefix (prefix-based rules only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Object filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<ReplicationRuleFilter>,
    /// Whether the rule is active.
    pub status: ReplicationRuleStatus,
    /// Additional source selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_selection_criteria: Option<SourceSelectionCriteria>,
    /// Existing object replication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_object_replication: Option<ExistingObjectReplication>,
    /// Destination.
    pub destination: Destination,
    /// Delete marker replication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_marker_replication: Option<DeleteMarkerReplication>,
}

/// A bucket replication configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationConfiguration {
    /// IAM role assumed by S3 for replication.
    pub role: String,
    /// Rules of the configuration.
    #[serde(default)]
    pub rules: Vec<ReplicationRule>,
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

/// Default encryption applied to new objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionByDefault {
    /// Encryption algorithm.
    #[serde(rename = "SSEAlgorithm")]
    pub sse_algorithm: ServerSideEncryption,
    /// KMS key for `aws:kms` algorithms.
    #[serde(rename = "KMSMasterKeyID", skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<String>,
}

/// A server-side encryption rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionRule {
    /// Default encryption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_server_side_encryption_by_default: Option<ServerSideEncryptionByDefault>,
    /// Whether an S3 Bucket Key is used for SSE-KMS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_key_enabled: Option<bool>,
}

/// A bucket server-side encryption configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionConfiguration {
    /// Rules of the configuration.
    #[serde(default)]
    pub rules: Vec<ServerSideEncryptionRule>,
}

// ---------------------------------------------------------------------------
// Object lock
// ---------------------------------------------------------------------------

/// Default retention of an object lock rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefaultRetention {
    /// Retention mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ObjectLockRetentionMode>,
    /// Retention period in days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i32>,
    /// Retention period in years.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years: Option<i32>,
}

/// An object lock rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectLockRule {
    /// Default retention.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_retention: Option<DefaultRetention>,
}

/// A bucket object lock configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectLockConfiguration {
    /// Whether object lock is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_lock_enabled: Option<ObjectLockEnabled>,
    /// Default retention rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<ObjectLockRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_enum_wire_values() {
        assert_eq!("private".parse::<BucketCannedAcl>().unwrap(), BucketCannedAcl::Private);
        assert_eq!(
            "aws:kms".parse::<ServerSideEncryption>().unwrap(),
            ServerSideEncryption::AwsKms
        );
        assert_eq!(Permission::FullControl.to_string(), "FULL_CONTROL");
        assert!("bogus".parse::<Permission>().is_err());
        assert!(StorageClass::VALUES.contains(&"GLACIER_IR"));
    }

    #[test]
    fn test_should_serialize_routing_rules_in_pascal_case_without_nulls() {
        let rule = RoutingRule {
            condition: Some(Condition {
                key_prefix_equals: Some("docs/".to_owned()),
                ..Condition::default()
            }),
            redirect: Redirect {
                replace_key_prefix_with: Some("documents/".to_owned()),
                ..Redirect::default()
            },
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(
            json,
            r#"{"Condition":{"KeyPrefixEquals":"docs/"},"Redirect":{"ReplaceKeyPrefixWith":"documents/"}}"#
        );
    }

    #[test]
    fn test_should_deserialize_grantee_type() {
        let grantee: Grantee = serde_json::from_str(
            r#"{"Type":"Group","URI":"http://acs.amazonaws.com/groups/s3/LogDelivery"}"#,
        )
        .unwrap();
        assert_eq!(grantee.r#type, GranteeType::Group);
        assert!(grantee.id.is_none());
    }

    #[test]
    fn test_should_ignore_empty_expected_owner() {
        let target = BucketTarget::with_owner("b", Some(""));
        assert!(target.expected_bucket_owner.is_none());
        let target = BucketTarget::with_owner("b", Some("123456789012"));
        assert_eq!(target.expected_bucket_owner.as_deref(), Some("123456789012"));
    }
}
