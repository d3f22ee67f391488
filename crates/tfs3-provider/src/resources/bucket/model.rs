//! Configuration and state of `aws_s3_bucket`.
//!
//! The deprecated in-bucket sub-configurations are `Option<Vec<_>>` blocks:
//! `None` leaves the remote configuration unmanaged, an empty list removes
//! it, and a populated list replaces it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tfs3_model::types::{
    BucketAccelerateStatus, BucketCannedAcl, DeleteMarkerReplicationStatus, GranteeType,
    MetricsStatus, ObjectLockEnabled, ObjectLockRetentionMode, OwnerOverride, Payer, Permission,
    ReplicationRuleStatus, ReplicationTimeStatus, ServerSideEncryption, StorageClass,
    TransitionStorageClass,
};

/// An `aws_s3_bucket` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketModel {
    /// Bucket name; also the resource ID.
    pub id: String,
    /// Bucket name. Generated when unset.
    pub bucket: Option<String>,
    /// Prefix of a generated bucket name.
    pub bucket_prefix: Option<String>,
    /// Transfer acceleration status.
    pub acceleration_status: Option<BucketAccelerateStatus>,
    /// Canned ACL.
    pub acl: Option<BucketCannedAcl>,
    /// Explicit ACL grants.
    pub grant: Option<Vec<GrantModel>>,
    /// CORS rules.
    pub cors_rule: Option<Vec<CorsRuleModel>>,
    /// Lifecycle rules.
    pub lifecycle_rule: Option<Vec<LifecycleRuleModel>>,
    /// Access logging.
    pub logging: Option<Vec<LoggingModel>>,
    /// Object lock configuration.
    pub object_lock_configuration: Option<Vec<ObjectLockConfigurationModel>>,
    /// Whether the bucket was created with object lock.
    pub object_lock_enabled: Option<bool>,
    /// Bucket policy JSON.
    pub policy: Option<String>,
    /// Replication configuration.
    pub replication_configuration: Option<Vec<ReplicationConfigurationModel>>,
    /// Who pays for requests and transfer.
    pub request_payer: Option<Payer>,
    /// Default encryption.
    pub server_side_encryption_configuration: Option<Vec<SseConfigurationModel>>,
    /// Versioning.
    pub versioning: Option<Vec<VersioningModel>>,
    /// Static website hosting.
    pub website: Option<Vec<WebsiteModel>>,
    /// Delete every object version on destroy so the bucket can be removed.
    pub force_destroy: bool,
    /// Resource tags.
    pub tags: BTreeMap<String, String>,
    /// Resource tags merged over provider default tags.
    pub tags_all: BTreeMap<String, String>,

    // computed
    /// Bucket ARN.
    pub arn: String,
    /// `{bucket}.s3.{dnsSuffix}`.
    pub bucket_domain_name: String,
    /// `{bucket}.s3.{region}.{dnsSuffix}`.
    pub bucket_regional_domain_name: String,
    /// Route 53 hosted zone of the region's website endpoint.
    pub hosted_zone_id: Option<String>,
    /// Region the bucket lives in.
    pub region: String,
    /// Website endpoint, when website hosting is configured.
    pub website_endpoint: Option<String>,
    /// Website domain, when website hosting is configured.
    pub website_domain: Option<String>,
}

/// One ACL grantee with its permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantModel {
    /// Canonical user ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Grantee type.
    #[serde(rename = "type")]
    pub r#type: GranteeType,
    /// Group URI.
    #[serde(default)]
    pub uri: Option<String>,
    /// Granted permissions.
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CorsRuleModel {
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age_seconds: Option<i32>,
}

/// A lifecycle rule in the flat, deprecated shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleRuleModel {
    /// Rule ID. Generated when unset.
    pub id: Option<String>,
    /// Object key prefix.
    pub prefix: Option<String>,
    /// Objects must carry all of these tags.
    pub tags: BTreeMap<String, String>,
    /// Whether the rule is applied.
    pub enabled: bool,
    /// Days after initiation to abort incomplete multipart uploads.
    pub abort_incomplete_multipart_upload_days: Option<i32>,
    /// Current version expiration.
    pub expiration: Vec<LifecycleExpirationModel>,
    /// Noncurrent version expiration.
    pub noncurrent_version_expiration: Vec<NoncurrentVersionExpirationModel>,
    /// Noncurrent version transitions.
    pub noncurrent_version_transition: Vec<NoncurrentVersionTransitionModel>,
    /// Current version transitions.
    pub transition: Vec<TransitionModel>,
}

/// Lifecycle expiration; `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct LifecycleExpirationModel {
    pub date: Option<String>,
    pub days: Option<i32>,
    pub expired_object_delete_marker: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct NoncurrentVersionExpirationModel {
    pub days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct NoncurrentVersionTransitionModel {
    #[serde(default)]
    pub days: Option<i32>,
    pub storage_class: TransitionStorageClass,
}

/// Transition; `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TransitionModel {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub days: Option<i32>,
    pub storage_class: TransitionStorageClass,
}

/// Access log delivery target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct LoggingModel {
    pub target_bucket: String,
    pub target_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ObjectLockConfigurationModel {
    pub object_lock_enabled: Option<ObjectLockEnabled>,
    pub rule: Vec<ObjectLockRuleModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ObjectLockRuleModel {
    pub default_retention: Vec<DefaultRetentionModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DefaultRetentionModel {
    pub days: Option<i32>,
    pub mode: Option<ObjectLockRetentionMode>,
    pub years: Option<i32>,
}

/// Replication role and rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfigurationModel {
    /// IAM role S3 assumes to replicate objects.
    pub role: String,
    /// Replication rules.
    pub rules: Vec<ReplicationRuleModel>,
}

/// A replication rule. Rules with a `filter` use the V2 schema; rules
/// without one use the V1 `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ReplicationRuleModel {
    #[serde(default)]
    pub delete_marker_replication_status: Option<DeleteMarkerReplicationStatus>,
    #[serde(default)]
    pub destination: Vec<DestinationModel>,
    #[serde(default)]
    pub filter: Vec<ReplicationFilterModel>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub source_selection_criteria: Vec<SourceSelectionCriteriaModel>,
    pub status: ReplicationRuleStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DestinationModel {
    pub access_control_translation: Vec<AccessControlTranslationModel>,
    pub account_id: Option<String>,
    pub bucket: String,
    pub metrics: Vec<MetricsModel>,
    pub replica_kms_key_id: Option<String>,
    pub replication_time: Vec<ReplicationTimeModel>,
    pub storage_class: Option<StorageClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AccessControlTranslationModel {
    pub owner: OwnerOverride,
}

/// Replication metrics; `minutes` is the event threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct MetricsModel {
    #[serde(default = "default_replication_minutes")]
    pub minutes: i32,
    #[serde(default = "default_metrics_status")]
    pub status: MetricsStatus,
}

/// Replication Time Control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ReplicationTimeModel {
    #[serde(default = "default_replication_minutes")]
    pub minutes: i32,
    #[serde(default = "default_replication_time_status")]
    pub status: ReplicationTimeStatus,
}

fn default_replication_minutes() -> i32 {
    15
}

fn default_metrics_status() -> MetricsStatus {
    MetricsStatus::Enabled
}

fn default_replication_time_status() -> ReplicationTimeStatus {
    ReplicationTimeStatus::Enabled
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ReplicationFilterModel {
    pub prefix: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct SourceSelectionCriteriaModel {
    pub sse_kms_encrypted_objects: Vec<SseKmsEncryptedObjectsModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct SseKmsEncryptedObjectsModel {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct SseConfigurationModel {
    pub rule: Vec<SseRuleModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct SseRuleModel {
    pub apply_server_side_encryption_by_default: Vec<SseByDefaultModel>,
    pub bucket_key_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SseByDefaultModel {
    #[serde(default)]
    pub kms_master_key_id: Option<String>,
    pub sse_algorithm: ServerSideEncryption,
}

/// Versioning flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningModel {
    /// Versioning is enabled (otherwise suspended).
    pub enabled: bool,
    /// MFA delete is enabled.
    pub mfa_delete: bool,
}

/// Website hosting. `redirect_all_requests_to` is a host name or a URL;
/// `routing_rules` is a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct WebsiteModel {
    pub error_document: Option<String>,
    pub index_document: Option<String>,
    pub redirect_all_requests_to: Option<String>,
    pub routing_rules: Option<String>,
}
