//! S3 connections.
//!
//! [`S3Api`] is the narrow, typed surface of the S3 REST API that the
//! resources call. Two backends implement it:
//!
//! - [`SdkS3`]: the AWS SDK for Rust, talking to AWS or any S3-compatible
//!   endpoint
//! - [`InMemoryS3`]: an in-process store used by unit tests, with optional
//!   injected failures that reproduce S3's eventual-consistency races
//!
//! [`AwsClient`] bundles a connection with the provider-level settings every
//! resource needs: region, partition, account, tag rules and the propagation
//! timeout.

mod memory;
mod sdk;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tfs3_core::{AccountId, AwsRegion, Partition, ProviderConfig};
use tfs3_model::S3Result;
use tfs3_model::object::{
    BucketAclInput, CreateBucketInput, DeleteObjectInput, DeleteObjectOutput, DeleteObjectsError,
    ObjectContent, ObjectIdentifier, ObjectMetadata, ObjectRetention, ObjectVersionPage,
    PutObjectInput, PutObjectOutput,
};
use tfs3_model::types::{
    AccessControlPolicy, BucketAccelerateStatus, BucketTarget, CorsRule, LifecycleConfiguration,
    LoggingEnabled, ObjectCannedAcl, ObjectLockConfiguration, ObjectLockLegalHoldStatus, Payer,
    PublicAccessBlockConfiguration, ReplicationConfiguration, ServerSideEncryptionConfiguration,
    Tag, VersioningConfiguration, WebsiteConfiguration,
};

use crate::tags::{DefaultConfig, IgnoreConfig};

pub use memory::InMemoryS3;
pub use sdk::SdkS3;

/// The S3 operations used by the resources.
///
/// Missing sub-configurations are reported with the S3 error code S3 itself
/// uses (for example `NoSuchCORSConfiguration`), never as empty values, so
/// that callers can tell "absent" from "empty".
#[async_trait]
pub trait S3Api: std::fmt::Debug + Send + Sync {
    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    /// `HeadBucket`. A missing bucket is `NotFound` (HEAD responses carry no code).
    async fn head_bucket(&self, target: &BucketTarget) -> S3Result<()>;

    /// `CreateBucket`.
    async fn create_bucket(&self, input: &CreateBucketInput) -> S3Result<()>;

    /// `DeleteBucket`.
    async fn delete_bucket(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetBucketLocation`. Returns the raw location constraint (`""` for `us-east-1`).
    async fn get_bucket_location(&self, target: &BucketTarget) -> S3Result<String>;

    /// `GetBucketPolicy`.
    async fn get_bucket_policy(&self, target: &BucketTarget) -> S3Result<String>;

    /// `PutBucketPolicy`.
    async fn put_bucket_policy(&self, target: &BucketTarget, policy: &str) -> S3Result<()>;

    /// `DeleteBucketPolicy`.
    async fn delete_bucket_policy(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetBucketAcl`.
    async fn get_bucket_acl(&self, target: &BucketTarget) -> S3Result<AccessControlPolicy>;

    /// `PutBucketAcl`.
    async fn put_bucket_acl(&self, target: &BucketTarget, acl: &BucketAclInput) -> S3Result<()>;

    /// `GetBucketCors`.
    async fn get_bucket_cors(&self, target: &BucketTarget) -> S3Result<Vec<CorsRule>>;

    /// `PutBucketCors`.
    async fn put_bucket_cors(&self, target: &BucketTarget, rules: &[CorsRule]) -> S3Result<()>;

    /// `DeleteBucketCors`.
    async fn delete_bucket_cors(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetBucketWebsite`.
    async fn get_bucket_website(&self, target: &BucketTarget) -> S3Result<WebsiteConfiguration>;

    /// `PutBucketWebsite`.
    async fn put_bucket_website(
        &self,
        target: &BucketTarget,
        config: &WebsiteConfiguration,
    ) -> S3Result<()>;

    /// `DeleteBucketWebsite`.
    async fn delete_bucket_website(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetBucketVersioning`.
    async fn get_bucket_versioning(
        &self,
        target: &BucketTarget,
    ) -> S3Result<VersioningConfiguration>;

    /// `PutBucketVersioning`. `mfa` is `"{serial} {token}"`.
    async fn put_bucket_versioning(
        &self,
        target: &BucketTarget,
        config: &VersioningConfiguration,
        mfa: Option<&str>,
    ) -> S3Result<()>;

    /// `GetBucketAccelerateConfiguration`. `None` when never configured.
    async fn get_bucket_accelerate(
        &self,
        target: &BucketTarget,
    ) -> S3Result<Option<BucketAccelerateStatus>>;

    /// `PutBucketAccelerateConfiguration`.
    async fn put_bucket_accelerate(
        &self,
        target: &BucketTarget,
        status: BucketAccelerateStatus,
    ) -> S3Result<()>;

    /// `GetBucketRequestPayment`.
    async fn get_bucket_request_payment(&self, target: &BucketTarget) -> S3Result<Payer>;

    /// `PutBucketRequestPayment`.
    async fn put_bucket_request_payment(&self, target: &BucketTarget, payer: Payer)
    -> S3Result<()>;

    /// `GetBucketLogging`. `None` when logging is disabled.
    async fn get_bucket_logging(&self, target: &BucketTarget) -> S3Result<Option<LoggingEnabled>>;

    /// `PutBucketLogging`. `None` disables logging.
    async fn put_bucket_logging(
        &self,
        target: &BucketTarget,
        logging: Option<&LoggingEnabled>,
    ) -> S3Result<()>;

    /// `GetBucketLifecycleConfiguration`.
    async fn get_bucket_lifecycle(&self, target: &BucketTarget)
    -> S3Result<LifecycleConfiguration>;

    /// `PutBucketLifecycleConfiguration`.
    async fn put_bucket_lifecycle(
        &self,
        target: &BucketTarget,
        config: &LifecycleConfiguration,
    ) -> S3Result<()>;

    /// `DeleteBucketLifecycle`.
    async fn delete_bucket_lifecycle(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetBucketReplication`.
    async fn get_bucket_replication(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ReplicationConfiguration>;

    /// `PutBucketReplication`.
    async fn put_bucket_replication(
        &self,
        target: &BucketTarget,
        config: &ReplicationConfiguration,
        token: Option<&str>,
    ) -> S3Result<()>;

    /// `DeleteBucketReplication`.
    async fn delete_bucket_replication(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetBucketEncryption`.
    async fn get_bucket_encryption(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ServerSideEncryptionConfiguration>;

    /// `PutBucketEncryption`.
    async fn put_bucket_encryption(
        &self,
        target: &BucketTarget,
        config: &ServerSideEncryptionConfiguration,
    ) -> S3Result<()>;

    /// `DeleteBucketEncryption`.
    async fn delete_bucket_encryption(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetObjectLockConfiguration`.
    async fn get_object_lock_configuration(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ObjectLockConfiguration>;

    /// `PutObjectLockConfiguration`.
    async fn put_object_lock_configuration(
        &self,
        target: &BucketTarget,
        config: &ObjectLockConfiguration,
        token: Option<&str>,
    ) -> S3Result<()>;

    /// `GetPublicAccessBlock`.
    async fn get_public_access_block(
        &self,
        target: &BucketTarget,
    ) -> S3Result<PublicAccessBlockConfiguration>;

    /// `PutPublicAccessBlock`.
    async fn put_public_access_block(
        &self,
        target: &BucketTarget,
        config: &PublicAccessBlockConfiguration,
    ) -> S3Result<()>;

    /// `DeletePublicAccessBlock`.
    async fn delete_public_access_block(&self, target: &BucketTarget) -> S3Result<()>;

    /// `GetBucketTagging`.
    async fn get_bucket_tagging(&self, target: &BucketTarget) -> S3Result<Vec<Tag>>;

    /// `PutBucketTagging`.
    async fn put_bucket_tagging(&self, target: &BucketTarget, tags: &[Tag]) -> S3Result<()>;

    /// `DeleteBucketTagging`.
    async fn delete_bucket_tagging(&self, target: &BucketTarget) -> S3Result<()>;

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// `PutObject`.
    async fn put_object(&self, input: &PutObjectInput) -> S3Result<PutObjectOutput>;

    /// `HeadObject` with checksum mode enabled. A missing object is `NotFound`.
    async fn head_object(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<ObjectMetadata>;

    /// `GetObject`.
    async fn get_object(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<ObjectContent>;

    /// `DeleteObject`.
    async fn delete_object(
        &self,
        target: &BucketTarget,
        input: &DeleteObjectInput,
    ) -> S3Result<DeleteObjectOutput>;

    /// `DeleteObjects`. Returns the per-key failures.
    async fn delete_objects(
        &self,
        target: &BucketTarget,
        objects: &[ObjectIdentifier],
        bypass_governance_retention: bool,
    ) -> S3Result<Vec<DeleteObjectsError>>;

    /// `ListObjectVersions`, one page.
    async fn list_object_versions(
        &self,
        target: &BucketTarget,
        prefix: Option<&str>,
        key_marker: Option<&str>,
        version_id_marker: Option<&str>,
    ) -> S3Result<ObjectVersionPage>;

    /// `GetObjectTagging`.
    async fn get_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<Vec<Tag>>;

    /// `PutObjectTagging`.
    async fn put_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        tags: &[Tag],
    ) -> S3Result<()>;

    /// `DeleteObjectTagging`.
    async fn delete_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<()>;

    /// `PutObjectAcl` with a canned ACL.
    async fn put_object_acl(
        &self,
        target: &BucketTarget,
        key: &str,
        acl: ObjectCannedAcl,
    ) -> S3Result<()>;

    /// `PutObjectLegalHold`.
    async fn put_object_legal_hold(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        status: ObjectLockLegalHoldStatus,
    ) -> S3Result<()>;

    /// `PutObjectRetention`.
    async fn put_object_retention(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        retention: &ObjectRetention,
        bypass_governance_retention: bool,
    ) -> S3Result<()>;
}

/// A connection plus the provider-level settings shared by all resources.
#[derive(Debug, Clone)]
pub struct AwsClient {
    conn: Arc<dyn S3Api>,
    region: AwsRegion,
    partition: Partition,
    account_id: AccountId,
    default_tags: DefaultConfig,
    ignore_tags: IgnoreConfig,
    propagation_timeout: Duration,
}

impl AwsClient {
    /// Bundle an existing connection with the provider configuration.
    #[must_use]
    pub fn new(config: &ProviderConfig, conn: Arc<dyn S3Api>) -> Self {
        Self {
            conn,
            partition: config.region.partition(),
            region: config.region.clone(),
            account_id: config.account_id.clone(),
            default_tags: DefaultConfig::from_config(config),
            ignore_tags: IgnoreConfig::from_config(config),
            propagation_timeout: config.propagation_timeout(),
        }
    }

    /// Connect to S3 through the AWS SDK.
    pub async fn connect(config: &ProviderConfig) -> Self {
        let conn = SdkS3::connect(config).await;
        Self::new(config, Arc::new(conn))
    }

    /// Connect to a fresh in-memory S3.
    #[must_use]
    pub fn in_memory(config: &ProviderConfig) -> Self {
        Self::new(config, Arc::new(InMemoryS3::new(config.region.as_str())))
    }

    /// The S3 connection.
    #[must_use]
    pub fn conn(&self) -> &dyn S3Api {
        self.conn.as_ref()
    }

    /// The configured region.
    #[must_use]
    pub fn region(&self) -> &str {
        self.region.as_str()
    }

    /// The partition of the configured region.
    #[must_use]
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// The configured account ID.
    #[must_use]
    pub fn account_id(&self) -> &str {
        self.account_id.as_str()
    }

    /// The DNS suffix of the partition.
    #[must_use]
    pub fn dns_suffix(&self) -> &'static str {
        self.partition.dns_suffix()
    }

    /// `{prefix}.{dns_suffix}`.
    #[must_use]
    pub fn partition_hostname(&self, prefix: &str) -> String {
        format!("{prefix}.{}", self.dns_suffix())
    }

    /// Provider default tags.
    #[must_use]
    pub fn default_tags(&self) -> &DefaultConfig {
        &self.default_tags
    }

    /// Provider tag-ignore rules.
    #[must_use]
    pub fn ignore_tags(&self) -> &IgnoreConfig {
        &self.ignore_tags
    }

    /// Upper bound for waiting on S3 eventual consistency.
    #[must_use]
    pub fn propagation_timeout(&self) -> Duration {
        self.propagation_timeout
    }

    /// Override the propagation timeout.
    #[must_use]
    pub fn with_propagation_timeout(mut self, timeout: Duration) -> Self {
        self.propagation_timeout = timeout;
        self
    }
}
