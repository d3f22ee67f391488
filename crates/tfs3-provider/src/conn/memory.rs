//! In-memory S3 backend.
//!
//! Buckets live in a `DashMap`; every configuration of a bucket sits behind
//! its own `parking_lot::RwLock`, mirroring how S3 stores sub-resources
//! independently. Objects keep their full version history (newest last) so
//! that versioning, delete markers and object lock behave like S3.
//!
//! Tests can inject failures per operation to reproduce eventual-consistency
//! races (for example `NotFound` from `head_bucket` right after creation),
//! and inspect the sequence of operations that reached the backend.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use md5::{Digest, Md5};
use parking_lot::{Mutex, RwLock};
use sha1::Sha1;
use sha2::Sha256;
use tfs3_model::object::{
    BucketAclInput, CreateBucketInput, DeleteObjectInput, DeleteObjectOutput, DeleteObjectsError,
    ObjectChecksums, ObjectContent, ObjectHeaders, ObjectIdentifier, ObjectLockSettings, ObjectMetadata,
    ObjectRetention, ObjectVersion, ObjectVersionPage, PutObjectInput, PutObjectOutput,
};
use tfs3_model::types::{
    AccessControlPolicy, BucketAccelerateStatus, BucketCannedAcl, BucketTarget,
    BucketVersioningStatus, ChecksumAlgorithm, CorsRule, Grant, Grantee, GranteeType, LifecycleConfiguration,
    LoggingEnabled, ObjectCannedAcl, ObjectLockConfiguration, ObjectLockEnabled,
    ObjectLockLegalHoldStatus, ObjectLockRetentionMode, Owner, Payer, Permission,
    PublicAccessBlockConfiguration, ReplicationConfiguration, ServerSideEncryption,
    ServerSideEncryptionByDefault, ServerSideEncryptionConfiguration, ServerSideEncryptionRule,
    StorageClass, Tag, TransitionDefaultMinimumObjectSize, VersioningConfiguration,
    WebsiteConfiguration,
};
use tfs3_model::{S3Error, S3ErrorCode, S3Result};
use tracing::debug;

use super::S3Api;

/// Canonical user ID of the in-memory account.
const OWNER_CANONICAL_ID: &str = "75aa57f09aa0c8caeab4f8c24e99d10f8e7faeebf76c078efc7c6caea54ba06a";
/// Account ID of the in-memory account.
const OWNER_ACCOUNT_ID: &str = "000000000000";
/// Version ID S3 reports for objects written while versioning was off.
const NULL_VERSION_ID: &str = "null";

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";
const LOG_DELIVERY_URI: &str = "http://acs.amazonaws.com/groups/s3/LogDelivery";

/// Default `ListObjectVersions` page size.
const DEFAULT_PAGE_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Stored state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredVersion {
    version_id: String,
    is_delete_marker: bool,
    body: Bytes,
    etag: String,
    headers: ObjectHeaders,
    storage_class: Option<StorageClass>,
    server_side_encryption: Option<ServerSideEncryption>,
    kms_key_id: Option<String>,
    bucket_key_enabled: Option<bool>,
    tags: Vec<Tag>,
    acl: ObjectCannedAcl,
    object_lock: ObjectLockSettings,
    checksums: ObjectChecksums,
    last_modified: DateTime<Utc>,
}

impl StoredVersion {
    fn delete_marker(version_id: String) -> Self {
        Self {
            version_id,
            is_delete_marker: true,
            body: Bytes::new(),
            etag: String::new(),
            headers: ObjectHeaders::default(),
            storage_class: None,
            server_side_encryption: None,
            kms_key_id: None,
            bucket_key_enabled: None,
            tags: Vec::new(),
            acl: ObjectCannedAcl::Private,
            object_lock: ObjectLockSettings::default(),
            checksums: ObjectChecksums::default(),
            last_modified: Utc::now(),
        }
    }

    fn metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            headers: self.headers.clone(),
            etag: Some(self.etag.clone()),
            version_id: Some(self.version_id.clone()),
            content_length: i64::try_from(self.body.len()).unwrap_or(i64::MAX),
            last_modified: Some(self.last_modified),
            storage_class: self.storage_class,
            server_side_encryption: self.server_side_encryption,
            kms_key_id: self.kms_key_id.clone(),
            bucket_key_enabled: self.bucket_key_enabled,
            object_lock: self.object_lock.clone(),
            checksums: self.checksums.clone(),
        }
    }

    /// Whether object lock currently prevents deleting this version.
    fn is_locked(&self, bypass_governance: bool, now: DateTime<Utc>) -> bool {
        if self.object_lock.legal_hold_status == Some(ObjectLockLegalHoldStatus::On) {
            return true;
        }
        let retained = self.object_lock.retain_until_date.is_some_and(|until| until > now);
        match self.object_lock.mode {
            Some(ObjectLockRetentionMode::Compliance) => retained,
            Some(ObjectLockRetentionMode::Governance) => retained && !bypass_governance,
            None => false,
        }
    }
}

struct MemBucket {
    location_constraint: String,
    created: DateTime<Utc>,
    object_lock_enabled: RwLock<bool>,
    policy: RwLock<Option<String>>,
    acl: RwLock<AccessControlPolicy>,
    cors: RwLock<Option<Vec<CorsRule>>>,
    website: RwLock<Option<WebsiteConfiguration>>,
    versioning: RwLock<VersioningConfiguration>,
    accelerate: RwLock<Option<BucketAccelerateStatus>>,
    request_payer: RwLock<Payer>,
    logging: RwLock<Option<LoggingEnabled>>,
    lifecycle: RwLock<Option<LifecycleConfiguration>>,
    replication: RwLock<Option<ReplicationConfiguration>>,
    encryption: RwLock<ServerSideEncryptionConfiguration>,
    object_lock: RwLock<Option<ObjectLockConfiguration>>,
    public_access_block: RwLock<Option<PublicAccessBlockConfiguration>>,
    tags: RwLock<Option<Vec<Tag>>>,
    objects: RwLock<BTreeMap<String, Vec<StoredVersion>>>,
}

impl std::fmt::Debug for MemBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemBucket")
            .field("location_constraint", &self.location_constraint)
            .field("created", &self.created)
            .field("object_count", &self.objects.read().len())
            .finish_non_exhaustive()
    }
}

impl MemBucket {
    fn new(location_constraint: String, object_lock_enabled: bool) -> Self {
        Self {
            location_constraint,
            created: Utc::now(),
            object_lock_enabled: RwLock::new(object_lock_enabled),
            policy: RwLock::new(None),
            acl: RwLock::new(canned_bucket_acl(BucketCannedAcl::Private)),
            cors: RwLock::new(None),
            website: RwLock::new(None),
            versioning: RwLock::new(VersioningConfiguration {
                status: object_lock_enabled.then_some(BucketVersioningStatus::Enabled),
                mfa_delete: None,
            }),
            accelerate: RwLock::new(None),
            request_payer: RwLock::new(Payer::BucketOwner),
            logging: RwLock::new(None),
            lifecycle: RwLock::new(None),
            replication: RwLock::new(None),
            encryption: RwLock::new(default_encryption()),
            object_lock: RwLock::new(None),
            public_access_block: RwLock::new(None),
            tags: RwLock::new(None),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    fn versioning_status(&self) -> Option<BucketVersioningStatus> {
        self.versioning.read().status
    }
}

fn owner() -> Owner {
    Owner {
        display_name: Some("tfs3".to_owned()),
        id: Some(OWNER_CANONICAL_ID.to_owned()),
    }
}

fn owner_grant(permission: Permission) -> Grant {
    Grant {
        grantee: Grantee {
            display_name: Some("tfs3".to_owned()),
            email_address: None,
            id: Some(OWNER_CANONICAL_ID.to_owned()),
            r#type: GranteeType::CanonicalUser,
            uri: None,
        },
        permission,
    }
}

fn group_grant(uri: &str, permission: Permission) -> Grant {
    Grant {
        grantee: Grantee {
            display_name: None,
            email_address: None,
            id: None,
            r#type: GranteeType::Group,
            uri: Some(uri.to_owned()),
        },
        permission,
    }
}

/// The grants S3 derives from a canned bucket ACL.
fn canned_bucket_acl(acl: BucketCannedAcl) -> AccessControlPolicy {
    let mut grants = vec![owner_grant(Permission::FullControl)];
    match acl {
        BucketCannedAcl::Private => {}
        BucketCannedAcl::PublicRead => grants.push(group_grant(ALL_USERS_URI, Permission::Read)),
        BucketCannedAcl::PublicReadWrite => {
            grants.push(group_grant(ALL_USERS_URI, Permission::Read));
            grants.push(group_grant(ALL_USERS_URI, Permission::Write));
        }
        BucketCannedAcl::AuthenticatedRead => {
            grants.push(group_grant(AUTHENTICATED_USERS_URI, Permission::Read));
        }
        BucketCannedAcl::LogDeliveryWrite => {
            grants.push(group_grant(LOG_DELIVERY_URI, Permission::Write));
            grants.push(group_grant(LOG_DELIVERY_URI, Permission::ReadAcp));
        }
    }
    AccessControlPolicy {
        grants,
        owner: Some(owner()),
    }
}

fn default_encryption() -> ServerSideEncryptionConfiguration {
    ServerSideEncryptionConfiguration {
        rules: vec![ServerSideEncryptionRule {
            apply_server_side_encryption_by_default: Some(ServerSideEncryptionByDefault {
                sse_algorithm: ServerSideEncryption::Aes256,
                kms_master_key_id: None,
            }),
            bucket_key_enabled: Some(false),
        }],
    }
}

fn etag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(body)))
}

/// The additional checksum S3 stores for `algorithm`, base64 encoded.
fn checksums(algorithm: Option<ChecksumAlgorithm>, body: &[u8]) -> ObjectChecksums {
    let mut out = ObjectChecksums::default();
    match algorithm {
        Some(ChecksumAlgorithm::Crc32) => {
            out.crc32 = Some(BASE64.encode(crc32fast::hash(body).to_be_bytes()));
        }
        Some(ChecksumAlgorithm::Crc32c) => {
            out.crc32c = Some(BASE64.encode(crc32c::crc32c(body).to_be_bytes()));
        }
        Some(ChecksumAlgorithm::Sha1) => out.sha1 = Some(BASE64.encode(Sha1::digest(body))),
        Some(ChecksumAlgorithm::Sha256) => out.sha256 = Some(BASE64.encode(Sha256::digest(body))),
        None => {}
    }
    out
}

fn parse_tagging(tagging: Option<&str>) -> Vec<Tag> {
    tagging
        .map(|t| {
            form_urlencoded::parse(t.as_bytes())
                .map(|(k, v)| Tag::new(k, v))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// InMemoryS3
// ---------------------------------------------------------------------------

/// An in-process S3 for tests and dry runs.
pub struct InMemoryS3 {
    region: String,
    buckets: DashMap<String, MemBucket>,
    faults: Mutex<HashMap<&'static str, VecDeque<S3ErrorCode>>>,
    calls: Mutex<Vec<&'static str>>,
    page_size: usize,
}

impl std::fmt::Debug for InMemoryS3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryS3")
            .field("region", &self.region)
            .field("bucket_count", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryS3 {
    /// Create an empty store whose endpoint lives in `region`.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            buckets: DashMap::new(),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Limit `ListObjectVersions` pages to `page_size` entries.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail the next `times` calls of `operation` with `code`.
    ///
    /// `operation` is the trait method name, e.g. `"head_bucket"`.
    pub fn inject_failure(&self, operation: &'static str, code: S3ErrorCode, times: usize) {
        let mut faults = self.faults.lock();
        let queue = faults.entry(operation).or_default();
        queue.extend(std::iter::repeat_n(code, times));
    }

    /// Names of the operations called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// Whether a bucket exists.
    #[must_use]
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.contains_key(bucket)
    }

    /// Number of stored versions and delete markers in a bucket.
    #[must_use]
    pub fn version_count(&self, bucket: &str) -> usize {
        self.buckets
            .get(bucket)
            .map(|b| b.objects.read().values().map(Vec::len).sum())
            .unwrap_or_default()
    }

    /// Record the call and return an injected failure, if any.
    fn enter(&self, operation: &'static str) -> S3Result<()> {
        self.calls.lock().push(operation);
        let injected = self
            .faults
            .lock()
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(code) => {
                debug!(operation, code = %code, "injected failure");
                Err(S3Error::new(code))
            }
            None => Ok(()),
        }
    }

    fn bucket(&self, target: &BucketTarget) -> S3Result<Ref<'_, String, MemBucket>> {
        if let Some(owner) = &target.expected_bucket_owner {
            if owner != OWNER_ACCOUNT_ID {
                return Err(S3Error::access_denied(&target.bucket));
            }
        }
        self.buckets
            .get(&target.bucket)
            .ok_or_else(|| S3Error::no_such_bucket(&target.bucket))
    }

    fn require_object_lock(bucket: &MemBucket) -> S3Result<()> {
        if *bucket.object_lock_enabled.read() {
            Ok(())
        } else {
            Err(S3Error::invalid_request(
                "Bucket is missing Object Lock Configuration",
            ))
        }
    }

    fn with_version<T>(
        bucket: &MemBucket,
        key: &str,
        version_id: Option<&str>,
        f: impl FnOnce(&mut StoredVersion) -> S3Result<T>,
    ) -> S3Result<T> {
        let mut objects = bucket.objects.write();
        let versions = objects
            .get_mut(key)
            .ok_or_else(|| S3Error::no_such_key(key))?;
        let version = match version_id {
            Some(id) => versions
                .iter_mut()
                .find(|v| v.version_id == id)
                .ok_or_else(|| S3Error::new(S3ErrorCode::NoSuchVersion).with_resource(key))?,
            None => versions
                .last_mut()
                .filter(|v| !v.is_delete_marker)
                .ok_or_else(|| S3Error::no_such_key(key))?,
        };
        f(version)
    }

    fn find_version(
        bucket: &MemBucket,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<StoredVersion> {
        Self::with_version(bucket, key, version_id, |v| Ok(v.clone()))
    }

    fn new_version_id(bucket: &MemBucket) -> String {
        match bucket.versioning_status() {
            Some(BucketVersioningStatus::Enabled) => uuid::Uuid::new_v4().simple().to_string(),
            _ => NULL_VERSION_ID.to_owned(),
        }
    }

    /// Append a version, replacing an existing `null` version as S3 does.
    fn store_version(bucket: &MemBucket, key: &str, version: StoredVersion) {
        let mut objects = bucket.objects.write();
        let versions = objects.entry(key.to_owned()).or_default();
        if version.version_id == NULL_VERSION_ID {
            versions.retain(|v| v.version_id != NULL_VERSION_ID);
        }
        versions.push(version);
    }
}

fn not_found(resource: &str) -> S3Error {
    S3Error::new(S3ErrorCode::NotFound).with_resource(resource)
}

fn missing<T>(value: Option<T>, code: S3ErrorCode, bucket: &str) -> S3Result<T> {
    value.ok_or_else(|| S3Error::new(code).with_resource(bucket))
}

#[async_trait]
impl S3Api for InMemoryS3 {
    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    async fn head_bucket(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("head_bucket")?;
        self.bucket(target).map(|_| ()).map_err(|e| {
            if e.code == S3ErrorCode::NoSuchBucket {
                not_found(&target.bucket)
            } else {
                e
            }
        })
    }

    async fn create_bucket(&self, input: &CreateBucketInput) -> S3Result<()> {
        self.enter("create_bucket")?;
        if self.buckets.contains_key(&input.bucket) {
            return Err(S3Error::bucket_already_owned_by_you(&input.bucket));
        }
        let constraint = input.location_constraint.clone().unwrap_or_default();
        let bucket = MemBucket::new(constraint, input.object_lock_enabled);
        if let Some(acl) = input.acl {
            *bucket.acl.write() = canned_bucket_acl(acl);
        }
        self.buckets.insert(input.bucket.clone(), bucket);
        debug!(bucket = %input.bucket, "bucket created");
        Ok(())
    }

    async fn delete_bucket(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket")?;
        {
            let bucket = self.bucket(target)?;
            if !bucket.objects.read().is_empty() {
                return Err(S3Error::bucket_not_empty(&target.bucket));
            }
        }
        self.buckets.remove(&target.bucket);
        debug!(bucket = %target.bucket, "bucket deleted");
        Ok(())
    }

    async fn get_bucket_location(&self, target: &BucketTarget) -> S3Result<String> {
        self.enter("get_bucket_location")?;
        Ok(self.bucket(target)?.location_constraint.clone())
    }

    async fn get_bucket_policy(&self, target: &BucketTarget) -> S3Result<String> {
        self.enter("get_bucket_policy")?;
        let policy = self.bucket(target)?.policy.read().clone();
        missing(policy, S3ErrorCode::NoSuchBucketPolicy, &target.bucket)
    }

    async fn put_bucket_policy(&self, target: &BucketTarget, policy: &str) -> S3Result<()> {
        self.enter("put_bucket_policy")?;
        let bucket = self.bucket(target)?;
        if serde_json::from_str::<serde_json::Value>(policy).is_err() {
            return Err(S3Error::new(S3ErrorCode::MalformedPolicy));
        }
        *bucket.policy.write() = Some(policy.to_owned());
        Ok(())
    }

    async fn delete_bucket_policy(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket_policy")?;
        *self.bucket(target)?.policy.write() = None;
        Ok(())
    }

    async fn get_bucket_acl(&self, target: &BucketTarget) -> S3Result<AccessControlPolicy> {
        self.enter("get_bucket_acl")?;
        Ok(self.bucket(target)?.acl.read().clone())
    }

    async fn put_bucket_acl(&self, target: &BucketTarget, acl: &BucketAclInput) -> S3Result<()> {
        self.enter("put_bucket_acl")?;
        let bucket = self.bucket(target)?;
        *bucket.acl.write() = match acl {
            BucketAclInput::Canned(canned) => canned_bucket_acl(*canned),
            BucketAclInput::Policy(policy) => AccessControlPolicy {
                grants: policy.grants.clone(),
                owner: policy.owner.clone().or_else(|| Some(owner())),
            },
        };
        Ok(())
    }

    async fn get_bucket_cors(&self, target: &BucketTarget) -> S3Result<Vec<CorsRule>> {
        self.enter("get_bucket_cors")?;
        let cors = self.bucket(target)?.cors.read().clone();
        missing(cors, S3ErrorCode::NoSuchCORSConfiguration, &target.bucket)
    }

    async fn put_bucket_cors(&self, target: &BucketTarget, rules: &[CorsRule]) -> S3Result<()> {
        self.enter("put_bucket_cors")?;
        *self.bucket(target)?.cors.write() = Some(rules.to_vec());
        Ok(())
    }

    async fn delete_bucket_cors(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket_cors")?;
        *self.bucket(target)?.cors.write() = None;
        Ok(())
    }

    async fn get_bucket_website(&self, target: &BucketTarget) -> S3Result<WebsiteConfiguration> {
        self.enter("get_bucket_website")?;
        let website = self.bucket(target)?.website.read().clone();
        missing(website, S3ErrorCode::NoSuchWebsiteConfiguration, &target.bucket)
    }

    async fn put_bucket_website(
        &self,
        target: &BucketTarget,
        config: &WebsiteConfiguration,
    ) -> S3Result<()> {
        self.enter("put_bucket_website")?;
        *self.bucket(target)?.website.write() = Some(config.clone());
        Ok(())
    }

    async fn delete_bucket_website(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket_website")?;
        *self.bucket(target)?.website.write() = None;
        Ok(())
    }

    async fn get_bucket_versioning(
        &self,
        target: &BucketTarget,
    ) -> S3Result<VersioningConfiguration> {
        self.enter("get_bucket_versioning")?;
        Ok(*self.bucket(target)?.versioning.read())
    }

    async fn put_bucket_versioning(
        &self,
        target: &BucketTarget,
        config: &VersioningConfiguration,
        _mfa: Option<&str>,
    ) -> S3Result<()> {
        self.enter("put_bucket_versioning")?;
        let bucket = self.bucket(target)?;
        if *bucket.object_lock_enabled.read()
            && config.status == Some(BucketVersioningStatus::Suspended)
        {
            return Err(S3Error::with_message(
                S3ErrorCode::InvalidBucketState,
                "An Object Lock configuration is present on this bucket, so the versioning state cannot be changed.",
            ));
        }
        let mut versioning = bucket.versioning.write();
        if config.status.is_some() {
            versioning.status = config.status;
        }
        if config.mfa_delete.is_some() {
            versioning.mfa_delete = config.mfa_delete;
        }
        Ok(())
    }

    async fn get_bucket_accelerate(
        &self,
        target: &BucketTarget,
    ) -> S3Result<Option<BucketAccelerateStatus>> {
        self.enter("get_bucket_accelerate")?;
        Ok(*self.bucket(target)?.accelerate.read())
    }

    async fn put_bucket_accelerate(
        &self,
        target: &BucketTarget,
        status: BucketAccelerateStatus,
    ) -> S3Result<()> {
        self.enter("put_bucket_accelerate")?;
        *self.bucket(target)?.accelerate.write() = Some(status);
        Ok(())
    }

    async fn get_bucket_request_payment(&self, target: &BucketTarget) -> S3Result<Payer> {
        self.enter("get_bucket_request_payment")?;
        Ok(*self.bucket(target)?.request_payer.read())
    }

    async fn put_bucket_request_payment(
        &self,
        target: &BucketTarget,
        payer: Payer,
    ) -> S3Result<()> {
        self.enter("put_bucket_request_payment")?;
        *self.bucket(target)?.request_payer.write() = payer;
        Ok(())
    }

    async fn get_bucket_logging(&self, target: &BucketTarget) -> S3Result<Option<LoggingEnabled>> {
        self.enter("get_bucket_logging")?;
        Ok(self.bucket(target)?.logging.read().clone())
    }

    async fn put_bucket_logging(
        &self,
        target: &BucketTarget,
        logging: Option<&LoggingEnabled>,
    ) -> S3Result<()> {
        self.enter("put_bucket_logging")?;
        *self.bucket(target)?.logging.write() = logging.cloned();
        Ok(())
    }

    async fn get_bucket_lifecycle(
        &self,
        target: &BucketTarget,
    ) -> S3Result<LifecycleConfiguration> {
        self.enter("get_bucket_lifecycle")?;
        let lifecycle = self.bucket(target)?.lifecycle.read().clone();
        missing(lifecycle, S3ErrorCode::NoSuchLifecycleConfiguration, &target.bucket)
    }

    async fn put_bucket_lifecycle(
        &self,
        target: &BucketTarget,
        config: &LifecycleConfiguration,
    ) -> S3Result<()> {
        self.enter("put_bucket_lifecycle")?;
        let bucket = self.bucket(target)?;
        let mut stored = config.clone();
        if stored.transition_default_minimum_object_size.is_none() {
            stored.transition_default_minimum_object_size =
                Some(TransitionDefaultMinimumObjectSize::AllStorageClasses128K);
        }
        *bucket.lifecycle.write() = Some(stored);
        Ok(())
    }

    async fn delete_bucket_lifecycle(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket_lifecycle")?;
        *self.bucket(target)?.lifecycle.write() = None;
        Ok(())
    }

    async fn get_bucket_replication(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ReplicationConfiguration> {
        self.enter("get_bucket_replication")?;
        let replication = self.bucket(target)?.replication.read().clone();
        missing(
            replication,
            S3ErrorCode::ReplicationConfigurationNotFoundError,
            &target.bucket,
        )
    }

    async fn put_bucket_replication(
        &self,
        target: &BucketTarget,
        config: &ReplicationConfiguration,
        _token: Option<&str>,
    ) -> S3Result<()> {
        self.enter("put_bucket_replication")?;
        let bucket = self.bucket(target)?;
        if bucket.versioning_status() != Some(BucketVersioningStatus::Enabled) {
            return Err(S3Error::invalid_request(
                "Versioning must be 'Enabled' on the bucket to apply a replication configuration",
            ));
        }
        *bucket.replication.write() = Some(config.clone());
        Ok(())
    }

    async fn delete_bucket_replication(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket_replication")?;
        *self.bucket(target)?.replication.write() = None;
        Ok(())
    }

    async fn get_bucket_encryption(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ServerSideEncryptionConfiguration> {
        self.enter("get_bucket_encryption")?;
        Ok(self.bucket(target)?.encryption.read().clone())
    }

    async fn put_bucket_encryption(
        &self,
        target: &BucketTarget,
        config: &ServerSideEncryptionConfiguration,
    ) -> S3Result<()> {
        self.enter("put_bucket_encryption")?;
        *self.bucket(target)?.encryption.write() = config.clone();
        Ok(())
    }

    async fn delete_bucket_encryption(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket_encryption")?;
        *self.bucket(target)?.encryption.write() = default_encryption();
        Ok(())
    }

    async fn get_object_lock_configuration(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ObjectLockConfiguration> {
        self.enter("get_object_lock_configuration")?;
        let bucket = self.bucket(target)?;
        if !*bucket.object_lock_enabled.read() {
            return Err(S3Error::new(S3ErrorCode::ObjectLockConfigurationNotFoundError)
                .with_resource(&target.bucket));
        }
        let config = bucket.object_lock.read().clone();
        Ok(config.unwrap_or(ObjectLockConfiguration {
            object_lock_enabled: Some(ObjectLockEnabled::Enabled),
            rule: None,
        }))
    }

    async fn put_object_lock_configuration(
        &self,
        target: &BucketTarget,
        config: &ObjectLockConfiguration,
        _token: Option<&str>,
    ) -> S3Result<()> {
        self.enter("put_object_lock_configuration")?;
        let bucket = self.bucket(target)?;
        if !*bucket.object_lock_enabled.read() {
            if bucket.versioning_status() != Some(BucketVersioningStatus::Enabled) {
                return Err(S3Error::with_message(
                    S3ErrorCode::InvalidBucketState,
                    "Versioning must be 'Enabled' on the bucket to apply a Object Lock configuration",
                ));
            }
            *bucket.object_lock_enabled.write() = true;
        }
        *bucket.object_lock.write() = Some(config.clone());
        Ok(())
    }

    async fn get_public_access_block(
        &self,
        target: &BucketTarget,
    ) -> S3Result<PublicAccessBlockConfiguration> {
        self.enter("get_public_access_block")?;
        let config = *self.bucket(target)?.public_access_block.read();
        missing(
            config,
            S3ErrorCode::NoSuchPublicAccessBlockConfiguration,
            &target.bucket,
        )
    }

    async fn put_public_access_block(
        &self,
        target: &BucketTarget,
        config: &PublicAccessBlockConfiguration,
    ) -> S3Result<()> {
        self.enter("put_public_access_block")?;
        *self.bucket(target)?.public_access_block.write() = Some(*config);
        Ok(())
    }

    async fn delete_public_access_block(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_public_access_block")?;
        *self.bucket(target)?.public_access_block.write() = None;
        Ok(())
    }

    async fn get_bucket_tagging(&self, target: &BucketTarget) -> S3Result<Vec<Tag>> {
        self.enter("get_bucket_tagging")?;
        let tags = self.bucket(target)?.tags.read().clone();
        missing(tags, S3ErrorCode::NoSuchTagSet, &target.bucket)
    }

    async fn put_bucket_tagging(&self, target: &BucketTarget, tags: &[Tag]) -> S3Result<()> {
        self.enter("put_bucket_tagging")?;
        *self.bucket(target)?.tags.write() = Some(tags.to_vec());
        Ok(())
    }

    async fn delete_bucket_tagging(&self, target: &BucketTarget) -> S3Result<()> {
        self.enter("delete_bucket_tagging")?;
        *self.bucket(target)?.tags.write() = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    async fn put_object(&self, input: &PutObjectInput) -> S3Result<PutObjectOutput> {
        self.enter("put_object")?;
        let bucket = self.bucket(&input.target())?;
        let lock = &input.object_lock;
        if lock.mode.is_some() || lock.legal_hold_status.is_some() {
            Self::require_object_lock(&bucket)?;
        }

        let default_sse = bucket
            .encryption
            .read()
            .rules
            .first()
            .and_then(|r| r.apply_server_side_encryption_by_default.clone());
        let (sse, kms_key_id) = match (input.server_side_encryption, default_sse) {
            (Some(sse), _) => (Some(sse), input.kms_key_id.clone()),
            (None, Some(default)) => (Some(default.sse_algorithm), default.kms_master_key_id),
            (None, None) => (None, None),
        };

        let version = StoredVersion {
            version_id: Self::new_version_id(&bucket),
            is_delete_marker: false,
            etag: etag(&input.body),
            body: input.body.clone(),
            headers: input.headers.clone(),
            storage_class: input.storage_class,
            server_side_encryption: sse,
            kms_key_id,
            bucket_key_enabled: input.bucket_key_enabled,
            tags: parse_tagging(input.tagging.as_deref()),
            acl: input.acl.unwrap_or(ObjectCannedAcl::Private),
            object_lock: input.object_lock.clone(),
            checksums: checksums(input.checksum_algorithm, &input.body),
            last_modified: Utc::now(),
        };
        let output = PutObjectOutput {
            etag: Some(version.etag.clone()),
            version_id: (version.version_id != NULL_VERSION_ID).then(|| version.version_id.clone()),
        };
        Self::store_version(&bucket, &input.key, version);
        Ok(output)
    }

    async fn head_object(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<ObjectMetadata> {
        self.enter("head_object")?;
        let bucket = self.bucket(target).map_err(|e| {
            if e.code == S3ErrorCode::NoSuchBucket {
                not_found(&target.bucket)
            } else {
                e
            }
        })?;
        Self::find_version(&bucket, key, version_id)
            .map(|v| v.metadata())
            .map_err(|_| not_found(key))
    }

    async fn get_object(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<ObjectContent> {
        self.enter("get_object")?;
        let bucket = self.bucket(target)?;
        let version = Self::find_version(&bucket, key, version_id)?;
        Ok(ObjectContent {
            metadata: version.metadata(),
            body: version.body,
        })
    }

    async fn delete_object(
        &self,
        target: &BucketTarget,
        input: &DeleteObjectInput,
    ) -> S3Result<DeleteObjectOutput> {
        self.enter("delete_object")?;
        let bucket = self.bucket(target)?;
        let status = bucket.versioning_status();
        let mut objects = bucket.objects.write();

        if let Some(version_id) = input.version_id.as_deref() {
            let Some(versions) = objects.get_mut(&input.key) else {
                return Ok(DeleteObjectOutput::default());
            };
            let Some(idx) = versions.iter().position(|v| v.version_id == version_id) else {
                return Ok(DeleteObjectOutput::default());
            };
            if versions[idx].is_locked(input.bypass_governance_retention, Utc::now()) {
                return Err(S3Error::access_denied(&input.key));
            }
            let removed = versions.remove(idx);
            if versions.is_empty() {
                objects.remove(&input.key);
            }
            return Ok(DeleteObjectOutput {
                delete_marker: removed.is_delete_marker,
                version_id: Some(removed.version_id),
            });
        }

        match status {
            None => {
                objects.remove(&input.key);
                Ok(DeleteObjectOutput::default())
            }
            Some(status) => {
                let marker_id = match status {
                    BucketVersioningStatus::Enabled => uuid::Uuid::new_v4().simple().to_string(),
                    BucketVersioningStatus::Suspended => NULL_VERSION_ID.to_owned(),
                };
                let versions = objects.entry(input.key.clone()).or_default();
                if marker_id == NULL_VERSION_ID {
                    versions.retain(|v| v.version_id != NULL_VERSION_ID);
                }
                versions.push(StoredVersion::delete_marker(marker_id.clone()));
                Ok(DeleteObjectOutput {
                    delete_marker: true,
                    version_id: Some(marker_id),
                })
            }
        }
    }

    async fn delete_objects(
        &self,
        target: &BucketTarget,
        objects: &[ObjectIdentifier],
        bypass_governance_retention: bool,
    ) -> S3Result<Vec<DeleteObjectsError>> {
        self.enter("delete_objects")?;
        let mut errors = Vec::new();
        for object in objects {
            let input = DeleteObjectInput {
                key: object.key.clone(),
                version_id: object.version_id.clone(),
                bypass_governance_retention,
            };
            if let Err(e) = self.delete_object(target, &input).await {
                errors.push(DeleteObjectsError {
                    key: object.key.clone(),
                    version_id: object.version_id.clone(),
                    code: e.code.as_str().to_owned(),
                    message: e.message,
                });
            }
        }
        Ok(errors)
    }

    async fn list_object_versions(
        &self,
        target: &BucketTarget,
        prefix: Option<&str>,
        key_marker: Option<&str>,
        version_id_marker: Option<&str>,
    ) -> S3Result<ObjectVersionPage> {
        self.enter("list_object_versions")?;
        let bucket = self.bucket(target)?;
        let objects = bucket.objects.read();

        // Keys ascending, versions newest first.
        let all: Vec<ObjectVersion> = objects
            .iter()
            .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
            .flat_map(|(key, versions)| {
                let latest = versions.len().saturating_sub(1);
                versions.iter().enumerate().rev().map(move |(i, v)| ObjectVersion {
                    key: key.clone(),
                    version_id: v.version_id.clone(),
                    is_delete_marker: v.is_delete_marker,
                    is_latest: i == latest,
                })
            })
            .collect();

        let start = match key_marker {
            Some(marker) => all
                .iter()
                .position(|v| {
                    v.key.as_str() == marker && version_id_marker == Some(v.version_id.as_str())
                })
                .map_or_else(
                    || all.iter().take_while(|v| v.key.as_str() <= marker).count(),
                    |i| i + 1,
                ),
            None => 0,
        };

        let page: Vec<ObjectVersion> = all.iter().skip(start).take(self.page_size).cloned().collect();
        let is_truncated = start + page.len() < all.len();
        let (next_key_marker, next_version_id_marker) = match (is_truncated, page.last()) {
            (true, Some(last)) => (Some(last.key.clone()), Some(last.version_id.clone())),
            _ => (None, None),
        };
        Ok(ObjectVersionPage {
            versions: page,
            next_key_marker,
            next_version_id_marker,
            is_truncated,
        })
    }

    async fn get_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<Vec<Tag>> {
        self.enter("get_object_tagging")?;
        let bucket = self.bucket(target)?;
        Ok(Self::find_version(&bucket, key, version_id)?.tags)
    }

    async fn put_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        tags: &[Tag],
    ) -> S3Result<()> {
        self.enter("put_object_tagging")?;
        let bucket = self.bucket(target)?;
        Self::with_version(&bucket, key, version_id, |v| {
            v.tags = tags.to_vec();
            Ok(())
        })
    }

    async fn delete_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<()> {
        self.enter("delete_object_tagging")?;
        let bucket = self.bucket(target)?;
        Self::with_version(&bucket, key, version_id, |v| {
            v.tags.clear();
            Ok(())
        })
    }

    async fn put_object_acl(
        &self,
        target: &BucketTarget,
        key: &str,
        acl: ObjectCannedAcl,
    ) -> S3Result<()> {
        self.enter("put_object_acl")?;
        let bucket = self.bucket(target)?;
        Self::with_version(&bucket, key, None, |v| {
            v.acl = acl;
            Ok(())
        })
    }

    async fn put_object_legal_hold(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        status: ObjectLockLegalHoldStatus,
    ) -> S3Result<()> {
        self.enter("put_object_legal_hold")?;
        let bucket = self.bucket(target)?;
        Self::require_object_lock(&bucket)?;
        Self::with_version(&bucket, key, version_id, |v| {
            v.object_lock.legal_hold_status = Some(status);
            Ok(())
        })
    }

    async fn put_object_retention(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        retention: &ObjectRetention,
        bypass_governance_retention: bool,
    ) -> S3Result<()> {
        self.enter("put_object_retention")?;
        let bucket = self.bucket(target)?;
        Self::require_object_lock(&bucket)?;
        Self::with_version(&bucket, key, version_id, |v| {
            let now = Utc::now();
            let active = v.object_lock.retain_until_date.is_some_and(|until| until > now);
            let shortened = match (v.object_lock.retain_until_date, retention.retain_until_date) {
                (Some(current), Some(new)) => new < current,
                (Some(_), None) => true,
                _ => false,
            };
            let blocked = active
                && shortened
                && match v.object_lock.mode {
                    Some(ObjectLockRetentionMode::Compliance) => true,
                    Some(ObjectLockRetentionMode::Governance) => !bypass_governance_retention,
                    None => false,
                };
            if blocked {
                return Err(S3Error::access_denied(key));
            }
            v.object_lock.mode = retention.mode;
            v.object_lock.retain_until_date = retention.retain_until_date;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create(conn: &InMemoryS3, bucket: &str, object_lock: bool) {
        conn.create_bucket(&CreateBucketInput {
            bucket: bucket.to_owned(),
            object_lock_enabled: object_lock,
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
    }

    async fn put(conn: &InMemoryS3, bucket: &str, key: &str, body: &'static [u8]) -> PutObjectOutput {
        conn.put_object(&PutObjectInput {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            body: Bytes::from_static(body),
            ..PutObjectInput::default()
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_should_compute_only_the_requested_checksum() {
        let crc32c = checksums(Some(ChecksumAlgorithm::Crc32c), b"123456789");
        assert_eq!(crc32c.crc32c.as_deref(), Some("4waSgw=="));
        assert!(crc32c.crc32.is_none() && crc32c.sha1.is_none() && crc32c.sha256.is_none());

        let sha1 = checksums(Some(ChecksumAlgorithm::Sha1), b"checksummed");
        assert_eq!(sha1.sha1.as_deref(), Some("M7R8qvUsKbUKBOurs928/EO8Z3U="));

        assert_eq!(checksums(None, b"checksummed"), ObjectChecksums::default());
    }

    #[tokio::test]
    async fn test_should_report_missing_configurations_by_code() {
        let conn = InMemoryS3::new("us-east-1");
        create(&conn, "b", false).await;
        let target = BucketTarget::new("b");

        let err = conn.get_bucket_cors(&target).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchCORSConfiguration);
        let err = conn.get_bucket_policy(&target).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchBucketPolicy);
        let err = conn.get_object_lock_configuration(&target).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::ObjectLockConfigurationNotFoundError);

        let err = conn.head_bucket(&BucketTarget::new("missing")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_should_inject_and_drain_failures() {
        let conn = InMemoryS3::new("us-east-1");
        create(&conn, "b", false).await;
        conn.inject_failure("head_bucket", S3ErrorCode::NotFound, 2);
        let target = BucketTarget::new("b");
        assert!(conn.head_bucket(&target).await.is_err());
        assert!(conn.head_bucket(&target).await.is_err());
        assert!(conn.head_bucket(&target).await.is_ok());
        assert_eq!(conn.calls().iter().filter(|c| **c == "head_bucket").count(), 3);
    }

    #[tokio::test]
    async fn test_should_reject_foreign_expected_owner() {
        let conn = InMemoryS3::new("us-east-1");
        create(&conn, "b", false).await;
        let target = BucketTarget::with_owner("b", Some("111111111111"));
        let err = conn.get_bucket_acl(&target).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);
    }

    #[tokio::test]
    async fn test_should_keep_versions_and_delete_markers() {
        let conn = InMemoryS3::new("us-east-1");
        create(&conn, "b", false).await;
        let target = BucketTarget::new("b");
        let enabled = VersioningConfiguration {
            status: Some(BucketVersioningStatus::Enabled),
            mfa_delete: None,
        };
        conn.put_bucket_versioning(&target, &enabled, None).await.unwrap();

        let v1 = put(&conn, "b", "k", b"one").await;
        let v2 = put(&conn, "b", "k", b"two").await;
        assert_ne!(v1.version_id, v2.version_id);

        let out = conn
            .delete_object(&target, &DeleteObjectInput {
                key: "k".to_owned(),
                ..DeleteObjectInput::default()
            })
            .await
            .unwrap();
        assert!(out.delete_marker);
        assert_eq!(conn.version_count("b"), 3);
        assert!(conn.head_object(&target, "k", None).await.is_err());

        let page = conn.list_object_versions(&target, None, None, None).await.unwrap();
        assert_eq!(page.versions.len(), 3);
        assert!(page.versions[0].is_delete_marker && page.versions[0].is_latest);

        let err = conn.delete_bucket(&target).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::BucketNotEmpty);
    }

    #[tokio::test]
    async fn test_should_paginate_object_versions() {
        let conn = InMemoryS3::new("us-east-1").with_page_size(2);
        create(&conn, "b", false).await;
        for key in ["a", "b", "c", "d", "e"] {
            put(&conn, "b", key, b"x").await;
        }
        let target = BucketTarget::new("b");
        let mut seen = Vec::new();
        let (mut key_marker, mut version_marker) = (None, None);
        loop {
            let page = conn
                .list_object_versions(&target, None, key_marker.as_deref(), version_marker.as_deref())
                .await
                .unwrap();
            seen.extend(page.versions.iter().map(|v| v.key.clone()));
            if !page.is_truncated {
                break;
            }
            key_marker = page.next_key_marker;
            version_marker = page.next_version_id_marker;
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_should_enforce_object_lock_on_delete() {
        let conn = InMemoryS3::new("us-east-1");
        create(&conn, "locked", true).await;
        let target = BucketTarget::new("locked");
        let out = put(&conn, "locked", "k", b"data").await;
        let version_id = out.version_id.clone();

        conn.put_object_retention(
            &target,
            "k",
            version_id.as_deref(),
            &ObjectRetention {
                mode: Some(ObjectLockRetentionMode::Governance),
                retain_until_date: Some(Utc::now() + chrono::Duration::days(1)),
            },
            false,
        )
        .await
        .unwrap();

        let delete = DeleteObjectInput {
            key: "k".to_owned(),
            version_id: version_id.clone(),
            bypass_governance_retention: false,
        };
        let err = conn.delete_object(&target, &delete).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);

        let bypass = DeleteObjectInput {
            bypass_governance_retention: true,
            ..delete
        };
        conn.delete_object(&target, &bypass).await.unwrap();
        assert_eq!(conn.version_count("locked"), 0);
    }

    #[tokio::test]
    async fn test_should_require_versioning_for_replication() {
        let conn = InMemoryS3::new("us-east-1");
        create(&conn, "src", false).await;
        let target = BucketTarget::new("src");
        let err = conn
            .put_bucket_replication(&target, &ReplicationConfiguration::default(), None)
            .await
            .unwrap_err();
        assert!(err.message_contains(&S3ErrorCode::InvalidRequest, "Versioning must be 'Enabled'"));
    }
}
