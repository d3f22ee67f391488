//! S3 resources.
//!
//! Every resource follows the same shape: validate the plan, call S3 inside
//! the retry helpers that absorb eventual consistency, then read the result
//! back into state. The helpers here are shared by the bucket and its
//! split-out sub-resources.

mod acl;
mod bucket;
mod encryption;
mod lifecycle;
mod object;
mod object_lock;
mod policy;
mod public_access_block;
mod replication;
mod versioning;
pub(crate) mod versions;
mod website;

use std::future::Future;
use std::time::Duration;

use tfs3_model::{BucketTarget, S3ErrorCode};

use crate::conn::{AwsClient, S3Api};
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::BucketId;
use crate::retry::retry_when_no_such_bucket;
use crate::validation::validate_expected_bucket_owner;

pub use acl::{
    AccessControlPolicyModel, BucketAcl, BucketAclModel, GrantModel as AclGrantModel,
    GranteeModel, OwnerModel,
};
pub use bucket::{Bucket, BucketModel};
pub use encryption::{
    BucketServerSideEncryptionConfiguration, BucketServerSideEncryptionConfigurationModel,
};
pub use lifecycle::{BucketLifecycleConfiguration, BucketLifecycleConfigurationModel};
pub use object::{Object, ObjectModel};
pub use object_lock::{BucketObjectLockConfiguration, BucketObjectLockConfigurationModel};
pub use policy::{BucketPolicy, BucketPolicyModel};
pub use public_access_block::{BucketPublicAccessBlock, BucketPublicAccessBlockModel};
pub use replication::{BucketReplicationConfiguration, BucketReplicationConfigurationModel};
pub use versioning::{BucketVersioning, BucketVersioningModel};
pub use website::{BucketWebsiteConfiguration, BucketWebsiteConfigurationModel};

/// Codes S3 and S3-compatible stores return for sub-resources they do not
/// implement. A section answering with one of these reads as absent.
pub(crate) const UNSUPPORTED_CODES: &[S3ErrorCode] = &[
    S3ErrorCode::MethodNotAllowed,
    S3ErrorCode::NotImplemented,
    S3ErrorCode::XNotImplemented,
];

/// Outcome of reading one bucket sub-configuration.
#[derive(Debug)]
pub(crate) enum SectionRead<T> {
    /// The configuration exists.
    Present(T),
    /// The configuration is absent or not supported by the endpoint.
    Absent,
    /// The bucket itself is gone.
    BucketGone,
}

/// Read one sub-configuration of a bucket.
///
/// `NoSuchBucket` is retried for the propagation timeout. If it persists the
/// bucket counts as gone, except for a resource that was just created, where
/// it is an error. Not-found errors, [`UNSUPPORTED_CODES`] and `absent_codes`
/// make the section absent.
pub(crate) async fn read_section<T, F, Fut>(
    client: &AwsClient,
    is_new: bool,
    absent_codes: &[S3ErrorCode],
    f: F,
) -> ProviderResult<SectionRead<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    match retry_when_no_such_bucket(client.propagation_timeout(), f).await {
        Ok(v) => Ok(SectionRead::Present(v)),
        Err(e) if !is_new && e.code_is(&[S3ErrorCode::NoSuchBucket]) => Ok(SectionRead::BucketGone),
        Err(e) if e.is_not_found() || e.code_is(UNSUPPORTED_CODES) || e.code_is(absent_codes) => {
            Ok(SectionRead::Absent)
        }
        Err(e) => Err(e),
    }
}

/// `HeadBucket`, with a missing bucket reported as [`ProviderError::NotFound`].
pub(crate) async fn find_bucket(conn: &dyn S3Api, target: &BucketTarget) -> ProviderResult<()> {
    conn.head_bucket(target).await.not_found_on(
        &[S3ErrorCode::NotFound, S3ErrorCode::NoSuchBucket],
        "S3 Bucket",
        "reading S3 Bucket",
        &target.bucket,
    )
}

/// Run a write that may race with bucket creation.
pub(crate) async fn retry_write<T, F, Fut>(timeout: Duration, f: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    retry_when_no_such_bucket(timeout, f).await
}

/// The target addressed by a parsed sub-resource ID.
pub(crate) fn target_of(id: &BucketId) -> BucketTarget {
    BucketTarget::with_owner(&id.bucket, id.expected_bucket_owner.as_deref())
}

/// Validate the `bucket` and `expected_bucket_owner` arguments shared by the
/// split-out bucket sub-resources.
pub(crate) fn validate_bucket_args(
    bucket: &str,
    expected_bucket_owner: Option<&str>,
) -> ProviderResult<()> {
    if bucket.is_empty() || bucket.len() > 63 {
        return Err(ProviderError::validation(format!(
            "expected length of bucket to be in the range (1 - 63), got {bucket}"
        )));
    }
    validate_expected_bucket_owner(expected_bucket_owner)
}

/// The first element of a single-item block.
pub(crate) fn first<T>(block: Option<&Vec<T>>) -> Option<&T> {
    block.and_then(|items| items.first())
}

/// Reject more than one element in a single-item block.
pub(crate) fn validate_max_one<T>(attr: &str, block: Option<&Vec<T>>) -> ProviderResult<()> {
    match block {
        Some(items) if items.len() > 1 => Err(ProviderError::validation(format!(
            "{attr}: too many list items (at most 1 allowed, got {})",
            items.len()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tfs3_core::{AwsRegion, ProviderConfig};

    use crate::conn::{AwsClient, InMemoryS3};

    /// A client over a fresh in-memory store in `region`.
    pub(crate) fn client_in(region: &str) -> (AwsClient, Arc<InMemoryS3>) {
        let config = ProviderConfig::builder()
            .region(AwsRegion::new(region))
            .build();
        let mem = Arc::new(InMemoryS3::new(region));
        (AwsClient::new(&config, mem.clone()), mem)
    }

    /// A client over a fresh in-memory store in `us-east-1`.
    pub(crate) fn client() -> (AwsClient, Arc<InMemoryS3>) {
        client_in("us-east-1")
    }
}
