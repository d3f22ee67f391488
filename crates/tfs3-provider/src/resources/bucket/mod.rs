//! The `aws_s3_bucket` resource.
//!
//! Besides the bucket itself this resource still manages the deprecated
//! in-bucket sub-configurations. They are written in a fixed order after
//! the bucket exists, and every one of them is read back on refresh so that
//! changes made by the split-out resources show up in state.
//!
//! ```text
//! create: name ─> validate ─> CreateBucket ─> wait visible ─> tags ─> apply blocks ─> read
//! read:   HeadBucket ─> policy, acl, cors, website, versioning, accelerate,
//!         request payer, logging, lifecycle, replication, encryption,
//!         object lock ─> region ─> tags
//! delete: DeleteBucket ─(BucketNotEmpty + force_destroy)─> empty ─> DeleteBucket ─> wait gone
//! ```

mod expand;
mod model;

use std::time::Duration;

use async_trait::async_trait;
use tfs3_core::endpoints::{arn, bucket_regional_domain_name, hosted_zone_id_for_region, website_endpoint};
use tfs3_core::{AwsRegion, Partition};
use tfs3_model::object::{BucketAclInput, CreateBucketInput};
use tfs3_model::types::{
    AccessControlPolicy, BucketCannedAcl, LifecycleConfiguration, ObjectLockEnabled,
};
use tfs3_model::{BucketTarget, S3Error, S3ErrorCode};
use tracing::{debug, info, warn};

use self::expand::{
    expand_cors_rules, expand_grants, expand_lifecycle_rules, expand_logging, expand_object_lock,
    expand_replication, expand_sse, expand_versioning_create, expand_versioning_update,
    expand_website, flatten_cors_rules, flatten_grants, flatten_lifecycle_rules, flatten_logging,
    flatten_object_lock, flatten_replication, flatten_sse, flatten_versioning, flatten_website,
    require_versioning_for_replication, sort_grants,
};
pub use self::model::BucketModel;
use super::versions::empty_bucket;
use super::{SectionRead, find_bucket, first, read_section, retry_write, validate_max_one};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::names::{name, name_prefix_from_name};
use crate::policy::{normalize_json_string, policy_to_set};
use crate::resource::{Resource, Timeouts, found_after_write, removed_from_state};
use crate::retry::{
    retry_until_not_found, retry_when, retry_when_aws_err_code_equals, retry_when_not_found,
};
use crate::tags::{KeyValueTags, bucket_list_tags, bucket_update_tags, tags_for_state};
use crate::validation::{
    conflicts_with, valid_bucket_name, validate_bucket_attr, validate_bucket_prefix,
    validate_json, validate_range,
};

const KIND: &str = "S3 Bucket";

/// The `aws_s3_bucket` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bucket;

/// The planned block when it differs from the prior state. An unset block
/// is left alone; a missing prior block compares as empty.
fn block_change<'a, T: PartialEq>(prior: &Option<Vec<T>>, plan: &'a Option<Vec<T>>) -> Option<&'a [T]> {
    let planned = plan.as_deref()?;
    (planned != prior.as_deref().unwrap_or_default()).then_some(planned)
}

/// The planned value when it differs from the prior state.
fn value_change<'a, T: PartialEq>(prior: &Option<T>, plan: &'a Option<T>) -> Option<&'a T> {
    let planned = plan.as_ref()?;
    (prior.as_ref() != Some(planned)).then_some(planned)
}

fn validate(plan: &BucketModel) -> ProviderResult<()> {
    if let Some(bucket) = &plan.bucket {
        validate_bucket_attr(bucket)?;
    }
    if let Some(prefix) = &plan.bucket_prefix {
        validate_bucket_prefix(prefix)?;
    }
    conflicts_with(
        "bucket",
        plan.bucket.as_deref().is_some_and(|b| !b.is_empty()),
        "bucket_prefix",
        plan.bucket_prefix.as_deref().is_some_and(|p| !p.is_empty()),
    )?;
    conflicts_with(
        "acl",
        plan.acl.is_some(),
        "grant",
        plan.grant.as_ref().is_some_and(|g| !g.is_empty()),
    )?;

    validate_max_one("logging", plan.logging.as_ref())?;
    validate_max_one("object_lock_configuration", plan.object_lock_configuration.as_ref())?;
    validate_max_one("replication_configuration", plan.replication_configuration.as_ref())?;
    validate_max_one(
        "server_side_encryption_configuration",
        plan.server_side_encryption_configuration.as_ref(),
    )?;
    validate_max_one("versioning", plan.versioning.as_ref())?;
    validate_max_one("website", plan.website.as_ref())?;

    if let Some(policy) = plan.policy.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_json("policy", policy)?;
    }
    for rule in plan.cors_rule.iter().flatten() {
        if rule.allowed_methods.is_empty() || rule.allowed_origins.is_empty() {
            return Err(ProviderError::validation(
                "cors_rule: allowed_methods and allowed_origins are required",
            ));
        }
    }
    if let Some(website) = first(plan.website.as_ref()) {
        if let Some(rules) = website.routing_rules.as_deref().filter(|r| !r.is_empty()) {
            validate_json("website.routing_rules", rules)?;
        }
    }
    for rule in first(plan.replication_configuration.as_ref())
        .map(|c| c.rules.as_slice())
        .unwrap_or_default()
    {
        for destination in &rule.destination {
            for metrics in &destination.metrics {
                validate_range("metrics.minutes", i64::from(metrics.minutes), 10, 15)?;
            }
            for time in &destination.replication_time {
                validate_range("replication_time.minutes", i64::from(time.minutes), 15, 15)?;
            }
        }
    }
    Ok(())
}

fn object_lock_requested(plan: &BucketModel) -> bool {
    plan.object_lock_enabled == Some(true)
        || first(plan.object_lock_configuration.as_ref())
            .is_some_and(|c| c.object_lock_enabled == Some(ObjectLockEnabled::Enabled))
}

impl Bucket {
    /// Write every sub-configuration that differs between `prior` and `plan`.
    async fn apply_changes(
        client: &AwsClient,
        prior: &BucketModel,
        plan: &BucketModel,
        is_new: bool,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let timeout = client.propagation_timeout();
        let id = plan.id.as_str();
        let target = &BucketTarget::new(id);

        // Policy.
        if let Some(policy) = &plan.policy {
            let planned = normalize_json_string(policy)?;
            let current = normalize_json_string(prior.policy.as_deref().unwrap_or_default())?;
            if planned != current {
                if planned.is_empty() {
                    retry_write(timeout, move || async move {
                        conn.delete_bucket_policy(target)
                            .await
                            .context("deleting S3 Bucket policy", id)
                    })
                    .await?;
                } else {
                    let planned = planned.as_str();
                    retry_when_aws_err_code_equals(
                        timeout,
                        move || async move {
                            conn.put_bucket_policy(target, planned)
                                .await
                                .context("putting S3 Bucket policy", id)
                        },
                        &[S3ErrorCode::MalformedPolicy, S3ErrorCode::NoSuchBucket],
                    )
                    .await?;
                }
            }
        }

        // CORS rules.
        if let Some(rules) = block_change(&prior.cors_rule, &plan.cors_rule) {
            if rules.is_empty() {
                retry_write(timeout, move || async move {
                    conn.delete_bucket_cors(target)
                        .await
                        .context("deleting S3 Bucket CORS configuration", id)
                })
                .await?;
            } else {
                let rules = &expand_cors_rules(rules);
                retry_write(timeout, move || async move {
                    conn.put_bucket_cors(target, rules)
                        .await
                        .context("putting S3 Bucket CORS configuration", id)
                })
                .await?;
            }
        }

        // Website.
        if let Some(website) = block_change(&prior.website, &plan.website) {
            match website.first() {
                None => {
                    retry_write(timeout, move || async move {
                        conn.delete_bucket_website(target)
                            .await
                            .context("deleting S3 Bucket website configuration", id)
                    })
                    .await?;
                }
                Some(website) => {
                    let config = &expand_website(website)?;
                    retry_write(timeout, move || async move {
                        conn.put_bucket_website(target, config)
                            .await
                            .context("putting S3 Bucket website configuration", id)
                    })
                    .await?;
                }
            }
        }

        // Versioning.
        if let Some(versioning) = block_change(&prior.versioning, &plan.versioning) {
            let config = match versioning.first() {
                Some(v) if is_new => expand_versioning_create(v),
                Some(v) => Some(expand_versioning_update(v)),
                None => None,
            };
            if let Some(config) = &config {
                retry_write(timeout, move || async move {
                    conn.put_bucket_versioning(target, config, None)
                        .await
                        .context("putting S3 Bucket versioning", id)
                })
                .await?;
            }
        }

        // Canned ACL. A new bucket got its ACL from CreateBucket.
        let grant_change = block_change(&prior.grant, &plan.grant);
        let acl_change = value_change(&prior.acl, &plan.acl).is_some() && !is_new;
        if acl_change || grant_change.is_some_and(<[_]>::is_empty) {
            let acl = &BucketAclInput::Canned(plan.acl.unwrap_or(BucketCannedAcl::Private));
            retry_write(timeout, move || async move {
                conn.put_bucket_acl(target, acl)
                    .await
                    .context("putting S3 Bucket ACL", id)
            })
            .await?;
        }

        // Grants.
        if let Some(grants) = grant_change.filter(|g| !g.is_empty()) {
            let current = retry_write(timeout, move || async move {
                conn.get_bucket_acl(target)
                    .await
                    .context("reading S3 Bucket ACL", id)
            })
            .await?;
            let acl = &BucketAclInput::Policy(AccessControlPolicy {
                grants: expand_grants(grants),
                owner: current.owner,
            });
            retry_write(timeout, move || async move {
                conn.put_bucket_acl(target, acl)
                    .await
                    .context("putting S3 Bucket ACL", id)
            })
            .await?;
        }

        // Logging.
        if let Some(logging) = block_change(&prior.logging, &plan.logging) {
            let logging = &logging.first().map(expand_logging);
            retry_write(timeout, move || async move {
                conn.put_bucket_logging(target, logging.as_ref())
                    .await
                    .context("putting S3 Bucket logging", id)
            })
            .await?;
        }

        // Lifecycle rules.
        if let Some(rules) = block_change(&prior.lifecycle_rule, &plan.lifecycle_rule) {
            if rules.is_empty() {
                retry_write(timeout, move || async move {
                    conn.delete_bucket_lifecycle(target)
                        .await
                        .context("deleting S3 Bucket lifecycle configuration", id)
                })
                .await?;
            } else {
                let config = &LifecycleConfiguration {
                    rules: expand_lifecycle_rules(rules)?,
                    transition_default_minimum_object_size: None,
                };
                retry_write(timeout, move || async move {
                    conn.put_bucket_lifecycle(target, config)
                        .await
                        .context("putting S3 Bucket lifecycle configuration", id)
                })
                .await?;
            }
        }

        // Transfer acceleration.
        if let Some(status) = value_change(&prior.acceleration_status, &plan.acceleration_status) {
            let status = *status;
            retry_write(timeout, move || async move {
                conn.put_bucket_accelerate(target, status)
                    .await
                    .context("putting S3 Bucket accelerate configuration", id)
            })
            .await?;
        }

        // Request payment.
        if let Some(payer) = value_change(&prior.request_payer, &plan.request_payer) {
            let payer = *payer;
            retry_write(timeout, move || async move {
                conn.put_bucket_request_payment(target, payer)
                    .await
                    .context("putting S3 Bucket request payment configuration", id)
            })
            .await?;
        }

        // Replication.
        if let Some(replication) =
            block_change(&prior.replication_configuration, &plan.replication_configuration)
        {
            match replication.first() {
                None => {
                    retry_write(timeout, move || async move {
                        conn.delete_bucket_replication(target)
                            .await
                            .context("deleting S3 Bucket replication configuration", id)
                    })
                    .await?;
                }
                Some(replication) => {
                    let versioning = first(plan.versioning.as_ref().or(prior.versioning.as_ref()));
                    require_versioning_for_replication(id, versioning)?;
                    let config = &expand_replication(replication)?;
                    retry_when(
                        timeout,
                        move || async move {
                            conn.put_bucket_replication(target, config, None)
                                .await
                                .context("putting S3 Bucket replication configuration", id)
                        },
                        |e| {
                            e.code_is(&[S3ErrorCode::NoSuchBucket])
                                || e.message_contains(
                                    &S3ErrorCode::InvalidRequest,
                                    "Versioning must be 'Enabled' on the bucket",
                                )
                        },
                    )
                    .await?;
                }
            }
        }

        // Server-side encryption.
        if let Some(sse) = block_change(
            &prior.server_side_encryption_configuration,
            &plan.server_side_encryption_configuration,
        ) {
            match sse.first() {
                None => {
                    retry_write(timeout, move || async move {
                        conn.delete_bucket_encryption(target)
                            .await
                            .context("deleting S3 Bucket server-side encryption configuration", id)
                    })
                    .await?;
                }
                Some(sse) => {
                    let config = &expand_sse(sse);
                    retry_when_aws_err_code_equals(
                        timeout,
                        move || async move {
                            conn.put_bucket_encryption(target, config)
                                .await
                                .context("putting S3 Bucket server-side encryption configuration", id)
                        },
                        &[S3ErrorCode::NoSuchBucket, S3ErrorCode::OperationAborted],
                    )
                    .await?;
                }
            }
        }

        // Object lock.
        if let Some(lock) =
            block_change(&prior.object_lock_configuration, &plan.object_lock_configuration)
                .and_then(<[_]>::first)
        {
            let config = &expand_object_lock(lock);
            retry_write(timeout, move || async move {
                conn.put_object_lock_configuration(target, config, None)
                    .await
                    .context("putting S3 Bucket object lock configuration", id)
            })
            .await?;
        }

        Ok(())
    }

    /// Read the bucket and all of its sub-configurations into `state`.
    ///
    /// `None` means the bucket is gone. Right after a write (`is_new`) a
    /// missing bucket is an error instead.
    #[allow(clippy::too_many_lines)]
    async fn refresh(
        client: &AwsClient,
        mut state: BucketModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketModel>> {
        let conn = client.conn();
        let bucket = state.id.clone();
        let id = bucket.as_str();
        let target = &BucketTarget::new(id);

        match find_bucket(conn, target).await {
            Ok(()) => {}
            Err(e) if !is_new && e.is_not_found() => return Ok(removed_from_state(KIND, id)),
            Err(e) => return Err(e),
        }

        state.arn = arn(client.partition().id(), "s3", "", "", id);
        state.bucket = Some(bucket.clone());
        state.bucket_domain_name = client.partition_hostname(&format!("{id}.s3"));
        state.bucket_prefix = name_prefix_from_name(id);

        macro_rules! section {
            ($absent:expr, $operation:literal, $call:expr) => {
                match read_section(client, is_new, $absent, move || async move {
                    $call.await.context($operation, id)
                })
                .await?
                {
                    SectionRead::Present(v) => Some(v),
                    SectionRead::Absent => None,
                    SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
                }
            };
        }

        let policy = section!(
            &[S3ErrorCode::NoSuchBucketPolicy],
            "reading S3 Bucket policy",
            conn.get_bucket_policy(target)
        );
        state.policy = match policy {
            Some(remote) => Some(policy_to_set(
                state.policy.as_deref().unwrap_or_default(),
                &remote,
            )?),
            None => None,
        };

        let acl = section!(&[], "reading S3 Bucket ACL", conn.get_bucket_acl(target));
        state.grant = acl.as_ref().map(flatten_grants);

        let cors = section!(
            &[S3ErrorCode::NoSuchCORSConfiguration],
            "reading S3 Bucket CORS configuration",
            conn.get_bucket_cors(target)
        );
        state.cors_rule = cors.map(flatten_cors_rules);

        let website = section!(
            &[S3ErrorCode::NoSuchWebsiteConfiguration],
            "reading S3 Bucket website configuration",
            conn.get_bucket_website(target)
        );
        state.website = website
            .as_ref()
            .map(flatten_website)
            .transpose()?
            .map(|w| vec![w]);

        let versioning = section!(
            &[],
            "reading S3 Bucket versioning",
            conn.get_bucket_versioning(target)
        );
        state.versioning = versioning.as_ref().map(|v| vec![flatten_versioning(v)]);

        let accelerate = section!(
            &[S3ErrorCode::UnsupportedArgument, S3ErrorCode::UnsupportedOperation],
            "reading S3 Bucket accelerate configuration",
            conn.get_bucket_accelerate(target)
        );
        state.acceleration_status = accelerate.flatten();

        state.request_payer = section!(
            &[],
            "reading S3 Bucket request payment configuration",
            conn.get_bucket_request_payment(target)
        );

        let logging = section!(&[], "reading S3 Bucket logging", conn.get_bucket_logging(target));
        state.logging = logging.map(flatten_logging);

        let lifecycle = section!(
            &[S3ErrorCode::NoSuchLifecycleConfiguration],
            "reading S3 Bucket lifecycle configuration",
            conn.get_bucket_lifecycle(target)
        );
        state.lifecycle_rule = lifecycle.map(|l| flatten_lifecycle_rules(&l.rules));

        let replication = section!(
            &[S3ErrorCode::ReplicationConfigurationNotFoundError],
            "reading S3 Bucket replication configuration",
            conn.get_bucket_replication(target)
        );
        state.replication_configuration = replication.map(|r| vec![flatten_replication(&r)]);

        let sse = section!(
            &[
                S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError,
                S3ErrorCode::UnsupportedOperation,
            ],
            "reading S3 Bucket server-side encryption configuration",
            conn.get_bucket_encryption(target)
        );
        state.server_side_encryption_configuration = sse.map(|s| vec![flatten_sse(&s)]);

        // Object lock is not available in every partition; outside the
        // commercial and GovCloud partitions a failure is only logged.
        let lock = read_section(
            client,
            is_new,
            &[
                S3ErrorCode::ObjectLockConfigurationNotFoundError,
                S3ErrorCode::NoSuchObjectLockConfiguration,
            ],
            move || async move {
                conn.get_object_lock_configuration(target)
                    .await
                    .context("reading S3 Bucket object lock configuration", id)
            },
        )
        .await;
        match lock {
            Ok(SectionRead::Present(config)) => {
                state.object_lock_enabled =
                    Some(config.object_lock_enabled == Some(ObjectLockEnabled::Enabled));
                state.object_lock_configuration = Some(vec![flatten_object_lock(&config)]);
            }
            Ok(SectionRead::Absent) => {
                state.object_lock_enabled = Some(false);
                state.object_lock_configuration = None;
            }
            Ok(SectionRead::BucketGone) => return Ok(removed_from_state(KIND, id)),
            Err(e) => {
                let partition = client.partition().id();
                if partition == Partition::AWS || partition == Partition::AWS_US_GOV {
                    return Err(e);
                }
                warn!(bucket = id, partition, error = %e, "unable to read S3 Bucket object lock configuration");
            }
        }

        let location = section!(
            &[],
            "reading S3 Bucket region",
            conn.get_bucket_location(target)
        );
        let region = location.map_or_else(
            || AwsRegion::new(client.region()),
            |c| AwsRegion::from_location_constraint(&c),
        );
        state.region = region.as_str().to_owned();
        state.bucket_regional_domain_name = bucket_regional_domain_name(id, region.as_str());
        state.hosted_zone_id = match hosted_zone_id_for_region(region.as_str()) {
            Ok(zone) => Some(zone.to_owned()),
            Err(e) => {
                warn!(bucket = id, error = %e, "unable to determine S3 Bucket hosted zone ID");
                None
            }
        };
        if state.website.as_ref().is_some_and(|w| !w.is_empty()) {
            let endpoint = website_endpoint(id, region.as_str());
            state.website_endpoint = Some(endpoint.endpoint);
            state.website_domain = Some(endpoint.domain);
        } else {
            state.website_endpoint = None;
            state.website_domain = None;
        }

        let tags = match read_section(client, is_new, &[], move || bucket_list_tags(conn, target)).await? {
            SectionRead::Present(tags) => tags,
            SectionRead::Absent => KeyValueTags::default(),
            SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };
        let tags_all = tags_for_state(&tags, client.ignore_tags());
        state.tags = client.default_tags().remove_from(&tags_all).map();
        state.tags_all = tags_all.map();

        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for Bucket {
    const TYPE_NAME: &'static str = "aws_s3_bucket";
    type Model = BucketModel;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default().with_delete(Duration::from_secs(60 * 60))
    }

    async fn create(&self, client: &AwsClient, mut plan: BucketModel) -> ProviderResult<BucketModel> {
        validate(&plan)?;
        let conn = client.conn();
        let timeout = client.propagation_timeout();
        let bucket = name(plan.bucket.as_deref(), plan.bucket_prefix.as_deref());
        let region = client.region();
        valid_bucket_name(&bucket, region)?;
        let id = bucket.as_str();
        let target = &BucketTarget::new(id);

        // us-east-1 answers CreateBucket on an owned bucket with success
        // and resets its ACL.
        if region == AwsRegion::DEFAULT {
            match find_bucket(conn, target).await {
                Ok(()) => {
                    return Err(ProviderError::api(
                        "creating S3 Bucket",
                        id,
                        S3Error::bucket_already_exists(id),
                    ));
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        let input = &CreateBucketInput {
            bucket: bucket.clone(),
            acl: Some(plan.acl.unwrap_or(BucketCannedAcl::Private)),
            location_constraint: (region != AwsRegion::DEFAULT).then(|| region.to_owned()),
            object_lock_enabled: object_lock_requested(&plan),
        };
        info!(bucket = id, region, object_lock = input.object_lock_enabled, "creating S3 Bucket");
        retry_when_aws_err_code_equals(
            timeout,
            move || async move { conn.create_bucket(input).await.context("creating S3 Bucket", id) },
            &[S3ErrorCode::OperationAborted],
        )
        .await?;

        retry_when_not_found(timeout, move || find_bucket(conn, target))
            .await
            .map_err(|e| match e {
                ProviderError::Timeout(inner) => ProviderError::UnexpectedState(format!(
                    "waiting for S3 Bucket ({id}) create: {inner}"
                )),
                other => other,
            })?;

        plan.id = bucket.clone();
        if let Some(grants) = plan.grant.as_mut() {
            sort_grants(grants);
        }

        let tags_all = client.default_tags().merge_tags(&KeyValueTags::from(&plan.tags));
        if !tags_all.is_empty() {
            bucket_update_tags(conn, target, &KeyValueTags::default(), &tags_all).await?;
        }

        Self::apply_changes(client, &BucketModel::default(), &plan, true).await?;
        let state = Self::refresh(client, plan, true).await?;
        info!(bucket = id, "S3 Bucket created");
        found_after_write(KIND, id, state)
    }

    async fn read(&self, client: &AwsClient, state: BucketModel) -> ProviderResult<Option<BucketModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketModel,
        mut plan: BucketModel,
    ) -> ProviderResult<BucketModel> {
        validate(&plan)?;
        if plan.bucket.as_deref().is_some_and(|b| b != prior.id) {
            return Err(ProviderError::validation(
                "bucket: the bucket name cannot be changed in place",
            ));
        }
        plan.id.clone_from(&prior.id);
        if let Some(grants) = plan.grant.as_mut() {
            sort_grants(grants);
        }

        Self::apply_changes(client, &prior, &plan, false).await?;

        let old_tags = KeyValueTags::from(&prior.tags_all);
        let new_tags = client.default_tags().merge_tags(&KeyValueTags::from(&plan.tags));
        if !old_tags.equal(&new_tags) {
            let target = BucketTarget::new(&plan.id);
            bucket_update_tags(client.conn(), &target, &old_tags, &new_tags).await?;
        }

        let id = plan.id.clone();
        let state = Self::refresh(client, plan, false).await?;
        found_after_write(KIND, &id, state)
    }

    async fn delete(&self, client: &AwsClient, state: BucketModel) -> ProviderResult<()> {
        let conn = client.conn();
        let id = state.id.as_str();
        let target = &BucketTarget::new(id);
        let force = state.object_lock_enabled == Some(true)
            || first(state.object_lock_configuration.as_ref())
                .is_some_and(|c| c.object_lock_enabled == Some(ObjectLockEnabled::Enabled));

        info!(bucket = id, "deleting S3 Bucket");
        loop {
            match conn.delete_bucket(target).await {
                Ok(()) => break,
                Err(e) if e.code == S3ErrorCode::NoSuchBucket => return Ok(()),
                Err(e) if e.code == S3ErrorCode::BucketNotEmpty && state.force_destroy => {
                    let deleted = empty_bucket(conn, target, force).await?;
                    debug!(bucket = id, deleted, "deleted S3 objects");
                    if deleted == 0 {
                        return Err(ProviderError::api("deleting S3 Bucket", id, e));
                    }
                }
                Err(e) => return Err(ProviderError::api("deleting S3 Bucket", id, e)),
            }
        }

        retry_until_not_found(self.timeouts().delete, move || find_bucket(conn, target)).await
    }

    fn import(&self, id: &str) -> ProviderResult<BucketModel> {
        Ok(BucketModel {
            id: id.to_owned(),
            ..BucketModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use bytes::Bytes;
    use tfs3_core::ProviderConfig;
    use tfs3_model::object::PutObjectInput;
    use tfs3_model::types::{GranteeType, Payer, Permission, ServerSideEncryption};

    use super::model::{
        CorsRuleModel, GrantModel, LifecycleRuleModel, LoggingModel, ReplicationConfigurationModel,
        VersioningModel, WebsiteModel,
    };
    use super::*;
    use crate::conn::{InMemoryS3, S3Api};
    use crate::resources::test_support::{client, client_in};

    fn plan(bucket: &str) -> BucketModel {
        BucketModel {
            bucket: Some(bucket.to_owned()),
            ..BucketModel::default()
        }
    }

    #[tokio::test]
    async fn test_should_create_bucket_with_computed_attributes() {
        let (client, mem) = client();
        let state = Bucket.create(&client, plan("tf-bucket")).await.unwrap();

        assert!(mem.has_bucket("tf-bucket"));
        assert_eq!(state.id, "tf-bucket");
        assert_eq!(state.arn, "arn:aws:s3:::tf-bucket");
        assert_eq!(state.bucket_domain_name, "tf-bucket.s3.amazonaws.com");
        assert_eq!(
            state.bucket_regional_domain_name,
            "tf-bucket.s3.us-east-1.amazonaws.com"
        );
        assert_eq!(state.region, "us-east-1");
        assert_eq!(state.hosted_zone_id.as_deref(), Some("Z3AQBSTGFYJSTF"));
        assert_eq!(state.request_payer, Some(Payer::BucketOwner));
        assert_eq!(state.versioning, Some(vec![VersioningModel::default()]));
        assert_eq!(state.object_lock_enabled, Some(false));
        assert!(state.website.is_none());
        assert!(state.website_endpoint.is_none());
        let sse = &state.server_side_encryption_configuration.unwrap()[0];
        assert_eq!(
            sse.rule[0].apply_server_side_encryption_by_default[0].sse_algorithm,
            ServerSideEncryption::Aes256
        );
    }

    #[tokio::test]
    async fn test_should_refuse_existing_bucket_in_us_east_1() {
        let (client, _) = client();
        Bucket.create(&client, plan("taken")).await.unwrap();
        let err = Bucket.create(&client, plan("taken")).await.unwrap_err();
        assert!(err.code_is(&[S3ErrorCode::BucketAlreadyExists]));
    }

    #[tokio::test]
    async fn test_should_generate_names_from_prefix() {
        let (client, _) = client();
        let state = Bucket
            .create(
                &client,
                BucketModel {
                    bucket_prefix: Some("tf-test-".to_owned()),
                    ..BucketModel::default()
                },
            )
            .await
            .unwrap();
        assert!(state.id.starts_with("tf-test-"));
        assert_eq!(state.bucket_prefix.as_deref(), Some("tf-test-"));

        let err = Bucket
            .create(
                &client,
                BucketModel {
                    bucket: Some("a".to_owned()),
                    bucket_prefix: Some("b".to_owned()),
                    ..BucketModel::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_should_create_regional_bucket() {
        let (client, _) = client_in("eu-west-1");
        let mut planned = plan("regional-site");
        planned.website = Some(vec![WebsiteModel {
            index_document: Some("index.html".to_owned()),
            ..WebsiteModel::default()
        }]);
        let state = Bucket.create(&client, planned).await.unwrap();

        assert_eq!(state.region, "eu-west-1");
        assert_eq!(state.hosted_zone_id.as_deref(), Some("Z1BKCTXD74EZPE"));
        assert_eq!(
            state.website_endpoint.as_deref(),
            Some("regional-site.s3-website-eu-west-1.amazonaws.com")
        );
        assert_eq!(
            state.website_domain.as_deref(),
            Some("s3-website-eu-west-1.amazonaws.com")
        );

        let err = Bucket.create(&client, plan("Bad_Name")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_should_manage_deprecated_blocks() {
        let (client, _) = client();
        let mut planned = plan("blocks");
        planned.versioning = Some(vec![VersioningModel {
            enabled: true,
            mfa_delete: false,
        }]);
        planned.cors_rule = Some(vec![CorsRuleModel {
            allowed_methods: vec!["GET".to_owned()],
            allowed_origins: vec!["*".to_owned()],
            max_age_seconds: Some(300),
            ..CorsRuleModel::default()
        }]);
        planned.logging = Some(vec![LoggingModel {
            target_bucket: "logs".to_owned(),
            target_prefix: "blocks/".to_owned(),
        }]);
        planned.lifecycle_rule = Some(vec![LifecycleRuleModel {
            id: Some("expire".to_owned()),
            prefix: Some("tmp/".to_owned()),
            enabled: true,
            ..LifecycleRuleModel::default()
        }]);
        planned.policy = Some(
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":"*","Action":"s3:GetObject","Resource":"arn:aws:s3:::blocks/*"}]}"#
                .to_owned(),
        );
        planned.request_payer = Some(Payer::Requester);

        let state = Bucket.create(&client, planned.clone()).await.unwrap();
        assert!(state.versioning.as_ref().unwrap()[0].enabled);
        assert_eq!(state.cors_rule, planned.cors_rule);
        assert_eq!(state.logging, planned.logging);
        assert_eq!(state.request_payer, Some(Payer::Requester));
        assert_eq!(
            state.lifecycle_rule.as_ref().unwrap()[0].id.as_deref(),
            Some("expire")
        );
        assert_eq!(
            state.policy.as_deref(),
            Some(normalize_json_string(planned.policy.as_deref().unwrap()).unwrap().as_str())
        );

        let mut next = state.clone();
        next.cors_rule = Some(Vec::new());
        next.lifecycle_rule = Some(Vec::new());
        next.policy = Some(String::new());
        next.logging = Some(Vec::new());
        let updated = Bucket.update(&client, state, next).await.unwrap();
        assert!(updated.cors_rule.is_none());
        assert!(updated.lifecycle_rule.is_none());
        assert!(updated.policy.is_none());
        assert_eq!(updated.logging, Some(Vec::new()));
        assert!(updated.versioning.unwrap()[0].enabled);
    }

    #[tokio::test]
    async fn test_should_require_versioning_for_replication() {
        let (client, _) = client();
        let mut planned = plan("replicated");
        planned.replication_configuration = Some(vec![ReplicationConfigurationModel {
            role: "arn:aws:iam::000000000000:role/replication".to_owned(),
            rules: Vec::new(),
        }]);
        let err = Bucket.create(&client, planned.clone()).await.unwrap_err();
        assert!(err.to_string().contains("versioning must be enabled"));

        let mut planned = planned;
        planned.bucket = Some("replicated-2".to_owned());
        planned.versioning = Some(vec![VersioningModel {
            enabled: true,
            mfa_delete: false,
        }]);
        let state = Bucket.create(&client, planned).await.unwrap();
        assert_eq!(
            state.replication_configuration.unwrap()[0].role,
            "arn:aws:iam::000000000000:role/replication"
        );
    }

    #[tokio::test]
    async fn test_should_switch_between_grants_and_canned_acl() {
        let (client, _) = client();
        let mut planned = plan("granted");
        planned.grant = Some(vec![GrantModel {
            id: None,
            r#type: GranteeType::Group,
            uri: Some("http://acs.amazonaws.com/groups/global/AllUsers".to_owned()),
            permissions: vec![Permission::Read],
        }]);
        let state = Bucket.create(&client, planned.clone()).await.unwrap();
        assert_eq!(state.grant, planned.grant);

        let mut next = state.clone();
        next.grant = Some(Vec::new());
        let updated = Bucket.update(&client, state, next).await.unwrap();
        let grants = updated.grant.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].r#type, GranteeType::CanonicalUser);
        assert_eq!(grants[0].permissions, vec![Permission::FullControl]);
    }

    #[tokio::test]
    async fn test_should_split_default_tags_from_resource_tags() {
        let config = ProviderConfig::builder()
            .default_tags(BTreeMap::from([("team".to_owned(), "storage".to_owned())]))
            .build();
        let mem = Arc::new(InMemoryS3::new("us-east-1"));
        let client = AwsClient::new(&config, mem.clone());

        let mut planned = plan("tagged");
        planned.tags = BTreeMap::from([("env".to_owned(), "test".to_owned())]);
        let state = Bucket.create(&client, planned).await.unwrap();
        assert_eq!(state.tags.len(), 1);
        assert_eq!(state.tags_all.len(), 2);
        assert_eq!(state.tags_all["team"], "storage");

        let mut next = state.clone();
        next.tags.clear();
        let updated = Bucket.update(&client, state, next).await.unwrap();
        assert!(updated.tags.is_empty());
        assert_eq!(
            updated.tags_all,
            BTreeMap::from([("team".to_owned(), "storage".to_owned())])
        );
    }

    #[tokio::test]
    async fn test_should_force_destroy_non_empty_bucket() {
        let (client, mem) = client();
        let mut planned = plan("full");
        planned.versioning = Some(vec![VersioningModel {
            enabled: true,
            mfa_delete: false,
        }]);
        let state = Bucket.create(&client, planned).await.unwrap();
        for _ in 0..3 {
            mem.put_object(&PutObjectInput {
                bucket: "full".to_owned(),
                key: "k".to_owned(),
                body: Bytes::from_static(b"v"),
                ..PutObjectInput::default()
            })
            .await
            .unwrap();
        }

        let err = Bucket.delete(&client, state.clone()).await.unwrap_err();
        assert!(err.code_is(&[S3ErrorCode::BucketNotEmpty]));

        let state = BucketModel {
            force_destroy: true,
            ..state
        };
        Bucket.delete(&client, state.clone()).await.unwrap();
        assert!(!mem.has_bucket("full"));

        // Deleting an already deleted bucket succeeds.
        Bucket.delete(&client, state).await.unwrap();
    }

    #[tokio::test]
    async fn test_should_drop_state_of_bucket_deleted_elsewhere() {
        let (client, mem) = client();
        let state = Bucket.create(&client, plan("gone")).await.unwrap();
        mem.delete_bucket(&BucketTarget::new("gone")).await.unwrap();
        assert!(Bucket.read(&client, state).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_retry_sections_racing_bucket_creation() {
        let (client, mem) = client();
        mem.inject_failure("get_bucket_cors", S3ErrorCode::NoSuchBucket, 2);
        let state = Bucket.create(&client, plan("racing")).await.unwrap();
        assert!(state.cors_rule.is_none());
        assert_eq!(
            mem.calls()
                .iter()
                .filter(|c| **c == "get_bucket_cors")
                .count(),
            3
        );
    }
}
