//! S3 connection backed by the AWS SDK for Rust.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types as sdk;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use chrono::{DateTime, Utc};
use tfs3_core::ProviderConfig;
use tfs3_model::object::{
    BucketAclInput, CreateBucketInput, DeleteObjectInput, DeleteObjectOutput, DeleteObjectsError,
    ObjectChecksums, ObjectContent, ObjectHeaders, ObjectIdentifier, ObjectLockSettings,
    ObjectMetadata, ObjectRetention, ObjectVersion, ObjectVersionPage, PutObjectInput,
    PutObjectOutput,
};
use tfs3_model::types::{
    AbortIncompleteMultipartUpload, AccessControlPolicy, AccessControlTranslation,
    BucketAccelerateStatus, BucketTarget, Condition, CorsRule, DefaultRetention,
    DeleteMarkerReplication, Destination, EncryptionConfiguration, ErrorDocument,
    ExistingObjectReplication, Grant, Grantee, IndexDocument, LifecycleConfiguration,
    LifecycleExpiration, LifecycleRule, LifecycleRuleAndOperator, LifecycleRuleFilter,
    LoggingEnabled, Metrics, NoncurrentVersionExpiration, NoncurrentVersionTransition,
    ObjectCannedAcl, ObjectLockConfiguration, ObjectLockLegalHoldStatus, ObjectLockRule, Owner,
    Payer, PublicAccessBlockConfiguration, Redirect, RedirectAllRequestsTo, ReplicaModifications,
    ReplicationConfiguration, ReplicationRule, ReplicationRuleAndOperator, ReplicationRuleFilter,
    ReplicationTime, ReplicationTimeValue, RoutingRule, ServerSideEncryptionByDefault,
    ServerSideEncryptionConfiguration, ServerSideEncryptionRule, SourceSelectionCriteria,
    SseKmsEncryptedObjects, Tag, Transition, VersioningConfiguration, WebsiteConfiguration,
};
use tfs3_model::{S3Error, S3ErrorCode, S3Result};
use tracing::debug;

use super::S3Api;

/// An [`S3Api`] implementation on top of [`aws_sdk_s3::Client`].
#[derive(Debug, Clone)]
pub struct SdkS3 {
    client: Client,
}

impl SdkS3 {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain and the provider
    /// configuration (region, endpoint override, path-style addressing and
    /// SDK-level retries).
    pub async fn connect(config: &ProviderConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.as_str().to_owned()))
            .retry_config(
                RetryConfig::standard().with_max_attempts(config.max_retries.saturating_add(1)),
            )
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.s3_use_path_style);
        if let Some(url) = &config.endpoint_url {
            builder = builder.endpoint_url(url);
        }
        debug!(
            region = %config.region.as_str(),
            endpoint = ?config.endpoint_url,
            path_style = config.s3_use_path_style,
            "S3 client configured"
        );
        Self::new(Client::from_conf(builder.build()))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Convert an SDK error into an [`S3Error`] carrying the service error code.
///
/// HEAD responses have no body, so a bare 404 becomes `NotFound` and a bare
/// 403 becomes `AccessDenied`.
fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> S3Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = match (err.code(), status) {
        (Some(code), _) => S3ErrorCode::from_code(code),
        (None, Some(404)) => S3ErrorCode::NotFound,
        (None, Some(403)) => S3ErrorCode::AccessDenied,
        _ => S3ErrorCode::InternalError,
    };
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_owned);
    let mut error = S3Error::with_message(code, message);
    if let Some(status) = status.and_then(|s| http::StatusCode::from_u16(s).ok()) {
        error = error.with_status(status);
    }
    error.with_source(err)
}

fn build_error(err: BuildError) -> S3Error {
    S3Error::with_message(S3ErrorCode::InvalidRequest, err.to_string()).with_source(err)
}

/// Builders of shapes with required members return `Result`, the others
/// return the shape itself. `built` accepts both.
trait Built<T> {
    fn into_shape(self) -> S3Result<T>;
}

impl<T> Built<T> for T {
    fn into_shape(self) -> S3Result<T> {
        Ok(self)
    }
}

impl<T> Built<T> for Result<T, BuildError> {
    fn into_shape(self) -> S3Result<T> {
        self.map_err(build_error)
    }
}

fn built<T>(shape: impl Built<T>) -> S3Result<T> {
    shape.into_shape()
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

fn parse<T>(wire: &str) -> S3Result<T>
where
    T: std::str::FromStr<Err = S3Error>,
{
    wire.parse()
}

fn parse_opt<T>(wire: Option<&str>) -> S3Result<Option<T>>
where
    T: std::str::FromStr<Err = S3Error>,
{
    wire.map(parse).transpose()
}

fn to_sdk_time(time: &DateTime<Utc>) -> SdkDateTime {
    SdkDateTime::from_millis(time.timestamp_millis())
}

fn from_sdk_time(time: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_owned)
}

// ---------------------------------------------------------------------------
// Shape conversions
// ---------------------------------------------------------------------------

fn to_sdk_tag(tag: &Tag) -> S3Result<sdk::Tag> {
    built(sdk::Tag::builder().key(&tag.key).value(&tag.value).build())
}

fn to_sdk_tags(tags: &[Tag]) -> S3Result<Vec<sdk::Tag>> {
    tags.iter().map(to_sdk_tag).collect()
}

fn from_sdk_tag(tag: &sdk::Tag) -> Tag {
    Tag::new(tag.key(), tag.value())
}

fn from_sdk_tags(tags: &[sdk::Tag]) -> Vec<Tag> {
    tags.iter().map(from_sdk_tag).collect()
}

fn to_sdk_tagging(tags: &[Tag]) -> S3Result<sdk::Tagging> {
    built(sdk::Tagging::builder().set_tag_set(Some(to_sdk_tags(tags)?)).build())
}

fn from_sdk_grant(grant: &sdk::Grant) -> S3Result<Option<Grant>> {
    let (Some(grantee), Some(permission)) = (grant.grantee(), grant.permission()) else {
        return Ok(None);
    };
    Ok(Some(Grant {
        grantee: Grantee {
            display_name: owned(grantee.display_name()),
            email_address: owned(grantee.email_address()),
            id: owned(grantee.id()),
            r#type: parse(grantee.r#type().as_str())?,
            uri: owned(grantee.uri()),
        },
        permission: parse(permission.as_str())?,
    }))
}

fn to_sdk_grant(grant: &Grant) -> S3Result<sdk::Grant> {
    let grantee = built(
        sdk::Grantee::builder()
            .set_display_name(grant.grantee.display_name.clone())
            .set_email_address(grant.grantee.email_address.clone())
            .set_id(grant.grantee.id.clone())
            .r#type(sdk::Type::from(grant.grantee.r#type.as_str()))
            .set_uri(grant.grantee.uri.clone())
            .build(),
    )?;
    built(
        sdk::Grant::builder()
            .grantee(grantee)
            .permission(sdk::Permission::from(grant.permission.as_str()))
            .build(),
    )
}

fn to_sdk_cors_rule(rule: &CorsRule) -> S3Result<sdk::CorsRule> {
    built(
        sdk::CorsRule::builder()
            .set_id(rule.id.clone())
            .set_allowed_headers(Some(rule.allowed_headers.clone()))
            .set_allowed_methods(Some(rule.allowed_methods.clone()))
            .set_allowed_origins(Some(rule.allowed_origins.clone()))
            .set_expose_headers(Some(rule.expose_headers.clone()))
            .set_max_age_seconds(rule.max_age_seconds)
            .build(),
    )
}

fn from_sdk_cors_rule(rule: &sdk::CorsRule) -> CorsRule {
    CorsRule {
        id: owned(rule.id()),
        allowed_headers: rule.allowed_headers().to_vec(),
        allowed_methods: rule.allowed_methods().to_vec(),
        allowed_origins: rule.allowed_origins().to_vec(),
        expose_headers: rule.expose_headers().to_vec(),
        max_age_seconds: rule.max_age_seconds(),
    }
}

fn to_sdk_website(config: &WebsiteConfiguration) -> S3Result<sdk::WebsiteConfiguration> {
    let index = config
        .index_document
        .as_ref()
        .map(|d| built(sdk::IndexDocument::builder().suffix(&d.suffix).build()))
        .transpose()?;
    let error = config
        .error_document
        .as_ref()
        .map(|d| built(sdk::ErrorDocument::builder().key(&d.key).build()))
        .transpose()?;
    let redirect_all = config
        .redirect_all_requests_to
        .as_ref()
        .map(|r| {
            built(
                sdk::RedirectAllRequestsTo::builder()
                    .host_name(&r.host_name)
                    .set_protocol(r.protocol.map(|p| sdk::Protocol::from(p.as_str())))
                    .build(),
            )
        })
        .transpose()?;
    let routing_rules = config
        .routing_rules
        .iter()
        .map(|rule| {
            let condition = rule
                .condition
                .as_ref()
                .map(|c| {
                    built(
                        sdk::Condition::builder()
                            .set_http_error_code_returned_equals(
                                c.http_error_code_returned_equals.clone(),
                            )
                            .set_key_prefix_equals(c.key_prefix_equals.clone())
                            .build(),
                    )
                })
                .transpose()?;
            let r = &rule.redirect;
            let redirect = built(
                sdk::Redirect::builder()
                    .set_host_name(r.host_name.clone())
                    .set_http_redirect_code(r.http_redirect_code.clone())
                    .set_protocol(r.protocol.map(|p| sdk::Protocol::from(p.as_str())))
                    .set_replace_key_prefix_with(r.replace_key_prefix_with.clone())
                    .set_replace_key_with(r.replace_key_with.clone())
                    .build(),
            )?;
            built(
                sdk::RoutingRule::builder()
                    .set_condition(condition)
                    .redirect(redirect)
                    .build(),
            )
        })
        .collect::<S3Result<Vec<_>>>()?;

    built(
        sdk::WebsiteConfiguration::builder()
            .set_index_document(index)
            .set_error_document(error)
            .set_redirect_all_requests_to(redirect_all)
            .set_routing_rules((!routing_rules.is_empty()).then_some(routing_rules))
            .build(),
    )
}

fn to_sdk_lifecycle_filter(filter: &LifecycleRuleFilter) -> S3Result<sdk::LifecycleRuleFilter> {
    let and = filter
        .and
        .as_ref()
        .map(|and| {
            built(
                sdk::LifecycleRuleAndOperator::builder()
                    .set_prefix(and.prefix.clone())
                    .set_tags((!and.tags.is_empty()).then(|| to_sdk_tags(&and.tags)).transpose()?)
                    .set_object_size_greater_than(and.object_size_greater_than)
                    .set_object_size_less_than(and.object_size_less_than)
                    .build(),
            )
        })
        .transpose()?;
    built(
        sdk::LifecycleRuleFilter::builder()
            .set_and(and)
            .set_prefix(filter.prefix.clone())
            .set_tag(filter.tag.as_ref().map(to_sdk_tag).transpose()?)
            .set_object_size_greater_than(filter.object_size_greater_than)
            .set_object_size_less_than(filter.object_size_less_than)
            .build(),
    )
}

fn to_sdk_lifecycle_rule(rule: &LifecycleRule) -> S3Result<sdk::LifecycleRule> {
    let expiration = rule
        .expiration
        .as_ref()
        .map(|e| {
            built(
                sdk::LifecycleExpiration::builder()
                    .set_date(e.date.as_ref().map(to_sdk_time))
                    .set_days(e.days)
                    .set_expired_object_delete_marker(e.expired_object_delete_marker)
                    .build(),
            )
        })
        .transpose()?;
    let transitions = rule
        .transitions
        .iter()
        .map(|t| {
            built(
                sdk::Transition::builder()
                    .set_date(t.date.as_ref().map(to_sdk_time))
                    .set_days(t.days)
                    .set_storage_class(
                        t.storage_class
                            .map(|c| sdk::TransitionStorageClass::from(c.as_str())),
                    )
                    .build(),
            )
        })
        .collect::<S3Result<Vec<_>>>()?;
    let noncurrent_transitions = rule
        .noncurrent_version_transitions
        .iter()
        .map(|t| {
            built(
                sdk::NoncurrentVersionTransition::builder()
                    .set_noncurrent_days(t.noncurrent_days)
                    .set_newer_noncurrent_versions(t.newer_noncurrent_versions)
                    .set_storage_class(
                        t.storage_class
                            .map(|c| sdk::TransitionStorageClass::from(c.as_str())),
                    )
                    .build(),
            )
        })
        .collect::<S3Result<Vec<_>>>()?;
    let noncurrent_expiration = rule
        .noncurrent_version_expiration
        .as_ref()
        .map(|e| {
            built(
                sdk::NoncurrentVersionExpiration::builder()
                    .set_noncurrent_days(e.noncurrent_days)
                    .set_newer_noncurrent_versions(e.newer_noncurrent_versions)
                    .build(),
            )
        })
        .transpose()?;
    let abort = rule
        .abort_incomplete_multipart_upload
        .as_ref()
        .map(|a| {
            built(
                sdk::AbortIncompleteMultipartUpload::builder()
                    .set_days_after_initiation(a.days_after_initiation)
                    .build(),
            )
        })
        .transpose()?;

    #[allow(deprecated)]
    let builder = sdk::LifecycleRule::builder().set_prefix(rule.prefix.clone());
    built(
        builder
            .set_id(rule.id.clone())
            .set_filter(rule.filter.as_ref().map(to_sdk_lifecycle_filter).transpose()?)
            .status(sdk::ExpirationStatus::from(rule.status.as_str()))
            .set_expiration(expiration)
            .set_transitions((!transitions.is_empty()).then_some(transitions))
            .set_noncurrent_version_transitions(
                (!noncurrent_transitions.is_empty()).then_some(noncurrent_transitions),
            )
            .set_noncurrent_version_expiration(noncurrent_expiration)
            .set_abort_incomplete_multipart_upload(abort)
            .build(),
    )
}

fn from_sdk_lifecycle_rule(rule: &sdk::LifecycleRule) -> S3Result<LifecycleRule> {
    let filter = rule
        .filter()
        .map(|f| -> S3Result<LifecycleRuleFilter> {
            Ok(LifecycleRuleFilter {
                and: f.and().map(|a| LifecycleRuleAndOperator {
                    prefix: owned(a.prefix()),
                    tags: from_sdk_tags(a.tags()),
                    object_size_greater_than: a.object_size_greater_than(),
                    object_size_less_than: a.object_size_less_than(),
                }),
                prefix: owned(f.prefix()),
                tag: f.tag().map(from_sdk_tag),
                object_size_greater_than: f.object_size_greater_than(),
                object_size_less_than: f.object_size_less_than(),
            })
        })
        .transpose()?;

    #[allow(deprecated)]
    let prefix = owned(rule.prefix());
    Ok(LifecycleRule {
        id: owned(rule.id()),
        prefix,
        filter,
        status: parse(rule.status().as_str())?,
        expiration: rule.expiration().map(|e| LifecycleExpiration {
            date: e.date().and_then(from_sdk_time),
            days: e.days(),
            expired_object_delete_marker: e.expired_object_delete_marker(),
        }),
        transitions: rule
            .transitions()
            .iter()
            .map(|t| {
                Ok(Transition {
                    date: t.date().and_then(from_sdk_time),
                    days: t.days(),
                    storage_class: parse_opt(t.storage_class().map(|c| c.as_str()))?,
                })
            })
            .collect::<S3Result<_>>()?,
        noncurrent_version_transitions: rule
            .noncurrent_version_transitions()
            .iter()
            .map(|t| {
                Ok(NoncurrentVersionTransition {
                    noncurrent_days: t.noncurrent_days(),
                    newer_noncurrent_versions: t.newer_noncurrent_versions(),
                    storage_class: parse_opt(t.storage_class().map(|c| c.as_str()))?,
                })
            })
            .collect::<S3Result<_>>()?,
        noncurrent_version_expiration: rule.noncurrent_version_expiration().map(|e| {
            NoncurrentVersionExpiration {
                noncurrent_days: e.noncurrent_days(),
                newer_noncurrent_versions: e.newer_noncurrent_versions(),
            }
        }),
        abort_incomplete_multipart_upload: rule.abort_incomplete_multipart_upload().map(|a| {
            AbortIncompleteMultipartUpload {
                days_after_initiation: a.days_after_initiation(),
            }
        }),
    })
}

fn to_sdk_replication_rule(rule: &ReplicationRule) -> S3Result<sdk::ReplicationRule> {
    let filter = rule
        .filter
        .as_ref()
        .map(|f| {
            let and = f
                .and
                .as_ref()
                .map(|a| {
                    built(
                        sdk::ReplicationRuleAndOperator::builder()
                            .set_prefix(a.prefix.clone())
                            .set_tags(
                                (!a.tags.is_empty()).then(|| to_sdk_tags(&a.tags)).transpose()?,
                            )
                            .build(),
                    )
                })
                .transpose()?;
            built(
                sdk::ReplicationRuleFilter::builder()
                    .set_and(and)
                    .set_prefix(f.prefix.clone())
                    .set_tag(f.tag.as_ref().map(to_sdk_tag).transpose()?)
                    .build(),
            )
        })
        .transpose()?;

    let source_selection = rule
        .source_selection_criteria
        .as_ref()
        .map(|s| {
            let sse_kms = s
                .sse_kms_encrypted_objects
                .as_ref()
                .map(|o| {
                    built(
                        sdk::SseKmsEncryptedObjects::builder()
                            .status(sdk::SseKmsEncryptedObjectsStatus::from(o.status.as_str()))
                            .build(),
                    )
                })
                .transpose()?;
            let replica = s
                .replica_modifications
                .as_ref()
                .map(|m| {
                    built(
                        sdk::ReplicaModifications::builder()
                            .status(sdk::ReplicaModificationsStatus::from(m.status.as_str()))
                            .build(),
                    )
                })
                .transpose()?;
            built(
                sdk::SourceSelectionCriteria::builder()
                    .set_sse_kms_encrypted_objects(sse_kms)
                    .set_replica_modifications(replica)
                    .build(),
            )
        })
        .transpose()?;

    let existing = rule
        .existing_object_replication
        .as_ref()
        .map(|e| {
            built(
                sdk::ExistingObjectReplication::builder()
                    .status(sdk::ExistingObjectReplicationStatus::from(e.status.as_str()))
                    .build(),
            )
        })
        .transpose()?;

    let delete_marker = rule
        .delete_marker_replication
        .as_ref()
        .map(|d| {
            built(
                sdk::DeleteMarkerReplication::builder()
                    .set_status(
                        d.status
                            .map(|s| sdk::DeleteMarkerReplicationStatus::from(s.as_str())),
                    )
                    .build(),
            )
        })
        .transpose()?;

    #[allow(deprecated)]
    let builder = sdk::ReplicationRule::builder().set_prefix(rule.prefix.clone());
    built(
        builder
            .set_id(rule.id.clone())
            .set_priority(rule.priority)
            .set_filter(filter)
            .status(sdk::ReplicationRuleStatus::from(rule.status.as_str()))
            .set_source_selection_criteria(source_selection)
            .set_existing_object_replication(existing)
            .destination(to_sdk_destination(&rule.destination)?)
            .set_delete_marker_replication(delete_marker)
            .build(),
    )
}

fn to_sdk_time_value(value: Option<&ReplicationTimeValue>) -> S3Result<Option<sdk::ReplicationTimeValue>> {
    value
        .map(|v| built(sdk::ReplicationTimeValue::builder().set_minutes(v.minutes).build()))
        .transpose()
}

fn to_sdk_destination(dest: &Destination) -> S3Result<sdk::Destination> {
    let translation = dest
        .access_control_translation
        .as_ref()
        .map(|t| {
            built(
                sdk::AccessControlTranslation::builder()
                    .owner(sdk::OwnerOverride::from(t.owner.as_str()))
                    .build(),
            )
        })
        .transpose()?;
    let encryption = dest
        .encryption_configuration
        .as_ref()
        .map(|e| {
            built(
                sdk::EncryptionConfiguration::builder()
                    .set_replica_kms_key_id(e.replica_kms_key_id.clone())
                    .build(),
            )
        })
        .transpose()?;
    let replication_time = dest
        .replication_time
        .as_ref()
        .map(|t| {
            built(
                sdk::ReplicationTime::builder()
                    .status(sdk::ReplicationTimeStatus::from(t.status.as_str()))
                    .set_time(to_sdk_time_value(t.time.as_ref())?)
                    .build(),
            )
        })
        .transpose()?;
    let metrics = dest
        .metrics
        .as_ref()
        .map(|m| {
            built(
                sdk::Metrics::builder()
                    .status(sdk::MetricsStatus::from(m.status.as_str()))
                    .set_event_threshold(to_sdk_time_value(m.event_threshold.as_ref())?)
                    .build(),
            )
        })
        .transpose()?;

    built(
        sdk::Destination::builder()
            .bucket(&dest.bucket)
            .set_account(dest.account.clone())
            .set_storage_class(dest.storage_class.map(|c| sdk::StorageClass::from(c.as_str())))
            .set_access_control_translation(translation)
            .set_encryption_configuration(encryption)
            .set_replication_time(replication_time)
            .set_metrics(metrics)
            .build(),
    )
}

fn from_sdk_time_value(value: Option<&sdk::ReplicationTimeValue>) -> Option<ReplicationTimeValue> {
    value.map(|v| ReplicationTimeValue {
        minutes: v.minutes(),
    })
}

fn from_sdk_replication_rule(rule: &sdk::ReplicationRule) -> S3Result<ReplicationRule> {
    let Some(dest) = rule.destination() else {
        return Err(S3Error::with_message(
            S3ErrorCode::InternalError,
            "replication rule without destination",
        ));
    };
    let destination = Destination {
        bucket: dest.bucket().to_owned(),
        account: owned(dest.account()),
        storage_class: parse_opt(dest.storage_class().map(|c| c.as_str()))?,
        access_control_translation: dest
            .access_control_translation()
            .map(|t| -> S3Result<_> {
                Ok(AccessControlTranslation {
                    owner: parse(t.owner().as_str())?,
                })
            })
            .transpose()?,
        encryption_configuration: dest.encryption_configuration().map(|e| {
            EncryptionConfiguration {
                replica_kms_key_id: owned(e.replica_kms_key_id()),
            }
        }),
        replication_time: dest
            .replication_time()
            .map(|t| -> S3Result<_> {
                Ok(ReplicationTime {
                    status: parse(t.status().as_str())?,
                    time: from_sdk_time_value(t.time()),
                })
            })
            .transpose()?,
        metrics: dest
            .metrics()
            .map(|m| -> S3Result<_> {
                Ok(Metrics {
                    status: parse(m.status().as_str())?,
                    event_threshold: from_sdk_time_value(m.event_threshold()),
                })
            })
            .transpose()?,
    };

    let source_selection_criteria = rule
        .source_selection_criteria()
        .map(|s| -> S3Result<_> {
            Ok(SourceSelectionCriteria {
                sse_kms_encrypted_objects: s
                    .sse_kms_encrypted_objects()
                    .map(|o| -> S3Result<_> {
                        Ok(SseKmsEncryptedObjects {
                            status: parse(o.status().as_str())?,
                        })
                    })
                    .transpose()?,
                replica_modifications: s
                    .replica_modifications()
                    .map(|m| -> S3Result<_> {
                        Ok(ReplicaModifications {
                            status: parse(m.status().as_str())?,
                        })
                    })
                    .transpose()?,
            })
        })
        .transpose()?;

    #[allow(deprecated)]
    let prefix = owned(rule.prefix());
    Ok(ReplicationRule {
        id: owned(rule.id()),
        priority: rule.priority(),
        prefix,
        filter: rule.filter().map(|f| ReplicationRuleFilter {
            and: f.and().map(|a| ReplicationRuleAndOperator {
                prefix: owned(a.prefix()),
                tags: from_sdk_tags(a.tags()),
            }),
            prefix: owned(f.prefix()),
            tag: f.tag().map(from_sdk_tag),
        }),
        status: parse(rule.status().as_str())?,
        source_selection_criteria,
        existing_object_replication: rule
            .existing_object_replication()
            .map(|e| -> S3Result<_> {
                Ok(ExistingObjectReplication {
                    status: parse(e.status().as_str())?,
                })
            })
            .transpose()?,
        destination,
        delete_marker_replication: rule
            .delete_marker_replication()
            .map(|d| -> S3Result<_> {
                Ok(DeleteMarkerReplication {
                    status: parse_opt(d.status().map(|s| s.as_str()))?,
                })
            })
            .transpose()?,
    })
}

fn to_sdk_encryption(
    config: &ServerSideEncryptionConfiguration,
) -> S3Result<sdk::ServerSideEncryptionConfiguration> {
    let rules = config
        .rules
        .iter()
        .map(|rule| {
            let default = rule
                .apply_server_side_encryption_by_default
                .as_ref()
                .map(|d| {
                    built(
                        sdk::ServerSideEncryptionByDefault::builder()
                            .sse_algorithm(sdk::ServerSideEncryption::from(d.sse_algorithm.as_str()))
                            .set_kms_master_key_id(d.kms_master_key_id.clone())
                            .build(),
                    )
                })
                .transpose()?;
            built(
                sdk::ServerSideEncryptionRule::builder()
                    .set_apply_server_side_encryption_by_default(default)
                    .set_bucket_key_enabled(rule.bucket_key_enabled)
                    .build(),
            )
        })
        .collect::<S3Result<Vec<_>>>()?;
    built(
        sdk::ServerSideEncryptionConfiguration::builder()
            .set_rules(Some(rules))
            .build(),
    )
}

fn to_sdk_object_lock(config: &ObjectLockConfiguration) -> S3Result<sdk::ObjectLockConfiguration> {
    let rule = config
        .rule
        .as_ref()
        .map(|r| {
            let retention = r
                .default_retention
                .as_ref()
                .map(|d| {
                    built(
                        sdk::DefaultRetention::builder()
                            .set_mode(d.mode.map(|m| sdk::ObjectLockRetentionMode::from(m.as_str())))
                            .set_days(d.days)
                            .set_years(d.years)
                            .build(),
                    )
                })
                .transpose()?;
            built(sdk::ObjectLockRule::builder().set_default_retention(retention).build())
        })
        .transpose()?;
    built(
        sdk::ObjectLockConfiguration::builder()
            .set_object_lock_enabled(
                config
                    .object_lock_enabled
                    .map(|e| sdk::ObjectLockEnabled::from(e.as_str())),
            )
            .set_rule(rule)
            .build(),
    )
}

/// Read object metadata from `HeadObjectOutput` or `GetObjectOutput`.
macro_rules! object_metadata {
    ($output:expr) => {{
        let out = &$output;
        ObjectMetadata {
            headers: ObjectHeaders {
                cache_control: owned(out.cache_control()),
                content_disposition: owned(out.content_disposition()),
                content_encoding: owned(out.content_encoding()),
                content_language: owned(out.content_language()),
                content_type: owned(out.content_type()),
                website_redirect_location: owned(out.website_redirect_location()),
                metadata: out
                    .metadata()
                    .map(|m| {
                        m.iter()
                            .map(|(k, v)| (k.to_lowercase(), v.clone()))
                            .collect::<BTreeMap<_, _>>()
                    })
                    .unwrap_or_default(),
            },
            etag: owned(out.e_tag()),
            version_id: owned(out.version_id()),
            content_length: out.content_length().unwrap_or_default(),
            last_modified: out.last_modified().and_then(from_sdk_time),
            storage_class: parse_opt(out.storage_class().map(|c| c.as_str()))?,
            server_side_encryption: parse_opt(out.server_side_encryption().map(|s| s.as_str()))?,
            kms_key_id: owned(out.ssekms_key_id()),
            bucket_key_enabled: out.bucket_key_enabled(),
            object_lock: ObjectLockSettings {
                legal_hold_status: parse_opt(
                    out.object_lock_legal_hold_status().map(|s| s.as_str()),
                )?,
                mode: parse_opt(out.object_lock_mode().map(|m| m.as_str()))?,
                retain_until_date: out.object_lock_retain_until_date().and_then(from_sdk_time),
            },
            checksums: ObjectChecksums {
                crc32: owned(out.checksum_crc32()),
                crc32c: owned(out.checksum_crc32_c()),
                sha1: owned(out.checksum_sha1()),
                sha256: owned(out.checksum_sha256()),
            },
        }
    }};
}

#[async_trait]
impl S3Api for SdkS3 {
    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    async fn head_bucket(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .head_bucket()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn create_bucket(&self, input: &CreateBucketInput) -> S3Result<()> {
        let configuration = input.location_constraint.as_deref().map(|constraint| {
            sdk::CreateBucketConfiguration::builder()
                .location_constraint(sdk::BucketLocationConstraint::from(constraint))
                .build()
        });
        self.client
            .create_bucket()
            .bucket(&input.bucket)
            .set_acl(input.acl.map(|a| sdk::BucketCannedAcl::from(a.as_str())))
            .set_create_bucket_configuration(configuration)
            .set_object_lock_enabled_for_bucket(input.object_lock_enabled.then_some(true))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_location(&self, target: &BucketTarget) -> S3Result<String> {
        let output = self
            .client
            .get_bucket_location()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output
            .location_constraint()
            .map(|c| c.as_str().to_owned())
            .unwrap_or_default())
    }

    async fn get_bucket_policy(&self, target: &BucketTarget) -> S3Result<String> {
        let output = self
            .client
            .get_bucket_policy()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.policy().unwrap_or_default().to_owned())
    }

    async fn put_bucket_policy(&self, target: &BucketTarget, policy: &str) -> S3Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .policy(policy)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket_policy(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket_policy()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_acl(&self, target: &BucketTarget) -> S3Result<AccessControlPolicy> {
        let output = self
            .client
            .get_bucket_acl()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        let grants = output
            .grants()
            .iter()
            .filter_map(|g| from_sdk_grant(g).transpose())
            .collect::<S3Result<Vec<_>>>()?;
        Ok(AccessControlPolicy {
            grants,
            owner: output.owner().map(|o| Owner {
                display_name: owned(o.display_name()),
                id: owned(o.id()),
            }),
        })
    }

    async fn put_bucket_acl(&self, target: &BucketTarget, acl: &BucketAclInput) -> S3Result<()> {
        let request = self
            .client
            .put_bucket_acl()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone());
        let request = match acl {
            BucketAclInput::Canned(canned) => {
                request.acl(sdk::BucketCannedAcl::from(canned.as_str()))
            }
            BucketAclInput::Policy(policy) => {
                let grants = policy
                    .grants
                    .iter()
                    .map(to_sdk_grant)
                    .collect::<S3Result<Vec<_>>>()?;
                let owner = policy.owner.as_ref().map(|o| {
                    sdk::Owner::builder()
                        .set_display_name(o.display_name.clone())
                        .set_id(o.id.clone())
                        .build()
                });
                let policy = built(
                    sdk::AccessControlPolicy::builder()
                        .set_grants(Some(grants))
                        .set_owner(owner)
                        .build(),
                )?;
                request.access_control_policy(policy)
            }
        };
        request.send().await.map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_cors(&self, target: &BucketTarget) -> S3Result<Vec<CorsRule>> {
        let output = self
            .client
            .get_bucket_cors()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.cors_rules().iter().map(from_sdk_cors_rule).collect())
    }

    async fn put_bucket_cors(&self, target: &BucketTarget, rules: &[CorsRule]) -> S3Result<()> {
        let rules = rules
            .iter()
            .map(to_sdk_cors_rule)
            .collect::<S3Result<Vec<_>>>()?;
        let configuration = built(
            sdk::CorsConfiguration::builder()
                .set_cors_rules(Some(rules))
                .build(),
        )?;
        self.client
            .put_bucket_cors()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .cors_configuration(configuration)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket_cors(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket_cors()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_website(&self, target: &BucketTarget) -> S3Result<WebsiteConfiguration> {
        let output = self
            .client
            .get_bucket_website()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        let routing_rules = output
            .routing_rules()
            .iter()
            .filter_map(|rule| {
                let redirect = rule.redirect()?;
                Some((rule, redirect))
            })
            .map(|(rule, r)| -> S3Result<RoutingRule> {
                Ok(RoutingRule {
                    condition: rule.condition().map(|c| Condition {
                        http_error_code_returned_equals: owned(c.http_error_code_returned_equals()),
                        key_prefix_equals: owned(c.key_prefix_equals()),
                    }),
                    redirect: Redirect {
                        host_name: owned(r.host_name()),
                        http_redirect_code: owned(r.http_redirect_code()),
                        protocol: parse_opt(r.protocol().map(|p| p.as_str()))?,
                        replace_key_prefix_with: owned(r.replace_key_prefix_with()),
                        replace_key_with: owned(r.replace_key_with()),
                    },
                })
            })
            .collect::<S3Result<Vec<_>>>()?;
        Ok(WebsiteConfiguration {
            error_document: output.error_document().map(|d| ErrorDocument {
                key: d.key().to_owned(),
            }),
            index_document: output.index_document().map(|d| IndexDocument {
                suffix: d.suffix().to_owned(),
            }),
            redirect_all_requests_to: output
                .redirect_all_requests_to()
                .map(|r| -> S3Result<_> {
                    Ok(RedirectAllRequestsTo {
                        host_name: r.host_name().to_owned(),
                        protocol: parse_opt(r.protocol().map(|p| p.as_str()))?,
                    })
                })
                .transpose()?,
            routing_rules,
        })
    }

    async fn put_bucket_website(
        &self,
        target: &BucketTarget,
        config: &WebsiteConfiguration,
    ) -> S3Result<()> {
        self.client
            .put_bucket_website()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .website_configuration(to_sdk_website(config)?)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket_website(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket_website()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_versioning(
        &self,
        target: &BucketTarget,
    ) -> S3Result<VersioningConfiguration> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(VersioningConfiguration {
            status: parse_opt(output.status().map(|s| s.as_str()))?,
            mfa_delete: parse_opt(output.mfa_delete().map(|s| s.as_str()))?,
        })
    }

    async fn put_bucket_versioning(
        &self,
        target: &BucketTarget,
        config: &VersioningConfiguration,
        mfa: Option<&str>,
    ) -> S3Result<()> {
        let configuration = built(
            sdk::VersioningConfiguration::builder()
                .set_status(config.status.map(|s| sdk::BucketVersioningStatus::from(s.as_str())))
                .set_mfa_delete(config.mfa_delete.map(|s| sdk::MfaDelete::from(s.as_str())))
                .build(),
        )?;
        self.client
            .put_bucket_versioning()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .versioning_configuration(configuration)
            .set_mfa(owned(mfa))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_accelerate(
        &self,
        target: &BucketTarget,
    ) -> S3Result<Option<BucketAccelerateStatus>> {
        let output = self
            .client
            .get_bucket_accelerate_configuration()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        parse_opt(output.status().map(|s| s.as_str()))
    }

    async fn put_bucket_accelerate(
        &self,
        target: &BucketTarget,
        status: BucketAccelerateStatus,
    ) -> S3Result<()> {
        let configuration = built(
            sdk::AccelerateConfiguration::builder()
                .status(sdk::BucketAccelerateStatus::from(status.as_str()))
                .build(),
        )?;
        self.client
            .put_bucket_accelerate_configuration()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .accelerate_configuration(configuration)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_request_payment(&self, target: &BucketTarget) -> S3Result<Payer> {
        let output = self
            .client
            .get_bucket_request_payment()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(parse_opt(output.payer().map(|p| p.as_str()))?.unwrap_or(Payer::BucketOwner))
    }

    async fn put_bucket_request_payment(
        &self,
        target: &BucketTarget,
        payer: Payer,
    ) -> S3Result<()> {
        let configuration = built(
            sdk::RequestPaymentConfiguration::builder()
                .payer(sdk::Payer::from(payer.as_str()))
                .build(),
        )?;
        self.client
            .put_bucket_request_payment()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .request_payment_configuration(configuration)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_logging(&self, target: &BucketTarget) -> S3Result<Option<LoggingEnabled>> {
        let output = self
            .client
            .get_bucket_logging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.logging_enabled().map(|l| LoggingEnabled {
            target_bucket: l.target_bucket().to_owned(),
            target_prefix: l.target_prefix().to_owned(),
        }))
    }

    async fn put_bucket_logging(
        &self,
        target: &BucketTarget,
        logging: Option<&LoggingEnabled>,
    ) -> S3Result<()> {
        let enabled = logging
            .map(|l| {
                built(
                    sdk::LoggingEnabled::builder()
                        .target_bucket(&l.target_bucket)
                        .target_prefix(&l.target_prefix)
                        .build(),
                )
            })
            .transpose()?;
        let status = built(
            sdk::BucketLoggingStatus::builder()
                .set_logging_enabled(enabled)
                .build(),
        )?;
        self.client
            .put_bucket_logging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .bucket_logging_status(status)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_lifecycle(
        &self,
        target: &BucketTarget,
    ) -> S3Result<LifecycleConfiguration> {
        let output = self
            .client
            .get_bucket_lifecycle_configuration()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(LifecycleConfiguration {
            rules: output
                .rules()
                .iter()
                .map(from_sdk_lifecycle_rule)
                .collect::<S3Result<_>>()?,
            transition_default_minimum_object_size: parse_opt(
                output
                    .transition_default_minimum_object_size()
                    .map(|s| s.as_str()),
            )?,
        })
    }

    async fn put_bucket_lifecycle(
        &self,
        target: &BucketTarget,
        config: &LifecycleConfiguration,
    ) -> S3Result<()> {
        let rules = config
            .rules
            .iter()
            .map(to_sdk_lifecycle_rule)
            .collect::<S3Result<Vec<_>>>()?;
        let configuration = built(
            sdk::BucketLifecycleConfiguration::builder()
                .set_rules(Some(rules))
                .build(),
        )?;
        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .lifecycle_configuration(configuration)
            .set_transition_default_minimum_object_size(
                config
                    .transition_default_minimum_object_size
                    .map(|s| sdk::TransitionDefaultMinimumObjectSize::from(s.as_str())),
            )
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket_lifecycle(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket_lifecycle()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_replication(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ReplicationConfiguration> {
        let output = self
            .client
            .get_bucket_replication()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        let Some(config) = output.replication_configuration() else {
            return Err(S3Error::new(S3ErrorCode::ReplicationConfigurationNotFoundError)
                .with_resource(&target.bucket));
        };
        Ok(ReplicationConfiguration {
            role: config.role().to_owned(),
            rules: config
                .rules()
                .iter()
                .map(from_sdk_replication_rule)
                .collect::<S3Result<_>>()?,
        })
    }

    async fn put_bucket_replication(
        &self,
        target: &BucketTarget,
        config: &ReplicationConfiguration,
        token: Option<&str>,
    ) -> S3Result<()> {
        let rules = config
            .rules
            .iter()
            .map(to_sdk_replication_rule)
            .collect::<S3Result<Vec<_>>>()?;
        let configuration = built(
            sdk::ReplicationConfiguration::builder()
                .role(&config.role)
                .set_rules(Some(rules))
                .build(),
        )?;
        self.client
            .put_bucket_replication()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .replication_configuration(configuration)
            .set_token(owned(token))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket_replication(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket_replication()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_encryption(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ServerSideEncryptionConfiguration> {
        let output = self
            .client
            .get_bucket_encryption()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        let Some(config) = output.server_side_encryption_configuration() else {
            return Err(S3Error::new(
                S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError,
            )
            .with_resource(&target.bucket));
        };
        let rules = config
            .rules()
            .iter()
            .map(|rule| -> S3Result<_> {
                Ok(ServerSideEncryptionRule {
                    apply_server_side_encryption_by_default: rule
                        .apply_server_side_encryption_by_default()
                        .map(|d| -> S3Result<_> {
                            Ok(ServerSideEncryptionByDefault {
                                sse_algorithm: parse(d.sse_algorithm().as_str())?,
                                kms_master_key_id: owned(d.kms_master_key_id()),
                            })
                        })
                        .transpose()?,
                    bucket_key_enabled: rule.bucket_key_enabled(),
                })
            })
            .collect::<S3Result<_>>()?;
        Ok(ServerSideEncryptionConfiguration { rules })
    }

    async fn put_bucket_encryption(
        &self,
        target: &BucketTarget,
        config: &ServerSideEncryptionConfiguration,
    ) -> S3Result<()> {
        self.client
            .put_bucket_encryption()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .server_side_encryption_configuration(to_sdk_encryption(config)?)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket_encryption(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket_encryption()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_object_lock_configuration(
        &self,
        target: &BucketTarget,
    ) -> S3Result<ObjectLockConfiguration> {
        let output = self
            .client
            .get_object_lock_configuration()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        let Some(config) = output.object_lock_configuration() else {
            return Err(S3Error::new(S3ErrorCode::ObjectLockConfigurationNotFoundError)
                .with_resource(&target.bucket));
        };
        Ok(ObjectLockConfiguration {
            object_lock_enabled: parse_opt(config.object_lock_enabled().map(|e| e.as_str()))?,
            rule: config
                .rule()
                .map(|r| -> S3Result<_> {
                    Ok(ObjectLockRule {
                        default_retention: r
                            .default_retention()
                            .map(|d| -> S3Result<_> {
                                Ok(DefaultRetention {
                                    mode: parse_opt(d.mode().map(|m| m.as_str()))?,
                                    days: d.days(),
                                    years: d.years(),
                                })
                            })
                            .transpose()?,
                    })
                })
                .transpose()?,
        })
    }

    async fn put_object_lock_configuration(
        &self,
        target: &BucketTarget,
        config: &ObjectLockConfiguration,
        token: Option<&str>,
    ) -> S3Result<()> {
        self.client
            .put_object_lock_configuration()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .object_lock_configuration(to_sdk_object_lock(config)?)
            .set_token(owned(token))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_public_access_block(
        &self,
        target: &BucketTarget,
    ) -> S3Result<PublicAccessBlockConfiguration> {
        let output = self
            .client
            .get_public_access_block()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        let Some(config) = output.public_access_block_configuration() else {
            return Err(S3Error::new(S3ErrorCode::NoSuchPublicAccessBlockConfiguration)
                .with_resource(&target.bucket));
        };
        Ok(PublicAccessBlockConfiguration {
            block_public_acls: config.block_public_acls(),
            block_public_policy: config.block_public_policy(),
            ignore_public_acls: config.ignore_public_acls(),
            restrict_public_buckets: config.restrict_public_buckets(),
        })
    }

    async fn put_public_access_block(
        &self,
        target: &BucketTarget,
        config: &PublicAccessBlockConfiguration,
    ) -> S3Result<()> {
        let configuration = built(
            sdk::PublicAccessBlockConfiguration::builder()
                .set_block_public_acls(config.block_public_acls)
                .set_block_public_policy(config.block_public_policy)
                .set_ignore_public_acls(config.ignore_public_acls)
                .set_restrict_public_buckets(config.restrict_public_buckets)
                .build(),
        )?;
        self.client
            .put_public_access_block()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .public_access_block_configuration(configuration)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_public_access_block(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_public_access_block()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_bucket_tagging(&self, target: &BucketTarget) -> S3Result<Vec<Tag>> {
        let output = self
            .client
            .get_bucket_tagging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(from_sdk_tags(output.tag_set()))
    }

    async fn put_bucket_tagging(&self, target: &BucketTarget, tags: &[Tag]) -> S3Result<()> {
        self.client
            .put_bucket_tagging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .tagging(to_sdk_tagging(tags)?)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_bucket_tagging(&self, target: &BucketTarget) -> S3Result<()> {
        self.client
            .delete_bucket_tagging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    async fn put_object(&self, input: &PutObjectInput) -> S3Result<PutObjectOutput> {
        let headers = &input.headers;
        let lock = &input.object_lock;
        let output = self
            .client
            .put_object()
            .bucket(&input.bucket)
            .set_expected_bucket_owner(input.expected_bucket_owner.clone())
            .key(&input.key)
            .body(ByteStream::from(input.body.clone()))
            .set_cache_control(headers.cache_control.clone())
            .set_content_disposition(headers.content_disposition.clone())
            .set_content_encoding(headers.content_encoding.clone())
            .set_content_language(headers.content_language.clone())
            .set_content_type(headers.content_type.clone())
            .set_website_redirect_location(headers.website_redirect_location.clone())
            .set_metadata(
                (!headers.metadata.is_empty())
                    .then(|| headers.metadata.clone().into_iter().collect()),
            )
            .set_acl(input.acl.map(|a| sdk::ObjectCannedAcl::from(a.as_str())))
            .set_storage_class(input.storage_class.map(|c| sdk::StorageClass::from(c.as_str())))
            .set_server_side_encryption(
                input
                    .server_side_encryption
                    .map(|s| sdk::ServerSideEncryption::from(s.as_str())),
            )
            .set_ssekms_key_id(input.kms_key_id.clone())
            .set_bucket_key_enabled(input.bucket_key_enabled)
            .set_tagging(input.tagging.clone())
            .set_object_lock_legal_hold_status(
                lock.legal_hold_status
                    .map(|s| sdk::ObjectLockLegalHoldStatus::from(s.as_str())),
            )
            .set_object_lock_mode(lock.mode.map(|m| sdk::ObjectLockMode::from(m.as_str())))
            .set_object_lock_retain_until_date(lock.retain_until_date.as_ref().map(to_sdk_time))
            .set_checksum_algorithm(
                input
                    .checksum_algorithm
                    .map(|a| sdk::ChecksumAlgorithm::from(a.as_str())),
            )
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(PutObjectOutput {
            etag: owned(output.e_tag()),
            version_id: owned(output.version_id()),
        })
    }

    async fn head_object(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<ObjectMetadata> {
        let output = self
            .client
            .head_object()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .set_version_id(owned(version_id))
            .checksum_mode(sdk::ChecksumMode::Enabled)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(object_metadata!(output))
    }

    async fn get_object(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<ObjectContent> {
        let output = self
            .client
            .get_object()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .set_version_id(owned(version_id))
            .send()
            .await
            .map_err(sdk_error)?;
        let metadata = object_metadata!(output);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| S3Error::internal_error(e.to_string()).with_source(e))?
            .into_bytes();
        Ok(ObjectContent { metadata, body })
    }

    async fn delete_object(
        &self,
        target: &BucketTarget,
        input: &DeleteObjectInput,
    ) -> S3Result<DeleteObjectOutput> {
        let output = self
            .client
            .delete_object()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(&input.key)
            .set_version_id(input.version_id.clone())
            .set_bypass_governance_retention(input.bypass_governance_retention.then_some(true))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(DeleteObjectOutput {
            delete_marker: output.delete_marker().unwrap_or_default(),
            version_id: owned(output.version_id()),
        })
    }

    async fn delete_objects(
        &self,
        target: &BucketTarget,
        objects: &[ObjectIdentifier],
        bypass_governance_retention: bool,
    ) -> S3Result<Vec<DeleteObjectsError>> {
        let identifiers = objects
            .iter()
            .map(|o| {
                built(
                    sdk::ObjectIdentifier::builder()
                        .key(&o.key)
                        .set_version_id(o.version_id.clone())
                        .build(),
                )
            })
            .collect::<S3Result<Vec<_>>>()?;
        let delete = built(
            sdk::Delete::builder()
                .set_objects(Some(identifiers))
                .quiet(true)
                .build(),
        )?;
        let output = self
            .client
            .delete_objects()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .delete(delete)
            .set_bypass_governance_retention(bypass_governance_retention.then_some(true))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output
            .errors()
            .iter()
            .map(|e| DeleteObjectsError {
                key: e.key().unwrap_or_default().to_owned(),
                version_id: owned(e.version_id()),
                code: e.code().unwrap_or_default().to_owned(),
                message: e.message().unwrap_or_default().to_owned(),
            })
            .collect())
    }

    async fn list_object_versions(
        &self,
        target: &BucketTarget,
        prefix: Option<&str>,
        key_marker: Option<&str>,
        version_id_marker: Option<&str>,
    ) -> S3Result<ObjectVersionPage> {
        let output = self
            .client
            .list_object_versions()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .set_prefix(owned(prefix))
            .set_key_marker(owned(key_marker))
            .set_version_id_marker(owned(version_id_marker))
            .send()
            .await
            .map_err(sdk_error)?;

        let versions = output.versions().iter().map(|v| ObjectVersion {
            key: v.key().unwrap_or_default().to_owned(),
            version_id: v.version_id().unwrap_or("null").to_owned(),
            is_delete_marker: false,
            is_latest: v.is_latest().unwrap_or_default(),
        });
        let markers = output.delete_markers().iter().map(|m| ObjectVersion {
            key: m.key().unwrap_or_default().to_owned(),
            version_id: m.version_id().unwrap_or("null").to_owned(),
            is_delete_marker: true,
            is_latest: m.is_latest().unwrap_or_default(),
        });
        let mut all: Vec<ObjectVersion> = versions.chain(markers).collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));

        let is_truncated = output.is_truncated().unwrap_or_default();
        Ok(ObjectVersionPage {
            versions: all,
            next_key_marker: is_truncated.then(|| owned(output.next_key_marker())).flatten(),
            next_version_id_marker: is_truncated
                .then(|| owned(output.next_version_id_marker()))
                .flatten(),
            is_truncated,
        })
    }

    async fn get_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<Vec<Tag>> {
        let output = self
            .client
            .get_object_tagging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .set_version_id(owned(version_id))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(from_sdk_tags(output.tag_set()))
    }

    async fn put_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        tags: &[Tag],
    ) -> S3Result<()> {
        self.client
            .put_object_tagging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .set_version_id(owned(version_id))
            .tagging(to_sdk_tagging(tags)?)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_object_tagging(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
    ) -> S3Result<()> {
        self.client
            .delete_object_tagging()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .set_version_id(owned(version_id))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn put_object_acl(
        &self,
        target: &BucketTarget,
        key: &str,
        acl: ObjectCannedAcl,
    ) -> S3Result<()> {
        self.client
            .put_object_acl()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .acl(sdk::ObjectCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn put_object_legal_hold(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        status: ObjectLockLegalHoldStatus,
    ) -> S3Result<()> {
        let hold = built(
            sdk::ObjectLockLegalHold::builder()
                .status(sdk::ObjectLockLegalHoldStatus::from(status.as_str()))
                .build(),
        )?;
        self.client
            .put_object_legal_hold()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .set_version_id(owned(version_id))
            .legal_hold(hold)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn put_object_retention(
        &self,
        target: &BucketTarget,
        key: &str,
        version_id: Option<&str>,
        retention: &ObjectRetention,
        bypass_governance_retention: bool,
    ) -> S3Result<()> {
        let value = built(
            sdk::ObjectLockRetention::builder()
                .set_mode(
                    retention
                        .mode
                        .map(|m| sdk::ObjectLockRetentionMode::from(m.as_str())),
                )
                .set_retain_until_date(retention.retain_until_date.as_ref().map(to_sdk_time))
                .build(),
        )?;
        self.client
            .put_object_retention()
            .bucket(&target.bucket)
            .set_expected_bucket_owner(target.expected_bucket_owner.clone())
            .key(key)
            .set_version_id(owned(version_id))
            .retention(value)
            .set_bypass_governance_retention(bypass_governance_retention.then_some(true))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::types::{ExpirationStatus, TransitionStorageClass};

    use super::*;

    #[test]
    fn test_should_round_trip_lifecycle_rule_through_sdk_shapes() {
        let rule = LifecycleRule {
            id: Some("archive".to_owned()),
            prefix: None,
            filter: Some(LifecycleRuleFilter {
                prefix: Some("logs/".to_owned()),
                ..LifecycleRuleFilter::default()
            }),
            status: ExpirationStatus::Enabled,
            expiration: Some(LifecycleExpiration {
                days: Some(90),
                ..LifecycleExpiration::default()
            }),
            transitions: vec![Transition {
                date: None,
                days: Some(30),
                storage_class: Some(TransitionStorageClass::Glacier),
            }],
            noncurrent_version_transitions: Vec::new(),
            noncurrent_version_expiration: None,
            abort_incomplete_multipart_upload: None,
        };
        let sdk_rule = to_sdk_lifecycle_rule(&rule).unwrap();
        assert_eq!(sdk_rule.status().as_str(), "Enabled");
        assert_eq!(from_sdk_lifecycle_rule(&sdk_rule).unwrap(), rule);
    }

    #[test]
    fn test_should_convert_timestamps_to_millisecond_precision() {
        let time = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(from_sdk_time(&to_sdk_time(&time)), Some(time));
    }

    #[test]
    fn test_should_convert_grants() {
        let grant = Grant {
            grantee: Grantee {
                display_name: None,
                email_address: None,
                id: None,
                r#type: tfs3_model::types::GranteeType::Group,
                uri: Some("http://acs.amazonaws.com/groups/s3/LogDelivery".to_owned()),
            },
            permission: tfs3_model::types::Permission::Write,
        };
        let sdk_grant = to_sdk_grant(&grant).unwrap();
        assert_eq!(from_sdk_grant(&sdk_grant).unwrap(), Some(grant));
    }
}
