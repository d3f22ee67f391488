//! Conversions between the `aws_s3_bucket` blocks and S3 API shapes.

use std::collections::BTreeMap;

use tfs3_model::types::{
    AbortIncompleteMultipartUpload, AccessControlPolicy, AccessControlTranslation,
    BucketVersioningStatus, CorsRule, DefaultRetention, DeleteMarkerReplication,
    DeleteMarkerReplicationStatus, Destination, EncryptionConfiguration, ErrorDocument,
    ExpirationStatus, Grant, Grantee, IndexDocument, LifecycleExpiration, LifecycleRule,
    LifecycleRuleAndOperator, LifecycleRuleFilter, LoggingEnabled, MfaDeleteStatus, Metrics,
    NoncurrentVersionExpiration, NoncurrentVersionTransition, ObjectLockConfiguration,
    ObjectLockRule, Protocol, RedirectAllRequestsTo, ReplicationConfiguration, ReplicationRule,
    ReplicationRuleAndOperator, ReplicationRuleFilter, ReplicationTime, ReplicationTimeValue,
    ServerSideEncryptionByDefault, ServerSideEncryptionConfiguration, ServerSideEncryptionRule,
    SourceSelectionCriteria, SseKmsEncryptedObjects, SseKmsEncryptedObjectsStatus, Tag,
    Transition, VersioningConfiguration, WebsiteConfiguration,
};

use super::model::{
    AccessControlTranslationModel, CorsRuleModel, DefaultRetentionModel, DestinationModel,
    GrantModel, LifecycleExpirationModel, LifecycleRuleModel, LoggingModel, MetricsModel,
    NoncurrentVersionExpirationModel, NoncurrentVersionTransitionModel,
    ObjectLockConfigurationModel, ObjectLockRuleModel, ReplicationConfigurationModel,
    ReplicationFilterModel, ReplicationRuleModel, ReplicationTimeModel,
    SourceSelectionCriteriaModel, SseByDefaultModel, SseConfigurationModel,
    SseKmsEncryptedObjectsModel, SseRuleModel, TransitionModel, VersioningModel, WebsiteModel,
};
use crate::error::{ProviderError, ProviderResult};
use crate::names::prefixed_unique_id;
use crate::policy::{normalize_routing_rules, parse_routing_rules};
use crate::tags::KeyValueTags;
use crate::validation::{
    format_lifecycle_timestamp, parse_enum, valid_lifecycle_timestamp, validate_len,
};

/// Prefix of generated lifecycle rule IDs.
const LIFECYCLE_RULE_ID_PREFIX: &str = "tf-s3-lifecycle-";

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Filter tags without AWS-reserved keys.
fn user_tags(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    KeyValueTags::from(tags).ignore_aws().to_s3()
}

fn tags_map(tags: &[Tag]) -> BTreeMap<String, String> {
    KeyValueTags::from_s3(tags).ignore_aws().map()
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

pub(super) fn expand_cors_rules(rules: &[CorsRuleModel]) -> Vec<CorsRule> {
    rules
        .iter()
        .map(|r| CorsRule {
            id: None,
            allowed_headers: r.allowed_headers.clone(),
            allowed_methods: r.allowed_methods.clone(),
            allowed_origins: r.allowed_origins.clone(),
            expose_headers: r.expose_headers.clone(),
            max_age_seconds: r.max_age_seconds,
        })
        .collect()
}

pub(super) fn flatten_cors_rules(rules: Vec<CorsRule>) -> Vec<CorsRuleModel> {
    rules
        .into_iter()
        .map(|r| CorsRuleModel {
            allowed_headers: r.allowed_headers,
            allowed_methods: r.allowed_methods,
            allowed_origins: r.allowed_origins,
            expose_headers: r.expose_headers,
            max_age_seconds: r.max_age_seconds,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Website
// ---------------------------------------------------------------------------

/// Split `scheme://host/path?query#fragment` into the protocol and
/// everything between the scheme and the fragment.
fn split_redirect_url(value: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = value.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
    Some((scheme, rest))
}

pub(super) fn expand_website(website: &WebsiteModel) -> ProviderResult<WebsiteConfiguration> {
    let mut config = WebsiteConfiguration {
        index_document: non_empty(website.index_document.as_ref())
            .map(|suffix| IndexDocument { suffix }),
        error_document: non_empty(website.error_document.as_ref()).map(|key| ErrorDocument { key }),
        ..WebsiteConfiguration::default()
    };

    if let Some(redirect) = non_empty(website.redirect_all_requests_to.as_ref()) {
        config.redirect_all_requests_to = Some(match split_redirect_url(&redirect) {
            Some((scheme, host_name)) => RedirectAllRequestsTo {
                host_name: host_name.to_owned(),
                protocol: Some(parse_enum::<Protocol>(
                    "website.redirect_all_requests_to",
                    scheme,
                )?),
            },
            None => RedirectAllRequestsTo {
                host_name: redirect,
                protocol: None,
            },
        });
    }

    if let Some(rules) = non_empty(website.routing_rules.as_ref()) {
        config.routing_rules = parse_routing_rules(&rules)?;
    }

    Ok(config)
}

pub(super) fn flatten_website(config: &WebsiteConfiguration) -> ProviderResult<WebsiteModel> {
    let routing_rules = if config.routing_rules.is_empty() {
        None
    } else {
        Some(normalize_routing_rules(&config.routing_rules)?)
    };
    Ok(WebsiteModel {
        index_document: config.index_document.as_ref().map(|d| d.suffix.clone()),
        error_document: config.error_document.as_ref().map(|d| d.key.clone()),
        redirect_all_requests_to: config.redirect_all_requests_to.as_ref().map(|r| {
            match r.protocol {
                Some(protocol) => format!("{protocol}://{}", r.host_name),
                None => r.host_name.clone(),
            }
        }),
        routing_rules,
    })
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Versioning for a new bucket: `None` when nothing needs to be enabled.
pub(super) fn expand_versioning_create(v: &VersioningModel) -> Option<VersioningConfiguration> {
    let config = VersioningConfiguration {
        status: v.enabled.then_some(BucketVersioningStatus::Enabled),
        mfa_delete: v.mfa_delete.then_some(MfaDeleteStatus::Enabled),
    };
    (config.status.is_some() || config.mfa_delete.is_some()).then_some(config)
}

/// Versioning for an existing bucket, with every field explicit.
pub(super) fn expand_versioning_update(v: &VersioningModel) -> VersioningConfiguration {
    VersioningConfiguration {
        status: Some(if v.enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        }),
        mfa_delete: Some(if v.mfa_delete {
            MfaDeleteStatus::Enabled
        } else {
            MfaDeleteStatus::Disabled
        }),
    }
}

pub(super) fn flatten_versioning(config: &VersioningConfiguration) -> VersioningModel {
    VersioningModel {
        enabled: config.status == Some(BucketVersioningStatus::Enabled),
        mfa_delete: config.mfa_delete == Some(MfaDeleteStatus::Enabled),
    }
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

/// One S3 grant per permission.
pub(super) fn expand_grants(grants: &[GrantModel]) -> Vec<Grant> {
    grants
        .iter()
        .flat_map(|g| {
            g.permissions.iter().map(move |permission| Grant {
                grantee: Grantee {
                    display_name: None,
                    email_address: None,
                    id: non_empty(g.id.as_ref()),
                    r#type: g.r#type,
                    uri: non_empty(g.uri.as_ref()),
                },
                permission: *permission,
            })
        })
        .collect()
}

/// Group S3 grants by grantee, collecting permissions.
pub(super) fn flatten_grants(policy: &AccessControlPolicy) -> Vec<GrantModel> {
    let mut results: Vec<GrantModel> = Vec::with_capacity(policy.grants.len());
    for grant in &policy.grants {
        let grantee = &grant.grantee;
        match results.iter_mut().find(|g| {
            g.r#type == grantee.r#type && g.id == grantee.id && g.uri == grantee.uri
        }) {
            Some(existing) => {
                if !existing.permissions.contains(&grant.permission) {
                    existing.permissions.push(grant.permission);
                }
            }
            None => results.push(GrantModel {
                id: grantee.id.clone(),
                r#type: grantee.r#type,
                uri: grantee.uri.clone(),
                permissions: vec![grant.permission],
            }),
        }
    }
    sort_grants(&mut results);
    results
}

/// Put grants into a canonical order so that grant sets compare equal
/// regardless of the order they were written in.
pub(super) fn sort_grants(grants: &mut [GrantModel]) {
    for g in grants.iter_mut() {
        g.permissions.sort_by_key(|p| p.as_str());
        g.permissions.dedup();
    }
    grants.sort_by(|a, b| {
        (a.r#type.as_str(), &a.id, &a.uri).cmp(&(b.r#type.as_str(), &b.id, &b.uri))
    });
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

pub(super) fn expand_logging(logging: &LoggingModel) -> LoggingEnabled {
    LoggingEnabled {
        target_bucket: logging.target_bucket.clone(),
        target_prefix: logging.target_prefix.clone(),
    }
}

pub(super) fn flatten_logging(logging: Option<LoggingEnabled>) -> Vec<LoggingModel> {
    logging
        .map(|l| LoggingModel {
            target_bucket: l.target_bucket,
            target_prefix: l.target_prefix,
        })
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

fn expand_lifecycle_expiration(e: &LifecycleExpirationModel) -> ProviderResult<LifecycleExpiration> {
    let mut expiration = LifecycleExpiration::default();
    if let Some(date) = non_empty(e.date.as_ref()) {
        expiration.date = Some(valid_lifecycle_timestamp(&date)?);
    } else if let Some(days) = e.days.filter(|d| *d > 0) {
        expiration.days = Some(days);
    } else if let Some(marker) = e.expired_object_delete_marker {
        expiration.expired_object_delete_marker = Some(marker);
    }
    Ok(expiration)
}

pub(super) fn expand_lifecycle_rules(rules: &[LifecycleRuleModel]) -> ProviderResult<Vec<LifecycleRule>> {
    rules
        .iter()
        .map(|r| {
            let id = match non_empty(r.id.as_ref()) {
                Some(id) => {
                    validate_len("lifecycle_rule.id", &id, 0, 255)?;
                    id
                }
                None => prefixed_unique_id(LIFECYCLE_RULE_ID_PREFIX),
            };
            let prefix = r.prefix.clone().unwrap_or_default();
            let tags = user_tags(&r.tags);
            let filter = if tags.is_empty() {
                LifecycleRuleFilter {
                    prefix: Some(prefix),
                    ..LifecycleRuleFilter::default()
                }
            } else {
                LifecycleRuleFilter {
                    and: Some(LifecycleRuleAndOperator {
                        prefix: Some(prefix),
                        tags,
                        ..LifecycleRuleAndOperator::default()
                    }),
                    ..LifecycleRuleFilter::default()
                }
            };

            let mut rule = LifecycleRule {
                id: Some(id),
                prefix: None,
                filter: Some(filter),
                status: if r.enabled {
                    ExpirationStatus::Enabled
                } else {
                    ExpirationStatus::Disabled
                },
                expiration: r
                    .expiration
                    .first()
                    .map(expand_lifecycle_expiration)
                    .transpose()?,
                transitions: r
                    .transition
                    .iter()
                    .map(|t| {
                        let mut transition = Transition {
                            storage_class: Some(t.storage_class),
                            ..Transition::default()
                        };
                        if let Some(date) = non_empty(t.date.as_ref()) {
                            transition.date = Some(valid_lifecycle_timestamp(&date)?);
                        } else if let Some(days) = t.days.filter(|d| *d >= 0) {
                            transition.days = Some(days);
                        }
                        Ok(transition)
                    })
                    .collect::<ProviderResult<_>>()?,
                noncurrent_version_transitions: r
                    .noncurrent_version_transition
                    .iter()
                    .map(|t| NoncurrentVersionTransition {
                        noncurrent_days: t.days,
                        newer_noncurrent_versions: None,
                        storage_class: Some(t.storage_class),
                    })
                    .collect(),
                noncurrent_version_expiration: r.noncurrent_version_expiration.first().and_then(
                    |e| {
                        e.days.filter(|d| *d > 0).map(|days| NoncurrentVersionExpiration {
                            noncurrent_days: Some(days),
                            newer_noncurrent_versions: None,
                        })
                    },
                ),
                abort_incomplete_multipart_upload: r
                    .abort_incomplete_multipart_upload_days
                    .filter(|d| *d > 0)
                    .map(|days| AbortIncompleteMultipartUpload {
                        days_after_initiation: Some(days),
                    }),
            };

            // S3 rejects a rule without any action.
            if rule.expiration.is_none()
                && rule.transitions.is_empty()
                && rule.noncurrent_version_transitions.is_empty()
                && rule.noncurrent_version_expiration.is_none()
                && rule.abort_incomplete_multipart_upload.is_none()
            {
                rule.expiration = Some(LifecycleExpiration {
                    expired_object_delete_marker: Some(false),
                    ..LifecycleExpiration::default()
                });
            }
            Ok(rule)
        })
        .collect()
}

pub(super) fn flatten_lifecycle_rules(rules: &[LifecycleRule]) -> Vec<LifecycleRuleModel> {
    rules
        .iter()
        .map(|r| {
            let mut model = LifecycleRuleModel {
                id: r.id.clone(),
                enabled: r.status == ExpirationStatus::Enabled,
                abort_incomplete_multipart_upload_days: r
                    .abort_incomplete_multipart_upload
                    .as_ref()
                    .and_then(|a| a.days_after_initiation),
                expiration: r
                    .expiration
                    .iter()
                    .map(|e| LifecycleExpirationModel {
                        date: e.date.as_ref().map(format_lifecycle_timestamp),
                        days: e.days,
                        expired_object_delete_marker: e.expired_object_delete_marker,
                    })
                    .collect(),
                noncurrent_version_expiration: r
                    .noncurrent_version_expiration
                    .iter()
                    .map(|e| NoncurrentVersionExpirationModel {
                        days: e.noncurrent_days,
                    })
                    .collect(),
                noncurrent_version_transition: r
                    .noncurrent_version_transitions
                    .iter()
                    .filter_map(|t| {
                        t.storage_class.map(|storage_class| NoncurrentVersionTransitionModel {
                            days: t.noncurrent_days,
                            storage_class,
                        })
                    })
                    .collect(),
                transition: r
                    .transitions
                    .iter()
                    .filter_map(|t| {
                        t.storage_class.map(|storage_class| TransitionModel {
                            date: t.date.as_ref().map(format_lifecycle_timestamp),
                            days: t.days,
                            storage_class,
                        })
                    })
                    .collect(),
                ..LifecycleRuleModel::default()
            };

            if let Some(filter) = &r.filter {
                if let Some(and) = &filter.and {
                    model.prefix.clone_from(&and.prefix);
                    model.tags = tags_map(&and.tags);
                }
                if let Some(prefix) = &filter.prefix {
                    model.prefix = Some(prefix.clone());
                }
                if let Some(tag) = &filter.tag {
                    model.tags = tags_map(std::slice::from_ref(tag));
                }
            }
            if let Some(prefix) = &r.prefix {
                model.prefix = Some(prefix.clone());
            }
            model
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Replication
// ---------------------------------------------------------------------------

fn expand_destination(d: &DestinationModel) -> Destination {
    Destination {
        bucket: d.bucket.clone(),
        account: non_empty(d.account_id.as_ref()),
        storage_class: d.storage_class,
        access_control_translation: d
            .access_control_translation
            .first()
            .map(|t| AccessControlTranslation { owner: t.owner }),
        encryption_configuration: non_empty(d.replica_kms_key_id.as_ref()).map(|key| {
            EncryptionConfiguration {
                replica_kms_key_id: Some(key),
            }
        }),
        replication_time: d.replication_time.first().map(|t| ReplicationTime {
            status: t.status,
            time: Some(ReplicationTimeValue {
                minutes: Some(t.minutes),
            }),
        }),
        metrics: d.metrics.first().map(|m| Metrics {
            status: m.status,
            event_threshold: Some(ReplicationTimeValue {
                minutes: Some(m.minutes),
            }),
        }),
    }
}

fn expand_replication_rule(r: &ReplicationRuleModel) -> ProviderResult<ReplicationRule> {
    if let Some(id) = &r.id {
        validate_len("replication_configuration.rules.id", id, 0, 255)?;
    }

    let mut rule = ReplicationRule {
        id: non_empty(r.id.as_ref()),
        priority: None,
        prefix: None,
        filter: None,
        status: r.status,
        source_selection_criteria: r.source_selection_criteria.first().map(|c| {
            SourceSelectionCriteria {
                sse_kms_encrypted_objects: c.sse_kms_encrypted_objects.first().map(|o| {
                    SseKmsEncryptedObjects {
                        status: if o.enabled {
                            SseKmsEncryptedObjectsStatus::Enabled
                        } else {
                            SseKmsEncryptedObjectsStatus::Disabled
                        },
                    }
                }),
                replica_modifications: None,
            }
        }),
        existing_object_replication: None,
        destination: r.destination.first().map(expand_destination).unwrap_or_default(),
        delete_marker_replication: None,
    };

    match r.filter.first() {
        // Schema V2.
        Some(filter) => {
            let prefix = filter.prefix.clone().unwrap_or_default();
            let tags = user_tags(&filter.tags);
            rule.filter = Some(if tags.is_empty() {
                ReplicationRuleFilter {
                    prefix: Some(prefix),
                    ..ReplicationRuleFilter::default()
                }
            } else {
                ReplicationRuleFilter {
                    and: Some(ReplicationRuleAndOperator {
                        prefix: Some(prefix),
                        tags,
                    }),
                    ..ReplicationRuleFilter::default()
                }
            });
            rule.priority = Some(r.priority.unwrap_or_default());
            rule.delete_marker_replication = Some(DeleteMarkerReplication {
                status: Some(
                    r.delete_marker_replication_status
                        .unwrap_or(DeleteMarkerReplicationStatus::Disabled),
                ),
            });
        }
        // Schema V1.
        None => rule.prefix = Some(r.prefix.clone().unwrap_or_default()),
    }
    Ok(rule)
}

pub(super) fn expand_replication(
    config: &ReplicationConfigurationModel,
) -> ProviderResult<ReplicationConfiguration> {
    Ok(ReplicationConfiguration {
        role: config.role.clone(),
        rules: config
            .rules
            .iter()
            .map(expand_replication_rule)
            .collect::<ProviderResult<_>>()?,
    })
}

fn flatten_destination(d: &Destination) -> DestinationModel {
    DestinationModel {
        access_control_translation: d
            .access_control_translation
            .iter()
            .map(|t| AccessControlTranslationModel { owner: t.owner })
            .collect(),
        account_id: d.account.clone(),
        bucket: d.bucket.clone(),
        metrics: d
            .metrics
            .iter()
            .map(|m| MetricsModel {
                minutes: m
                    .event_threshold
                    .as_ref()
                    .and_then(|t| t.minutes)
                    .unwrap_or_default(),
                status: m.status,
            })
            .collect(),
        replica_kms_key_id: d
            .encryption_configuration
            .as_ref()
            .and_then(|e| e.replica_kms_key_id.clone()),
        replication_time: d
            .replication_time
            .iter()
            .map(|t| ReplicationTimeModel {
                minutes: t.time.as_ref().and_then(|t| t.minutes).unwrap_or_default(),
                status: t.status,
            })
            .collect(),
        storage_class: d.storage_class,
    }
}

pub(super) fn flatten_replication(config: &ReplicationConfiguration) -> ReplicationConfigurationModel {
    ReplicationConfigurationModel {
        role: config.role.clone(),
        rules: config
            .rules
            .iter()
            .map(|r| ReplicationRuleModel {
                delete_marker_replication_status: r
                    .delete_marker_replication
                    .as_ref()
                    .and_then(|d| d.status)
                    .filter(|s| *s == DeleteMarkerReplicationStatus::Enabled),
                destination: vec![flatten_destination(&r.destination)],
                filter: r
                    .filter
                    .iter()
                    .map(|f| {
                        let mut filter = ReplicationFilterModel::default();
                        if let Some(and) = &f.and {
                            filter.prefix.clone_from(&and.prefix);
                            filter.tags = tags_map(&and.tags);
                        }
                        if let Some(prefix) = &f.prefix {
                            filter.prefix = Some(prefix.clone());
                        }
                        if let Some(tag) = &f.tag {
                            filter.tags = tags_map(std::slice::from_ref(tag));
                        }
                        filter
                    })
                    .collect(),
                id: r.id.clone(),
                prefix: r.prefix.clone(),
                priority: r.priority,
                source_selection_criteria: r
                    .source_selection_criteria
                    .iter()
                    .map(|c| SourceSelectionCriteriaModel {
                        sse_kms_encrypted_objects: c
                            .sse_kms_encrypted_objects
                            .iter()
                            .map(|o| SseKmsEncryptedObjectsModel {
                                enabled: o.status == SseKmsEncryptedObjectsStatus::Enabled,
                            })
                            .collect(),
                    })
                    .collect(),
                status: r.status,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Server-side encryption
// ---------------------------------------------------------------------------

pub(super) fn expand_sse(config: &SseConfigurationModel) -> ServerSideEncryptionConfiguration {
    ServerSideEncryptionConfiguration {
        rules: config
            .rule
            .iter()
            .map(|r| ServerSideEncryptionRule {
                apply_server_side_encryption_by_default: r
                    .apply_server_side_encryption_by_default
                    .first()
                    .map(|d| ServerSideEncryptionByDefault {
                        sse_algorithm: d.sse_algorithm,
                        kms_master_key_id: non_empty(d.kms_master_key_id.as_ref()),
                    }),
                bucket_key_enabled: r.bucket_key_enabled,
            })
            .collect(),
    }
}

pub(super) fn flatten_sse(config: &ServerSideEncryptionConfiguration) -> SseConfigurationModel {
    SseConfigurationModel {
        rule: config
            .rules
            .iter()
            .map(|r| SseRuleModel {
                apply_server_side_encryption_by_default: r
                    .apply_server_side_encryption_by_default
                    .iter()
                    .map(|d| SseByDefaultModel {
                        kms_master_key_id: d.kms_master_key_id.clone(),
                        sse_algorithm: d.sse_algorithm,
                    })
                    .collect(),
                bucket_key_enabled: r.bucket_key_enabled,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Object lock
// ---------------------------------------------------------------------------

pub(super) fn expand_object_lock(config: &ObjectLockConfigurationModel) -> ObjectLockConfiguration {
    ObjectLockConfiguration {
        object_lock_enabled: config.object_lock_enabled,
        rule: config
            .rule
            .first()
            .and_then(|r| r.default_retention.first())
            .map(|d| ObjectLockRule {
                default_retention: Some(DefaultRetention {
                    mode: d.mode,
                    days: d.days.filter(|v| *v > 0),
                    years: d.years.filter(|v| *v > 0),
                }),
            }),
    }
}

pub(super) fn flatten_object_lock(config: &ObjectLockConfiguration) -> ObjectLockConfigurationModel {
    ObjectLockConfigurationModel {
        object_lock_enabled: config.object_lock_enabled,
        rule: config
            .rule
            .as_ref()
            .and_then(|r| r.default_retention.as_ref())
            .map(|d| ObjectLockRuleModel {
                default_retention: vec![DefaultRetentionModel {
                    days: d.days,
                    mode: d.mode,
                    years: d.years,
                }],
            })
            .into_iter()
            .collect(),
    }
}

/// Replication needs versioning enabled on the source bucket.
pub(super) fn require_versioning_for_replication(
    bucket: &str,
    versioning: Option<&VersioningModel>,
) -> ProviderResult<()> {
    if versioning.is_some_and(|v| v.enabled) {
        Ok(())
    } else {
        Err(ProviderError::validation(format!(
            "versioning must be enabled on S3 Bucket ({bucket}) to allow replication"
        )))
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::types::{GranteeType, Permission, ReplicationRuleStatus, TransitionStorageClass};

    use super::*;

    #[test]
    fn test_should_split_redirect_urls_into_protocol_and_host() {
        let website = WebsiteModel {
            index_document: Some("index.html".to_owned()),
            redirect_all_requests_to: Some("https://example.com/docs?lang=en#top".to_owned()),
            ..WebsiteModel::default()
        };
        let config = expand_website(&website).unwrap();
        let redirect = config.redirect_all_requests_to.clone().unwrap();
        assert_eq!(redirect.host_name, "example.com/docs?lang=en");
        assert_eq!(redirect.protocol, Some(Protocol::Https));

        let flat = flatten_website(&config).unwrap();
        assert_eq!(
            flat.redirect_all_requests_to.as_deref(),
            Some("https://example.com/docs?lang=en")
        );
        assert_eq!(flat.index_document.as_deref(), Some("index.html"));

        let plain = expand_website(&WebsiteModel {
            redirect_all_requests_to: Some("example.com".to_owned()),
            ..WebsiteModel::default()
        })
        .unwrap();
        assert_eq!(
            plain.redirect_all_requests_to.unwrap().protocol,
            None::<Protocol>
        );
    }

    #[test]
    fn test_should_only_version_new_buckets_when_needed() {
        assert!(expand_versioning_create(&VersioningModel::default()).is_none());
        let config = expand_versioning_create(&VersioningModel {
            enabled: true,
            mfa_delete: false,
        })
        .unwrap();
        assert_eq!(config.status, Some(BucketVersioningStatus::Enabled));
        assert_eq!(config.mfa_delete, None);

        let update = expand_versioning_update(&VersioningModel::default());
        assert_eq!(update.status, Some(BucketVersioningStatus::Suspended));
        assert_eq!(update.mfa_delete, Some(MfaDeleteStatus::Disabled));
    }

    #[test]
    fn test_should_group_grants_by_grantee() {
        let grants = vec![GrantModel {
            id: Some("owner".to_owned()),
            r#type: GranteeType::CanonicalUser,
            uri: None,
            permissions: vec![Permission::Read, Permission::Write],
        }];
        let expanded = expand_grants(&grants);
        assert_eq!(expanded.len(), 2);

        let flat = flatten_grants(&AccessControlPolicy {
            grants: expanded,
            owner: None,
        });
        assert_eq!(flat, grants);
    }

    #[test]
    fn test_should_fill_in_lifecycle_defaults() {
        let rules = vec![LifecycleRuleModel {
            prefix: Some("logs/".to_owned()),
            enabled: true,
            ..LifecycleRuleModel::default()
        }];
        let expanded = expand_lifecycle_rules(&rules).unwrap();
        let rule = &expanded[0];
        assert!(rule.id.as_deref().unwrap().starts_with(LIFECYCLE_RULE_ID_PREFIX));
        assert_eq!(
            rule.expiration.as_ref().unwrap().expired_object_delete_marker,
            Some(false)
        );
        assert_eq!(
            rule.filter.as_ref().unwrap().prefix.as_deref(),
            Some("logs/")
        );
    }

    #[test]
    fn test_should_expand_lifecycle_dates_and_tags() {
        let rules = vec![LifecycleRuleModel {
            id: Some("archive".to_owned()),
            tags: BTreeMap::from([("class".to_owned(), "cold".to_owned())]),
            enabled: false,
            expiration: vec![LifecycleExpirationModel {
                date: Some("2030-01-15".to_owned()),
                days: Some(30),
                ..LifecycleExpirationModel::default()
            }],
            transition: vec![TransitionModel {
                date: None,
                days: Some(0),
                storage_class: TransitionStorageClass::Glacier,
            }],
            ..LifecycleRuleModel::default()
        }];
        let expanded = expand_lifecycle_rules(&rules).unwrap();
        let rule = &expanded[0];
        assert_eq!(rule.status, ExpirationStatus::Disabled);
        assert_eq!(rule.expiration.as_ref().unwrap().days, None);
        assert_eq!(rule.transitions[0].days, Some(0));
        assert!(rule.filter.as_ref().unwrap().and.is_some());

        let flat = flatten_lifecycle_rules(&expanded);
        assert_eq!(flat[0].expiration[0].date.as_deref(), Some("2030-01-15"));
        assert_eq!(flat[0].tags["class"], "cold");
        assert_eq!(flat[0].prefix.as_deref(), Some(""));

        let bad = vec![LifecycleRuleModel {
            expiration: vec![LifecycleExpirationModel {
                date: Some("15/01/2030".to_owned()),
                ..LifecycleExpirationModel::default()
            }],
            ..LifecycleRuleModel::default()
        }];
        assert!(expand_lifecycle_rules(&bad).is_err());
    }

    #[test]
    fn test_should_choose_replication_schema_by_filter() {
        let rule = |filter: Vec<ReplicationFilterModel>| ReplicationRuleModel {
            delete_marker_replication_status: None,
            destination: vec![DestinationModel {
                bucket: "arn:aws:s3:::dest".to_owned(),
                ..DestinationModel::default()
            }],
            filter,
            id: Some("r1".to_owned()),
            prefix: Some("docs/".to_owned()),
            priority: None,
            source_selection_criteria: Vec::new(),
            status: ReplicationRuleStatus::Enabled,
        };

        let v1 = expand_replication_rule(&rule(Vec::new())).unwrap();
        assert_eq!(v1.prefix.as_deref(), Some("docs/"));
        assert!(v1.filter.is_none());
        assert!(v1.delete_marker_replication.is_none());

        let v2 = expand_replication_rule(&rule(vec![ReplicationFilterModel::default()])).unwrap();
        assert!(v2.prefix.is_none());
        assert_eq!(v2.priority, Some(0));
        assert_eq!(
            v2.delete_marker_replication.unwrap().status,
            Some(DeleteMarkerReplicationStatus::Disabled)
        );
    }

    #[test]
    fn test_should_require_versioning_for_replication() {
        assert!(require_versioning_for_replication("b", None).is_err());
        assert!(
            require_versioning_for_replication(
                "b",
                Some(&VersioningModel {
                    enabled: true,
                    mfa_delete: false
                })
            )
            .is_ok()
        );
    }
}
