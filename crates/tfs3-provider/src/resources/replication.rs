//! The `aws_s3_bucket_replication_configuration` resource.
//!
//! Rules with a `filter` block use the V2 schema (filter, priority, delete
//! marker replication). Rules without one use the V1 schema, which only
//! knows a key prefix.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_model::types::{
    AccessControlTranslation, DeleteMarkerReplication, DeleteMarkerReplicationStatus, Destination,
    EncryptionConfiguration, ExistingObjectReplication, ExistingObjectReplicationStatus, Metrics,
    MetricsStatus, OwnerOverride, ReplicaModifications, ReplicaModificationsStatus,
    ReplicationConfiguration, ReplicationRule, ReplicationRuleAndOperator, ReplicationRuleFilter,
    ReplicationRuleStatus, ReplicationTime, ReplicationTimeStatus, ReplicationTimeValue,
    SourceSelectionCriteria, SseKmsEncryptedObjects, SseKmsEncryptedObjectsStatus, StorageClass, Tag,
};
use tfs3_model::{BucketTarget, S3ErrorCode};
use tracing::info;

use super::{SectionRead, read_section, validate_bucket_args, validate_max_one};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::retry::{retry_until_not_found, retry_when};
use crate::validation::{validate_len, validate_range};

const KIND: &str = "S3 Bucket Replication Configuration";

/// The `aws_s3_bucket_replication_configuration` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketReplicationConfiguration;

/// State of an `aws_s3_bucket_replication_configuration`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketReplicationConfigurationModel {
    /// The source bucket name.
    pub id: String,
    /// The source bucket.
    pub bucket: String,
    /// IAM role S3 assumes to replicate objects.
    pub role: String,
    /// Object lock token, required for buckets with object lock enabled.
    pub token: Option<String>,
    /// Rules, at least one.
    pub rule: Vec<RuleModel>,
}

/// One replication rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct RuleModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    /// V1 key prefix. Conflicts with `filter`.
    #[serde(default)]
    pub prefix: Option<String>,
    pub status: ReplicationRuleStatus,
    #[serde(default)]
    pub filter: Vec<FilterModel>,
    #[serde(default)]
    pub delete_marker_replication: Vec<StatusModel<DeleteMarkerReplicationStatus>>,
    #[serde(default)]
    pub existing_object_replication: Vec<StatusModel<ExistingObjectReplicationStatus>>,
    #[serde(default)]
    pub source_selection_criteria: Vec<SourceSelectionCriteriaModel>,
    pub destination: Vec<DestinationModel>,
}

/// A block holding only a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusModel<S> {
    /// The status.
    pub status: S,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterModel {
    pub prefix: Option<String>,
    pub tag: Vec<TagModel>,
    pub and: Vec<AndModel>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagModel {
    pub key: String,
    pub value: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndModel {
    pub prefix: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSelectionCriteriaModel {
    pub replica_modifications: Vec<StatusModel<ReplicaModificationsStatus>>,
    pub sse_kms_encrypted_objects: Vec<StatusModel<SseKmsEncryptedObjectsStatus>>,
}

/// Where replicas go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DestinationModel {
    /// ARN of the destination bucket.
    pub bucket: String,
    pub account: Option<String>,
    pub storage_class: Option<StorageClass>,
    pub access_control_translation: Vec<AccessControlTranslationModel>,
    pub encryption_configuration: Vec<EncryptionConfigurationModel>,
    pub replication_time: Vec<ReplicationTimeModel>,
    pub metrics: Vec<MetricsModel>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlTranslationModel {
    pub owner: OwnerOverride,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfigurationModel {
    pub replica_kms_key_id: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinutesModel {
    pub minutes: i32,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTimeModel {
    pub status: ReplicationTimeStatus,
    #[serde(default)]
    pub time: Vec<MinutesModel>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsModel {
    pub status: MetricsStatus,
    #[serde(default)]
    pub event_threshold: Vec<MinutesModel>,
}

fn validate(plan: &BucketReplicationConfigurationModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, None)?;
    if plan.role.is_empty() {
        return Err(ProviderError::validation("role: required"));
    }
    if plan.rule.is_empty() {
        return Err(ProviderError::validation("rule: at least one rule is required"));
    }
    for rule in &plan.rule {
        if let Some(id) = &rule.id {
            validate_len("rule.id", id, 0, 255)?;
        }
        if let Some(prefix) = &rule.prefix {
            validate_len("rule.prefix", prefix, 0, 1024)?;
        }
        if rule.prefix.is_some() && !rule.filter.is_empty() {
            return Err(ProviderError::validation("\"rule.prefix\": conflicts with rule.filter"));
        }
        validate_max_one("rule.filter", Some(&rule.filter))?;
        validate_max_one("rule.delete_marker_replication", Some(&rule.delete_marker_replication))?;
        validate_max_one("rule.existing_object_replication", Some(&rule.existing_object_replication))?;
        validate_max_one("rule.source_selection_criteria", Some(&rule.source_selection_criteria))?;
        if rule.destination.len() != 1 {
            return Err(ProviderError::validation(
                "rule.destination: exactly one block is required",
            ));
        }
        for destination in &rule.destination {
            for time in &destination.replication_time {
                for t in &time.time {
                    validate_range("replication_time.time.minutes", i64::from(t.minutes), 15, 15)?;
                }
            }
            for metrics in &destination.metrics {
                for t in &metrics.event_threshold {
                    validate_range("metrics.event_threshold.minutes", i64::from(t.minutes), 15, 15)?;
                }
            }
        }
    }
    Ok(())
}

fn tags_of(map: &BTreeMap<String, String>) -> Vec<Tag> {
    map.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

fn expand_destination(d: &DestinationModel) -> Destination {
    Destination {
        bucket: d.bucket.clone(),
        account: d.account.clone().filter(|a| !a.is_empty()),
        storage_class: d.storage_class,
        access_control_translation: d
            .access_control_translation
            .first()
            .map(|t| AccessControlTranslation { owner: t.owner }),
        encryption_configuration: d.encryption_configuration.first().map(|e| EncryptionConfiguration {
            replica_kms_key_id: Some(e.replica_kms_key_id.clone()),
        }),
        replication_time: d.replication_time.first().map(|t| ReplicationTime {
            status: t.status,
            time: t.time.first().map(|m| ReplicationTimeValue {
                minutes: Some(m.minutes),
            }),
        }),
        metrics: d.metrics.first().map(|m| Metrics {
            status: m.status,
            event_threshold: m.event_threshold.first().map(|t| ReplicationTimeValue {
                minutes: Some(t.minutes),
            }),
        }),
    }
}

fn expand(plan: &BucketReplicationConfigurationModel) -> ReplicationConfiguration {
    let rules = plan
        .rule
        .iter()
        .filter_map(|rule| {
            let destination = expand_destination(rule.destination.first()?);
            let source_selection_criteria = rule.source_selection_criteria.first().map(|c| {
                SourceSelectionCriteria {
                    sse_kms_encrypted_objects: c
                        .sse_kms_encrypted_objects
                        .first()
                        .map(|s| SseKmsEncryptedObjects { status: s.status }),
                    replica_modifications: c
                        .replica_modifications
                        .first()
                        .map(|s| ReplicaModifications { status: s.status }),
                }
            });
            let existing_object_replication = rule
                .existing_object_replication
                .first()
                .map(|s| ExistingObjectReplication { status: s.status });

            let mut expanded = ReplicationRule {
                id: rule.id.clone().filter(|id| !id.is_empty()),
                priority: None,
                prefix: None,
                filter: None,
                status: rule.status,
                source_selection_criteria,
                existing_object_replication,
                destination,
                delete_marker_replication: None,
            };
            match rule.filter.first() {
                Some(filter) => {
                    expanded.filter = Some(ReplicationRuleFilter {
                        and: filter.and.first().map(|and| ReplicationRuleAndOperator {
                            prefix: and.prefix.clone(),
                            tags: tags_of(&and.tags),
                        }),
                        prefix: filter.prefix.clone(),
                        tag: filter.tag.first().map(|t| Tag {
                            key: t.key.clone(),
                            value: t.value.clone(),
                        }),
                    });
                    expanded.priority = Some(rule.priority.unwrap_or_default());
                    expanded.delete_marker_replication = Some(DeleteMarkerReplication {
                        status: Some(
                            rule.delete_marker_replication
                                .first()
                                .map_or(DeleteMarkerReplicationStatus::Disabled, |d| d.status),
                        ),
                    });
                }
                None => expanded.prefix = Some(rule.prefix.clone().unwrap_or_default()),
            }
            Some(expanded)
        })
        .collect();
    ReplicationConfiguration {
        role: plan.role.clone(),
        rules,
    }
}

fn flatten_destination(d: &Destination) -> DestinationModel {
    DestinationModel {
        bucket: d.bucket.clone(),
        account: d.account.clone(),
        storage_class: d.storage_class,
        access_control_translation: d
            .access_control_translation
            .iter()
            .map(|t| AccessControlTranslationModel { owner: t.owner })
            .collect(),
        encryption_configuration: d
            .encryption_configuration
            .iter()
            .filter_map(|e| {
                Some(EncryptionConfigurationModel {
                    replica_kms_key_id: e.replica_kms_key_id.clone()?,
                })
            })
            .collect(),
        replication_time: d
            .replication_time
            .iter()
            .map(|t| ReplicationTimeModel {
                status: t.status,
                time: t
                    .time
                    .as_ref()
                    .and_then(|v| v.minutes)
                    .map(|minutes| MinutesModel { minutes })
                    .into_iter()
                    .collect(),
            })
            .collect(),
        metrics: d
            .metrics
            .iter()
            .map(|m| MetricsModel {
                status: m.status,
                event_threshold: m
                    .event_threshold
                    .as_ref()
                    .and_then(|v| v.minutes)
                    .map(|minutes| MinutesModel { minutes })
                    .into_iter()
                    .collect(),
            })
            .collect(),
    }
}

fn flatten(config: &ReplicationConfiguration) -> Vec<RuleModel> {
    config
        .rules
        .iter()
        .map(|rule| RuleModel {
            id: rule.id.clone(),
            priority: rule.filter.as_ref().and(rule.priority),
            prefix: rule.prefix.clone(),
            status: rule.status,
            filter: rule
                .filter
                .iter()
                .map(|f| FilterModel {
                    prefix: f.prefix.clone(),
                    tag: f
                        .tag
                        .iter()
                        .map(|t| TagModel {
                            key: t.key.clone(),
                            value: t.value.clone(),
                        })
                        .collect(),
                    and: f
                        .and
                        .iter()
                        .map(|and| AndModel {
                            prefix: and.prefix.clone(),
                            tags: and.tags.iter().map(|t| (t.key.clone(), t.value.clone())).collect(),
                        })
                        .collect(),
                })
                .collect(),
            delete_marker_replication: rule
                .delete_marker_replication
                .iter()
                .filter_map(|d| Some(StatusModel { status: d.status? }))
                .collect(),
            existing_object_replication: rule
                .existing_object_replication
                .iter()
                .map(|e| StatusModel { status: e.status })
                .collect(),
            source_selection_criteria: rule
                .source_selection_criteria
                .iter()
                .map(|c| SourceSelectionCriteriaModel {
                    replica_modifications: c
                        .replica_modifications
                        .iter()
                        .map(|r| StatusModel { status: r.status })
                        .collect(),
                    sse_kms_encrypted_objects: c
                        .sse_kms_encrypted_objects
                        .iter()
                        .map(|s| StatusModel { status: s.status })
                        .collect(),
                })
                .collect(),
            destination: vec![flatten_destination(&rule.destination)],
        })
        .collect()
}

impl BucketReplicationConfiguration {
    async fn put(client: &AwsClient, plan: &BucketReplicationConfigurationModel) -> ProviderResult<()> {
        let conn = client.conn();
        let bucket = plan.bucket.as_str();
        let target = &BucketTarget::new(bucket);
        let config = &expand(plan);
        let token = plan.token.as_deref().filter(|t| !t.is_empty());
        retry_when(
            client.propagation_timeout(),
            move || async move {
                conn.put_bucket_replication(target, config, token)
                    .await
                    .context("putting S3 Bucket Replication Configuration", bucket)
            },
            |e| {
                e.code_is(&[S3ErrorCode::NoSuchBucket])
                    || e.message_contains(
                        &S3ErrorCode::InvalidRequest,
                        "Versioning must be 'Enabled' on the bucket",
                    )
            },
        )
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketReplicationConfigurationModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketReplicationConfigurationModel>> {
        let conn = client.conn();
        let id = state.id.as_str();
        let target = &BucketTarget::new(id);

        let config = match read_section(
            client,
            is_new,
            &[S3ErrorCode::ReplicationConfigurationNotFoundError],
            move || async move {
                conn.get_bucket_replication(target)
                    .await
                    .context("reading S3 Bucket Replication Configuration", id)
            },
        )
        .await?
        {
            SectionRead::Present(config) => config,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        state.bucket = state.id.clone();
        state.role.clone_from(&config.role);
        state.rule = flatten(&config);
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketReplicationConfiguration {
    const TYPE_NAME: &'static str = "aws_s3_bucket_replication_configuration";
    type Model = BucketReplicationConfigurationModel;

    async fn create(
        &self,
        client: &AwsClient,
        mut plan: BucketReplicationConfigurationModel,
    ) -> ProviderResult<BucketReplicationConfigurationModel> {
        validate(&plan)?;
        info!(bucket = %plan.bucket, rules = plan.rule.len(), "creating S3 Bucket Replication Configuration");
        Self::put(client, &plan).await?;
        plan.id.clone_from(&plan.bucket);
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(
        &self,
        client: &AwsClient,
        state: BucketReplicationConfigurationModel,
    ) -> ProviderResult<Option<BucketReplicationConfigurationModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketReplicationConfigurationModel,
        mut plan: BucketReplicationConfigurationModel,
    ) -> ProviderResult<BucketReplicationConfigurationModel> {
        validate(&plan)?;
        plan.id = prior.id;
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(
        &self,
        client: &AwsClient,
        state: BucketReplicationConfigurationModel,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let id = state.id.as_str();
        let target = &BucketTarget::new(id);
        info!(bucket = id, "deleting S3 Bucket Replication Configuration");
        match conn.delete_bucket_replication(target).await {
            Ok(()) => {}
            Err(e)
                if e.code_is(&[
                    S3ErrorCode::NoSuchBucket,
                    S3ErrorCode::ReplicationConfigurationNotFoundError,
                ]) =>
            {
                return Ok(());
            }
            Err(e) => {
                return Err(ProviderError::api("deleting S3 Bucket Replication Configuration", id, e));
            }
        }
        retry_until_not_found(client.propagation_timeout(), move || async move {
            conn.get_bucket_replication(target).await.not_found_on(
                &[S3ErrorCode::NoSuchBucket, S3ErrorCode::ReplicationConfigurationNotFoundError],
                KIND,
                "reading S3 Bucket Replication Configuration",
                id,
            )
        })
        .await
    }

    fn import(&self, id: &str) -> ProviderResult<BucketReplicationConfigurationModel> {
        if id.is_empty() {
            return Err(ProviderError::invalid_id(id, "expected BUCKET"));
        }
        Ok(BucketReplicationConfigurationModel {
            id: id.to_owned(),
            bucket: id.to_owned(),
            ..BucketReplicationConfigurationModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::object::CreateBucketInput;
    use tfs3_model::types::{BucketVersioningStatus, VersioningConfiguration};

    use super::*;
    use crate::conn::{InMemoryS3, S3Api};
    use crate::resources::test_support::client;

    const ROLE: &str = "arn:aws:iam::000000000000:role/replication";

    async fn source(mem: &InMemoryS3, name: &str, versioned: bool) {
        mem.create_bucket(&CreateBucketInput {
            bucket: name.to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
        if versioned {
            mem.put_bucket_versioning(
                &BucketTarget::new(name),
                &VersioningConfiguration {
                    status: Some(BucketVersioningStatus::Enabled),
                    mfa_delete: None,
                },
                None,
            )
            .await
            .unwrap();
        }
    }

    fn rule(filter: Vec<FilterModel>) -> RuleModel {
        RuleModel {
            id: Some("all".to_owned()),
            priority: None,
            prefix: None,
            status: ReplicationRuleStatus::Enabled,
            filter,
            delete_marker_replication: Vec::new(),
            existing_object_replication: Vec::new(),
            source_selection_criteria: Vec::new(),
            destination: vec![DestinationModel {
                bucket: "arn:aws:s3:::destination".to_owned(),
                storage_class: Some(StorageClass::StandardIa),
                replication_time: vec![ReplicationTimeModel {
                    status: ReplicationTimeStatus::Enabled,
                    time: vec![MinutesModel { minutes: 15 }],
                }],
                metrics: vec![MetricsModel {
                    status: MetricsStatus::Enabled,
                    event_threshold: vec![MinutesModel { minutes: 15 }],
                }],
                ..DestinationModel::default()
            }],
        }
    }

    #[tokio::test]
    async fn test_should_replicate_with_v2_filter() {
        let (client, mem) = client();
        source(&mem, "src", true).await;

        let mut v2 = rule(vec![FilterModel {
            and: vec![AndModel {
                prefix: Some("docs/".to_owned()),
                tags: BTreeMap::from([("replicate".to_owned(), "yes".to_owned())]),
            }],
            ..FilterModel::default()
        }]);
        v2.priority = Some(1);
        v2.delete_marker_replication = vec![StatusModel {
            status: DeleteMarkerReplicationStatus::Enabled,
        }];
        let plan = BucketReplicationConfigurationModel {
            bucket: "src".to_owned(),
            role: ROLE.to_owned(),
            rule: vec![v2],
            ..BucketReplicationConfigurationModel::default()
        };

        let state = BucketReplicationConfiguration.create(&client, plan.clone()).await.unwrap();
        assert_eq!(state.id, "src");
        assert_eq!(state.role, ROLE);
        assert_eq!(state.rule, plan.rule);

        BucketReplicationConfiguration.delete(&client, state.clone()).await.unwrap();
        assert!(BucketReplicationConfiguration.read(&client, state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_write_v1_prefix_rules() {
        let (client, mem) = client();
        source(&mem, "v1", true).await;

        let mut v1 = rule(Vec::new());
        v1.prefix = Some("logs/".to_owned());
        let plan = BucketReplicationConfigurationModel {
            bucket: "v1".to_owned(),
            role: ROLE.to_owned(),
            rule: vec![v1],
            ..BucketReplicationConfigurationModel::default()
        };
        let state = BucketReplicationConfiguration.create(&client, plan).await.unwrap();
        assert_eq!(state.rule[0].prefix.as_deref(), Some("logs/"));
        assert!(state.rule[0].priority.is_none());

        let stored = mem.get_bucket_replication(&BucketTarget::new("v1")).await.unwrap();
        assert!(stored.rules[0].filter.is_none());
        assert!(stored.rules[0].delete_marker_replication.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_fail_on_unversioned_bucket_after_retrying() {
        let (client, mem) = client();
        source(&mem, "unversioned", false).await;
        let plan = BucketReplicationConfigurationModel {
            bucket: "unversioned".to_owned(),
            role: ROLE.to_owned(),
            rule: vec![rule(Vec::new())],
            ..BucketReplicationConfigurationModel::default()
        };
        let err = BucketReplicationConfiguration.create(&client, plan).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
        assert!(err.code_is(&[S3ErrorCode::InvalidRequest]));
    }
}
