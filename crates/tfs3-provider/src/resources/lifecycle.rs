//! The `aws_s3_bucket_lifecycle_configuration` resource.
//!
//! A rule without a `filter` block and without the deprecated `prefix`
//! applies to the whole bucket; S3 stores it as a filter with an empty
//! prefix, which reads back as no filter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tfs3_model::S3ErrorCode;
use tfs3_model::types::{
    AbortIncompleteMultipartUpload, ExpirationStatus, LifecycleConfiguration, LifecycleExpiration,
    LifecycleRule, LifecycleRuleAndOperator, LifecycleRuleFilter, NoncurrentVersionExpiration,
    NoncurrentVersionTransition, Tag, Transition, TransitionDefaultMinimumObjectSize,
    TransitionStorageClass,
};
use tracing::info;

use super::{SectionRead, read_section, retry_write, target_of, validate_bucket_args, validate_max_one};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::{create_bucket_id, parse_bucket_id};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::retry::{retry_until_not_found, retry_when};
use crate::validation::{validate_at_least, validate_len};

const KIND: &str = "S3 Bucket Lifecycle Configuration";

/// The `aws_s3_bucket_lifecycle_configuration` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketLifecycleConfiguration;

/// State of an `aws_s3_bucket_lifecycle_configuration`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketLifecycleConfigurationModel {
    /// `bucket[,expected_bucket_owner]`.
    pub id: String,
    /// The bucket.
    pub bucket: String,
    /// Account expected to own the bucket.
    pub expected_bucket_owner: Option<String>,
    /// Rules, at least one.
    pub rule: Vec<RuleModel>,
    /// Minimum object size for transitions. S3 defaults to
    /// `all_storage_classes_128K`.
    pub transition_default_minimum_object_size: Option<TransitionDefaultMinimumObjectSize>,
}

/// One lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct RuleModel {
    pub id: String,
    pub status: ExpirationStatus,
    /// Deprecated in favor of `filter`.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub filter: Vec<FilterModel>,
    #[serde(default)]
    pub expiration: Vec<ExpirationModel>,
    #[serde(default)]
    pub transition: Vec<TransitionModel>,
    #[serde(default)]
    pub noncurrent_version_expiration: Vec<NoncurrentExpirationModel>,
    #[serde(default)]
    pub noncurrent_version_transition: Vec<NoncurrentTransitionModel>,
    #[serde(default)]
    pub abort_incomplete_multipart_upload: Vec<AbortMultipartModel>,
}

/// The `filter` block. At most one of its members may be set, except
/// inside `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct FilterModel {
    pub prefix: Option<String>,
    pub tag: Vec<TagModel>,
    pub object_size_greater_than: Option<i64>,
    pub object_size_less_than: Option<i64>,
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
    pub object_size_greater_than: Option<i64>,
    pub object_size_less_than: Option<i64>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationModel {
    /// RFC 3339 date at midnight UTC.
    pub date: Option<String>,
    pub days: Option<i32>,
    pub expired_object_delete_marker: Option<bool>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionModel {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub days: Option<i32>,
    pub storage_class: TransitionStorageClass,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoncurrentExpirationModel {
    pub noncurrent_days: Option<i32>,
    pub newer_noncurrent_versions: Option<i32>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncurrentTransitionModel {
    #[serde(default)]
    pub noncurrent_days: Option<i32>,
    #[serde(default)]
    pub newer_noncurrent_versions: Option<i32>,
    pub storage_class: TransitionStorageClass,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortMultipartModel {
    pub days_after_initiation: i32,
}

fn validate(plan: &BucketLifecycleConfigurationModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, plan.expected_bucket_owner.as_deref())?;
    if plan.rule.is_empty() {
        return Err(ProviderError::validation("rule: at least one rule is required"));
    }
    for rule in &plan.rule {
        validate_len("rule.id", &rule.id, 1, 255)?;
        validate_max_one("rule.filter", Some(&rule.filter))?;
        validate_max_one("rule.expiration", Some(&rule.expiration))?;
        validate_max_one("rule.noncurrent_version_expiration", Some(&rule.noncurrent_version_expiration))?;
        validate_max_one("rule.abort_incomplete_multipart_upload", Some(&rule.abort_incomplete_multipart_upload))?;
        if let Some(filter) = rule.filter.first() {
            validate_max_one("rule.filter.tag", Some(&filter.tag))?;
            validate_max_one("rule.filter.and", Some(&filter.and))?;
            let members = usize::from(filter.prefix.is_some())
                + usize::from(!filter.tag.is_empty())
                + usize::from(filter.object_size_greater_than.is_some())
                + usize::from(filter.object_size_less_than.is_some())
                + usize::from(!filter.and.is_empty());
            if members > 1 {
                return Err(ProviderError::validation(format!(
                    "rule ({}): filter: only one of prefix, tag, object_size_greater_than, object_size_less_than, and may be set",
                    rule.id
                )));
            }
        }
        for expiration in &rule.expiration {
            if let Some(date) = &expiration.date {
                parse_date("rule.expiration.date", date)?;
            }
            if let Some(days) = expiration.days {
                validate_at_least("rule.expiration.days", i64::from(days), 0)?;
            }
        }
        for transition in &rule.transition {
            if let Some(date) = &transition.date {
                parse_date("rule.transition.date", date)?;
            }
            if transition.date.is_some() && transition.days.is_some() {
                return Err(ProviderError::validation(format!(
                    "rule ({}): transition: only one of date, days may be set",
                    rule.id
                )));
            }
        }
    }
    Ok(())
}

fn expand_filter(rule: &RuleModel) -> (Option<String>, Option<LifecycleRuleFilter>) {
    let Some(filter) = rule.filter.first() else {
        return match &rule.prefix {
            Some(prefix) => (Some(prefix.clone()), None),
            None => (
                None,
                Some(LifecycleRuleFilter {
                    prefix: Some(String::new()),
                    ..LifecycleRuleFilter::default()
                }),
            ),
        };
    };
    let expanded = LifecycleRuleFilter {
        and: filter.and.first().map(|and| LifecycleRuleAndOperator {
            prefix: and.prefix.clone(),
            tags: and
                .tags
                .iter()
                .map(|(key, value)| Tag {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            object_size_greater_than: and.object_size_greater_than,
            object_size_less_than: and.object_size_less_than,
        }),
        prefix: filter.prefix.clone(),
        tag: filter.tag.first().map(|t| Tag {
            key: t.key.clone(),
            value: t.value.clone(),
        }),
        object_size_greater_than: filter.object_size_greater_than,
        object_size_less_than: filter.object_size_less_than,
    };
    (None, Some(expanded))
}

/// Parse an RFC 3339 lifecycle date.
fn parse_date(attr: &str, value: &str) -> ProviderResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ProviderError::validation(format!("{attr}: {value:?} is not an RFC 3339 timestamp")))
}

fn expand_date(attr: &str, value: Option<&String>) -> ProviderResult<Option<DateTime<Utc>>> {
    value.map(|v| parse_date(attr, v)).transpose()
}

fn format_date(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn expand_rules(rules: &[RuleModel]) -> ProviderResult<Vec<LifecycleRule>> {
    rules
        .iter()
        .map(|rule| {
            let (prefix, filter) = expand_filter(rule);
            let expiration = rule
                .expiration
                .first()
                .map(|e| -> ProviderResult<LifecycleExpiration> {
                    Ok(LifecycleExpiration {
                        date: expand_date("rule.expiration.date", e.date.as_ref())?,
                        days: e.days.filter(|d| *d > 0),
                        expired_object_delete_marker: e.expired_object_delete_marker,
                    })
                })
                .transpose()?;
            let transitions = rule
                .transition
                .iter()
                .map(|t| {
                    Ok(Transition {
                        date: expand_date("rule.transition.date", t.date.as_ref())?,
                        days: t.days,
                        storage_class: Some(t.storage_class),
                    })
                })
                .collect::<ProviderResult<Vec<_>>>()?;
            Ok(LifecycleRule {
                id: Some(rule.id.clone()),
                prefix,
                filter,
                status: rule.status,
                expiration,
                transitions,
                noncurrent_version_transitions: rule
                    .noncurrent_version_transition
                    .iter()
                    .map(|t| NoncurrentVersionTransition {
                        noncurrent_days: t.noncurrent_days,
                        newer_noncurrent_versions: t.newer_noncurrent_versions,
                        storage_class: Some(t.storage_class),
                    })
                    .collect(),
                noncurrent_version_expiration: rule.noncurrent_version_expiration.first().map(|e| {
                    NoncurrentVersionExpiration {
                        noncurrent_days: e.noncurrent_days,
                        newer_noncurrent_versions: e.newer_noncurrent_versions,
                    }
                }),
                abort_incomplete_multipart_upload: rule.abort_incomplete_multipart_upload.first().map(
                    |a| AbortIncompleteMultipartUpload {
                        days_after_initiation: Some(a.days_after_initiation),
                    },
                ),
            })
        })
        .collect()
}

fn flatten_filter(filter: Option<&LifecycleRuleFilter>) -> Vec<FilterModel> {
    let Some(filter) = filter else {
        return Vec::new();
    };
    let whole_bucket = filter.prefix.as_deref() == Some("")
        && filter.and.is_none()
        && filter.tag.is_none()
        && filter.object_size_greater_than.is_none()
        && filter.object_size_less_than.is_none();
    if whole_bucket {
        return Vec::new();
    }
    vec![FilterModel {
        prefix: filter.prefix.clone(),
        tag: filter
            .tag
            .iter()
            .map(|t| TagModel {
                key: t.key.clone(),
                value: t.value.clone(),
            })
            .collect(),
        object_size_greater_than: filter.object_size_greater_than,
        object_size_less_than: filter.object_size_less_than,
        and: filter
            .and
            .iter()
            .map(|and| AndModel {
                prefix: and.prefix.clone(),
                tags: and.tags.iter().map(|t| (t.key.clone(), t.value.clone())).collect(),
                object_size_greater_than: and.object_size_greater_than,
                object_size_less_than: and.object_size_less_than,
            })
            .collect(),
    }]
}

fn flatten_rules(rules: &[LifecycleRule]) -> Vec<RuleModel> {
    rules
        .iter()
        .map(|rule| RuleModel {
            id: rule.id.clone().unwrap_or_default(),
            status: rule.status,
            prefix: rule.prefix.clone(),
            filter: flatten_filter(rule.filter.as_ref()),
            expiration: rule
                .expiration
                .iter()
                .map(|e| ExpirationModel {
                    date: e.date.as_ref().map(format_date),
                    days: e.days,
                    expired_object_delete_marker: e.expired_object_delete_marker,
                })
                .collect(),
            transition: rule
                .transitions
                .iter()
                .filter_map(|t| {
                    Some(TransitionModel {
                        date: t.date.as_ref().map(format_date),
                        days: t.days,
                        storage_class: t.storage_class?,
                    })
                })
                .collect(),
            noncurrent_version_expiration: rule
                .noncurrent_version_expiration
                .iter()
                .map(|e| NoncurrentExpirationModel {
                    noncurrent_days: e.noncurrent_days,
                    newer_noncurrent_versions: e.newer_noncurrent_versions,
                })
                .collect(),
            noncurrent_version_transition: rule
                .noncurrent_version_transitions
                .iter()
                .filter_map(|t| {
                    Some(NoncurrentTransitionModel {
                        noncurrent_days: t.noncurrent_days,
                        newer_noncurrent_versions: t.newer_noncurrent_versions,
                        storage_class: t.storage_class?,
                    })
                })
                .collect(),
            abort_incomplete_multipart_upload: rule
                .abort_incomplete_multipart_upload
                .iter()
                .filter_map(|a| {
                    Some(AbortMultipartModel {
                        days_after_initiation: a.days_after_initiation?,
                    })
                })
                .collect(),
        })
        .collect()
}

impl BucketLifecycleConfiguration {
    /// Write the rules and wait until S3 returns every rule ID.
    async fn put(client: &AwsClient, plan: &BucketLifecycleConfigurationModel) -> ProviderResult<()> {
        let conn = client.conn();
        let timeout = client.propagation_timeout();
        let target = &target_of(&parse_bucket_id(&plan.id)?);
        let bucket = plan.bucket.as_str();
        let config = &LifecycleConfiguration {
            rules: expand_rules(&plan.rule)?,
            transition_default_minimum_object_size: plan.transition_default_minimum_object_size,
        };
        retry_write(timeout, move || async move {
            conn.put_bucket_lifecycle(target, config)
                .await
                .context("putting S3 Bucket Lifecycle Configuration", bucket)
        })
        .await?;

        let wanted: &Vec<(Option<String>, ExpirationStatus)> =
            &config.rules.iter().map(|r| (r.id.clone(), r.status)).collect();
        retry_when(
            timeout,
            move || async move {
                let current = conn
                    .get_bucket_lifecycle(target)
                    .await
                    .context("reading S3 Bucket Lifecycle Configuration", bucket)?;
                let visible = wanted
                    .iter()
                    .all(|w| current.rules.iter().any(|r| (&r.id, &r.status) == (&w.0, &w.1)));
                if visible {
                    Ok(())
                } else {
                    Err(ProviderError::UnexpectedState(format!(
                        "S3 Bucket Lifecycle Configuration ({bucket}) rules not yet visible"
                    )))
                }
            },
            |e| {
                matches!(e, ProviderError::UnexpectedState(_))
                    || e.code_is(&[S3ErrorCode::NoSuchBucket, S3ErrorCode::NoSuchLifecycleConfiguration])
            },
        )
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketLifecycleConfigurationModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketLifecycleConfigurationModel>> {
        let parsed = parse_bucket_id(&state.id)?;
        let conn = client.conn();
        let target = &target_of(&parsed);
        let id = state.id.as_str();

        let config = match read_section(
            client,
            is_new,
            &[S3ErrorCode::NoSuchLifecycleConfiguration],
            move || async move {
                conn.get_bucket_lifecycle(target)
                    .await
                    .context("reading S3 Bucket Lifecycle Configuration", id)
            },
        )
        .await?
        {
            SectionRead::Present(config) => config,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        state.bucket = parsed.bucket;
        state.expected_bucket_owner = parsed.expected_bucket_owner;
        state.rule = flatten_rules(&config.rules);
        state.transition_default_minimum_object_size = config.transition_default_minimum_object_size;
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketLifecycleConfiguration {
    const TYPE_NAME: &'static str = "aws_s3_bucket_lifecycle_configuration";
    type Model = BucketLifecycleConfigurationModel;

    async fn create(
        &self,
        client: &AwsClient,
        mut plan: BucketLifecycleConfigurationModel,
    ) -> ProviderResult<BucketLifecycleConfigurationModel> {
        validate(&plan)?;
        plan.id = create_bucket_id(&plan.bucket, plan.expected_bucket_owner.as_deref());
        info!(bucket = %plan.bucket, rules = plan.rule.len(), "creating S3 Bucket Lifecycle Configuration");
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(
        &self,
        client: &AwsClient,
        state: BucketLifecycleConfigurationModel,
    ) -> ProviderResult<Option<BucketLifecycleConfigurationModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketLifecycleConfigurationModel,
        mut plan: BucketLifecycleConfigurationModel,
    ) -> ProviderResult<BucketLifecycleConfigurationModel> {
        validate(&plan)?;
        plan.id = prior.id;
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(
        &self,
        client: &AwsClient,
        state: BucketLifecycleConfigurationModel,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let target = &target_of(&parse_bucket_id(&state.id)?);
        let id = state.id.as_str();
        info!(id, "deleting S3 Bucket Lifecycle Configuration");
        match conn.delete_bucket_lifecycle(target).await {
            Ok(()) => {}
            Err(e) if e.code_is(&[S3ErrorCode::NoSuchBucket, S3ErrorCode::NoSuchLifecycleConfiguration]) => {
                return Ok(());
            }
            Err(e) => {
                return Err(ProviderError::api("deleting S3 Bucket Lifecycle Configuration", id, e));
            }
        }
        retry_until_not_found(client.propagation_timeout(), move || async move {
            conn.get_bucket_lifecycle(target).await.not_found_on(
                &[S3ErrorCode::NoSuchBucket, S3ErrorCode::NoSuchLifecycleConfiguration],
                KIND,
                "reading S3 Bucket Lifecycle Configuration",
                id,
            )
        })
        .await
    }

    fn import(&self, id: &str) -> ProviderResult<BucketLifecycleConfigurationModel> {
        let parsed = parse_bucket_id(id)?;
        Ok(BucketLifecycleConfigurationModel {
            id: id.to_owned(),
            bucket: parsed.bucket,
            expected_bucket_owner: parsed.expected_bucket_owner,
            ..BucketLifecycleConfigurationModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::BucketTarget;
    use tfs3_model::object::CreateBucketInput;

    use super::*;
    use crate::conn::S3Api;
    use crate::resources::test_support::client;

    fn rule(id: &str) -> RuleModel {
        RuleModel {
            id: id.to_owned(),
            status: ExpirationStatus::Enabled,
            prefix: None,
            filter: Vec::new(),
            expiration: Vec::new(),
            transition: Vec::new(),
            noncurrent_version_expiration: Vec::new(),
            noncurrent_version_transition: Vec::new(),
            abort_incomplete_multipart_upload: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_should_round_trip_rules() {
        let (client, mem) = client();
        mem.create_bucket(&CreateBucketInput {
            bucket: "lc".to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();

        let mut whole = rule("whole-bucket");
        whole.abort_incomplete_multipart_upload = vec![AbortMultipartModel {
            days_after_initiation: 7,
        }];
        let mut logs = rule("logs");
        logs.filter = vec![FilterModel {
            and: vec![AndModel {
                prefix: Some("logs/".to_owned()),
                tags: BTreeMap::from([("class".to_owned(), "archive".to_owned())]),
                object_size_greater_than: Some(1024),
                object_size_less_than: None,
            }],
            ..FilterModel::default()
        }];
        logs.expiration = vec![ExpirationModel {
            date: Some("2030-01-01T00:00:00Z".to_owned()),
            ..ExpirationModel::default()
        }];
        logs.transition = vec![TransitionModel {
            date: None,
            days: Some(30),
            storage_class: TransitionStorageClass::StandardIa,
        }];
        logs.noncurrent_version_transition = vec![NoncurrentTransitionModel {
            noncurrent_days: Some(10),
            newer_noncurrent_versions: Some(2),
            storage_class: TransitionStorageClass::Glacier,
        }];

        let plan = BucketLifecycleConfigurationModel {
            bucket: "lc".to_owned(),
            rule: vec![whole, logs],
            ..BucketLifecycleConfigurationModel::default()
        };
        let state = BucketLifecycleConfiguration.create(&client, plan.clone()).await.unwrap();
        assert_eq!(state.rule, plan.rule);
        assert_eq!(
            state.transition_default_minimum_object_size,
            Some(TransitionDefaultMinimumObjectSize::AllStorageClasses128K)
        );

        let stored = mem.get_bucket_lifecycle(&BucketTarget::new("lc")).await.unwrap();
        assert_eq!(
            stored.rules[0].filter.as_ref().and_then(|f| f.prefix.as_deref()),
            Some("")
        );

        BucketLifecycleConfiguration.delete(&client, state.clone()).await.unwrap();
        assert!(BucketLifecycleConfiguration.read(&client, state).await.unwrap().is_none());
    }

    #[test]
    fn test_should_reject_ambiguous_filters() {
        let mut r = rule("r");
        r.filter = vec![FilterModel {
            prefix: Some("a/".to_owned()),
            object_size_less_than: Some(10),
            ..FilterModel::default()
        }];
        let plan = BucketLifecycleConfigurationModel {
            bucket: "b".to_owned(),
            rule: vec![r],
            ..BucketLifecycleConfigurationModel::default()
        };
        assert!(validate(&plan).is_err());

        let empty = BucketLifecycleConfigurationModel {
            bucket: "b".to_owned(),
            ..BucketLifecycleConfigurationModel::default()
        };
        assert!(validate(&empty).is_err());

        let mut bad_date = rule("d");
        bad_date.expiration = vec![ExpirationModel {
            date: Some("2030-01-01".to_owned()),
            ..ExpirationModel::default()
        }];
        let plan = BucketLifecycleConfigurationModel {
            bucket: "b".to_owned(),
            rule: vec![bad_date],
            ..BucketLifecycleConfigurationModel::default()
        };
        assert!(validate(&plan).is_err());
    }
}
