//! The `aws_s3_bucket_object_lock_configuration` resource.
//!
//! Object lock cannot be turned off once enabled. Deleting the resource
//! only clears the default retention rule.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_model::S3ErrorCode;
use tfs3_model::types::{
    DefaultRetention, ObjectLockConfiguration, ObjectLockEnabled, ObjectLockRetentionMode,
    ObjectLockRule,
};
use tracing::info;

use super::{SectionRead, read_section, target_of, validate_bucket_args, validate_max_one};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::{create_bucket_id, parse_bucket_id};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::retry::{retry_when_no_such_bucket, retry_when_not_found};
use crate::validation::validate_at_least;

const KIND: &str = "S3 Bucket Object Lock Configuration";

/// The `aws_s3_bucket_object_lock_configuration` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketObjectLockConfiguration;

/// State of an `aws_s3_bucket_object_lock_configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketObjectLockConfigurationModel {
    /// `bucket[,expected_bucket_owner]`.
    pub id: String,
    /// The bucket.
    pub bucket: String,
    /// Account expected to own the bucket.
    pub expected_bucket_owner: Option<String>,
    /// Always `Enabled`.
    pub object_lock_enabled: ObjectLockEnabled,
    /// Default retention rule.
    pub rule: Vec<RuleModel>,
    /// Token for enabling object lock on an existing bucket.
    pub token: Option<String>,
}

impl Default for BucketObjectLockConfigurationModel {
    fn default() -> Self {
        Self {
            id: String::new(),
            bucket: String::new(),
            expected_bucket_owner: None,
            object_lock_enabled: ObjectLockEnabled::Enabled,
            rule: Vec::new(),
            token: None,
        }
    }
}

/// The `rule` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleModel {
    /// Default retention of new objects.
    pub default_retention: Vec<DefaultRetentionModel>,
}

/// The `default_retention` block. Exactly one of `days` and `years`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct DefaultRetentionModel {
    #[serde(default)]
    pub mode: Option<ObjectLockRetentionMode>,
    #[serde(default)]
    pub days: Option<i32>,
    #[serde(default)]
    pub years: Option<i32>,
}

fn validate(plan: &BucketObjectLockConfigurationModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, plan.expected_bucket_owner.as_deref())?;
    validate_max_one("rule", Some(&plan.rule))?;
    for rule in &plan.rule {
        if rule.default_retention.len() != 1 {
            return Err(ProviderError::validation(
                "rule.default_retention: exactly one block is required",
            ));
        }
        for retention in &rule.default_retention {
            match (retention.days, retention.years) {
                (Some(_), Some(_)) => {
                    return Err(ProviderError::validation(
                        "\"rule.default_retention.days\": conflicts with rule.default_retention.years",
                    ));
                }
                (Some(days), None) => validate_at_least("rule.default_retention.days", i64::from(days), 1)?,
                (None, Some(years)) => {
                    validate_at_least("rule.default_retention.years", i64::from(years), 1)?;
                }
                (None, None) => {}
            }
        }
    }
    Ok(())
}

fn expand(plan: &BucketObjectLockConfigurationModel) -> ObjectLockConfiguration {
    ObjectLockConfiguration {
        object_lock_enabled: Some(plan.object_lock_enabled),
        rule: plan.rule.first().map(|rule| ObjectLockRule {
            default_retention: rule.default_retention.first().map(|r| DefaultRetention {
                mode: r.mode,
                days: r.days,
                years: r.years,
            }),
        }),
    }
}

fn flatten(rule: Option<&ObjectLockRule>) -> Vec<RuleModel> {
    rule.map(|rule| RuleModel {
        default_retention: rule
            .default_retention
            .iter()
            .map(|r| DefaultRetentionModel {
                mode: r.mode,
                days: r.days,
                years: r.years,
            })
            .collect(),
    })
    .into_iter()
    .collect()
}

impl BucketObjectLockConfiguration {
    async fn put(
        client: &AwsClient,
        id: &str,
        config: &ObjectLockConfiguration,
        token: Option<&str>,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let target = &target_of(&parse_bucket_id(id)?);
        let token = token.filter(|t| !t.is_empty());
        retry_when_no_such_bucket(client.propagation_timeout(), move || async move {
            conn.put_object_lock_configuration(target, config, token)
                .await
                .context("putting S3 Bucket Object Lock Configuration", id)
        })
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketObjectLockConfigurationModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketObjectLockConfigurationModel>> {
        let conn = client.conn();
        let parsed = parse_bucket_id(&state.id)?;
        let target = &target_of(&parsed);
        let id = state.id.as_str();

        let config = match read_section(
            client,
            is_new,
            &[S3ErrorCode::ObjectLockConfigurationNotFoundError],
            move || async move {
                conn.get_object_lock_configuration(target)
                    .await
                    .context("reading S3 Bucket Object Lock Configuration", id)
            },
        )
        .await?
        {
            SectionRead::Present(config) => config,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        state.bucket = parsed.bucket;
        state.expected_bucket_owner = parsed.expected_bucket_owner;
        state.object_lock_enabled = config.object_lock_enabled.unwrap_or(ObjectLockEnabled::Enabled);
        state.rule = flatten(config.rule.as_ref());
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketObjectLockConfiguration {
    const TYPE_NAME: &'static str = "aws_s3_bucket_object_lock_configuration";
    type Model = BucketObjectLockConfigurationModel;

    async fn create(
        &self,
        client: &AwsClient,
        mut plan: BucketObjectLockConfigurationModel,
    ) -> ProviderResult<BucketObjectLockConfigurationModel> {
        validate(&plan)?;
        plan.id = create_bucket_id(&plan.bucket, plan.expected_bucket_owner.as_deref());
        info!(bucket = %plan.bucket, "creating S3 Bucket Object Lock Configuration");
        Self::put(client, &plan.id, &expand(&plan), plan.token.as_deref()).await?;

        let conn = client.conn();
        let target = &target_of(&parse_bucket_id(&plan.id)?);
        let id = plan.id.as_str();
        retry_when_not_found(client.propagation_timeout(), move || async move {
            conn.get_object_lock_configuration(target).await.not_found_on(
                &[S3ErrorCode::NoSuchBucket, S3ErrorCode::ObjectLockConfigurationNotFoundError],
                KIND,
                "reading S3 Bucket Object Lock Configuration",
                id,
            )
        })
        .await?;

        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(
        &self,
        client: &AwsClient,
        state: BucketObjectLockConfigurationModel,
    ) -> ProviderResult<Option<BucketObjectLockConfigurationModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketObjectLockConfigurationModel,
        mut plan: BucketObjectLockConfigurationModel,
    ) -> ProviderResult<BucketObjectLockConfigurationModel> {
        validate(&plan)?;
        plan.id = prior.id;
        Self::put(client, &plan.id, &expand(&plan), plan.token.as_deref()).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(
        &self,
        client: &AwsClient,
        state: BucketObjectLockConfigurationModel,
    ) -> ProviderResult<()> {
        info!(id = %state.id, "deleting S3 Bucket Object Lock Configuration");
        let cleared = ObjectLockConfiguration {
            object_lock_enabled: Some(state.object_lock_enabled),
            rule: None,
        };
        match Self::put(client, &state.id, &cleared, state.token.as_deref()).await {
            Err(e)
                if e.code_is(&[
                    S3ErrorCode::NoSuchBucket,
                    S3ErrorCode::ObjectLockConfigurationNotFoundError,
                ]) =>
            {
                Ok(())
            }
            other => other,
        }
    }

    fn import(&self, id: &str) -> ProviderResult<BucketObjectLockConfigurationModel> {
        let parsed = parse_bucket_id(id)?;
        Ok(BucketObjectLockConfigurationModel {
            id: id.to_owned(),
            bucket: parsed.bucket,
            expected_bucket_owner: parsed.expected_bucket_owner,
            ..BucketObjectLockConfigurationModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tfs3_model::BucketTarget;
    use tfs3_model::object::CreateBucketInput;

    use super::*;
    use crate::conn::S3Api;
    use crate::resources::test_support::client;

    fn governance(days: i32) -> Vec<RuleModel> {
        vec![RuleModel {
            default_retention: vec![DefaultRetentionModel {
                mode: Some(ObjectLockRetentionMode::Governance),
                days: Some(days),
                years: None,
            }],
        }]
    }

    #[tokio::test]
    async fn test_should_set_default_retention_and_clear_it_on_delete() {
        let (client, mem) = client();
        mem.create_bucket(&CreateBucketInput {
            bucket: "locked".to_owned(),
            object_lock_enabled: true,
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();

        let state = BucketObjectLockConfiguration
            .create(
                &client,
                BucketObjectLockConfigurationModel {
                    bucket: "locked".to_owned(),
                    rule: governance(3),
                    ..BucketObjectLockConfigurationModel::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(state.id, "locked");
        assert_eq!(state.object_lock_enabled, ObjectLockEnabled::Enabled);
        assert_eq!(state.rule, governance(3));

        let mut plan = state.clone();
        plan.rule = governance(10);
        let updated = BucketObjectLockConfiguration.update(&client, state, plan).await.unwrap();
        assert_eq!(updated.rule[0].default_retention[0].days, Some(10));

        BucketObjectLockConfiguration.delete(&client, updated.clone()).await.unwrap();
        let remote = mem
            .get_object_lock_configuration(&BucketTarget::new("locked"))
            .await
            .unwrap();
        assert!(remote.rule.is_none());
        let read = BucketObjectLockConfiguration.read(&client, updated).await.unwrap().unwrap();
        assert!(read.rule.is_empty());
    }

    #[tokio::test]
    async fn test_should_require_versioning_to_enable_on_existing_bucket() {
        let (client, mem) = client();
        mem.create_bucket(&CreateBucketInput {
            bucket: "plain".to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
        let client = client.with_propagation_timeout(Duration::ZERO);
        let err = BucketObjectLockConfiguration
            .create(
                &client,
                BucketObjectLockConfigurationModel {
                    bucket: "plain".to_owned(),
                    ..BucketObjectLockConfigurationModel::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.code_is(&[S3ErrorCode::InvalidBucketState]));
    }

    #[test]
    fn test_should_reject_days_with_years() {
        let plan = BucketObjectLockConfigurationModel {
            bucket: "locked".to_owned(),
            rule: vec![RuleModel {
                default_retention: vec![DefaultRetentionModel {
                    mode: Some(ObjectLockRetentionMode::Compliance),
                    days: Some(1),
                    years: Some(1),
                }],
            }],
            ..BucketObjectLockConfigurationModel::default()
        };
        assert!(validate(&plan).is_err());
    }
}
