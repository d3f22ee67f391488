//! The `aws_s3_bucket_server_side_encryption_configuration` resource.
//!
//! Every bucket has default encryption (SSE-S3) since January 2023, so
//! deleting this resource restores that default instead of leaving the
//! bucket unencrypted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_model::S3ErrorCode;
use tfs3_model::types::{
    ServerSideEncryption, ServerSideEncryptionByDefault, ServerSideEncryptionConfiguration,
    ServerSideEncryptionRule,
};
use tracing::info;

use super::{SectionRead, read_section, target_of, validate_bucket_args, validate_max_one};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::{create_bucket_id, parse_bucket_id};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::retry::{retry_when_aws_err_code_equals, retry_when_not_found};

const KIND: &str = "S3 Bucket Server-side Encryption Configuration";

/// The `aws_s3_bucket_server_side_encryption_configuration` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketServerSideEncryptionConfiguration;

/// State of an `aws_s3_bucket_server_side_encryption_configuration`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketServerSideEncryptionConfigurationModel {
    /// `bucket[,expected_bucket_owner]`.
    pub id: String,
    /// The bucket.
    pub bucket: String,
    /// Account expected to own the bucket.
    pub expected_bucket_owner: Option<String>,
    /// Encryption rules, at least one.
    pub rule: Vec<RuleModel>,
}

/// One encryption rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleModel {
    /// Default encryption of new objects.
    pub apply_server_side_encryption_by_default: Vec<DefaultEncryptionModel>,
    /// Use an S3 Bucket Key for SSE-KMS.
    pub bucket_key_enabled: Option<bool>,
}

/// The `apply_server_side_encryption_by_default` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultEncryptionModel {
    /// `AES256`, `aws:kms` or `aws:kms:dsse`.
    pub sse_algorithm: ServerSideEncryption,
    /// KMS key for the `aws:kms` algorithms.
    #[serde(default)]
    pub kms_master_key_id: Option<String>,
}

fn validate(plan: &BucketServerSideEncryptionConfigurationModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, plan.expected_bucket_owner.as_deref())?;
    if plan.rule.is_empty() {
        return Err(ProviderError::validation("rule: at least one rule is required"));
    }
    for rule in &plan.rule {
        validate_max_one(
            "rule.apply_server_side_encryption_by_default",
            Some(&rule.apply_server_side_encryption_by_default),
        )?;
        if let Some(default) = rule.apply_server_side_encryption_by_default.first() {
            if default.kms_master_key_id.is_some() && default.sse_algorithm == ServerSideEncryption::Aes256 {
                return Err(ProviderError::validation(
                    "kms_master_key_id: can only be set when sse_algorithm is aws:kms or aws:kms:dsse",
                ));
            }
        }
    }
    Ok(())
}

fn expand(rules: &[RuleModel]) -> ServerSideEncryptionConfiguration {
    ServerSideEncryptionConfiguration {
        rules: rules
            .iter()
            .map(|rule| ServerSideEncryptionRule {
                apply_server_side_encryption_by_default: rule
                    .apply_server_side_encryption_by_default
                    .first()
                    .map(|d| ServerSideEncryptionByDefault {
                        sse_algorithm: d.sse_algorithm,
                        kms_master_key_id: d.kms_master_key_id.clone().filter(|k| !k.is_empty()),
                    }),
                bucket_key_enabled: rule.bucket_key_enabled,
            })
            .collect(),
    }
}

fn flatten(config: &ServerSideEncryptionConfiguration) -> Vec<RuleModel> {
    config
        .rules
        .iter()
        .map(|rule| RuleModel {
            apply_server_side_encryption_by_default: rule
                .apply_server_side_encryption_by_default
                .iter()
                .map(|d| DefaultEncryptionModel {
                    sse_algorithm: d.sse_algorithm,
                    kms_master_key_id: d.kms_master_key_id.clone(),
                })
                .collect(),
            bucket_key_enabled: rule.bucket_key_enabled,
        })
        .collect()
}

impl BucketServerSideEncryptionConfiguration {
    async fn put(
        client: &AwsClient,
        plan: &BucketServerSideEncryptionConfigurationModel,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let target = &target_of(&parse_bucket_id(&plan.id)?);
        let id = plan.id.as_str();
        let config = &expand(&plan.rule);
        retry_when_aws_err_code_equals(
            client.propagation_timeout(),
            move || async move {
                conn.put_bucket_encryption(target, config)
                    .await
                    .context("putting S3 Bucket Server-side Encryption Configuration", id)
            },
            &[S3ErrorCode::NoSuchBucket, S3ErrorCode::OperationAborted],
        )
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketServerSideEncryptionConfigurationModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketServerSideEncryptionConfigurationModel>> {
        let conn = client.conn();
        let parsed = parse_bucket_id(&state.id)?;
        let target = &target_of(&parsed);
        let id = state.id.as_str();

        let config = match read_section(
            client,
            is_new,
            &[S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError],
            move || async move {
                conn.get_bucket_encryption(target)
                    .await
                    .context("reading S3 Bucket Server-side Encryption Configuration", id)
            },
        )
        .await?
        {
            SectionRead::Present(config) => config,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        state.bucket = parsed.bucket;
        state.expected_bucket_owner = parsed.expected_bucket_owner;
        state.rule = flatten(&config);
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketServerSideEncryptionConfiguration {
    const TYPE_NAME: &'static str = "aws_s3_bucket_server_side_encryption_configuration";
    type Model = BucketServerSideEncryptionConfigurationModel;

    async fn create(
        &self,
        client: &AwsClient,
        mut plan: BucketServerSideEncryptionConfigurationModel,
    ) -> ProviderResult<BucketServerSideEncryptionConfigurationModel> {
        validate(&plan)?;
        plan.id = create_bucket_id(&plan.bucket, plan.expected_bucket_owner.as_deref());
        info!(bucket = %plan.bucket, "creating S3 Bucket Server-side Encryption Configuration");
        Self::put(client, &plan).await?;

        let conn = client.conn();
        let target = &target_of(&parse_bucket_id(&plan.id)?);
        let id = plan.id.as_str();
        retry_when_not_found(client.propagation_timeout(), move || async move {
            conn.get_bucket_encryption(target).await.not_found_on(
                &[
                    S3ErrorCode::NoSuchBucket,
                    S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError,
                ],
                KIND,
                "reading S3 Bucket Server-side Encryption Configuration",
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
        state: BucketServerSideEncryptionConfigurationModel,
    ) -> ProviderResult<Option<BucketServerSideEncryptionConfigurationModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketServerSideEncryptionConfigurationModel,
        mut plan: BucketServerSideEncryptionConfigurationModel,
    ) -> ProviderResult<BucketServerSideEncryptionConfigurationModel> {
        validate(&plan)?;
        plan.id = prior.id;
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(
        &self,
        client: &AwsClient,
        state: BucketServerSideEncryptionConfigurationModel,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let target = &target_of(&parse_bucket_id(&state.id)?);
        let id = state.id.as_str();
        info!(id, "deleting S3 Bucket Server-side Encryption Configuration");
        match conn.delete_bucket_encryption(target).await {
            Ok(()) => Ok(()),
            Err(e)
                if e.code_is(&[
                    S3ErrorCode::NoSuchBucket,
                    S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError,
                ]) =>
            {
                Ok(())
            }
            Err(e) => Err(ProviderError::api(
                "deleting S3 Bucket Server-side Encryption Configuration",
                id,
                e,
            )),
        }
    }

    fn import(&self, id: &str) -> ProviderResult<BucketServerSideEncryptionConfigurationModel> {
        let parsed = parse_bucket_id(id)?;
        Ok(BucketServerSideEncryptionConfigurationModel {
            id: id.to_owned(),
            bucket: parsed.bucket,
            expected_bucket_owner: parsed.expected_bucket_owner,
            rule: Vec::new(),
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

    fn kms_rule(key: &str) -> RuleModel {
        RuleModel {
            apply_server_side_encryption_by_default: vec![DefaultEncryptionModel {
                sse_algorithm: ServerSideEncryption::AwsKms,
                kms_master_key_id: Some(key.to_owned()),
            }],
            bucket_key_enabled: Some(true),
        }
    }

    #[tokio::test]
    async fn test_should_apply_kms_encryption_and_restore_default_on_delete() {
        let (client, mem) = client();
        mem.create_bucket(&CreateBucketInput {
            bucket: "enc".to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();

        let plan = BucketServerSideEncryptionConfigurationModel {
            bucket: "enc".to_owned(),
            expected_bucket_owner: Some("000000000000".to_owned()),
            rule: vec![kms_rule("alias/one")],
            ..BucketServerSideEncryptionConfigurationModel::default()
        };
        let state = BucketServerSideEncryptionConfiguration
            .create(&client, plan.clone())
            .await
            .unwrap();
        assert_eq!(state.id, "enc,000000000000");
        assert_eq!(state.rule, plan.rule);

        let mut next = state.clone();
        next.rule = vec![kms_rule("alias/two")];
        let updated = BucketServerSideEncryptionConfiguration
            .update(&client, state, next.clone())
            .await
            .unwrap();
        assert_eq!(updated.rule, next.rule);

        BucketServerSideEncryptionConfiguration
            .delete(&client, updated)
            .await
            .unwrap();
        let remote = mem.get_bucket_encryption(&BucketTarget::new("enc")).await.unwrap();
        let default = remote.rules[0]
            .apply_server_side_encryption_by_default
            .as_ref()
            .unwrap();
        assert_eq!(default.sse_algorithm, ServerSideEncryption::Aes256);
    }

    #[test]
    fn test_should_reject_kms_key_with_aes256() {
        let plan = BucketServerSideEncryptionConfigurationModel {
            bucket: "enc".to_owned(),
            rule: vec![RuleModel {
                apply_server_side_encryption_by_default: vec![DefaultEncryptionModel {
                    sse_algorithm: ServerSideEncryption::Aes256,
                    kms_master_key_id: Some("alias/key".to_owned()),
                }],
                bucket_key_enabled: None,
            }],
            ..BucketServerSideEncryptionConfigurationModel::default()
        };
        assert!(validate(&plan).is_err());
    }

    #[test]
    fn test_should_import_with_expected_owner() {
        let imported = BucketServerSideEncryptionConfiguration
            .import("enc,123456789012")
            .unwrap();
        assert_eq!(imported.bucket, "enc");
        assert_eq!(imported.expected_bucket_owner.as_deref(), Some("123456789012"));
    }
}
