//! The `aws_s3_bucket_policy` resource.
//!
//! The ID is the bucket name. The stored policy is the configured text when
//! S3 returns an equivalent document, so whitespace and ordering differences
//! never show up as drift.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_model::{BucketTarget, S3ErrorCode};
use tracing::info;

use super::{SectionRead, read_section, validate_bucket_args};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::policy::{normalize_json_string, policy_to_set};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::retry::{retry_when_aws_err_code_equals, retry_when_no_such_bucket};
use crate::validation::validate_json;

const KIND: &str = "S3 Bucket Policy";

/// The `aws_s3_bucket_policy` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketPolicy;

/// State of an `aws_s3_bucket_policy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketPolicyModel {
    /// The bucket name.
    pub id: String,
    /// The bucket.
    pub bucket: String,
    /// The policy document (JSON).
    pub policy: String,
}

impl BucketPolicy {
    async fn put(client: &AwsClient, plan: &BucketPolicyModel) -> ProviderResult<()> {
        let conn = client.conn();
        let bucket = plan.bucket.as_str();
        let target = &BucketTarget::new(bucket);
        let policy = normalize_json_string(&plan.policy)?;
        let policy = policy.as_str();
        retry_when_aws_err_code_equals(
            client.propagation_timeout(),
            move || async move {
                conn.put_bucket_policy(target, policy)
                    .await
                    .context("putting S3 Bucket Policy", bucket)
            },
            &[S3ErrorCode::MalformedPolicy, S3ErrorCode::NoSuchBucket],
        )
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketPolicyModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketPolicyModel>> {
        let conn = client.conn();
        let id = state.id.as_str();
        let target = &BucketTarget::new(id);

        let remote = match read_section(
            client,
            is_new,
            &[S3ErrorCode::NoSuchBucketPolicy],
            move || async move {
                conn.get_bucket_policy(target)
                    .await
                    .context("reading S3 Bucket Policy", id)
            },
        )
        .await?
        {
            SectionRead::Present(remote) => remote,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        state.policy = policy_to_set(&state.policy, &remote)?;
        state.bucket = state.id.clone();
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketPolicy {
    const TYPE_NAME: &'static str = "aws_s3_bucket_policy";
    type Model = BucketPolicyModel;

    async fn create(&self, client: &AwsClient, mut plan: BucketPolicyModel) -> ProviderResult<BucketPolicyModel> {
        validate_bucket_args(&plan.bucket, None)?;
        validate_json("policy", &plan.policy)?;
        info!(bucket = %plan.bucket, "creating S3 Bucket Policy");
        Self::put(client, &plan).await?;
        plan.id.clone_from(&plan.bucket);
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(&self, client: &AwsClient, state: BucketPolicyModel) -> ProviderResult<Option<BucketPolicyModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketPolicyModel,
        mut plan: BucketPolicyModel,
    ) -> ProviderResult<BucketPolicyModel> {
        validate_json("policy", &plan.policy)?;
        plan.id = prior.id;
        plan.bucket.clone_from(&plan.id);
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(&self, client: &AwsClient, state: BucketPolicyModel) -> ProviderResult<()> {
        let conn = client.conn();
        let id = state.id.as_str();
        let target = &BucketTarget::new(id);
        info!(bucket = id, "deleting S3 Bucket Policy");
        let result = retry_when_no_such_bucket(client.propagation_timeout(), move || async move {
            conn.delete_bucket_policy(target)
                .await
                .context("deleting S3 Bucket Policy", id)
        })
        .await;
        match result {
            Err(e) if e.code_is(&[S3ErrorCode::NoSuchBucket]) => Ok(()),
            other => other,
        }
    }

    fn import(&self, id: &str) -> ProviderResult<BucketPolicyModel> {
        if id.is_empty() {
            return Err(ProviderError::invalid_id(id, "expected BUCKET"));
        }
        Ok(BucketPolicyModel {
            id: id.to_owned(),
            bucket: id.to_owned(),
            policy: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tfs3_model::object::CreateBucketInput;

    use super::*;
    use crate::conn::S3Api;
    use crate::resources::test_support::client;

    const POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::pol/*"}
  ]
}"#;

    #[tokio::test]
    async fn test_should_keep_configured_policy_text_when_equivalent() {
        let (client, mem) = client();
        mem.create_bucket(&CreateBucketInput {
            bucket: "pol".to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();

        let state = BucketPolicy
            .create(
                &client,
                BucketPolicyModel {
                    bucket: "pol".to_owned(),
                    policy: POLICY.to_owned(),
                    ..BucketPolicyModel::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(state.id, "pol");
        assert_eq!(state.policy, normalize_json_string(POLICY).unwrap());

        let imported = BucketPolicy.import("pol").unwrap();
        let read = BucketPolicy.read(&client, imported).await.unwrap().unwrap();
        assert_eq!(read.policy, state.policy);

        BucketPolicy.delete(&client, state.clone()).await.unwrap();
        assert!(BucketPolicy.read(&client, state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_reject_invalid_json() {
        let (client, _) = client();
        let err = BucketPolicy
            .create(
                &client,
                BucketPolicyModel {
                    bucket: "pol".to_owned(),
                    policy: "{not json".to_owned(),
                    ..BucketPolicyModel::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_should_ignore_missing_bucket_on_delete() {
        let (client, _) = client();
        let client = client.with_propagation_timeout(Duration::ZERO);
        BucketPolicy
            .delete(&client, BucketPolicy.import("gone").unwrap())
            .await
            .unwrap();
    }
}
