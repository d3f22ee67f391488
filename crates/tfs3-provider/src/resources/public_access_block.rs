//! The `aws_s3_bucket_public_access_block` resource.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_model::types::PublicAccessBlockConfiguration;
use tfs3_model::{BucketTarget, S3ErrorCode};
use tracing::info;

use super::{SectionRead, find_bucket, read_section, retry_write, validate_bucket_args};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::retry::{retry_until_not_found, retry_when};

const KIND: &str = "S3 Bucket Public Access Block";

/// The `aws_s3_bucket_public_access_block` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketPublicAccessBlock;

/// State of an `aws_s3_bucket_public_access_block`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct BucketPublicAccessBlockModel {
    /// The bucket name.
    pub id: String,
    pub bucket: String,
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl BucketPublicAccessBlockModel {
    fn expand(&self) -> PublicAccessBlockConfiguration {
        PublicAccessBlockConfiguration {
            block_public_acls: Some(self.block_public_acls),
            block_public_policy: Some(self.block_public_policy),
            ignore_public_acls: Some(self.ignore_public_acls),
            restrict_public_buckets: Some(self.restrict_public_buckets),
        }
    }
}

impl BucketPublicAccessBlock {
    /// Write the flags and wait until S3 returns them.
    async fn put(client: &AwsClient, plan: &BucketPublicAccessBlockModel) -> ProviderResult<()> {
        let conn = client.conn();
        let timeout = client.propagation_timeout();
        let bucket = plan.bucket.as_str();
        let target = &BucketTarget::new(bucket);
        let config = plan.expand();
        let wanted = &config;
        retry_write(timeout, move || async move {
            conn.put_public_access_block(target, wanted)
                .await
                .context("putting S3 Bucket Public Access Block", bucket)
        })
        .await?;

        retry_when(
            timeout,
            move || async move {
                let current = conn
                    .get_public_access_block(target)
                    .await
                    .context("reading S3 Bucket Public Access Block", bucket)?;
                if current == *wanted {
                    Ok(())
                } else {
                    Err(ProviderError::UnexpectedState(format!(
                        "S3 Bucket Public Access Block ({bucket}) not yet updated"
                    )))
                }
            },
            |e| {
                matches!(e, ProviderError::UnexpectedState(_))
                    || e.code_is(&[
                        S3ErrorCode::NoSuchBucket,
                        S3ErrorCode::NoSuchPublicAccessBlockConfiguration,
                    ])
            },
        )
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketPublicAccessBlockModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketPublicAccessBlockModel>> {
        let conn = client.conn();
        let id = state.id.as_str();
        let target = &BucketTarget::new(id);

        let config = match read_section(
            client,
            is_new,
            &[S3ErrorCode::NoSuchPublicAccessBlockConfiguration],
            move || async move {
                conn.get_public_access_block(target)
                    .await
                    .context("reading S3 Bucket Public Access Block", id)
            },
        )
        .await?
        {
            SectionRead::Present(config) => config,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        state.bucket = state.id.clone();
        state.block_public_acls = config.block_public_acls.unwrap_or_default();
        state.block_public_policy = config.block_public_policy.unwrap_or_default();
        state.ignore_public_acls = config.ignore_public_acls.unwrap_or_default();
        state.restrict_public_buckets = config.restrict_public_buckets.unwrap_or_default();
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketPublicAccessBlock {
    const TYPE_NAME: &'static str = "aws_s3_bucket_public_access_block";
    type Model = BucketPublicAccessBlockModel;

    async fn create(
        &self,
        client: &AwsClient,
        mut plan: BucketPublicAccessBlockModel,
    ) -> ProviderResult<BucketPublicAccessBlockModel> {
        validate_bucket_args(&plan.bucket, None)?;
        info!(bucket = %plan.bucket, "creating S3 Bucket Public Access Block");
        Self::put(client, &plan).await?;
        plan.id.clone_from(&plan.bucket);
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(
        &self,
        client: &AwsClient,
        state: BucketPublicAccessBlockModel,
    ) -> ProviderResult<Option<BucketPublicAccessBlockModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketPublicAccessBlockModel,
        mut plan: BucketPublicAccessBlockModel,
    ) -> ProviderResult<BucketPublicAccessBlockModel> {
        plan.id = prior.id;
        plan.bucket.clone_from(&plan.id);
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(&self, client: &AwsClient, state: BucketPublicAccessBlockModel) -> ProviderResult<()> {
        let conn = client.conn();
        let id = state.id.as_str();
        let target = &BucketTarget::new(id);
        info!(bucket = id, "deleting S3 Bucket Public Access Block");
        match conn.delete_public_access_block(target).await {
            Ok(()) => {}
            Err(e)
                if e.code_is(&[
                    S3ErrorCode::NoSuchBucket,
                    S3ErrorCode::NoSuchPublicAccessBlockConfiguration,
                ]) =>
            {
                return Ok(());
            }
            Err(e) => return Err(ProviderError::api("deleting S3 Bucket Public Access Block", id, e)),
        }

        retry_until_not_found(client.propagation_timeout(), move || async move {
            find_bucket(conn, target).await?;
            conn.get_public_access_block(target).await.not_found_on(
                &[S3ErrorCode::NoSuchPublicAccessBlockConfiguration],
                KIND,
                "reading S3 Bucket Public Access Block",
                id,
            )
        })
        .await
    }

    fn import(&self, id: &str) -> ProviderResult<BucketPublicAccessBlockModel> {
        if id.is_empty() {
            return Err(ProviderError::invalid_id(id, "expected BUCKET"));
        }
        Ok(BucketPublicAccessBlockModel {
            id: id.to_owned(),
            bucket: id.to_owned(),
            ..BucketPublicAccessBlockModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::object::CreateBucketInput;

    use super::*;
    use crate::conn::S3Api;
    use crate::resources::test_support::client;

    #[tokio::test]
    async fn test_should_block_public_access_and_remove_it() {
        let (client, mem) = client();
        mem.create_bucket(&CreateBucketInput {
            bucket: "pab".to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();

        let state = BucketPublicAccessBlock
            .create(
                &client,
                BucketPublicAccessBlockModel {
                    bucket: "pab".to_owned(),
                    block_public_acls: true,
                    restrict_public_buckets: true,
                    ..BucketPublicAccessBlockModel::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(state.id, "pab");
        assert!(state.block_public_acls);
        assert!(!state.block_public_policy);

        let mut plan = state.clone();
        plan.block_public_policy = true;
        let updated = BucketPublicAccessBlock.update(&client, state, plan).await.unwrap();
        assert!(updated.block_public_policy);

        BucketPublicAccessBlock.delete(&client, updated.clone()).await.unwrap();
        let err = mem.get_public_access_block(&BucketTarget::new("pab")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchPublicAccessBlockConfiguration);
        assert!(BucketPublicAccessBlock.read(&client, updated).await.unwrap().is_none());
    }
}
