//! The `aws_s3_bucket_versioning` resource.
//!
//! `Disabled` is only meaningful at create time, for buckets that never had
//! versioning: nothing is written. A bucket that was versioned can only be
//! suspended, which is also what delete does.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_model::S3ErrorCode;
use tfs3_model::types::{BucketVersioningStatus, MfaDeleteStatus, VersioningConfiguration};
use tracing::{info, warn};

use super::{
    SectionRead, read_section, retry_write, target_of, validate_bucket_args, validate_max_one,
};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::{create_bucket_id, parse_bucket_id};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::retry::retry_when;

const KIND: &str = "S3 Bucket Versioning";

/// The `aws_s3_bucket_versioning` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketVersioning;

/// Versioning state as configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning on.
    Enabled,
    /// Versioning suspended.
    Suspended,
    /// Never enabled.
    #[default]
    Disabled,
}

impl VersioningStatus {
    fn to_s3(self) -> Option<BucketVersioningStatus> {
        match self {
            Self::Enabled => Some(BucketVersioningStatus::Enabled),
            Self::Suspended => Some(BucketVersioningStatus::Suspended),
            Self::Disabled => None,
        }
    }

    fn from_s3(status: Option<BucketVersioningStatus>) -> Self {
        match status {
            Some(BucketVersioningStatus::Enabled) => Self::Enabled,
            Some(BucketVersioningStatus::Suspended) => Self::Suspended,
            None => Self::Disabled,
        }
    }
}

/// State of an `aws_s3_bucket_versioning`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketVersioningModel {
    /// `bucket[,expected_bucket_owner]`.
    pub id: String,
    /// The bucket.
    pub bucket: String,
    /// Account expected to own the bucket.
    pub expected_bucket_owner: Option<String>,
    /// `"{serial} {token}"` of the MFA device, required to change `mfa_delete`.
    pub mfa: Option<String>,
    /// Exactly one element.
    pub versioning_configuration: Vec<VersioningConfigurationModel>,
}

/// The `versioning_configuration` block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfigurationModel {
    /// Versioning state.
    pub status: VersioningStatus,
    /// MFA delete state.
    pub mfa_delete: Option<MfaDeleteStatus>,
}

impl BucketVersioningModel {
    fn configuration(&self) -> VersioningConfigurationModel {
        self.versioning_configuration.first().copied().unwrap_or_default()
    }
}

fn validate(plan: &BucketVersioningModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, plan.expected_bucket_owner.as_deref())?;
    if plan.versioning_configuration.is_empty() {
        return Err(ProviderError::validation(
            "versioning_configuration: exactly one block is required",
        ));
    }
    validate_max_one("versioning_configuration", Some(&plan.versioning_configuration))
}

impl BucketVersioning {
    /// Write `status` and wait until S3 reports it.
    async fn put(
        client: &AwsClient,
        state: &BucketVersioningModel,
        status: BucketVersioningStatus,
        mfa_delete: Option<MfaDeleteStatus>,
    ) -> ProviderResult<()> {
        let conn = client.conn();
        let timeout = client.propagation_timeout();
        let target = &target_of(&parse_bucket_id(&state.id)?);
        let bucket = state.bucket.as_str();
        let config = &VersioningConfiguration {
            status: Some(status),
            mfa_delete,
        };
        let mfa = state.mfa.as_deref();
        retry_write(timeout, move || async move {
            conn.put_bucket_versioning(target, config, mfa)
                .await
                .context("putting S3 Bucket Versioning", bucket)
        })
        .await?;

        retry_when(
            timeout,
            move || async move {
                let current = conn
                    .get_bucket_versioning(target)
                    .await
                    .context("reading S3 Bucket Versioning", bucket)?;
                if current.status == Some(status) {
                    Ok(())
                } else {
                    Err(ProviderError::UnexpectedState(format!(
                        "S3 Bucket Versioning ({bucket}) status is {:?}, want {status}",
                        current.status
                    )))
                }
            },
            |e| matches!(e, ProviderError::UnexpectedState(_)) || e.code_is(&[S3ErrorCode::NoSuchBucket]),
        )
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketVersioningModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketVersioningModel>> {
        let parsed = parse_bucket_id(&state.id)?;
        let conn = client.conn();
        let target = &target_of(&parsed);
        let id = state.id.as_str();

        let remote = match read_section(client, is_new, &[], move || async move {
            conn.get_bucket_versioning(target)
                .await
                .context("reading S3 Bucket Versioning", id)
        })
        .await?
        {
            SectionRead::Present(remote) => remote,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        state.bucket = parsed.bucket;
        state.expected_bucket_owner = parsed.expected_bucket_owner;
        state.versioning_configuration = vec![VersioningConfigurationModel {
            status: VersioningStatus::from_s3(remote.status),
            mfa_delete: remote.mfa_delete,
        }];
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketVersioning {
    const TYPE_NAME: &'static str = "aws_s3_bucket_versioning";
    type Model = BucketVersioningModel;

    async fn create(
        &self,
        client: &AwsClient,
        mut plan: BucketVersioningModel,
    ) -> ProviderResult<BucketVersioningModel> {
        validate(&plan)?;
        plan.id = create_bucket_id(&plan.bucket, plan.expected_bucket_owner.as_deref());
        let config = plan.configuration();

        match config.status.to_s3() {
            Some(status) => {
                info!(bucket = %plan.bucket, %status, "creating S3 Bucket Versioning");
                Self::put(client, &plan, status, config.mfa_delete).await?;
            }
            None => {
                info!(bucket = %plan.bucket, "versioning Disabled, nothing to write");
            }
        }

        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(
        &self,
        client: &AwsClient,
        state: BucketVersioningModel,
    ) -> ProviderResult<Option<BucketVersioningModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketVersioningModel,
        mut plan: BucketVersioningModel,
    ) -> ProviderResult<BucketVersioningModel> {
        validate(&plan)?;
        plan.id = prior.id.clone();
        let config = plan.configuration();
        let Some(status) = config.status.to_s3() else {
            return Err(ProviderError::validation(format!(
                "versioning_configuration.status cannot be updated from '{:?}' to 'Disabled'",
                prior.configuration().status
            )));
        };
        Self::put(client, &plan, status, config.mfa_delete).await?;

        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(&self, client: &AwsClient, state: BucketVersioningModel) -> ProviderResult<()> {
        let config = state.configuration();
        if config.status == VersioningStatus::Disabled {
            return Ok(());
        }
        let target = target_of(&parse_bucket_id(&state.id)?);
        let suspended = VersioningConfiguration {
            status: Some(BucketVersioningStatus::Suspended),
            mfa_delete: config.mfa_delete,
        };
        let result = client
            .conn()
            .put_bucket_versioning(&target, &suspended, state.mfa.as_deref())
            .await
            .context("deleting S3 Bucket Versioning", &state.bucket);
        match result {
            Err(e) if e.code_is(&[S3ErrorCode::NoSuchBucket]) => {
                warn!(id = %state.id, "bucket already gone");
                Ok(())
            }
            other => other,
        }
    }

    fn import(&self, id: &str) -> ProviderResult<BucketVersioningModel> {
        let parsed = parse_bucket_id(id)?;
        Ok(BucketVersioningModel {
            id: id.to_owned(),
            bucket: parsed.bucket,
            expected_bucket_owner: parsed.expected_bucket_owner,
            ..BucketVersioningModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tfs3_model::BucketTarget;
    use tfs3_model::object::CreateBucketInput;

    use super::*;
    use crate::conn::{InMemoryS3, S3Api};
    use crate::resources::test_support::client;

    fn plan(bucket: &str, status: VersioningStatus) -> BucketVersioningModel {
        BucketVersioningModel {
            bucket: bucket.to_owned(),
            versioning_configuration: vec![VersioningConfigurationModel {
                status,
                mfa_delete: None,
            }],
            ..BucketVersioningModel::default()
        }
    }

    async fn bucket(mem: &InMemoryS3, name: &str) {
        mem.create_bucket(&CreateBucketInput {
            bucket: name.to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_should_enable_then_suspend_on_delete() {
        let (client, mem) = client();
        bucket(&mem, "v").await;

        let state = BucketVersioning
            .create(&client, plan("v", VersioningStatus::Enabled))
            .await
            .unwrap();
        assert_eq!(state.id, "v");
        assert_eq!(state.configuration().status, VersioningStatus::Enabled);

        BucketVersioning.delete(&client, state).await.unwrap();
        let remote = mem.get_bucket_versioning(&BucketTarget::new("v")).await.unwrap();
        assert_eq!(remote.status, Some(BucketVersioningStatus::Suspended));
    }

    #[tokio::test]
    async fn test_should_write_nothing_for_disabled() {
        let (client, mem) = client();
        bucket(&mem, "d").await;

        let state = BucketVersioning
            .create(&client, plan("d", VersioningStatus::Disabled))
            .await
            .unwrap();
        assert_eq!(state.configuration().status, VersioningStatus::Disabled);
        assert!(!mem.calls().contains(&"put_bucket_versioning"));

        let err = BucketVersioning
            .update(&client, state.clone(), plan("d", VersioningStatus::Disabled))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));

        let updated = BucketVersioning
            .update(&client, state, plan("d", VersioningStatus::Suspended))
            .await
            .unwrap();
        assert_eq!(updated.configuration().status, VersioningStatus::Suspended);
    }

    #[tokio::test]
    async fn test_should_tolerate_missing_bucket_on_delete() {
        let (client, _) = client();
        let client = client.with_propagation_timeout(Duration::ZERO);
        let mut state = plan("gone", VersioningStatus::Enabled);
        state.id = "gone".to_owned();
        BucketVersioning.delete(&client, state.clone()).await.unwrap();
        assert!(BucketVersioning.read(&client, state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_not_wait_for_missing_bucket_on_delete() {
        let (client, mem) = client();
        let mut state = plan("vanished", VersioningStatus::Enabled);
        state.id = "vanished".to_owned();

        tokio::time::timeout(Duration::from_secs(5), BucketVersioning.delete(&client, state))
            .await
            .expect("delete should not retry a missing bucket")
            .unwrap();
        let puts = mem
            .calls()
            .iter()
            .filter(|c| **c == "put_bucket_versioning")
            .count();
        assert_eq!(puts, 1);
        assert!(!mem.calls().contains(&"get_bucket_versioning"));
    }
}
