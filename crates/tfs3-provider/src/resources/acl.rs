//! The `aws_s3_bucket_acl` resource.
//!
//! Either a canned ACL or a full access control policy. The canned ACL is
//! part of the resource ID because S3 cannot report which canned ACL
//! produced a set of grants.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_model::BucketTarget;
use tfs3_model::object::BucketAclInput;
use tfs3_model::types::{
    AccessControlPolicy, BucketCannedAcl, Grant, Grantee, GranteeType, Owner, Permission,
};
use tracing::info;

use super::{SectionRead, read_section, retry_write, validate_bucket_args, validate_max_one};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::{BucketAclId, create_bucket_acl_id, parse_bucket_acl_id};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::validation::conflicts_with;

const KIND: &str = "S3 Bucket ACL";

/// The `aws_s3_bucket_acl` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketAcl;

/// State of an `aws_s3_bucket_acl`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketAclModel {
    /// `bucket[,expected_bucket_owner][,acl]`.
    pub id: String,
    /// The bucket.
    pub bucket: String,
    /// Account expected to own the bucket.
    pub expected_bucket_owner: Option<String>,
    /// Canned ACL. Conflicts with `access_control_policy`.
    pub acl: Option<BucketCannedAcl>,
    /// Explicit grants and owner. Computed when `acl` is used.
    pub access_control_policy: Option<Vec<AccessControlPolicyModel>>,
}

/// An access control policy block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessControlPolicyModel {
    /// Grants.
    pub grant: Vec<GrantModel>,
    /// The owner. At most one element.
    pub owner: Vec<OwnerModel>,
}

/// One grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantModel {
    /// The grantee. Exactly one element.
    #[serde(default)]
    pub grantee: Vec<GranteeModel>,
    /// The permission granted.
    pub permission: Permission,
}

/// A grantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GranteeModel {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub r#type: GranteeType,
    #[serde(default)]
    pub uri: Option<String>,
}

/// An owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct OwnerModel {
    pub id: String,
    pub display_name: Option<String>,
}

fn validate(plan: &BucketAclModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, plan.expected_bucket_owner.as_deref())?;
    let has_policy = plan.access_control_policy.as_ref().is_some_and(|p| !p.is_empty());
    conflicts_with("acl", plan.acl.is_some(), "access_control_policy", has_policy)?;
    if plan.acl.is_none() && !has_policy {
        return Err(ProviderError::validation(
            "one of `acl,access_control_policy` must be specified",
        ));
    }
    validate_max_one("access_control_policy", plan.access_control_policy.as_ref())?;
    for policy in plan.access_control_policy.iter().flatten() {
        validate_max_one("access_control_policy.owner", Some(&policy.owner))?;
        for grant in &policy.grant {
            if grant.grantee.len() != 1 {
                return Err(ProviderError::validation(
                    "access_control_policy.grant: exactly one grantee is required",
                ));
            }
            let grantee = &grant.grantee[0];
            let identified = match grantee.r#type {
                GranteeType::CanonicalUser => grantee.id.is_some(),
                GranteeType::AmazonCustomerByEmail => grantee.email_address.is_some(),
                GranteeType::Group => grantee.uri.is_some(),
            };
            if !identified {
                return Err(ProviderError::validation(format!(
                    "access_control_policy.grant: grantee of type {} is missing its identifier",
                    grantee.r#type
                )));
            }
        }
    }
    Ok(())
}

fn expand_policy(policy: &AccessControlPolicyModel, current_owner: Option<Owner>) -> AccessControlPolicy {
    let owner = policy
        .owner
        .first()
        .map(|o| Owner {
            display_name: o.display_name.clone(),
            id: Some(o.id.clone()),
        })
        .or(current_owner);
    AccessControlPolicy {
        grants: policy
            .grant
            .iter()
            .filter_map(|g| {
                let grantee = g.grantee.first()?;
                Some(Grant {
                    grantee: Grantee {
                        display_name: None,
                        email_address: grantee.email_address.clone(),
                        id: grantee.id.clone(),
                        r#type: grantee.r#type,
                        uri: grantee.uri.clone(),
                    },
                    permission: g.permission,
                })
            })
            .collect(),
        owner,
    }
}

fn grant_key(g: &GrantModel) -> (String, Option<String>, Option<String>, &'static str) {
    let grantee = g.grantee.first();
    (
        grantee.map(|x| x.r#type.as_str().to_owned()).unwrap_or_default(),
        grantee.and_then(|x| x.id.clone()),
        grantee.and_then(|x| x.uri.clone()),
        g.permission.as_str(),
    )
}

fn flatten_policy(policy: AccessControlPolicy) -> AccessControlPolicyModel {
    let mut grant: Vec<GrantModel> = policy
        .grants
        .into_iter()
        .map(|g| GrantModel {
            grantee: vec![GranteeModel {
                display_name: g.grantee.display_name,
                email_address: g.grantee.email_address,
                id: g.grantee.id,
                r#type: g.grantee.r#type,
                uri: g.grantee.uri,
            }],
            permission: g.permission,
        })
        .collect();
    grant.sort_by_key(grant_key);
    AccessControlPolicyModel {
        grant,
        owner: policy
            .owner
            .map(|o| OwnerModel {
                id: o.id.unwrap_or_default(),
                display_name: o.display_name,
            })
            .into_iter()
            .collect(),
    }
}

/// Whether the remote policy matches the configured one. Grant order and
/// server-filled display names are ignored; an unconfigured owner matches any.
fn same_policy(configured: &AccessControlPolicyModel, remote: &AccessControlPolicyModel) -> bool {
    let grants = |p: &AccessControlPolicyModel| {
        let mut grants: Vec<_> = p
            .grant
            .iter()
            .map(|g| {
                let mut g = g.clone();
                for grantee in &mut g.grantee {
                    grantee.display_name = None;
                }
                g
            })
            .collect();
        grants.sort_by_key(grant_key);
        grants
    };
    let owner_matches = match configured.owner.first() {
        Some(owner) => remote.owner.first().is_some_and(|o| o.id == owner.id),
        None => true,
    };
    owner_matches && grants(configured) == grants(remote)
}

impl BucketAcl {
    async fn put(client: &AwsClient, id: &BucketAclId, plan: &BucketAclModel) -> ProviderResult<()> {
        let conn = client.conn();
        let timeout = client.propagation_timeout();
        let target = &BucketTarget::with_owner(&id.bucket, id.expected_bucket_owner.as_deref());
        let bucket = id.bucket.as_str();

        let input = match (plan.acl, plan.access_control_policy.as_ref().and_then(|p| p.first())) {
            (Some(acl), _) => BucketAclInput::Canned(acl),
            (None, Some(policy)) => {
                let current_owner = if policy.owner.is_empty() {
                    retry_write(timeout, move || async move {
                        conn.get_bucket_acl(target).await.context("reading S3 Bucket ACL", bucket)
                    })
                    .await?
                    .owner
                } else {
                    None
                };
                BucketAclInput::Policy(expand_policy(policy, current_owner))
            }
            (None, None) => BucketAclInput::Canned(BucketCannedAcl::Private),
        };
        let input = &input;
        retry_write(timeout, move || async move {
            conn.put_bucket_acl(target, input).await.context("putting S3 Bucket ACL", bucket)
        })
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketAclModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketAclModel>> {
        let parsed = parse_bucket_acl_id(&state.id)?;
        let conn = client.conn();
        let target = &BucketTarget::with_owner(&parsed.bucket, parsed.expected_bucket_owner.as_deref());
        let id = state.id.as_str();

        let policy = match read_section(client, is_new, &[], move || async move {
            conn.get_bucket_acl(target).await.context("reading S3 Bucket ACL", id)
        })
        .await?
        {
            SectionRead::Present(policy) => policy,
            SectionRead::Absent | SectionRead::BucketGone => {
                return Ok(removed_from_state(KIND, id));
            }
        };

        let remote = flatten_policy(policy);
        let keep_configured = state
            .access_control_policy
            .as_ref()
            .and_then(|p| p.first())
            .is_some_and(|configured| same_policy(configured, &remote));
        if !keep_configured {
            state.access_control_policy = Some(vec![remote]);
        }
        state.bucket = parsed.bucket;
        state.expected_bucket_owner = parsed.expected_bucket_owner;
        state.acl = parsed.acl;
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketAcl {
    const TYPE_NAME: &'static str = "aws_s3_bucket_acl";
    type Model = BucketAclModel;

    async fn create(&self, client: &AwsClient, mut plan: BucketAclModel) -> ProviderResult<BucketAclModel> {
        validate(&plan)?;
        plan.id = create_bucket_acl_id(&plan.bucket, plan.expected_bucket_owner.as_deref(), plan.acl);
        let parsed = parse_bucket_acl_id(&plan.id)?;
        info!(bucket = %plan.bucket, acl = ?plan.acl, "creating S3 Bucket ACL");
        Self::put(client, &parsed, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(&self, client: &AwsClient, state: BucketAclModel) -> ProviderResult<Option<BucketAclModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketAclModel,
        mut plan: BucketAclModel,
    ) -> ProviderResult<BucketAclModel> {
        validate(&plan)?;
        let parsed = parse_bucket_acl_id(&prior.id)?;
        if plan.bucket != parsed.bucket {
            return Err(ProviderError::validation("bucket: cannot be changed in place"));
        }
        Self::put(client, &parsed, &plan).await?;
        plan.id = if plan.acl == prior.acl {
            prior.id
        } else {
            create_bucket_acl_id(&plan.bucket, plan.expected_bucket_owner.as_deref(), plan.acl)
        };
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(&self, _client: &AwsClient, state: BucketAclModel) -> ProviderResult<()> {
        // S3 has no DeleteBucketAcl; the ACL stays on the bucket.
        info!(id = %state.id, "removing S3 Bucket ACL from state only");
        Ok(())
    }

    fn import(&self, id: &str) -> ProviderResult<BucketAclModel> {
        let parsed = parse_bucket_acl_id(id)?;
        Ok(BucketAclModel {
            id: id.to_owned(),
            bucket: parsed.bucket,
            expected_bucket_owner: parsed.expected_bucket_owner,
            acl: parsed.acl,
            access_control_policy: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::object::CreateBucketInput;

    use super::*;
    use crate::conn::S3Api;
    use crate::resources::test_support::client;

    async fn bucket(mem: &crate::conn::InMemoryS3, name: &str) {
        mem.create_bucket(&CreateBucketInput {
            bucket: name.to_owned(),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_should_apply_canned_acl_and_encode_it_in_id() {
        let (client, mem) = client();
        bucket(&mem, "acl-bucket").await;

        let state = BucketAcl
            .create(
                &client,
                BucketAclModel {
                    bucket: "acl-bucket".to_owned(),
                    acl: Some(BucketCannedAcl::PublicRead),
                    ..BucketAclModel::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(state.id, "acl-bucket,public-read");
        let policy = &state.access_control_policy.as_ref().unwrap()[0];
        assert!(policy.grant.iter().any(|g| g.permission == Permission::Read
            && g.grantee[0].r#type == GranteeType::Group));

        let mut plan = state.clone();
        plan.acl = Some(BucketCannedAcl::Private);
        plan.access_control_policy = None;
        let updated = BucketAcl.update(&client, state, plan).await.unwrap();
        assert_eq!(updated.id, "acl-bucket,private");
        assert_eq!(updated.access_control_policy.unwrap()[0].grant.len(), 1);
    }

    #[tokio::test]
    async fn test_should_apply_access_control_policy_with_current_owner() {
        let (client, mem) = client();
        bucket(&mem, "acp-bucket").await;

        let plan = BucketAclModel {
            bucket: "acp-bucket".to_owned(),
            access_control_policy: Some(vec![AccessControlPolicyModel {
                grant: vec![GrantModel {
                    grantee: vec![GranteeModel {
                        display_name: None,
                        email_address: None,
                        id: None,
                        r#type: GranteeType::Group,
                        uri: Some("http://acs.amazonaws.com/groups/s3/LogDelivery".to_owned()),
                    }],
                    permission: Permission::Write,
                }],
                owner: Vec::new(),
            }]),
            ..BucketAclModel::default()
        };
        let state = BucketAcl.create(&client, plan.clone()).await.unwrap();
        assert_eq!(state.id, "acp-bucket");
        assert_eq!(state.access_control_policy, plan.access_control_policy);

        let remote = mem.get_bucket_acl(&BucketTarget::new("acp-bucket")).await.unwrap();
        assert!(remote.owner.is_some());
        assert_eq!(remote.grants.len(), 1);
    }

    #[tokio::test]
    async fn test_should_require_exactly_one_of_acl_and_policy() {
        let (client, _) = client();
        let err = BucketAcl
            .create(
                &client,
                BucketAclModel {
                    bucket: "b".to_owned(),
                    ..BucketAclModel::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn test_should_import_acl_from_id() {
        let state = BucketAcl.import("b,123456789012,log-delivery-write").unwrap();
        assert_eq!(state.bucket, "b");
        assert_eq!(state.expected_bucket_owner.as_deref(), Some("123456789012"));
        assert_eq!(state.acl, Some(BucketCannedAcl::LogDeliveryWrite));
    }

    #[tokio::test]
    async fn test_should_drop_state_when_bucket_is_gone() {
        let (client, _) = client();
        let client = client.with_propagation_timeout(std::time::Duration::ZERO);
        let state = BucketAcl.import("missing").unwrap();
        assert!(BucketAcl.read(&client, state).await.unwrap().is_none());
    }
}
