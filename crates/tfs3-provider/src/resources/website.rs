//! The `aws_s3_bucket_website_configuration` resource.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_core::AwsRegion;
use tfs3_core::endpoints::website_endpoint;
use tfs3_model::S3ErrorCode;
use tfs3_model::types::{
    Condition, ErrorDocument, IndexDocument, Protocol, Redirect, RedirectAllRequestsTo,
    RoutingRule, WebsiteConfiguration,
};
use tracing::info;

use super::{SectionRead, read_section, retry_write, target_of, validate_bucket_args, validate_max_one};
use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::ids::{create_bucket_id, parse_bucket_id};
use crate::policy::{normalize_routing_rules, parse_routing_rules};
use crate::resource::{Resource, found_after_write, removed_from_state};
use crate::validation::conflicts_with;

const KIND: &str = "S3 Bucket Website Configuration";

/// The `aws_s3_bucket_website_configuration` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketWebsiteConfiguration;

/// State of an `aws_s3_bucket_website_configuration`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketWebsiteConfigurationModel {
    /// `bucket[,expected_bucket_owner]`.
    pub id: String,
    /// The bucket.
    pub bucket: String,
    /// Account expected to own the bucket.
    pub expected_bucket_owner: Option<String>,
    /// At most one element.
    pub error_document: Vec<ErrorDocumentModel>,
    /// At most one element.
    pub index_document: Vec<IndexDocumentModel>,
    /// At most one element. Conflicts with every other document setting.
    pub redirect_all_requests_to: Vec<RedirectAllModel>,
    /// Routing rules as blocks. Conflicts with `routing_rules`.
    pub routing_rule: Option<Vec<RoutingRuleModel>>,
    /// Routing rules as a JSON array. Conflicts with `routing_rule`.
    pub routing_rules: Option<String>,
    /// Computed website endpoint.
    pub website_endpoint: String,
    /// Computed website domain, usable as a Route 53 alias target.
    pub website_domain: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocumentModel {
    pub key: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocumentModel {
    pub suffix: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectAllModel {
    pub host_name: String,
    pub protocol: Option<Protocol>,
}

/// A routing rule block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingRuleModel {
    /// At most one element.
    pub condition: Vec<ConditionModel>,
    /// Exactly one element.
    pub redirect: Vec<RedirectModel>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionModel {
    pub http_error_code_returned_equals: Option<String>,
    pub key_prefix_equals: Option<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectModel {
    pub host_name: Option<String>,
    pub http_redirect_code: Option<String>,
    pub protocol: Option<Protocol>,
    pub replace_key_prefix_with: Option<String>,
    pub replace_key_with: Option<String>,
}

fn validate(plan: &BucketWebsiteConfigurationModel) -> ProviderResult<()> {
    validate_bucket_args(&plan.bucket, plan.expected_bucket_owner.as_deref())?;
    validate_max_one("error_document", Some(&plan.error_document))?;
    validate_max_one("index_document", Some(&plan.index_document))?;
    validate_max_one("redirect_all_requests_to", Some(&plan.redirect_all_requests_to))?;

    let has_rule_blocks = plan.routing_rule.as_ref().is_some_and(|r| !r.is_empty());
    let has_rules_json = plan.routing_rules.as_deref().is_some_and(|r| !r.is_empty());
    let redirect_all = !plan.redirect_all_requests_to.is_empty();
    conflicts_with("routing_rule", has_rule_blocks, "routing_rules", has_rules_json)?;
    conflicts_with("redirect_all_requests_to", redirect_all, "index_document", !plan.index_document.is_empty())?;
    conflicts_with("redirect_all_requests_to", redirect_all, "error_document", !plan.error_document.is_empty())?;
    conflicts_with("redirect_all_requests_to", redirect_all, "routing_rule", has_rule_blocks)?;
    if !redirect_all && plan.index_document.is_empty() {
        return Err(ProviderError::validation(
            "one of `index_document,redirect_all_requests_to` must be specified",
        ));
    }
    for rule in plan.routing_rule.iter().flatten() {
        validate_max_one("routing_rule.condition", Some(&rule.condition))?;
        if rule.redirect.len() != 1 {
            return Err(ProviderError::validation(
                "routing_rule.redirect: exactly one block is required",
            ));
        }
    }
    if has_rules_json {
        parse_routing_rules(plan.routing_rules.as_deref().unwrap_or_default())?;
    }
    Ok(())
}

fn expand(plan: &BucketWebsiteConfigurationModel) -> ProviderResult<WebsiteConfiguration> {
    let routing_rules = match plan.routing_rules.as_deref().filter(|r| !r.is_empty()) {
        Some(json) => parse_routing_rules(json)?,
        None => plan
            .routing_rule
            .iter()
            .flatten()
            .map(|r| RoutingRule {
                condition: r.condition.first().map(|c| Condition {
                    http_error_code_returned_equals: c.http_error_code_returned_equals.clone(),
                    key_prefix_equals: c.key_prefix_equals.clone(),
                }),
                redirect: r
                    .redirect
                    .first()
                    .map(|r| Redirect {
                        host_name: r.host_name.clone(),
                        http_redirect_code: r.http_redirect_code.clone(),
                        protocol: r.protocol,
                        replace_key_prefix_with: r.replace_key_prefix_with.clone(),
                        replace_key_with: r.replace_key_with.clone(),
                    })
                    .unwrap_or_default(),
            })
            .collect(),
    };
    Ok(WebsiteConfiguration {
        error_document: plan.error_document.first().map(|d| ErrorDocument { key: d.key.clone() }),
        index_document: plan
            .index_document
            .first()
            .map(|d| IndexDocument { suffix: d.suffix.clone() }),
        redirect_all_requests_to: plan.redirect_all_requests_to.first().map(|r| {
            RedirectAllRequestsTo {
                host_name: r.host_name.clone(),
                protocol: r.protocol,
            }
        }),
        routing_rules,
    })
}

fn flatten_routing_rules(rules: &[RoutingRule]) -> Vec<RoutingRuleModel> {
    rules
        .iter()
        .map(|r| RoutingRuleModel {
            condition: r
                .condition
                .iter()
                .map(|c| ConditionModel {
                    http_error_code_returned_equals: c.http_error_code_returned_equals.clone(),
                    key_prefix_equals: c.key_prefix_equals.clone(),
                })
                .collect(),
            redirect: vec![RedirectModel {
                host_name: r.redirect.host_name.clone(),
                http_redirect_code: r.redirect.http_redirect_code.clone(),
                protocol: r.redirect.protocol,
                replace_key_prefix_with: r.redirect.replace_key_prefix_with.clone(),
                replace_key_with: r.redirect.replace_key_with.clone(),
            }],
        })
        .collect()
}

impl BucketWebsiteConfiguration {
    async fn put(client: &AwsClient, plan: &BucketWebsiteConfigurationModel) -> ProviderResult<()> {
        let conn = client.conn();
        let target = &target_of(&parse_bucket_id(&plan.id)?);
        let bucket = plan.bucket.as_str();
        let config = &expand(plan)?;
        retry_write(client.propagation_timeout(), move || async move {
            conn.put_bucket_website(target, config)
                .await
                .context("putting S3 Bucket Website Configuration", bucket)
        })
        .await
    }

    async fn refresh(
        client: &AwsClient,
        mut state: BucketWebsiteConfigurationModel,
        is_new: bool,
    ) -> ProviderResult<Option<BucketWebsiteConfigurationModel>> {
        let parsed = parse_bucket_id(&state.id)?;
        let conn = client.conn();
        let target = &target_of(&parsed);
        let id = state.id.as_str();

        let config = match read_section(
            client,
            is_new,
            &[S3ErrorCode::NoSuchWebsiteConfiguration],
            move || async move {
                conn.get_bucket_website(target)
                    .await
                    .context("reading S3 Bucket Website Configuration", id)
            },
        )
        .await?
        {
            SectionRead::Present(config) => config,
            SectionRead::Absent | SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };

        let region = match read_section(client, is_new, &[], move || async move {
            conn.get_bucket_location(target)
                .await
                .context("reading S3 Bucket region", id)
        })
        .await?
        {
            SectionRead::Present(constraint) => AwsRegion::from_location_constraint(&constraint),
            SectionRead::Absent => AwsRegion::new(client.region()),
            SectionRead::BucketGone => return Ok(removed_from_state(KIND, id)),
        };
        let endpoint = website_endpoint(&parsed.bucket, region.as_str());

        state.error_document = config
            .error_document
            .map(|d| ErrorDocumentModel { key: d.key })
            .into_iter()
            .collect();
        state.index_document = config
            .index_document
            .map(|d| IndexDocumentModel { suffix: d.suffix })
            .into_iter()
            .collect();
        state.redirect_all_requests_to = config
            .redirect_all_requests_to
            .map(|r| RedirectAllModel {
                host_name: r.host_name,
                protocol: r.protocol,
            })
            .into_iter()
            .collect();
        if state.routing_rules.is_some() {
            state.routing_rules = if config.routing_rules.is_empty() {
                None
            } else {
                Some(normalize_routing_rules(&config.routing_rules)?)
            };
        }
        state.routing_rule = Some(flatten_routing_rules(&config.routing_rules));
        state.bucket = parsed.bucket;
        state.expected_bucket_owner = parsed.expected_bucket_owner;
        state.website_endpoint = endpoint.endpoint;
        state.website_domain = endpoint.domain;
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for BucketWebsiteConfiguration {
    const TYPE_NAME: &'static str = "aws_s3_bucket_website_configuration";
    type Model = BucketWebsiteConfigurationModel;

    async fn create(
        &self,
        client: &AwsClient,
        mut plan: BucketWebsiteConfigurationModel,
    ) -> ProviderResult<BucketWebsiteConfigurationModel> {
        validate(&plan)?;
        plan.id = create_bucket_id(&plan.bucket, plan.expected_bucket_owner.as_deref());
        info!(bucket = %plan.bucket, "creating S3 Bucket Website Configuration");
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, true).await?)
    }

    async fn read(
        &self,
        client: &AwsClient,
        state: BucketWebsiteConfigurationModel,
    ) -> ProviderResult<Option<BucketWebsiteConfigurationModel>> {
        Self::refresh(client, state, false).await
    }

    async fn update(
        &self,
        client: &AwsClient,
        prior: BucketWebsiteConfigurationModel,
        mut plan: BucketWebsiteConfigurationModel,
    ) -> ProviderResult<BucketWebsiteConfigurationModel> {
        plan.id = prior.id;
        // Rules read back into the computed blocks must not clash with JSON rules.
        if plan.routing_rules.as_deref().is_some_and(|r| !r.is_empty()) {
            plan.routing_rule = None;
        }
        validate(&plan)?;
        Self::put(client, &plan).await?;
        let id = plan.id.clone();
        found_after_write(KIND, &id, Self::refresh(client, plan, false).await?)
    }

    async fn delete(
        &self,
        client: &AwsClient,
        state: BucketWebsiteConfigurationModel,
    ) -> ProviderResult<()> {
        let target = target_of(&parse_bucket_id(&state.id)?);
        info!(id = %state.id, "deleting S3 Bucket Website Configuration");
        match client.conn().delete_bucket_website(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.code_is(&[S3ErrorCode::NoSuchBucket, S3ErrorCode::NoSuchWebsiteConfiguration]) => Ok(()),
            Err(e) => Err(ProviderError::api(
                "deleting S3 Bucket Website Configuration",
                state.id,
                e,
            )),
        }
    }

    fn import(&self, id: &str) -> ProviderResult<BucketWebsiteConfigurationModel> {
        let parsed = parse_bucket_id(id)?;
        Ok(BucketWebsiteConfigurationModel {
            id: id.to_owned(),
            bucket: parsed.bucket,
            expected_bucket_owner: parsed.expected_bucket_owner,
            ..BucketWebsiteConfigurationModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::BucketTarget;
    use tfs3_model::object::CreateBucketInput;

    use super::*;
    use crate::conn::{InMemoryS3, S3Api};
    use crate::resources::test_support::{client, client_in};

    async fn bucket(mem: &InMemoryS3, name: &str, region: Option<&str>) {
        mem.create_bucket(&CreateBucketInput {
            bucket: name.to_owned(),
            location_constraint: region.map(ToOwned::to_owned),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();
    }

    fn site(bucket: &str) -> BucketWebsiteConfigurationModel {
        BucketWebsiteConfigurationModel {
            bucket: bucket.to_owned(),
            index_document: vec![IndexDocumentModel {
                suffix: "index.html".to_owned(),
            }],
            error_document: vec![ErrorDocumentModel {
                key: "error.html".to_owned(),
            }],
            ..BucketWebsiteConfigurationModel::default()
        }
    }

    #[tokio::test]
    async fn test_should_configure_website_with_routing_rule_blocks() {
        let (client, mem) = client_in("us-west-2");
        bucket(&mem, "site", Some("us-west-2")).await;

        let mut plan = site("site");
        plan.routing_rule = Some(vec![RoutingRuleModel {
            condition: vec![ConditionModel {
                key_prefix_equals: Some("docs/".to_owned()),
                ..ConditionModel::default()
            }],
            redirect: vec![RedirectModel {
                replace_key_prefix_with: Some("documents/".to_owned()),
                ..RedirectModel::default()
            }],
        }]);
        let state = BucketWebsiteConfiguration.create(&client, plan.clone()).await.unwrap();
        assert_eq!(state.routing_rule, plan.routing_rule);
        assert!(state.routing_rules.is_none());
        assert_eq!(state.website_endpoint, "site.s3-website-us-west-2.amazonaws.com");
        assert_eq!(state.website_domain, "s3-website-us-west-2.amazonaws.com");

        BucketWebsiteConfiguration.delete(&client, state.clone()).await.unwrap();
        assert!(BucketWebsiteConfiguration.read(&client, state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_keep_routing_rules_json() {
        let (client, mem) = client();
        bucket(&mem, "json-site", None).await;

        let mut plan = site("json-site");
        plan.routing_rules = Some(
            r#"[{"Condition":{"KeyPrefixEquals":"img/"},"Redirect":{"ReplaceKeyPrefixWith":"images/"}}]"#
                .to_owned(),
        );
        let state = BucketWebsiteConfiguration.create(&client, plan).await.unwrap();
        assert_eq!(
            state.routing_rules.as_deref(),
            Some(r#"[{"Condition":{"KeyPrefixEquals":"img/"},"Redirect":{"ReplaceKeyPrefixWith":"images/"}}]"#)
        );
        assert_eq!(state.website_endpoint, "json-site.s3-website-us-east-1.amazonaws.com");

        let mut next = state.clone();
        next.routing_rules = Some(String::new());
        next.routing_rule = Some(Vec::new());
        let updated = BucketWebsiteConfiguration.update(&client, state, next).await.unwrap();
        assert!(updated.routing_rules.is_none());
        let remote = mem.get_bucket_website(&BucketTarget::new("json-site")).await.unwrap();
        assert!(remote.routing_rules.is_empty());
    }

    #[test]
    fn test_should_reject_redirect_all_with_documents() {
        let mut plan = site("b");
        plan.redirect_all_requests_to = vec![RedirectAllModel {
            host_name: "example.com".to_owned(),
            protocol: Some(Protocol::Https),
        }];
        assert!(validate(&plan).is_err());

        plan.index_document.clear();
        plan.error_document.clear();
        assert!(validate(&plan).is_ok());

        plan.redirect_all_requests_to.clear();
        assert!(validate(&plan).is_err());
    }
}
