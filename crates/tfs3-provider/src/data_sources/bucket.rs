//! The `aws_s3_bucket` data source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfs3_core::AwsRegion;
use tfs3_core::endpoints::{arn, bucket_regional_domain_name, hosted_zone_id_for_region, website_endpoint};
use tfs3_model::{BucketTarget, S3ErrorCode};
use tracing::warn;

use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult, S3ResultExt};
use crate::resource::DataSource;
use crate::resources::find_bucket;

/// The `aws_s3_bucket` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketDataSource;

/// Arguments and results of the `aws_s3_bucket` data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct BucketDataSourceModel {
    /// The bucket to look up.
    pub bucket: String,

    pub id: String,
    pub arn: String,
    pub bucket_domain_name: String,
    pub bucket_regional_domain_name: String,
    pub hosted_zone_id: Option<String>,
    pub region: String,
    /// Set only when the bucket has a website configuration.
    pub website_endpoint: Option<String>,
    pub website_domain: Option<String>,
}

#[async_trait]
impl DataSource for BucketDataSource {
    const TYPE_NAME: &'static str = "aws_s3_bucket";
    type Model = BucketDataSourceModel;

    async fn read(
        &self,
        client: &AwsClient,
        mut config: BucketDataSourceModel,
    ) -> ProviderResult<BucketDataSourceModel> {
        if config.bucket.is_empty() {
            return Err(ProviderError::validation("bucket: required"));
        }
        let conn = client.conn();
        let bucket = config.bucket.clone();
        let id = bucket.as_str();
        let target = &BucketTarget::new(id);

        find_bucket(conn, target).await?;

        let constraint = conn
            .get_bucket_location(target)
            .await
            .context("reading S3 Bucket location", id)?;
        let region = AwsRegion::from_location_constraint(&constraint);

        config.id = bucket.clone();
        config.arn = arn(client.partition().id(), "s3", "", "", id);
        config.bucket_domain_name = client.partition_hostname(&format!("{id}.s3"));
        config.bucket_regional_domain_name = bucket_regional_domain_name(id, region.as_str());
        config.hosted_zone_id = match hosted_zone_id_for_region(region.as_str()) {
            Ok(zone) => Some(zone.to_owned()),
            Err(e) => {
                warn!(bucket = id, error = %e, "unable to determine S3 Bucket hosted zone ID");
                None
            }
        };

        match conn.get_bucket_website(target).await {
            Ok(_) => {
                let endpoint = website_endpoint(id, region.as_str());
                config.website_endpoint = Some(endpoint.endpoint);
                config.website_domain = Some(endpoint.domain);
            }
            Err(e) if e.code_is(&[S3ErrorCode::NoSuchWebsiteConfiguration]) => {
                config.website_endpoint = None;
                config.website_domain = None;
            }
            Err(e) => {
                warn!(bucket = id, error = %e, "unable to read S3 Bucket website configuration");
            }
        }
        config.region = region.as_str().to_owned();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use tfs3_model::object::CreateBucketInput;
    use tfs3_model::types::{IndexDocument, WebsiteConfiguration};

    use super::*;
    use crate::conn::S3Api;
    use crate::resources::test_support::client_in;

    #[tokio::test]
    async fn test_should_describe_regional_website_bucket() {
        let (client, mem) = client_in("eu-central-1");
        mem.create_bucket(&CreateBucketInput {
            bucket: "lookup".to_owned(),
            location_constraint: Some("eu-central-1".to_owned()),
            ..CreateBucketInput::default()
        })
        .await
        .unwrap();

        let data = BucketDataSource
            .read(
                &client,
                BucketDataSourceModel {
                    bucket: "lookup".to_owned(),
                    ..BucketDataSourceModel::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(data.id, "lookup");
        assert_eq!(data.region, "eu-central-1");
        assert_eq!(data.arn, "arn:aws:s3:::lookup");
        assert_eq!(data.bucket_regional_domain_name, "lookup.s3.eu-central-1.amazonaws.com");
        assert_eq!(data.hosted_zone_id.as_deref(), Some("Z21DNDUVLTQW6Q"));
        assert!(data.website_endpoint.is_none());

        mem.put_bucket_website(
            &BucketTarget::new("lookup"),
            &WebsiteConfiguration {
                index_document: Some(IndexDocument {
                    suffix: "index.html".to_owned(),
                }),
                ..WebsiteConfiguration::default()
            },
        )
        .await
        .unwrap();
        let data = BucketDataSource
            .read(
                &client,
                BucketDataSourceModel {
                    bucket: "lookup".to_owned(),
                    ..BucketDataSourceModel::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            data.website_endpoint.as_deref(),
            Some("lookup.s3-website.eu-central-1.amazonaws.com")
        );
    }

    #[tokio::test]
    async fn test_should_fail_for_missing_bucket() {
        let (client, _) = client_in("us-east-1");
        let err = BucketDataSource
            .read(
                &client,
                BucketDataSourceModel {
                    bucket: "missing".to_owned(),
                    ..BucketDataSourceModel::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
