//! Type-name registry of resources and data sources.
//!
//! The registry dispatches JSON-encoded configuration and state to the
//! resource registered under a type name, the way a gateway dispatches a
//! request to the service that claims it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::conn::AwsClient;
use crate::data_sources::{BucketDataSource, ObjectDataSource};
use crate::error::{ProviderError, ProviderResult};
use crate::resource::{DataSource, DynDataSource, DynResource, Resource};
use crate::resources::{
    Bucket, BucketAcl, BucketLifecycleConfiguration, BucketObjectLockConfiguration, BucketPolicy,
    BucketPublicAccessBlock, BucketReplicationConfiguration,
    BucketServerSideEncryptionConfiguration, BucketVersioning, BucketWebsiteConfiguration, Object,
};

/// Resources and data sources by type name.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<&'static str, Arc<dyn DynResource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DynDataSource>>,
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ResourceRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every S3 resource and data source.
    #[must_use]
    pub fn s3() -> Self {
        let mut registry = Self::new();
        registry.register(Bucket);
        registry.register(BucketAcl);
        registry.register(BucketVersioning);
        registry.register(BucketWebsiteConfiguration);
        registry.register(BucketPolicy);
        registry.register(BucketPublicAccessBlock);
        registry.register(BucketLifecycleConfiguration);
        registry.register(BucketReplicationConfiguration);
        registry.register(BucketServerSideEncryptionConfiguration);
        registry.register(BucketObjectLockConfiguration);
        registry.register(Object);
        registry.register_data_source(BucketDataSource);
        registry.register_data_source(ObjectDataSource);
        registry
    }

    /// Register a resource under its type name, replacing any previous one.
    pub fn register<R: Resource>(&mut self, resource: R) {
        self.resources.insert(R::TYPE_NAME, Arc::new(resource));
    }

    /// Register a data source under its type name.
    pub fn register_data_source<D: DataSource>(&mut self, data_source: D) {
        self.data_sources.insert(D::TYPE_NAME, Arc::new(data_source));
    }

    /// Registered resource type names, sorted.
    #[must_use]
    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    /// Registered data source type names, sorted.
    #[must_use]
    pub fn data_source_types(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }

    /// Look up a resource.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] for an unknown type name.
    pub fn resource(&self, type_name: &str) -> ProviderResult<&dyn DynResource> {
        self.resources
            .get(type_name)
            .map(AsRef::as_ref)
            .ok_or_else(|| ProviderError::validation(format!("unknown resource type {type_name:?}")))
    }

    /// Look up a data source.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] for an unknown type name.
    pub fn data_source(&self, type_name: &str) -> ProviderResult<&dyn DynDataSource> {
        self.data_sources
            .get(type_name)
            .map(AsRef::as_ref)
            .ok_or_else(|| {
                ProviderError::validation(format!("unknown data source type {type_name:?}"))
            })
    }

    /// Create a resource from its JSON plan.
    pub async fn create(
        &self,
        client: &AwsClient,
        type_name: &str,
        plan: Value,
    ) -> ProviderResult<Value> {
        let resource = self.resource(type_name)?;
        info!(resource = type_name, "creating");
        let state = resource.create_json(client, plan).await?;
        info!(resource = type_name, "creation complete");
        Ok(state)
    }

    /// Refresh a resource's JSON state.
    pub async fn read(
        &self,
        client: &AwsClient,
        type_name: &str,
        state: Value,
    ) -> ProviderResult<Option<Value>> {
        debug!(resource = type_name, "reading");
        self.resource(type_name)?.read_json(client, state).await
    }

    /// Update a resource from its prior JSON state to a JSON plan.
    pub async fn update(
        &self,
        client: &AwsClient,
        type_name: &str,
        prior: Value,
        plan: Value,
    ) -> ProviderResult<Value> {
        let resource = self.resource(type_name)?;
        info!(resource = type_name, "updating");
        resource.update_json(client, prior, plan).await
    }

    /// Delete a resource given its JSON state.
    pub async fn delete(
        &self,
        client: &AwsClient,
        type_name: &str,
        state: Value,
    ) -> ProviderResult<()> {
        let resource = self.resource(type_name)?;
        info!(resource = type_name, "destroying");
        resource.delete_json(client, state).await?;
        info!(resource = type_name, "destruction complete");
        Ok(())
    }

    /// Import a resource by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if nothing exists under the ID.
    pub async fn import(
        &self,
        client: &AwsClient,
        type_name: &str,
        id: &str,
    ) -> ProviderResult<Value> {
        let resource = self.resource(type_name)?;
        info!(resource = type_name, id, "importing");
        resource
            .import_json(client, id)
            .await?
            .ok_or_else(|| ProviderError::not_found(resource.type_name(), id))
    }

    /// Read a data source.
    pub async fn read_data(
        &self,
        client: &AwsClient,
        type_name: &str,
        config: Value,
    ) -> ProviderResult<Value> {
        debug!(data_source = type_name, "reading");
        self.data_source(type_name)?.read_json(client, config).await
    }
}

#[cfg(test)]
mod tests {
    use tfs3_core::ProviderConfig;

    use super::*;

    #[test]
    fn test_should_register_all_s3_types() {
        let registry = ResourceRegistry::s3();
        assert_eq!(
            registry.resource_types(),
            vec![
                "aws_s3_bucket",
                "aws_s3_bucket_acl",
                "aws_s3_bucket_lifecycle_configuration",
                "aws_s3_bucket_object_lock_configuration",
                "aws_s3_bucket_policy",
                "aws_s3_bucket_public_access_block",
                "aws_s3_bucket_replication_configuration",
                "aws_s3_bucket_server_side_encryption_configuration",
                "aws_s3_bucket_versioning",
                "aws_s3_bucket_website_configuration",
                "aws_s3_object",
            ]
        );
        assert_eq!(registry.data_source_types(), vec!["aws_s3_bucket", "aws_s3_object"]);
    }

    #[test]
    fn test_should_reject_unknown_types() {
        let registry = ResourceRegistry::s3();
        assert!(registry.resource("aws_s3_directory_bucket").is_err());
        assert!(registry.data_source("aws_s3_bucket_policy").is_err());
    }

    #[tokio::test]
    async fn test_should_dispatch_lifecycle_by_type_name() {
        let registry = ResourceRegistry::s3();
        let client = AwsClient::in_memory(&ProviderConfig::default());

        let state = registry
            .create(
                &client,
                "aws_s3_bucket",
                serde_json::json!({"bucket": "registry-test"}),
            )
            .await
            .unwrap();
        assert_eq!(state["id"], "registry-test");
        assert_eq!(state["arn"], "arn:aws:s3:::registry-test");

        let imported = registry
            .import(&client, "aws_s3_bucket", "registry-test")
            .await
            .unwrap();
        assert_eq!(imported["bucket"], "registry-test");

        let data = registry
            .read_data(
                &client,
                "aws_s3_bucket",
                serde_json::json!({"bucket": "registry-test"}),
            )
            .await
            .unwrap();
        assert_eq!(data["hosted_zone_id"], "Z3AQBSTGFYJSTF");

        registry
            .delete(&client, "aws_s3_bucket", state)
            .await
            .unwrap();
        let err = registry
            .import(&client, "aws_s3_bucket", "registry-test")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
