//! The resource and data source interfaces.
//!
//! A [`Resource`] works on its own typed model: configuration and state are
//! the same serde struct, with computed attributes filled in by `create`,
//! `read` and `update`. [`DynResource`] erases the model to JSON so that
//! resources of every type can live in one registry, and bounds each
//! operation by the resource's [`Timeouts`].
//!
//! # Lifecycle
//!
//! ```text
//!   plan ──> create ──> (read, must exist) ──> state
//!   state ──> read ──> Some(state) | None (removed outside, drop from state)
//!   prior, plan ──> update ──> (read, must exist) ──> state
//!   state ──> delete
//!   id ──> import ──> read ──> state
//! ```

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::conn::AwsClient;
use crate::error::{ProviderError, ProviderResult};

/// Per-operation time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Limit for `create`.
    pub create: Duration,
    /// Limit for `read`.
    pub read: Duration,
    /// Limit for `update`.
    pub update: Duration,
    /// Limit for `delete`.
    pub delete: Duration,
}

impl Timeouts {
    /// The same limit for every operation.
    #[must_use]
    pub const fn uniform(limit: Duration) -> Self {
        Self {
            create: limit,
            read: limit,
            update: limit,
            delete: limit,
        }
    }

    /// Override the delete limit.
    #[must_use]
    pub const fn with_delete(mut self, limit: Duration) -> Self {
        self.delete = limit;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(20 * 60))
    }
}

/// A managed resource type such as `aws_s3_bucket`.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// The resource type name, e.g. `"aws_s3_bucket"`.
    const TYPE_NAME: &'static str;

    /// Configuration and state of one resource instance.
    type Model: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;

    /// Operation time limits.
    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Create the resource and return its state.
    async fn create(&self, client: &AwsClient, plan: Self::Model) -> ProviderResult<Self::Model>;

    /// Refresh the state. `None` means the resource no longer exists.
    async fn read(
        &self,
        client: &AwsClient,
        state: Self::Model,
    ) -> ProviderResult<Option<Self::Model>>;

    /// Apply the differences between `prior` state and `plan`.
    async fn update(
        &self,
        client: &AwsClient,
        prior: Self::Model,
        plan: Self::Model,
    ) -> ProviderResult<Self::Model>;

    /// Delete the resource.
    async fn delete(&self, client: &AwsClient, state: Self::Model) -> ProviderResult<()>;

    /// Build the minimal state for an import ID. The registry reads it
    /// afterwards.
    fn import(&self, id: &str) -> ProviderResult<Self::Model>;
}

/// A read-only data source such as the `aws_s3_bucket` data source.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// The data source type name.
    const TYPE_NAME: &'static str;

    /// Arguments and results.
    type Model: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;

    /// Read limit.
    fn timeout(&self) -> Duration {
        Duration::from_secs(20 * 60)
    }

    /// Look up the data.
    async fn read(&self, client: &AwsClient, config: Self::Model) -> ProviderResult<Self::Model>;
}

/// A [`Resource`] with its model erased to JSON.
#[async_trait]
pub trait DynResource: Send + Sync {
    /// The resource type name.
    fn type_name(&self) -> &'static str;

    /// Operation time limits.
    fn operation_timeouts(&self) -> Timeouts;

    /// See [`Resource::create`].
    async fn create_json(&self, client: &AwsClient, plan: Value) -> ProviderResult<Value>;

    /// See [`Resource::read`].
    async fn read_json(&self, client: &AwsClient, state: Value) -> ProviderResult<Option<Value>>;

    /// See [`Resource::update`].
    async fn update_json(
        &self,
        client: &AwsClient,
        prior: Value,
        plan: Value,
    ) -> ProviderResult<Value>;

    /// See [`Resource::delete`].
    async fn delete_json(&self, client: &AwsClient, state: Value) -> ProviderResult<()>;

    /// Import by ID and read the imported state.
    async fn import_json(&self, client: &AwsClient, id: &str) -> ProviderResult<Option<Value>>;
}

#[async_trait]
impl<R: Resource> DynResource for R {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn operation_timeouts(&self) -> Timeouts {
        self.timeouts()
    }

    async fn create_json(&self, client: &AwsClient, plan: Value) -> ProviderResult<Value> {
        let plan: R::Model = serde_json::from_value(plan)?;
        let state = bounded("create", self.timeouts().create, self.create(client, plan)).await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn read_json(&self, client: &AwsClient, state: Value) -> ProviderResult<Option<Value>> {
        let state: R::Model = serde_json::from_value(state)?;
        let state = bounded("read", self.timeouts().read, self.read(client, state)).await?;
        state.map(serde_json::to_value).transpose().map_err(Into::into)
    }

    async fn update_json(
        &self,
        client: &AwsClient,
        prior: Value,
        plan: Value,
    ) -> ProviderResult<Value> {
        let prior: R::Model = serde_json::from_value(prior)?;
        let plan: R::Model = serde_json::from_value(plan)?;
        let state = bounded(
            "update",
            self.timeouts().update,
            self.update(client, prior, plan),
        )
        .await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn delete_json(&self, client: &AwsClient, state: Value) -> ProviderResult<()> {
        let state: R::Model = serde_json::from_value(state)?;
        bounded("delete", self.timeouts().delete, self.delete(client, state)).await
    }

    async fn import_json(&self, client: &AwsClient, id: &str) -> ProviderResult<Option<Value>> {
        let state = self.import(id)?;
        let state = bounded("import", self.timeouts().read, self.read(client, state)).await?;
        state.map(serde_json::to_value).transpose().map_err(Into::into)
    }
}

/// A [`DataSource`] with its model erased to JSON.
#[async_trait]
pub trait DynDataSource: Send + Sync {
    /// The data source type name.
    fn type_name(&self) -> &'static str;

    /// See [`DataSource::read`].
    async fn read_json(&self, client: &AwsClient, config: Value) -> ProviderResult<Value>;
}

#[async_trait]
impl<D: DataSource> DynDataSource for D {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    async fn read_json(&self, client: &AwsClient, config: Value) -> ProviderResult<Value> {
        let config: D::Model = serde_json::from_value(config)?;
        let data = bounded("read", self.timeout(), self.read(client, config)).await?;
        Ok(serde_json::to_value(data)?)
    }
}

/// Run `fut`, failing with [`ProviderError::Timeout`] once `limit` elapses.
async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = ProviderResult<T>> + Send,
) -> ProviderResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(Box::new(
            ProviderError::UnexpectedState(format!("{operation} did not finish within {limit:?}")),
        ))),
    }
}

/// Require the state read right after a create or update.
///
/// A resource that was just written must be visible; a missing resource is
/// an error here instead of a removal from state.
pub fn found_after_write<T>(kind: &'static str, id: &str, state: Option<T>) -> ProviderResult<T> {
    state.ok_or_else(|| {
        ProviderError::UnexpectedState(format!("{kind} ({id}) not found after write"))
    })
}

/// Log the removal of a resource that disappeared outside of management.
pub fn removed_from_state<T>(kind: &'static str, id: &str) -> Option<T> {
    warn!(resource = kind, id, "not found, removing from state");
    None
}

/// `true` when the two values differ.
#[inline]
pub fn has_change<T: PartialEq>(prior: &T, plan: &T) -> bool {
    prior != plan
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tfs3_core::ProviderConfig;

    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Model {
        id: String,
        #[serde(default)]
        value: u32,
    }

    struct Slow;

    #[async_trait]
    impl Resource for Slow {
        const TYPE_NAME: &'static str = "test_slow";
        type Model = Model;

        fn timeouts(&self) -> Timeouts {
            Timeouts::uniform(Duration::from_secs(5))
        }

        async fn create(&self, _: &AwsClient, plan: Model) -> ProviderResult<Model> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(plan)
        }

        async fn read(&self, _: &AwsClient, state: Model) -> ProviderResult<Option<Model>> {
            Ok((state.id != "gone").then_some(state))
        }

        async fn update(&self, _: &AwsClient, _: Model, plan: Model) -> ProviderResult<Model> {
            Ok(Model {
                value: plan.value + 1,
                ..plan
            })
        }

        async fn delete(&self, _: &AwsClient, _: Model) -> ProviderResult<()> {
            Ok(())
        }

        fn import(&self, id: &str) -> ProviderResult<Model> {
            Ok(Model {
                id: id.to_owned(),
                value: 0,
            })
        }
    }

    fn client() -> AwsClient {
        AwsClient::in_memory(&ProviderConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_time_out_slow_operations() {
        let err = Slow
            .create_json(&client(), serde_json::json!({"id": "a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_should_erase_models_to_json() {
        let resource: &dyn DynResource = &Slow;
        assert_eq!(resource.type_name(), "test_slow");

        let state = resource
            .update_json(
                &client(),
                serde_json::json!({"id": "a"}),
                serde_json::json!({"id": "a", "value": 1}),
            )
            .await
            .unwrap();
        assert_eq!(state, serde_json::json!({"id": "a", "value": 2}));

        assert!(resource.import_json(&client(), "gone").await.unwrap().is_none());
        let err = resource
            .read_json(&client(), serde_json::json!({"value": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[test]
    fn test_should_require_state_after_write() {
        assert_eq!(found_after_write("S3 Bucket", "b", Some(1)).unwrap(), 1);
        assert!(found_after_write::<u8>("S3 Bucket", "b", None).is_err());
        assert!(removed_from_state::<u8>("S3 Bucket", "b").is_none());
    }
}
