//! S3 resources for a Terraform-style AWS provider.
//!
//! Every resource follows the same lifecycle: validate the configuration,
//! write to S3 (retrying through eventual-consistency races), then read the
//! result back so that the returned state reflects what S3 actually holds.
//!
//! # Architecture
//!
//! ```text
//! ResourceRegistry (type name -> resource / data source)
//!        |
//!        v
//! Resource / DataSource (validate, expand, flatten)
//!        |
//!        v
//! AwsClient (region, partition, tag rules, propagation timeout)
//!        |
//!        v
//! S3Api (SdkS3 against a real endpoint, InMemoryS3 in tests)
//! ```

pub mod conn;
pub mod data_sources;
pub mod error;
pub mod ids;
pub mod names;
pub mod policy;
pub mod registry;
pub mod resource;
pub mod resources;
pub mod retry;
pub mod tags;
pub mod validation;

pub use conn::{AwsClient, InMemoryS3, S3Api, SdkS3};
pub use error::{ProviderError, ProviderResult};
pub use registry::ResourceRegistry;
pub use resource::{DataSource, Resource, Timeouts};
