//! Read-only S3 data sources.

mod bucket;
mod object;

pub use bucket::{BucketDataSource, BucketDataSourceModel};
pub use object::{ObjectDataSource, ObjectDataSourceModel};
