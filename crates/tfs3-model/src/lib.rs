//! Typed S3 API shapes and error codes used by tfs3 resources.
//!
//! The shapes mirror the S3 REST API members that the resources read and
//! write. Enumerations carry their wire values so they can be used directly
//! in resource configuration. Structures serialize with the API's PascalCase
//! member names, which is also the format of website routing rules.

#[macro_use]
mod macros;

pub mod error;
pub mod object;
pub mod types;

pub use error::{S3Error, S3ErrorCode, S3Result};
pub use types::BucketTarget;
