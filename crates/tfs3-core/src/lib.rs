//! Core types, provider configuration, and AWS endpoint tables for tfs3.
//!
//! This crate provides the building blocks shared by every tfs3 resource:
//! provider-level configuration, account/region/partition types, and the
//! generated per-region tables (DNS suffixes, Route 53 hosted zones, legacy
//! website endpoint regions) together with the domain-name helpers built on
//! top of them.

mod config;
pub mod endpoints;
mod error;
mod generated;
mod types;

pub use config::ProviderConfig;
pub use error::{CoreError, CoreResult};
pub use types::{AccountId, AwsRegion, Partition};
