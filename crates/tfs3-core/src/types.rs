//! Common AWS type definitions shared across resources.

use std::fmt;

use crate::generated::{PARTITIONS, PartitionInfo};

/// AWS Account ID (12-digit string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Default account ID used by local S3-compatible endpoints.
    pub const DEFAULT: &str = "000000000000";

    /// Create a new account ID from a string.
    ///
    /// # Errors
    /// Returns an error if the account ID is not a 12-digit numeric string.
    pub fn new(id: impl Into<String>) -> Result<Self, crate::CoreError> {
        let id = id.into();
        if id.len() != 12 || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(crate::CoreError::InvalidAccountId(id));
        }
        Ok(Self(id))
    }

    /// Get the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// AWS Region identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Default region, also the region S3 reports as an empty location constraint.
    pub const DEFAULT: &str = "us-east-1";

    /// Create a new region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Create a region from an S3 `LocationConstraint` value.
    ///
    /// S3 reports buckets in `us-east-1` with an empty location constraint and
    /// buckets in `eu-west-1` created through the legacy API as `EU`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfs3_core::AwsRegion;
    ///
    /// assert_eq!(AwsRegion::from_location_constraint("").as_str(), "us-east-1");
    /// assert_eq!(AwsRegion::from_location_constraint("EU").as_str(), "eu-west-1");
    /// assert_eq!(AwsRegion::from_location_constraint("ap-south-1").as_str(), "ap-south-1");
    /// ```
    #[must_use]
    pub fn from_location_constraint(constraint: &str) -> Self {
        match constraint {
            "" => Self::default(),
            "EU" => Self::new("eu-west-1"),
            other => Self::new(other),
        }
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The partition this region belongs to.
    #[must_use]
    pub fn partition(&self) -> Partition {
        Partition::for_region(&self.0)
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An AWS partition (`aws`, `aws-cn`, `aws-us-gov`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    info: &'static PartitionInfo,
}

impl Partition {
    /// The commercial partition ID.
    pub const AWS: &str = "aws";

    /// The AWS GovCloud (US) partition ID.
    pub const AWS_US_GOV: &str = "aws-us-gov";

    /// Resolve the partition of a region.
    ///
    /// Known regions are matched exactly, then by partition region prefix.
    /// Anything else resolves to the commercial `aws` partition.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfs3_core::Partition;
    ///
    /// assert_eq!(Partition::for_region("cn-north-1").id(), "aws-cn");
    /// assert_eq!(Partition::for_region("us-isob-east-1").dns_suffix(), "sc2s.sgov.gov");
    /// assert_eq!(Partition::for_region("custom").id(), "aws");
    /// ```
    #[must_use]
    pub fn for_region(region: &str) -> Self {
        let info = PARTITIONS
            .iter()
            .find(|p| p.regions.iter().any(|r| *r == region))
            .or_else(|| {
                PARTITIONS.iter().find(|p| {
                    p.region_prefixes
                        .iter()
                        .any(|prefix| region.starts_with(prefix))
                })
            })
            .unwrap_or(&PARTITIONS[0]);
        Self { info }
    }

    /// Look up a partition by its ID.
    #[must_use]
    pub fn by_id(id: &str) -> Option<Self> {
        PARTITIONS
            .iter()
            .find(|p| p.id == id)
            .map(|info| Self { info })
    }

    /// The partition ID (e.g. `aws-cn`).
    #[must_use]
    pub fn id(&self) -> &'static str {
        self.info.id
    }

    /// The DNS suffix for service endpoints in this partition.
    #[must_use]
    pub fn dns_suffix(&self) -> &'static str {
        self.info.dns_suffix
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self {
            info: &PARTITIONS[0],
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info.id)
    }
}
