//! Endpoint data document types for deserialization.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level endpoint data document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointData {
    /// Data version, e.g. `"2025-06-01"`.
    pub version: String,
    /// Partitions, fallback partition first.
    pub partitions: Vec<Partition>,
    /// Regions whose website endpoints use the dashed legacy form.
    pub website_legacy_regions: Vec<String>,
    /// Route 53 hosted zone ID of each region's website endpoint.
    pub hosted_zone_ids: BTreeMap<String, String>,
}

/// One AWS partition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    /// Partition ID, e.g. `"aws-cn"`.
    pub id: String,
    /// DNS suffix of service endpoints.
    pub dns_suffix: String,
    /// Region name prefixes that select this partition.
    #[serde(default)]
    pub region_prefixes: Vec<String>,
    /// Known regions.
    #[serde(default)]
    pub regions: Vec<String>,
}
