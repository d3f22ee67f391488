//! Rust code generation from the endpoint data document.

use std::fmt::Write;

use anyhow::{Result, bail};

use crate::model::EndpointData;

/// Header comment placed at the top of the generated file.
const FILE_HEADER: &str = "//! Auto-generated from `codegen/data/s3-endpoints.json`. DO NOT EDIT.";

/// Render `generated.rs` for the `tfs3-core` crate.
pub fn generate_endpoints(data: &EndpointData) -> Result<String> {
    if data.partitions.is_empty() {
        bail!("endpoint data lists no partitions");
    }

    let mut out = String::new();
    writeln!(out, "{FILE_HEADER}")?;
    writeln!(out)?;
    writeln!(out, "/// Version of the endpoint data this module was generated from.")?;
    writeln!(out, "pub(crate) const TABLE_VERSION: &str = {:?};", data.version)?;
    writeln!(out)?;

    write_partition_struct(&mut out)?;
    write_partitions(&mut out, data)?;

    let mut legacy = data.website_legacy_regions.clone();
    legacy.sort();
    legacy.dedup();
    writeln!(
        out,
        "/// Regions whose S3 website endpoints use the legacy `s3-website-{{region}}` form."
    )?;
    writeln!(out, "pub(crate) static WEBSITE_LEGACY_REGIONS: &[&str] = &[")?;
    for region in &legacy {
        writeln!(out, "    {region:?},")?;
    }
    writeln!(out, "];")?;
    writeln!(out)?;

    writeln!(
        out,
        "/// Route 53 hosted zone IDs of S3 website endpoints, sorted by region."
    )?;
    writeln!(out, "pub(crate) static HOSTED_ZONE_IDS: &[(&str, &str)] = &[")?;
    for (region, zone) in &data.hosted_zone_ids {
        writeln!(out, "    ({region:?}, {zone:?}),")?;
    }
    writeln!(out, "];")?;

    Ok(out)
}

fn write_partition_struct(out: &mut String) -> Result<()> {
    writeln!(out, "/// Static description of an AWS partition.")?;
    writeln!(out, "#[derive(Debug, PartialEq, Eq, Hash)]")?;
    writeln!(out, "pub(crate) struct PartitionInfo {{")?;
    writeln!(out, "    /// Partition ID.")?;
    writeln!(out, "    pub(crate) id: &'static str,")?;
    writeln!(out, "    /// DNS suffix for service endpoints.")?;
    writeln!(out, "    pub(crate) dns_suffix: &'static str,")?;
    writeln!(out, "    /// Region name prefixes that belong to this partition.")?;
    writeln!(out, "    pub(crate) region_prefixes: &'static [&'static str],")?;
    writeln!(out, "    /// Known regions.")?;
    writeln!(out, "    pub(crate) regions: &'static [&'static str],")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn write_partitions(out: &mut String, data: &EndpointData) -> Result<()> {
    writeln!(out, "/// Known partitions. The first entry is the fallback partition.")?;
    writeln!(out, "pub(crate) static PARTITIONS: &[PartitionInfo] = &[")?;
    for partition in &data.partitions {
        let prefixes = partition
            .region_prefixes
            .iter()
            .map(|p| format!("{p:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "    PartitionInfo {{")?;
        writeln!(out, "        id: {:?},", partition.id)?;
        writeln!(out, "        dns_suffix: {:?},", partition.dns_suffix)?;
        writeln!(out, "        region_prefixes: &[{prefixes}],")?;
        writeln!(out, "        regions: &[")?;
        for region in &partition.regions {
            writeln!(out, "            {region:?},")?;
        }
        writeln!(out, "        ],")?;
        writeln!(out, "    }},")?;
    }
    writeln!(out, "];")?;
    writeln!(out)?;
    Ok(())
}
