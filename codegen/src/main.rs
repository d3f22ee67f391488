//! S3 endpoint table generator.
//!
//! Reads the partition and hosted-zone data in `data/s3-endpoints.json` and
//! generates the static lookup tables of the `tfs3-core` crate.

mod codegen;
mod model;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let data_path = args
        .get(1)
        .map_or_else(|| PathBuf::from("data/s3-endpoints.json"), PathBuf::from);

    let output_path = args.get(2).map_or_else(
        || PathBuf::from("../crates/tfs3-core/src/generated.rs"),
        PathBuf::from,
    );

    eprintln!("Reading endpoint data from: {}", data_path.display());

    let data_json = fs::read_to_string(&data_path)
        .with_context(|| format!("Failed to read data file: {}", data_path.display()))?;

    let data: model::EndpointData =
        serde_json::from_str(&data_json).context("Failed to parse endpoint data")?;

    eprintln!(
        "Parsed data {}: {} partitions, {} hosted zones, {} legacy website regions",
        data.version,
        data.partitions.len(),
        data.hosted_zone_ids.len(),
        data.website_legacy_regions.len(),
    );

    let content = codegen::generate_endpoints(&data).context("Failed to generate code")?;

    ensure_parent_dir(&output_path)?;
    fs::write(&output_path, content)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    eprintln!("  Wrote: {}", output_path.display());

    Ok(())
}

/// Ensure the parent directory of a path exists.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}
