//! Provider-level configuration.
//!
//! Provides [`ProviderConfig`], the settings shared by every resource: the
//! target region and endpoint, default tags, tag-ignore rules, and retry
//! bounds. Values are loaded from environment variables, following the AWS
//! SDK conventions where one exists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::types::{AccountId, AwsRegion};

/// Provider configuration.
///
/// All fields have sensible defaults. Configuration can be loaded from
/// environment variables via [`ProviderConfig::from_env`].
///
/// # Examples
///
/// ```
/// use tfs3_core::ProviderConfig;
///
/// let config = ProviderConfig::default();
/// assert_eq!(config.region.as_str(), "us-east-1");
/// assert!(!config.s3_use_path_style);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Region that resources are managed in.
    #[builder(default)]
    pub region: AwsRegion,

    /// Account that owns the managed resources.
    #[builder(default)]
    pub account_id: AccountId,

    /// Custom S3 endpoint (e.g. a local S3-compatible server).
    #[builder(default, setter(strip_option))]
    pub endpoint_url: Option<String>,

    /// Whether to use path-style bucket addressing.
    #[builder(default = false)]
    pub s3_use_path_style: bool,

    /// Tags applied to every taggable resource, overridden by resource tags.
    #[builder(default)]
    pub default_tags: BTreeMap<String, String>,

    /// Tag keys that are never read into or written from state.
    #[builder(default)]
    pub ignore_tag_keys: Vec<String>,

    /// Tag key prefixes that are never read into or written from state.
    #[builder(default)]
    pub ignore_tag_key_prefixes: Vec<String>,

    /// Upper bound (seconds) for waiting on S3 eventual consistency.
    #[builder(default = 120)]
    pub propagation_timeout_secs: u64,

    /// Maximum attempts the SDK makes for a single request.
    #[builder(default = 25)]
    pub max_retries: u32,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: AwsRegion::default(),
            account_id: AccountId::default(),
            endpoint_url: None,
            s3_use_path_style: false,
            default_tags: BTreeMap::new(),
            ignore_tag_keys: Vec::new(),
            ignore_tag_key_prefixes: Vec::new(),
            propagation_timeout_secs: 120,
            max_retries: 25,
            log_level: String::from("info"),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `AWS_REGION` / `AWS_DEFAULT_REGION` | `us-east-1` |
    /// | `AWS_ACCOUNT_ID` | `000000000000` |
    /// | `AWS_ENDPOINT_URL_S3` | *(unset)* |
    /// | `AWS_S3_USE_PATH_STYLE` | `false` |
    /// | `TFS3_DEFAULT_TAGS` | *(empty)*, `key=value,key2=value2` |
    /// | `TFS3_IGNORE_TAG_KEYS` | *(empty)*, comma separated |
    /// | `TFS3_IGNORE_TAG_KEY_PREFIXES` | *(empty)*, comma separated |
    /// | `TFS3_PROPAGATION_TIMEOUT_SECS` | `120` |
    /// | `TFS3_MAX_RETRIES` | `25` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Malformed numeric values and account IDs are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfs3_core::ProviderConfig;
    ///
    /// let config = ProviderConfig::from_env();
    /// assert!(!config.region.as_str().is_empty());
    /// ```
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("AWS_REGION").or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        {
            config.region = AwsRegion::new(v);
        }
        if let Ok(v) = std::env::var("AWS_ACCOUNT_ID") {
            if let Ok(id) = AccountId::new(v) {
                config.account_id = id;
            }
        }
        if let Ok(v) = std::env::var("AWS_ENDPOINT_URL_S3") {
            if !v.is_empty() {
                config.endpoint_url = Some(v);
            }
        }
        if let Ok(v) = std::env::var("AWS_S3_USE_PATH_STYLE") {
            config.s3_use_path_style = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("TFS3_DEFAULT_TAGS") {
            config.default_tags = parse_tag_pairs(&v);
        }
        if let Ok(v) = std::env::var("TFS3_IGNORE_TAG_KEYS") {
            config.ignore_tag_keys = parse_list(&v);
        }
        if let Ok(v) = std::env::var("TFS3_IGNORE_TAG_KEY_PREFIXES") {
            config.ignore_tag_key_prefixes = parse_list(&v);
        }
        if let Ok(v) = std::env::var("TFS3_PROPAGATION_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.propagation_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("TFS3_MAX_RETRIES") {
            if let Ok(n) = v.parse::<u32>() {
                config.max_retries = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The propagation timeout as a [`std::time::Duration`].
    #[must_use]
    pub fn propagation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.propagation_timeout_secs)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Parse a comma-separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Parse `key=value` pairs separated by commas. Entries without `=` are skipped.
fn parse_tag_pairs(value: &str) -> BTreeMap<String, String> {
    value
        .split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_owned(), v.trim().to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = ProviderConfig::default();
        assert_eq!(config.region.as_str(), "us-east-1");
        assert_eq!(config.account_id.as_str(), "000000000000");
        assert!(config.endpoint_url.is_none());
        assert!(!config.s3_use_path_style);
        assert!(config.default_tags.is_empty());
        assert_eq!(config.propagation_timeout_secs, 120);
        assert_eq!(config.max_retries, 25);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = ProviderConfig::builder()
            .region(AwsRegion::new("eu-west-1"))
            .endpoint_url("http://localhost:4566".into())
            .s3_use_path_style(true)
            .default_tags(BTreeMap::from([("env".to_owned(), "test".to_owned())]))
            .propagation_timeout_secs(5)
            .build();

        assert_eq!(config.region.as_str(), "eu-west-1");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(config.s3_use_path_style);
        assert_eq!(config.default_tags.get("env").map(String::as_str), Some("test"));
        assert_eq!(config.propagation_timeout(), std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = ProviderConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("s3UsePathStyle"));
        assert!(json.contains("propagationTimeoutSecs"));
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_should_parse_tag_pairs_and_lists() {
        let tags = parse_tag_pairs("env=prod, team = storage,broken,=x");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["team"], "storage");
        assert_eq!(parse_list(" a, ,b "), vec!["a".to_owned(), "b".to_owned()]);
    }
}
