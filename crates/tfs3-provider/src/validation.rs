//! Attribute validators.
//!
//! Bucket names follow two rule sets: DNS-compliant names everywhere except
//! `us-east-1`, which still accepts the legacy (wider) character set. Other
//! helpers validate lengths, ranges and enumerated values of resource
//! attributes and report the attribute name in the error.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tfs3_core::{AccountId, AwsRegion};

use crate::error::{ProviderError, ProviderResult};
use crate::names::UNIQUE_ID_SUFFIX_LENGTH;

/// Maximum bucket name length for DNS-compliant names.
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Maximum bucket name length under the legacy `us-east-1` rules.
const MAX_LEGACY_BUCKET_NAME_LEN: usize = 255;

/// Maximum `bucket_prefix` length: a generated unique suffix must still fit.
pub const MAX_BUCKET_PREFIX_LEN: usize = MAX_BUCKET_NAME_LEN - UNIQUE_ID_SUFFIX_LENGTH;

static DNS_BUCKET_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-z-.]+$").expect("DNS_BUCKET_CHARS"));

static LEGACY_BUCKET_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_.-]+$").expect("LEGACY_BUCKET_CHARS"));

static IPV4_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$").expect("IPV4_LIKE"));

static DIRECTORY_BUCKET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9a-z.-]+)--(?:[0-9a-z]+(?:-[0-9a-z]+)+)--x-s3$")
        .expect("DIRECTORY_BUCKET_NAME")
});

/// Validate a bucket name against the rules of the region it is created in.
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] naming the first rule violated.
///
/// # Examples
///
/// ```
/// use tfs3_provider::validation::valid_bucket_name;
///
/// assert!(valid_bucket_name("my-bucket", "eu-west-1").is_ok());
/// assert!(valid_bucket_name("My_Bucket", "eu-west-1").is_err());
/// assert!(valid_bucket_name("My_Bucket", "us-east-1").is_ok());
/// ```
pub fn valid_bucket_name(value: &str, region: &str) -> ProviderResult<()> {
    if region == AwsRegion::DEFAULT {
        if value.len() > MAX_LEGACY_BUCKET_NAME_LEN {
            return Err(ProviderError::validation(format!(
                "{value:?} must contain less than 256 characters"
            )));
        }
        if !LEGACY_BUCKET_CHARS.is_match(value) {
            return Err(ProviderError::validation(format!(
                "only alphanumeric characters, hyphens, periods, and underscores allowed in {value:?}"
            )));
        }
        return Ok(());
    }

    if !(3..=MAX_BUCKET_NAME_LEN).contains(&value.len()) {
        return Err(ProviderError::validation(format!(
            "{value:?} must contain from 3 to 63 characters"
        )));
    }
    if !DNS_BUCKET_CHARS.is_match(value) {
        return Err(ProviderError::validation(format!(
            "only lowercase alphanumeric characters and hyphens allowed in {value:?}"
        )));
    }
    if IPV4_LIKE.is_match(value) {
        return Err(ProviderError::validation(format!(
            "{value:?} must not be formatted as an IP address"
        )));
    }
    if value.starts_with('.') {
        return Err(ProviderError::validation(format!(
            "{value:?} cannot start with a period"
        )));
    }
    if value.ends_with('.') {
        return Err(ProviderError::validation(format!(
            "{value:?} cannot end with a period"
        )));
    }
    if value.contains("..") {
        return Err(ProviderError::validation(format!(
            "{value:?} can be only one period between labels"
        )));
    }
    Ok(())
}

/// Validate the `bucket` attribute of a general purpose bucket.
pub fn validate_bucket_attr(value: &str) -> ProviderResult<()> {
    validate_len("bucket", value, 0, MAX_BUCKET_NAME_LEN)?;
    if DIRECTORY_BUCKET_NAME.is_match(value) {
        return Err(ProviderError::validation(
            "bucket must not be in the format [bucket_name]--[azid]--x-s3. \
             Use the aws_s3_directory_bucket resource to manage S3 Express buckets",
        ));
    }
    Ok(())
}

/// Validate the `bucket_prefix` attribute.
pub fn validate_bucket_prefix(value: &str) -> ProviderResult<()> {
    validate_len("bucket_prefix", value, 0, MAX_BUCKET_PREFIX_LEN)
}

/// Parse a lifecycle date (`YYYY-MM-DD`) as midnight UTC.
///
/// # Examples
///
/// ```
/// use tfs3_provider::validation::valid_lifecycle_timestamp;
///
/// let ts = valid_lifecycle_timestamp("2030-01-31").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2030-01-31T00:00:00+00:00");
/// assert!(valid_lifecycle_timestamp("2030-01-31T00:00:00Z").is_err());
/// ```
pub fn valid_lifecycle_timestamp(value: &str) -> ProviderResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&format!("{value}T00:00:00Z"))
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| {
            ProviderError::validation(format!(
                "{value:?} cannot be parsed as RFC3339 Timestamp Format"
            ))
        })
}

/// Format a lifecycle date back into its `YYYY-MM-DD` configuration form.
#[must_use]
pub fn format_lifecycle_timestamp(ts: &DateTime<Utc>) -> String {
    ts.date_naive().format("%Y-%m-%d").to_string()
}

/// Check that a string attribute's length is within `min..=max`.
pub fn validate_len(attr: &str, value: &str, min: usize, max: usize) -> ProviderResult<()> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(ProviderError::validation(format!(
            "expected length of {attr} to be in the range ({min} - {max}), got {value}"
        )))
    }
}

/// Check that an integer attribute is within `min..=max`.
pub fn validate_range(attr: &str, value: i64, min: i64, max: i64) -> ProviderResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ProviderError::validation(format!(
            "expected {attr} to be in the range ({min} - {max}), got {value}"
        )))
    }
}

/// Check that an integer attribute is at least `min`.
pub fn validate_at_least(attr: &str, value: i64, min: i64) -> ProviderResult<()> {
    if value >= min {
        Ok(())
    } else {
        Err(ProviderError::validation(format!(
            "expected {attr} to be at least ({min}), got {value}"
        )))
    }
}

/// Parse an enumerated attribute into its typed value.
///
/// # Examples
///
/// ```
/// use tfs3_model::types::Payer;
/// use tfs3_provider::validation::parse_enum;
///
/// assert_eq!(parse_enum::<Payer>("request_payer", "Requester").unwrap(), Payer::Requester);
/// assert!(parse_enum::<Payer>("request_payer", "Nobody").is_err());
/// ```
pub fn parse_enum<T>(attr: &str, value: &str) -> ProviderResult<T>
where
    T: std::str::FromStr,
{
    value.parse::<T>().map_err(|_| {
        ProviderError::validation(format!(
            "expected {attr} to be one of the allowed values, got {value}"
        ))
    })
}

/// Check that a string attribute is one of `allowed`.
pub fn validate_one_of(attr: &str, value: &str, allowed: &[&str]) -> ProviderResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ProviderError::validation(format!(
            "expected {attr} to be one of {allowed:?}, got {value}"
        )))
    }
}

/// Validate an optional `expected_bucket_owner` account ID.
pub fn validate_expected_bucket_owner(value: Option<&str>) -> ProviderResult<()> {
    match value {
        Some(owner) if !owner.is_empty() => AccountId::new(owner)
            .map(|_| ())
            .map_err(|_| {
                ProviderError::validation(format!(
                    "expected_bucket_owner: {owner:?} is not a valid account ID"
                ))
            }),
        _ => Ok(()),
    }
}

/// Check that a string is valid JSON.
pub fn validate_json(attr: &str, value: &str) -> ProviderResult<()> {
    serde_json::from_str::<serde_json::Value>(value)
        .map(|_| ())
        .map_err(|e| ProviderError::validation(format!("{attr} contains an invalid JSON: {e}")))
}

/// Reject configurations that set two mutually exclusive attributes.
pub fn conflicts_with(attr: &str, set: bool, other: &str, other_set: bool) -> ProviderResult<()> {
    if set && other_set {
        Err(ProviderError::validation(format!(
            "\"{attr}\": conflicts with {other}"
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_valid_dns_bucket_names() {
        let names = [
            "foobar",
            "foo.bar",
            "foo.bar.baz",
            "1234",
            "foo-bar",
        ];
        for name in names {
            assert!(valid_bucket_name(name, "us-west-2").is_ok(), "{name}");
        }
        assert!(valid_bucket_name(&"y".repeat(63), "us-west-2").is_ok());
    }

    #[test]
    fn test_should_reject_invalid_dns_bucket_names() {
        let names = [
            "foo..bar",
            "Foo.Bar",
            "192.168.0.1",
            "127.0.0.1",
            ".foo",
            "bar.",
            "foo_bar",
            "ab",
        ];
        for name in names {
            assert!(valid_bucket_name(name, "us-west-2").is_err(), "{name}");
        }
        assert!(valid_bucket_name(&"x".repeat(64), "us-west-2").is_err());
    }

    #[test]
    fn test_should_apply_legacy_rules_in_us_east_1() {
        assert!(valid_bucket_name("Foo_Bar", "us-east-1").is_ok());
        assert!(valid_bucket_name("ab", "us-east-1").is_ok());
        assert!(valid_bucket_name("foo bar", "us-east-1").is_err());
        assert!(valid_bucket_name(&"x".repeat(256), "us-east-1").is_err());
    }

    #[test]
    fn test_should_reject_directory_bucket_names() {
        assert!(validate_bucket_attr("my-bucket--usw2-az1--x-s3").is_err());
        assert!(validate_bucket_attr("my-bucket").is_ok());
        assert!(validate_bucket_attr(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_should_bound_bucket_prefix() {
        assert_eq!(MAX_BUCKET_PREFIX_LEN, 37);
        assert!(validate_bucket_prefix(&"p".repeat(37)).is_ok());
        assert!(validate_bucket_prefix(&"p".repeat(38)).is_err());
    }

    #[test]
    fn test_should_validate_lifecycle_timestamps() {
        assert!(valid_lifecycle_timestamp("2016-01-01").is_ok());
        assert!(valid_lifecycle_timestamp("2006-01-02T15:04:05Z").is_err());
        assert!(valid_lifecycle_timestamp("2016-13-01").is_err());
        let ts = valid_lifecycle_timestamp("2016-02-29").unwrap();
        assert_eq!(format_lifecycle_timestamp(&ts), "2016-02-29");
    }

    #[test]
    fn test_should_validate_ranges_and_enums() {
        assert!(validate_range("minutes", 15, 15, 15).is_ok());
        assert!(validate_range("minutes", 10, 15, 15).is_err());
        assert!(validate_at_least("days", 0, 1).is_err());
        assert!(validate_one_of("type", "Group", &["CanonicalUser", "Group"]).is_ok());
        let grantee_types = ["CanonicalUser", "Group"];
        assert!(validate_one_of("type", "AmazonCustomerByEmail", &grantee_types).is_err());
    }

    #[test]
    fn test_should_validate_expected_bucket_owner() {
        assert!(validate_expected_bucket_owner(None).is_ok());
        assert!(validate_expected_bucket_owner(Some("")).is_ok());
        assert!(validate_expected_bucket_owner(Some("123456789012")).is_ok());
        assert!(validate_expected_bucket_owner(Some("12345")).is_err());
    }

    #[test]
    fn test_should_report_conflicts() {
        assert!(conflicts_with("bucket", true, "bucket_prefix", true).is_err());
        assert!(conflicts_with("bucket", true, "bucket_prefix", false).is_ok());
        assert!(validate_json("policy", "{\"a\":1}").is_ok());
        assert!(validate_json("policy", "{").is_err());
    }
}
