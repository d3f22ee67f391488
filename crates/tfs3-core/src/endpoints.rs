//! S3 endpoint and DNS helpers backed by the generated region tables.
//!
//! The tables themselves live in a generated module built from a versioned
//! JSON data file (see the `codegen` tool). This module only formats names:
//!
//! - regional bucket domain names (`{bucket}.s3.{region}.{dnsSuffix}`)
//! - website endpoints, which use a dash form in legacy regions and a dot
//!   form everywhere else
//! - Route 53 hosted zone IDs for website endpoints
//! - ARNs

use crate::error::{CoreError, CoreResult};
use crate::generated::{HOSTED_ZONE_IDS, TABLE_VERSION, WEBSITE_LEGACY_REGIONS};
use crate::types::{AwsRegion, Partition};

/// A website endpoint and its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteEndpoint {
    /// The bucket website endpoint (`{bucket}.{domain}`).
    pub endpoint: String,
    /// The website domain (`s3-website-us-east-1.amazonaws.com`).
    pub domain: String,
}

/// Version string of the generated endpoint tables.
#[must_use]
pub fn table_version() -> &'static str {
    TABLE_VERSION
}

/// Return the Route 53 hosted zone ID for the S3 website endpoint of a region.
///
/// # Errors
///
/// Returns [`CoreError::UnknownHostedZoneRegion`] if the region is not in the
/// generated table.
///
/// # Examples
///
/// ```
/// use tfs3_core::endpoints::hosted_zone_id_for_region;
///
/// assert_eq!(hosted_zone_id_for_region("us-east-1").unwrap(), "Z3AQBSTGFYJSTF");
/// assert!(hosted_zone_id_for_region("mars-north-1").is_err());
/// ```
pub fn hosted_zone_id_for_region(region: &str) -> CoreResult<&'static str> {
    HOSTED_ZONE_IDS
        .binary_search_by_key(&region, |(r, _)| *r)
        .map(|idx| HOSTED_ZONE_IDS[idx].1)
        .map_err(|_| CoreError::UnknownHostedZoneRegion(region.to_owned()))
}

/// Build the regional domain name of a bucket.
///
/// An empty region yields the global commercial domain name.
///
/// # Examples
///
/// ```
/// use tfs3_core::endpoints::bucket_regional_domain_name;
///
/// assert_eq!(
///     bucket_regional_domain_name("my-bucket", "eu-west-1"),
///     "my-bucket.s3.eu-west-1.amazonaws.com"
/// );
/// assert_eq!(bucket_regional_domain_name("my-bucket", ""), "my-bucket.s3.amazonaws.com");
/// ```
#[must_use]
pub fn bucket_regional_domain_name(bucket: &str, region: &str) -> String {
    if region.is_empty() {
        return format!("{bucket}.s3.amazonaws.com");
    }
    let suffix = Partition::for_region(region).dns_suffix();
    format!("{bucket}.s3.{region}.{suffix}")
}

/// Build the global domain name of a bucket (`{bucket}.s3.{dnsSuffix}`).
#[must_use]
pub fn bucket_domain_name(bucket: &str, dns_suffix: &str) -> String {
    format!("{bucket}.s3.{dns_suffix}")
}

/// Build the website endpoint and domain of a bucket.
///
/// An empty region is treated as `us-east-1`, the region S3 reports for
/// buckets without a location constraint.
///
/// # Examples
///
/// ```
/// use tfs3_core::endpoints::website_endpoint;
///
/// let ep = website_endpoint("site", "us-east-2");
/// assert_eq!(ep.endpoint, "site.s3-website.us-east-2.amazonaws.com");
/// assert_eq!(ep.domain, "s3-website.us-east-2.amazonaws.com");
///
/// let ep = website_endpoint("site", "");
/// assert_eq!(ep.domain, "s3-website-us-east-1.amazonaws.com");
/// ```
#[must_use]
pub fn website_endpoint(bucket: &str, region: &str) -> WebsiteEndpoint {
    let region = if region.is_empty() {
        AwsRegion::DEFAULT
    } else {
        region
    };

    let domain = if WEBSITE_LEGACY_REGIONS.iter().any(|r| *r == region) {
        format!("s3-website-{region}.amazonaws.com")
    } else {
        let suffix = Partition::for_region(region).dns_suffix();
        format!("s3-website.{region}.{suffix}")
    };

    WebsiteEndpoint {
        endpoint: format!("{bucket}.{domain}"),
        domain,
    }
}

/// Format an ARN.
///
/// # Examples
///
/// ```
/// use tfs3_core::endpoints::arn;
///
/// assert_eq!(arn("aws", "s3", "", "", "my-bucket"), "arn:aws:s3:::my-bucket");
/// ```
#[must_use]
pub fn arn(
    partition: &str,
    service: &str,
    region: &str,
    account_id: &str,
    resource: &str,
) -> String {
    format!("arn:{partition}:{service}:{region}:{account_id}:{resource}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_regional_domain_names() {
        let cases = [
            ("", "bucket-name.s3.amazonaws.com"),
            ("custom", "bucket-name.s3.custom.amazonaws.com"),
            ("us-east-1", "bucket-name.s3.us-east-1.amazonaws.com"),
            ("us-west-2", "bucket-name.s3.us-west-2.amazonaws.com"),
            ("us-gov-west-1", "bucket-name.s3.us-gov-west-1.amazonaws.com"),
            ("cn-north-1", "bucket-name.s3.cn-north-1.amazonaws.com.cn"),
        ];
        for (region, expected) in cases {
            assert_eq!(bucket_regional_domain_name("bucket-name", region), expected);
        }
    }

    #[test]
    fn test_should_build_website_endpoints() {
        let cases = [
            (
                "",
                "bucket-name.s3-website-us-east-1.amazonaws.com",
                "s3-website-us-east-1.amazonaws.com",
            ),
            (
                "us-east-1",
                "bucket-name.s3-website-us-east-1.amazonaws.com",
                "s3-website-us-east-1.amazonaws.com",
            ),
            (
                "us-west-2",
                "bucket-name.s3-website-us-west-2.amazonaws.com",
                "s3-website-us-west-2.amazonaws.com",
            ),
            (
                "us-west-1",
                "bucket-name.s3-website-us-west-1.amazonaws.com",
                "s3-website-us-west-1.amazonaws.com",
            ),
            (
                "eu-west-1",
                "bucket-name.s3-website-eu-west-1.amazonaws.com",
                "s3-website-eu-west-1.amazonaws.com",
            ),
            (
                "eu-central-1",
                "bucket-name.s3-website.eu-central-1.amazonaws.com",
                "s3-website.eu-central-1.amazonaws.com",
            ),
            (
                "us-east-2",
                "bucket-name.s3-website.us-east-2.amazonaws.com",
                "s3-website.us-east-2.amazonaws.com",
            ),
            (
                "us-gov-east-1",
                "bucket-name.s3-website.us-gov-east-1.amazonaws.com",
                "s3-website.us-gov-east-1.amazonaws.com",
            ),
            (
                "us-gov-west-1",
                "bucket-name.s3-website-us-gov-west-1.amazonaws.com",
                "s3-website-us-gov-west-1.amazonaws.com",
            ),
            (
                "us-iso-east-1",
                "bucket-name.s3-website.us-iso-east-1.c2s.ic.gov",
                "s3-website.us-iso-east-1.c2s.ic.gov",
            ),
            (
                "us-isob-east-1",
                "bucket-name.s3-website.us-isob-east-1.sc2s.sgov.gov",
                "s3-website.us-isob-east-1.sc2s.sgov.gov",
            ),
            (
                "cn-northwest-1",
                "bucket-name.s3-website.cn-northwest-1.amazonaws.com.cn",
                "s3-website.cn-northwest-1.amazonaws.com.cn",
            ),
            (
                "cn-north-1",
                "bucket-name.s3-website.cn-north-1.amazonaws.com.cn",
                "s3-website.cn-north-1.amazonaws.com.cn",
            ),
        ];
        for (region, endpoint, domain) in cases {
            let got = website_endpoint("bucket-name", region);
            assert_eq!(got.endpoint, endpoint, "region {region:?}");
            assert_eq!(got.domain, domain, "region {region:?}");
        }
    }

    #[test]
    fn test_should_look_up_hosted_zone_ids() {
        assert_eq!(hosted_zone_id_for_region("us-east-1").unwrap(), "Z3AQBSTGFYJSTF");
        assert_eq!(hosted_zone_id_for_region("eu-west-1").unwrap(), "Z1BKCTXD74EZPE");
        assert_eq!(hosted_zone_id_for_region("cn-north-1").unwrap(), "Z5CN8UMXT92WN");
        assert!(matches!(
            hosted_zone_id_for_region("us-iso-east-1"),
            Err(CoreError::UnknownHostedZoneRegion(_))
        ));
    }

    #[test]
    fn test_should_keep_hosted_zone_table_sorted() {
        assert!(HOSTED_ZONE_IDS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_should_format_arns() {
        assert_eq!(arn("aws-cn", "s3", "", "", "b/k"), "arn:aws-cn:s3:::b/k");
        assert!(!table_version().is_empty());
    }
}
