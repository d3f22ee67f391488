//! Resource ID encoding and parsing.
//!
//! Bucket sub-resources are identified by the bucket name, optionally
//! followed by the expected bucket owner (`bucket,123456789012`). The bucket
//! ACL resource additionally encodes the canned ACL, which is recognized by
//! its value rather than its position.

use tfs3_model::types::BucketCannedAcl;

use crate::error::{ProviderError, ProviderResult};

/// Separator between the parts of a composite ID.
pub const RESOURCE_ID_SEPARATOR: char = ',';

/// Parsed ID of a single-bucket sub-resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketId {
    /// The bucket name.
    pub bucket: String,
    /// The expected bucket owner, if the ID carries one.
    pub expected_bucket_owner: Option<String>,
}

/// Build the ID of a single-bucket sub-resource.
///
/// # Examples
///
/// ```
/// use tfs3_provider::ids::create_bucket_id;
///
/// assert_eq!(create_bucket_id("logs", None), "logs");
/// assert_eq!(create_bucket_id("logs", Some("123456789012")), "logs,123456789012");
/// assert_eq!(create_bucket_id("logs", Some("")), "logs");
/// ```
#[must_use]
pub fn create_bucket_id(bucket: &str, expected_bucket_owner: Option<&str>) -> String {
    match expected_bucket_owner.filter(|o| !o.is_empty()) {
        Some(owner) => format!("{bucket}{RESOURCE_ID_SEPARATOR}{owner}"),
        None => bucket.to_owned(),
    }
}

/// Parse the ID of a single-bucket sub-resource.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] unless the ID is `bucket` or
/// `bucket,expected_bucket_owner` with non-empty parts.
pub fn parse_bucket_id(id: &str) -> ProviderResult<BucketId> {
    let parts: Vec<&str> = id.split(RESOURCE_ID_SEPARATOR).collect();
    match parts.as_slice() {
        [bucket] if !bucket.is_empty() => Ok(BucketId {
            bucket: (*bucket).to_owned(),
            expected_bucket_owner: None,
        }),
        [bucket, owner] if !bucket.is_empty() && !owner.is_empty() => Ok(BucketId {
            bucket: (*bucket).to_owned(),
            expected_bucket_owner: Some((*owner).to_owned()),
        }),
        _ => Err(ProviderError::invalid_id(
            id,
            "expected BUCKET or BUCKET,EXPECTED_BUCKET_OWNER",
        )),
    }
}

/// Parsed ID of a bucket ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAclId {
    /// The bucket name.
    pub bucket: String,
    /// The expected bucket owner, if the ID carries one.
    pub expected_bucket_owner: Option<String>,
    /// The canned ACL, if the ID carries one.
    pub acl: Option<BucketCannedAcl>,
}

/// Build the ID of a bucket ACL.
#[must_use]
pub fn create_bucket_acl_id(
    bucket: &str,
    expected_bucket_owner: Option<&str>,
    acl: Option<BucketCannedAcl>,
) -> String {
    let mut id = create_bucket_id(bucket, expected_bucket_owner);
    if let Some(acl) = acl {
        id.push(RESOURCE_ID_SEPARATOR);
        id.push_str(acl.as_str());
    }
    id
}

/// Parse the ID of a bucket ACL.
///
/// Accepted forms are `bucket`, `bucket,owner`, `bucket,acl` and
/// `bucket,owner,acl`. A two-part ID whose second part is a canned ACL value
/// is read as `bucket,acl`.
///
/// # Examples
///
/// ```
/// use tfs3_model::types::BucketCannedAcl;
/// use tfs3_provider::ids::parse_bucket_acl_id;
///
/// let id = parse_bucket_acl_id("site,public-read").unwrap();
/// assert_eq!(id.acl, Some(BucketCannedAcl::PublicRead));
/// assert_eq!(id.expected_bucket_owner, None);
///
/// let id = parse_bucket_acl_id("site,123456789012").unwrap();
/// assert_eq!(id.expected_bucket_owner.as_deref(), Some("123456789012"));
/// ```
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] for any other shape.
pub fn parse_bucket_acl_id(id: &str) -> ProviderResult<BucketAclId> {
    let invalid = || {
        ProviderError::invalid_id(
            id,
            "expected BUCKET, BUCKET,EXPECTED_BUCKET_OWNER, BUCKET,ACL or BUCKET,EXPECTED_BUCKET_OWNER,ACL",
        )
    };
    let parts: Vec<&str> = id.split(RESOURCE_ID_SEPARATOR).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }

    match parts.as_slice() {
        [bucket] => Ok(BucketAclId {
            bucket: (*bucket).to_owned(),
            expected_bucket_owner: None,
            acl: None,
        }),
        [bucket, second] => match second.parse::<BucketCannedAcl>() {
            Ok(acl) => Ok(BucketAclId {
                bucket: (*bucket).to_owned(),
                expected_bucket_owner: None,
                acl: Some(acl),
            }),
            Err(_) => Ok(BucketAclId {
                bucket: (*bucket).to_owned(),
                expected_bucket_owner: Some((*second).to_owned()),
                acl: None,
            }),
        },
        [bucket, owner, acl] => {
            let acl = acl.parse::<BucketCannedAcl>().map_err(|_| invalid())?;
            Ok(BucketAclId {
                bucket: (*bucket).to_owned(),
                expected_bucket_owner: Some((*owner).to_owned()),
                acl: Some(acl),
            })
        }
        _ => Err(invalid()),
    }
}

/// Parse an object import ID (`bucket/key`, or `s3://bucket/key`).
///
/// # Errors
///
/// Returns [`ProviderError::InvalidId`] if either part is empty.
pub fn parse_object_import_id(id: &str) -> ProviderResult<(String, String)> {
    let trimmed = id.strip_prefix("s3://").unwrap_or(id);
    match trimmed.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((bucket.to_owned(), key.to_owned()))
        }
        _ => Err(ProviderError::invalid_id(id, "expected BUCKET/KEY or s3://BUCKET/KEY")),
    }
}

/// Clean an object key the way the v1 AWS SDKs did: leading slashes are
/// dropped and runs of slashes collapse to one.
///
/// # Examples
///
/// ```
/// use tfs3_provider::ids::sdk_v1_compatible_clean_key;
///
/// assert_eq!(sdk_v1_compatible_clean_key("/a//b///c"), "a/b/c");
/// assert_eq!(sdk_v1_compatible_clean_key("a/b/"), "a/b/");
/// ```
#[must_use]
pub fn sdk_v1_compatible_clean_key(key: &str) -> String {
    let mut cleaned = String::with_capacity(key.len());
    let mut previous_slash = true;
    for c in key.chars() {
        if c == '/' {
            if !previous_slash {
                cleaned.push(c);
            }
            previous_slash = true;
        } else {
            cleaned.push(c);
            previous_slash = false;
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_bucket_ids() {
        let id = create_bucket_id("b", Some("123456789012"));
        let parsed = parse_bucket_id(&id).unwrap();
        assert_eq!(parsed.bucket, "b");
        assert_eq!(parsed.expected_bucket_owner.as_deref(), Some("123456789012"));
        assert_eq!(parse_bucket_id("b").unwrap().expected_bucket_owner, None);
    }

    #[test]
    fn test_should_reject_malformed_bucket_ids() {
        for id in ["", ",", "b,", ",o", "a,b,c"] {
            assert!(parse_bucket_id(id).is_err(), "{id}");
        }
    }

    #[test]
    fn test_should_parse_all_bucket_acl_id_forms() {
        let id = parse_bucket_acl_id("b").unwrap();
        assert_eq!((id.expected_bucket_owner, id.acl), (None, None));

        let id = parse_bucket_acl_id("b,123456789012,log-delivery-write").unwrap();
        assert_eq!(id.expected_bucket_owner.as_deref(), Some("123456789012"));
        assert_eq!(id.acl, Some(BucketCannedAcl::LogDeliveryWrite));

        assert!(parse_bucket_acl_id("b,123456789012,bogus").is_err());
        assert!(parse_bucket_acl_id("b,,private").is_err());
    }

    #[test]
    fn test_should_build_bucket_acl_ids() {
        assert_eq!(
            create_bucket_acl_id("b", Some("123456789012"), Some(BucketCannedAcl::Private)),
            "b,123456789012,private"
        );
        assert_eq!(create_bucket_acl_id("b", None, None), "b");
    }

    #[test]
    fn test_should_parse_object_import_ids() {
        assert_eq!(
            parse_object_import_id("s3://b/dir/key.txt").unwrap(),
            ("b".to_owned(), "dir/key.txt".to_owned())
        );
        assert_eq!(
            parse_object_import_id("b/k").unwrap(),
            ("b".to_owned(), "k".to_owned())
        );
        assert!(parse_object_import_id("b").is_err());
        assert!(parse_object_import_id("b/").is_err());
    }

    #[test]
    fn test_should_clean_keys() {
        assert_eq!(sdk_v1_compatible_clean_key("///key"), "key");
        assert_eq!(sdk_v1_compatible_clean_key("a//b"), "a/b");
        assert_eq!(sdk_v1_compatible_clean_key("plain"), "plain");
    }
}
