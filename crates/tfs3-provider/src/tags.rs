//! Key-value tags.
//!
//! [`KeyValueTags`] is an ordered tag map with the set operations resources
//! need when reconciling configured tags with remote tags. Provider-level
//! default tags ([`DefaultConfig`]) are merged under resource tags to form
//! `tags_all`, and tag-ignore rules ([`IgnoreConfig`]) hide tags that other
//! systems manage. The bucket and object helpers at the bottom preserve
//! ignored remote tags across updates.

use std::collections::{BTreeMap, HashMap};

use tfs3_core::ProviderConfig;
use tfs3_model::S3ErrorCode;
use tfs3_model::types::{BucketTarget, Tag};

use crate::conn::S3Api;
use crate::error::{ProviderResult, S3ResultExt};

/// Prefix of tags reserved by AWS.
const AWS_TAG_KEY_PREFIX: &str = "aws:";

/// An ordered set of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueTags(BTreeMap<String, String>);

impl KeyValueTags {
    /// Build from any key/value iterator.
    pub fn new<I, K, V>(tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            tags.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build from S3 tags.
    #[must_use]
    pub fn from_s3(tags: &[Tag]) -> Self {
        Self::new(tags.iter().map(|t| (t.key.as_str(), t.value.as_str())))
    }

    /// Convert to S3 tags, ordered by key.
    #[must_use]
    pub fn to_s3(&self) -> Vec<Tag> {
        self.0.iter().map(|(k, v)| Tag::new(k, v)).collect()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop tags reserved by AWS (`aws:` prefix).
    #[must_use]
    pub fn ignore_aws(&self) -> Self {
        self.ignore_prefixes(&[AWS_TAG_KEY_PREFIX])
    }

    /// Drop tags whose key starts with any of `prefixes`.
    #[must_use]
    pub fn ignore_prefixes<S: AsRef<str>>(&self, prefixes: &[S]) -> Self {
        self.filter(|k, _| !prefixes.iter().any(|p| k.starts_with(p.as_ref())))
    }

    /// Drop tags whose key appears in `other`.
    #[must_use]
    pub fn ignore(&self, other: &Self) -> Self {
        self.filter(|k, _| !other.0.contains_key(k))
    }

    /// Drop tags matched by the provider ignore rules.
    #[must_use]
    pub fn ignore_config(&self, config: &IgnoreConfig) -> Self {
        self.filter(|k, _| !config.matches(k))
    }

    /// Keep only tags whose key is in `keys`.
    #[must_use]
    pub fn only<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        self.filter(|k, _| keys.iter().any(|key| key.as_ref() == k))
    }

    /// Union of both sets; `other` wins on conflicting keys.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Tags present here but absent from `new`.
    #[must_use]
    pub fn removed(&self, new: &Self) -> Self {
        self.filter(|k, _| !new.0.contains_key(k))
    }

    /// Tags in `new` that are absent here or carry a different value.
    #[must_use]
    pub fn updated(&self, new: &Self) -> Self {
        new.filter(|k, v| self.0.get(k).map(String::as_str) != Some(v))
    }

    /// Tag keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// The tags as an ordered map.
    #[must_use]
    pub fn map(&self) -> BTreeMap<String, String> {
        self.0.clone()
    }

    /// Whether both sets hold the same keys and values.
    #[must_use]
    pub fn equal(&self, other: &Self) -> bool {
        self == other
    }

    /// Split into chunks of at most `size` tags.
    #[must_use]
    pub fn chunks(&self, size: usize) -> Vec<Self> {
        let entries: Vec<_> = self.0.iter().collect();
        entries
            .chunks(size.max(1))
            .map(|chunk| Self::new(chunk.iter().map(|(k, v)| (k.as_str(), v.as_str()))))
            .collect()
    }

    /// URL-encoded form (`k1=v1&k2=v2`) used by the `x-amz-tagging` header.
    #[must_use]
    pub fn url_encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }

    fn filter(&self, mut keep: impl FnMut(&str, &str) -> bool) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, v)| keep(k, v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl From<&HashMap<String, String>> for KeyValueTags {
    fn from(tags: &HashMap<String, String>) -> Self {
        Self::new(tags.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl From<&BTreeMap<String, String>> for KeyValueTags {
    fn from(tags: &BTreeMap<String, String>) -> Self {
        Self(tags.clone())
    }
}

/// Provider-level default tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultConfig {
    tags: KeyValueTags,
}

impl DefaultConfig {
    /// Default tags from the provider configuration.
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            tags: KeyValueTags::from(&config.default_tags),
        }
    }

    /// The default tags.
    #[must_use]
    pub fn tags(&self) -> &KeyValueTags {
        &self.tags
    }

    /// Merge resource tags over the defaults, producing `tags_all`.
    #[must_use]
    pub fn merge_tags(&self, tags: &KeyValueTags) -> KeyValueTags {
        self.tags.merge(tags)
    }

    /// Remove defaults from `tags_all`, recovering the resource's own tags.
    ///
    /// A key is kept when the resource overrides the default with a different value.
    #[must_use]
    pub fn remove_from(&self, tags_all: &KeyValueTags) -> KeyValueTags {
        tags_all.filter(|k, v| self.tags.0.get(k).is_none_or(|d| d.as_str() != v))
    }
}

/// Provider-level tag-ignore rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreConfig {
    keys: Vec<String>,
    key_prefixes: Vec<String>,
}

impl IgnoreConfig {
    /// Ignore rules from the provider configuration.
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            keys: config.ignore_tag_keys.clone(),
            key_prefixes: config.ignore_tag_key_prefixes.clone(),
        }
    }

    /// Whether a tag key is ignored.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key) || self.key_prefixes.iter().any(|p| key.starts_with(p))
    }
}

/// Tags read back from S3, filtered for state: AWS-reserved and ignored keys removed.
#[must_use]
pub fn tags_for_state(remote: &KeyValueTags, ignore: &IgnoreConfig) -> KeyValueTags {
    remote.ignore_aws().ignore_config(ignore)
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// List a bucket's tags. A bucket without tags yields an empty set.
pub async fn bucket_list_tags(
    conn: &dyn S3Api,
    target: &BucketTarget,
) -> ProviderResult<KeyValueTags> {
    match conn.get_bucket_tagging(target).await {
        Ok(tags) => Ok(KeyValueTags::from_s3(&tags)),
        Err(e) if e.code_is(&[S3ErrorCode::NoSuchTagSet]) => Ok(KeyValueTags::default()),
        Err(e) => Err(e).context("listing tags for S3 Bucket", &target.bucket),
    }
}

/// Replace a bucket's tags, keeping remote tags that neither side manages.
pub async fn bucket_update_tags(
    conn: &dyn S3Api,
    target: &BucketTarget,
    old: &KeyValueTags,
    new: &KeyValueTags,
) -> ProviderResult<()> {
    let old = old.ignore_aws();
    let new = new.ignore_aws();
    let all = bucket_list_tags(conn, target).await?;
    let ignored = all.ignore(&old).ignore(&new);

    if new.len() + ignored.len() > 0 {
        conn.put_bucket_tagging(target, &new.merge(&ignored).to_s3())
            .await
            .context("setting tags for S3 Bucket", &target.bucket)
    } else if !old.is_empty() && ignored.is_empty() {
        conn.delete_bucket_tagging(target)
            .await
            .context("deleting tags for S3 Bucket", &target.bucket)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// List an object's tags.
pub async fn object_list_tags(
    conn: &dyn S3Api,
    target: &BucketTarget,
    key: &str,
) -> ProviderResult<KeyValueTags> {
    let tags = conn
        .get_object_tagging(target, key, None)
        .await
        .context("listing tags for S3 Object", key)?;
    Ok(KeyValueTags::from_s3(&tags))
}

/// Replace an object's tags, keeping remote tags that neither side manages.
pub async fn object_update_tags(
    conn: &dyn S3Api,
    target: &BucketTarget,
    key: &str,
    old: &KeyValueTags,
    new: &KeyValueTags,
) -> ProviderResult<()> {
    let old = old.ignore_aws();
    let new = new.ignore_aws();
    let all = object_list_tags(conn, target, key).await?;
    let ignored = all.ignore(&old).ignore(&new);

    if new.len() + ignored.len() > 0 {
        conn.put_object_tagging(target, key, None, &new.merge(&ignored).to_s3())
            .await
            .context("setting tags for S3 Object", key)
    } else if !old.is_empty() && ignored.is_empty() {
        conn.delete_object_tagging(target, key, None)
            .await
            .context("deleting tags for S3 Object", key)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> KeyValueTags {
        KeyValueTags::new(pairs.iter().copied())
    }

    #[test]
    fn test_should_drop_aws_reserved_tags() {
        let tags = kv(&[("aws:cloudformation:stack-name", "x"), ("env", "prod")]);
        assert_eq!(tags.ignore_aws(), kv(&[("env", "prod")]));
    }

    #[test]
    fn test_should_compute_removed_and_updated() {
        let old = kv(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let new = kv(&[("b", "2"), ("c", "30"), ("d", "4")]);
        assert_eq!(old.removed(&new).keys(), vec!["a"]);
        assert_eq!(old.updated(&new), kv(&[("c", "30"), ("d", "4")]));
    }

    #[test]
    fn test_should_merge_with_other_winning() {
        let defaults = kv(&[("env", "dev"), ("team", "storage")]);
        let resource = kv(&[("env", "prod")]);
        assert_eq!(
            defaults.merge(&resource),
            kv(&[("env", "prod"), ("team", "storage")])
        );
    }

    #[test]
    fn test_should_remove_matching_defaults_only() {
        let config = DefaultConfig {
            tags: kv(&[("env", "dev"), ("team", "storage")]),
        };
        let tags_all = kv(&[("env", "prod"), ("team", "storage"), ("name", "x")]);
        assert_eq!(
            config.remove_from(&tags_all),
            kv(&[("env", "prod"), ("name", "x")])
        );
    }

    #[test]
    fn test_should_apply_ignore_config() {
        let config = IgnoreConfig {
            keys: vec!["owner".to_owned()],
            key_prefixes: vec!["kubernetes.io/".to_owned()],
        };
        let tags = kv(&[("owner", "me"), ("kubernetes.io/cluster", "c"), ("env", "prod")]);
        assert_eq!(tags.ignore_config(&config), kv(&[("env", "prod")]));
        assert_eq!(tags.only(&["env", "missing"]), kv(&[("env", "prod")]));
    }

    #[test]
    fn test_should_chunk_and_encode() {
        let tags = kv(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let chunks = tags.chunks(2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], kv(&[("c", "3")]));
        assert_eq!(kv(&[("k 1", "v&1"), ("k2", "v2")]).url_encode(), "k+1=v%261&k2=v2");
    }

    #[tokio::test]
    async fn test_should_preserve_ignored_remote_bucket_tags() {
        let conn = crate::conn::InMemoryS3::new("us-east-1");
        let target = BucketTarget::new("tagged");
        conn.create_bucket(&tfs3_model::object::CreateBucketInput {
            bucket: "tagged".to_owned(),
            ..Default::default()
        })
        .await
        .unwrap();
        conn.put_bucket_tagging(&target, &[Tag::new("external", "keep"), Tag::new("a", "1")])
            .await
            .unwrap();

        let old = kv(&[("a", "1")]);
        let new = kv(&[("b", "2")]);
        bucket_update_tags(&conn, &target, &old, &new).await.unwrap();

        let remote = bucket_list_tags(&conn, &target).await.unwrap();
        assert_eq!(remote, kv(&[("b", "2"), ("external", "keep")]));

        bucket_update_tags(&conn, &target, &new, &KeyValueTags::default())
            .await
            .unwrap();
        let remote = bucket_list_tags(&conn, &target).await.unwrap();
        assert_eq!(remote, kv(&[("external", "keep")]));
    }
}
