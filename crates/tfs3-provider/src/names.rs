//! Generated resource names.
//!
//! A generated name is a prefix, a UTC timestamp with 1/10000 s precision and
//! an 8-digit hex counter, so names sort by creation time and never repeat
//! within a process.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Timelike, Utc};
use regex::Regex;

/// Default prefix of generated names.
pub const UNIQUE_ID_PREFIX: &str = "terraform-";

/// Length of the timestamp plus counter suffix.
pub const UNIQUE_ID_SUFFIX_LENGTH: usize = 26;

static COUNTER: AtomicU32 = AtomicU32::new(0);

static UNIQUE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{18}[0-9a-f]{8}$").expect("UNIQUE_SUFFIX"));

/// A unique name with the default `terraform-` prefix.
#[must_use]
pub fn unique_id() -> String {
    prefixed_unique_id(UNIQUE_ID_PREFIX)
}

/// A unique name with the given prefix.
///
/// # Examples
///
/// ```
/// use tfs3_provider::names::{prefixed_unique_id, UNIQUE_ID_SUFFIX_LENGTH};
///
/// let a = prefixed_unique_id("logs-");
/// let b = prefixed_unique_id("logs-");
/// assert!(a.starts_with("logs-"));
/// assert_eq!(a.len(), "logs-".len() + UNIQUE_ID_SUFFIX_LENGTH);
/// assert!(a < b);
/// ```
#[must_use]
pub fn prefixed_unique_id(prefix: &str) -> String {
    let now = Utc::now();
    let ten_thousandths = now.nanosecond() % 1_000_000_000 / 100_000;
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
    format!(
        "{prefix}{}{ten_thousandths:04}{counter:08x}",
        now.format("%Y%m%d%H%M%S")
    )
}

/// Resolve a resource name: an explicit name wins, then a generated name
/// with the given prefix, then a generated name with the default prefix.
#[must_use]
pub fn name(name: Option<&str>, prefix: Option<&str>) -> String {
    match (name.filter(|n| !n.is_empty()), prefix.filter(|p| !p.is_empty())) {
        (Some(name), _) => name.to_owned(),
        (None, Some(prefix)) => prefixed_unique_id(prefix),
        (None, None) => unique_id(),
    }
}

/// Recover the prefix of a generated name, if the name has the generated suffix.
///
/// # Examples
///
/// ```
/// use tfs3_provider::names::name_prefix_from_name;
///
/// assert_eq!(
///     name_prefix_from_name("tf-test-20250102030405060700000001").as_deref(),
///     Some("tf-test-")
/// );
/// assert_eq!(name_prefix_from_name("my-bucket"), None);
/// ```
#[must_use]
pub fn name_prefix_from_name(name: &str) -> Option<String> {
    if name.len() < UNIQUE_ID_SUFFIX_LENGTH || !UNIQUE_SUFFIX.is_match(name) {
        return None;
    }
    Some(name[..name.len() - UNIQUE_ID_SUFFIX_LENGTH].to_owned())
}
