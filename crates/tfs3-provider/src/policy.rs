//! JSON policy and website routing-rule normalization.
//!
//! Bucket policies are stored in state in a compact, key-sorted form. When
//! the policy read back from S3 is equivalent to the configured text, the
//! configured text is kept so that formatting differences do not show up as
//! drift.

use serde_json::{Map, Value};
use tfs3_model::types::RoutingRule;

use crate::error::{ProviderError, ProviderResult};

/// Re-serialize a JSON document compactly with object keys sorted.
///
/// Empty input stays empty.
///
/// # Examples
///
/// ```
/// use tfs3_provider::policy::normalize_json_string;
///
/// let json = normalize_json_string("{ \"b\": 1,\n  \"a\": [true] }").unwrap();
/// assert_eq!(json, r#"{"a":[true],"b":1}"#);
/// assert_eq!(normalize_json_string("").unwrap(), "");
/// ```
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] if the input is not JSON.
pub fn normalize_json_string(json: &str) -> ProviderResult<String> {
    if json.trim().is_empty() {
        return Ok(String::new());
    }
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ProviderError::validation(format!("invalid JSON ({e}): {json}")))?;
    Ok(serde_json::to_string(&sort_keys(value))?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Canonical form used for equivalence: sorted keys, single-element arrays
/// collapsed to their element, other arrays sorted and deduplicated, and a
/// bare `"*"` principal expanded to `{"AWS":"*"}`.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .map(|(k, v)| {
                    let v = canonicalize(v);
                    let v = if (k == "Principal" || k == "NotPrincipal") && v == "*" {
                        let mut aws = Map::new();
                        aws.insert("AWS".to_owned(), Value::from("*"));
                        Value::Object(aws)
                    } else {
                        v
                    };
                    (k, v)
                })
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect())
        }
        Value::Array(items) => {
            let mut items: Vec<Value> = items.into_iter().map(canonicalize).collect();
            items.sort_by_cached_key(Value::to_string);
            items.dedup();
            if items.len() == 1 {
                items.pop().unwrap_or(Value::Null)
            } else {
                Value::Array(items)
            }
        }
        other => other,
    }
}

/// Whether two policy documents grant the same thing.
///
/// # Examples
///
/// ```
/// use tfs3_provider::policy::policies_equivalent;
///
/// let a = r#"{"Statement":[{"Action":["s3:GetObject"],"Effect":"Allow","Principal":"*"}]}"#;
/// let b = r#"{"Statement":{"Principal":{"AWS":"*"},"Effect":"Allow","Action":"s3:GetObject"}}"#;
/// assert!(policies_equivalent(a, b).unwrap());
/// ```
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] if either document is not JSON.
pub fn policies_equivalent(a: &str, b: &str) -> ProviderResult<bool> {
    let parse = |json: &str| -> ProviderResult<Value> {
        serde_json::from_str(json)
            .map_err(|e| ProviderError::validation(format!("invalid policy JSON ({e}): {json}")))
    };
    Ok(canonicalize(parse(a)?) == canonicalize(parse(b)?))
}

/// The policy text to store in state: the configured text when it is
/// equivalent to the remote policy, otherwise the remote policy. Both are
/// normalized.
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] if the remote policy is not JSON.
pub fn policy_to_set(configured: &str, remote: &str) -> ProviderResult<String> {
    let chosen = if configured.trim().is_empty() {
        remote
    } else {
        match policies_equivalent(configured, remote) {
            Ok(true) => configured,
            _ => remote,
        }
    };
    normalize_json_string(chosen)
}

/// Parse a `routing_rules` JSON document.
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] if the document is not a JSON array
/// of routing rules.
pub fn parse_routing_rules(json: &str) -> ProviderResult<Vec<RoutingRule>> {
    serde_json::from_str(json)
        .map_err(|e| ProviderError::validation(format!("routing_rules: invalid JSON ({e})")))
}

/// Serialize routing rules as compact JSON without `null` members.
///
/// # Examples
///
/// ```
/// use tfs3_model::types::{Redirect, RoutingRule};
/// use tfs3_provider::policy::normalize_routing_rules;
///
/// let rules = vec![RoutingRule {
///     condition: None,
///     redirect: Redirect { replace_key_with: Some("index.html".into()), ..Redirect::default() },
/// }];
/// assert_eq!(
///     normalize_routing_rules(&rules).unwrap(),
///     r#"[{"Redirect":{"ReplaceKeyWith":"index.html"}}]"#
/// );
/// ```
///
/// # Errors
///
/// Returns [`ProviderError::Serialization`] if the rules cannot be serialized.
pub fn normalize_routing_rules(rules: &[RoutingRule]) -> ProviderResult<String> {
    let value = serde_json::to_value(rules)?;
    Ok(serde_json::to_string(&strip_nulls(value))?)
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = r#"{
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicRead",
            "Effect": "Allow",
            "Principal": "*",
            "Action": ["s3:GetObject", "s3:GetObjectVersion"],
            "Resource": "arn:aws:s3:::site/*"
        }]
    }"#;

    #[test]
    fn test_should_normalize_policy_documents() {
        let normalized = normalize_json_string(POLICY).unwrap();
        assert!(normalized.starts_with(r#"{"Statement":[{"Action":["s3:GetObject""#));
        assert!(!normalized.contains(' '));
        assert!(normalize_json_string("{not json").is_err());
    }

    #[test]
    fn test_should_treat_reordered_actions_as_equivalent() {
        let reordered = POLICY.replace(
            r#"["s3:GetObject", "s3:GetObjectVersion"]"#,
            r#"["s3:GetObjectVersion", "s3:GetObject"]"#,
        );
        assert!(policies_equivalent(POLICY, &reordered).unwrap());

        let different = POLICY.replace("Allow", "Deny");
        assert!(!policies_equivalent(POLICY, &different).unwrap());
    }

    #[test]
    fn test_should_keep_configured_policy_when_equivalent() {
        let remote = r#"{"Version":"2012-10-17","Statement":[{"Sid":"PublicRead","Effect":"Allow","Principal":{"AWS":"*"},"Action":["s3:GetObjectVersion","s3:GetObject"],"Resource":"arn:aws:s3:::site/*"}]}"#;
        let set = policy_to_set(POLICY, remote).unwrap();
        assert_eq!(set, normalize_json_string(POLICY).unwrap());

        let changed = remote.replace("site/*", "other/*");
        let set = policy_to_set(POLICY, &changed).unwrap();
        assert!(set.contains("other/*"));

        assert_eq!(
            policy_to_set("", remote).unwrap(),
            normalize_json_string(remote).unwrap()
        );
    }

    #[test]
    fn test_should_round_trip_routing_rules() {
        let json = r#"[{"Condition":{"KeyPrefixEquals":"docs/"},"Redirect":{"ReplaceKeyPrefixWith":"documents/","HostName":null}}]"#;
        let rules = parse_routing_rules(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            normalize_routing_rules(&rules).unwrap(),
            r#"[{"Condition":{"KeyPrefixEquals":"docs/"},"Redirect":{"ReplaceKeyPrefixWith":"documents/"}}]"#
        );
        assert!(parse_routing_rules("{}").is_err());
    }
}
