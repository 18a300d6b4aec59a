//! Diagnostic renderings of records for logs and audit trails.
//!
//! Both forms are best effort: a missing attribute renders as [`ABSENT`]
//! instead of failing.

use super::descriptors::{IDENTIFIER_ALIAS, IDENTIFIER_FIELD};
use crate::core::Value;
use std::collections::BTreeMap;

/// Marker rendered for attributes that are missing or null.
pub const ABSENT: &str = "None";

/// Prepends the identifier unless the list already names it (as `id` or `pk`).
pub fn sane_attrs<'a>(attrs: &[&'a str]) -> Vec<&'a str> {
    let mut all = Vec::with_capacity(attrs.len() + 1);
    if !attrs.iter().any(|attr| *attr == IDENTIFIER_FIELD || *attr == IDENTIFIER_ALIAS) {
        all.push(IDENTIFIER_FIELD);
    }
    all.extend_from_slice(attrs);
    all
}

/// Renders `<Type at 0x…: attr=repr, …>`.
///
/// `identity` is an opaque per-instance tag, usually the record's address.
pub fn sane_repr<F>(type_name: &str, identity: usize, attrs: &[&str], lookup: F) -> String
where
    F: Fn(&str) -> Option<Value>,
{
    let pairs: Vec<String> = sane_attrs(attrs)
        .into_iter()
        .map(|attr| {
            let rendered = lookup(attr)
                .map(|value| value.repr())
                .unwrap_or_else(|| ABSENT.to_string());
            format!("{}={}", attr, rendered)
        })
        .collect();
    format!("<{} at 0x{:x}: {}>", type_name, identity, pairs.join(", "))
}

/// Builds the `"<lowercased type>.<attr>" -> value` audit map.
pub fn sane_dict<F>(type_name: &str, attrs: &[&str], lookup: F) -> BTreeMap<String, String>
where
    F: Fn(&str) -> Option<Value>,
{
    let prefix = type_name.to_lowercase();
    sane_attrs(attrs)
        .into_iter()
        .map(|attr| {
            let rendered = match lookup(attr) {
                None | Some(Value::Null) | Some(Value::Json(serde_json::Value::Null)) => {
                    ABSENT.to_string()
                }
                Some(Value::Json(serde_json::Value::String(text))) => text,
                Some(value) => value.to_string(),
            };
            (format!("{}.{}", prefix, attr), rendered)
        })
        .collect()
}
