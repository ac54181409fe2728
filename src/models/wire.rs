//! Helpers for the loosely-typed JSON the inventory service returns.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A related entity that the service either expands inline or leaves as a
/// bare identifier (with the expanded shape moved to a `<field>_data`
/// sibling).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationField<T> {
    Expanded(T),
    Reference(Value),
}

/// Nested object first, then the `_data` sibling, otherwise absent.
pub fn resolve_relation<T>(nested: Option<RelationField<T>>, data: Option<T>) -> Option<T> {
    match nested {
        Some(RelationField::Expanded(value)) => Some(value),
        Some(RelationField::Reference(_)) | None => data,
    }
}

/// Accepts a string, number, or bool and keeps its textual form.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_text))
}

pub fn value_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default)]
        rel: Option<RelationField<Named>>,
        #[serde(default)]
        rel_data: Option<Named>,
        #[serde(default, deserialize_with = "text")]
        code: Option<String>,
    }

    fn resolve(json: &str) -> Option<Named> {
        let holder: Holder = serde_json::from_str(json).unwrap();
        resolve_relation(holder.rel, holder.rel_data)
    }

    #[test]
    fn nested_object_wins_over_data_sibling() {
        let named = resolve(r#"{"rel": {"name": "inline"}, "rel_data": {"name": "sibling"}}"#);
        assert_eq!(named.unwrap().name.as_deref(), Some("inline"));
    }

    #[test]
    fn bare_id_reads_data_sibling() {
        let named = resolve(r#"{"rel": 12, "rel_data": {"name": "sibling"}}"#);
        assert_eq!(named.unwrap().name.as_deref(), Some("sibling"));

        let named = resolve(r#"{"rel": "a1b2", "rel_data": {"name": "sibling"}}"#);
        assert_eq!(named.unwrap().name.as_deref(), Some("sibling"));
    }

    #[test]
    fn bare_id_alone_is_absent() {
        assert!(resolve(r#"{"rel": 12}"#).is_none());
        assert!(resolve(r#"{"rel": null}"#).is_none());
        assert!(resolve(r#"{}"#).is_none());
    }

    #[test]
    fn text_accepts_numbers() {
        let holder: Holder = serde_json::from_str(r#"{"code": 4200}"#).unwrap();
        assert_eq!(holder.code.as_deref(), Some("4200"));
        let holder: Holder = serde_json::from_str(r#"{"code": null}"#).unwrap();
        assert_eq!(holder.code, None);
    }
}
