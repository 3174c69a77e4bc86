//! Query params declared by a route.
//!
//! URL values arrive as raw strings. Each declared param carries a default,
//! and the default's JSON type decides how raw values are read back:
//!
//! | default          | raw `"3"` becomes |
//! |------------------|-------------------|
//! | number           | `3`               |
//! | boolean          | `false` (only `"true"` is true) |
//! | array / object   | parsed as JSON    |
//! | string / null    | `"3"`             |

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Number, Value};

/// A query param a route declares, with its default.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParam {
    prop: String,
    url_key: String,
    default: Value,
}

impl QueryParam {
    /// Param whose URL key equals its property name.
    pub fn new(prop: impl Into<String>, default: impl Into<Value>) -> Self {
        let prop = prop.into();
        Self {
            url_key: prop.clone(),
            prop,
            default: default.into(),
        }
    }

    pub fn with_url_key(mut self, url_key: impl Into<String>) -> Self {
        self.url_key = url_key.into();
        self
    }

    pub fn prop(&self) -> &str {
        &self.prop
    }

    pub fn url_key(&self) -> &str {
        &self.url_key
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// URL form of the default. `None` when the default is null.
    pub fn serialized_default(&self) -> Option<String> {
        serialize_query_param(&self.default)
    }

    /// Read a raw URL value using this param's default type.
    pub fn deserialize(&self, raw: &str) -> Value {
        deserialize_query_param(raw, &self.default)
    }
}

/// URL form of a query param value.
pub fn serialize_query_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Read a raw URL value, typed after `default`.
pub fn deserialize_query_param(raw: &str, default: &Value) -> Value {
    match default {
        Value::Bool(_) => Value::Bool(raw == "true"),
        Value::Number(_) => deserialize_number(raw),
        Value::Array(_) | Value::Object(_) => match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, raw, "query param is not valid JSON, kept as text");
                Value::String(raw.to_string())
            }
        },
        Value::String(_) | Value::Null => Value::String(raw.to_string()),
    }
}

fn deserialize_number(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Number(integer.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

// =============================================================================
// QueryParamsDiff
// =============================================================================

/// One query-param change reported by the host router, keyed by URL key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParamsDiff {
    changed: BTreeMap<String, String>,
    removed: BTreeSet<String>,
}

impl QueryParamsDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changed(mut self, url_key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.changed.insert(url_key.into(), raw.into());
        self
    }

    pub fn removed(mut self, url_key: impl Into<String>) -> Self {
        self.removed.insert(url_key.into());
        self
    }

    pub fn changed_value(&self, url_key: &str) -> Option<&str> {
        self.changed.get(url_key).map(String::as_str)
    }

    pub fn is_removed(&self, url_key: &str) -> bool {
        self.removed.contains(url_key)
    }

    /// True if any of `declared` changed or was removed.
    pub fn touches(&self, declared: &[QueryParam]) -> bool {
        declared
            .iter()
            .any(|param| self.changed.contains_key(&param.url_key) || self.removed.contains(&param.url_key))
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

// =============================================================================
// QueryParamCache
// =============================================================================

/// Current values of a route's declared params, kept across
/// query-param-only changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParamCache {
    values: Map<String, Value>,
}

impl QueryParamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one change into the cache: changed params are deserialized,
    /// removed params fall back to their defaults. Params the diff does not
    /// mention keep their cached values.
    pub fn cache_diff(&mut self, declared: &[QueryParam], diff: &QueryParamsDiff) {
        for param in declared {
            if let Some(raw) = diff.changed_value(&param.url_key) {
                self.values.insert(param.prop.clone(), param.deserialize(raw));
            }
            if diff.is_removed(&param.url_key) {
                self.values.insert(param.prop.clone(), param.default.clone());
            }
        }
    }

    /// Cached value of `prop`, if any.
    pub fn get(&self, prop: &str) -> Option<&Value> {
        self.values.get(prop)
    }

    /// `positional` overlaid with every declared param (cached or default).
    pub fn params_for(&self, declared: &[QueryParam], positional: &Map<String, Value>) -> Map<String, Value> {
        let mut params = positional.clone();
        for param in declared {
            let value = self
                .values
                .get(&param.prop)
                .cloned()
                .unwrap_or_else(|| param.default.clone());
            params.insert(param.prop.clone(), value);
        }
        params
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_follows_default_type() {
        assert_eq!(deserialize_query_param("3", &json!(1)), json!(3));
        assert_eq!(deserialize_query_param("2.5", &json!(1)), json!(2.5));
        assert_eq!(deserialize_query_param("abc", &json!(1)), Value::Null);
        assert_eq!(deserialize_query_param("true", &json!(false)), json!(true));
        assert_eq!(deserialize_query_param("yes", &json!(false)), json!(false));
        assert_eq!(deserialize_query_param("[1,2]", &json!([])), json!([1, 2]));
        assert_eq!(deserialize_query_param("3", &json!("x")), json!("3"));
        assert_eq!(deserialize_query_param("3", &Value::Null), json!("3"));
    }

    #[test]
    fn test_malformed_array_kept_as_text() {
        assert_eq!(deserialize_query_param("[1,", &json!([])), json!("[1,"));
    }

    #[test]
    fn test_serialized_default() {
        assert_eq!(QueryParam::new("page", 1).serialized_default().as_deref(), Some("1"));
        assert_eq!(QueryParam::new("tags", json!(["a"])).serialized_default().as_deref(), Some(r#"["a"]"#));
        assert_eq!(QueryParam::new("q", "").serialized_default().as_deref(), Some(""));
        assert_eq!(QueryParam::new("q", Value::Null).serialized_default(), None);
    }

    #[test]
    fn test_url_key_defaults_to_prop() {
        let param = QueryParam::new("sortBy", "date");
        assert_eq!(param.url_key(), "sortBy");
        assert_eq!(param.with_url_key("sort").url_key(), "sort");
    }

    #[test]
    fn test_diff_touches_declared_only() {
        let declared = [QueryParam::new("page", 1).with_url_key("p")];

        assert!(QueryParamsDiff::new().changed("p", "2").touches(&declared));
        assert!(QueryParamsDiff::new().removed("p").touches(&declared));
        assert!(!QueryParamsDiff::new().changed("page", "2").touches(&declared));
        assert!(QueryParamsDiff::new().is_empty());
    }

    #[test]
    fn test_cache_diff_and_params_for() {
        let declared = [
            QueryParam::new("page", 1).with_url_key("p"),
            QueryParam::new("sort", "date"),
        ];
        let mut cache = QueryParamCache::new();
        let positional = json!({ "post_id": "7" });
        let positional = positional.as_object().unwrap();

        // Nothing cached: defaults fill in
        assert_eq!(
            Value::Object(cache.params_for(&declared, positional)),
            json!({ "post_id": "7", "page": 1, "sort": "date" })
        );

        cache.cache_diff(&declared, &QueryParamsDiff::new().changed("p", "4").changed("sort", "title"));
        assert_eq!(
            Value::Object(cache.params_for(&declared, positional)),
            json!({ "post_id": "7", "page": 4, "sort": "title" })
        );

        // Removing one param keeps the other cached value
        cache.cache_diff(&declared, &QueryParamsDiff::new().removed("p"));
        assert_eq!(cache.get("page"), Some(&json!(1)));
        assert_eq!(cache.get("sort"), Some(&json!("title")));
    }

    #[test]
    fn test_undeclared_keys_ignored() {
        let declared = [QueryParam::new("page", 1)];
        let mut cache = QueryParamCache::new();
        cache.cache_diff(&declared, &QueryParamsDiff::new().changed("other", "x"));
        assert_eq!(cache, QueryParamCache::new());
    }
}
