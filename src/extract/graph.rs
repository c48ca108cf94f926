//! Dereferencing of the client-side object cache embedded in detail pages.
//!
//! The cache is a flat map from keys such as `SoldPropertyListing:<id>` or
//! `Broker:<id>` to entity payloads. Entities point at each other with
//! `{"__ref": "<key>"}` markers. Resolution here is one level deep: the
//! root's own fields and the items of its sequence fields are replaced by
//! the entities they name; references inside those entities are left alone.

use serde_json::{Map, Value};

/// Key of the reference marker field
pub const REF_MARKER: &str = "__ref";

/// Root fields never carried into a record (image attribution, ad targeting)
pub const EXCLUDED_FIELDS: [&str; 2] = ["attributedImages", "adTargeting"];

/// Classification of a raw cache value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheValue<'a> {
    /// Any object carrying the marker; `None` when the key is not a string
    Reference(Option<&'a str>),
    Sequence(&'a [Value]),
    Inline(&'a Value),
}

impl<'a> CacheValue<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => match map.get(REF_MARKER) {
                Some(key) => CacheValue::Reference(key.as_str()),
                None => CacheValue::Inline(value),
            },
            Value::Array(items) => CacheValue::Sequence(items),
            _ => CacheValue::Inline(value),
        }
    }
}

/// Read-only snapshot of one page's object cache
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCache {
    entries: Map<String, Value>,
}

impl ObjectCache {
    pub fn new(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entity stored under `key`; unknown or unusable keys resolve to an empty entity
    pub fn entity(&self, key: Option<&str>) -> Value {
        key.and_then(|key| self.entries.get(key))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// First key carrying `prefix`, in cache order
    pub fn find_root(&self, prefix: &str) -> Option<&str> {
        self.entries
            .keys()
            .find(|key| key.starts_with(prefix))
            .map(String::as_str)
    }

    /// Resolve the first entity whose key starts with `prefix`
    ///
    /// Returns an empty map when the cache holds no such entity.
    pub fn resolve_root(&self, prefix: &str) -> Map<String, Value> {
        match self.find_root(prefix) {
            Some(key) => self.resolve(key),
            None => Map::new(),
        }
    }

    /// Resolve the entity stored under `root_key` one level deep
    pub fn resolve(&self, root_key: &str) -> Map<String, Value> {
        let Some(Value::Object(root)) = self.entries.get(root_key) else {
            return Map::new();
        };

        root.iter()
            .filter(|(field, _)| !EXCLUDED_FIELDS.contains(&field.as_str()))
            .map(|(field, value)| (field.clone(), self.dereference(value)))
            .collect()
    }

    fn dereference(&self, value: &Value) -> Value {
        match CacheValue::classify(value) {
            CacheValue::Reference(key) => self.entity(key),
            CacheValue::Sequence(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match CacheValue::classify(item) {
                        CacheValue::Reference(key) => self.entity(key),
                        _ => item.clone(),
                    })
                    .collect(),
            ),
            CacheValue::Inline(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(value: Value) -> ObjectCache {
        match value {
            Value::Object(entries) => ObjectCache::new(entries),
            other => panic!("fixture must be an object, got {other}"),
        }
    }

    fn has_marker(value: &Value) -> bool {
        matches!(CacheValue::classify(value), CacheValue::Reference(_))
    }

    #[test]
    fn replaces_direct_references() {
        let cache = cache(json!({
            "SoldPropertyListing:1": {
                "broker": {"__ref": "Broker:9"},
                "streetAddress": "Orkestervägen 112"
            },
            "Broker:9": {"name": "Alice", "agency": {"__ref": "BrokerAgency:2"}}
        }));

        let resolved = cache.resolve("SoldPropertyListing:1");

        assert_eq!(resolved["streetAddress"], "Orkestervägen 112");
        assert_eq!(resolved["broker"]["name"], "Alice");
        // Second-level references stay as they are
        assert_eq!(resolved["broker"]["agency"], json!({"__ref": "BrokerAgency:2"}));
    }

    #[test]
    fn resolves_references_inside_sequences() {
        let cache = cache(json!({
            "SoldPropertyListing:1": {
                "districts": [{"__ref": "District:1"}, "inline", {"__ref": "District:404"}]
            },
            "District:1": {"id": "1", "fullName": "Sjungande dalen"}
        }));

        let resolved = cache.resolve("SoldPropertyListing:1");
        let districts = resolved["districts"].as_array().unwrap();

        assert_eq!(districts[0]["fullName"], "Sjungande dalen");
        assert_eq!(districts[1], "inline");
        assert_eq!(districts[2], json!({}));
        assert!(!districts.iter().any(has_marker));
    }

    #[test]
    fn missing_reference_resolves_to_empty_entity() {
        let cache = cache(json!({
            "SoldPropertyListing:1": {"tenure": {"__ref": "Tenure:gone"}}
        }));

        let resolved = cache.resolve("SoldPropertyListing:1");
        assert_eq!(resolved["tenure"], json!({}));
    }

    #[test]
    fn markers_with_non_string_keys_resolve_to_empty_entities() {
        let cache = cache(json!({
            "SoldPropertyListing:1": {
                "broker": {"__ref": 9},
                "districts": [{"__ref": null}, {"__ref": "District:1"}]
            },
            "District:1": {"id": "1"}
        }));

        let resolved = cache.resolve("SoldPropertyListing:1");

        assert_eq!(resolved["broker"], json!({}));
        assert_eq!(resolved["districts"], json!([{}, {"id": "1"}]));
    }

    #[test]
    fn drops_image_and_ad_fields() {
        let cache = cache(json!({
            "SoldPropertyListing:1": {
                "attributedImages": [{"__ref": "Image:1"}],
                "adTargeting": {"segment": "x"},
                "id": "1"
            }
        }));

        let resolved = cache.resolve_root("SoldPropertyListing:");
        assert!(!resolved.contains_key("attributedImages"));
        assert!(!resolved.contains_key("adTargeting"));
        assert_eq!(resolved["id"], "1");
    }

    #[test]
    fn no_listing_entity_means_empty_result() {
        let cache = cache(json!({"Broker:9": {"name": "Alice"}}));
        assert!(cache.resolve_root("SoldPropertyListing:").is_empty());
    }

    #[test]
    fn top_level_never_keeps_markers() {
        let cache = cache(json!({
            "ROOT_QUERY": {"__typename": "Query"},
            "SoldPropertyListing:7": {
                "a": {"__ref": "X:1"},
                "b": {"__ref": "X:2"},
                "c": [{"__ref": "X:1"}, {"__ref": "X:3"}],
                "d": 12
            },
            "X:1": {"v": 1},
            "X:2": {"v": {"__ref": "X:1"}}
        }));

        let resolved = cache.resolve_root("SoldPropertyListing:");
        for value in resolved.values() {
            assert!(!has_marker(value));
            if let Value::Array(items) = value {
                assert!(!items.iter().any(has_marker));
            }
        }
    }
}
