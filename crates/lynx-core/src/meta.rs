//! Entity metadata
//!
//! Installations, functions, devices and organizations all carry a string to
//! string map. Keys follow naming conventions (`topic_*`, `format_*`,
//! `state_*`, ...) rather than a schema.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors from the typed metadata accessors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    /// Key is not present in the map
    #[error("Meta key not found: {0}")]
    Missing(String),

    /// Value could not be parsed into the requested type
    #[error("Meta key {key} has invalid value {value:?}")]
    Invalid { key: String, value: String },
}

/// Result type for metadata accessors
pub type MetaResult<T> = Result<T, MetaError>;

/// Metadata attached to a platform entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Meta(HashMap<String, String>);

impl<'de> Deserialize<'de> for Meta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The API sends `null` for entities without metadata
        let map = Option::<HashMap<String, String>>::deserialize(deserializer)?;
        Ok(Self(map.unwrap_or_default()))
    }
}

impl Meta {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over entries whose key starts with `prefix`, yielding the key
    /// with the prefix stripped
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|name| (name, v)))
    }

    /// Parse a value with its `FromStr` implementation
    pub fn parse<T: FromStr>(&self, key: &str) -> MetaResult<T> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| MetaError::Missing(key.to_string()))?;
        value.parse().map_err(|_| MetaError::Invalid {
            key: key.to_string(),
            value: value.clone(),
        })
    }

    pub fn as_int(&self, key: &str) -> MetaResult<isize> {
        self.parse(key)
    }

    pub fn as_uint(&self, key: &str) -> MetaResult<usize> {
        self.parse(key)
    }

    pub fn as_i64(&self, key: &str) -> MetaResult<i64> {
        self.parse(key)
    }

    pub fn as_u64(&self, key: &str) -> MetaResult<u64> {
        self.parse(key)
    }

    pub fn as_i32(&self, key: &str) -> MetaResult<i32> {
        self.parse(key)
    }

    pub fn as_u32(&self, key: &str) -> MetaResult<u32> {
        self.parse(key)
    }

    pub fn as_i16(&self, key: &str) -> MetaResult<i16> {
        self.parse(key)
    }

    pub fn as_u16(&self, key: &str) -> MetaResult<u16> {
        self.parse(key)
    }

    pub fn as_i8(&self, key: &str) -> MetaResult<i8> {
        self.parse(key)
    }

    pub fn as_u8(&self, key: &str) -> MetaResult<u8> {
        self.parse(key)
    }

    pub fn as_f64(&self, key: &str) -> MetaResult<f64> {
        self.parse(key)
    }

    /// Parse a boolean the way the platform writes them
    ///
    /// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
    pub fn as_bool(&self, key: &str) -> MetaResult<bool> {
        let value = self
            .get(key)
            .ok_or_else(|| MetaError::Missing(key.to_string()))?;
        match value {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(MetaError::Invalid {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl From<HashMap<String, String>> for Meta {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<Meta> for HashMap<String, String> {
    fn from(meta: Meta) -> Self {
        meta.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Meta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A single metadata entry as exposed by the `.../meta/{key}` endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaObject {
    /// Entry value
    #[serde(rename = "Value", alias = "value")]
    pub value: String,

    /// Whether the entry lives in the protected map
    #[serde(rename = "Protected", alias = "protected", default)]
    pub protected: bool,
}

impl MetaObject {
    /// Create a public entry
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            protected: false,
        }
    }

    /// Create a protected entry
    pub fn protected(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            protected: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> Meta {
        [
            ("count", "42"),
            ("negative", "-7"),
            ("ratio", "0.25"),
            ("enabled", "True"),
            ("disabled", "f"),
            ("name", "boiler"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_typed_accessors() {
        let meta = meta();
        assert_eq!(meta.as_int("count"), Ok(42));
        assert_eq!(meta.as_u8("count"), Ok(42));
        assert_eq!(meta.as_i16("negative"), Ok(-7));
        assert_eq!(meta.as_f64("ratio"), Ok(0.25));
        assert_eq!(meta.as_bool("enabled"), Ok(true));
        assert_eq!(meta.as_bool("disabled"), Ok(false));
    }

    #[test]
    fn test_accessor_errors() {
        let meta = meta();
        assert_eq!(
            meta.as_i64("missing"),
            Err(MetaError::Missing("missing".to_string()))
        );
        assert!(matches!(
            meta.as_u32("negative"),
            Err(MetaError::Invalid { .. })
        ));
        assert!(matches!(meta.as_bool("name"), Err(MetaError::Invalid { .. })));
        assert!(meta.as_i8("count").is_ok());
        assert!(matches!(
            meta.as_i8("ratio"),
            Err(MetaError::Invalid { .. })
        ));
    }

    #[test]
    fn test_with_prefix_strips_prefix() {
        let meta: Meta = [("state_on", "1"), ("state_off", "0"), ("unit", "W")]
            .into_iter()
            .collect();
        let mut states: Vec<_> = meta.with_prefix("state_").collect();
        states.sort();
        assert_eq!(states, vec![("off", "0"), ("on", "1")]);
    }

    #[test]
    fn test_deserialize_null_as_empty() {
        let meta: Meta = serde_json::from_str("null").unwrap();
        assert!(meta.is_empty());

        let meta: Meta = serde_json::from_str(r#"{"name":"pump"}"#).unwrap();
        assert_eq!(meta.get("name"), Some("pump"));
    }

    #[test]
    fn test_meta_object_wire_names() {
        let mo: MetaObject = serde_json::from_str(r#"{"Value":"x","Protected":true}"#).unwrap();
        assert_eq!(mo, MetaObject::protected("x"));

        let mo: MetaObject = serde_json::from_str(r#"{"value":"z"}"#).unwrap();
        assert_eq!(mo, MetaObject::new("z"));

        let json = serde_json::to_string(&MetaObject::new("y")).unwrap();
        assert_eq!(json, r#"{"Value":"y","Protected":false}"#);
    }
}
