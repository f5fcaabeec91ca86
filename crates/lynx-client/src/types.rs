//! Shared types for Lynx API communication

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Query filter for list endpoints (`key=value` pairs)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a condition in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Sort order for log and trace queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrder {
    /// Oldest first
    Asc,

    /// Newest first
    #[default]
    Desc,
}

impl LogOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOrder::Asc => "asc",
            LogOrder::Desc => "desc",
        }
    }
}

/// Postal address of an organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip: String,
}

/// Deserialize `null` as the type's default
///
/// The API encodes empty lists and maps as `null`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct WithList {
        #[serde(default, deserialize_with = "nullable")]
        items: Vec<i64>,
    }

    #[test]
    fn test_nullable() {
        let parsed: WithList = serde_json::from_str(r#"{"items":null}"#).unwrap();
        assert!(parsed.items.is_empty());
        let parsed: WithList = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.items.is_empty());
        let parsed: WithList = serde_json::from_str(r#"{"items":[1,2]}"#).unwrap();
        assert_eq!(parsed.items, vec![1, 2]);
    }

    #[test]
    fn test_filter_builder() {
        let filter = Filter::new().with("name", "*blinder").with("type", "switch");
        let pairs: Vec<_> = filter.iter().collect();
        assert_eq!(pairs, vec![("name", "*blinder"), ("type", "switch")]);
    }

    #[test]
    fn test_log_order() {
        assert_eq!(LogOrder::default(), LogOrder::Desc);
        assert_eq!(LogOrder::Asc.as_str(), "asc");
        assert_eq!(serde_json::to_string(&LogOrder::Desc).unwrap(), r#""desc""#);
    }
}
