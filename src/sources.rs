use crate::error::{AnthemError, Result};
use crate::protocol;
use crate::types::Model;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bidirectional map between device source codes and display names
///
/// Deserializes from a `{ "code": "name" }` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct SourceMap {
    by_code: BTreeMap<String, String>,
    by_name: BTreeMap<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory source list for a model
    pub fn for_model(model: Model) -> Self {
        protocol::default_sources(model).iter().copied().collect()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        let code = code.into();
        let name = name.into();
        if let Some(old_name) = self.by_code.insert(code.clone(), name.clone()) {
            self.by_name.remove(&old_name);
        }
        if let Some(old_code) = self.by_name.insert(name, code.clone()) {
            if old_code != code {
                self.by_code.remove(&old_code);
            }
        }
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(String::as_str)
    }

    pub fn code(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Look up the code for a name, failing with `UnknownSource`
    pub fn resolve(&self, name: &str) -> Result<&str> {
        self.code(name)
            .ok_or_else(|| AnthemError::UnknownSource(name.to_string()))
    }

    /// Source names ordered by code
    pub fn names(&self) -> Vec<String> {
        self.by_code.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl<C, N> FromIterator<(C, N)> for SourceMap
where
    C: Into<String>,
    N: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, N)>>(iter: I) -> Self {
        let mut map = SourceMap::new();
        for (code, name) in iter {
            map.insert(code, name);
        }
        map
    }
}

impl From<BTreeMap<String, String>> for SourceMap {
    fn from(by_code: BTreeMap<String, String>) -> Self {
        by_code.into_iter().collect()
    }
}

impl From<SourceMap> for BTreeMap<String, String> {
    fn from(map: SourceMap) -> Self {
        map.by_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x00_defaults() {
        let map = SourceMap::for_model(Model::X00);
        assert_eq!(map.len(), 12);
        assert_eq!(map.code("CD"), Some("2"));
        assert_eq!(map.name("e"), Some("Internet Radio"));
        assert!(SourceMap::for_model(Model::X10).is_empty());
    }

    #[test]
    fn resolve_unknown_source() {
        let map = SourceMap::for_model(Model::X00);
        assert_eq!(map.resolve("TV").unwrap(), "3");
        assert!(matches!(map.resolve("Vinyl"), Err(AnthemError::UnknownSource(n)) if n == "Vinyl"));
    }

    #[test]
    fn insert_keeps_both_directions_consistent() {
        let mut map = SourceMap::for_model(Model::X00);
        map.insert("2", "Turntable");
        assert_eq!(map.name("2"), Some("Turntable"));
        assert_eq!(map.code("Turntable"), Some("2"));
        assert_eq!(map.code("CD"), None);

        map.insert("7", "Turntable");
        assert_eq!(map.code("Turntable"), Some("7"));
        assert_eq!(map.name("2"), None);
    }

    #[test]
    fn deserializes_from_object() {
        let map: SourceMap = serde_json::from_str(r#"{"1": "Blu-ray", "4": "Cable"}"#).unwrap();
        assert_eq!(map.code("Cable"), Some("4"));
        assert_eq!(map.names(), vec!["Blu-ray".to_string(), "Cable".to_string()]);
    }
}
