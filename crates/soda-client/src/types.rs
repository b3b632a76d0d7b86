//! Row and result types produced by the client.

use crate::config::DEFAULT_LIMIT;
use crate::error::SodaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One dataset record: field name to loosely-typed JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field value, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value when it is a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Row(map)
    }
}

/// Outcome of a dataset fetch.
pub type DatasetResult = std::result::Result<Vec<Row>, SodaError>;

/// Outcome of a single-row fetch, and the item type handed to `each` iterators.
pub type RowResult = std::result::Result<Row, SodaError>;

/// Paging window for the filter convenience form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Passed through verbatim, zero and negative values included
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_accessors() {
        let row: Row = serde_json::from_value(json!({
            "title": "Vertigo",
            "release_year": 1958,
            "locations": null
        }))
        .unwrap();

        assert_eq!(row.len(), 3);
        assert_eq!(row.get_str("title"), Some("Vertigo"));
        assert_eq!(row.get("release_year"), Some(&json!(1958)));
        assert_eq!(row.get_str("release_year"), None);
        assert_eq!(row.get("locations"), Some(&Value::Null));
        assert!(row.get("director").is_none());
    }

    #[test]
    fn test_row_serializes_as_plain_object() {
        let mut map = Map::new();
        map.insert("title".to_string(), json!("Bullitt"));
        let row = Row::from(map);

        assert_eq!(serde_json::to_value(&row).unwrap(), json!({"title": "Bullitt"}));
    }

    #[test]
    fn test_default_page() {
        let page = Page::default();
        assert_eq!(page.limit, 1000);
        assert_eq!(page.offset, 0);
    }
}
