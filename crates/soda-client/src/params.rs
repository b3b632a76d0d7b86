//! SoQL parameter sets and their query-string encoding.
//!
//! A [`Parameters`] value maps unique keys to string values. Keys are kept
//! sorted, so the serialized query string is reproducible for a given set.
//! Values are percent-encoded with everything but RFC 3986 unreserved
//! characters escaped, which keeps `&`, `=` and `$` inside keys and values
//! from being confused with separators.

use crate::error::{Result, SodaError};
use std::collections::BTreeMap;

/// `$select`: columns or expressions to return.
pub const SELECT: &str = "$select";
/// `$where`: SoQL filter expression.
pub const WHERE: &str = "$where";
/// `$q`: multi-column full text search.
pub const FULL_TEXT: &str = "$q";
/// `$order`: sort column and direction.
pub const ORDER: &str = "$order";
/// `$group`: aggregation column.
pub const GROUP: &str = "$group";
/// `$limit`: maximum rows returned.
pub const LIMIT: &str = "$limit";
/// `$offset`: rows skipped before the first returned row.
pub const OFFSET: &str = "$offset";

const RESERVED: [&str; 7] = [SELECT, WHERE, FULL_TEXT, ORDER, GROUP, LIMIT, OFFSET];

/// Ordered, unique-key set of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: BTreeMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new set equal to this one with `key` set to `value`.
    ///
    /// The receiver is left untouched.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.insert(key, value);
        next
    }

    /// Set `key` in place, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether `key` is one of the `$`-prefixed SoQL parameters.
    pub fn is_reserved(key: &str) -> bool {
        RESERVED.contains(&key)
    }

    /// Serialize as `k1=v1&k2=v2`, percent-encoding keys and values.
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse a query string produced by [`to_query_string`](Self::to_query_string).
    ///
    /// A pair without `=` is a key with an empty value. A repeated key keeps
    /// its last value.
    pub fn from_query_string(query: &str) -> Result<Self> {
        let mut params = Parameters::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.insert(decode_component(key)?, decode_component(value)?);
        }
        Ok(params)
    }
}

fn decode_component(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| SodaError::InvalidUrl(format!("Invalid query component '{}': {}", raw, e)))
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<K, V> Extend<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
