use std::collections::BTreeMap;

use url::form_urlencoded;

/// A single query-parameter value. Bare keys (`?narrative`) are flags, valued
/// keys (`?n=3`) are text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Text(String),
    Flag,
}

impl QueryValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            QueryValue::Text(value) => Some(value),
            QueryValue::Flag => None,
        }
    }
}

/// Parsed URL search parameters with deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, QueryValue>);

impl QueryParams {
    /// Parses a raw search string, with or without the leading `?`.
    /// Later duplicates of a key win.
    pub fn parse(search: &str) -> Self {
        let raw = search.strip_prefix('?').unwrap_or(search);
        let mut map = BTreeMap::new();
        for part in raw.split('&').filter(|part| !part.is_empty()) {
            let has_value = part.contains('=');
            if let Some((key, value)) = form_urlencoded::parse(part.as_bytes()).next() {
                let value = if has_value {
                    QueryValue::Text(value.into_owned())
                } else {
                    QueryValue::Flag
                };
                map.insert(key.into_owned(), value);
            }
        }
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(QueryValue::as_text)
    }

    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), QueryValue::Text(value.into()));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Reconstructs a search string (without the leading `?`).
    pub fn to_search_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.0 {
            match value {
                QueryValue::Text(text) => {
                    serializer.append_pair(key, text);
                }
                QueryValue::Flag => {
                    serializer.append_key_only(key);
                }
            }
        }
        serializer.finish()
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
