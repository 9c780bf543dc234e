//! Query watermarking.
//!
//! Every statement sent to Trino is prefixed with a single-line comment
//! carrying traceability fields, e.g.
//!
//! ```text
//! -- {"trino_mcp_version":"0.1.0","user":"alice"} --
//! SELECT 1
//! ```
//!
//! Injection is not idempotent: watermarking an already watermarked query adds
//! a second comment line.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered watermark key/value pairs.
///
/// Keys and values never contain line breaks: they are stripped on insert, so
/// the comment always stays on one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatermarkFields {
    entries: Vec<(String, String)>,
}

impl WatermarkFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value of an existing key in place.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        let key = strip_line_breaks(key.as_ref());
        let value = strip_line_breaks(value.as_ref());
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compact JSON object in insertion order.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Prepend the watermark comment to `sql`.
    ///
    /// The first line of the result is the comment; `sql` follows verbatim
    /// from the second line on.
    ///
    /// ```
    /// use trino_mcp_server::sql::WatermarkFields;
    ///
    /// let fields = WatermarkFields::new().with("user", "alice");
    /// assert_eq!(fields.inject("SELECT 1"), "-- {\"user\":\"alice\"} --\nSELECT 1");
    /// ```
    pub fn inject(&self, sql: &str) -> String {
        let comment = self.to_json();
        let mut out = String::with_capacity(comment.len() + sql.len() + 7);
        out.push_str("-- ");
        out.push_str(&comment);
        out.push_str(" --\n");
        out.push_str(sql);
        out
    }
}

impl Serialize for WatermarkFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for WatermarkFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// Remove characters that end a SQL line comment.
fn strip_line_breaks(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}'))
        .collect()
}
