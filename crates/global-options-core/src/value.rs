//! Content value types
//!
//! Represents the content a host hands to the tag resolver: plain text,
//! or a nested element configuration made of sequences and mappings.
//! Any JSON document maps onto this type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A content value that may contain `{global_*}` tags in its string leaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[derive(Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (may contain tags like {global_phone})
    String(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if this value is a sequence
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    /// Check if this value is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Whether this value is "empty" the way a host filter sees it:
    /// null, false, zero, an empty string, or an empty container
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Sequence(s) => s.is_empty(),
            Value::Mapping(m) => m.is_empty(),
        }
    }

    /// Get a value by path (e.g., "link.url" or "items[0].label")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }

        let segments = parse_path(path)?;
        let mut current = self;

        for segment in &segments {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Mapping(map)) => map.get(key.as_str())?,
                (PathSegment::Index(idx), Value::Sequence(seq)) => seq.get(*idx)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

/// A segment in a path expression
#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    /// A key in a mapping (e.g., "link" in "link.url")
    Key(String),
    /// An index in a sequence (e.g., 0 in "items[0]")
    Index(usize),
}

/// Parse a path string into segments
/// Supports: "key", "key.subkey", "key[0]", "key[0].subkey"
fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut current_key = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
            }
            '[' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
                let index_str: String = chars.by_ref().take_while(|&c| c != ']').collect();
                segments.push(PathSegment::Index(index_str.parse().ok()?));
            }
            ']' => return None,
            _ => current_key.push(c),
        }
    }

    if !current_key.is_empty() {
        segments.push(PathSegment::Key(current_key));
    }

    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_complex_path() {
        let segments = parse_path("items[0].link").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::Key("items".into()),
                PathSegment::Index(0),
                PathSegment::Key("link".into())
            ]
        );
    }

    #[test]
    fn test_parse_bad_index() {
        assert!(parse_path("items[x]").is_none());
        assert!(parse_path("items]").is_none());
    }

    #[test]
    fn test_value_from_json() {
        let value: Value =
            serde_json::from_str(r#"{"link": {"url": "{global_cta_url}"}, "items": [1, 2.5, true, null]}"#)
                .unwrap();

        assert_eq!(
            value.get_path("link.url").and_then(Value::as_str),
            Some("{global_cta_url}")
        );
        assert_eq!(value.get_path("items[0]"), Some(&Value::Integer(1)));
        assert_eq!(value.get_path("items[1]"), Some(&Value::Float(2.5)));
        assert_eq!(value.get_path("items[2]"), Some(&Value::Bool(true)));
        assert_eq!(value.get_path("items[3]"), Some(&Value::Null));
        assert!(value.get_path("items[4]").is_none());
        assert!(value.get_path("link.missing").is_none());
    }

    #[test]
    fn test_mapping_keeps_insertion_order() {
        let value: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<_> = value.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_is_empty_matches_host_semantics() {
        assert!(Value::Null.is_empty());
        assert!(Value::String(String::new()).is_empty());
        assert!(Value::Mapping(IndexMap::new()).is_empty());
        assert!(Value::Integer(0).is_empty());
        assert!(!Value::String("x".into()).is_empty());
        assert!(!Value::Sequence(vec![Value::Null]).is_empty());
    }

    #[test]
    fn test_display_nested() {
        let mut map = IndexMap::new();
        map.insert("label".into(), Value::from("ok"));
        map.insert("sizes".into(), Value::from(vec![1i64, 2]));
        assert_eq!(Value::Mapping(map).to_string(), "{label: ok, sizes: [1, 2]}");
    }
}
