//! Dotted path lookups into arbitrary JSON documents
//!
//! Webhook payloads from ticketing platforms nest their fields differently per
//! deployment. This crate resolves configured paths such as
//! `result.comments.0.sys_id` against a `serde_json::Value`.
//!
//! # Syntax
//!
//! - Segments are separated by `.`
//! - A segment made only of digits indexes into an array (it still matches an
//!   object key of the same name)
//! - `\.` escapes a literal dot inside a key
//!
//! # Example
//!
//! ```
//! use fieldpath::FieldPath;
//! use serde_json::json;
//!
//! let doc = json!({"issue": {"fields": {"summary": "Disk full"}}});
//! let path: FieldPath = "issue.fields.summary".parse()?;
//!
//! assert_eq!(path.string(&doc).as_deref(), Some("Disk full"));
//! # Ok::<(), fieldpath::PathError>(())
//! ```

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("path '{0}' ends with a dangling escape")]
    DanglingEscape(String),
}

/// Result type for path operations
pub type Result<T> = std::result::Result<T, PathError>;

/// A parsed, reusable JSON path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err(PathError::DanglingEscape(raw.to_string())),
                },
                '.' => {
                    if current.is_empty() {
                        return Err(PathError::EmptySegment(raw.to_string()));
                    }
                    segments.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }

        if current.is_empty() {
            return Err(PathError::EmptySegment(raw.to_string()));
        }
        segments.push(current);

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as it was written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Individual segments after unescaping
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk the document and return the value at this path, if any
    pub fn resolve<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(doc, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Whether the path resolves to anything (including `null`)
    pub fn exists(&self, doc: &Value) -> bool {
        self.resolve(doc).is_some()
    }

    /// Resolve to a scalar rendered as a string
    ///
    /// Strings are returned as-is, numbers and booleans are rendered with their
    /// JSON representation. `null`, objects and arrays yield `None`.
    pub fn string(&self, doc: &Value) -> Option<String> {
        match self.resolve(doc)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One-shot lookup of a scalar string at `path`
pub fn get_string(doc: &Value, path: &str) -> Result<Option<String>> {
    Ok(FieldPath::parse(path)?.string(doc))
}
