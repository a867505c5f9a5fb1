//! Logical ticket fields and where to find them in a payload

use crate::error::{Result, SyncError};
use fieldpath::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A logical field the mapper knows how to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    LocalId,
    RemoteId,
    Comment,
    CommentId,
    InternalComment,
    InternalCommentId,
    CommentAuthor,
    Description,
    Priority,
    Reporter,
    Resolution,
    Service,
    Status,
    Summary,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::LocalId,
        Field::RemoteId,
        Field::Comment,
        Field::CommentId,
        Field::InternalComment,
        Field::InternalCommentId,
        Field::CommentAuthor,
        Field::Description,
        Field::Priority,
        Field::Reporter,
        Field::Resolution,
        Field::Service,
        Field::Status,
        Field::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::LocalId => "local_id",
            Field::RemoteId => "remote_id",
            Field::Comment => "comment",
            Field::CommentId => "comment_id",
            Field::InternalComment => "internal_comment",
            Field::InternalCommentId => "internal_comment_id",
            Field::CommentAuthor => "comment_author",
            Field::Description => "description",
            Field::Priority => "priority",
            Field::Reporter => "reporter",
            Field::Resolution => "resolution",
            Field::Service => "service",
            Field::Status => "status",
            Field::Summary => "summary",
        }
    }

    /// Prose fields are passed on as written; ids and codes are trimmed
    pub fn is_free_text(&self) -> bool {
        matches!(
            self,
            Field::Comment | Field::InternalComment | Field::Description | Field::Resolution
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment-specific mapping from logical field to JSON path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPaths(BTreeMap<Field, String>);

impl FieldPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, path: impl Into<String>) -> Self {
        self.0.insert(field, path.into());
        self
    }

    pub fn set(&mut self, field: Field, path: impl Into<String>) {
        self.0.insert(field, path.into());
    }

    /// The configured path, if any
    pub fn path(&self, field: Field) -> Option<&str> {
        self.0
            .get(&field)
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, p)| (*f, p.as_str()))
    }

    /// Parse every configured path, reporting the first malformed one
    pub fn compile(&self) -> Result<CompiledPaths> {
        let mut compiled = BTreeMap::new();
        for (field, raw) in self.iter() {
            if raw.trim().is_empty() {
                continue;
            }
            let path = FieldPath::parse(raw).map_err(|e| {
                SyncError::Config(format!("invalid path for field {}: {}", field, e))
            })?;
            compiled.insert(field, path);
        }
        Ok(CompiledPaths(compiled))
    }
}

/// Field paths parsed once and reused for every payload
#[derive(Debug, Clone, Default)]
pub struct CompiledPaths(BTreeMap<Field, FieldPath>);

impl CompiledPaths {
    pub fn is_configured(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    /// Non-blank scalar at the field's path; `None` if unconfigured or absent
    pub fn lookup(&self, doc: &Value, field: Field) -> Option<String> {
        let value = self.0.get(&field).and_then(|path| path.string(doc))?;
        if value.trim().is_empty() {
            return None;
        }
        if field.is_free_text() {
            Some(value)
        } else {
            Some(value.trim().to_string())
        }
    }

    /// Check a field is configured and its path resolves to a non-null value
    ///
    /// An empty string still counts as present.
    pub fn check_present(&self, doc: &Value, field: Field) -> Result<()> {
        let path = self.0.get(&field).ok_or_else(|| SyncError::MissingConfig {
            field: field.to_string(),
        })?;

        match path.resolve(doc) {
            Some(value) if !value.is_null() => Ok(()),
            _ => Err(SyncError::MissingValue {
                field: field.to_string(),
                path: path.to_string(),
            }),
        }
    }

    /// Non-empty value of a field that must be both configured and present
    pub fn require(&self, doc: &Value, field: Field) -> Result<String> {
        let path = self.0.get(&field).ok_or_else(|| SyncError::MissingConfig {
            field: field.to_string(),
        })?;

        path.string(doc)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SyncError::MissingValue {
                field: field.to_string(),
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_paths_yaml_shape() {
        let yaml = "local_id: result.sys_id\nsummary: result.short_description\n";
        let paths: FieldPaths = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(paths.path(Field::LocalId), Some("result.sys_id"));
        assert_eq!(paths.path(Field::Summary), Some("result.short_description"));
        assert_eq!(paths.path(Field::Status), None);
    }

    #[test]
    fn test_require_distinguishes_config_from_value() {
        let paths = FieldPaths::new()
            .with(Field::LocalId, "ticket.id")
            .with(Field::Summary, "ticket.title")
            .compile()
            .unwrap();
        let doc = json!({"ticket": {"id": "INC9", "title": "   "}});

        assert_eq!(paths.require(&doc, Field::LocalId).unwrap(), "INC9");
        assert!(matches!(
            paths.require(&doc, Field::Summary),
            Err(SyncError::MissingValue { .. })
        ));
        assert!(matches!(
            paths.require(&doc, Field::Status),
            Err(SyncError::MissingConfig { .. })
        ));
    }

    #[test]
    fn test_check_present_accepts_empty_string() {
        let paths = FieldPaths::new()
            .with(Field::Description, "d")
            .compile()
            .unwrap();

        assert!(paths.check_present(&json!({"d": ""}), Field::Description).is_ok());
        assert!(matches!(
            paths.check_present(&json!({"d": null}), Field::Description),
            Err(SyncError::MissingValue { .. })
        ));
        assert!(matches!(
            paths.check_present(&json!({}), Field::Description),
            Err(SyncError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_malformed_path() {
        let paths = FieldPaths::new().with(Field::LocalId, "ticket..id");
        assert!(matches!(paths.compile(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_lookup_trims_codes_and_drops_blank() {
        let paths = FieldPaths::new()
            .with(Field::Comment, "c")
            .with(Field::Status, "s")
            .compile()
            .unwrap();
        assert_eq!(paths.lookup(&json!({"s": " 3 "}), Field::Status).as_deref(), Some("3"));
        assert_eq!(paths.lookup(&json!({"c": " hi "}), Field::Comment).as_deref(), Some(" hi "));
        assert_eq!(paths.lookup(&json!({"c": "  "}), Field::Comment), None);
        assert_eq!(paths.lookup(&json!({"c": ""}), Field::Comment), None);
        assert_eq!(paths.lookup(&json!({}), Field::Reporter), None);
    }
}
