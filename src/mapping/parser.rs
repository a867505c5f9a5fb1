//! Raw payload → `TicketEvent`

use super::field::{CompiledPaths, Field, FieldPaths};
use super::schema::{CommentSource, Schema};
use crate::error::{Result, SyncError};
use crate::ticket::{TicketEvent, TICKET_LEVEL_COMMENT_ID};
use serde_json::Value;
use tracing::debug;

/// Parses webhook payloads of one direction
///
/// Pure: the output depends only on the payload bytes, the configured field
/// paths and the schema's tables.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    schema: Schema,
    paths: CompiledPaths,
}

impl FieldMapper {
    pub fn new(schema: Schema, paths: &FieldPaths) -> Result<Self> {
        Ok(Self {
            schema,
            paths: paths.compile()?,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parse raw webhook bytes
    pub fn parse(&self, raw: &[u8]) -> Result<TicketEvent> {
        let doc: Value =
            serde_json::from_slice(raw).map_err(|e| SyncError::InvalidPayload(e.to_string()))?;
        self.parse_value(&doc)
    }

    /// Parse an already decoded payload
    pub fn parse_value(&self, doc: &Value) -> Result<TicketEvent> {
        if !doc.is_object() {
            return Err(SyncError::InvalidPayload(
                "payload is not a JSON object".to_string(),
            ));
        }

        let local_id = self.paths.require(doc, Field::LocalId)?;
        let remote_id = self.paths.lookup(doc, Field::RemoteId);

        if !self.schema.required_for_new_only || remote_id.is_none() {
            for field in &self.schema.required {
                self.paths.check_present(doc, *field)?;
            }
        }

        let (comment_id, comment) = self.effective_comment(doc);

        let priority = self.paths.lookup(doc, Field::Priority).and_then(|raw| {
            let mapped = self.schema.map_priority(&raw);
            if mapped.is_none() {
                debug!(local_id = %local_id, priority = %raw, "Ignoring unrecognized priority");
            }
            mapped
        });

        let service = self
            .schema
            .map_service(self.paths.lookup(doc, Field::Service).as_deref());

        let mut event = TicketEvent {
            local_id,
            remote_id,
            comment_id,
            comment,
            status: self.paths.lookup(doc, Field::Status),
            priority,
            summary: self.paths.lookup(doc, Field::Summary),
            description: self.paths.lookup(doc, Field::Description),
            service,
            reporter: self.paths.lookup(doc, Field::Reporter),
            resolution: self.paths.lookup(doc, Field::Resolution),
        };
        event.normalize();

        debug!(
            direction = %self.schema.direction,
            local_id = %event.local_id,
            comment_id = %event.comment_id,
            status = ?event.status,
            "Parsed ticket event"
        );

        Ok(event)
    }

    fn effective_comment(&self, doc: &Value) -> (String, Option<String>) {
        let comment_id = self.paths.lookup(doc, Field::CommentId);
        let comment = self.paths.lookup(doc, Field::Comment);

        match &self.schema.comment_source {
            CommentSource::PublicOrInternal => {
                let internal_id = self.paths.lookup(doc, Field::InternalCommentId);
                match (comment, internal_id) {
                    (None, Some(id)) => (id, self.paths.lookup(doc, Field::InternalComment)),
                    (comment, _) => (
                        comment_id.unwrap_or_else(|| TICKET_LEVEL_COMMENT_ID.to_string()),
                        comment,
                    ),
                }
            }
            CommentSource::Attributed { ignore_author } => {
                let author = self.paths.lookup(doc, Field::CommentAuthor);

                if author.is_some() && author.as_deref() == ignore_author.as_deref() {
                    debug!(author = ?author, "Dropping comment echoed by the mirror");
                    return (TICKET_LEVEL_COMMENT_ID.to_string(), None);
                }

                let comment = comment.map(|body| match author {
                    Some(author) => format!("{} {}", author, body),
                    None => body,
                });
                (
                    comment_id.unwrap_or_else(|| TICKET_LEVEL_COMMENT_ID.to_string()),
                    comment,
                )
            }
        }
    }
}
