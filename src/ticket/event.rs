//! Normalized ticket event
//!
//! The unit of work for the reconciler. Every inbound webhook, whichever
//! system it came from, is parsed into a `TicketEvent` before any lookup.

use super::RecordKey;
use serde::{Deserialize, Serialize};

/// Comment id used when an event carries no comment at all
pub const TICKET_LEVEL_COMMENT_ID: &str = "0";

/// A new ticket, a new comment, or a status change from the originating system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEvent {
    /// Identifier in the system that originated the event
    pub local_id: String,

    /// Identifier in the mirrored system, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,

    /// Sort key distinguishing comments on the same ticket ("0" = ticket level)
    pub comment_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Who raised the ticket in the originating system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,

    /// Resolution note sent along with a resolving transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl TicketEvent {
    /// Create a ticket-level event
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            comment_id: TICKET_LEVEL_COMMENT_ID.to_string(),
            ..Default::default()
        }
    }

    /// Set the comment and its id
    pub fn with_comment(mut self, comment_id: impl Into<String>, body: impl Into<String>) -> Self {
        self.comment_id = comment_id.into();
        self.comment = Some(body.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    /// Default an empty comment id to the ticket-level id
    ///
    /// Must run before any store operation, since the comment id is half of
    /// the record key.
    pub fn normalize(&mut self) {
        if self.comment_id.trim().is_empty() {
            self.comment_id = TICKET_LEVEL_COMMENT_ID.to_string();
        }
        if self.comment.as_deref().is_some_and(|c| c.trim().is_empty()) {
            self.comment = None;
        }
    }

    /// Composite key of the row this event maps to
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.local_id, &self.comment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_is_ticket_level() {
        let event = TicketEvent::new("INC001");
        assert_eq!(event.comment_id, "0");
        assert_eq!(event.comment, None);
        assert_eq!(event.key(), RecordKey::new("INC001", "0"));
    }

    #[test]
    fn test_normalize_defaults_comment_id() {
        let mut event = TicketEvent {
            local_id: "abc-1".to_string(),
            comment_id: String::new(),
            comment: Some("  ".to_string()),
            ..Default::default()
        };
        event.normalize();

        assert_eq!(event.comment_id, TICKET_LEVEL_COMMENT_ID);
        assert_eq!(event.comment, None);
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let event = TicketEvent::new("abc-1").with_summary("system down");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"summary\":\"system down\""));
        assert!(!json.contains("remote_id"));
        assert!(!json.contains("priority"));

        let back: TicketEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
