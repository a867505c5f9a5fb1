//! Persisted dedup records

use super::TicketEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite key addressing one stored row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Partition: the ticket in the originating system
    pub local_id: String,

    /// Sort key: the comment on that ticket
    pub comment_id: String,
}

impl RecordKey {
    pub fn new(local_id: impl Into<String>, comment_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            comment_id: comment_id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.local_id, self.comment_id)
    }
}

/// One row per `(local_id, comment_id)`: the latest snapshot of that event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The event as last processed
    pub event: TicketEvent,

    /// Identifier of the mirrored ticket; empty means the row is corrupt
    pub remote_id: String,

    /// Last write timestamp (RFC3339 format)
    pub updated_at: String,
}

impl StoredRecord {
    /// Snapshot an event that has a resolved remote id
    pub fn new(event: TicketEvent, remote_id: impl Into<String>) -> Self {
        Self {
            event,
            remote_id: remote_id.into(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn key(&self) -> RecordKey {
        self.event.key()
    }

    /// Whether the row carries its counterpart identifier
    pub fn is_linked(&self) -> bool {
        !self.remote_id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_display_and_order() {
        let a = RecordKey::new("INC1", "0");
        let b = RecordKey::new("INC1", "1");
        assert_eq!(a.to_string(), "INC1#0");
        assert!(a < b);
    }

    #[test]
    fn test_record_snapshot() {
        let event = TicketEvent::new("INC1").with_remote_id("DESK-7");
        let record = StoredRecord::new(event, "DESK-7");

        assert_eq!(record.remote_id, "DESK-7");
        assert!(record.is_linked());
        assert_eq!(record.key(), RecordKey::new("INC1", "0"));
        assert!(chrono::DateTime::parse_from_rfc3339(&record.updated_at).is_ok());
    }

    #[test]
    fn test_unlinked_record() {
        let record = StoredRecord::new(TicketEvent::new("INC1"), "");
        assert!(!record.is_linked());
    }
}
