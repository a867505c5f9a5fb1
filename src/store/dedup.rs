//! Partial and exact lookups over a record store

use super::RecordStore;
use crate::error::{Result, SyncError};
use crate::ticket::{RecordKey, StoredRecord};
use std::sync::Arc;
use tracing::error;

/// The reconciler's view of a [`RecordStore`]
///
/// A *partial* hit means the ticket has been mirrored before; an *exact* hit
/// means this very comment has been seen before.
#[derive(Clone)]
pub struct DedupStore {
    inner: Arc<dyn RecordStore>,
}

impl DedupStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self { inner }
    }

    /// Remote id of the ticket, if any row exists for `local_id`
    ///
    /// Taken from the row with the lowest `comment_id`.
    pub fn check_partial(&self, local_id: &str) -> Result<Option<String>> {
        let rows = self.inner.query_partition(local_id)?;
        match rows.first() {
            None => Ok(None),
            Some(record) => linked("partial", record).map(Some),
        }
    }

    /// Remote id stored at exactly this key, if any
    pub fn check_exact(&self, key: &RecordKey) -> Result<Option<String>> {
        match self.inner.get(key)? {
            None => Ok(None),
            Some(record) => linked("exact", &record).map(Some),
        }
    }

    /// Upsert a record
    pub fn write(&self, record: &StoredRecord) -> Result<()> {
        self.inner.put(record)
    }

    /// Every row for a ticket
    pub fn partition(&self, local_id: &str) -> Result<Vec<StoredRecord>> {
        self.inner.query_partition(local_id)
    }
}

fn linked(kind: &'static str, record: &StoredRecord) -> Result<String> {
    if record.is_linked() {
        return Ok(record.remote_id.clone());
    }

    error!(
        kind,
        local_id = %record.event.local_id,
        comment_id = %record.event.comment_id,
        "Stored entry has no counterpart identifier"
    );
    Err(SyncError::CorruptRecord {
        kind,
        local_id: record.event.local_id.clone(),
    })
}
