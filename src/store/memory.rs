//! In-memory record store, for tests and dry runs

use super::RecordStore;
use crate::error::{Result, SyncError};
use crate::ticket::{RecordKey, StoredRecord};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordKey, StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored row, in key order
    pub fn snapshot(&self) -> Vec<StoredRecord> {
        self.records
            .read()
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| SyncError::StoreRead("record map lock poisoned".to_string()))?;
        Ok(records.get(key).cloned())
    }

    fn query_partition(&self, local_id: &str) -> Result<Vec<StoredRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| SyncError::StoreRead("record map lock poisoned".to_string()))?;

        // Keys order by local_id first, so a partition is one contiguous run
        Ok(records
            .range(RecordKey::new(local_id, "")..)
            .take_while(|(key, _)| key.local_id == local_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn put(&self, record: &StoredRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SyncError::StoreWrite("record map lock poisoned".to_string()))?;
        records.insert(record.key(), record.clone());
        Ok(())
    }
}
