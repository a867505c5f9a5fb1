//! Record storage
//!
//! A [`RecordStore`] holds one [`StoredRecord`] per `(local_id, comment_id)`.
//! Writes are upserts (last write wins) and rows are never deleted.
//! [`DedupStore`] layers the partial/exact lookups of the reconciler on top.

mod dedup;
mod memory;
mod sqlite;

pub use dedup::DedupStore;
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreConfig};

use crate::error::Result;
use crate::ticket::{RecordKey, StoredRecord};

/// Keyed persistence for dedup records
///
/// Implementations are synchronous; the reconciler calls them from async code
/// but each call is a short local operation.
pub trait RecordStore: Send + Sync {
    /// Point lookup by composite key
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>>;

    /// Every row for a ticket, ordered by ascending `comment_id`
    fn query_partition(&self, local_id: &str) -> Result<Vec<StoredRecord>>;

    /// Insert or overwrite the row at the record's key
    fn put(&self, record: &StoredRecord) -> Result<()>;
}
