//! Event reconciliation
//!
//! Looks an event up in the dedup store, decides what it means for the
//! mirrored ticket, and carries that out. One reconciler serves one
//! direction; both directions share this code and differ only in their
//! [`Schema`](crate::mapping::Schema).

use super::action::{decide, Action};
use super::executor::ActionExecutor;
use crate::config::SyncConfig;
use crate::error::{Result, ResultExt};
use crate::integrations::{IncidentClient, ServiceDeskClient, TicketClient};
use crate::mapping::FieldMapper;
use crate::metrics;
use crate::store::{DedupStore, RecordStore, SqliteStore};
use crate::ticket::{Direction, StoredRecord, TicketEvent};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a reconciliation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub action: Action,
    pub local_id: String,
    pub comment_id: String,

    /// Identifier of the mirrored ticket, if one exists by now
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,

    /// Whether a status transition was applied
    pub transitioned: bool,
}

impl ReconcileOutcome {
    fn new(action: Action, event: &TicketEvent, transitioned: bool) -> Self {
        Self {
            action,
            local_id: event.local_id.clone(),
            comment_id: event.comment_id.clone(),
            remote_id: event.remote_id.clone(),
            transitioned,
        }
    }
}

/// Mirrors events from one system into the other
pub struct Reconciler {
    mapper: FieldMapper,
    store: DedupStore,
    executor: ActionExecutor,
    direction: Direction,
}

impl Reconciler {
    pub fn new(
        mapper: FieldMapper,
        store: Arc<dyn RecordStore>,
        client: Arc<dyn TicketClient>,
    ) -> Self {
        let schema = mapper.schema().clone();
        let direction = schema.direction;
        Self {
            mapper,
            store: DedupStore::new(store),
            executor: ActionExecutor::new(schema, client),
            direction,
        }
    }

    /// Build a reconciler with the SQLite store and the real client for `direction`
    pub fn from_config(config: &SyncConfig, direction: Direction) -> Result<Self> {
        let mapper = config.mapper(direction)?;
        let store = SqliteStore::open(&config.store, direction)?;
        let client: Arc<dyn TicketClient> = match direction {
            Direction::Inbound => Arc::new(ServiceDeskClient::new(
                config.inbound.service_desk.clone(),
                config.timeout(),
            )?),
            Direction::Outbound => Arc::new(IncidentClient::new(
                config.outbound.incident.clone(),
                config.timeout(),
            )?),
        };
        Ok(Self::new(mapper, Arc::new(store), client))
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn store(&self) -> &DedupStore {
        &self.store
    }

    /// Parse a raw webhook body and reconcile it
    pub async fn reconcile(&self, raw: &[u8]) -> Result<ReconcileOutcome> {
        let event = match self.mapper.parse(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(direction = %self.direction, "Rejected webhook: {}", e);
                metrics::record_error(self.direction.as_str(), e.kind());
                return Err(e);
            }
        };
        self.reconcile_event(event).await
    }

    /// Reconcile an already parsed event
    pub async fn reconcile_event(&self, mut event: TicketEvent) -> Result<ReconcileOutcome> {
        event.normalize();

        match self.run(event).await {
            Ok(outcome) => {
                metrics::record_action(self.direction.as_str(), outcome.action.as_str());
                info!(
                    direction = %self.direction,
                    local_id = %outcome.local_id,
                    comment_id = %outcome.comment_id,
                    action = %outcome.action,
                    remote_id = ?outcome.remote_id,
                    "Reconciled event"
                );
                Ok(outcome)
            }
            Err(e) => {
                metrics::record_error(self.direction.as_str(), e.kind());
                Err(e)
            }
        }
    }

    async fn run(&self, mut event: TicketEvent) -> Result<ReconcileOutcome> {
        let partial = self
            .store
            .check_partial(&event.local_id)
            .context("could not check partial item")?;
        event.remote_id = partial.clone();

        let exact = self
            .store
            .check_exact(&event.key())
            .context("could not check exact item")?;

        let action = decide(partial.is_some(), exact.is_some());
        debug!(
            local_id = %event.local_id,
            comment_id = %event.comment_id,
            partial = partial.is_some(),
            exact = exact.is_some(),
            action = %action,
            "Looked up event"
        );

        match action {
            Action::Create => self.create(event).await,
            Action::UpdateWithComment => self.update(event).await,
            _ => {
                if partial.is_none() {
                    warn!(
                        local_id = %event.local_id,
                        comment_id = %event.comment_id,
                        "Exact entry found without a partial entry; store may be inconsistent"
                    );
                    event.remote_id = exact;
                }
                self.progress(event).await
            }
        }
    }

    async fn create(&self, mut event: TicketEvent) -> Result<ReconcileOutcome> {
        let remote_id = self
            .executor
            .create(&event)
            .await
            .context("could not create ticket")?;
        event.remote_id = Some(remote_id.clone());

        self.store
            .write(&StoredRecord::new(event.clone(), remote_id))
            .map_err(|e| {
                // The remote ticket now exists without a row pointing at it
                error!(local_id = %event.local_id, remote_id = ?event.remote_id, "Created ticket but could not record it: {}", e);
                e
            })
            .context("could not put DB item")?;

        Ok(ReconcileOutcome::new(Action::Create, &event, false))
    }

    async fn update(&self, event: TicketEvent) -> Result<ReconcileOutcome> {
        let remote_id = event.remote_id.clone().unwrap_or_default();

        self.store
            .write(&StoredRecord::new(event.clone(), remote_id.as_str()))
            .context("could not update DB item")?;

        self.executor
            .post_comment(&remote_id, &event)
            .await
            .context("could not update ticket")?;
        self.executor
            .update_fields(&remote_id, &event)
            .await
            .context("could not update ticket")?;
        let transitioned = self
            .executor
            .progress(&remote_id, &event)
            .await
            .context("could not update ticket")?;

        Ok(ReconcileOutcome::new(
            Action::UpdateWithComment,
            &event,
            transitioned,
        ))
    }

    async fn progress(&self, mut event: TicketEvent) -> Result<ReconcileOutcome> {
        let remote_id = event.remote_id.clone().unwrap_or_default();

        self.store
            .write(&StoredRecord::new(event.clone(), remote_id.as_str()))
            .context("could not update DB item")?;

        // Already mirrored; only the status may have moved
        event.comment = None;

        let transitioned = self
            .executor
            .progress(&remote_id, &event)
            .await
            .context("could not update ticket")?;

        let action = if transitioned {
            Action::ProgressOnly
        } else {
            Action::NoOp
        };
        Ok(ReconcileOutcome::new(action, &event, transitioned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::integrations::DryRunClient;
    use crate::mapping::{Field, FieldPaths, Schema, ServiceTable};
    use crate::store::MemoryStore;
    use crate::ticket::RecordKey;

    fn reconciler(store: Arc<MemoryStore>) -> Reconciler {
        let paths = FieldPaths::new()
            .with(Field::LocalId, "id")
            .with(Field::CommentId, "comment_id")
            .with(Field::Comment, "comment")
            .with(Field::Status, "status")
            .with(Field::Priority, "priority")
            .with(Field::Summary, "summary")
            .with(Field::Description, "description");
        let schema = Schema::outbound("Service Desk", &ServiceTable::builtin(), None);
        let mapper = FieldMapper::new(schema, &paths).unwrap();
        Reconciler::new(mapper, store, Arc::new(DryRunClient::new("incident_manager")))
    }

    const NEW_TICKET: &str = r#"{
        "id": "DESK-1", "status": "Investigating", "priority": "P3 - General request",
        "summary": "slow pages", "description": "pages take 10s"
    }"#;

    #[tokio::test]
    async fn test_create_then_replay() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store.clone());

        let first = reconciler.reconcile(NEW_TICKET.as_bytes()).await.unwrap();
        assert_eq!(first.action, Action::Create);
        assert_eq!(first.remote_id.as_deref(), Some("DRY-RUN-DESK-1"));

        let replay = reconciler.reconcile(NEW_TICKET.as_bytes()).await.unwrap();
        assert_eq!(replay.action, Action::ProgressOnly);
        assert!(replay.transitioned);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_new_comment_updates_linked_ticket() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store.clone());
        reconciler.reconcile(NEW_TICKET.as_bytes()).await.unwrap();

        let event = TicketEvent::new("DESK-1")
            .with_comment("10001", "Sam: looking now")
            .with_status("Open");
        let outcome = reconciler.reconcile_event(event).await.unwrap();

        assert_eq!(outcome.action, Action::UpdateWithComment);
        assert_eq!(outcome.remote_id.as_deref(), Some("DRY-RUN-DESK-1"));
        assert!(!outcome.transitioned);

        let row = store.get(&RecordKey::new("DESK-1", "10001")).unwrap().unwrap();
        assert_eq!(row.remote_id, "DRY-RUN-DESK-1");
    }

    #[tokio::test]
    async fn test_unmapped_status_blocks_create() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store.clone());
        let payload = NEW_TICKET.replace("Investigating", "Waiting for customer");

        let err = reconciler.reconcile(payload.as_bytes()).await.unwrap_err();

        assert!(err.to_string().starts_with("could not create ticket"));
        assert!(matches!(
            err.root(),
            SyncError::UnmappedStatus { ref status } if status == "Waiting for customer"
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_is_mapping_error() {
        let reconciler = reconciler(Arc::new(MemoryStore::new()));
        let err = reconciler.reconcile(b"not json").await.unwrap_err();
        assert!(err.is_mapping_error());
        assert!(matches!(err.root(), SyncError::InvalidPayload(_)));
    }
}
