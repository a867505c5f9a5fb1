//! Reconciler scenarios
//!
//! Store and client share one journal so the order of writes and remote
//! calls can be asserted across both.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use ticketsync::integrations::{CreateRequest, FieldUpdate, TicketClient, Transition};
use ticketsync::mapping::{Field, FieldMapper, FieldPaths, Schema, ServiceTable};
use ticketsync::reconcile::{Action, Reconciler};
use ticketsync::store::{MemoryStore, RecordStore};
use ticketsync::ticket::{RecordKey, StoredRecord, TicketEvent};
use ticketsync::{Result, SyncError};

type Journal = Arc<Mutex<Vec<String>>>;

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Memory store that journals every write
///
/// With `hide_partitions` set, partition queries come back empty while point
/// lookups still hit, as in a store whose index has fallen behind.
struct JournalStore {
    inner: MemoryStore,
    journal: Journal,
    hide_partitions: bool,
}

impl RecordStore for JournalStore {
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>> {
        self.inner.get(key)
    }

    fn query_partition(&self, local_id: &str) -> Result<Vec<StoredRecord>> {
        if self.hide_partitions {
            return Ok(Vec::new());
        }
        self.inner.query_partition(local_id)
    }

    fn put(&self, record: &StoredRecord) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("put {}", record.key()));
        self.inner.put(record)
    }
}

/// Client that journals every call and can be told to fail one operation
struct FakeClient {
    journal: Journal,
    fail: Option<&'static str>,
}

impl FakeClient {
    fn call(&self, operation: &'static str, entry: String) -> Result<()> {
        self.journal.lock().unwrap().push(entry);
        if self.fail == Some(operation) {
            return Err(SyncError::remote("fake", format!("{} failed: HTTP 503", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl TicketClient for FakeClient {
    fn system(&self) -> &'static str {
        "fake"
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        self.call("create", format!("create {}", request.local_id))?;
        Ok(format!("DESK-{}", request.local_id))
    }

    async fn add_comment(&self, remote_id: &str, body: &str) -> Result<()> {
        self.call("add_comment", format!("comment {} {}", remote_id, body))
    }

    async fn update_fields(&self, remote_id: &str, update: &FieldUpdate) -> Result<()> {
        self.call(
            "update_fields",
            format!("update {} {}", remote_id, update.priority.as_deref().unwrap_or("")),
        )
    }

    async fn transition(&self, remote_id: &str, transition: &Transition) -> Result<()> {
        self.call("transition", format!("transition {} {}", remote_id, transition.code))
    }
}

struct Harness {
    reconciler: Reconciler,
    store: Arc<JournalStore>,
    journal: Journal,
}

impl Harness {
    fn new() -> Self {
        Self::failing(None)
    }

    fn failing(fail: Option<&'static str>) -> Self {
        Self::build(fail, false)
    }

    fn without_partitions() -> Self {
        Self::build(None, true)
    }

    fn build(fail: Option<&'static str>, hide_partitions: bool) -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(JournalStore {
            inner: MemoryStore::new(),
            journal: journal.clone(),
            hide_partitions,
        });
        let client = Arc::new(FakeClient {
            journal: journal.clone(),
            fail,
        });

        let paths = FieldPaths::new()
            .with(Field::LocalId, "result.sys_id")
            .with(Field::RemoteId, "result.correlation_id")
            .with(Field::Comment, "result.comments")
            .with(Field::CommentId, "result.comment_sysid")
            .with(Field::Description, "result.description")
            .with(Field::Priority, "result.priority")
            .with(Field::Reporter, "result.caller")
            .with(Field::Status, "result.state")
            .with(Field::Summary, "result.short_description");
        let mapper = FieldMapper::new(
            Schema::inbound("ServiceNow", &ServiceTable::builtin()),
            &paths,
        )
        .unwrap();

        Self {
            reconciler: Reconciler::new(mapper, store.clone(), client),
            store,
            journal,
        }
    }

    fn seed(&self, local_id: &str, comment_id: &str, remote_id: &str) {
        let event = TicketEvent::new(local_id).with_comment(comment_id, "seeded");
        self.store
            .inner
            .put(&StoredRecord::new(event, remote_id))
            .unwrap();
    }

    fn journal(&self) -> Vec<String> {
        entries(&self.journal)
    }
}

fn new_incident() -> &'static str {
    r#"{"result": {
        "sys_id": "abc-1", "state": "1", "priority": "1", "caller": "Jo Bloggs",
        "short_description": "system down", "description": "db unreachable"
    }}"#
}

#[tokio::test]
async fn test_empty_store_creates_then_writes() {
    let harness = Harness::new();

    let outcome = harness
        .reconciler
        .reconcile(new_incident().as_bytes())
        .await
        .unwrap();

    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.comment_id, "0");
    assert_eq!(outcome.remote_id.as_deref(), Some("DESK-abc-1"));
    assert_eq!(harness.journal(), vec!["create abc-1", "put abc-1#0"]);

    let row = harness
        .store
        .get(&RecordKey::new("abc-1", "0"))
        .unwrap()
        .unwrap();
    assert_eq!(row.remote_id, "DESK-abc-1");
}

#[tokio::test]
async fn test_blank_comment_id_defaults_to_ticket_level() {
    let harness = Harness::new();
    let event = TicketEvent {
        local_id: "abc-1".to_string(),
        comment_id: String::new(),
        status: Some("open".to_string()),
        summary: Some("system down".to_string()),
        ..Default::default()
    };

    let outcome = harness.reconciler.reconcile_event(event).await.unwrap();

    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.comment_id, "0");
    let journal = harness.journal();
    assert_eq!(journal.iter().filter(|e| e.starts_with("create")).count(), 1);
    assert_eq!(journal.iter().filter(|e| e.starts_with("put")).count(), 1);
}

#[tokio::test]
async fn test_replay_never_creates_twice() {
    let harness = Harness::new();

    harness
        .reconciler
        .reconcile(new_incident().as_bytes())
        .await
        .unwrap();
    let replay = harness
        .reconciler
        .reconcile(new_incident().as_bytes())
        .await
        .unwrap();

    // State "1" implies no transition
    assert_eq!(replay.action, Action::NoOp);
    assert_eq!(replay.remote_id.as_deref(), Some("DESK-abc-1"));
    let creates = harness
        .journal()
        .iter()
        .filter(|e| e.starts_with("create"))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_new_comment_writes_before_posting() {
    let harness = Harness::new();
    harness.seed("abc-1", "0", "DESK-7");

    let event = TicketEvent::new("abc-1").with_comment("1", "first comment");
    let outcome = harness.reconciler.reconcile_event(event).await.unwrap();

    assert_eq!(outcome.action, Action::UpdateWithComment);
    assert_eq!(outcome.remote_id.as_deref(), Some("DESK-7"));
    assert_eq!(
        harness.journal(),
        vec![
            "put abc-1#1",
            "comment DESK-7 Comment added on ServiceNow (1): first comment",
        ]
    );
}

#[tokio::test]
async fn test_update_order_is_comment_priority_transition() {
    let harness = Harness::new();
    harness.seed("abc-1", "0", "DESK-7");

    let event = TicketEvent::new("abc-1")
        .with_comment("2", "fixed now")
        .with_priority("P2 - Production system impaired")
        .with_status("3");
    let outcome = harness.reconciler.reconcile_event(event).await.unwrap();

    assert!(outcome.transitioned);
    assert_eq!(
        harness.journal(),
        vec![
            "put abc-1#2",
            "comment DESK-7 Comment added on ServiceNow (2): fixed now",
            "update DESK-7 P2 - Production system impaired",
            "transition DESK-7 121",
        ]
    );
}

#[tokio::test]
async fn test_seen_comment_only_progresses() {
    let harness = Harness::new();
    harness.seed("abc-1", "0", "DESK-7");
    harness.seed("abc-1", "1", "DESK-7");

    let event = TicketEvent::new("abc-1")
        .with_comment("1", "first comment")
        .with_status("10100");
    let outcome = harness.reconciler.reconcile_event(event).await.unwrap();

    assert_eq!(outcome.action, Action::ProgressOnly);
    assert_eq!(
        harness.journal(),
        vec!["put abc-1#1", "transition DESK-7 11"]
    );

    // The row keeps the comment as received
    let row = harness
        .store
        .get(&RecordKey::new("abc-1", "1"))
        .unwrap()
        .unwrap();
    assert_eq!(row.event.comment.as_deref(), Some("first comment"));
}

#[tokio::test]
async fn test_missing_required_value_touches_nothing() {
    let harness = Harness::new();
    let payload = r#"{"result": {"sys_id": "abc-1", "state": "1", "priority": "1"}}"#;

    let err = harness
        .reconciler
        .reconcile(payload.as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), SyncError::MissingValue { .. }));
    assert!(harness.journal().is_empty());
    assert!(harness.store.inner.is_empty());
}

#[tokio::test]
async fn test_linked_payload_skips_required_check() {
    let harness = Harness::new();
    harness.seed("abc-1", "0", "DESK-7");
    let payload = r#"{"result": {
        "sys_id": "abc-1", "correlation_id": "DESK-7",
        "comment_sysid": "4", "comments": "still looking"
    }}"#;

    let outcome = harness
        .reconciler
        .reconcile(payload.as_bytes())
        .await
        .unwrap();
    assert_eq!(outcome.action, Action::UpdateWithComment);
}

#[tokio::test]
async fn test_unmapped_status_after_comment() {
    let harness = Harness::new();
    harness.seed("abc-1", "0", "DESK-7");

    let event = TicketEvent::new("abc-1")
        .with_comment("1", "first comment")
        .with_status("7");
    let err = harness.reconciler.reconcile_event(event).await.unwrap_err();

    assert!(matches!(err.root(), SyncError::UnmappedStatus { .. }));
    assert!(err.to_string().starts_with("could not update ticket"));
    let journal = harness.journal();
    assert_eq!(journal.len(), 2);
    assert!(journal[1].starts_with("comment DESK-7"));
    assert!(!journal.iter().any(|e| e.starts_with("transition")));
}

#[tokio::test]
async fn test_exact_row_without_partition_only_progresses() {
    let harness = Harness::without_partitions();
    harness.seed("abc-1", "1", "DESK-7");

    let event = TicketEvent::new("abc-1")
        .with_comment("1", "first comment")
        .with_status("3");
    let outcome = harness.reconciler.reconcile_event(event).await.unwrap();

    assert_eq!(outcome.action, Action::ProgressOnly);
    assert_eq!(outcome.remote_id.as_deref(), Some("DESK-7"));
    assert!(outcome.transitioned);
    assert_eq!(
        harness.journal(),
        vec!["put abc-1#1", "transition DESK-7 121"]
    );
}

#[tokio::test]
async fn test_create_failure_writes_nothing() {
    let harness = Harness::failing(Some("create"));

    let err = harness
        .reconciler
        .reconcile(new_incident().as_bytes())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("could not create ticket"));
    assert!(matches!(err.root(), SyncError::RemoteCall { .. }));
    assert!(harness.store.inner.is_empty());
}

#[tokio::test]
async fn test_comment_failure_keeps_the_write() {
    let harness = Harness::failing(Some("add_comment"));
    harness.seed("abc-1", "0", "DESK-7");

    let event = TicketEvent::new("abc-1").with_comment("1", "first comment");
    let err = harness.reconciler.reconcile_event(event).await.unwrap_err();

    assert!(err.to_string().starts_with("could not update ticket"));
    assert!(harness
        .store
        .get(&RecordKey::new("abc-1", "1"))
        .unwrap()
        .is_some());

    // Redelivery now sees the comment as mirrored
    let event = TicketEvent::new("abc-1").with_comment("1", "first comment");
    let outcome = harness.reconciler.reconcile_event(event).await.unwrap();
    assert_eq!(outcome.action, Action::NoOp);
}

#[tokio::test]
async fn test_unlinked_row_is_corrupt() {
    let harness = Harness::new();
    harness.seed("abc-1", "0", "");

    let err = harness
        .reconciler
        .reconcile_event(TicketEvent::new("abc-1"))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("could not check partial item"));
    assert!(matches!(err.root(), SyncError::CorruptRecord { kind: "partial", .. }));
    assert!(harness.journal().is_empty());
}

#[tokio::test]
async fn test_parsed_event_survives_reencoding() {
    let harness = Harness::new();
    harness
        .reconciler
        .reconcile(new_incident().as_bytes())
        .await
        .unwrap();

    let row = harness
        .store
        .get(&RecordKey::new("abc-1", "0"))
        .unwrap()
        .unwrap();
    let json = serde_json::to_string(&row.event).unwrap();
    let back: TicketEvent = serde_json::from_str(&json).unwrap();

    assert_eq!(back, row.event);
    assert_eq!(back.summary.as_deref(), Some("system down"));
    assert_eq!(back.priority.as_deref(), Some("P1 - Production system down"));
    assert_eq!(back.reporter.as_deref(), Some("Jo Bloggs"));
}
