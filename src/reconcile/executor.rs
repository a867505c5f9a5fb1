//! Outbound action executor
//!
//! Shapes an event into the remote system's requests according to the
//! direction's schema, then makes the call. Never retries.

use crate::error::Result;
use crate::integrations::{CreateRequest, FieldUpdate, TicketClient, Transition};
use crate::mapping::{CommentStyle, Schema};
use crate::ticket::TicketEvent;
use std::sync::Arc;
use tracing::debug;

pub struct ActionExecutor {
    schema: Schema,
    client: Arc<dyn TicketClient>,
}

impl ActionExecutor {
    pub fn new(schema: Schema, client: Arc<dyn TicketClient>) -> Self {
        Self { schema, client }
    }

    /// The create call for a ticket seen for the first time
    ///
    /// When the request carries a state, an unmapped status fails here before
    /// anything is sent. Desk requests are raised without one.
    pub fn create_request(&self, event: &TicketEvent) -> Result<CreateRequest> {
        Ok(match &self.schema.comment_style {
            CommentStyle::Labelled { origin } => CreateRequest {
                local_id: event.local_id.clone(),
                summary: event.summary.clone(),
                description: Some(format!(
                    "Incident {} raised on {} by {} with priority {}.\n{}\n{}",
                    event.local_id,
                    origin,
                    event.reporter.as_deref().unwrap_or_default(),
                    event.priority.as_deref().unwrap_or_default(),
                    event.description.as_deref().unwrap_or_default(),
                    event.comment.as_deref().unwrap_or_default(),
                )),
                priority: event.priority.clone(),
                service: event.service.clone(),
                status: None,
                comment: None,
                comment_id: None,
            },
            CommentStyle::Verbatim => CreateRequest {
                local_id: event.local_id.clone(),
                summary: event.summary.clone(),
                description: event.description.clone(),
                priority: event.priority.clone(),
                service: event.service.clone(),
                status: match self.transition(event)? {
                    Some(transition) => Some(transition.code),
                    None => self.schema.initial_state(event.status.as_deref()),
                },
                comment: event.comment.clone(),
                comment_id: event.comment.as_ref().map(|_| event.comment_id.clone()),
            },
        })
    }

    /// Body of the mirrored comment, if the event carries one
    pub fn comment_body(&self, event: &TicketEvent) -> Option<String> {
        let comment = event.comment.as_deref()?;
        Some(match &self.schema.comment_style {
            CommentStyle::Labelled { origin } => format!(
                "Comment added on {} ({}): {}",
                origin, event.comment_id, comment
            ),
            CommentStyle::Verbatim => comment.to_string(),
        })
    }

    pub fn field_update(&self, event: &TicketEvent) -> FieldUpdate {
        FieldUpdate {
            priority: event.priority.clone(),
        }
    }

    /// The transition implied by the event's status
    pub fn transition(&self, event: &TicketEvent) -> Result<Option<Transition>> {
        self.schema
            .transition_for(event.status.as_deref(), event.resolution.as_deref())
    }

    /// Raise the ticket remotely, returning its id
    pub async fn create(&self, event: &TicketEvent) -> Result<String> {
        let request = self.create_request(event)?;
        self.client.create(&request).await
    }

    /// Post the event's comment; `false` if it has none
    pub async fn post_comment(&self, remote_id: &str, event: &TicketEvent) -> Result<bool> {
        let Some(body) = self.comment_body(event) else {
            return Ok(false);
        };
        self.client.add_comment(remote_id, &body).await?;
        Ok(true)
    }

    /// Push mapped field changes; `false` if there are none
    pub async fn update_fields(&self, remote_id: &str, event: &TicketEvent) -> Result<bool> {
        let update = self.field_update(event);
        if update.is_empty() {
            return Ok(false);
        }
        self.client.update_fields(remote_id, &update).await?;
        Ok(true)
    }

    /// Apply the implied transition; `false` if the status implies none
    ///
    /// An unmapped status fails here, after any earlier call has been made.
    pub async fn progress(&self, remote_id: &str, event: &TicketEvent) -> Result<bool> {
        let Some(transition) = self.transition(event)? else {
            debug!(local_id = %event.local_id, status = ?event.status, "No transition implied");
            return Ok(false);
        };
        self.client.transition(remote_id, &transition).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::integrations::DryRunClient;
    use crate::mapping::ServiceTable;

    fn inbound() -> ActionExecutor {
        ActionExecutor::new(
            Schema::inbound("ServiceNow", &ServiceTable::builtin()),
            Arc::new(DryRunClient::new("service_desk")),
        )
    }

    fn outbound() -> ActionExecutor {
        ActionExecutor::new(
            Schema::outbound("Service Desk", &ServiceTable::builtin(), None),
            Arc::new(DryRunClient::new("incident_manager")),
        )
    }

    fn incident() -> TicketEvent {
        let mut event = TicketEvent::new("abc-1")
            .with_summary("system down")
            .with_description("db unreachable")
            .with_priority("P1 - Production system down")
            .with_comment("c-1", "first comment");
        event.reporter = Some("Jo Bloggs".to_string());
        event.service = Some("58".to_string());
        event
    }

    #[test]
    fn test_inbound_create_description() {
        let request = inbound().create_request(&incident()).unwrap();

        assert_eq!(
            request.description.as_deref(),
            Some(
                "Incident abc-1 raised on ServiceNow by Jo Bloggs with priority \
                 P1 - Production system down.\ndb unreachable\nfirst comment"
            )
        );
        assert_eq!(request.service.as_deref(), Some("58"));
        assert_eq!(request.comment, None);
    }

    #[test]
    fn test_inbound_comment_is_labelled() {
        assert_eq!(
            inbound().comment_body(&incident()).as_deref(),
            Some("Comment added on ServiceNow (c-1): first comment")
        );
        assert_eq!(inbound().comment_body(&TicketEvent::new("abc-1")), None);
    }

    #[test]
    fn test_outbound_create_maps_state() {
        let event = TicketEvent::new("DESK-1")
            .with_status("Investigating")
            .with_comment("10001", "Sam looking now");
        let request = outbound().create_request(&event).unwrap();

        assert_eq!(request.status.as_deref(), Some("22"));
        assert_eq!(request.comment.as_deref(), Some("Sam looking now"));
        assert_eq!(request.comment_id.as_deref(), Some("10001"));

        let open = outbound()
            .create_request(&TicketEvent::new("DESK-1").with_status("Open"))
            .unwrap();
        assert_eq!(open.status.as_deref(), Some("2"));
    }

    #[test]
    fn test_create_rejects_unmapped_status() {
        let err = outbound()
            .create_request(&TicketEvent::new("DESK-1").with_status("Weird"))
            .unwrap_err();
        assert!(matches!(err, SyncError::UnmappedStatus { ref status } if status == "Weird"));
    }

    #[test]
    fn test_outbound_comment_verbatim() {
        let event = TicketEvent::new("DESK-1").with_comment("10001", "Sam looking now");
        assert_eq!(
            outbound().comment_body(&event).as_deref(),
            Some("Sam looking now")
        );
    }

    #[tokio::test]
    async fn test_progress_without_transition() {
        let event = TicketEvent::new("abc-1").with_status("1");
        assert!(!inbound().progress("DESK-1", &event).await.unwrap());

        let event = TicketEvent::new("abc-1").with_status("3");
        assert!(inbound().progress("DESK-1", &event).await.unwrap());
    }
}
