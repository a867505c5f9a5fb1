//! Incident manager adapter
//!
//! The gateway takes every call as a POST to one URL. The envelope's
//! `messageid` selects the operation and either `external_identifier` (on
//! create) or `internal_identifier` (on update) addresses the incident.

use super::{
    check_status, http_client, transport_error, CallTimer, CreateRequest, FieldUpdate,
    TicketClient, Transition,
};
use crate::config::IncidentEndpoint;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const SYSTEM: &str = "incident_manager";

/// Incident manager gateway client
pub struct IncidentClient {
    client: Client,
    endpoint: IncidentEndpoint,
    username: String,
    password: String,
}

#[derive(Debug, Clone, Serialize)]
struct Envelope<'a> {
    messageid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_identifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    internal_identifier: Option<&'a str>,
    payload: IncidentPayload,
}

/// Incident fields as the gateway names them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
struct IncidentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    business_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment_sysid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayResponse {
    result: GatewayResult,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayResult {
    #[serde(default)]
    internal_identifier: String,
}

impl IncidentClient {
    /// Create a client, resolving the password from the environment
    pub fn new(endpoint: IncidentEndpoint, timeout: Duration) -> Result<Self> {
        let (username, password) = endpoint.credentials.resolve()?;
        Self::with_credentials(endpoint, username, password, timeout)
    }

    pub fn with_credentials(
        endpoint: IncidentEndpoint,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if endpoint.url.trim().is_empty() {
            return Err(SyncError::Config(
                "incident manager URL is not set".to_string(),
            ));
        }

        Ok(Self {
            client: http_client(SYSTEM, timeout)?,
            endpoint,
            username: username.into(),
            password: password.into(),
        })
    }

    fn update_envelope<'a>(&'a self, remote_id: &'a str, payload: IncidentPayload) -> Envelope<'a> {
        Envelope {
            messageid: &self.endpoint.update_message_id,
            external_identifier: None,
            internal_identifier: Some(remote_id),
            payload,
        }
    }

    async fn send(&self, operation: &'static str, envelope: &Envelope<'_>) -> Result<reqwest::Response> {
        let _timer = CallTimer::start(SYSTEM, operation);
        let response = self
            .client
            .post(&self.endpoint.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(envelope)
            .send()
            .await
            .map_err(|e| transport_error(SYSTEM, operation, e))?;
        check_status(SYSTEM, operation, response).await
    }
}

#[async_trait]
impl TicketClient for IncidentClient {
    fn system(&self) -> &'static str {
        SYSTEM
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        let envelope = Envelope {
            messageid: &self.endpoint.create_message_id,
            external_identifier: Some(&request.local_id),
            internal_identifier: None,
            payload: IncidentPayload {
                title: request.summary.clone(),
                description: request.description.clone(),
                priority: request.priority.clone(),
                business_service: request.service.clone(),
                state: request.status.clone(),
                comments: request.comment.clone(),
                comment_sysid: request.comment_id.clone(),
                resolution_code: None,
            },
        };

        info!(local_id = %request.local_id, "Creating incident");

        let response = self.send("create", &envelope).await?;
        let body: GatewayResponse = response.json().await.map_err(|e| {
            SyncError::remote(SYSTEM, format!("could not decode create response: {}", e))
        })?;

        let id = body.result.internal_identifier;
        if id.trim().is_empty() {
            return Err(SyncError::remote(
                SYSTEM,
                "create response carried no internal identifier",
            ));
        }

        debug!(local_id = %request.local_id, internal_identifier = %id, "Incident created");
        Ok(id)
    }

    async fn add_comment(&self, remote_id: &str, body: &str) -> Result<()> {
        info!(internal_identifier = %remote_id, "Adding comment to incident");

        let payload = IncidentPayload {
            comments: Some(body.to_string()),
            ..Default::default()
        };
        self.send("add_comment", &self.update_envelope(remote_id, payload))
            .await?;
        Ok(())
    }

    async fn update_fields(&self, remote_id: &str, update: &FieldUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        info!(internal_identifier = %remote_id, "Updating incident fields");

        let payload = IncidentPayload {
            priority: update.priority.clone(),
            ..Default::default()
        };
        self.send("update_fields", &self.update_envelope(remote_id, payload))
            .await?;
        Ok(())
    }

    async fn transition(&self, remote_id: &str, transition: &Transition) -> Result<()> {
        info!(internal_identifier = %remote_id, state = %transition.code, "Moving incident state");

        let payload = IncidentPayload {
            state: Some(transition.code.clone()),
            resolution_code: transition.resolution.clone(),
            ..Default::default()
        };
        self.send("transition", &self.update_envelope(remote_id, payload))
            .await?;
        Ok(())
    }
}
