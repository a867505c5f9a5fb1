//! Service desk adapter
//!
//! Raises customer requests through the service desk API and updates them
//! through the platform's issue API.

use super::{
    check_status, http_client, transport_error, CallTimer, CreateRequest, FieldUpdate,
    TicketClient, Transition,
};
use crate::config::ServiceDeskEndpoint;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

const SYSTEM: &str = "service_desk";

/// Service desk API client
pub struct ServiceDeskClient {
    client: Client,
    endpoint: ServiceDeskEndpoint,
    base_url: String,
    username: String,
    password: String,
}

/// Response to a request creation
#[derive(Debug, Clone, Deserialize)]
struct CreatedRequest {
    #[serde(rename = "issueKey", default)]
    issue_key: String,
}

#[derive(Debug, Clone, Serialize)]
struct CommentCreate<'a> {
    body: &'a str,
}

impl ServiceDeskClient {
    /// Create a client, resolving the password from the environment
    pub fn new(endpoint: ServiceDeskEndpoint, timeout: Duration) -> Result<Self> {
        let (username, password) = endpoint.credentials.resolve()?;
        Self::with_credentials(endpoint, username, password, timeout)
    }

    pub fn with_credentials(
        endpoint: ServiceDeskEndpoint,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if endpoint.url.trim().is_empty() {
            return Err(SyncError::Config("service desk URL is not set".to_string()));
        }

        Ok(Self {
            client: http_client(SYSTEM, timeout)?,
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            endpoint,
            username: username.into(),
            password: password.into(),
        })
    }

    /// JSON body of a request creation
    fn create_body(&self, request: &CreateRequest) -> Result<Value> {
        let mut fields = Map::new();

        if let Some(ref summary) = request.summary {
            fields.insert("summary".to_string(), json!(summary));
        }
        if let Some(ref description) = request.description {
            fields.insert("description".to_string(), json!(description));
        }
        if let Some(ref priority) = request.priority {
            fields.insert("priority".to_string(), json!({ "name": priority }));
        }
        if let Some(ref service) = request.service {
            // The organisation field takes a list of numeric ids
            let organisation: i64 = service.trim().parse().map_err(|_| {
                SyncError::InvalidPayload(format!("organisation code is not numeric: {}", service))
            })?;
            fields.insert(
                self.endpoint.organisation_field.clone(),
                json!([organisation]),
            );
        }
        fields.insert(
            self.endpoint.origin_field.clone(),
            json!(request.local_id),
        );

        Ok(json!({
            "serviceDeskId": self.endpoint.service_desk_id,
            "requestTypeId": self.endpoint.request_type_id,
            "requestFieldValues": fields,
        }))
    }
}

fn transition_body(transition: &Transition) -> Value {
    let mut body = json!({ "transition": { "id": transition.code } });
    if let Some(ref resolution) = transition.resolution {
        body["update"] = json!({ "comment": [ { "add": { "body": resolution } } ] });
    }
    body
}

#[async_trait]
impl TicketClient for ServiceDeskClient {
    fn system(&self) -> &'static str {
        SYSTEM
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        let url = format!("{}/rest/servicedeskapi/request", self.base_url);
        let body = self.create_body(request)?;

        info!(local_id = %request.local_id, "Creating service desk request");

        let _timer = CallTimer::start(SYSTEM, "create");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SYSTEM, "create", e))?;
        let response = check_status(SYSTEM, "create", response).await?;

        let created: CreatedRequest = response.json().await.map_err(|e| {
            SyncError::remote(SYSTEM, format!("could not decode create response: {}", e))
        })?;

        if created.issue_key.trim().is_empty() {
            return Err(SyncError::remote(
                SYSTEM,
                "create response carried no issue key",
            ));
        }

        debug!(local_id = %request.local_id, issue_key = %created.issue_key, "Service desk request created");
        Ok(created.issue_key)
    }

    async fn add_comment(&self, remote_id: &str, body: &str) -> Result<()> {
        let url = format!("{}/rest/api/2/issue/{}/comment", self.base_url, remote_id);

        info!(issue_key = %remote_id, "Adding comment to service desk issue");

        let _timer = CallTimer::start(SYSTEM, "add_comment");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&CommentCreate { body })
            .send()
            .await
            .map_err(|e| transport_error(SYSTEM, "add_comment", e))?;
        check_status(SYSTEM, "add_comment", response).await?;

        Ok(())
    }

    async fn update_fields(&self, remote_id: &str, update: &FieldUpdate) -> Result<()> {
        let Some(ref priority) = update.priority else {
            return Ok(());
        };

        let url = format!("{}/rest/api/2/issue/{}", self.base_url, remote_id);
        let body = json!({
            "update": {
                "priority": [ { "set": { "name": priority } } ]
            }
        });

        info!(issue_key = %remote_id, priority = %priority, "Updating service desk priority");

        let _timer = CallTimer::start(SYSTEM, "update_fields");
        let response = self
            .client
            .put(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SYSTEM, "update_fields", e))?;
        check_status(SYSTEM, "update_fields", response).await?;

        Ok(())
    }

    async fn transition(&self, remote_id: &str, transition: &Transition) -> Result<()> {
        let url = format!("{}/rest/api/2/issue/{}/transitions", self.base_url, remote_id);

        info!(issue_key = %remote_id, transition_id = %transition.code, "Transitioning service desk issue");

        let _timer = CallTimer::start(SYSTEM, "transition");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&transition_body(transition))
            .send()
            .await
            .map_err(|e| transport_error(SYSTEM, "transition", e))?;
        check_status(SYSTEM, "transition", response).await?;

        Ok(())
    }
}
