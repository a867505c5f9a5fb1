//! External Integrations
//!
//! Clients for the two ticketing platforms a [`Reconciler`](crate::reconcile::Reconciler)
//! mirrors between.
//!
//! # Built-in Integrations
//!
//! - **Service desk**: REST API, one route per operation
//! - **Incident manager**: single JSON gateway, dispatching on `messageid`
//! - **Dry run**: logs the calls it would make
//!
//! Every call is made once; retrying is left to redelivery.

pub mod dry_run;
pub mod incident;
pub mod service_desk;

pub use dry_run::DryRunClient;
pub use incident::IncidentClient;
pub use service_desk::ServiceDeskClient;

pub use crate::mapping::Transition;

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A new ticket to raise on the remote system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Identifier of the ticket in the originating system
    pub local_id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Already in the remote system's vocabulary
    pub priority: Option<String>,
    /// Already in the remote system's vocabulary
    pub service: Option<String>,
    pub status: Option<String>,
    pub comment: Option<String>,
    pub comment_id: Option<String>,
}

/// Field changes to apply to an existing ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub priority: Option<String>,
}

impl FieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none()
    }
}

/// Outbound operations on a ticketing system
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Short system name, used in errors and metrics
    fn system(&self) -> &'static str;

    /// Raise a ticket, returning its identifier
    async fn create(&self, request: &CreateRequest) -> Result<String>;

    async fn add_comment(&self, remote_id: &str, body: &str) -> Result<()>;

    async fn update_fields(&self, remote_id: &str, update: &FieldUpdate) -> Result<()>;

    async fn transition(&self, remote_id: &str, transition: &Transition) -> Result<()>;
}

/// Build an HTTP client with a fixed per-request timeout
pub(crate) fn http_client(system: &'static str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SyncError::remote(system, format!("could not build HTTP client: {}", e)))
}

/// Turn a non-success response into a `RemoteCall` error
pub(crate) async fn check_status(
    system: &'static str,
    operation: &str,
    response: Response,
) -> Result<Response> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(response),
        status => {
            let error_body = response.text().await.unwrap_or_default();
            Err(SyncError::remote(
                system,
                format!("{} failed: HTTP {}: {}", operation, status, error_body),
            ))
        }
    }
}

/// Transport failure (including timeouts) as a `RemoteCall` error
pub(crate) fn transport_error(system: &'static str, operation: &str, e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::remote(system, format!("{} timed out", operation))
    } else {
        SyncError::remote(system, format!("{} failed: {}", operation, e))
    }
}

/// Times one outbound call into the remote call histogram
pub(crate) struct CallTimer {
    system: &'static str,
    operation: &'static str,
    started: Instant,
}

impl CallTimer {
    pub(crate) fn start(system: &'static str, operation: &'static str) -> Self {
        Self {
            system,
            operation,
            started: Instant::now(),
        }
    }
}

impl Drop for CallTimer {
    fn drop(&mut self) {
        crate::metrics::record_remote_call(
            self.system,
            self.operation,
            self.started.elapsed().as_secs_f64(),
        );
    }
}
