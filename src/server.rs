//! Webhook receiver
//!
//! Accepts webhook deliveries from both ticketing systems and hands them to
//! the reconciler for their direction.
//!
//! # Routes
//!
//! - `POST /v2/in` - Incident manager event, mirrored to the service desk
//! - `POST /v2/out` - Service desk event, mirrored to the incident manager
//! - `GET /health` - Liveness
//! - `GET /metrics` - Prometheus text exposition
//!
//! A malformed event is answered with 400 so the sender does not redeliver
//! it; any other failure is a 500 and redelivery is expected.

use crate::error::SyncError;
use crate::metrics;
use crate::reconcile::{Action, Reconciler};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bind error: {0}")]
    Bind(String),
}

/// Request body size limit in bytes
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Shared server state
struct AppState {
    inbound: Reconciler,
    outbound: Reconciler,
}

/// HTTP receiver for both directions
pub struct WebhookServer {
    state: Arc<AppState>,
}

impl WebhookServer {
    pub fn new(inbound: Reconciler, outbound: Reconciler) -> Self {
        Self {
            state: Arc::new(AppState { inbound, outbound }),
        }
    }

    fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics_text))
            .route("/v2/in", post(receive_inbound))
            .route("/v2/out", post(receive_outbound))
            .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
            .with_state(state)
    }

    /// Run the server on the given address
    pub async fn run(self, addr: &str) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {}", addr, e)))?;

        tracing::info!(addr = addr, "Webhook receiver listening");
        metrics::set_health_status(true);

        axum::serve(listener, Self::router(self.state))
            .await
            .map_err(ServerError::Io)
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Answer to an accepted webhook
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub action: Action,
    pub external_identifier: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error wrapper for webhook handlers
struct WebhookError(SyncError);

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = if self.0.is_mapping_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_text() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}

async fn receive_inbound(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AcceptedResponse>, WebhookError> {
    receive(&state.inbound, &body).await
}

async fn receive_outbound(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AcceptedResponse>, WebhookError> {
    receive(&state.outbound, &body).await
}

async fn receive(
    reconciler: &Reconciler,
    body: &[u8],
) -> Result<Json<AcceptedResponse>, WebhookError> {
    let outcome = reconciler.reconcile(body).await.map_err(|e| {
        tracing::error!(direction = %reconciler.direction(), "Webhook failed: {}", e);
        WebhookError(e)
    })?;

    Ok(Json(AcceptedResponse {
        action: outcome.action,
        external_identifier: outcome.remote_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::DryRunClient;
    use crate::mapping::{Field, FieldMapper, FieldPaths, Schema, ServiceTable};
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn reconciler(schema: Schema, system: &'static str) -> Reconciler {
        let paths = FieldPaths::new()
            .with(Field::LocalId, "id")
            .with(Field::RemoteId, "remote")
            .with(Field::Status, "status")
            .with(Field::Priority, "priority")
            .with(Field::Summary, "summary")
            .with(Field::Description, "description")
            .with(Field::Reporter, "reporter");
        Reconciler::new(
            FieldMapper::new(schema, &paths).unwrap(),
            Arc::new(MemoryStore::new()),
            Arc::new(DryRunClient::new(system)),
        )
    }

    fn create_test_state() -> Arc<AppState> {
        let services = ServiceTable::builtin();
        Arc::new(AppState {
            inbound: reconciler(Schema::inbound("ServiceNow", &services), "service_desk"),
            outbound: reconciler(
                Schema::outbound("Service Desk", &services, None),
                "incident_manager",
            ),
        })
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = WebhookServer::router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_inbound_create() {
        let app = WebhookServer::router(create_test_state());

        let response = app
            .oneshot(post_json(
                "/v2/in",
                r#"{"id": "abc-1", "status": "1", "priority": "2", "summary": "system down",
                    "description": "db unreachable", "reporter": "Jo"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["action"], "create");
        assert_eq!(json["external_identifier"], "DRY-RUN-abc-1");
    }

    #[tokio::test]
    async fn test_missing_value_is_bad_request() {
        let app = WebhookServer::router(create_test_state());

        let response = app
            .oneshot(post_json("/v2/out", r#"{"id": "DESK-1", "summary": "no status"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("missing value"));
    }

    #[tokio::test]
    async fn test_garbage_is_bad_request() {
        let app = WebhookServer::router(create_test_state());

        let response = app.oneshot(post_json("/v2/in", "<xml/>")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = WebhookServer::router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
