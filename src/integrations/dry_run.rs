//! A client that only logs what it would send

use super::{CreateRequest, FieldUpdate, TicketClient, Transition};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Stands in for a real client under `--dry-run`
///
/// Creates return `DRY-RUN-<local_id>` so the rest of the flow can proceed.
#[derive(Debug, Clone)]
pub struct DryRunClient {
    system: &'static str,
}

impl DryRunClient {
    pub fn new(system: &'static str) -> Self {
        Self { system }
    }
}

#[async_trait]
impl TicketClient for DryRunClient {
    fn system(&self) -> &'static str {
        self.system
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        info!(
            system = self.system,
            local_id = %request.local_id,
            summary = ?request.summary,
            priority = ?request.priority,
            "[dry-run] would create ticket"
        );
        Ok(format!("DRY-RUN-{}", request.local_id))
    }

    async fn add_comment(&self, remote_id: &str, body: &str) -> Result<()> {
        info!(system = self.system, remote_id, body, "[dry-run] would add comment");
        Ok(())
    }

    async fn update_fields(&self, remote_id: &str, update: &FieldUpdate) -> Result<()> {
        info!(system = self.system, remote_id, priority = ?update.priority, "[dry-run] would update fields");
        Ok(())
    }

    async fn transition(&self, remote_id: &str, transition: &Transition) -> Result<()> {
        info!(
            system = self.system,
            remote_id,
            code = %transition.code,
            resolution = ?transition.resolution,
            "[dry-run] would transition"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_echoes_local_id() {
        let client = DryRunClient::new("service_desk");
        let request = CreateRequest {
            local_id: "abc-1".to_string(),
            ..Default::default()
        };
        assert_eq!(client.create(&request).await.unwrap(), "DRY-RUN-abc-1");
        assert_eq!(client.system(), "service_desk");
    }
}
