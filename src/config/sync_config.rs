//! ticketsync configuration file handling
//!
//! Loads and manages the ~/.config/ticketsync/config.yaml file.

use super::endpoints::{IncidentEndpoint, ServiceDeskEndpoint};
use crate::error::{Result, SyncError};
use crate::mapping::{Field, FieldMapper, FieldPaths, Schema, ServiceTable};
use crate::store::StoreConfig;
use crate::ticket::Direction;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Incident manager → service desk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundSettings {
    /// Name the incident manager goes by in mirrored descriptions and comments
    #[serde(default = "default_inbound_origin")]
    pub origin: String,

    /// Logical field → JSON path in the incident manager's webhook
    #[serde(default)]
    pub fields: FieldPaths,

    #[serde(default)]
    pub service_desk: ServiceDeskEndpoint,
}

fn default_inbound_origin() -> String {
    "ServiceNow".to_string()
}

impl Default for InboundSettings {
    fn default() -> Self {
        Self {
            origin: default_inbound_origin(),
            fields: FieldPaths::default(),
            service_desk: ServiceDeskEndpoint::default(),
        }
    }
}

/// Service desk → incident manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundSettings {
    #[serde(default = "default_outbound_origin")]
    pub origin: String,

    /// Logical field → JSON path in the service desk's webhook
    #[serde(default)]
    pub fields: FieldPaths,

    /// Comments by this author are the mirror's own echoes and are dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_comment_author: Option<String>,

    #[serde(default)]
    pub incident: IncidentEndpoint,
}

fn default_outbound_origin() -> String {
    "Service Desk".to_string()
}

impl Default for OutboundSettings {
    fn default() -> Self {
        Self {
            origin: default_outbound_origin(),
            fields: FieldPaths::default(),
            ignore_comment_author: Some(default_inbound_origin()),
            incident: IncidentEndpoint::default(),
        }
    }
}

/// Webhook receiver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8086".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// ticketsync configuration
///
/// Represents the complete ~/.config/ticketsync/config.yaml file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-request timeout for outbound calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub inbound: InboundSettings,

    #[serde(default)]
    pub outbound: OutboundSettings,

    #[serde(default = "ServiceTable::builtin")]
    pub services: ServiceTable,

    #[serde(default)]
    pub server: ServerSettings,
}

fn default_timeout_secs() -> u64 {
    5
}

pub(crate) fn config_dir() -> PathBuf {
    // Always use ~/.config for consistency across platforms (macOS, Linux)
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("ticketsync");
    path
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            store: StoreConfig::default(),
            timeout_secs: default_timeout_secs(),
            inbound: InboundSettings::default(),
            outbound: OutboundSettings::default(),
            services: ServiceTable::builtin(),
            server: ServerSettings::default(),
        }
    }

    /// A starting point for `ticketsync init`, with every field path filled in
    pub fn template() -> Self {
        let mut config = Self::new();

        config.inbound.fields = FieldPaths::new()
            .with(Field::LocalId, "internal_identifier")
            .with(Field::RemoteId, "external_identifier")
            .with(Field::Comment, "comments")
            .with(Field::CommentId, "comment_sysid")
            .with(Field::InternalComment, "internal_comment")
            .with(Field::InternalCommentId, "internal_comment_sysid")
            .with(Field::Description, "description")
            .with(Field::Priority, "priority")
            .with(Field::Reporter, "reporter_name")
            .with(Field::Resolution, "resolution")
            .with(Field::Service, "business_service")
            .with(Field::Status, "status")
            .with(Field::Summary, "summary");
        config.inbound.service_desk.url = "https://desk.example.com".to_string();
        config.inbound.service_desk.credentials =
            super::Credentials::new("ticketsync", "TICKETSYNC_DESK_PASSWORD");

        config.outbound.fields = FieldPaths::new()
            .with(Field::LocalId, "issue.key")
            .with(Field::Comment, "comment.body")
            .with(Field::CommentId, "comment.id")
            .with(Field::CommentAuthor, "comment.author.displayName")
            .with(Field::Description, "issue.fields.description")
            .with(Field::Priority, "issue.fields.priority.name")
            .with(Field::Service, "issue.fields.customfield_10002.0.id")
            .with(Field::Status, "issue.fields.status.name")
            .with(Field::Summary, "issue.fields.summary");
        config.outbound.incident.url = "https://incidents.example.com/api/gateway".to_string();
        config.outbound.incident.credentials =
            super::Credentials::new("ticketsync", "TICKETSYNC_INCIDENT_PASSWORD");

        config
    }

    /// Load configuration from the default path (~/.config/ticketsync/config.yaml)
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SyncError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading ticketsync configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            inbound_fields = config.inbound.fields.iter().count(),
            outbound_fields = config.outbound.fields.iter().count(),
            services = config.services.entries.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving ticketsync configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/ticketsync/config.yaml)
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The direction's schema, built from this deployment's tables
    pub fn schema(&self, direction: Direction) -> Schema {
        match direction {
            Direction::Inbound => Schema::inbound(&self.inbound.origin, &self.services),
            Direction::Outbound => Schema::outbound(
                &self.outbound.origin,
                &self.services,
                self.outbound.ignore_comment_author.clone(),
            ),
        }
    }

    pub fn fields(&self, direction: Direction) -> &FieldPaths {
        match direction {
            Direction::Inbound => &self.inbound.fields,
            Direction::Outbound => &self.outbound.fields,
        }
    }

    /// A parser for the direction's webhooks
    pub fn mapper(&self, direction: Direction) -> Result<FieldMapper> {
        FieldMapper::new(self.schema(direction), self.fields(direction))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
