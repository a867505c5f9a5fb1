//! Configuration validation
//!
//! Validates ticketsync configuration for correctness:
//! - Endpoint URLs are set and parse
//! - Every field a direction requires has a path
//! - Password environment variables are set
//! - The server bind address parses

use super::endpoints::Credentials;
use super::sync_config::SyncConfig;
use crate::error::SyncError;
use crate::mapping::{Field, FieldPaths};
use crate::ticket::Direction;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub section: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            section: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref section) = self.section {
            write!(f, "[{}] {}: {}", section, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a ticketsync configuration, collecting every problem
pub fn validate_config(config: &SyncConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "timeout_secs",
            "Timeout must be greater than 0",
        ));
    }

    if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind",
            format!("Invalid bind address: {}", config.server.bind),
        ));
    }

    for direction in [Direction::Inbound, Direction::Outbound] {
        let section = direction.as_str();
        let schema = config.schema(direction);

        for e in validate_fields(config.fields(direction), &schema.required) {
            errors.push(e.in_section(section));
        }
    }

    let desk = &config.inbound.service_desk;
    for e in validate_endpoint("service_desk", &desk.url, &desk.credentials) {
        errors.push(e.in_section("inbound"));
    }
    if desk.service_desk_id.trim().is_empty() {
        errors.push(
            ValidationError::new("service_desk.service_desk_id", "Cannot be empty")
                .in_section("inbound"),
        );
    }

    let incident = &config.outbound.incident;
    for e in validate_endpoint("incident", &incident.url, &incident.credentials) {
        errors.push(e.in_section("outbound"));
    }

    for entry in &config.services.entries {
        if entry.incident.trim().is_empty() || entry.desk.trim().is_empty() {
            errors.push(ValidationError::new(
                "services.entries",
                "Service entries need both an incident name and a desk code",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_fields(fields: &FieldPaths, required: &[Field]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut needed = vec![Field::LocalId];
    needed.extend_from_slice(required);

    for field in needed {
        if fields.path(field).is_none() {
            errors.push(ValidationError::new(
                format!("fields.{}", field),
                "No JSON path configured",
            ));
        }
    }

    if let Err(e) = fields.compile() {
        errors.push(ValidationError::new("fields", e.to_string()));
    }

    errors
}

fn validate_endpoint(name: &str, url: &str, credentials: &Credentials) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if url.trim().is_empty() {
        errors.push(ValidationError::new(
            format!("{}.url", name),
            "URL is not set",
        ));
    } else if reqwest::Url::parse(url).is_err() || !is_http_url(url) {
        errors.push(ValidationError::new(
            format!("{}.url", name),
            format!("Invalid URL: {}", url),
        ));
    }

    if credentials.username.trim().is_empty() {
        errors.push(ValidationError::new(
            format!("{}.credentials.username", name),
            "Username is not set",
        ));
    }

    if credentials.password_env.trim().is_empty() {
        errors.push(ValidationError::new(
            format!("{}.credentials.password_env", name),
            "Password environment variable is not named",
        ));
    } else if std::env::var(&credentials.password_env).is_err() {
        errors.push(ValidationError::new(
            format!("{}.credentials.password_env", name),
            format!(
                "Environment variable {} is not set",
                credentials.password_env
            ),
        ));
    }

    errors
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &SyncConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        SyncError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
