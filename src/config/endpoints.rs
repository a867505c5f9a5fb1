//! Connection settings for the two ticketing platforms

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Basic auth credentials; the password is read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,

    /// Name of the environment variable holding the password
    pub password_env: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password_env: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_env: password_env.into(),
        }
    }

    /// Resolve `(username, password)`
    pub fn resolve(&self) -> Result<(String, String)> {
        if self.username.trim().is_empty() {
            return Err(SyncError::Config("username is not set".to_string()));
        }
        if self.password_env.trim().is_empty() {
            return Err(SyncError::Config("password_env is not set".to_string()));
        }
        let password = std::env::var(&self.password_env).map_err(|_| {
            SyncError::Config(format!(
                "environment variable {} is not set",
                self.password_env
            ))
        })?;
        Ok((self.username.clone(), password))
    }
}

/// Service desk REST API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDeskEndpoint {
    /// Base URL, e.g. `https://desk.example.com`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default = "default_service_desk_id")]
    pub service_desk_id: String,

    #[serde(default = "default_request_type_id")]
    pub request_type_id: String,

    /// Custom field holding the organisation list
    #[serde(default = "default_organisation_field")]
    pub organisation_field: String,

    /// Custom field holding the originating incident id
    #[serde(default = "default_origin_field")]
    pub origin_field: String,
}

fn default_service_desk_id() -> String {
    "1".to_string()
}

fn default_request_type_id() -> String {
    "14".to_string()
}

fn default_organisation_field() -> String {
    "customfield_10002".to_string()
}

fn default_origin_field() -> String {
    "customfield_11824".to_string()
}

impl Default for ServiceDeskEndpoint {
    fn default() -> Self {
        Self {
            url: String::new(),
            credentials: Credentials::default(),
            service_desk_id: default_service_desk_id(),
            request_type_id: default_request_type_id(),
            organisation_field: default_organisation_field(),
            origin_field: default_origin_field(),
        }
    }
}

/// Incident manager gateway settings
///
/// The gateway takes every call on one URL and dispatches on `messageid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentEndpoint {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default = "default_create_message_id")]
    pub create_message_id: String,

    #[serde(default = "default_update_message_id")]
    pub update_message_id: String,
}

fn default_create_message_id() -> String {
    "HO_SIAM_IN_REST_INC_POST_JSON_ACP_Incident_Create".to_string()
}

fn default_update_message_id() -> String {
    "HO_SIAM_IN_REST_INC_UPDATE_JSON_ACP_Incident_Update".to_string()
}

impl Default for IncidentEndpoint {
    fn default() -> Self {
        Self {
            url: String::new(),
            credentials: Credentials::default(),
            create_message_id: default_create_message_id(),
            update_message_id: default_update_message_id(),
        }
    }
}
