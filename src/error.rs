//! Error types for ticketsync
//!
//! One enum covers every failure mode of the reconciliation pipeline. Errors
//! are never downgraded on the way up: each hop wraps the error in
//! [`SyncError::Context`] and the caller decides what to do with it.

use crate::delivery::retry::{RetryDecision, RetryableError};
use thiserror::Error;

/// Result type alias for ticketsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Comprehensive error type for ticketsync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required logical field has no JSON path configured
    #[error("missing field configuration: {field}")]
    MissingConfig { field: String },

    /// A configured path resolved to nothing in the payload
    #[error("missing value in payload: {field} (path '{path}')")]
    MissingValue { field: String, path: String },

    /// A status value with no transition in the target system
    #[error("unexpected ticket status: {status}")]
    UnmappedStatus { status: String },

    /// The inbound payload is not usable JSON
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The backing store failed while reading
    #[error("store read failed: {0}")]
    StoreRead(String),

    /// The backing store failed while writing
    #[error("store write failed: {0}")]
    StoreWrite(String),

    /// A stored row lacks its counterpart identifier
    #[error("{kind} entry for {local_id} has no counterpart identifier")]
    CorruptRecord { kind: &'static str, local_id: String },

    /// An outbound call to a ticketing system failed
    #[error("{system} call failed: {message}")]
    RemoteCall {
        system: &'static str,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error annotated with the step that produced it
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Build a remote call error
    pub fn remote(system: &'static str, message: impl Into<String>) -> Self {
        SyncError::RemoteCall {
            system,
            message: message.into(),
        }
    }

    /// Wrap this error with the step that produced it
    pub fn context(self, context: impl Into<String>) -> Self {
        SyncError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers peeled off
    pub fn root(&self) -> &SyncError {
        match self {
            SyncError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short machine-friendly name of the root error, used for metrics labels
    pub fn kind(&self) -> &'static str {
        match self.root() {
            SyncError::MissingConfig { .. } => "missing_config",
            SyncError::MissingValue { .. } => "missing_value",
            SyncError::UnmappedStatus { .. } => "unmapped_status",
            SyncError::InvalidPayload(_) => "invalid_payload",
            SyncError::StoreRead(_) => "store_read",
            SyncError::StoreWrite(_) => "store_write",
            SyncError::CorruptRecord { .. } => "corrupt_record",
            SyncError::RemoteCall { .. } => "remote_call",
            SyncError::Config(_) => "config",
            SyncError::Io(_) => "io",
            SyncError::Json(_) => "json",
            SyncError::Yaml(_) => "yaml",
            SyncError::Context { .. } => unreachable!("root() never returns a context layer"),
        }
    }

    /// Whether the event itself is malformed and must be fixed at the source
    pub fn is_mapping_error(&self) -> bool {
        matches!(
            self.root(),
            SyncError::MissingConfig { .. }
                | SyncError::MissingValue { .. }
                | SyncError::UnmappedStatus { .. }
                | SyncError::InvalidPayload(_)
        )
    }
}

/// Attach step context to a fallible result
pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}

impl RetryableError for SyncError {
    fn retry_decision(&self) -> RetryDecision {
        match self.root() {
            // Redelivery can fix these
            SyncError::StoreRead(_) => RetryDecision::Retry,
            SyncError::StoreWrite(_) => RetryDecision::Retry,
            SyncError::RemoteCall { .. } => RetryDecision::Retry,
            SyncError::Io(_) => RetryDecision::Retry,

            // Malformed events and broken state
            SyncError::MissingConfig { .. } => RetryDecision::NoRetry,
            SyncError::MissingValue { .. } => RetryDecision::NoRetry,
            SyncError::UnmappedStatus { .. } => RetryDecision::NoRetry,
            SyncError::InvalidPayload(_) => RetryDecision::NoRetry,
            SyncError::CorruptRecord { .. } => RetryDecision::NoRetry,
            SyncError::Config(_) => RetryDecision::NoRetry,
            SyncError::Json(_) => RetryDecision::NoRetry,
            SyncError::Yaml(_) => RetryDecision::NoRetry,
            SyncError::Context { .. } => RetryDecision::NoRetry,
        }
    }
}
