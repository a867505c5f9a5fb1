//! Configuration system
//!
//! Loads ~/.config/ticketsync/config.yaml with support for:
//! - Per-direction field paths
//! - Service desk and incident manager endpoints
//! - The business service table
//! - Store and webhook receiver settings

mod endpoints;
mod sync_config;
pub mod validation;

pub use endpoints::{Credentials, IncidentEndpoint, ServiceDeskEndpoint};
pub use sync_config::{InboundSettings, OutboundSettings, ServerSettings, SyncConfig};
pub use validation::{validate_config, validate_config_result, ValidationError};

pub(crate) use sync_config::config_dir;
