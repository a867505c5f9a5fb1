//! ticketsync - Keeps tickets mirrored between a service desk and an incident manager
//!
//! Each system posts webhooks when a ticket is raised, commented on, or moves
//! status. ticketsync turns every webhook into exactly the right call on the
//! other system, using a small store of what has already been mirrored so
//! that redelivered webhooks never raise duplicate tickets.
//!
//! # Architecture
//!
//! - **mapping**: Field paths, per-direction schema and code tables, payload parsing
//! - **ticket**: Normalized events and stored records
//! - **store**: Record storage (SQLite, in-memory) and dedup lookups
//! - **reconcile**: Decision table and reconciler
//! - **integrations**: Service desk and incident manager clients
//! - **delivery**: Batch delivery with redelivery on transient failure
//! - **server**: Webhook receiver
//! - **config**: YAML configuration and validation

// Core modules
pub mod config;
pub mod error;
pub mod mapping;
pub mod store;
pub mod ticket;

// Pipeline
pub mod delivery;
pub mod integrations;
pub mod reconcile;

// Ambient
pub mod logging;
pub mod metrics;
pub mod server;

// Re-exports
pub use error::{Result, SyncError};
