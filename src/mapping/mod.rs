//! Field mapping
//!
//! Turns raw webhook payloads into [`TicketEvent`](crate::ticket::TicketEvent)s
//! and translates status, priority and service values between the two
//! platforms' vocabularies.

mod field;
mod parser;
mod schema;
pub mod tables;

pub use field::{CompiledPaths, Field, FieldPaths};
pub use parser::FieldMapper;
pub use schema::{CommentSource, CommentStyle, Schema, ServiceEntry, ServiceTable, Transition};
pub use tables::{CodeTable, StatusTable};
