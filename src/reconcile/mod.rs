//! Reconciliation
//!
//! - **action**: the decision table
//! - **executor**: turns an event into remote calls
//! - **reconciler**: lookup, decide, write, call

mod action;
mod executor;
mod reconciler;

pub use action::{decide, Action};
pub use executor::ActionExecutor;
pub use reconciler::{ReconcileOutcome, Reconciler};
