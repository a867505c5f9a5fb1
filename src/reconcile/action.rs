//! The reconciliation decision table

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the reconciler did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Raise a new mirrored ticket
    Create,
    /// Mirror a new comment onto a known ticket
    UpdateWithComment,
    /// Known comment; only the status may move
    ProgressOnly,
    /// Known comment and no status change to apply
    NoOp,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::UpdateWithComment => "update_with_comment",
            Action::ProgressOnly => "progress_only",
            Action::NoOp => "no_op",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick an action from the two lookups
///
/// `partial`: some row exists for the ticket. `exact`: a row exists for this
/// very comment. An exact hit without a partial one should be impossible and
/// is treated as progress-only; the caller logs it.
pub fn decide(partial: bool, exact: bool) -> Action {
    match (partial, exact) {
        (false, false) => Action::Create,
        (true, false) => Action::UpdateWithComment,
        (_, true) => Action::ProgressOnly,
    }
}
