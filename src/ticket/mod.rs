//! Core ticket data structures
//!
//! Defines TicketEvent, StoredRecord, RecordKey and the sync Direction.

mod event;
mod record;

pub use event::{TicketEvent, TICKET_LEVEL_COMMENT_ID};
pub use record::{RecordKey, StoredRecord};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which way an event flows between the two platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Incident manager → service desk
    Inbound,
    /// Service desk → incident manager
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inbound" | "in" => Ok(Direction::Inbound),
            "outbound" | "out" => Ok(Direction::Outbound),
            other => Err(format!(
                "unknown direction '{}', expected inbound or outbound",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::Inbound);
        assert_eq!("Outbound".parse::<Direction>().unwrap(), Direction::Outbound);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::Inbound.to_string(), "inbound");
    }
}
