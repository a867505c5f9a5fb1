//! Code tables translating values between the two platforms' vocabularies

use crate::error::{Result, SyncError};

/// Incident priority code ↔ service desk priority label
///
/// Codes 4 and 5 share a label; reverse lookups resolve to the first pair.
pub const PRIORITIES: &[(&str, &str)] = &[
    ("1", "P1 - Production system down"),
    ("2", "P2 - Production system impaired"),
    ("3", "P3 - Non production system impaired"),
    ("4", "P4 - General request"),
    ("5", "P4 - General request"),
];

/// Incident state code → service desk transition id
pub const DESK_TRANSITIONS: &[(&str, &str)] = &[
    ("10100", "11"), // investigating
    ("3", "121"),    // resolved
];

/// Incident states that imply no transition on the desk
pub const DESK_IGNORED_STATUSES: &[&str] = &["", "1"];

/// Desk transition id that resolves a request
pub const DESK_RESOLVED_TRANSITION: &str = "121";

/// Service desk status label → incident state code
pub const INCIDENT_STATES: &[(&str, &str)] = &[
    ("Investigating", "22"),
    ("Identified", "22"),
    ("Monitoring", "22"),
    ("Escalated", "22"),
    ("Resolved", "6"),
    ("Closed", "6"),
];

/// Desk statuses that imply no state change on the incident
pub const INCIDENT_IGNORED_STATUSES: &[&str] = &["", "Open"];

/// Desk status label → incident state set when the incident is raised
pub const INCIDENT_INITIAL_STATES: &[(&str, &str)] = &[("Open", "2")];

/// Incident state code that resolves an incident
pub const INCIDENT_RESOLVED_STATE: &str = "6";

/// Resolution code the incident manager requires when resolving
pub const INCIDENT_RESOLUTION_CODE: &str = "done";

/// A bidirectional lookup table of `(left, right)` pairs
///
/// Matching is exact after trimming, except that ASCII case is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    pairs: Vec<(String, String)>,
}

impl CodeTable {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn from_static(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(l, r)| (l.to_string(), r.to_string()))
                .collect(),
        )
    }

    /// Left → right
    pub fn forward(&self, left: &str) -> Option<&str> {
        let left = left.trim();
        self.pairs
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(left))
            .map(|(_, r)| r.as_str())
    }

    /// Right → left, first match wins
    pub fn reverse(&self, right: &str) -> Option<&str> {
        let right = right.trim();
        self.pairs
            .iter()
            .find(|(_, r)| r.eq_ignore_ascii_case(right))
            .map(|(l, _)| l.as_str())
    }

    /// The same table read the other way round
    pub fn flipped(&self) -> Self {
        Self::new(
            self.pairs
                .iter()
                .map(|(l, r)| (r.clone(), l.clone()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Closed set of status values that trigger a transition in the target system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTable {
    transitions: CodeTable,
    ignored: Vec<String>,
    resolved_code: String,
    resolution_default: Option<String>,
}

impl StatusTable {
    pub fn new(
        transitions: CodeTable,
        ignored: &[&str],
        resolved_code: impl Into<String>,
        resolution_default: Option<&str>,
    ) -> Self {
        Self {
            transitions,
            ignored: ignored.iter().map(|s| s.to_string()).collect(),
            resolved_code: resolved_code.into(),
            resolution_default: resolution_default.map(str::to_string),
        }
    }

    /// Transition code implied by a status value
    ///
    /// `Ok(None)` means the status implies no transition (blank or an initial
    /// state). A value outside the table is an error rather than a silent skip,
    /// since skipping would leave the mirrored ticket unsynchronized.
    pub fn transition_for(&self, status: Option<&str>) -> Result<Option<&str>> {
        let status = status.map(str::trim).unwrap_or("");

        if self
            .ignored
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(status))
        {
            return Ok(None);
        }

        self.transitions
            .forward(status)
            .map(Some)
            .ok_or_else(|| SyncError::UnmappedStatus {
                status: status.to_string(),
            })
    }

    /// Whether a transition code resolves the ticket
    pub fn is_resolving(&self, code: &str) -> bool {
        self.resolved_code == code
    }

    /// Resolution note used when the event carries none
    pub fn resolution_default(&self) -> Option<&str> {
        self.resolution_default.as_deref()
    }
}
