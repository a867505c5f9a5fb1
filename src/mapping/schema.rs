//! Per-direction schema
//!
//! Everything that differs between the two directions lives here, so the
//! parser, executor and reconciler stay generic.

use super::field::Field;
use super::tables::{self, CodeTable, StatusTable};
use crate::error::Result;
use crate::ticket::Direction;
use serde::{Deserialize, Serialize};

/// A status change to apply on the remote system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Target system's transition id or state code
    pub code: String,

    /// Resolution note, only set on resolving transitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Deployment table of business services
///
/// Pairs are `(incident service name, desk organisation code)`. Each
/// direction falls back to its default when a value is absent or unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTable {
    #[serde(default)]
    pub entries: Vec<ServiceEntry>,

    /// Desk organisation used for unknown incident services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_desk: Option<String>,

    /// Incident service used for unknown desk organisations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_incident: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub incident: String,
    pub desk: String,
}

impl ServiceTable {
    /// The services the original deployment shipped with
    pub fn builtin() -> Self {
        let entry = |incident: &str, desk: &str| ServiceEntry {
            incident: incident.to_string(),
            desk: desk.to_string(),
        };
        Self {
            entries: vec![
                entry("Cyclamen IT Platform Local", "9"),
                entry("I-LEAP", "58"),
                entry("Semaphore", "45"),
            ],
            default_desk: Some("65".to_string()),
            default_incident: Some("AWS ACP".to_string()),
        }
    }

    fn table(&self) -> CodeTable {
        CodeTable::new(
            self.entries
                .iter()
                .map(|e| (e.incident.clone(), e.desk.clone()))
                .collect(),
        )
    }
}

/// How the body of a mirrored comment is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentStyle {
    /// Prefixed with where and under which id it was first posted
    Labelled { origin: String },
    /// Sent as parsed
    Verbatim,
}

/// How the parser picks the effective comment out of a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSource {
    /// Public comment, falling back to the internal work note
    PublicOrInternal,
    /// Single comment prefixed with its author; the mirror's own echoes dropped
    Attributed { ignore_author: Option<String> },
}

/// Direction-specific rules for parsing and executing an event
#[derive(Debug, Clone)]
pub struct Schema {
    pub direction: Direction,

    /// Display name of the system that raised the ticket
    pub origin: String,

    /// Fields that must be present for an event to be accepted
    pub required: Vec<Field>,

    /// Only enforce `required` when the event has no remote id yet
    pub required_for_new_only: bool,

    pub comment_source: CommentSource,
    pub comment_style: CommentStyle,

    statuses: StatusTable,
    initial_states: CodeTable,
    priorities: CodeTable,
    services: CodeTable,
    default_service: Option<String>,
}

impl Schema {
    /// Incident manager → service desk
    pub fn inbound(origin: impl Into<String>, services: &ServiceTable) -> Self {
        let origin = origin.into();
        Self {
            direction: Direction::Inbound,
            origin: origin.clone(),
            required: vec![
                Field::Description,
                Field::Priority,
                Field::Reporter,
                Field::Status,
                Field::Summary,
            ],
            required_for_new_only: true,
            comment_source: CommentSource::PublicOrInternal,
            comment_style: CommentStyle::Labelled { origin },
            statuses: StatusTable::new(
                CodeTable::from_static(tables::DESK_TRANSITIONS),
                tables::DESK_IGNORED_STATUSES,
                tables::DESK_RESOLVED_TRANSITION,
                None,
            ),
            initial_states: CodeTable::default(),
            priorities: CodeTable::from_static(tables::PRIORITIES),
            services: services.table(),
            default_service: services.default_desk.clone(),
        }
    }

    /// Service desk → incident manager
    pub fn outbound(
        origin: impl Into<String>,
        services: &ServiceTable,
        ignore_author: Option<String>,
    ) -> Self {
        Self {
            direction: Direction::Outbound,
            origin: origin.into(),
            required: vec![
                Field::Description,
                Field::Priority,
                Field::Status,
                Field::Summary,
            ],
            required_for_new_only: false,
            comment_source: CommentSource::Attributed { ignore_author },
            comment_style: CommentStyle::Verbatim,
            statuses: StatusTable::new(
                CodeTable::from_static(tables::INCIDENT_STATES),
                tables::INCIDENT_IGNORED_STATUSES,
                tables::INCIDENT_RESOLVED_STATE,
                Some(tables::INCIDENT_RESOLUTION_CODE),
            ),
            initial_states: CodeTable::from_static(tables::INCIDENT_INITIAL_STATES),
            priorities: CodeTable::from_static(tables::PRIORITIES).flipped(),
            services: services.table().flipped(),
            default_service: services.default_incident.clone(),
        }
    }

    /// Translate a parsed priority into the target vocabulary
    pub fn map_priority(&self, raw: &str) -> Option<String> {
        self.priorities.forward(raw).map(str::to_string)
    }

    /// Translate a parsed service, falling back to the default
    pub fn map_service(&self, raw: Option<&str>) -> Option<String> {
        raw.and_then(|s| self.services.forward(s))
            .map(str::to_string)
            .or_else(|| self.default_service.clone())
    }

    /// State to raise a new ticket in when its status implies no transition
    pub fn initial_state(&self, status: Option<&str>) -> Option<String> {
        status
            .and_then(|s| self.initial_states.forward(s))
            .map(str::to_string)
    }

    /// Transition implied by an event's status and resolution
    pub fn transition_for(
        &self,
        status: Option<&str>,
        resolution: Option<&str>,
    ) -> Result<Option<Transition>> {
        let Some(code) = self.statuses.transition_for(status)? else {
            return Ok(None);
        };

        let resolution = if self.statuses.is_resolving(code) {
            resolution
                .filter(|r| !r.trim().is_empty())
                .or(self.statuses.resolution_default())
                .map(str::to_string)
        } else {
            None
        };

        Ok(Some(Transition {
            code: code.to_string(),
            resolution,
        }))
    }
}
