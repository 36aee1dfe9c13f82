use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{IncidentDetails, TimelineEntry};

/// Incident priority, `P1` (critical) through `P4` (low).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// Critical.
    #[default]
    P1,
    /// High.
    P2,
    /// Medium.
    P3,
    /// Low.
    P4,
}

impl Priority {
    /// The display name of the priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string is not one of `P1`..`P4`.
#[derive(Debug, thiserror::Error)]
#[error("unknown priority: '{0}'")]
pub struct UnknownPriorityError(String);

impl FromStr for Priority {
    type Err = UnknownPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            "P4" => Ok(Self::P4),
            other => Err(UnknownPriorityError(other.to_string())),
        }
    }
}

/// The complete durable state of one incident.
///
/// This is the unit of persistence: one record per incident number, written
/// whole and overwritten whole. The serialized field names are camelCase so
/// records produced by earlier versions of the tool load unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentState {
    /// The incident priority.
    pub title_priority: Priority,
    /// The incident number. Doubles as the storage key.
    pub title_incident: String,
    /// Short free-text description of the incident.
    pub title_description: String,
    /// The fixed report field set, including the derived fields.
    pub incident_details: IncidentDetails,
    /// The timeline, in append order. Never re-sorted on save.
    pub timeline_entries: Vec<TimelineEntry>,
}

impl IncidentState {
    /// Creates an empty state for the given incident number.
    #[must_use]
    pub fn new(incident_number: String) -> Self {
        Self {
            title_incident: incident_number,
            ..Self::default()
        }
    }

    /// Returns the entry with the given id, if present.
    #[must_use]
    pub fn entry(&self, id: i64) -> Option<&TimelineEntry> {
        self.timeline_entries.iter().find(|entry| entry.id == id)
    }

    /// Returns a mutable reference to the entry with the given id.
    #[must_use]
    pub fn entry_mut(&mut self, id: i64) -> Option<&mut TimelineEntry> {
        self.timeline_entries
            .iter_mut()
            .find(|entry| entry.id == id)
    }

    /// Removes the entry with the given id.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_entry(&mut self, id: i64) -> bool {
        let before = self.timeline_entries.len();
        self.timeline_entries.retain(|entry| entry.id != id);
        self.timeline_entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::EntryStatus;

    use super::*;

    fn entry(id: i64) -> TimelineEntry {
        TimelineEntry {
            id,
            timestamp: "01-01-2025, 00:00 UTC".to_string(),
            status: EntryStatus::Update,
            notes: String::new(),
        }
    }

    #[test]
    fn priority_round_trips() {
        for priority in [Priority::P1, Priority::P2, Priority::P3, Priority::P4] {
            assert_eq!(priority.as_str().parse::<Priority>().unwrap(), priority);
        }
        assert!("P5".parse::<Priority>().is_err());
    }

    #[test]
    fn state_serializes_with_camel_case_keys() {
        let state = IncidentState::new("INC0012345".to_string());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["titleIncident"], "INC0012345");
        assert_eq!(json["titlePriority"], "P1");
        assert!(json["timelineEntries"].as_array().unwrap().is_empty());
        assert!(json["incidentDetails"].is_object());
    }

    #[test]
    fn remove_entry_reports_whether_anything_was_removed() {
        let mut state = IncidentState::new("INC1".to_string());
        state.timeline_entries.push(entry(1));
        state.timeline_entries.push(entry(2));

        assert!(state.remove_entry(1));
        assert!(!state.remove_entry(1));
        assert_eq!(state.timeline_entries.len(), 1);
        assert!(state.entry(2).is_some());
    }
}
