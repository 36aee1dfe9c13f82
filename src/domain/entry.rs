use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The status tag attached to a timeline entry.
///
/// The status decides which derivation rule, if any, consumes the entry when
/// the derived report fields are recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// The first report of the incident.
    #[serde(rename = "Initial Report")]
    InitialReport,
    /// A progress note.
    Update,
    /// An action taken on the call (pageouts land here).
    Action,
    /// A communication sent out while the incident is open.
    Comms,
    /// The closing communication; feeds the Resolution field.
    #[serde(rename = "Resolved Comms")]
    ResolvedComms,
    /// The incident was caused by a change.
    #[serde(rename = "Caused by Change")]
    CausedByChange,
    /// The incident was resolved by a change.
    #[serde(rename = "Resolved by Change")]
    ResolvedByChange,
    /// A concern raised during the incident.
    Concern,
    /// A recommendation for follow-up.
    Recommendation,
    /// A published Condition/Action/Need report.
    #[serde(rename = "CAN Report")]
    CanReport,
}

impl EntryStatus {
    /// All statuses, in the order they are offered to users.
    pub const ALL: [Self; 10] = [
        Self::InitialReport,
        Self::Update,
        Self::Action,
        Self::Comms,
        Self::ResolvedComms,
        Self::CausedByChange,
        Self::ResolvedByChange,
        Self::Concern,
        Self::Recommendation,
        Self::CanReport,
    ];

    /// The display name of the status.
    ///
    /// This is also the serialized form, both in stored records and in the
    /// plain-text state dump.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialReport => "Initial Report",
            Self::Update => "Update",
            Self::Action => "Action",
            Self::Comms => "Comms",
            Self::ResolvedComms => "Resolved Comms",
            Self::CausedByChange => "Caused by Change",
            Self::ResolvedByChange => "Resolved by Change",
            Self::Concern => "Concern",
            Self::Recommendation => "Recommendation",
            Self::CanReport => "CAN Report",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string is not one of the recognized status names.
#[derive(Debug, thiserror::Error)]
#[error("unknown timeline status: '{0}'")]
pub struct UnknownStatusError(String);

impl FromStr for EntryStatus {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatusError(s.to_string()))
    }
}

/// One timestamped note in an incident's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Creation-time-derived identity, unique within an incident and
    /// monotonically increasing (milliseconds since the Unix epoch).
    pub id: i64,
    /// Display timestamp in the fixed `dd-MM-yyyy, HH:mm UTC` format.
    ///
    /// Opaque once stored; never parsed back for derivation.
    pub timestamp: String,
    /// The status tag.
    pub status: EntryStatus,
    /// Free-form multi-line notes. The only field derivation rules read.
    pub notes: String,
}

impl TimelineEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(status: EntryStatus, notes: String) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis(),
            timestamp: display_timestamp(&now),
            status,
            notes,
        }
    }
}

/// Formats a time in the fixed display format used throughout the timeline.
#[must_use]
pub fn display_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%d-%m-%Y, %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    #[test_case(EntryStatus::InitialReport, "Initial Report")]
    #[test_case(EntryStatus::ResolvedComms, "Resolved Comms")]
    #[test_case(EntryStatus::CausedByChange, "Caused by Change")]
    #[test_case(EntryStatus::CanReport, "CAN Report")]
    fn status_display_round_trips(status: EntryStatus, text: &str) {
        assert_eq!(status.to_string(), text);
        assert_eq!(text.parse::<EntryStatus>().unwrap(), status);
    }

    #[test]
    fn unrecognized_status_is_rejected() {
        assert!("Resolved".parse::<EntryStatus>().is_err());
        assert!("update".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn status_serializes_as_display_name() {
        let json = serde_json::to_string(&EntryStatus::ResolvedComms).unwrap();
        assert_eq!(json, "\"Resolved Comms\"");
    }

    #[test]
    fn timestamp_uses_fixed_display_format() {
        let time = Utc.with_ymd_and_hms(2025, 7, 4, 9, 5, 0).unwrap();
        assert_eq!(display_timestamp(&time), "04-07-2025, 09:05 UTC");
    }

    #[test]
    fn entry_round_trips_through_json() {
        let entry = TimelineEntry {
            id: 1_720_000_000_000,
            timestamp: "03-07-2024, 10:26 UTC".to_string(),
            status: EntryStatus::Action,
            notes: "Team Falcon was paged out.".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: TimelineEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
