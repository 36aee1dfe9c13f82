//! Report assembly: text renderings of an incident's state.
//!
//! Two renderers exist. The *state dump* is a line-oriented export format that
//! round-trips: [`parse_state_dump`] reconstructs an equivalent state from it,
//! which is how incidents move between reconvened calls. The *analysis
//! document* is a one-way human-readable report fed to the external text
//! service for summarization.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::domain::{
    EntryStatus, IncidentState, TimelineEntry,
    details::{INCIDENT_FIELDS, RESOLUTION_FIELDS},
    entry::UnknownStatusError,
    incident::UnknownPriorityError,
};

/// Renders the line-oriented state dump.
///
/// Sections are `[Document Title]`, `--- [Incident Details] ---`,
/// `--- [Resolution Details] ---` and `--- [Incident Timeline] ---`; values
/// are `key: value` lines, timeline entries are four-line records separated by
/// a line of exactly `---`, and multi-line notes are flattened with `\n`
/// escapes.
#[must_use]
pub fn state_dump(state: &IncidentState) -> String {
    let mut out = String::new();

    out.push_str("[Document Title]\n");
    let _ = writeln!(out, "Priority: {}", state.title_priority);
    let _ = writeln!(out, "Incident Number: {}", state.title_incident);
    let _ = writeln!(out, "Short Description: {}", state.title_description);
    out.push('\n');

    out.push_str("--- [Incident Details] ---\n");
    for field in INCIDENT_FIELDS {
        let value = state.incident_details.get(field).unwrap_or_default();
        let _ = writeln!(out, "{field}: {value}");
    }
    out.push('\n');

    out.push_str("--- [Resolution Details] ---\n");
    for field in RESOLUTION_FIELDS {
        let value = state.incident_details.get(field).unwrap_or_default();
        let _ = writeln!(out, "{field}: {value}");
    }
    out.push('\n');

    out.push_str("--- [Incident Timeline] ---\n");
    for entry in &state.timeline_entries {
        let _ = writeln!(out, "id: {}", entry.id);
        let _ = writeln!(out, "timestamp: {}", entry.timestamp);
        let _ = writeln!(out, "status: {}", entry.status);
        let _ = writeln!(out, "notes: {}", entry.notes.replace('\n', "\\n"));
        out.push_str("---\n");
    }

    out
}

/// Errors raised while parsing a state dump.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A timeline `id` line did not hold an integer.
    #[error("invalid timeline entry id: '{0}'")]
    InvalidId(String),
    /// A timeline `status` line held an unrecognized status name.
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatusError),
    /// The title block held an unrecognized priority.
    #[error(transparent)]
    UnknownPriority(#[from] UnknownPriorityError),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Title,
    Incident,
    Resolution,
    Timeline,
}

#[derive(Default)]
struct PartialEntry {
    id: Option<i64>,
    timestamp: Option<String>,
    status: Option<EntryStatus>,
    notes: Option<String>,
}

impl PartialEntry {
    /// An entry needs at least an id, a timestamp and a status to count;
    /// anything less is discarded, which also swallows the trailing `---`.
    fn build(self) -> Option<TimelineEntry> {
        Some(TimelineEntry {
            id: self.id?,
            timestamp: self.timestamp?,
            status: self.status?,
            notes: self.notes.unwrap_or_default(),
        })
    }
}

/// Parses a state dump back into an [`IncidentState`].
///
/// Unrecognized detail field names are ignored; the derived and
/// user-editable fields land back where [`state_dump`] put them.
///
/// # Errors
///
/// Returns a [`ParseError`] when a timeline id is not an integer or a status
/// or priority name is not one of the recognized values.
pub fn parse_state_dump(text: &str) -> Result<IncidentState, ParseError> {
    let mut state = IncidentState::default();
    let mut section = Section::None;
    let mut current = PartialEntry::default();

    for line in text.lines() {
        if line.starts_with("[Document Title]") {
            section = Section::Title;
        } else if line.starts_with("--- [Incident Details] ---") {
            section = Section::Incident;
        } else if line.starts_with("--- [Resolution Details] ---") {
            section = Section::Resolution;
        } else if line.starts_with("--- [Incident Timeline] ---") {
            section = Section::Timeline;
        } else if line.trim() == "---" && section == Section::Timeline {
            if let Some(entry) = std::mem::take(&mut current).build() {
                state.timeline_entries.push(entry);
            }
        } else if section != Section::None && !line.trim().is_empty() {
            let (key, value) = line
                .split_once(':')
                .map_or((line, ""), |(key, rest)| (key, rest.trim()));
            match section {
                Section::Title => match key {
                    "Priority" => state.title_priority = value.parse()?,
                    "Incident Number" => state.title_incident = value.to_string(),
                    "Short Description" => state.title_description = value.to_string(),
                    _ => {}
                },
                Section::Incident | Section::Resolution => {
                    state.incident_details.set(key.trim(), value.to_string());
                }
                Section::Timeline => match key.trim() {
                    "id" => {
                        current.id = Some(
                            value
                                .parse()
                                .map_err(|_| ParseError::InvalidId(value.to_string()))?,
                        );
                    }
                    "timestamp" => current.timestamp = Some(value.to_string()),
                    "status" => current.status = Some(value.parse()?),
                    "notes" => current.notes = Some(value.replace("\\n", "\n")),
                    _ => {}
                },
                Section::None => unreachable!("guarded by the section check"),
            }
        }
    }

    Ok(state)
}

/// Composes the document title used by exports and analysis reports.
///
/// Format: `dd-MM-yyyy - <priority> - <incident> - <description>`, with
/// bracketed placeholders standing in for missing parts.
#[must_use]
pub fn document_title(state: &IncidentState, today: NaiveDate) -> String {
    let incident = if state.title_incident.is_empty() {
        "[IncidentNumber]"
    } else {
        state.title_incident.as_str()
    };
    let description = if state.title_description.is_empty() {
        "[ShortDescription]"
    } else {
        state.title_description.as_str()
    };
    format!(
        "{} - {} - {incident} - {description}",
        today.format("%d-%m-%Y"),
        state.title_priority
    )
}

/// Renders the human-readable analysis document.
///
/// This is the text handed to the external text service as the document to
/// summarize. Empty values appear as `N/A`; the Incident Number and Priority
/// rows are taken from the title fields, not the details table. One-way:
/// there is no parser for this layout.
#[must_use]
pub fn analysis_document(state: &IncidentState, today: NaiveDate) -> String {
    let mut report = String::new();

    let _ = writeln!(report, "Document Title: {}\n", document_title(state, today));
    let _ = writeln!(
        report,
        "Short Description: {}\n",
        or_na(&state.title_description)
    );

    report.push_str("--- Incident Details ---\n");
    for field in INCIDENT_FIELDS {
        let value = match field {
            "Incident Number" => state.title_incident.as_str(),
            "Priority" => state.title_priority.as_str(),
            _ => state.incident_details.get(field).unwrap_or_default(),
        };
        let _ = writeln!(report, "{field}: {}", or_na(value));
    }
    report.push('\n');

    report.push_str("--- Incident Timeline ---\n");
    if state.timeline_entries.is_empty() {
        report.push_str("No timeline entries.\n\n");
    } else {
        for entry in &state.timeline_entries {
            let _ = writeln!(report, "Time: {}", entry.timestamp);
            let _ = writeln!(report, "Status: {}", entry.status);
            let _ = writeln!(report, "Notes:\n{}\n", or_na(&entry.notes));
        }
    }

    report.push_str("--- Resolution Details ---\n");
    for field in RESOLUTION_FIELDS {
        let value = state.incident_details.get(field).unwrap_or_default();
        let _ = writeln!(report, "{field}: {}", or_na(value));
    }
    report.push('\n');

    report
}

/// The export file name: `<incident>-<priority>-<description>.txt` with
/// uppercase placeholders for missing parts.
#[must_use]
pub fn export_file_name(state: &IncidentState) -> String {
    let incident = if state.title_incident.is_empty() {
        "INCIDENT"
    } else {
        state.title_incident.as_str()
    };
    let description = if state.title_description.is_empty() {
        "DESCRIPTION"
    } else {
        state.title_description.as_str()
    };
    format!("{incident}-{}-{description}.txt", state.title_priority)
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

#[cfg(test)]
mod tests {
    use crate::domain::Priority;

    use super::*;

    fn sample_state() -> IncidentState {
        let mut state = IncidentState::new("INC0012345".to_string());
        state.title_priority = Priority::P2;
        state.title_description = "Checkout latency".to_string();
        state.incident_details.incident_manager = "A. Chen".to_string();
        state.incident_details.workgroups_engaged = "Team Falcon".to_string();
        state.incident_details.resolution = "All systems normal".to_string();
        state.timeline_entries = vec![
            TimelineEntry {
                id: 1_720_000_000_000,
                timestamp: "03-07-2024, 10:26 UTC".to_string(),
                status: EntryStatus::InitialReport,
                notes: "Latency spike observed".to_string(),
            },
            TimelineEntry {
                id: 1_720_000_060_000,
                timestamp: "03-07-2024, 10:27 UTC".to_string(),
                status: EntryStatus::ResolvedComms,
                notes: "Summary\n* Current update: All systems normal".to_string(),
            },
        ];
        state
    }

    #[test]
    fn dump_contains_all_sections_in_order() {
        let dump = state_dump(&sample_state());

        let title = dump.find("[Document Title]").unwrap();
        let incident = dump.find("--- [Incident Details] ---").unwrap();
        let resolution = dump.find("--- [Resolution Details] ---").unwrap();
        let timeline = dump.find("--- [Incident Timeline] ---").unwrap();
        assert!(title < incident && incident < resolution && resolution < timeline);
    }

    #[test]
    fn dump_flattens_multiline_notes() {
        let dump = state_dump(&sample_state());
        assert!(dump.contains("notes: Summary\\n* Current update: All systems normal\n"));
    }

    #[test]
    fn dump_round_trips() {
        let state = sample_state();
        let parsed = parse_state_dump(&state_dump(&state)).unwrap();

        assert_eq!(parsed.title_priority, state.title_priority);
        assert_eq!(parsed.title_incident, state.title_incident);
        assert_eq!(parsed.title_description, state.title_description);
        assert_eq!(parsed.timeline_entries, state.timeline_entries);
        assert_eq!(parsed.incident_details, state.incident_details);
    }

    #[test]
    fn parse_ignores_unrecognized_detail_fields() {
        let text = "--- [Incident Details] ---\nSeverity: extreme\nIncident Manager: A. Chen\n";
        let parsed = parse_state_dump(text).unwrap();
        assert_eq!(parsed.incident_details.incident_manager, "A. Chen");
    }

    #[test]
    fn parse_preserves_colons_in_values() {
        let text = "--- [Incident Details] ---\nBridge Link: https://example.com/call\n";
        let parsed = parse_state_dump(text).unwrap();
        assert_eq!(
            parsed.incident_details.bridge_link,
            "https://example.com/call"
        );
    }

    #[test]
    fn parse_rejects_bad_id_and_status() {
        let bad_id = "--- [Incident Timeline] ---\nid: soon\n";
        assert!(matches!(
            parse_state_dump(bad_id),
            Err(ParseError::InvalidId(_))
        ));

        let bad_status =
            "--- [Incident Timeline] ---\nid: 1\ntimestamp: t\nstatus: Escalated\n---\n";
        assert!(matches!(
            parse_state_dump(bad_status),
            Err(ParseError::UnknownStatus(_))
        ));
    }

    #[test]
    fn parse_drops_incomplete_timeline_records() {
        let text = "--- [Incident Timeline] ---\nid: 1\n---\n";
        let parsed = parse_state_dump(text).unwrap();
        assert!(parsed.timeline_entries.is_empty());
    }

    #[test]
    fn title_substitutes_placeholders() {
        let state = IncidentState::default();
        let today = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        assert_eq!(
            document_title(&state, today),
            "04-07-2025 - P1 - [IncidentNumber] - [ShortDescription]"
        );
    }

    #[test]
    fn analysis_document_defaults_missing_values_to_na() {
        let mut state = sample_state();
        state.timeline_entries.clear();
        let today = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        let report = analysis_document(&state, today);

        assert!(report.contains("Incident Number: INC0012345"));
        assert!(report.contains("Priority: P2"));
        assert!(report.contains("Timeline Scribe: N/A"));
        assert!(report.contains("No timeline entries."));
        assert!(report.contains("Resolution: All systems normal"));
    }

    #[test]
    fn analysis_document_lists_every_entry() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        let report = analysis_document(&sample_state(), today);

        assert!(report.contains("Time: 03-07-2024, 10:26 UTC"));
        assert!(report.contains("Status: Initial Report"));
        assert!(report.contains("Notes:\nLatency spike observed"));
    }

    #[test]
    fn export_file_name_uses_placeholders_when_empty() {
        assert_eq!(
            export_file_name(&IncidentState::default()),
            "INCIDENT-P1-DESCRIPTION.txt"
        );
        assert_eq!(
            export_file_name(&sample_state()),
            "INC0012345-P2-Checkout latency.txt"
        );
    }
}
