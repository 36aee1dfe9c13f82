//! Rules that compute derived report fields from the timeline.
//!
//! Every rule is a pure function of the entry list and never fails: when no
//! entry matches, the rule yields a defined default instead of an error.
//! [`apply`] writes the results into the details struct, touching a field only
//! when the freshly computed value differs from the stored one.
//!
//! Where a rule picks one entry out of several candidates it scans forward
//! and takes the first match. That is the behaviour the tool has always had,
//! even where a last-match rule might look more natural, and the tests pin it
//! down.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{EntryStatus, IncidentDetails, TimelineEntry};

/// The line prefix that marks the resolution text inside a closing comms
/// entry.
const RESOLUTION_TRIGGER: &str = "* Current update";

/// Matches a change reference such as `CHG0012345`, case-insensitively.
static CHANGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CHG[A-Z0-9]*").expect("pattern is valid"));

/// Matches `<party> <engagement phrase>` in a notes line. The captured prefix
/// is the engaged party, possibly still carrying a `label:` prefix of its own.
static ENGAGEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(.*?)\s+(paged out|was paged out|joined the call|joined the bridge)")
        .expect("pattern is valid")
});

/// Extracts the resolution text from the first `Resolved Comms` entry.
///
/// The entry's notes are scanned line by line for the first line starting
/// (case-insensitively, after trimming) with `* Current update`; the text
/// after the prefix, minus an optional leading colon, is the resolution.
/// Yields the empty string when no entry or no such line exists.
#[must_use]
pub fn resolution(entries: &[TimelineEntry]) -> String {
    let Some(entry) = entries
        .iter()
        .find(|entry| entry.status == EntryStatus::ResolvedComms)
    else {
        return String::new();
    };

    entry
        .notes
        .lines()
        .map(str::trim)
        .find(|line| {
            line.get(..RESOLUTION_TRIGGER.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(RESOLUTION_TRIGGER))
        })
        .map_or_else(String::new, |line| {
            let text = line[RESOLUTION_TRIGGER.len()..].trim();
            let text = text.strip_prefix(':').map_or(text, str::trim);
            text.to_string()
        })
}

/// Reports whether the incident was caused by a change.
///
/// The first `Caused by Change` entry yields `"Yes - <notes>"` (notes may be
/// empty); with no such entry the answer is the literal `"No"`.
#[must_use]
pub fn caused_by_change(entries: &[TimelineEntry]) -> String {
    entries
        .iter()
        .find(|entry| entry.status == EntryStatus::CausedByChange)
        .map_or_else(|| "No".to_string(), |entry| format!("Yes - {}", entry.notes))
}

/// Extracts the resolving change reference.
///
/// Takes the first `Resolved by Change` entry and returns the first change
/// token in its notes, with the casing of the source text preserved. Yields
/// the empty string when there is no such entry or no token in it.
#[must_use]
pub fn resolved_by_change(entries: &[TimelineEntry]) -> String {
    entries
        .iter()
        .find(|entry| entry.status == EntryStatus::ResolvedByChange)
        .and_then(|entry| CHANGE_REF.find(&entry.notes))
        .map_or_else(String::new, |m| m.as_str().to_string())
}

/// Collects all concerns and recommendations, in timeline order.
///
/// Each matching entry is rendered as `<status>: <notes>` (`N/A` for empty
/// notes); the lines are newline-joined. Empty string when there are none.
#[must_use]
pub fn concern_recommendation(entries: &[TimelineEntry]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .filter(|entry| {
            matches!(
                entry.status,
                EntryStatus::Concern | EntryStatus::Recommendation
            )
        })
        .map(|entry| {
            let notes = if entry.notes.is_empty() {
                "N/A"
            } else {
                entry.notes.as_str()
            };
            format!("{}: {notes}", entry.status)
        })
        .collect();
    lines.join("\n")
}

/// Extracts engaged parties from `Update` and `Action` entries.
///
/// Every notes line is matched against the engagement phrases (`paged out`,
/// `was paged out`, `joined the call`, `joined the bridge`); the text before
/// the phrase, reduced to the segment after its last `:` and trimmed, is the
/// party name. Names are deduplicated preserving first-seen order.
#[must_use]
pub fn engaged_parties(entries: &[TimelineEntry]) -> Vec<String> {
    let mut parties: Vec<String> = Vec::new();

    for entry in entries.iter().filter(|entry| {
        matches!(entry.status, EntryStatus::Update | EntryStatus::Action)
    }) {
        for line in entry.notes.lines() {
            let Some(captures) = ENGAGEMENT.captures(line) else {
                continue;
            };
            let prefix = captures.get(1).map_or("", |m| m.as_str());
            let name = prefix.rsplit(':').next().unwrap_or("").trim();
            if !name.is_empty() && !parties.iter().any(|known| known == name) {
                parties.push(name.to_string());
            }
        }
    }

    parties
}

/// Unions extracted party names into an existing comma-separated value.
///
/// Manually entered names are preserved and keep their position; new names
/// are appended. The result is `", "`-joined. This only ever adds names.
#[must_use]
pub fn merge_engaged(existing: &str, parties: &[String]) -> String {
    let mut merged: Vec<String> = existing
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect();

    for party in parties {
        if !merged.iter().any(|known| known == party) {
            merged.push(party.clone());
        }
    }

    merged.join(", ")
}

/// Recomputes every derived field and writes changed values into `details`.
///
/// Returns `true` if any field was updated. Running this twice on the same
/// entry list is guaranteed to report no change the second time, so callers
/// can re-derive after every mutation without churning the stored record.
pub fn apply(entries: &[TimelineEntry], details: &mut IncidentDetails) -> bool {
    let mut changed = false;

    let resolution = resolution(entries);
    if details.resolution != resolution {
        details.resolution = resolution;
        changed = true;
    }

    let caused = caused_by_change(entries);
    if details.caused_by_change != caused {
        details.caused_by_change = caused;
        changed = true;
    }

    let resolved = resolved_by_change(entries);
    if details.resolved_by_change != resolved {
        details.resolved_by_change = resolved;
        changed = true;
    }

    let concerns = concern_recommendation(entries);
    if details.concern_recommendation != concerns {
        details.concern_recommendation = concerns;
        changed = true;
    }

    let parties = engaged_parties(entries);
    if !parties.is_empty() {
        let merged = merge_engaged(&details.workgroups_engaged, &parties);
        if details.workgroups_engaged != merged {
            details.workgroups_engaged = merged;
            changed = true;
        }
    }

    changed
}
