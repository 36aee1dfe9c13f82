use serde::{Deserialize, Serialize};

/// The fixed set of report fields attached to an incident.
///
/// Every field is always present, defaulting to the empty string. Modelling
/// the set as a struct rather than an open map makes that invariant a
/// compile-time property. The serialized form keys each field by its display
/// name, so records written by earlier versions of the tool load unchanged.
///
/// Four fields are exclusively derived from the timeline
/// ([`resolution`](Self::resolution), [`caused_by_change`](Self::caused_by_change),
/// [`resolved_by_change`](Self::resolved_by_change),
/// [`concern_recommendation`](Self::concern_recommendation)) and
/// [`workgroups_engaged`](Self::workgroups_engaged) is user-editable but
/// unioned into by derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDetails {
    /// The incident number as recorded in the details table.
    #[serde(rename = "Incident Number", default)]
    pub incident_number: String,
    /// The incident priority as recorded in the details table.
    #[serde(rename = "Priority", default)]
    pub priority: String,
    /// Who is running the incident.
    #[serde(rename = "Incident Manager", default)]
    pub incident_manager: String,
    /// Who is keeping the timeline.
    #[serde(rename = "Timeline Scribe", default)]
    pub timeline_scribe: String,
    /// Link to the incident bridge.
    #[serde(rename = "Bridge Link", default)]
    pub bridge_link: String,
    /// The product or business unit affected.
    #[serde(rename = "NBCU Product/ Business Unit", default)]
    pub business_unit: String,
    /// Devices impacted by the incident.
    #[serde(rename = "Impacted Devices", default)]
    pub impacted_devices: String,
    /// Services or products impacted.
    #[serde(rename = "Services/Products Impacted", default)]
    pub services_impacted: String,
    /// Comma-separated engaged parties. Derivation unions extracted names
    /// into this value; manually added names are never removed.
    #[serde(rename = "Workgroups or Individuals engaged", default)]
    pub workgroups_engaged: String,
    /// The customer/business impact statement.
    #[serde(rename = "Impact Statement", default)]
    pub impact_statement: String,

    /// Derived: the resolution text extracted from the closing comms.
    #[serde(rename = "Resolution", default)]
    pub resolution: String,
    /// Derived: whether (and which) change caused the incident.
    #[serde(rename = "Caused by Change", default)]
    pub caused_by_change: String,
    /// Derived: the change reference that resolved the incident.
    #[serde(rename = "Resolved by Change", default)]
    pub resolved_by_change: String,
    /// Root cause or trigger of the incident.
    #[serde(rename = "Root Cause/Trigger", default)]
    pub root_cause: String,
    /// Related problem record, if any.
    #[serde(rename = "Related to Problem", default)]
    pub related_problem: String,
    /// Workaround applied, if any.
    #[serde(rename = "Workaround", default)]
    pub workaround: String,
    /// Derived: concerns and recommendations collected from the timeline.
    #[serde(rename = "Concern/Recommendation", default)]
    pub concern_recommendation: String,
    /// Problem record number, if raised.
    #[serde(rename = "Problem Number", default)]
    pub problem_number: String,
    /// Problem record summary, if raised.
    #[serde(rename = "Problem Summary", default)]
    pub problem_summary: String,
}

/// Display names of the incident-detail fields, in report order.
pub const INCIDENT_FIELDS: [&str; 10] = [
    "Incident Number",
    "Priority",
    "Incident Manager",
    "Timeline Scribe",
    "Bridge Link",
    "NBCU Product/ Business Unit",
    "Impacted Devices",
    "Services/Products Impacted",
    "Workgroups or Individuals engaged",
    "Impact Statement",
];

/// Display names of the resolution-detail fields, in report order.
pub const RESOLUTION_FIELDS: [&str; 9] = [
    "Resolution",
    "Caused by Change",
    "Resolved by Change",
    "Root Cause/Trigger",
    "Related to Problem",
    "Workaround",
    "Concern/Recommendation",
    "Problem Number",
    "Problem Summary",
];

impl IncidentDetails {
    /// Looks up a field value by its display name.
    ///
    /// Returns `None` for unrecognized names.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "Incident Number" => &self.incident_number,
            "Priority" => &self.priority,
            "Incident Manager" => &self.incident_manager,
            "Timeline Scribe" => &self.timeline_scribe,
            "Bridge Link" => &self.bridge_link,
            "NBCU Product/ Business Unit" => &self.business_unit,
            "Impacted Devices" => &self.impacted_devices,
            "Services/Products Impacted" => &self.services_impacted,
            "Workgroups or Individuals engaged" => &self.workgroups_engaged,
            "Impact Statement" => &self.impact_statement,
            "Resolution" => &self.resolution,
            "Caused by Change" => &self.caused_by_change,
            "Resolved by Change" => &self.resolved_by_change,
            "Root Cause/Trigger" => &self.root_cause,
            "Related to Problem" => &self.related_problem,
            "Workaround" => &self.workaround,
            "Concern/Recommendation" => &self.concern_recommendation,
            "Problem Number" => &self.problem_number,
            "Problem Summary" => &self.problem_summary,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Sets a field by its display name.
    ///
    /// Returns `false` (leaving the struct untouched) for unrecognized names,
    /// so parsers can skip stray keys in imported documents.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "Incident Number" => &mut self.incident_number,
            "Priority" => &mut self.priority,
            "Incident Manager" => &mut self.incident_manager,
            "Timeline Scribe" => &mut self.timeline_scribe,
            "Bridge Link" => &mut self.bridge_link,
            "NBCU Product/ Business Unit" => &mut self.business_unit,
            "Impacted Devices" => &mut self.impacted_devices,
            "Services/Products Impacted" => &mut self.services_impacted,
            "Workgroups or Individuals engaged" => &mut self.workgroups_engaged,
            "Impact Statement" => &mut self.impact_statement,
            "Resolution" => &mut self.resolution,
            "Caused by Change" => &mut self.caused_by_change,
            "Resolved by Change" => &mut self.resolved_by_change,
            "Root Cause/Trigger" => &mut self.root_cause,
            "Related to Problem" => &mut self.related_problem,
            "Workaround" => &mut self.workaround,
            "Concern/Recommendation" => &mut self.concern_recommendation,
            "Problem Number" => &mut self.problem_number,
            "Problem Summary" => &mut self.problem_summary,
            _ => return false,
        };
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_field_is_reachable() {
        let mut details = IncidentDetails::default();
        for name in INCIDENT_FIELDS.iter().chain(RESOLUTION_FIELDS.iter()) {
            assert!(details.set(name, format!("value for {name}")));
            assert_eq!(
                details.get(name),
                Some(format!("value for {name}").as_str())
            );
        }
    }

    #[test]
    fn unrecognized_field_is_ignored() {
        let mut details = IncidentDetails::default();
        assert!(!details.set("Severity", "P0".to_string()));
        assert_eq!(details.get("Severity"), None);
        assert_eq!(details, IncidentDetails::default());
    }

    #[test]
    fn serialized_form_is_keyed_by_display_name() {
        let details = IncidentDetails {
            workgroups_engaged: "Team Falcon".to_string(),
            ..IncidentDetails::default()
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["Workgroups or Individuals engaged"], "Team Falcon");
        assert_eq!(json["NBCU Product/ Business Unit"], "");
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let details: IncidentDetails =
            serde_json::from_str(r#"{"Resolution": "All systems normal"}"#).unwrap();
        assert_eq!(details.resolution, "All systems normal");
        assert_eq!(details.incident_manager, "");
    }
}
