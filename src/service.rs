//! Client for the external text service.
//!
//! The service is a collaborator, not part of this tool: given plain text
//! (plus optional style and knowledge-base text) it corrects, simplifies or
//! drafts communications, and given an incident document it fills one of two
//! structured summary schemas. This module holds the trait describing that
//! boundary, an HTTP implementation, the retry policy for overload failures,
//! and the fixed text layouts the structured summaries are joined into.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::ServiceConfig;

/// How many additional attempts an overloaded call gets.
pub const MAX_RETRIES: u32 = 2;

/// Backoff before the first retry; doubles on each subsequent one.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Errors raised by the text service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service signalled overload. The only retryable failure.
    #[error("text service is overloaded")]
    Overloaded,
    /// The service answered with a non-success status.
    #[error("text service request failed with status {0}")]
    Status(u16),
    /// The request did not complete within the configured timeout.
    #[error("text service request timed out after {0} seconds")]
    Timeout(u64),
    /// The service could not be reached.
    #[error("failed to reach text service: {0}")]
    Transport(String),
    /// The response body did not match the expected schema.
    #[error("malformed text service response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Whether the failure is worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded)
    }
}

/// A text rewrite request (grammar correction or simplification).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    /// The text to transform.
    pub text: String,
    /// Desired writing style, e.g. `Formal` or `Casual`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Sample communications for the service to mimic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<String>,
}

/// A communication-drafting request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommsRequest {
    /// The incident analysis the communication is based on.
    pub analysis: String,
    /// Sample communications for the service to mimic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<String>,
}

/// Which of the two fixed report formats to summarize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    /// The Technical Report.
    Technical,
    /// The Post-Incident Review.
    Pir,
}

/// The identity block of a technical report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalDetails {
    /// The incident number.
    pub incident: String,
    /// The incident priority.
    pub priority: String,
    /// Short description of the issue.
    pub description: String,
    /// Name of the incident manager.
    pub incident_manager: String,
    /// Name of the timeline scribe.
    pub timeline_scribe: String,
    /// The product affected.
    pub nbcu_product: String,
}

/// The impact block of a technical report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemsAffected {
    /// Devices impacted by the incident.
    pub impacted_devices: String,
    /// Services or products impacted.
    pub services_impacted: String,
}

/// The communication block of a technical report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    /// Workgroups and individuals engaged during the incident.
    pub teams_engaged: String,
}

/// The structured fields of a Technical Report summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalReport {
    /// The identity block.
    pub technical_details: TechnicalDetails,
    /// The impact block.
    pub systems_affected: SystemsAffected,
    /// Summary of the investigation steps taken.
    pub investigation_steps: String,
    /// Analysis of the root cause.
    pub root_cause_analysis: String,
    /// Steps taken to resolve the incident.
    pub resolution_steps: String,
    /// Measures that should prevent a recurrence.
    pub prevention_measures: String,
    /// The communication block.
    pub communication: Communication,
}

/// The five timestamps a Post-Incident Review pins down.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorTimestamps {
    /// When the incident's business impact started.
    pub business_impact_start: String,
    /// When the incident was reported to the incident management team.
    pub detection_time: String,
    /// When the correct fixing team was engaged.
    pub last_reassignment_time: String,
    /// When the fixing team took its first mitigating step.
    pub action_time: String,
    /// When customer impact was resolved.
    pub mitigation_time: String,
}

/// The change references of a Post-Incident Review.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDetails {
    /// The change that caused the incident, or `N/A`.
    pub caused_by_change: String,
    /// The change that resolved the incident, or `N/A`.
    pub resolved_by_change: String,
}

/// The structured fields of a Post-Incident Review summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PirReport {
    /// Statement of the problem that occurred.
    pub problem_statement: String,
    /// The five major timestamps.
    pub major_timestamps: MajorTimestamps,
    /// Causing and resolving change references.
    pub change_details: ChangeDetails,
    /// Concerns raised and recommendations made.
    pub concern_and_recommendation: String,
    /// Summary of what resolved the incident.
    pub resolution_summary: String,
}

/// A structured summary returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// A Technical Report.
    Technical(TechnicalReport),
    /// A Post-Incident Review.
    Pir(PirReport),
}

impl Summary {
    /// Joins the structured fields into the fixed final text block for the
    /// report kind.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Technical(report) => {
                let TechnicalReport {
                    technical_details,
                    systems_affected,
                    investigation_steps,
                    root_cause_analysis,
                    resolution_steps,
                    prevention_measures,
                    communication,
                } = report;
                format!(
                    "Technical Report\n\
                     \n\
                     TECHNICAL DETAILS\n\
                     Incident: {}\n\
                     Priority: {}\n\
                     Description: {}\n\
                     Incident Manager: {}\n\
                     Timeline Scribe: {}\n\
                     NBCU Product: {}\n\
                     \n\
                     SYSTEMS AFFECTED\n\
                     Impacted Devices: {}\n\
                     Services Impacted: {}\n\
                     \n\
                     INVESTIGATION STEPS\n\
                     {investigation_steps}\n\
                     \n\
                     ROOT CAUSE ANALYSIS\n\
                     {root_cause_analysis}\n\
                     \n\
                     RESOLUTION STEPS\n\
                     {resolution_steps}\n\
                     \n\
                     PREVENTION MEASURES\n\
                     {prevention_measures}\n\
                     \n\
                     COMMUNICATION\n\
                     Teams Engaged: {}\n",
                    technical_details.incident,
                    technical_details.priority,
                    technical_details.description,
                    technical_details.incident_manager,
                    technical_details.timeline_scribe,
                    technical_details.nbcu_product,
                    systems_affected.impacted_devices,
                    systems_affected.services_impacted,
                    communication.teams_engaged,
                )
            }
            Self::Pir(report) => {
                let PirReport {
                    problem_statement,
                    major_timestamps,
                    change_details,
                    concern_and_recommendation,
                    resolution_summary,
                } = report;
                format!(
                    "Problem Statement:\n\
                     {problem_statement}\n\
                     \n\
                     Major Timestamp:-\n\
                     1. Start of Business impact(when the incident was identified) -->\n\
                     {}\n\
                     2. Detected Time(when the incident was reported to Incident Management Team) -->\n\
                     {}\n\
                     3. Last reassignment Group time(when the fix agent was reached out) -->\n\
                     {}\n\
                     4. Action time(when did the fix agent took first step to mitigate/resolve the incident) -->\n\
                     {}\n\
                     5. Mitigated Time( When was the incident mitigated and Customer impact was resolved)-->\n\
                     {}\n\
                     \n\
                     Caused by Change:-\n\
                     {}\n\
                     \n\
                     Resolved by Change:-\n\
                     {}\n\
                     \n\
                     Concern/ Recommendation:-\n\
                     {concern_and_recommendation}\n\
                     \n\
                     Resolution Summary:\n\
                     {resolution_summary}\n",
                    major_timestamps.business_impact_start,
                    major_timestamps.detection_time,
                    major_timestamps.last_reassignment_time,
                    major_timestamps.action_time,
                    major_timestamps.mitigation_time,
                    change_details.caused_by_change,
                    change_details.resolved_by_change,
                )
            }
        }
    }
}

/// The text transformation operations the service offers.
pub trait TextService {
    /// Corrects grammar and style.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the service cannot be reached, rejects
    /// the request, or answers with an unexpected body.
    fn correct_grammar(&self, request: &RewriteRequest) -> Result<String, ServiceError>;

    /// Simplifies text for a non-technical audience.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the service cannot be reached, rejects
    /// the request, or answers with an unexpected body.
    fn simplify(&self, request: &RewriteRequest) -> Result<String, ServiceError>;

    /// Drafts a communication from an incident analysis.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the service cannot be reached, rejects
    /// the request, or answers with an unexpected body.
    fn generate_comms(&self, request: &CommsRequest) -> Result<String, ServiceError>;

    /// Summarizes an incident document into one of the two report schemas.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the service cannot be reached, rejects
    /// the request, or answers with an unexpected body.
    fn summarize(&self, document_text: &str, kind: SummaryKind) -> Result<Summary, ServiceError>;
}

/// HTTP implementation of the text service boundary.
///
/// One JSON POST per operation against the configured endpoint.
#[derive(Debug)]
pub struct HttpTextService {
    endpoint: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorrectedText {
    corrected_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimplifiedText {
    simplified_text: String,
}

#[derive(Deserialize)]
struct GeneratedComms {
    communication: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest<'a> {
    document_text: &'a str,
    summary_type: SummaryKind,
}

impl HttpTextService {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Transport`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn post<Request, Response>(&self, path: &str, body: &Request) -> Result<Response, ServiceError>
    where
        Request: Serialize,
        Response: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(self.timeout_secs)
                } else {
                    ServiceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(ServiceError::Overloaded);
        }
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }

        response
            .json()
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

impl TextService for HttpTextService {
    fn correct_grammar(&self, request: &RewriteRequest) -> Result<String, ServiceError> {
        let response: CorrectedText = self.post("grammar-correction", request)?;
        Ok(response.corrected_text)
    }

    fn simplify(&self, request: &RewriteRequest) -> Result<String, ServiceError> {
        let response: SimplifiedText = self.post("simplify-text", request)?;
        Ok(response.simplified_text)
    }

    fn generate_comms(&self, request: &CommsRequest) -> Result<String, ServiceError> {
        let response: GeneratedComms = self.post("generate-comms", request)?;
        Ok(response.communication)
    }

    fn summarize(&self, document_text: &str, kind: SummaryKind) -> Result<Summary, ServiceError> {
        let body = SummaryRequest {
            document_text,
            summary_type: kind,
        };
        match kind {
            SummaryKind::Technical => {
                let report: TechnicalReport = self.post("generate-summary", &body)?;
                Ok(Summary::Technical(report))
            }
            SummaryKind::Pir => {
                let report: PirReport = self.post("generate-summary", &body)?;
                Ok(Summary::Pir(report))
            }
        }
    }
}

/// Runs a service call, retrying overload failures.
///
/// Up to [`MAX_RETRIES`] additional attempts, sleeping [`INITIAL_BACKOFF`]
/// before the first retry and doubling before each subsequent one. Any other
/// failure propagates immediately. There is no cancellation; callers simply
/// discard results they no longer want.
///
/// # Errors
///
/// Returns the last error once the attempts are exhausted, or the first
/// non-retryable error encountered.
pub fn call_with_retry<T>(
    mut call: impl FnMut() -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    let mut delay = INITIAL_BACKOFF;
    let mut attempts_left = MAX_RETRIES;

    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempts_left > 0 => {
                tracing::warn!(
                    "text service overloaded, retrying in {delay:?} ({attempts_left} attempts left)"
                );
                std::thread::sleep(delay);
                delay *= 2;
                attempts_left -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}
