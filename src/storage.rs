/// File-backed store of per-incident records.
pub mod incident;
/// File-backed store of the callable team roster.
pub mod roster;

use std::io;

pub use incident::{IncidentStore, RETENTION};
pub use roster::{TEAMS_FILE, TeamRoster};

/// Errors raised by the incident and roster stores.
///
/// A missing record is not an error; loads report it as an absent result.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A save was attempted without an incident number.
    #[error("incident number is required")]
    EmptyIncidentNumber,
    /// The storage directory could not be created, or a record could not be
    /// read or written.
    #[error("storage failure")]
    Io(#[from] io::Error),
    /// A record on disk could not be decoded.
    #[error("malformed record")]
    Json(#[from] serde_json::Error),
}
