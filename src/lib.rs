//! Incident Timeline Management
//!
//! Incidents are JSON records stored in a directory, each holding a title
//! block, a fixed set of report fields and a free-text timeline. Derivation
//! rules turn the timeline into structured report fields, report assembly
//! renders the state as text, and an external text service polishes and
//! summarizes that text.

pub mod domain;
pub use domain::{Config, EntryStatus, IncidentDetails, IncidentState, Priority, TimelineEntry};

/// Derivation rules that compute report fields from the timeline.
pub mod derivation;

/// Text renderings of incident state.
pub mod report;

/// Filesystem storage for incident records and the team roster.
pub mod storage;
pub use storage::{IncidentStore, StoreError, TeamRoster};

/// The external text service boundary.
pub mod service;
