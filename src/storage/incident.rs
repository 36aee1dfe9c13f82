//! A filesystem backed store of incident records.
//!
//! One JSON file per incident, named by the sanitized incident number, all in
//! a single flat directory. The same directory holds the team roster file
//! (see [`super::roster`]), which the retention sweep leaves alone.

use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::IncidentState, storage::StoreError};

use super::TEAMS_FILE;

/// How long an incident record may go unmodified before the sweep retires it.
pub const RETENTION: Duration = Duration::from_secs(15 * 24 * 60 * 60);

/// A filesystem backed store of incident records.
#[derive(Debug, Clone)]
pub struct IncidentStore {
    /// The directory incident records are stored in.
    dir: PathBuf,
}

impl IncidentStore {
    /// Opens a store rooted at the given directory.
    ///
    /// The directory is created lazily on first use.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The directory this store writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reduces an incident number to a storage key.
    ///
    /// Every character outside `[a-zA-Z0-9-]` becomes `_` and the result is
    /// lowercased. Deterministic and idempotent. Distinct incident numbers
    /// that sanitize to the same key share a record; the last writer wins.
    #[must_use]
    pub fn sanitize(incident_number: &str) -> String {
        incident_number
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Persists the state for the given incident number, overwriting any
    /// existing record for the same key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyIncidentNumber`] for a blank or whitespace
    /// number, and [`StoreError::Io`] when the storage directory cannot be
    /// created or the record cannot be written.
    pub fn save(&self, incident_number: &str, state: &IncidentState) -> Result<(), StoreError> {
        if incident_number.trim().is_empty() {
            return Err(StoreError::EmptyIncidentNumber);
        }

        self.ensure_dir()?;
        let path = self.record_path(incident_number);
        let data = serde_json::to_string_pretty(state)?;
        fs::write(&path, data)?;
        tracing::info!("saved incident record {}", path.display());
        Ok(())
    }

    /// Loads the state for the given incident number.
    ///
    /// Returns `Ok(None)` for blank numbers and for keys with no record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on any I/O failure other than a missing
    /// record, and [`StoreError::Json`] when the record cannot be decoded.
    pub fn load(&self, incident_number: &str) -> Result<Option<IncidentState>, StoreError> {
        if incident_number.trim().is_empty() {
            return Ok(None);
        }

        self.ensure_dir()?;
        let path = self.record_path(incident_number);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes stale incident records.
    ///
    /// A record is stale when its file modification time is older than
    /// `max_age`. The roster file and non-JSON files are skipped. Every
    /// failure is logged and swallowed: a broken sweep must never block a
    /// save or load, and a record deleted under us mid-sweep is fine.
    pub fn sweep(&self, max_age: Duration) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("retention sweep skipped: {err}");
                return;
            }
        };

        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.file_name() == Some(OsStr::new(TEAMS_FILE))
                || path.extension() != Some(OsStr::new("json"))
            {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|metadata| metadata.modified())
                .map(|modified| modified.elapsed().unwrap_or(Duration::ZERO));

            match age {
                Ok(age) if age > max_age => match fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::info!("cleaned up stale incident record {}", path.display());
                    }
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => {
                        tracing::warn!("failed to remove {}: {err}", path.display());
                    }
                },
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!("failed to stat {}: {err}", path.display());
                }
            }
        }
    }

    /// Creates the storage directory if needed and kicks off a background
    /// retention sweep. Directory creation failure is fatal to the calling
    /// operation; the sweep itself is best-effort.
    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let store = self.clone();
        std::thread::spawn(move || store.sweep(RETENTION));

        Ok(())
    }

    fn record_path(&self, incident_number: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", Self::sanitize(incident_number)))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use test_case::test_case;

    use crate::{domain::TimelineEntry, storage::TeamRoster};

    use super::*;

    fn setup() -> (TempDir, IncidentStore) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let store = IncidentStore::new(tmp.path().join("incident-states"));
        (tmp, store)
    }

    #[test_case("INC0012345", "inc0012345")]
    #[test_case("INC 12/34", "inc_12_34")]
    #[test_case("abc-DEF", "abc-def")]
    #[test_case("", "")]
    fn sanitize_replaces_and_lowercases(raw: &str, expected: &str) {
        assert_eq!(IncidentStore::sanitize(raw), expected);
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["INC 12/34", "weird name!", "plain-123"] {
            let once = IncidentStore::sanitize(raw);
            assert_eq!(IncidentStore::sanitize(&once), once);
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_tmp, store) = setup();
        let mut state = IncidentState::new("INC0012345".to_string());
        state
            .timeline_entries
            .push(TimelineEntry::new(crate::domain::EntryStatus::Update, "note".to_string()));

        store.save("INC0012345", &state).unwrap();
        let loaded = store.load("INC0012345").unwrap().expect("record exists");
        assert_eq!(loaded, state);
    }

    #[test]
    fn save_rejects_blank_incident_number() {
        let (_tmp, store) = setup();
        let state = IncidentState::default();
        assert!(matches!(
            store.save("   ", &state),
            Err(StoreError::EmptyIncidentNumber)
        ));
    }

    #[test]
    fn load_of_missing_record_is_absent_not_an_error() {
        let (_tmp, store) = setup();
        assert!(store.load("INC9999999").unwrap().is_none());
        assert!(store.load("").unwrap().is_none());
    }

    #[test]
    fn colliding_keys_share_a_record() {
        let (_tmp, store) = setup();
        let first = IncidentState::new("INC 1".to_string());
        let second = IncidentState::new("INC_1".to_string());

        store.save("INC 1", &first).unwrap();
        store.save("INC_1", &second).unwrap();

        let loaded = store.load("INC 1").unwrap().expect("record exists");
        assert_eq!(loaded.title_incident, "INC_1");
    }

    #[test]
    fn sweep_removes_stale_records_and_spares_the_roster() {
        let (_tmp, store) = setup();
        let state = IncidentState::new("INC1".to_string());
        store.save("INC1", &state).unwrap();

        let roster = TeamRoster::new(store.dir().to_path_buf());
        roster.save(&["Team Falcon".to_string()]).unwrap();

        // A zero threshold makes every record stale.
        store.sweep(Duration::ZERO);

        assert!(store.load("INC1").unwrap().is_none());
        assert_eq!(roster.load().unwrap(), vec!["Team Falcon".to_string()]);
    }

    #[test]
    fn sweep_retains_fresh_records() {
        let (_tmp, store) = setup();
        let state = IncidentState::new("INC1".to_string());
        store.save("INC1", &state).unwrap();

        store.sweep(RETENTION);

        assert!(store.load("INC1").unwrap().is_some());
    }

    #[test]
    fn sweep_ignores_non_json_files() {
        let (_tmp, store) = setup();
        store.save("INC1", &IncidentState::new("INC1".to_string())).unwrap();
        fs::write(store.dir().join("README.txt"), "keep me").unwrap();

        store.sweep(Duration::ZERO);

        assert!(store.dir().join("README.txt").exists());
    }

    #[test]
    fn sweep_on_missing_directory_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let store = IncidentStore::new(tmp.path().join("nowhere"));
        store.sweep(Duration::ZERO);
    }
}
