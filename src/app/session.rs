// FleetSleuth - app/session.rs
//
// UI session persistence: save and restore tab selection and per-view
// filter choices between application restarts.
//
// Design principles:
// - Session is saved atomically (write→temp, rename→final) so a crash
//   during save never corrupts the previous good session.
// - Load errors are silently discarded (corrupt or incompatible sessions
//   just start the app fresh rather than surfacing errors to the user).
// - The data directory is created on first save; no user action required.
// - The auth token is NEVER persisted, and records are not persisted
//   either — the fleet is refetched each session so the dashboard always
//   reflects current API state.

use crate::app::state::{AppState, DeviceSubTab, Tab};
use crate::core::model::{Connectivity, Family, Operability};
use crate::util::constants::SESSION_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version stamp for forward-compatibility checks.
///
/// Increment this constant whenever `SessionData` gains or removes fields
/// in a breaking way. Version mismatches silently discard the session.
pub const SESSION_VERSION: u32 = 1;

// =============================================================================
// On-disk data structures
// =============================================================================

/// Complete persistent session snapshot.
///
/// All fields are optional-friendly; deserialisation failures for individual
/// fields are handled by serde defaults so minor format additions are tolerated
/// without bumping the version.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionData {
    /// Schema version — must equal `SESSION_VERSION` to be accepted.
    pub version: u32,

    /// Tab that was active when the app last closed.
    #[serde(default)]
    pub active_tab: Tab,

    /// Devices sub-tab that was active.
    #[serde(default)]
    pub device_subtab: DeviceSubTab,

    /// Per-family filter state, keyed by the family's schema id.
    #[serde(default)]
    pub filters: Vec<(String, PersistedFilter)>,
}

/// Serialisable snapshot of `FilterState`.
///
/// Only the user-visible, stable fields are persisted. Runtime-only state
/// (`regex_search` compiled form, selection, drill-down) is excluded and
/// re-derived on restore.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PersistedFilter {
    /// Selected organisation, if any.
    #[serde(default)]
    pub organization: Option<String>,

    /// Selected model, if any.
    #[serde(default)]
    pub model: Option<String>,

    /// Active connectivity filter. Empty = all shown.
    #[serde(default)]
    pub connectivity: Vec<Connectivity>,

    /// Active operability filter. Empty = all shown.
    #[serde(default)]
    pub operability: Vec<Operability>,

    /// Text search term.
    #[serde(default)]
    pub text_search: String,

    /// Raw regex pattern string. Re-compiled on restore.
    #[serde(default)]
    pub regex_pattern: String,
}

// =============================================================================
// AppState integration
// =============================================================================

impl AppState {
    /// Snapshot the persistable view state.
    pub fn session_data(&self) -> SessionData {
        let filters = Family::all()
            .iter()
            .map(|&family| {
                let table = self.table(family);
                let fs = &table.filter_state;
                (
                    family.schema_id().to_string(),
                    PersistedFilter {
                        organization: fs.organization.clone(),
                        model: fs.model.clone(),
                        connectivity: fs.connectivity.iter().copied().collect(),
                        operability: fs.operability.iter().copied().collect(),
                        text_search: fs.text_search.clone(),
                        regex_pattern: fs
                            .regex_search
                            .as_ref()
                            .map(|r| r.as_str().to_string())
                            .unwrap_or_default(),
                    },
                )
            })
            .collect();

        SessionData {
            version: SESSION_VERSION,
            active_tab: self.active_tab,
            device_subtab: self.device_subtab,
            filters,
        }
    }

    /// Persist the current view state to the platform data directory.
    ///
    /// Failures are logged and ignored — persistence is a convenience,
    /// never a reason to bother the user.
    pub fn save_session(&self) {
        let path = session_path(&self.data_dir);
        if let Err(e) = save(&self.session_data(), &path) {
            tracing::warn!(error = %e, "Could not save session");
        }
    }

    /// Restore persisted view state, if a valid session file exists.
    pub fn restore_session(&mut self) {
        let path = session_path(&self.data_dir);
        let Some(data) = load(&path) else {
            return;
        };

        self.active_tab = data.active_tab;
        self.device_subtab = data.device_subtab;

        for (schema_id, persisted) in data.filters {
            let Some(&family) = Family::all()
                .iter()
                .find(|f| f.schema_id() == schema_id)
            else {
                continue;
            };
            let table = self.table_mut(family);
            table.filter_state.organization = persisted.organization;
            table.filter_state.model = persisted.model;
            table.filter_state.connectivity = persisted.connectivity.into_iter().collect();
            table.filter_state.operability = persisted.operability.into_iter().collect();
            table.filter_state.text_search = persisted.text_search;
            if table
                .filter_state
                .set_regex(&persisted.regex_pattern)
                .is_err()
            {
                tracing::warn!(
                    schema_id,
                    pattern = persisted.regex_pattern,
                    "Persisted regex no longer compiles; dropped"
                );
            }
        }
    }
}

// =============================================================================
// I/O helpers
// =============================================================================

/// Resolve the session file path from the platform data directory.
pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SESSION_FILE_NAME)
}

/// Save `data` to `path` atomically (write temp → rename).
///
/// Creates all parent directories as needed.  Returns a descriptive error
/// string suitable for a tracing warn! call; the caller decides whether to
/// surface it to the user (typically it is logged and ignored).
pub fn save(data: &SessionData, path: &Path) -> Result<(), String> {
    // Ensure the parent directory exists before writing.
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            format!(
                "cannot create session directory '{}': {e}",
                parent.display()
            )
        })?;
    }

    let json = serde_json::to_string_pretty(data)
        .map_err(|e| format!("failed to serialise session: {e}"))?;

    // Atomic write: write to a sibling temp file then rename.
    // A crash between write and rename loses the new session but never
    // corrupts the previous one (rename is atomic on all supported platforms).
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes())
        .map_err(|e| format!("failed to write session temp file '{}': {e}", tmp.display()))?;

    std::fs::rename(&tmp, path).map_err(|e| {
        // Clean up the temp file on failure; ignore any secondary error.
        let _ = std::fs::remove_file(&tmp);
        format!("failed to finalise session file '{}': {e}", path.display())
    })?;

    tracing::debug!(path = %path.display(), "Session saved");
    Ok(())
}

/// Load and validate a `SessionData` from `path`.
///
/// Returns `None` on any error (file not found, JSON parse failure,
/// version mismatch).  The caller should treat `None` as "start fresh".
pub fn load(path: &Path) -> Option<SessionData> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| {
            // Distinguish "file not found" (normal first run) from other errors.
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read session file");
            }
        })
        .ok()?;

    let data: SessionData = serde_json::from_str(&content)
        .map_err(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Session file is malformed — starting fresh"
            );
        })
        .ok()?;

    if data.version != SESSION_VERSION {
        tracing::warn!(
            found = data.version,
            expected = SESSION_VERSION,
            "Session file version mismatch — starting fresh"
        );
        return None;
    }

    tracing::info!(path = %path.display(), "Session file loaded");
    Some(data)
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_data() -> SessionData {
        SessionData {
            version: SESSION_VERSION,
            active_tab: Tab::M2m,
            device_subtab: DeviceSubTab::Kiwi,
            filters: vec![(
                "boards".to_string(),
                PersistedFilter {
                    organization: Some("Acme".to_string()),
                    model: None,
                    connectivity: vec![Connectivity::Disconnected],
                    operability: vec![],
                    text_search: "router".to_string(),
                    regex_pattern: r"u-\d+".to_string(),
                },
            )],
        }
    }

    /// Save and load must round-trip all fields accurately.
    #[test]
    fn test_session_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let original = sample_data();

        save(&original, &path).expect("save should succeed");
        let loaded = load(&path).expect("load should return Some after valid save");

        assert_eq!(loaded.version, SESSION_VERSION);
        assert_eq!(loaded.active_tab, Tab::M2m);
        assert_eq!(loaded.device_subtab, DeviceSubTab::Kiwi);
        assert_eq!(loaded.filters.len(), 1);
        let (id, filter) = &loaded.filters[0];
        assert_eq!(id, "boards");
        assert_eq!(filter.organization.as_deref(), Some("Acme"));
        assert_eq!(filter.connectivity, vec![Connectivity::Disconnected]);
        assert_eq!(filter.text_search, "router");
        assert_eq!(filter.regex_pattern, r"u-\d+");
    }

    /// Load must return None when the file does not exist (first run).
    #[test]
    fn test_session_load_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.json");
        assert!(load(&path).is_none());
    }

    /// Load must return None when the JSON is malformed rather than panicking.
    #[test]
    fn test_session_load_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not valid json {{{{").unwrap();
        assert!(load(&path).is_none());
    }

    /// Load must return None when the version field is wrong.
    #[test]
    fn test_session_load_wrong_version_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let mut data = sample_data();
        data.version = 99;
        save(&data, &path).unwrap();
        // (save() writes whatever version we give it — validation is in load().)
        assert!(load(&path).is_none());
    }

    /// A crash during save (temp file exists) must not corrupt the original.
    #[test]
    fn test_session_save_atomic_does_not_corrupt_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        // Write an initial good session.
        save(&sample_data(), &path).unwrap();

        // Simulate a leftover temp file (e.g. from a previous crash).
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, b"garbage").unwrap();

        // Save a new session — should overwrite the temp file and rename correctly.
        let mut updated = sample_data();
        updated.active_tab = Tab::Firmware;
        save(&updated, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.active_tab, Tab::Firmware);
    }
}
